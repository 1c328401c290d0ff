use std::io::{self, IsTerminal as _};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use miette::{IntoDiagnostic, Report, Result};

use lc3vm::device::StdoutOutput;
use lc3vm::output::{message, MsgColor};
use lc3vm::term::{Keyboard, RawMode};
use lc3vm::{env, output, Fault, Image, Machine};

/// Exit status after Ctrl+C, as a shell reports SIGINT.
const EXIT_INTERRUPTED: i32 = 130;
/// Exit status after a runtime fault, as a shell reports SIGABRT.
const EXIT_FAULT: i32 = 134;

const DIAGNOSTIC_WIDTH: usize = 400;

/// Run LC-3 machine code images.
///
/// Each image is a sequence of big-endian 16-bit words, the first of which is the address to
/// load the rest at. Execution starts at 0x3000 and stops at the HALT trap.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Image files to load in order; later images overwrite earlier ones where they overlap
    #[arg(required = true, value_name = "IMAGE")]
    images: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .terminal_links(false)
                // Image paths make for long messages, keep them on one line
                .width(DIAGNOSTIC_WIDTH)
                .build(),
        )
    }))?;

    env::init()?;
    output::init();

    let images = args
        .images
        .iter()
        .map(|path| {
            message(MsgColor::Green, "Loading", format!("target {}", path.display()));
            Image::read(path)
        })
        .collect::<Result<Vec<_>>>()?;

    message(MsgColor::Green, "Running", "loaded images");
    let (result, count) = {
        let raw = RawMode::acquire().into_diagnostic()?;
        let translate_newlines = raw.is_enabled() && io::stdout().is_terminal();
        let mut machine = Machine::new(Keyboard::new(&raw), StdoutOutput::new(translate_newlines));
        for image in &images {
            machine.load_image(image);
        }
        if let Some(pc) = env::start_pc() {
            machine.set_pc(pc);
        }
        let result = machine.run();
        (result, machine.instruction_count())
        // Terminal restored here, before anything else is printed
    };

    match result {
        Ok(()) => {
            message(MsgColor::Cyan, "Halted", plural(count, "instruction"));
            Ok(())
        }
        Err(Fault::Interrupted) => {
            eprintln!();
            message(MsgColor::Red, "Interrupted", plural(count, "instruction"));
            process::exit(EXIT_INTERRUPTED);
        }
        Err(fault) => {
            message(MsgColor::Red, "Aborted", plural(count, "instruction"));
            eprintln!("{:?}", Report::new(fault));
            process::exit(EXIT_FAULT);
        }
    }
}

fn plural(count: u64, noun: &str) -> String {
    format!(
        "after {count} {noun}{}",
        if count == 1 { "" } else { "s" }
    )
}
