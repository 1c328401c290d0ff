use std::io;
use std::path::Path;

use miette::{miette, Diagnostic, Report, Severity};
use thiserror::Error;

use crate::ops::Opcode;

// Loader errors

pub fn load_unreadable(path: &Path, e: io::Error) -> Report {
    miette!(
        severity = Severity::Error,
        code = "load::read",
        help = "check that the path exists and is readable",
        "failed to load image: {}: {e}",
        path.display(),
    )
}

pub fn load_odd_length(path: &Path, len: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "load::odd_length",
        help = "images are a sequence of big-endian 16-bit words",
        "failed to load image: {}: length of {len} bytes is not aligned to 16 bits",
        path.display(),
    )
}

pub fn load_missing_origin(path: &Path) -> Report {
    miette!(
        severity = Severity::Error,
        code = "load::empty",
        help = "the first word of an image is the address to load it at",
        "failed to load image: {}: file is empty",
        path.display(),
    )
}

// Configuration errors

pub fn env_bad_address(name: &str, value: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "env::address",
        help = "use a hex address such as `x3000` or `0x3000`",
        "environment variable {name} has invalid address `{value}`",
    )
}

// Runtime errors

/// Condition which stops the machine for good.
#[derive(Debug, Error, Diagnostic)]
pub enum Fault {
    #[error("illegal instruction 0x{instr:04x} ({opcode:?}) at 0x{addr:04x}")]
    #[diagnostic(
        code(runtime::reserved_opcode),
        help("opcodes RTI (0x8) and RES (0xD) are reserved and cannot be executed")
    )]
    ReservedOpcode { opcode: Opcode, instr: u16, addr: u16 },

    #[error("unknown trap vector x{vector:02X} at 0x{addr:04x}")]
    #[diagnostic(
        code(runtime::unknown_trap),
        help("available traps are x20 through x27")
    )]
    UnknownTrap { vector: u8, addr: u16 },

    #[error("execution interrupted")]
    #[diagnostic(code(runtime::interrupted))]
    Interrupted,

    #[error("device failure: {0}")]
    #[diagnostic(code(runtime::device))]
    Device(#[source] io::Error),
}

impl From<io::Error> for Fault {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::Interrupted => Fault::Interrupted,
            _ => Fault::Device(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupted_io_becomes_interrupt() {
        let fault = Fault::from(io::Error::new(io::ErrorKind::Interrupted, "ctrl+c"));
        assert!(matches!(fault, Fault::Interrupted));

        let fault = Fault::from(io::Error::new(io::ErrorKind::UnexpectedEof, "closed"));
        assert!(matches!(fault, Fault::Device(_)));
    }

    #[test]
    fn fault_messages() {
        let fault = Fault::ReservedOpcode {
            opcode: Opcode::RES,
            instr: 0xd000,
            addr: 0x3004,
        };
        assert_eq!(fault.to_string(), "illegal instruction 0xd000 (RES) at 0x3004");

        let fault = Fault::UnknownTrap {
            vector: 0x30,
            addr: 0x3000,
        };
        assert_eq!(fault.to_string(), "unknown trap vector x30 at 0x3000");
    }

    #[test]
    fn load_messages_name_the_file() {
        let report = load_odd_length(Path::new("prog.obj"), 3);
        assert!(report.to_string().contains("prog.obj"));
        assert!(report.to_string().starts_with("failed to load image"));
    }
}
