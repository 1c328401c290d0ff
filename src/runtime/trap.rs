use std::fmt::Write as _;

use super::{Machine, RunState};
use crate::device::{Input, Output};
use crate::error::Fault;
use crate::mem::MEMORY_MAX;
use crate::ops::Instr;
use crate::state::Register;

/// Written by `IN` before waiting for a key.
const IN_PROMPT: &str = "Enter a character: ";
/// Written by `HALT`.
const HALT_MESSAGE: &str = "HALT\n";

/// System routines reachable through `TRAP`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapVector {
    /// Read a character into R0, without echo
    Getc = 0x20,
    /// Write the character in R0
    Out = 0x21,
    /// Write a string of one character per word, starting at R0
    Puts = 0x22,
    /// Prompt for a character, echo it, and read it into R0
    In = 0x23,
    /// Write a string of two characters per word, starting at R0
    Putsp = 0x24,
    /// Stop the machine
    Halt = 0x25,
    /// Write R0 as a signed decimal integer
    Putn = 0x26,
    /// Write the contents of all general purpose registers
    Reg = 0x27,
}

impl TryFrom<u8> for TrapVector {
    type Error = u8;
    fn try_from(vector: u8) -> Result<Self, Self::Error> {
        Ok(match vector {
            0x20 => TrapVector::Getc,
            0x21 => TrapVector::Out,
            0x22 => TrapVector::Puts,
            0x23 => TrapVector::In,
            0x24 => TrapVector::Putsp,
            0x25 => TrapVector::Halt,
            0x26 => TrapVector::Putn,
            0x27 => TrapVector::Reg,
            _ => return Err(vector),
        })
    }
}

impl<I: Input, O: Output> Machine<I, O> {
    /// Run the routine for a `TRAP` instruction, then return to the instruction after it.
    ///
    /// R7 is left untouched: routines are native, so there is no return address to keep.
    pub(super) fn trap(&mut self, instr: Instr) -> Result<(), Fault> {
        let vector = TrapVector::try_from(instr.trap_vector()).map_err(|vector| {
            Fault::UnknownTrap {
                vector,
                addr: self.regs.pc().wrapping_sub(1),
            }
        })?;

        match vector {
            TrapVector::Getc => {
                let ch = self.input.read()?;
                self.regs.set_with_flag(Register::R0, u16::from(ch));
            }
            TrapVector::Out => {
                let ch = self.low_byte(Register::R0);
                self.output.write_byte(ch)?;
            }
            TrapVector::Puts => {
                let start = self.regs.get(Register::R0);
                for addr in words_from(start) {
                    let word = self.mem.peek(addr);
                    if word == 0 {
                        break;
                    }
                    self.output.write_byte((word & 0xFF) as u8)?;
                }
            }
            TrapVector::In => {
                self.output.write_str(IN_PROMPT)?;
                self.output.flush()?;
                let ch = self.input.read()?;
                self.output.write_byte(ch)?;
                self.regs.set_with_flag(Register::R0, u16::from(ch));
            }
            TrapVector::Putsp => {
                let start = self.regs.get(Register::R0);
                'string: for addr in words_from(start) {
                    let [high, low] = self.mem.peek(addr).to_be_bytes();
                    for (i, ch) in [low, high].into_iter().enumerate() {
                        match (i, ch) {
                            (0, 0) => break 'string,
                            // Odd-length strings pad the last high byte with zero
                            (_, 0) => continue,
                            _ => self.output.write_byte(ch)?,
                        }
                    }
                }
            }
            TrapVector::Halt => {
                self.output.write_str(HALT_MESSAGE)?;
                self.state = RunState::Halted;
            }
            TrapVector::Putn => {
                let val = self.regs.get(Register::R0) as i16;
                self.output.write_str(&format!("{val}\n"))?;
            }
            TrapVector::Reg => {
                let dump = self.register_dump();
                self.output.write_str(&dump)?;
            }
        }

        if vector != TrapVector::Getc {
            self.output.flush()?;
        }
        Ok(())
    }

    fn low_byte(&self, reg: Register) -> u8 {
        (self.regs.get(reg) & 0xFF) as u8
    }

    fn register_dump(&self) -> String {
        let mut dump = String::from("\n------ Registers ------\n");
        for (i, val) in self.regs.all().iter().enumerate() {
            let _ = writeln!(dump, "R{i} 0x{val:04x} {:>6}", *val as i16);
        }
        let _ = writeln!(
            dump,
            "PC 0x{:04x} CC {:03b}",
            self.regs.pc(),
            self.regs.flag().bits()
        );
        dump.push_str("-----------------------\n");
        dump
    }
}

/// Every address once, starting at `start` and wrapping past `0xFFFF`.
fn words_from(start: u16) -> impl Iterator<Item = u16> {
    (0..MEMORY_MAX).map(move |i| start.wrapping_add(i as u16))
}
