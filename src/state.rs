use std::cmp::Ordering;
use std::fmt;

/// Address execution starts from when no other entry point is configured.
pub const PC_START: u16 = 0x3000;

/// Condition code, set using the result of the previous flag-setting instruction.
///
/// Exactly one flag is ever set, so this is an enum rather than a bitfield. The discriminants
/// match the `nzp` bits of a `BR` instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flag {
    /// Negative
    N = 0b100,
    /// Zero
    Z = 0b010,
    /// Positive
    P = 0b001,
}

impl Flag {
    /// Flag for a value interpreted as a two's-complement 16-bit integer.
    pub fn from_value(val: u16) -> Self {
        match (val as i16).cmp(&0) {
            Ordering::Less => Flag::N,
            Ordering::Equal => Flag::Z,
            Ordering::Greater => Flag::P,
        }
    }

    pub fn bits(self) -> u16 {
        self as u16
    }
}

/// One of the eight general purpose registers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Register {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    /// Link register for `JSR`/`JSRR`; `RET` jumps through it.
    R7,
}

impl Register {
    pub const ALL: [Register; 8] = [
        Register::R0,
        Register::R1,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
        Register::R6,
        Register::R7,
    ];

    /// Register named by the low three bits of `bits`.
    pub fn from_bits(bits: u16) -> Self {
        Self::ALL[usize::from(bits & 0b111)]
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.index())
    }
}

/// General purpose registers, program counter and condition code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterFile {
    /// 8x 16-bit registers
    reg: [u16; 8],
    /// Program counter
    pc: u16,
    /// Condition code
    flag: Flag,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new(PC_START)
    }
}

impl RegisterFile {
    /// Zeroed registers with `Z` set, so the flag invariant holds before the first instruction.
    pub fn new(pc: u16) -> Self {
        RegisterFile {
            reg: [0; 8],
            pc,
            flag: Flag::Z,
        }
    }

    #[inline]
    pub fn get(&self, reg: Register) -> u16 {
        self.reg[reg.index()]
    }

    /// Write a register without touching the condition code.
    #[inline]
    pub fn set(&mut self, reg: Register, val: u16) {
        self.reg[reg.index()] = val;
    }

    /// Write a register and set the condition code from the new value.
    #[inline]
    pub fn set_with_flag(&mut self, reg: Register, val: u16) {
        self.set(reg, val);
        self.flag = Flag::from_value(val);
    }

    pub fn all(&self) -> &[u16; 8] {
        &self.reg
    }

    #[inline]
    pub fn pc(&self) -> u16 {
        self.pc
    }

    #[inline]
    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    /// Increment PC past the instruction at the current PC, returning the old value.
    #[inline]
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = old.wrapping_add(1);
        old
    }

    #[inline]
    pub fn flag(&self) -> Flag {
        self.flag
    }
}
