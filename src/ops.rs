use std::fmt;

use crate::state::Register;

/// Operation selected by bits 15-12 of an instruction word.
///
/// All 16 values are valid tags. `RTI` and `RES` decode fine but cannot be executed.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Opcode {
    /// Branch on condition code
    BR,
    /// Add register and register/imm5
    ADD,
    /// Load PC-relative
    LD,
    /// Store PC-relative
    ST,
    /// Jump to subroutine, PC-relative (`JSR`) or through base register (`JSRR`)
    JSR,
    /// Bitwise-and register and register/imm5
    AND,
    /// Load base+offset
    LDR,
    /// Store base+offset
    STR,
    /// Return from interrupt (unused)
    RTI,
    /// Bitwise complement
    NOT,
    /// Load indirect
    LDI,
    /// Store indirect
    STI,
    /// Jump through base register, `RET` when base is R7
    JMP,
    /// Reserved
    RES,
    /// Load effective address
    LEA,
    /// System call through trap vector
    TRAP,
}

impl Opcode {
    const TABLE: [Opcode; 16] = [
        Opcode::BR,   // 0x0
        Opcode::ADD,  // 0x1
        Opcode::LD,   // 0x2
        Opcode::ST,   // 0x3
        Opcode::JSR,  // 0x4
        Opcode::AND,  // 0x5
        Opcode::LDR,  // 0x6
        Opcode::STR,  // 0x7
        Opcode::RTI,  // 0x8
        Opcode::NOT,  // 0x9
        Opcode::LDI,  // 0xA
        Opcode::STI,  // 0xB
        Opcode::JMP,  // 0xC
        Opcode::RES,  // 0xD
        Opcode::LEA,  // 0xE
        Opcode::TRAP, // 0xF
    ];

    /// Numeric opcode, as found in the top nibble of an instruction.
    pub fn value(self) -> u16 {
        self as u16
    }
}

/// A raw instruction word, with accessors for each operand field.
///
/// Accessors never validate: each handler only asks for the fields its opcode defines.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Instr(u16);

impl Instr {
    pub fn new(word: u16) -> Self {
        Instr(word)
    }

    pub fn word(self) -> u16 {
        self.0
    }

    pub fn opcode(self) -> Opcode {
        Opcode::TABLE[usize::from(self.0 >> 12)]
    }

    /// Destination register, or source register for stores. Bits 11-9.
    pub fn dr(self) -> Register {
        Register::from_bits(self.0 >> 9)
    }

    /// First source register, or base register. Bits 8-6.
    pub fn sr1(self) -> Register {
        Register::from_bits(self.0 >> 6)
    }

    /// Second source register in register mode. Bits 2-0.
    pub fn sr2(self) -> Register {
        Register::from_bits(self.0)
    }

    /// `ADD`/`AND` immediate mode. Bit 5.
    pub fn is_imm(self) -> bool {
        self.0 & 0x0020 != 0
    }

    /// `JSR` (PC-relative) rather than `JSRR`. Bit 11.
    pub fn is_jsr_offset(self) -> bool {
        self.0 & 0x0800 != 0
    }

    /// Branch condition bits `nzp`. Bits 11-9.
    pub fn nzp(self) -> u16 {
        (self.0 >> 9) & 0b111
    }

    pub fn imm5(self) -> u16 {
        sign_extend(self.0, 5)
    }

    pub fn offset6(self) -> u16 {
        sign_extend(self.0, 6)
    }

    pub fn pc_offset9(self) -> u16 {
        sign_extend(self.0, 9)
    }

    pub fn pc_offset11(self) -> u16 {
        sign_extend(self.0, 11)
    }

    pub fn trap_vector(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

impl From<u16> for Instr {
    fn from(word: u16) -> Self {
        Instr(word)
    }
}

impl fmt::Debug for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instr(0x{:04x} {:?})", self.0, self.opcode())
    }
}

/// Sign-extend the low `bits` bits of `val` to a full 16-bit value.
///
/// Bits above `bits` in the input are ignored.
#[inline]
pub fn sign_extend(val: u16, bits: u32) -> u16 {
    debug_assert!(bits > 0 && bits <= 16);
    if bits >= 16 {
        return val;
    }
    // Sign bit
    let sign = val & (1u16 << (bits - 1));
    // Bits lower than and including sign bit
    let magnitude = val & ((1u16 << bits) - 1);
    // Negative input: sign bit and every bit above it set, eg. bits=5 -> 0xFFF0
    // Positive input: 0x0000
    magnitude | sign.wrapping_neg()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_extend_known_values() {
        #[rustfmt::skip]
        let cases = [
            // (input, bits, expected)
            (0x0000, 5, 0x0000),
            (0x000f, 5, 0x000f),
            (0x0010, 5, 0xfff0),
            (0x001f, 5, 0xffff),
            (0x003f, 5, 0xffff),
            (0x0020, 6, 0xffe0),
            (0x001f, 6, 0x001f),
            (0x00ff, 9, 0x00ff),
            (0x0100, 9, 0xff00),
            (0x01ff, 9, 0xffff),
            (0xfe00, 9, 0x0000),
            (0x03ff, 11, 0x03ff),
            (0x0400, 11, 0xfc00),
            (0x07ff, 11, 0xffff),
            (0x8000, 16, 0x8000),
        ];
        for (input, bits, expected) in cases {
            let actual = sign_extend(input, bits);
            assert_eq!(
                actual, expected,
                "sign_extend(0x{input:04x}, {bits}) == 0x{actual:04x}, expected 0x{expected:04x}"
            );
        }
    }

    #[test]
    fn sign_extend_matches_signed_shift() {
        for bits in [5, 6, 9, 11] {
            let mask = (1u16 << bits) - 1;
            for val in 0..=u16::MAX {
                // Arithmetic shift of the field moved to the top of an i16
                let shift = 16 - bits;
                let expected = ((val << shift) as i16) >> shift;
                assert_eq!(sign_extend(val & mask, bits) as i16, expected);
                assert_eq!(sign_extend(val, bits), sign_extend(val & mask, bits));
            }
        }
    }

    #[test]
    fn decodes_every_opcode() {
        let expected = [
            Opcode::BR,
            Opcode::ADD,
            Opcode::LD,
            Opcode::ST,
            Opcode::JSR,
            Opcode::AND,
            Opcode::LDR,
            Opcode::STR,
            Opcode::RTI,
            Opcode::NOT,
            Opcode::LDI,
            Opcode::STI,
            Opcode::JMP,
            Opcode::RES,
            Opcode::LEA,
            Opcode::TRAP,
        ];
        for (nibble, opcode) in expected.into_iter().enumerate() {
            let word = (nibble as u16) << 12 | 0x0abc;
            assert_eq!(Instr::new(word).opcode(), opcode);
            assert_eq!(opcode.value(), nibble as u16);
        }
    }

    #[test]
    fn operand_fields() {
        // ADD R3, R5, #-2
        let add = Instr::new(0b0001_011_101_1_11110);
        assert_eq!(add.dr(), Register::R3);
        assert_eq!(add.sr1(), Register::R5);
        assert!(add.is_imm());
        assert_eq!(add.imm5(), 0xfffe);

        // AND R1, R2, R7
        let and = Instr::new(0b0101_001_010_0_00_111);
        assert!(!and.is_imm());
        assert_eq!(and.sr2(), Register::R7);

        // BRnp #-1
        let br = Instr::new(0b0000_101_111111111);
        assert_eq!(br.nzp(), 0b101);
        assert_eq!(br.pc_offset9(), 0xffff);

        // JSR #0x3ff, JSRR R4
        assert!(Instr::new(0x4bff).is_jsr_offset());
        assert_eq!(Instr::new(0x4bff).pc_offset11(), 0x03ff);
        let jsrr = Instr::new(0b0100_0_00_100_000000);
        assert!(!jsrr.is_jsr_offset());
        assert_eq!(jsrr.sr1(), Register::R4);

        // LDR R0, R1, #-32
        assert_eq!(Instr::new(0b0110_000_001_100000).offset6(), 0xffe0);

        // TRAP x25
        assert_eq!(Instr::new(0xf025).trap_vector(), 0x25);
    }
}
