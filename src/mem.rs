use std::io;

use crate::device::Input;

/// LC3 can address 128KB of memory: 2^16 words of 16 bits.
pub const MEMORY_MAX: usize = 0x10000;

/// Keyboard status register. Bit 15 is set when a character is ready.
pub const KBSR: u16 = 0xFE00;
/// Keyboard data register. Low byte holds the last character made ready.
pub const KBDR: u16 = 0xFE02;

const KBSR_READY: u16 = 1 << 15;

/// Word-addressed system memory, with the keyboard registers mapped in.
///
/// Every `u16` is a valid address, so no access can fail on range. Writes are never
/// intercepted, including writes to the device registers.
pub struct AddressSpace {
    /// Always exactly `MEMORY_MAX` cells long.
    cells: Box<[u16]>,
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressSpace {
    pub fn new() -> Self {
        AddressSpace {
            cells: vec![0; MEMORY_MAX].into_boxed_slice(),
        }
    }

    /// Read a word as the running program sees it.
    ///
    /// Reading `KBSR` polls `input` first: a ready character is latched into `KBDR` and the ready
    /// bit set, otherwise the status register is cleared.
    pub fn read<I: Input + ?Sized>(&mut self, addr: u16, input: &mut I) -> io::Result<u16> {
        if addr == KBSR {
            match input.poll()? {
                Some(ch) => {
                    self.cells[usize::from(KBSR)] = KBSR_READY;
                    self.cells[usize::from(KBDR)] = u16::from(ch);
                }
                None => self.cells[usize::from(KBSR)] = 0,
            }
        }
        Ok(self.cells[usize::from(addr)])
    }

    /// Read a word without device side effects.
    #[inline]
    pub fn peek(&self, addr: u16) -> u16 {
        self.cells[usize::from(addr)]
    }

    #[inline]
    pub fn write(&mut self, addr: u16, val: u16) {
        self.cells[usize::from(addr)] = val;
    }

    /// Copy `words` into memory starting at `origin`.
    ///
    /// Words which would land past `0xFFFF` are dropped. Returns the amount of words stored.
    pub fn load(&mut self, origin: u16, words: &[u16]) -> usize {
        let start = usize::from(origin);
        let count = words.len().min(MEMORY_MAX - start);
        self.cells[start..start + count].copy_from_slice(&words[..count]);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Scripted;

    #[test]
    fn plain_reads_do_not_poll() {
        let mut mem = AddressSpace::new();
        let mut input = Scripted::new("k");
        mem.write(0x3000, 0x1234);
        assert_eq!(mem.read(0x3000, &mut input).unwrap(), 0x1234);
        assert_eq!(mem.read(KBDR, &mut input).unwrap(), 0);
        assert_eq!(input.polls(), 0);
        assert_eq!(input.remaining(), 1);
    }

    #[test]
    fn status_read_latches_character() {
        let mut mem = AddressSpace::new();
        let mut input = Scripted::new("k");

        let status = mem.read(KBSR, &mut input).unwrap();
        assert_eq!(status & KBSR_READY, KBSR_READY);
        assert_eq!(mem.read(KBDR, &mut input).unwrap(), u16::from(b'k'));

        // Nothing else ready: status clears, data keeps the last character
        assert_eq!(mem.read(KBSR, &mut input).unwrap(), 0);
        assert_eq!(mem.peek(KBDR), u16::from(b'k'));
        assert_eq!(input.polls(), 2);
    }

    #[test]
    fn peek_has_no_side_effects() {
        let mut mem = AddressSpace::new();
        mem.write(KBSR, 0xabcd);
        assert_eq!(mem.peek(KBSR), 0xabcd);
    }

    #[test]
    fn writes_to_device_registers_pass_through() {
        let mut mem = AddressSpace::new();
        mem.write(KBDR, 0x41);
        assert_eq!(mem.peek(KBDR), 0x41);
    }

    #[test]
    fn load_truncates_at_end_of_memory() {
        let mut mem = AddressSpace::new();
        assert_eq!(mem.load(0xfffe, &[1, 2, 3]), 2);
        assert_eq!(mem.peek(0xfffe), 1);
        assert_eq!(mem.peek(0xffff), 2);
        assert_eq!(mem.peek(0x0000), 0);
    }

    #[test]
    fn later_loads_overwrite() {
        let mut mem = AddressSpace::new();
        mem.load(0x3000, &[1, 2, 3]);
        mem.load(0x3001, &[9]);
        assert_eq!(
            [mem.peek(0x3000), mem.peek(0x3001), mem.peek(0x3002)],
            [1, 9, 3]
        );
    }
}
