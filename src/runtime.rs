mod trap;

pub use self::trap::TrapVector;

use crate::device::{Input, Output};
use crate::error::Fault;
use crate::loader::Image;
use crate::mem::AddressSpace;
use crate::ops::{Instr, Opcode};
use crate::state::{Flag, Register, RegisterFile, PC_START};

/// Amount of instructions executed between checks for an external interrupt.
pub const INTERRUPT_CHECK_INTERVAL: u64 = 0x4000;

/// Where the machine is in its lifecycle. `Halted` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// Stopped by the `HALT` trap.
    Halted,
    /// Stopped by a [`Fault`].
    Failed,
}

/// Represents complete machine state during runtime.
pub struct Machine<I, O> {
    /// System memory, including mapped device registers
    mem: AddressSpace,
    regs: RegisterFile,
    input: I,
    output: O,
    state: RunState,
    /// Instructions fetched since construction
    count: u64,
}

impl<I: Input, O: Output> Machine<I, O> {
    /// Zeroed memory, PC at `0x3000`, condition code `Z`.
    pub fn new(input: I, output: O) -> Self {
        Machine {
            mem: AddressSpace::new(),
            regs: RegisterFile::new(PC_START),
            input,
            output,
            state: RunState::Running,
            count: 0,
        }
    }

    /// Store an image in memory. Later images overwrite earlier ones where they overlap.
    pub fn load_image(&mut self, image: &Image) -> usize {
        self.mem.load(image.origin(), image.words())
    }

    /// Run until `HALT`, or until a fault stops the machine.
    pub fn run(&mut self) -> Result<(), Fault> {
        while self.state == RunState::Running {
            self.step()?;
        }
        Ok(())
    }

    /// Perform one fetch-decode-execute cycle.
    ///
    /// Does nothing once the machine has halted or failed. A returned fault leaves the machine in
    /// [`RunState::Failed`].
    pub fn step(&mut self) -> Result<(), Fault> {
        if self.state != RunState::Running {
            return Ok(());
        }
        let result = self.cycle();
        if result.is_err() {
            self.state = RunState::Failed;
        }
        result
    }

    fn cycle(&mut self) -> Result<(), Fault> {
        if self.count > 0 && self.count % INTERRUPT_CHECK_INTERVAL == 0 {
            self.input.check_interrupt()?;
        }

        let addr = self.regs.pc();
        let instr = Instr::new(self.read(addr)?);
        // PC incremented before instruction is performed
        self.regs.advance_pc();
        self.count += 1;

        match instr.opcode() {
            Opcode::BR => self.br(instr),
            Opcode::ADD => self.add(instr),
            Opcode::LD => self.ld(instr),
            Opcode::ST => self.st(instr),
            Opcode::JSR => self.jsr(instr),
            Opcode::AND => self.and(instr),
            Opcode::LDR => self.ldr(instr),
            Opcode::STR => self.str(instr),
            Opcode::NOT => self.not(instr),
            Opcode::LDI => self.ldi(instr),
            Opcode::STI => self.sti(instr),
            Opcode::JMP => self.jmp(instr),
            Opcode::LEA => self.lea(instr),
            Opcode::TRAP => self.trap(instr),
            opcode @ (Opcode::RTI | Opcode::RES) => Err(Fault::ReservedOpcode {
                opcode,
                instr: instr.word(),
                addr,
            }),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn pc(&self) -> u16 {
        self.regs.pc()
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.regs.set_pc(pc);
    }

    pub fn reg(&self, reg: Register) -> u16 {
        self.regs.get(reg)
    }

    pub fn set_reg(&mut self, reg: Register, val: u16) {
        self.regs.set(reg, val);
    }

    pub fn flag(&self) -> Flag {
        self.regs.flag()
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// Read memory without triggering device registers.
    pub fn mem_peek(&self, addr: u16) -> u16 {
        self.mem.peek(addr)
    }

    pub fn mem_write(&mut self, addr: u16, val: u16) {
        self.mem.write(addr, val);
    }

    pub fn instruction_count(&self) -> u64 {
        self.count
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Memory read as seen by the program, polling the keyboard on `KBSR`.
    #[inline]
    fn read(&mut self, addr: u16) -> Result<u16, Fault> {
        Ok(self.mem.read(addr, &mut self.input)?)
    }

    /// Second operand of `ADD`/`AND`.
    #[inline]
    fn operand2(&self, instr: Instr) -> u16 {
        if instr.is_imm() {
            instr.imm5()
        } else {
            self.regs.get(instr.sr2())
        }
    }

    fn add(&mut self, instr: Instr) -> Result<(), Fault> {
        let res = self.regs.get(instr.sr1()).wrapping_add(self.operand2(instr));
        self.regs.set_with_flag(instr.dr(), res);
        Ok(())
    }

    fn and(&mut self, instr: Instr) -> Result<(), Fault> {
        let res = self.regs.get(instr.sr1()) & self.operand2(instr);
        self.regs.set_with_flag(instr.dr(), res);
        Ok(())
    }

    fn not(&mut self, instr: Instr) -> Result<(), Fault> {
        let res = !self.regs.get(instr.sr1());
        self.regs.set_with_flag(instr.dr(), res);
        Ok(())
    }

    fn br(&mut self, instr: Instr) -> Result<(), Fault> {
        if instr.nzp() & self.regs.flag().bits() != 0 {
            let target = self.regs.pc().wrapping_add(instr.pc_offset9());
            self.regs.set_pc(target);
        }
        Ok(())
    }

    fn jmp(&mut self, instr: Instr) -> Result<(), Fault> {
        self.regs.set_pc(self.regs.get(instr.sr1()));
        Ok(())
    }

    fn jsr(&mut self, instr: Instr) -> Result<(), Fault> {
        // Base is read before R7 is written, so `JSRR R7` jumps to the old R7
        let base = self.regs.get(instr.sr1());
        let ret = self.regs.pc();
        self.regs.set(Register::R7, ret);
        let target = if instr.is_jsr_offset() {
            ret.wrapping_add(instr.pc_offset11())
        } else {
            base
        };
        self.regs.set_pc(target);
        Ok(())
    }

    #[inline]
    fn pc_relative(&self, instr: Instr) -> u16 {
        self.regs.pc().wrapping_add(instr.pc_offset9())
    }

    #[inline]
    fn base_relative(&self, instr: Instr) -> u16 {
        self.regs.get(instr.sr1()).wrapping_add(instr.offset6())
    }

    fn ld(&mut self, instr: Instr) -> Result<(), Fault> {
        let val = self.read(self.pc_relative(instr))?;
        self.regs.set_with_flag(instr.dr(), val);
        Ok(())
    }

    fn ldi(&mut self, instr: Instr) -> Result<(), Fault> {
        let ptr = self.read(self.pc_relative(instr))?;
        let val = self.read(ptr)?;
        self.regs.set_with_flag(instr.dr(), val);
        Ok(())
    }

    fn ldr(&mut self, instr: Instr) -> Result<(), Fault> {
        let val = self.read(self.base_relative(instr))?;
        self.regs.set_with_flag(instr.dr(), val);
        Ok(())
    }

    fn lea(&mut self, instr: Instr) -> Result<(), Fault> {
        let addr = self.pc_relative(instr);
        self.regs.set_with_flag(instr.dr(), addr);
        Ok(())
    }

    fn st(&mut self, instr: Instr) -> Result<(), Fault> {
        let val = self.regs.get(instr.dr());
        self.mem.write(self.pc_relative(instr), val);
        Ok(())
    }

    fn sti(&mut self, instr: Instr) -> Result<(), Fault> {
        let val = self.regs.get(instr.dr());
        let ptr = self.read(self.pc_relative(instr))?;
        self.mem.write(ptr, val);
        Ok(())
    }

    fn str(&mut self, instr: Instr) -> Result<(), Fault> {
        let val = self.regs.get(instr.dr());
        self.mem.write(self.base_relative(instr), val);
        Ok(())
    }
}
