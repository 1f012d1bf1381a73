//! CPU and memory state.
use crate::{
    bytecode::Nibbles, constants::*, display::Display, memory::Memory, registers::RegisterFile,
};

/// Core state for a chip8 interpreter.
///
/// Only the interpreter thread touches this state, so none of it is
/// synchronized. The timers live in the virtual machine since they are
/// shared with their countdown threads.
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the next instruction in memory.
    pub(crate) pc: Address,
    /// General purpose registers V0-VF and the address register I.
    pub(crate) registers: RegisterFile,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Memory,
    /// Stack of return pointers used for jumping when a routine call finishes.
    ///
    /// Nesting depth is not limited.
    pub(crate) stack: Vec<Address>,
    /// Screen buffer that is drawn too.
    pub(crate) display: Display,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        Self {
            pc: MEM_START as Address,
            registers: RegisterFile::new(),
            ram: Memory::new(),
            stack: Vec::new(),
            display: Display::new(),
        }
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    /// Erase the contents of the memory buffers `ram`, `stack` and `display`.
    pub(crate) fn clear_memory(&mut self) {
        self.ram.clear();
        self.stack.clear();
        self.display.clear();
    }

    /// Put registers back to their power-on state, with the program
    /// counter at the start of the program.
    pub(crate) fn reset_registers(&mut self) {
        self.pc = MEM_START as Address;
        self.registers.clear();
    }

    /// Read the instruction at the program counter, and advance past it.
    ///
    /// This is the only place where the program counter moves implicitly.
    #[inline]
    pub fn fetch(&mut self) -> Nibbles {
        let hi = self.ram.get(self.pc as usize);
        self.pc = self.pc.wrapping_add(1);
        let lo = self.ram.get(self.pc as usize);
        self.pc = self.pc.wrapping_add(1);

        Nibbles::from_bytes([hi, lo])
    }

    /// Skip over the next instruction.
    #[inline(always)]
    pub fn skip(&mut self) {
        self.pc = self.pc.wrapping_add(INSTRUCTION_SIZE);
    }

    /// Move the program counter back to the instruction that was just fetched.
    #[inline(always)]
    pub(crate) fn rewind(&mut self) {
        self.pc = self.pc.wrapping_sub(INSTRUCTION_SIZE);
    }

    #[inline(always)]
    pub fn jump(&mut self, address: Address) {
        self.pc = address;
    }

    /// Push the return address, and jump into the subroutine.
    pub fn call(&mut self, address: Address) {
        self.stack.push(self.pc);
        self.pc = address;
    }

    /// Pop the return address into the program counter.
    ///
    /// Returns `None`, leaving the program counter unchanged, when the
    /// stack is empty.
    pub fn ret(&mut self) -> Option<Address> {
        let address = self.stack.pop()?;
        self.pc = address;
        Some(address)
    }

    pub fn pc(&self) -> Address {
        self.pc
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn ram(&self) -> &Memory {
        &self.ram
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }
}
