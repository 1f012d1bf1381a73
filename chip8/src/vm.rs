//! Virtual machine.
use std::{
    fmt::{self, Write},
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    bytecode::{MathOp, MiscOp, Opcode},
    clock::{Clock, Hz},
    constants::*,
    cpu::Chip8Cpu,
    devices::{KeyCode, Keyboard, Keypad},
    display::{self, Frame, NullScreen, Screen},
    error::{Chip8Error, Chip8Result},
    font::FONTSET,
    memory::check_program_size,
    timer::Timer,
};

/// Upper bound on how long the key wait sleeps before checking the
/// keyboard and interrupt flag again.
const KEY_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    clock: Clock,
    delay_timer: Timer,
    sound_timer: Timer,
    keyboard: Arc<dyn Keyboard>,
    screen: Box<dyn Screen>,
    rng: StdRng,
    interrupt: Interrupt,
    conf: Chip8Conf,
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        let rng = match conf.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Chip8Vm {
            cpu: Chip8Cpu::new(),
            clock: Clock::new(conf.clock_frequency.unwrap_or_default().into()),
            delay_timer: Timer::spawn(),
            sound_timer: Timer::spawn(),
            keyboard: Arc::new(Keypad::new()),
            screen: Box::new(NullScreen),
            rng,
            interrupt: Interrupt::default(),
            conf,
        }
    }

    /// Replace the keyboard the interpreter reads from.
    pub fn with_keyboard(mut self, keyboard: impl Keyboard + 'static) -> Self {
        self.keyboard = Arc::new(keyboard);
        self
    }

    /// Replace the screen that receives the display after drawing.
    pub fn with_screen(mut self, screen: impl Screen + 'static) -> Self {
        self.screen = Box::new(screen);
        self
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    pub fn load_builtin_font(&mut self) -> Chip8Result<()> {
        self.load_font(&FONTSET)
    }

    pub fn load_font(&mut self, fontset: &[u8]) -> Chip8Result<()> {
        if fontset.len() != FONTSET_DATA_LENGTH {
            return Err(Chip8Error::Font(format!(
                "fontset data must be {FONTSET_DATA_LENGTH} bytes, got {}",
                fontset.len()
            )));
        }

        self.cpu.ram.load(FONTSET_START, fontset)
    }

    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if !check_program_size(bytecode) {
            return Err(Chip8Error::LargeProgram {
                size: bytecode.len(),
                capacity: MEM_SIZE - MEM_START,
            });
        }

        // Start with clean memory to avoid leaking previous program.
        self.cpu.clear_memory();

        // Reset fonts
        self.load_builtin_font()?;

        // Load program into virtual RAM
        self.cpu.ram.load(MEM_START, bytecode)?;

        // Reset the program counter to prepare for execution.
        self.cpu.reset_registers();

        self.reset();

        log::debug!("loaded {} byte program", bytecode.len());

        Ok(())
    }

    /// Read a program image from disk and load it.
    pub fn load_rom(&mut self, filepath: impl AsRef<Path>) -> Chip8Result<()> {
        let bytecode = std::fs::read(filepath.as_ref())?;
        log::info!("loading rom {}", filepath.as_ref().display());
        self.load_bytecode(&bytecode)
    }

    pub fn display_buffer(&self) -> &Frame {
        self.cpu.display.buffer()
    }

    pub fn cpu(&self) -> &Chip8Cpu {
        &self.cpu
    }

    pub fn pc(&self) -> Address {
        self.cpu.pc
    }

    pub fn register(&self, reg: u8) -> u8 {
        self.cpu.registers.get(reg)
    }

    pub fn index(&self) -> Address {
        self.cpu.registers.index()
    }

    pub fn stack_depth(&self) -> usize {
        self.cpu.stack_depth()
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer.get()
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer.get()
    }

    /// The buzzer should sound while the sound timer counts down.
    pub fn is_buzzing(&self) -> bool {
        self.sound_timer.is_active()
    }

    /// Handle that other threads can use to stop the interpreter loop.
    pub fn interrupt_handle(&self) -> Interrupt {
        self.interrupt.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Flow {
    Ok,
    Interrupt,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// The display changed and was handed to the screen.
    Draw,
    /// The sound timer was set.
    Sound,
    /// Waited for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed and released, and loads the key value into `Vx`.
    KeyWait,
}

/// VM Configuration Parameters.
#[derive(Debug, Default, Clone)]
pub struct Chip8Conf {
    /// Instruction cycles per second. No value, or zero, runs unthrottled.
    pub clock_frequency: Option<Hz>,
    /// Seed for the `Cxnn` random number generator. Seeded from the
    /// operating system when not given.
    pub rng_seed: Option<u64>,
}

/// Signal for stopping the interpreter loop from another thread.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst)
    }
}

/// Interpreter
impl Chip8Vm {
    /// Clear internal state in preparation for a fresh startup.
    fn reset(&mut self) {
        self.clock.reset();
        self.delay_timer.set(0);
        self.sound_timer.set(0);
        self.interrupt.clear();
    }

    /// Run the program until it is interrupted, or fails.
    ///
    /// There is no halt instruction, so a well behaved program runs until
    /// the [`Interrupt`] is triggered.
    pub fn execute(&mut self) -> Chip8Result<Flow> {
        self.clock.reset();

        loop {
            if let Flow::Interrupt = self.step()? {
                break;
            }
        }

        self.interrupt.clear();
        Ok(Flow::Interrupt)
    }

    /// Run at most `step_count` instructions.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<Flow> {
        let mut flow = Flow::Ok;

        for _ in 0..step_count {
            flow = self.step()?;
            if flow == Flow::Interrupt {
                self.interrupt.clear();
                break;
            }
        }

        Ok(flow)
    }

    /// Execute a single instruction cycle.
    pub fn step(&mut self) -> Chip8Result<Flow> {
        if self.interrupt.is_set() {
            // Interrupt signal is set.
            return Ok(Flow::Interrupt);
        }

        self.clock.wait();

        let address = self.cpu.pc;
        let nibbles = self.cpu.fetch();

        let opcode = match Opcode::decode(nibbles.word()) {
            Some(opcode) => opcode,
            None => {
                let err = Chip8Error::UnknownOpcode {
                    opcode: nibbles.word(),
                    address,
                };
                log::error!("{err}");
                return Err(err);
            }
        };

        op_trace(address, &opcode);

        self.exec(address, opcode)
    }

    fn exec(&mut self, address: Address, opcode: Opcode) -> Chip8Result<Flow> {
        let cpu = &mut self.cpu;
        let regs = &mut cpu.registers;

        let mut control_flow = Flow::Ok;

        match opcode {
            // 00E0 (CLS)
            //
            // Clear display
            Opcode::Cls => {
                cpu.display.clear();
                self.screen.render(cpu.display.buffer());
                control_flow = Flow::Draw;
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // Set the program counter to the value at the top of the stack.
            Opcode::Ret => {
                if cpu.ret().is_none() {
                    let err = Chip8Error::StackUnderflow { address };
                    log::error!("{err}");
                    return Err(err);
                }
                control_flow = Flow::Jump;
            }
            // 1NNN (JP addr)
            //
            // Jump to address.
            Opcode::Jump(nnn) => {
                cpu.jump(nnn);
                control_flow = Flow::Jump;
            }
            // 2NNN (CALL addr)
            //
            // Call subroutine at NNN.
            Opcode::Call(nnn) => {
                cpu.call(nnn);
                control_flow = Flow::Jump;
            }
            // 3XNN (SE Vx, byte)
            //
            // Skip the next instruction if register VX equals value NN.
            Opcode::SkipEqByte { x, nn } => {
                if regs.get(x) == nn {
                    cpu.skip();
                }
            }
            // 4XNN (SNE Vx, byte)
            //
            // Skip the next instruction if register VX does not equal value NN.
            Opcode::SkipNeByte { x, nn } => {
                if regs.get(x) != nn {
                    cpu.skip();
                }
            }
            // 5XY0 (SE Vx, Vy)
            //
            // Skip the next instruction if register VX equals value VY.
            Opcode::SkipEqReg { x, y } => {
                if regs.get(x) == regs.get(y) {
                    cpu.skip();
                }
            }
            // 6XNN (LD Vx, byte)
            //
            // Set register VX to value NN.
            Opcode::LoadByte { x, nn } => {
                regs.set(x, nn as i32);
            }
            // 7xnn (ADD Vx, byte)
            //
            // Add value NN to register VX. Carry flag is not set.
            Opcode::AddByte { x, nn } => {
                regs.set(x, regs.get(x) as i32 + nn as i32);
            }
            // Arithmetic instructions indentified by n
            Opcode::Math { x, y, op } => self.exec_math(x, y, op),
            // 9xy0 (SNE Vx, Vy)
            //
            // Skip next instruction if Vx != Vy.
            Opcode::SkipNeReg { x, y } => {
                if regs.get(x) != regs.get(y) {
                    cpu.skip();
                }
            }
            // Annn (LD I, addr)
            //
            // Set address register I to value NNN.
            Opcode::LoadIndex(nnn) => {
                regs.set_index(nnn as i32);
            }
            // Bnnn (JP V0, addr)
            //
            // Jump to address NNN offset by register V0.
            Opcode::JumpOffset(nnn) => {
                let offset = regs.get(0) as Address;
                cpu.jump(nnn + offset);
                control_flow = Flow::Jump;
            }
            // CXNN (RND Vx, byte)
            //
            // Generate random number.
            // Set register VX to the result of bitwise AND between a random number and NN.
            Opcode::Random { x, nn } => {
                regs.set(x, (self.rng.gen::<u8>() & nn) as i32);
            }
            // Dxyn (DRW Vx, Vy, nibble)
            Opcode::Draw { x, y, n } => control_flow = self.draw_sprite(x, y, n),
            // Ex9E (SKP Vx)
            Opcode::SkipKey { x } => {
                if is_held(&*self.keyboard, regs.get(x)) {
                    cpu.skip();
                }
            }
            // ExA1 (SKNP Vx)
            Opcode::SkipNotKey { x } => {
                if !is_held(&*self.keyboard, regs.get(x)) {
                    cpu.skip();
                }
            }
            // Timer, keyboard and memory instructions identified by nn
            Opcode::Misc { x, op } => control_flow = self.exec_misc(x, op),
        }

        Ok(control_flow)
    }

    /// Execute an arithmetic instruction
    ///
    /// The flag register is always written last, so when VF is also the
    /// target register the flag wins.
    #[inline]
    fn exec_math(&mut self, vx: u8, vy: u8, op: MathOp) {
        let regs = &mut self.cpu.registers;
        let (x, y) = (regs.get(vx) as i32, regs.get(vy) as i32);

        match op {
            // 8XY0 (LD Vx, Vy)
            //
            // Store the value of register VY in register VX.
            MathOp::Load => {
                regs.set(vx, y);
            }
            // 8XY1 (OR Vx, Vy)
            MathOp::Or => {
                regs.set(vx, x | y);
            }
            // 8XY2 (AND Vx, Vy)
            MathOp::And => {
                regs.set(vx, x & y);
            }
            // 8XY3 (XOR Vx, Vy)
            MathOp::Xor => {
                regs.set(vx, x ^ y);
            }
            // 8XY4 (ADD Vx, Vy)
            //
            // ADDs VX to VY, and stores the result in VX.
            // If overflow, set VF to 1, else 0.
            MathOp::Add => {
                let carry = regs.set(vx, x + y);
                regs.set_flag(carry);
            }
            // 8XY5 (SUB Vx, Vy)
            //
            // Subtracts VY from VX, and stores the result in VX.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            MathOp::Sub => {
                let borrow = regs.set(vx, x - y);
                regs.set_flag(!borrow);
            }
            // 8XY6 (SHR Vx, Vy)
            //
            // Store VY shifted right by 1 in VX.
            // VF is set to the bit that was shifted out.
            MathOp::ShiftRight => {
                regs.set(vx, y >> 1);
                regs.set_flag(y & 1 != 0);
            }
            // 8XY7 (SUBN Vx, Vy)
            //
            // Subtracts VX from VY, and stores the result in VX.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            MathOp::SubNeg => {
                let borrow = regs.set(vx, y - x);
                regs.set_flag(!borrow);
            }
            // 8XYE (SHL Vx, Vy)
            //
            // Store VY shifted left by 1 in VX.
            // VF is set to the most significant bit of VY.
            MathOp::ShiftLeft => {
                regs.set(vx, (y << 1) % 256);
                regs.set_flag(y & 0x80 != 0);
            }
        }
    }

    /// Execute a miscellaneous instruction
    #[inline]
    fn exec_misc(&mut self, vx: u8, op: MiscOp) -> Flow {
        let mut control_flow = Flow::Ok;

        let cpu = &mut self.cpu;
        let x = cpu.registers.get(vx);
        let addr = cpu.registers.index() as usize;

        match op {
            // Fx07 (LD Vx, DT)
            //
            // Set Vx = delay timer value.
            MiscOp::LoadDelay => {
                cpu.registers.set(vx, self.delay_timer.get() as i32);
            }
            // Fx0A (LD Vx, K)
            //
            // Wait for a key press, store the value of the key in Vx.
            MiscOp::WaitKey => control_flow = self.wait_key(vx),
            // Fx15 (LD DT, Vx)
            //
            // Set delay timer = Vx.
            MiscOp::SetDelay => {
                self.delay_timer.set(x);
            }
            // Fx18 (LD ST, Vx)
            //
            // Set sound timer = Vx.
            MiscOp::SetSound => {
                self.sound_timer.set(x);
                control_flow = Flow::Sound;
            }
            // Fx1E (ADD I, Vx)
            //
            // Add Vx to I. VF is set when the result goes past the
            // addressable range, but is never cleared.
            MiscOp::AddIndex => {
                let sum = addr as i32 + x as i32;
                cpu.registers.set_index(sum);
                if sum > ADDRESS_MAX as i32 {
                    cpu.registers.set_flag(true);
                }
            }
            // Fx29 (LD F, Vx)
            //
            // Set I to the hexadecimal digit in the low nibble of Vx.
            MiscOp::LoadFont => {
                cpu.registers.set_index((x & 0xF) as i32);
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            #[rustfmt::skip]
            MiscOp::StoreBcd => {
                cpu.ram[addr]     = x / 100;
                cpu.ram[addr + 1] = x / 10  % 10;
                cpu.ram[addr + 2] = x       % 10;
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            MiscOp::StoreRegisters => {
                for (offset, value) in cpu.registers.range(vx).iter().enumerate() {
                    cpu.ram[addr + offset] = *value;
                }
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            MiscOp::LoadRegisters => {
                let ram = &cpu.ram;
                for (offset, value) in cpu.registers.range_mut(vx).iter_mut().enumerate() {
                    *value = ram[addr + offset];
                }
            }
        }

        control_flow
    }

    /// Dxyn (DRW Vx, Vy, nibble)
    ///
    /// Draw sprite to the display buffer, at coordinate as per registers Vx and Vy.
    /// Sprite is encoded as 8 pixels wide, N pixels high, stored in bits located in
    /// memory pointed to by address register I.
    ///
    /// The origin wraps around the display, but the sprite itself is clipped
    /// at the right and bottom edges.
    ///
    /// If the drawing operation erases existing pixels in the display buffer, register VF is set to
    /// 1, and set to 0 if no display bits are unset. This is used for collision detection.
    fn draw_sprite(&mut self, vx: u8, vy: u8, n: u8) -> Flow {
        let cpu = &mut self.cpu;
        let origin_x = cpu.registers.get(vx) as usize % DISPLAY_WIDTH;
        let origin_y = cpu.registers.get(vy) as usize % DISPLAY_HEIGHT;
        let addr = cpu.registers.index() as usize;

        let mut is_erased = false;

        for r in 0..n as usize {
            let y = origin_y + r;
            if y >= DISPLAY_HEIGHT {
                break;
            }

            // Each row is 8 bits representing the 8 pixels of the sprite.
            let row = cpu.ram[addr + r];

            for c in 0..SPRITE_WIDTH {
                let x = origin_x + c;
                if x >= DISPLAY_WIDTH {
                    break;
                }

                if row & (0x80 >> c) != 0 {
                    is_erased |= cpu.display.flip_pixel(x, y);
                }
            }
        }

        cpu.registers.set_flag(is_erased);
        self.screen.render(cpu.display.buffer());

        Flow::Draw
    }

    /// Fx0A (LD Vx, K)
    ///
    /// Blocks until a key, other than the one pressed most recently before
    /// the instruction started, is pressed and then released.
    ///
    /// This is the only point where the interpreter suspends. The timers keep
    /// counting down on their own threads. When interrupted the program counter
    /// is rewound, so the wait starts over once execution resumes.
    fn wait_key(&mut self, vx: u8) -> Flow {
        let keyboard = &*self.keyboard;
        let previous = keyboard.last_pressed();

        log::debug!("waiting for keypress into V{vx:X}");

        let key = loop {
            if self.interrupt.is_set() {
                self.cpu.rewind();
                return Flow::Interrupt;
            }

            match keyboard.last_pressed() {
                Some(key) if Some(key) != previous => break key,
                _ => keyboard.wait_for_change(KEY_POLL_INTERVAL),
            }
        };

        while keyboard.is_held(key) {
            if self.interrupt.is_set() {
                self.cpu.rewind();
                return Flow::Interrupt;
            }

            keyboard.wait_for_change(KEY_POLL_INTERVAL);
        }

        log::debug!("key {key} released");

        self.cpu.registers.set(vx, key.as_u8() as i32);

        Flow::KeyWait
    }
}

/// Register values outside of the keypad range are never held.
#[inline]
fn is_held(keyboard: &dyn Keyboard, value: u8) -> bool {
    KeyCode::try_from(value)
        .map(|key| keyboard.is_held(key))
        .unwrap_or(false)
}

/// Troubleshooting
#[doc(hidden)]
impl Chip8Vm {
    /// Returns the contents of the memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, std::fmt::Error> {
        let ram = self.cpu.ram.as_slice();
        let iter = ram
            .iter()
            .enumerate()
            .skip(MEM_START)
            .take(count)
            .step_by(2);
        let mut buf = String::new();

        for (i, op) in iter {
            let lo = ram.get(i + 1).copied().unwrap_or_default();
            writeln!(buf, "{:04X}: {:02X}{:02X}", i, op, lo)?;
        }

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        display::dump(self.cpu.display.buffer())
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(address: Address, opcode: &Opcode) {
    log::trace!("{:04X}: {}", address, opcode);
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: Address, _: &Opcode) {}
