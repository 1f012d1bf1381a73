mod bytecode;
mod clock;
pub mod constants;
mod cpu;
mod devices;
mod display;
mod error;
mod font;
mod memory;
mod registers;
mod timer;
mod vm;

pub use self::{
    bytecode::{MathOp, MiscOp, Nibbles, Opcode},
    clock::Hz,
    devices::{InvalidKeyCode, KeyCode, Keyboard, Keypad},
    display::{dump as dump_frame, Display, Frame, FrameReceiver, FrameSender, NullScreen, Screen},
    font::{glyph, FONTSET},
    memory::Memory,
    registers::RegisterFile,
    timer::Timer,
    vm::{Flow, Interrupt},
};

/// Crate version reported by front-ends.
pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        cpu::Chip8Cpu,
        devices::{KeyCode, Keyboard, Keypad},
        display::{FrameReceiver, FrameSender, Screen},
        error::{Chip8Error, Chip8Result},
        vm::{Chip8Conf, Chip8Vm, Flow},
        Hz,
    };
}
