//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::Address;

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug)]
pub enum Chip8Error {
    /// The fetched instruction does not match any known opcode.
    ///
    /// This halts the interpreter loop. Execution cannot continue
    /// mid-stream because the program counter is pointing at data.
    UnknownOpcode { opcode: u16, address: Address },
    /// Subroutine return (`00EE`) executed with an empty call stack.
    StackUnderflow { address: Address },
    /// Attempt to load a bytecode program that can't fit in memory.
    LargeProgram { size: usize, capacity: usize },
    /// Custom fontset data is malformed.
    Font(String),
    Io(std::io::Error),
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOpcode { opcode, address } => {
                write!(f, "unknown opcode {opcode:04X} at address {address:04X}")
            }
            Self::StackUnderflow { address } => {
                write!(f, "call stack underflow at address {address:04X}")
            }
            Self::LargeProgram { size, capacity } => write!(
                f,
                "program too large for VM memory: {size} bytes, capacity is {capacity} bytes"
            ),
            Self::Font(msg) => write!(f, "font error: {msg}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Chip8Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Chip8Error {
    fn from(err: std::io::Error) -> Self {
        Chip8Error::Io(err)
    }
}
