//! Instruction decoding.
//!
//! Each instruction is two bytes, big endian, split into four 4-bit nibbles.
//! The first nibble identifies the opcode family, and the remaining nibbles
//! are either operands, or select the operation within the family.
use std::fmt::{self, Display, Formatter};

use crate::constants::Address;

/// The four 4-bit fields of an instruction, most significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nibbles(pub [u8; 4]);

impl Nibbles {
    #[inline(always)]
    pub fn from_word(word: u16) -> Self {
        Self([
            (word >> 12) as u8 & 0xF,
            (word >> 8) as u8 & 0xF,
            (word >> 4) as u8 & 0xF,
            word as u8 & 0xF,
        ])
    }

    #[inline(always)]
    pub fn from_bytes([a, b]: [u8; 2]) -> Self {
        Self::from_word(u16::from_be_bytes([a, b]))
    }

    /// Opcode family, 0xF000
    #[inline(always)]
    pub fn op(&self) -> u8 {
        self.0[0]
    }

    /// Register operand VX, 0x0F00
    #[inline(always)]
    pub fn x(&self) -> u8 {
        self.0[1]
    }

    /// Register operand VY, 0x00F0
    #[inline(always)]
    pub fn y(&self) -> u8 {
        self.0[2]
    }

    /// 0x000F
    #[inline(always)]
    pub fn n(&self) -> u8 {
        self.0[3]
    }

    /// 0x00FF
    #[inline(always)]
    pub fn nn(&self) -> u8 {
        (self.0[2] << 4) | self.0[3]
    }

    /// 0x0FFF
    #[inline(always)]
    pub fn nnn(&self) -> Address {
        ((self.0[1] as u16) << 8) | self.nn() as u16
    }

    pub fn word(&self) -> u16 {
        ((self.0[0] as u16) << 12) | self.nnn()
    }
}

/// Decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// 00E0
    Cls,
    /// 00EE
    Ret,
    /// 1NNN
    Jump(Address),
    /// 2NNN
    Call(Address),
    /// 3XNN
    SkipEqByte { x: u8, nn: u8 },
    /// 4XNN
    SkipNeByte { x: u8, nn: u8 },
    /// 5XY0
    SkipEqReg { x: u8, y: u8 },
    /// 6XNN
    LoadByte { x: u8, nn: u8 },
    /// 7XNN
    AddByte { x: u8, nn: u8 },
    /// 8XYN
    Math { x: u8, y: u8, op: MathOp },
    /// 9XY0
    SkipNeReg { x: u8, y: u8 },
    /// ANNN
    LoadIndex(Address),
    /// BNNN
    JumpOffset(Address),
    /// CXNN
    Random { x: u8, nn: u8 },
    /// DXYN
    Draw { x: u8, y: u8, n: u8 },
    /// EX9E
    SkipKey { x: u8 },
    /// EXA1
    SkipNotKey { x: u8 },
    /// FXNN
    Misc { x: u8, op: MiscOp },
}

/// Arithmetic and logic operations of the 8XYN family, selected by N.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    /// 8XY0
    Load,
    /// 8XY1
    Or,
    /// 8XY2
    And,
    /// 8XY3
    Xor,
    /// 8XY4
    Add,
    /// 8XY5
    Sub,
    /// 8XY6
    ShiftRight,
    /// 8XY7
    SubNeg,
    /// 8XYE
    ShiftLeft,
}

/// Timer, memory and keyboard operations of the FXNN family, selected by NN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiscOp {
    /// FX07
    LoadDelay,
    /// FX0A
    WaitKey,
    /// FX15
    SetDelay,
    /// FX18
    SetSound,
    /// FX1E
    AddIndex,
    /// FX29
    LoadFont,
    /// FX33
    StoreBcd,
    /// FX55
    StoreRegisters,
    /// FX65
    LoadRegisters,
}

impl MathOp {
    pub fn decode(n: u8) -> Option<Self> {
        match n {
            0x0 => Some(Self::Load),
            0x1 => Some(Self::Or),
            0x2 => Some(Self::And),
            0x3 => Some(Self::Xor),
            0x4 => Some(Self::Add),
            0x5 => Some(Self::Sub),
            0x6 => Some(Self::ShiftRight),
            0x7 => Some(Self::SubNeg),
            0xE => Some(Self::ShiftLeft),
            _ => None,
        }
    }
}

impl MiscOp {
    pub fn decode(nn: u8) -> Option<Self> {
        match nn {
            0x07 => Some(Self::LoadDelay),
            0x0A => Some(Self::WaitKey),
            0x15 => Some(Self::SetDelay),
            0x18 => Some(Self::SetSound),
            0x1E => Some(Self::AddIndex),
            0x29 => Some(Self::LoadFont),
            0x33 => Some(Self::StoreBcd),
            0x55 => Some(Self::StoreRegisters),
            0x65 => Some(Self::LoadRegisters),
            _ => None,
        }
    }
}

impl Opcode {
    /// Decode an instruction word.
    ///
    /// Every opcode family has a handler, but the families `0`, `8`, `E` and `F`
    /// only define some of their sub-operations. Anything else returns `None`.
    pub fn decode(word: u16) -> Option<Self> {
        let nibbles = Nibbles::from_word(word);
        let (x, y, n, nn, nnn) = (
            nibbles.x(),
            nibbles.y(),
            nibbles.n(),
            nibbles.nn(),
            nibbles.nnn(),
        );

        match nibbles.op() {
            0x0 => match nnn {
                0x0E0 => Some(Self::Cls),
                0x0EE => Some(Self::Ret),
                _ => None,
            },
            0x1 => Some(Self::Jump(nnn)),
            0x2 => Some(Self::Call(nnn)),
            0x3 => Some(Self::SkipEqByte { x, nn }),
            0x4 => Some(Self::SkipNeByte { x, nn }),
            0x5 => Some(Self::SkipEqReg { x, y }),
            0x6 => Some(Self::LoadByte { x, nn }),
            0x7 => Some(Self::AddByte { x, nn }),
            0x8 => MathOp::decode(n).map(|op| Self::Math { x, y, op }),
            0x9 => Some(Self::SkipNeReg { x, y }),
            0xA => Some(Self::LoadIndex(nnn)),
            0xB => Some(Self::JumpOffset(nnn)),
            0xC => Some(Self::Random { x, nn }),
            0xD => Some(Self::Draw { x, y, n }),
            0xE => match nn {
                0x9E => Some(Self::SkipKey { x }),
                0xA1 => Some(Self::SkipNotKey { x }),
                _ => None,
            },
            0xF => MiscOp::decode(nn).map(|op| Self::Misc { x, op }),
            // The family is a 4-bit field, so every value is covered above.
            _ => None,
        }
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use MathOp as M;
        use MiscOp as F;

        match *self {
            Self::Cls => write!(f, "CLS"),
            Self::Ret => write!(f, "RET"),
            Self::Jump(nnn) => write!(f, "JP {nnn:03X}"),
            Self::Call(nnn) => write!(f, "CALL {nnn:03X}"),
            Self::SkipEqByte { x, nn } => write!(f, "SE V{x:X}, {nn:02X}"),
            Self::SkipNeByte { x, nn } => write!(f, "SNE V{x:X}, {nn:02X}"),
            Self::SkipEqReg { x, y } => write!(f, "SE V{x:X}, V{y:X}"),
            Self::LoadByte { x, nn } => write!(f, "LD V{x:X}, {nn:02X}"),
            Self::AddByte { x, nn } => write!(f, "ADD V{x:X}, {nn:02X}"),
            Self::Math { x, y, op } => {
                let name = match op {
                    M::Load => "LD",
                    M::Or => "OR",
                    M::And => "AND",
                    M::Xor => "XOR",
                    M::Add => "ADD",
                    M::Sub => "SUB",
                    M::ShiftRight => "SHR",
                    M::SubNeg => "SUBN",
                    M::ShiftLeft => "SHL",
                };
                write!(f, "{name} V{x:X}, V{y:X}")
            }
            Self::SkipNeReg { x, y } => write!(f, "SNE V{x:X}, V{y:X}"),
            Self::LoadIndex(nnn) => write!(f, "LD I, {nnn:03X}"),
            Self::JumpOffset(nnn) => write!(f, "JP V0, {nnn:03X}"),
            Self::Random { x, nn } => write!(f, "RND V{x:X}, {nn:02X}"),
            Self::Draw { x, y, n } => write!(f, "DRW V{x:X}, V{y:X}, {n:X}"),
            Self::SkipKey { x } => write!(f, "SKP V{x:X}"),
            Self::SkipNotKey { x } => write!(f, "SKNP V{x:X}"),
            Self::Misc { x, op } => match op {
                F::LoadDelay => write!(f, "LD V{x:X}, DT"),
                F::WaitKey => write!(f, "LD V{x:X}, K"),
                F::SetDelay => write!(f, "LD DT, V{x:X}"),
                F::SetSound => write!(f, "LD ST, V{x:X}"),
                F::AddIndex => write!(f, "ADD I, V{x:X}"),
                F::LoadFont => write!(f, "LD F, V{x:X}"),
                F::StoreBcd => write!(f, "LD B, V{x:X}"),
                F::StoreRegisters => write!(f, "LD [I], V{x:X}"),
                F::LoadRegisters => write!(f, "LD V{x:X}, [I]"),
            },
        }
    }
}
