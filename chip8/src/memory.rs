//! Main memory.
use std::ops::{Index, IndexMut};

use crate::{
    constants::*,
    error::{Chip8Error, Chip8Result},
};

/// Flat byte addressable memory of 4096 cells.
///
/// There is no paging or access control. Addresses are computed by the
/// interpreter from register contents, so staying in bounds is the
/// responsibility of the running program.
pub struct Memory {
    ram: Box<[u8; MEM_SIZE]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            ram: Box::new([0; MEM_SIZE]),
        }
    }
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the byte at `address`.
    ///
    /// # Panics
    ///
    /// When `address` is outside of `0..4096`. An out of bounds access
    /// means the program is malformed, and is not clamped.
    #[inline(always)]
    pub fn get(&self, address: usize) -> u8 {
        self.ram[address]
    }

    /// Write a byte at `address`.
    ///
    /// # Panics
    ///
    /// When `address` is outside of `0..4096`.
    #[inline(always)]
    pub fn set(&mut self, address: usize, value: u8) {
        self.ram[address] = value;
    }

    /// Copy the given bytes verbatim into memory, starting at `offset`.
    pub fn load(&mut self, offset: usize, data: &[u8]) -> Chip8Result<()> {
        let capacity = MEM_SIZE.saturating_sub(offset);
        if data.len() > capacity {
            return Err(Chip8Error::LargeProgram {
                size: data.len(),
                capacity,
            });
        }

        self.ram[offset..offset + data.len()].copy_from_slice(data);

        Ok(())
    }

    /// Zero fill the whole memory.
    pub fn clear(&mut self) {
        self.ram.fill(0);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.ram[..]
    }
}

impl Index<usize> for Memory {
    type Output = u8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.ram[index]
    }
}

impl IndexMut<usize> for Memory {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.ram[index]
    }
}

/// Checks whether a program fits in the memory space after the fonts.
pub fn check_program_size(bytecode: &[u8]) -> bool {
    bytecode.len() <= MEM_SIZE - MEM_START
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load() {
        let mut mem = Memory::new();
        mem.load(MEM_START, &[0xA2, 0x2A, 0x60, 0x0C]).unwrap();

        assert_eq!(mem.get(MEM_START), 0xA2);
        assert_eq!(mem[MEM_START + 3], 0x0C);
        assert_eq!(mem.get(MEM_START + 4), 0);
    }

    #[test]
    fn test_load_large() {
        let mut mem = Memory::new();

        let exact = vec![0xFF; MEM_SIZE - MEM_START];
        assert!(check_program_size(&exact));
        mem.load(MEM_START, &exact).unwrap();
        assert_eq!(mem.get(MEM_SIZE - 1), 0xFF);

        let large = vec![0xFF; MEM_SIZE - MEM_START + 1];
        assert!(!check_program_size(&large));
        assert!(matches!(
            mem.load(MEM_START, &large),
            Err(Chip8Error::LargeProgram {
                size: 3585,
                capacity: 3584
            })
        ));
    }

    #[test]
    fn test_clear() {
        let mut mem = Memory::new();
        mem.set(0x300, 7);
        mem[0xFFF] = 9;
        mem.clear();
        assert!(mem.as_slice().iter().all(|b| *b == 0));
    }

    #[test]
    #[should_panic]
    fn test_out_of_range() {
        let mem = Memory::new();
        mem.get(MEM_SIZE);
    }
}
