//! Register file.
use crate::constants::*;

/// General purpose registers V0-VF and the address register I.
///
/// Stores wrap around instead of failing. Every store reports whether the
/// raw value fell outside the range of the register, which is what the
/// arithmetic opcodes use to derive their carry and borrow flags.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    general: [u8; REGISTER_COUNT],
    /// Pointer register used for temporarily storing an address.
    index: Address,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of general purpose register `Vn`.
    ///
    /// # Panics
    ///
    /// When `reg` is not in `0..16`.
    #[inline(always)]
    pub fn get(&self, reg: u8) -> u8 {
        self.general[reg as usize]
    }

    /// Store `value mod 256` in register `Vn`.
    ///
    /// Returns `true` when `value` was negative or larger than 255,
    /// meaning the stored value wrapped.
    ///
    /// # Panics
    ///
    /// When `reg` is not in `0..16`.
    #[inline]
    pub fn set(&mut self, reg: u8, value: i32) -> bool {
        let (wrapped, overflow) = wrap(value, u8::MAX as i32 + 1);
        self.general[reg as usize] = wrapped as u8;
        overflow
    }

    /// Value of the address register I.
    #[inline(always)]
    pub fn index(&self) -> Address {
        self.index
    }

    /// Store `value mod 65536` in the address register I.
    ///
    /// Returns `true` when the stored value wrapped.
    #[inline]
    pub fn set_index(&mut self, value: i32) -> bool {
        let (wrapped, overflow) = wrap(value, u16::MAX as i32 + 1);
        self.index = wrapped as Address;
        overflow
    }

    /// Whether the flag register VF is non-zero.
    #[inline(always)]
    pub fn flag(&self) -> bool {
        self.get(FLAG_REGISTER) != 0
    }

    /// Set the flag register VF to 1 or 0.
    #[inline(always)]
    pub fn set_flag(&mut self, state: bool) {
        self.general[FLAG_REGISTER as usize] = state as u8;
    }

    /// Registers V0 through `Vn` inclusive.
    pub fn range(&self, last: u8) -> &[u8] {
        &self.general[..=last as usize]
    }

    /// Mutable registers V0 through `Vn` inclusive.
    pub fn range_mut(&mut self, last: u8) -> &mut [u8] {
        &mut self.general[..=last as usize]
    }

    /// Reset every register to zero.
    pub fn clear(&mut self) {
        self.general.fill(0);
        self.index = 0;
    }
}

/// Euclidean remainder, so negative values wrap from the top.
#[inline(always)]
fn wrap(value: i32, modulus: i32) -> (i32, bool) {
    (value.rem_euclid(modulus), value < 0 || value >= modulus)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_general_wraps() {
        let mut regs = RegisterFile::new();

        for reg in 0..REGISTER_COUNT as u8 {
            for value in [-513, -256, -1, 0, 1, 127, 255, 256, 257, 511, 1000] {
                let overflow = regs.set(reg, value);
                assert_eq!(regs.get(reg) as i32, value.rem_euclid(256), "V{reg:X} <- {value}");
                assert_eq!(overflow, !(0..256).contains(&value), "V{reg:X} <- {value}");
            }
        }
    }

    #[test]
    fn test_index_wraps() {
        let mut regs = RegisterFile::new();

        assert!(!regs.set_index(0xFFFF));
        assert_eq!(regs.index(), 0xFFFF);

        assert!(regs.set_index(0x10000));
        assert_eq!(regs.index(), 0);

        assert!(regs.set_index(-1));
        assert_eq!(regs.index(), 0xFFFF);

        assert!(!regs.set_index(0x0FFF + 1));
        assert_eq!(regs.index(), 0x1000);
    }

    #[test]
    fn test_flag() {
        let mut regs = RegisterFile::new();
        assert!(!regs.flag());

        regs.set_flag(true);
        assert_eq!(regs.get(0xF), 1);
        assert!(regs.flag());

        regs.set(0xF, 0x80);
        assert!(regs.flag());

        regs.set_flag(false);
        assert_eq!(regs.get(0xF), 0);
    }

    #[test]
    fn test_range() {
        let mut regs = RegisterFile::new();
        regs.range_mut(2).copy_from_slice(&[1, 2, 3]);

        assert_eq!(regs.range(3), &[1, 2, 3, 0]);
        assert_eq!(regs.range(0xF).len(), 16);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_register() {
        let regs = RegisterFile::new();
        regs.get(16);
    }
}
