//! Built-in hexadecimal glyphs.
use crate::constants::*;

/// Sprites for the digits 0-F, each 5 rows tall.
#[rustfmt::skip]
pub const FONTSET: [u8; FONTSET_DATA_LENGTH] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Glyph rows for a single hexadecimal digit.
pub fn glyph(digit: u8) -> &'static [u8] {
    let start = (digit as usize & 0xF) * FONTSET_HEIGHT;
    &FONTSET[start..start + FONTSET_HEIGHT]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_glyph() {
        assert_eq!(glyph(0x0), &[0xF0, 0x90, 0x90, 0x90, 0xF0]);
        assert_eq!(glyph(0xF), &[0xF0, 0x80, 0xF0, 0x80, 0x80]);
        // only the low nibble selects the glyph
        assert_eq!(glyph(0x1A), glyph(0xA));
    }
}
