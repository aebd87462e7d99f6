use std::fmt;
use std::ops::{BitOr, BitOrAssign};

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;
/// each row is packed MSB-first, one bit per pixel
pub const ROW_BYTES: usize = SCREEN_WIDTH / 8;
pub const FRAMEBUFFER_BYTES: usize = ROW_BYTES * SCREEN_HEIGHT;

/// 64x32 monochrome bitmap, stored as 32 rows of 8 bytes
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Framebuffer {
    rows: [[u8; ROW_BYTES]; SCREEN_HEIGHT],
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            rows: [[0; ROW_BYTES]; SCREEN_HEIGHT],
        }
    }

    /// build from row-major packed data, as in [`CHIP8_TEST_CARD`]
    pub fn from_bytes(data: &[u8; FRAMEBUFFER_BYTES]) -> Self {
        let mut fb = Framebuffer::new();
        for (row, chunk) in fb.rows.iter_mut().zip(data.chunks_exact(ROW_BYTES)) {
            row.copy_from_slice(chunk);
        }
        fb
    }

    pub fn clear(&mut self) {
        self.rows = [[0; ROW_BYTES]; SCREEN_HEIGHT];
    }

    pub fn row(&self, y: usize) -> &[u8; ROW_BYTES] {
        &self.rows[y]
    }

    /// XOR `bits` into byte-column `col` of row `y`, returning whether any
    /// pixel that was already lit got hit
    pub fn xor_byte(&mut self, y: usize, col: usize, bits: u8) -> bool {
        let byte = &mut self.rows[y][col];
        let collided = *byte & bits != 0;
        *byte ^= bits;
        collided
    }

    pub fn is_lit(&self, x: usize, y: usize) -> bool {
        (self.rows[y][x / 8] >> (7 - x % 8)) & 1 == 1
    }

    pub fn is_blank(&self) -> bool {
        self.rows.iter().flatten().all(|b| *b == 0)
    }

    /// every lit pixel as (x, y), row by row
    pub fn lit_pixels(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        let mut count = 0;
        std::iter::from_fn(move || {
            while count < SCREEN_WIDTH * SCREEN_HEIGHT {
                let (x, y) = (count % SCREEN_WIDTH, count / SCREEN_WIDTH);
                count += 1;
                if self.is_lit(x, y) {
                    return Some((x as u8, y as u8));
                }
            }
            None
        })
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl BitOrAssign for Framebuffer {
    fn bitor_assign(&mut self, rhs: Self) {
        for (row, other) in self.rows.iter_mut().zip(rhs.rows.iter()) {
            for (byte, bits) in row.iter_mut().zip(other.iter()) {
                *byte |= bits;
            }
        }
    }
}

impl BitOr for Framebuffer {
    type Output = Framebuffer;

    fn bitor(mut self, rhs: Self) -> Framebuffer {
        self |= rhs;
        self
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.rows.iter().enumerate() {
            write!(f, "{:02} ", y)?;
            for byte in row {
                write!(f, "{:08b}", byte)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}


/// this is a display test card suitable for CHIP8, for testing display routines
#[rustfmt::skip]
pub const CHIP8_TEST_CARD: [u8; FRAMEBUFFER_BYTES] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // 00 XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|
    0x80, 0x00, 0x00, 0x01, 0x80, 0x00, 0x00, 0x01, // 01 X                              |X                              |
    0x80, 0x00, 0x00, 0x03, 0xc2, 0x41, 0x55, 0x55, // 02 X                             X|XX    X  X     | X X X | X X X |
    0x81, 0xff, 0xff, 0xc5, 0xa2, 0x40, 0xaa, 0xa9, // 03 X      |XXXXXXX|XXXXXXX|XX   X |X X   X  X      X X X X X X X  |
    0x80, 0x00, 0x00, 0x09, 0x92, 0x41, 0x55, 0x55, // 04 X                           X  |X  X  X  X     | X X X | X X X |
    0x81, 0xff, 0xff, 0xc1, 0x82, 0x40, 0xaa, 0xa9, // 05 X      |XXXXXXX|XXXXXXX|XX     |X     X  X      X X X X X X X  |
    0xa0, 0x00, 0x00, 0x01, 0x83, 0xc1, 0x55, 0x55, // 06 X X                            |X     X|XX     | X X X | X X X |
    0xa1, 0xff, 0xff, 0xc1, 0x80, 0x00, 0xaa, 0xa9, // 07 X X    |XXXXXXX|XXXXXXX|XX     |X               X X X X X X X  |
    0xa0, 0x00, 0x00, 0x00, 0x00, 0x01, 0x55, 0x55, // 08 X X                                            | X X X | X X X |
    0xa1, 0xff, 0xff, 0xc0, 0x00, 0x00, 0xaa, 0xa9, // 09 X X    |XXXXXXX|XXXXXXX|XX                      X X X X X X X  |
    0xbc, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, // 10 X XXXX                                                         |
    0x81, 0xff, 0xff, 0xc0, 0x00, 0x00, 0x00, 0x01, // 11 X      |XXXXXXX|XXXXXXX|XX                                     |
    0x88, 0x00, 0x00, 0x01, 0x80, 0x00, 0x00, 0x11, // 12 X   X                          |X                          X   |
    0x91, 0xff, 0xff, 0xc1, 0x80, 0x00, 0x00, 0x09, // 13 X  X   |XXXXXXX|XXXXXXX|XX     |X                           X  |
    0xa0, 0x00, 0x00, 0x01, 0x80, 0x00, 0x00, 0x05, // 14 X X                            |X                            X |
    0xff, 0x80, 0x00, 0x1f, 0xf8, 0x00, 0x01, 0xff, // 15 XXXXXXX|X                  XXXX|XXXXX                  |XXXXXXX|
    0xff, 0x80, 0x00, 0x1f, 0xf8, 0x00, 0x01, 0xff, // 16 XXXXXXX|X                  XXXX|XXXXX                  |XXXXXXX|
    0xa0, 0x00, 0x00, 0x01, 0x80, 0x00, 0x00, 0x05, // 17 X X                            |X                            X |
    0x90, 0x00, 0x00, 0x01, 0x85, 0x55, 0x55, 0x09, // 18 X  X                           |X    X | X X X | X X X |    X  |
    0x88, 0x00, 0x00, 0x01, 0x85, 0x55, 0x55, 0x11, // 19 X   X                          |X    X | X X X | X X X |   X   |
    0x80, 0x00, 0x00, 0x00, 0x05, 0x55, 0x55, 0x01, // 20 X                                    X | X X X | X X X |       |
    0x80, 0x00, 0x00, 0x00, 0x05, 0x55, 0x55, 0x3d, // 21 X                                    X | X X X | X X X |  XXXX |
    0x95, 0x55, 0x40, 0x00, 0x05, 0x55, 0x55, 0x25, // 22 X  X X | X X X | X                   X | X X X | X X X |  X  X |
    0xaa, 0xaa, 0x80, 0x00, 0x05, 0x55, 0x55, 0x3d, // 23 X X X X X X X X X                    X | X X X | X X X |  XXXX |
    0x95, 0x55, 0x40, 0x01, 0x85, 0x55, 0x55, 0x29, // 24 X  X X | X X X | X             |X    X | X X X | X X X |  X X  |
    0xaa, 0xaa, 0x83, 0xc1, 0x85, 0x55, 0x55, 0x25, // 25 X X X X X X X X X     X|XX     |X    X | X X X | X X X |  X  X |
    0x95, 0x55, 0x41, 0x41, 0x85, 0x55, 0x55, 0x01, // 26 X  X X | X X X | X     | X     |X    X | X X X | X X X |       |
    0xaa, 0xaa, 0x81, 0x49, 0x95, 0x55, 0x55, 0x01, // 27 X X X X X X X X X      | X  X  |X  X X | X X X | X X X |       |
    0x95, 0x55, 0x41, 0x45, 0xa5, 0x55, 0x55, 0x01, // 28 X  X X | X X X | X     | X   X |X X  X | X X X | X X X |       |
    0xaa, 0xaa, 0x83, 0xc3, 0xc5, 0x55, 0x55, 0x01, // 29 X X X X X X X X X     X|XX    X|XX   X | X X X | X X X |       |
    0x80, 0x00, 0x00, 0x01, 0x80, 0x00, 0x00, 0x01, // 30 X                              |X                              |
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // 31 XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|XXXXXXX|
]; //                                                  .. 0......78......f0......78......f0......78......f0......78......f
