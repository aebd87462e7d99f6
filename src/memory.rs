use crate::error::{Chip8Error, Result};
use std::io;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: u16 = 4096;

/// where the program is loaded
pub const CHIP8_PROGRAM_ADDR: u16 = 0x0200;

/// where the hex digit glyphs live, 5 bytes each
pub const CHIP8_FONT_ADDR: u16 = 0x050;
pub const CHIP8_FONT_GLYPH_BYTES: u16 = 5;

/// biggest program that fits between the program address and the top of RAM
pub const CHIP8_MAX_PROGRAM_BYTES: usize = (CHIP8_RAM_SIZE_BYTES - CHIP8_PROGRAM_ADDR) as usize;

/// Represents memory map, ROM, RAM etc.
pub trait MemoryMap {
    /// write unknown len of data into memory at a particular address
    fn write_any(&mut self, reader: &mut impl io::Read, addr: u16) -> Result<usize> {
        let mut buf = Vec::new();
        let len = reader.read_to_end(&mut buf)?;
        self.write(&buf, addr)?;
        Ok(len)
    }

    /// write a chunk of bytes into "RAM"
    fn write(&mut self, data: &[u8], addr: u16) -> Result<()> {
        let max = self.len().saturating_sub(addr as usize);
        if data.len() > max {
            return Err(Chip8Error::RomTooLarge {
                len: data.len(),
                max,
            });
        }
        self.get_rw_slice(addr, data.len()).copy_from_slice(data);
        Ok(())
    }

    /// get a big-endian two-byte word (instructions)
    fn get_word(&self, addr: u16) -> u16 {
        u16::from_be_bytes([self.read_byte(addr), self.read_byte(addr.wrapping_add(1))])
    }

    /// single byte; addresses past the top of RAM wrap around
    fn read_byte(&self, addr: u16) -> u8 {
        self.get_ro_slice(addr % self.len() as u16, 1)[0]
    }

    /// single byte; addresses past the top of RAM wrap around
    fn write_byte(&mut self, addr: u16, value: u8) {
        let a = addr % self.len() as u16;
        self.get_rw_slice(a, 1)[0] = value;
    }

    /// size of the underlying memory
    fn len(&self) -> usize;

    /// get a r/w slice of the underlying memory (heap)
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8];

    /// get a r/o slice of the underlying memory (heap)
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8];
}

/// Defines the CHIP-8 memory map used here:
///   0x0000-0x004f  unused
///   0x0050-0x009f  hex digit font, 16 glyphs of 5 bytes
///   0x00a0-0x01ff  unused
///   0x0200-0x0fff  program
///
/// the stack and display live outside addressable memory
#[derive(Clone)]
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
}

impl MemoryMap for Chip8MemoryMap {
    fn len(&self) -> usize {
        self.bytes.len()
    }
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8] {
        let a = addr as usize;
        &mut self.bytes[a..(a + len)]
    }
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8] {
        let a = addr as usize;
        &self.bytes[a..(a + len)]
    }
}

impl Chip8MemoryMap {
    /// initialises CHIP-8 with contemporary memory contents
    pub fn new() -> Self {
        let mut bytes = vec![0u8; CHIP8_RAM_SIZE_BYTES as usize].into_boxed_slice();
        let font = CHIP8_FONT_ADDR as usize;
        bytes[font..font + CHIP8_CONTEMPORARY_FONT.len()].copy_from_slice(&CHIP8_CONTEMPORARY_FONT);
        Chip8MemoryMap { bytes }
    }

    /// load a CHIP-8 program at 0x200, returning its length
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize> {
        self.write_any(reader, CHIP8_PROGRAM_ADDR)
    }

    /// address of the glyph for a hex digit. values above 0xf aren't masked,
    /// so they point past the font
    pub fn glyph_addr(digit: u8) -> u16 {
        CHIP8_FONT_ADDR + CHIP8_FONT_GLYPH_BYTES * u16::from(digit)
    }
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

const CHIP8_CONTEMPORARY_FONT: [u8; 80] = [
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_zeroed() {
        let m = Chip8MemoryMap::new();
        // NB. memory is zeroed from 0x200 because before that we bake in the font
        assert_eq!(m.bytes[0x200..], [0; 0xe00]);
        assert_eq!(m.bytes[..0x50], [0; 0x50]);
        assert_eq!(m.bytes[0xa0..0x200], [0; 0x160]);
    }

    #[test]
    fn test_font_loaded() {
        let m = Chip8MemoryMap::new();
        assert_eq!(m.get_ro_slice(0x050, 5), &[0xF0, 0x90, 0x90, 0x90, 0xF0]);
        assert_eq!(m.get_ro_slice(0x09b, 5), &[0xF0, 0x80, 0xF0, 0x80, 0x80]);
        assert_eq!(Chip8MemoryMap::glyph_addr(0x3), 0x05f);
    }

    #[test]
    fn test_write_any_data_ok() -> Result<()> {
        let mut dst = Chip8MemoryMap::new();
        let mut src: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7];
        assert_eq!(dst.write_any(&mut src, 8)?, 8);
        assert_eq!(
            dst.bytes[..16],
            [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7]
        );
        Ok(())
    }

    #[test]
    fn test_read_word() {
        let mut m = Chip8MemoryMap::new();
        m.write(&[0, 1, 2, 3, 4, 5, 6, 7], 0).unwrap();
        assert_eq!(m.get_word(0x4), 0x0405);
    }

    #[test]
    fn test_byte_access_wraps() {
        let mut m = Chip8MemoryMap::new();
        m.write_byte(0x1000, 0xaa);
        assert_eq!(m.read_byte(0), 0xaa);
        assert_eq!(m.read_byte(0x1000), 0xaa);
    }

    #[test]
    fn test_write_too_much_fails() {
        let mut dst = Chip8MemoryMap::new();
        let mut src: &[u8] = &[0; 8];
        assert!(matches!(
            dst.write_any(&mut src, 4089),
            Err(Chip8Error::RomTooLarge { len: 8, max: 7 })
        ));
    }

    #[test]
    fn test_program_load_ok() -> Result<()> {
        let mut dst = Chip8MemoryMap::new();
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        assert_eq!(dst.load_program(&mut prog)?, 2);
        assert_eq!(dst.get_ro_slice(0x200, 2), &[0x00, 0xe0]);
        Ok(())
    }

    #[test]
    fn test_largest_program_fits() -> Result<()> {
        let mut dst = Chip8MemoryMap::new();
        let big = vec![0x12; CHIP8_MAX_PROGRAM_BYTES];
        assert_eq!(dst.load_program(&mut big.as_slice())?, 0xe00);
        let mut too_big: &[u8] = &[0; CHIP8_MAX_PROGRAM_BYTES + 1];
        assert!(dst.load_program(&mut too_big).is_err());
        Ok(())
    }
}
