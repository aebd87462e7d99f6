use crate::error::Result;
use crate::instruction::Instruction;
use crate::memory::CHIP8_PROGRAM_ADDR;
use std::fmt::Write;
use std::fs;
use std::path::Path;

/// whole rom file as bytes; size is checked when it's loaded
pub fn read_rom(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    tracing::debug!("read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Rom bytes from a hex string such as `"a2cc 6a06"`. Whitespace anywhere is
/// ignored, so listings can be pasted in.
pub fn from_hex(text: &str) -> Result<Vec<u8>> {
    let digits: String = text.split_whitespace().collect();
    Ok(hex::decode(digits)?)
}

/// one line per instruction word, addressed from where the program loads
pub fn listing(rom: &[u8]) -> String {
    let mut out = String::new();
    for (i, word) in rom.chunks(2).enumerate() {
        let addr = CHIP8_PROGRAM_ADDR as usize + 2 * i;
        // writing to a String can't fail
        let _ = match word {
            [hi, lo] => {
                let opcode = u16::from_be_bytes([*hi, *lo]);
                writeln!(
                    out,
                    "0x{:03x}: {:04x}  {}",
                    addr,
                    opcode,
                    Instruction::decode(opcode)
                )
            }
            [odd] => writeln!(out, "0x{:03x}: {:02x}", addr, odd),
            _ => Ok(()),
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Chip8Error;

    #[test]
    fn test_from_hex() -> Result<()> {
        assert_eq!(from_hex("a2cc 6a06")?, vec![0xa2, 0xcc, 0x6a, 0x06]);
        assert_eq!(from_hex("A2CC\n\t6A06\n")?, vec![0xa2, 0xcc, 0x6a, 0x06]);
        assert!(from_hex("")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_from_hex_rejects_junk() {
        assert!(matches!(from_hex("a2c"), Err(Chip8Error::InvalidHex(_))));
        assert!(matches!(from_hex("zz00"), Err(Chip8Error::InvalidHex(_))));
    }

    #[test]
    fn test_listing() {
        let l = listing(&[0xa0, 0x55, 0x60, 0x08, 0x12]);
        let lines: Vec<&str> = l.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "0x200: a055  LD I, 0x055");
        assert!(lines[1].starts_with("0x202: 6008  "));
        assert_eq!(lines[2], "0x204: 12");
    }

    #[test]
    fn test_read_missing_rom() {
        assert!(matches!(
            read_rom("/definitely/not/a/rom.ch8"),
            Err(Chip8Error::Io(_))
        ));
    }
}
