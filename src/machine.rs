//! Everything the CHIP-8 program can see: registers, memory, stack, timers
//! and the screen. No behaviour beyond bookkeeping lives here; the
//! interpreter does the mutating.

use crate::error::{Chip8Error, Result};
use crate::framebuffer::Framebuffer;
use crate::memory::{Chip8MemoryMap, MemoryMap, CHIP8_PROGRAM_ADDR};
use std::fmt;
use std::io;

pub const STACK_DEPTH: usize = 16;
/// V[0xF] doubles as carry / borrow / collision / shifted-out bit
pub const FLAG_REGISTER: usize = 0xF;

#[derive(Clone)]
pub struct Machine {
    pub memory: Chip8MemoryMap,
    /// V0..VF
    pub registers: [u8; 16],
    pub index_register: u16,
    pub program_counter: u16,
    pub stack: [u16; STACK_DEPTH],
    /// number of frames currently pushed
    pub sp: usize,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub framebuffer: Framebuffer,
    /// length of the loaded program; running past it ends the run
    pub romlength: u16,
    /// most recently fetched instruction, kept for diagnostics
    pub opcode: u16,
}

impl Machine {
    /// font loaded, no program, PC at the program start
    pub fn new() -> Self {
        Machine {
            memory: Chip8MemoryMap::new(),
            registers: [0; 16],
            index_register: 0,
            program_counter: CHIP8_PROGRAM_ADDR,
            stack: [0; STACK_DEPTH],
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            framebuffer: Framebuffer::new(),
            romlength: 0,
            opcode: 0,
        }
    }

    /// shorthand for a fresh machine with `rom` loaded at 0x200
    pub fn with_rom(rom: &[u8]) -> Result<Self> {
        let mut m = Machine::new();
        m.load_program(&mut &rom[..])?;
        Ok(m)
    }

    /// load a chip8 program
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<()> {
        let len = self.memory.load_program(reader)?;
        // load_program caps len at 0xe00
        self.romlength = len as u16;
        Ok(())
    }

    /// the big-endian instruction word at PC
    pub fn fetch(&self) -> u16 {
        self.memory.get_word(self.program_counter)
    }

    pub fn v(&self, x: u8) -> u8 {
        self.registers[x as usize]
    }

    pub fn set_v(&mut self, x: u8, value: u8) {
        self.registers[x as usize] = value;
    }

    pub fn flag(&self) -> u8 {
        self.registers[FLAG_REGISTER]
    }

    pub fn set_flag(&mut self, value: bool) {
        self.registers[FLAG_REGISTER] = value as u8;
    }

    pub fn push(&mut self, addr: u16) -> Result<()> {
        if self.sp >= STACK_DEPTH {
            return Err(Chip8Error::StackOverflow {
                pc: self.program_counter,
            });
        }
        self.stack[self.sp] = addr;
        self.sp += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16> {
        if self.sp == 0 {
            return Err(Chip8Error::StackUnderflow {
                pc: self.program_counter,
            });
        }
        self.sp -= 1;
        Ok(self.stack[self.sp])
    }

    /// true once PC has left the loaded program, in either direction
    pub fn past_rom_end(&self) -> bool {
        self.program_counter < CHIP8_PROGRAM_ADDR
            || self.program_counter - CHIP8_PROGRAM_ADDR >= self.romlength
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

/// state dump, printed by the binary in debug mode
impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PC: 0x{:03x}", self.program_counter)?;
        writeln!(f, "I: 0x{:03x}", self.index_register)?;
        writeln!(f, "Opcode: 0x{:04x}", self.opcode)?;
        writeln!(f, "V: {:02x?}", self.registers)?;
        writeln!(f, "DT: {}", self.delay_timer)?;
        writeln!(f, "ST: {}", self.sound_timer)?;
        writeln!(f, "SP: {}", self.sp)?;
        writeln!(f, "Stack: {:03x?}", self.stack)?;
        writeln!(f, "Screen:")?;
        write!(f, "{:?}", self.framebuffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_machine() {
        let m = Machine::new();
        assert_eq!(m.program_counter, 0x200);
        assert_eq!(m.sp, 0);
        assert_eq!(m.registers, [0; 16]);
        assert!(m.framebuffer.is_blank());
        // nothing loaded, so we're already past the end
        assert!(m.past_rom_end());
    }

    #[test]
    fn test_load_rom() -> Result<()> {
        let m = Machine::with_rom(&[0x60, 0x08, 0xa0, 0x55])?;
        assert_eq!(m.romlength, 4);
        assert_eq!(m.fetch(), 0x6008);
        assert!(!m.past_rom_end());
        Ok(())
    }

    #[test]
    fn test_past_rom_end() -> Result<()> {
        let mut m = Machine::with_rom(&[0x00, 0xe0])?;
        m.program_counter = 0x202;
        assert!(m.past_rom_end());
        m.program_counter = 0x1fe;
        assert!(m.past_rom_end());
        Ok(())
    }

    #[test]
    fn test_stack_limits() {
        let mut m = Machine::new();
        assert!(matches!(m.pop(), Err(Chip8Error::StackUnderflow { pc: 0x200 })));
        for i in 0..STACK_DEPTH as u16 {
            m.push(0x200 + 2 * i).unwrap();
        }
        assert!(matches!(m.push(0x300), Err(Chip8Error::StackOverflow { .. })));
        assert_eq!(m.pop().unwrap(), 0x21e);
        assert_eq!(m.sp, STACK_DEPTH - 1);
    }

    #[test]
    fn test_flag_is_vf() {
        let mut m = Machine::new();
        m.set_flag(true);
        assert_eq!(m.v(0xf), 1);
        m.set_v(0xf, 0);
        assert_eq!(m.flag(), 0);
    }

    #[test]
    fn test_state_dump_mentions_registers() {
        let m = Machine::new();
        let dump = m.to_string();
        assert!(dump.starts_with("PC: 0x200\n"));
        assert!(dump.contains("SP: 0"));
    }
}
