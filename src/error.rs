use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Chip8Error>;

/// which screen axis a draw instruction went out of range on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "X"),
            Axis::Y => write!(f, "Y"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Chip8Error {
    // fatal: the program broke the machine's contract
    #[error("stack underflow: RET with empty stack - PC: 0x{pc:03x}")]
    StackUnderflow { pc: u16 },
    #[error("stack overflow: CALL with full stack - PC: 0x{pc:03x}")]
    StackOverflow { pc: u16 },
    #[error("illegal jump to 0x{target:03x} - PC: 0x{pc:03x}, opcode: 0x{opcode:04x}")]
    IllegalJump { pc: u16, opcode: u16, target: u16 },
    #[error("illegal DRAW instruction {axis} - PC: 0x{pc:03x}, opcode: 0x{opcode:04x}")]
    IllegalDraw { axis: Axis, pc: u16, opcode: u16 },

    // setup and host
    #[error("rom is {len} bytes, at most {max} fit in memory")]
    RomTooLarge { len: usize, max: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid hex rom: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("invalid keymap: {0}")]
    InvalidKeymap(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl Chip8Error {
    /// fatal errors are the ones raised by a misbehaving program, as opposed
    /// to the host failing
    pub fn is_fatal_program_error(&self) -> bool {
        matches!(
            self,
            Chip8Error::StackUnderflow { .. }
                | Chip8Error::StackOverflow { .. }
                | Chip8Error::IllegalJump { .. }
                | Chip8Error::IllegalDraw { .. }
        )
    }
}
