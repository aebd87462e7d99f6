use std::fmt;

/// register index, 0x0-0xF
pub type Reg = u8;

/// One decoded CHIP-8 instruction. Decoding never fails: anything the
/// instruction set doesn't define lands in `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    ClearScreen,
    /// 00EE
    Return,
    /// 0nnn, ignored
    Sys(u16),
    /// 1nnn
    Jump(u16),
    /// 2nnn
    Call(u16),
    /// 3xkk
    SkipEqImm(Reg, u8),
    /// 4xkk
    SkipNeImm(Reg, u8),
    /// 5xy0
    SkipEqReg(Reg, Reg),
    /// 6xkk
    LoadImm(Reg, u8),
    /// 7xkk
    AddImm(Reg, u8),
    /// 8xy0..8xyE
    Alu(AluOp, Reg, Reg),
    /// 9xy0
    SkipNeReg(Reg, Reg),
    /// Annn
    LoadIndex(u16),
    /// Bnnn
    JumpV0(u16),
    /// Cxkk
    Random(Reg, u8),
    /// Dxyn
    Draw(Reg, Reg, u8),
    /// Ex9E
    SkipKeyDown(Reg),
    /// ExA1
    SkipKeyUp(Reg),
    /// Fx07
    LoadDelay(Reg),
    /// Fx0A
    WaitKey(Reg),
    /// Fx15
    SetDelay(Reg),
    /// Fx18
    SetSound(Reg),
    /// Fx1E
    AddIndex(Reg),
    /// Fx29
    LoadGlyph(Reg),
    /// Fx33
    StoreBcd(Reg),
    /// Fx55
    StoreRegs(Reg),
    /// Fx65
    LoadRegs(Reg),
    Unknown(u16),
}

/// the register-register arithmetic family, selected by the low nibble of 8xyN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Move,
    Or,
    And,
    Xor,
    Add,
    Sub,
    ShiftRight,
    SubN,
    ShiftLeft,
}

impl AluOp {
    fn from_nibble(n: u16) -> Option<AluOp> {
        Some(match n {
            0x0 => AluOp::Move,
            0x1 => AluOp::Or,
            0x2 => AluOp::And,
            0x3 => AluOp::Xor,
            0x4 => AluOp::Add,
            0x5 => AluOp::Sub,
            0x6 => AluOp::ShiftRight,
            0x7 => AluOp::SubN,
            0xE => AluOp::ShiftLeft,
            _ => return None,
        })
    }

    fn mnemonic(&self) -> &'static str {
        match self {
            AluOp::Move => "LD",
            AluOp::Or => "OR",
            AluOp::And => "AND",
            AluOp::Xor => "XOR",
            AluOp::Add => "ADD",
            AluOp::Sub => "SUB",
            AluOp::ShiftRight => "SHR",
            AluOp::SubN => "SUBN",
            AluOp::ShiftLeft => "SHL",
        }
    }
}

impl Instruction {
    pub fn decode(opcode: u16) -> Instruction {
        let x = ((opcode & 0x0F00) >> 8) as Reg;
        let y = ((opcode & 0x00F0) >> 4) as Reg;
        let n = (opcode & 0x000F) as u8;
        let kk = (opcode & 0x00FF) as u8;
        let nnn = opcode & 0x0FFF;

        match opcode & 0xF000 {
            0x0000 => match kk {
                0xE0 => Instruction::ClearScreen,
                0xEE => Instruction::Return,
                _ => Instruction::Sys(nnn),
            },
            0x1000 => Instruction::Jump(nnn),
            0x2000 => Instruction::Call(nnn),
            0x3000 => Instruction::SkipEqImm(x, kk),
            0x4000 => Instruction::SkipNeImm(x, kk),
            // the low nibble of 5xyN / 9xyN isn't checked
            0x5000 => Instruction::SkipEqReg(x, y),
            0x6000 => Instruction::LoadImm(x, kk),
            0x7000 => Instruction::AddImm(x, kk),
            0x8000 => match AluOp::from_nibble(opcode & 0x000F) {
                Some(op) => Instruction::Alu(op, x, y),
                None => Instruction::Unknown(opcode),
            },
            0x9000 => Instruction::SkipNeReg(x, y),
            0xA000 => Instruction::LoadIndex(nnn),
            0xB000 => Instruction::JumpV0(nnn),
            0xC000 => Instruction::Random(x, kk),
            0xD000 => Instruction::Draw(x, y, n),
            0xE000 => match kk {
                0x9E => Instruction::SkipKeyDown(x),
                0xA1 => Instruction::SkipKeyUp(x),
                _ => Instruction::Unknown(opcode),
            },
            _ => match kk {
                0x07 => Instruction::LoadDelay(x),
                0x0A => Instruction::WaitKey(x),
                0x15 => Instruction::SetDelay(x),
                0x18 => Instruction::SetSound(x),
                0x1E => Instruction::AddIndex(x),
                0x29 => Instruction::LoadGlyph(x),
                0x33 => Instruction::StoreBcd(x),
                0x55 => Instruction::StoreRegs(x),
                0x65 => Instruction::LoadRegs(x),
                _ => Instruction::Unknown(opcode),
            },
        }
    }
}

/// assembler-style mnemonics, for traces and ROM listings
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match *self {
            ClearScreen => write!(f, "CLS"),
            Return => write!(f, "RET"),
            Sys(a) => write!(f, "SYS 0x{:03x}", a),
            Jump(a) => write!(f, "JP 0x{:03x}", a),
            Call(a) => write!(f, "CALL 0x{:03x}", a),
            SkipEqImm(x, kk) => write!(f, "SE V{:X}, 0x{:02x}", x, kk),
            SkipNeImm(x, kk) => write!(f, "SNE V{:X}, 0x{:02x}", x, kk),
            SkipEqReg(x, y) => write!(f, "SE V{:X}, V{:X}", x, y),
            LoadImm(x, kk) => write!(f, "LD V{:X}, 0x{:02x}", x, kk),
            AddImm(x, kk) => write!(f, "ADD V{:X}, 0x{:02x}", x, kk),
            Alu(op, x, y) => write!(f, "{} V{:X}, V{:X}", op.mnemonic(), x, y),
            SkipNeReg(x, y) => write!(f, "SNE V{:X}, V{:X}", x, y),
            LoadIndex(a) => write!(f, "LD I, 0x{:03x}", a),
            JumpV0(a) => write!(f, "JP V0, 0x{:03x}", a),
            Random(x, kk) => write!(f, "RND V{:X}, 0x{:02x}", x, kk),
            Draw(x, y, n) => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            SkipKeyDown(x) => write!(f, "SKP V{:X}", x),
            SkipKeyUp(x) => write!(f, "SKNP V{:X}", x),
            LoadDelay(x) => write!(f, "LD V{:X}, DT", x),
            WaitKey(x) => write!(f, "LD V{:X}, K", x),
            SetDelay(x) => write!(f, "LD DT, V{:X}", x),
            SetSound(x) => write!(f, "LD ST, V{:X}", x),
            AddIndex(x) => write!(f, "ADD I, V{:X}", x),
            LoadGlyph(x) => write!(f, "LD F, V{:X}", x),
            StoreBcd(x) => write!(f, "LD B, V{:X}", x),
            StoreRegs(x) => write!(f, "LD [I], V{:X}", x),
            LoadRegs(x) => write!(f, "LD V{:X}, [I]", x),
            Unknown(op) => write!(f, "??? 0x{:04x}", op),
        }
    }
}
