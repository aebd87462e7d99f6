//! # interpreter
//!
//! Fetches one big-endian instruction at PC, decodes it into an
//! [`Instruction`] and applies it to a [`Machine`]. Every instruction is two
//! bytes, so PC moves by 2, or by 4 for a taken skip.
//!
//! VF is the flag output of the ALU, shift and draw instructions. Where an
//! instruction writes both a value and the flag, the value is written first
//! and the flag last, so `8FyN` leaves the flag in VF rather than the result.
//!
//! Fatal: RET on an empty stack, CALL on a full one, a JP/CALL target below
//! 0x200, a draw past the screen edge under [`WrapPolicy::Fault`].
//! Soft: unknown opcodes (logged, skipped), `Bnnn` targets (never checked),
//! draws clipped under [`WrapPolicy::Clip`].
use crate::config::{Config, WrapPolicy};
use crate::error::{Axis, Chip8Error, Result};
use crate::framebuffer::{ROW_BYTES, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::input::{KeyWait, Keyboard};
use crate::instruction::{AluOp, Instruction, Reg};
use crate::machine::Machine;
use crate::memory::{Chip8MemoryMap, MemoryMap, CHIP8_PROGRAM_ADDR, CHIP8_RAM_SIZE_BYTES};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// what happened during one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// carry on; `redraw` is set when the framebuffer may have changed
    Continue { redraw: bool },
    /// the user quit while the program was waiting for a key
    Halt,
}

impl Step {
    const NEXT: Step = Step::Continue { redraw: false };
}

pub struct Chip8Interpreter {
    wrap_x: WrapPolicy,
    wrap_y: WrapPolicy,
    rng: StdRng,
}

impl Chip8Interpreter {
    pub fn new(config: &Config) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Chip8Interpreter {
            wrap_x: config.wrap_x,
            wrap_y: config.wrap_y,
            rng,
        }
    }

    /// execute the instruction at PC
    pub fn step(&mut self, m: &mut Machine, keyboard: &mut dyn Keyboard) -> Result<Step> {
        let opcode = m.fetch();
        m.opcode = opcode;
        let instruction = Instruction::decode(opcode);
        tracing::trace!("0x{:03x}: {:04x} {}", m.program_counter, opcode, instruction);
        self.execute(m, instruction, keyboard)
    }

    fn execute(
        &mut self,
        m: &mut Machine,
        instruction: Instruction,
        keyboard: &mut dyn Keyboard,
    ) -> Result<Step> {
        use Instruction::*;
        match instruction {
            ClearScreen => {
                m.framebuffer.clear();
                m.program_counter += 2;
                return Ok(Step::Continue { redraw: true });
            }
            Return => {
                m.program_counter = m.pop()? + 2;
            }
            Sys(_) => m.program_counter += 2,
            Jump(addr) => {
                m.program_counter = checked_target(m, addr)?;
            }
            Call(addr) => {
                let target = checked_target(m, addr)?;
                m.push(m.program_counter)?;
                m.program_counter = target;
            }
            SkipEqImm(x, kk) => {
                let taken = m.v(x) == kk;
                skip_if(m, taken);
            }
            SkipNeImm(x, kk) => {
                let taken = m.v(x) != kk;
                skip_if(m, taken);
            }
            SkipEqReg(x, y) => {
                let taken = m.v(x) == m.v(y);
                skip_if(m, taken);
            }
            SkipNeReg(x, y) => {
                let taken = m.v(x) != m.v(y);
                skip_if(m, taken);
            }
            LoadImm(x, kk) => {
                m.set_v(x, kk);
                m.program_counter += 2;
            }
            AddImm(x, kk) => {
                m.set_v(x, m.v(x).wrapping_add(kk));
                m.program_counter += 2;
            }
            Alu(op, x, y) => {
                alu(m, op, x, y);
                m.program_counter += 2;
            }
            LoadIndex(addr) => {
                m.index_register = addr;
                m.program_counter += 2;
            }
            JumpV0(addr) => {
                let target = addr + u16::from(m.v(0));
                if target < CHIP8_PROGRAM_ADDR || target >= CHIP8_RAM_SIZE_BYTES {
                    tracing::debug!(
                        "unchecked JP V0 to 0x{:03x} - PC: 0x{:03x}",
                        target,
                        m.program_counter
                    );
                }
                m.program_counter = target;
            }
            Random(x, kk) => {
                let r: u8 = self.rng.gen();
                m.set_v(x, r & kk);
                m.program_counter += 2;
            }
            Draw(x, y, n) => {
                let redraw = self.draw(m, x, y, n)?;
                m.program_counter += 2;
                return Ok(Step::Continue { redraw });
            }
            SkipKeyDown(x) => {
                let down = keyboard.is_key_down(m.v(x))?;
                skip_if(m, down);
            }
            SkipKeyUp(x) => {
                let down = keyboard.is_key_down(m.v(x))?;
                skip_if(m, !down);
            }
            LoadDelay(x) => {
                m.set_v(x, m.delay_timer);
                m.program_counter += 2;
            }
            WaitKey(x) => match keyboard.wait_for_key()? {
                KeyWait::Pressed(key) => {
                    m.set_v(x, key);
                    m.program_counter += 2;
                }
                KeyWait::Quit => return Ok(Step::Halt),
            },
            SetDelay(x) => {
                m.delay_timer = m.v(x);
                m.program_counter += 2;
            }
            SetSound(x) => {
                m.sound_timer = m.v(x);
                m.program_counter += 2;
            }
            AddIndex(x) => {
                m.index_register = m.index_register.wrapping_add(u16::from(m.v(x)));
                m.program_counter += 2;
            }
            LoadGlyph(x) => {
                m.index_register = Chip8MemoryMap::glyph_addr(m.v(x));
                m.program_counter += 2;
            }
            StoreBcd(x) => {
                let value = m.v(x);
                let i = m.index_register;
                m.memory.write_byte(i, value / 100);
                m.memory.write_byte(i.wrapping_add(1), (value / 10) % 10);
                m.memory.write_byte(i.wrapping_add(2), value % 10);
                m.program_counter += 2;
            }
            StoreRegs(x) => {
                for r in 0..=x {
                    let addr = m.index_register.wrapping_add(u16::from(r));
                    let value = m.v(r);
                    m.memory.write_byte(addr, value);
                }
                m.program_counter += 2;
            }
            LoadRegs(x) => {
                for r in 0..=x {
                    let addr = m.index_register.wrapping_add(u16::from(r));
                    m.set_v(r, m.memory.read_byte(addr));
                }
                m.program_counter += 2;
            }
            Unknown(opcode) => {
                // step over it; staying put would refetch the same word forever
                tracing::warn!(
                    "bad opcode 0x{:04x} at 0x{:03x}, skipping",
                    opcode,
                    m.program_counter
                );
                m.program_counter += 2;
            }
        }
        Ok(Step::NEXT)
    }

    /// Dxyn: XOR an n-row sprite from memory[I..] onto the framebuffer at
    /// (Vx, Vy), setting VF on collision. Returns whether anything was drawn.
    fn draw(&mut self, m: &mut Machine, x: Reg, y: Reg, n: u8) -> Result<bool> {
        let mut x = m.v(x) as usize;
        let mut y = m.v(y) as usize;
        m.set_flag(false);

        let mut visible = true;
        for (axis, coord, size, policy) in [
            (Axis::X, &mut x, SCREEN_WIDTH, self.wrap_x),
            (Axis::Y, &mut y, SCREEN_HEIGHT, self.wrap_y),
        ] {
            if *coord < size {
                continue;
            }
            match policy {
                WrapPolicy::Wrap => *coord %= size,
                WrapPolicy::Clip => visible = false,
                WrapPolicy::Fault => {
                    return Err(Chip8Error::IllegalDraw {
                        axis,
                        pc: m.program_counter,
                        opcode: m.opcode,
                    })
                }
            }
        }
        if !visible {
            tracing::debug!("clipped draw at ({}, {}) - PC: 0x{:03x}", x, y, m.program_counter);
            return Ok(false);
        }

        let col = x / 8;
        let shift = x % 8;
        let mut collided = false;
        for row in 0..u16::from(n) {
            let sprite = m.memory.read_byte(m.index_register.wrapping_add(row));
            if shift == 0 {
                collided |= m.framebuffer.xor_byte(y, col, sprite);
            } else {
                collided |= m.framebuffer.xor_byte(y, col, sprite >> shift);
                // the bits pushed off the right of this column spill into the next
                let spill = sprite << (8 - shift);
                let next = col + 1;
                if next < ROW_BYTES {
                    collided |= m.framebuffer.xor_byte(y, next, spill);
                } else if self.wrap_x == WrapPolicy::Wrap {
                    collided |= m.framebuffer.xor_byte(y, 0, spill);
                }
            }

            y += 1;
            if y >= SCREEN_HEIGHT {
                if self.wrap_y == WrapPolicy::Wrap {
                    y = 0;
                } else {
                    break;
                }
            }
        }
        m.set_flag(collided);
        Ok(true)
    }
}

fn skip_if(m: &mut Machine, condition: bool) {
    m.program_counter += if condition { 4 } else { 2 };
}

/// jump and call targets must stay in the program area
fn checked_target(m: &Machine, addr: u16) -> Result<u16> {
    if addr < CHIP8_PROGRAM_ADDR || addr >= CHIP8_RAM_SIZE_BYTES {
        return Err(Chip8Error::IllegalJump {
            pc: m.program_counter,
            opcode: m.opcode,
            target: addr,
        });
    }
    Ok(addr)
}

/// 8xyN. The flag is decided from the operands before anything is written,
/// then the result goes to Vx and the flag to VF, in that order.
fn alu(m: &mut Machine, op: AluOp, x: Reg, y: Reg) {
    let (vx, vy) = (m.v(x), m.v(y));
    let (value, flag) = match op {
        AluOp::Move => (vy, None),
        AluOp::Or => (vx | vy, None),
        AluOp::And => (vx & vy, None),
        AluOp::Xor => (vx ^ vy, None),
        AluOp::Add => {
            let (sum, carry) = vx.overflowing_add(vy);
            (sum, Some(carry))
        }
        // VF is NOT borrow
        AluOp::Sub => (vx.wrapping_sub(vy), Some(vx > vy)),
        AluOp::ShiftRight => (vx >> 1, Some(vx & 0x01 == 0x01)),
        AluOp::SubN => (vy.wrapping_sub(vx), Some(vy > vx)),
        AluOp::ShiftLeft => (vx << 1, Some(vx & 0x80 == 0x80)),
    };
    m.set_v(x, value);
    if let Some(flag) = flag {
        m.set_flag(flag);
    }
}
