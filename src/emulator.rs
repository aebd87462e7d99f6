use crate::compositor::FrameCompositor;
use crate::config::Config;
use crate::display::Display;
use crate::error::Result;
use crate::input::Keyboard;
use crate::interpreter::{Chip8Interpreter, Step};
use crate::machine::Machine;
use crate::sound::Sound;
use std::time::Duration;

/// why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// the user asked to quit
    Quit,
    /// PC left the loaded program
    RomEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
    Halted(HaltReason),
}

/// The run loop: owns the machine and drives the interpreter, timers and
/// presentation one tick at a time.
pub struct Emulator {
    machine: Machine,
    interpreter: Chip8Interpreter,
    compositor: FrameCompositor,
    state: RunState,
    cycle_time: Duration,
    timer_divider: u32,
    timer_count: u32,
    /// a draw happened but hasn't been shown yet (we got paused first)
    redraw_pending: bool,
}

impl Emulator {
    pub fn new(config: &Config, machine: Machine) -> Result<Self> {
        config.validate()?;
        Ok(Emulator {
            machine,
            interpreter: Chip8Interpreter::new(config),
            compositor: FrameCompositor::new(config.screen_buffer),
            state: RunState::Running,
            cycle_time: config.cycle_time(),
            timer_divider: config.timer_divider(),
            timer_count: 0,
            redraw_pending: false,
        })
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn into_machine(self) -> Machine {
        self.machine
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// tick until halted, sleeping to approximate the clock speed
    pub fn run(
        &mut self,
        display: &mut dyn Display,
        keyboard: &mut dyn Keyboard,
        sound: &mut dyn Sound,
    ) -> Result<HaltReason> {
        loop {
            spin_sleep::sleep(self.cycle_time);
            if let RunState::Halted(reason) = self.tick(display, keyboard, sound)? {
                return Ok(reason);
            }
        }
    }

    /// One tick, without any sleeping: execute one instruction unless paused,
    /// poll for pause/quit, present the frame if something was drawn, and
    /// count down the timers.
    pub fn tick(
        &mut self,
        display: &mut dyn Display,
        keyboard: &mut dyn Keyboard,
        sound: &mut dyn Sound,
    ) -> Result<RunState> {
        match self.state {
            RunState::Halted(_) => return Ok(self.state),
            RunState::Running => match self.interpreter.step(&mut self.machine, keyboard)? {
                Step::Halt => return Ok(self.halt(HaltReason::Quit)),
                Step::Continue { redraw } => self.redraw_pending |= redraw,
            },
            RunState::Paused => {}
        }

        let special = keyboard.poll_special(self.state == RunState::Paused)?;
        if !special.running {
            return Ok(self.halt(HaltReason::Quit));
        }
        match (self.state, special.paused) {
            (RunState::Running, true) => {
                tracing::info!("paused at PC 0x{:03x}", self.machine.program_counter);
                self.state = RunState::Paused;
            }
            (RunState::Paused, false) => {
                tracing::info!("resumed");
                self.state = RunState::Running;
            }
            _ => {}
        }

        if self.state == RunState::Running {
            if self.redraw_pending {
                let frame = self.compositor.compose(&self.machine.framebuffer);
                display.draw_frame(&frame)?;
                self.redraw_pending = false;
            }
            self.tick_timers(sound);
        }

        if self.machine.past_rom_end() {
            return Ok(self.halt(HaltReason::RomEnd));
        }
        Ok(self.state)
    }

    /// every `timer_divider` ticks, count both timers down by one
    fn tick_timers(&mut self, sound: &mut dyn Sound) {
        if self.timer_count >= self.timer_divider {
            self.timer_count = 0;
            let m = &mut self.machine;
            if m.delay_timer > 0 {
                m.delay_timer -= 1;
            }
            if m.sound_timer > 0 {
                if let Err(e) = sound.bell() {
                    tracing::warn!("sound failed: {}", e);
                }
                m.sound_timer -= 1;
                if m.sound_timer == 0 {
                    if let Err(e) = sound.stop() {
                        tracing::warn!("sound failed to stop: {}", e);
                    }
                }
            }
        }
        self.timer_count += 1;
    }

    fn halt(&mut self, reason: HaltReason) -> RunState {
        tracing::info!(
            "halted ({:?}) at PC 0x{:03x}",
            reason,
            self.machine.program_counter
        );
        self.state = RunState::Halted(reason);
        self.state
    }
}
