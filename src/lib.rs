//! # chip8-vm
//!
//! A CHIP-8 virtual machine that runs in the terminal.
//!
//! ## Design
//!
//! * the machine state is plain data; the interpreter mutates it one
//!   instruction at a time
//! * abstract display, keyboard and sound so can plug alternatives; the
//!   binary uses TUI in-console, tests use the headless/scripted ones
//! * CHIP-8 instructions run as fast as possible then sleep, to match the
//!   configured clock speed; so not quite authentic
//! * timers count down every `clock_speed / timer_speed` instructions rather
//!   than off a real 60Hz clock
//! * sprites can wrap, clip or fault at the screen edges, per axis
//!
//! Model
//!
//! ```text
//! main
//!  |-- config, display, keyboard, sound
//!  |-- machine(rom)
//!  `-- emulator(config, machine)
//!       |-- interpreter(config)    step: fetch / decode / execute
//!       |-- compositor(config)     blend recent frames against flicker
//!       `-- run loop
//!            |-- step unless paused
//!            |-- poll pause / quit
//!            |-- present the frame if something was drawn
//!            |-- every n ticks: DT -= 1, ST -= 1 (with a bell)
//!            |-- halt if PC left the rom
//!            `-- sleep(1 / clock_speed)
//! ```

pub mod compositor;
pub mod config;
pub mod display;
pub mod emulator;
pub mod error;
pub mod framebuffer;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod machine;
pub mod memory;
pub mod rom;
pub mod sound;

pub use config::{Config, WrapPolicy};
pub use emulator::{Emulator, HaltReason, RunState};
pub use error::{Chip8Error, Result};
pub use machine::Machine;
