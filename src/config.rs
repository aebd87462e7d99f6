use crate::error::{Chip8Error, Result};
use clap::{Args, ValueEnum};

/// what to do when a sprite is drawn at a coordinate past the edge of the
/// screen
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapPolicy {
    /// reduce the coordinate modulo the screen size
    #[default]
    #[value(name = "on")]
    Wrap,
    /// don't draw anything
    #[value(name = "off")]
    Clip,
    /// stop the machine
    #[value(name = "error")]
    Fault,
}

pub const DEFAULT_CLOCK_SPEED: u32 = 1300;
pub const DEFAULT_TIMER_SPEED: u32 = 60;
pub const DEFAULT_FG: u32 = 0xFFFF_FFFF;
pub const DEFAULT_BG: u32 = 0x0000_0000;

/// Settings the core is built with. Everything here is a plain value; the
/// binary fills it in from the command line.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Wrap screen horizontally: on, off, error
    #[arg(long, value_enum, default_value_t = WrapPolicy::Wrap)]
    pub wrap_x: WrapPolicy,

    /// Wrap screen vertically: on, off, error
    #[arg(long, value_enum, default_value_t = WrapPolicy::Wrap)]
    pub wrap_y: WrapPolicy,

    /// Approximate cycle speed in Hz
    #[arg(long, default_value_t = DEFAULT_CLOCK_SPEED)]
    pub clock_speed: u32,

    /// Approximate timer speed in Hz
    #[arg(long, default_value_t = DEFAULT_TIMER_SPEED)]
    pub timer_speed: u32,

    /// Number of frames to merge for output to prevent flickering
    #[arg(long, default_value_t = 1)]
    pub screen_buffer: usize,

    /// Terminal cells per CHIP-8 pixel
    #[arg(long, default_value_t = 1)]
    pub scaling_factor: u16,

    /// Colour for foreground (active pixels) as hexadecimal string
    #[arg(long, default_value = "0xFFFFFFFF", value_parser = parse_colour)]
    pub fg: u32,

    /// Colour for background as hexadecimal string
    #[arg(long, default_value = "0x00000000", value_parser = parse_colour)]
    pub bg: u32,

    /// Seed for the random number instruction; entropy if not given
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            wrap_x: WrapPolicy::Wrap,
            wrap_y: WrapPolicy::Wrap,
            clock_speed: DEFAULT_CLOCK_SPEED,
            timer_speed: DEFAULT_TIMER_SPEED,
            screen_buffer: 1,
            scaling_factor: 1,
            fg: DEFAULT_FG,
            bg: DEFAULT_BG,
            seed: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.clock_speed == 0 {
            return Err(Chip8Error::InvalidConfig("clock speed must be > 0".into()));
        }
        if self.timer_speed == 0 {
            return Err(Chip8Error::InvalidConfig("timer speed must be > 0".into()));
        }
        if self.timer_speed > self.clock_speed {
            return Err(Chip8Error::InvalidConfig(format!(
                "timer speed {}Hz can't exceed clock speed {}Hz",
                self.timer_speed, self.clock_speed
            )));
        }
        if self.screen_buffer == 0 {
            return Err(Chip8Error::InvalidConfig(
                "screen buffer must hold at least 1 frame".into(),
            ));
        }
        if self.scaling_factor == 0 {
            return Err(Chip8Error::InvalidConfig("scaling factor must be > 0".into()));
        }
        Ok(())
    }

    /// instructions executed between two timer decrements
    pub fn timer_divider(&self) -> u32 {
        (self.clock_speed / self.timer_speed.max(1)).max(1)
    }

    /// how long one instruction should take
    pub fn cycle_time(&self) -> std::time::Duration {
        std::time::Duration::from_micros(1_000_000 / u64::from(self.clock_speed.max(1)))
    }
}

/// parses colours like "0xFFFFFFFF" or "ff8800"; the alpha byte is kept but
/// ignored by the terminal display
pub fn parse_colour(s: &str) -> std::result::Result<u32, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).map_err(|e| format!("bad colour {:?}: {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let c = Config::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.timer_divider(), 21);
    }

    #[test]
    fn test_rejects_zero_screen_buffer() {
        let c = Config {
            screen_buffer: 0,
            ..Config::default()
        };
        assert!(matches!(c.validate(), Err(Chip8Error::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_timer_faster_than_clock() {
        let c = Config {
            clock_speed: 30,
            timer_speed: 60,
            ..Config::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_parse_colour() {
        assert_eq!(parse_colour("0xFFFFFFFF"), Ok(0xffff_ffff));
        assert_eq!(parse_colour("00ff00"), Ok(0x00ff00));
        assert!(parse_colour("0xnope").is_err());
    }

    #[test]
    fn test_cycle_time() {
        let c = Config {
            clock_speed: 1000,
            ..Config::default()
        };
        assert_eq!(c.cycle_time(), std::time::Duration::from_millis(1));
    }
}
