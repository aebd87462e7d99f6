use beep::beep;
use std::error::Error;
use std::io::{self, Write};

/// Makes the noise while the sound timer runs. `bell` is called once for
/// every timer tick with a nonzero sound timer, `stop` when it runs out.
pub trait Sound {
    fn bell(&mut self) -> Result<(), Box<dyn Error>>;
    fn stop(&mut self) -> Result<(), Box<dyn Error>>;
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C

/// BEL control character
const BEL: u8 = 0x07;

/// rings the terminal bell on every tick
pub struct TerminalBell;

impl Sound for TerminalBell {
    fn bell(&mut self) -> Result<(), Box<dyn Error>> {
        let mut stdout = io::stdout();
        stdout.write_all(&[BEL])?;
        stdout.flush()?;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}

/// continuous tone on the PC speaker
pub struct SimpleBeep {
    is_beeping: bool,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep { is_beeping: false }
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for SimpleBeep {
    fn bell(&mut self) -> Result<(), Box<dyn Error>> {
        if !self.is_beeping {
            beep(SIMPLEBEEP_PITCH)?;
            self.is_beeping = true;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        if self.is_beeping {
            beep(0)?;
            self.is_beeping = false;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Mute {
    /// how many bells were swallowed
    pub bells: usize,
    pub stops: usize,
}

impl Mute {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sound for Mute {
    fn bell(&mut self) -> Result<(), Box<dyn Error>> {
        self.bells += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        self.stops += 1;
        Ok(())
    }
}
