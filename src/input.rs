use crate::error::{Chip8Error, Result};
use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use ini::Ini;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::time::{Duration, Instant};

/// map of keys read from the keyboard to what the chip8 might expect
/// where '1' => 0x01 and 'a' => 0x0a
const CHIP8_LITERAL_KEYMAP: [(char, u8); 16] = [
    ('0', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('4', 0x04),
    ('5', 0x05),
    ('6', 0x06),
    ('7', 0x07),
    ('8', 0x08),
    ('9', 0x09),
    ('a', 0x0a),
    ('b', 0x0b),
    ('c', 0x0c),
    ('d', 0x0d),
    ('e', 0x0e),
    ('f', 0x0f),
];

/// ditto using left-hand side of qwerty keyboard
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// how long a key counts as held after the terminal last reported it;
/// terminals send presses and repeats but never releases, and the first
/// repeat can come up to half a second after the press
const KEY_HOLD: Duration = Duration::from_millis(500);

/// how often a blocking key wait checks for events
const WAIT_POLL: Duration = Duration::from_millis(10);

/// result of blocking for a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWait {
    Pressed(u8),
    Quit,
}

/// pause/quit state after polling for special keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Special {
    pub paused: bool,
    pub running: bool,
}

/// reads keypresses for the interpreter and the run loop
pub trait Keyboard {
    /// is CHIP-8 key `key` (0x0-0xF) held down right now
    fn is_key_down(&mut self, key: u8) -> io::Result<bool>;

    /// block until a mapped key is pressed, or the user quits
    fn wait_for_key(&mut self) -> io::Result<KeyWait>;

    /// check for pause toggles and quit requests without blocking
    fn poll_special(&mut self, paused: bool) -> io::Result<Special>;
}

/// which terminal key means what
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keymap {
    keys: HashMap<KeyCode, u8>,
    pub pause: KeyCode,
    pub quit: KeyCode,
}

impl Keymap {
    fn from_pairs(pairs: &[(char, u8)]) -> Self {
        Keymap {
            keys: pairs.iter().map(|(c, k)| (KeyCode::Char(*c), *k)).collect(),
            pause: KeyCode::Char(' '),
            quit: KeyCode::Esc,
        }
    }

    pub fn conventional() -> Self {
        Self::from_pairs(&CHIP8_CONVENTIONAL_KEYMAP)
    }

    pub fn literal() -> Self {
        Self::from_pairs(&CHIP8_LITERAL_KEYMAP)
    }

    /// Reads the general section of an INI key file on top of the
    /// conventional layout: `<chip8 key> = <key name>`, plus `PAUSE = ...`
    /// and `QUIT = ...`. Other sections are ignored.
    pub fn from_ini_str(text: &str) -> Result<Self> {
        let ini = Ini::load_from_str(text).map_err(|e| Chip8Error::InvalidKeymap(e.to_string()))?;
        let mut keymap = Self::conventional();
        for (name, value) in ini.general_section().iter() {
            let code = parse_key_name(value).ok_or_else(|| {
                Chip8Error::InvalidKeymap(format!("{}: unknown key {:?}", name, value))
            })?;
            match name.to_ascii_uppercase().as_str() {
                "PAUSE" => keymap.pause = code,
                "QUIT" => keymap.quit = code,
                digit => {
                    let key = u8::from_str_radix(digit, 16)
                        .ok()
                        .filter(|k| *k < 16)
                        .ok_or_else(|| {
                            Chip8Error::InvalidKeymap(format!("{:?} is not a CHIP-8 key", name))
                        })?;
                    keymap.keys.retain(|_, k| *k != key);
                    keymap.keys.insert(code, key);
                }
            }
        }
        Ok(keymap)
    }

    pub fn get(&self, code: &KeyCode) -> Option<u8> {
        self.keys.get(&normalise(*code)).copied()
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::conventional()
    }
}

fn normalise(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

/// key names as written in a key file: single characters, or one of
/// Space, Escape, Enter, Tab, Backspace
pub fn parse_key_name(name: &str) -> Option<KeyCode> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(KeyCode::Char(c.to_ascii_lowercase()));
    }
    match name.to_ascii_lowercase().as_str() {
        "space" => Some(KeyCode::Char(' ')),
        "escape" | "esc" => Some(KeyCode::Esc),
        "enter" | "return" => Some(KeyCode::Enter),
        "tab" => Some(KeyCode::Tab),
        "backspace" => Some(KeyCode::Backspace),
        _ => None,
    }
}

/// implementation of Keyboard reading crossterm events from the terminal
pub struct TermKeyboard {
    keymap: Keymap,
    last_pressed: [Option<Instant>; 16],
    pause_toggles: usize,
    quit: bool,
}

impl TermKeyboard {
    pub fn new(keymap: Keymap) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(TermKeyboard {
            keymap,
            last_pressed: [None; 16],
            pause_toggles: 0,
            quit: false,
        })
    }

    /// sort one key event into CHIP-8 keys and special keys; returns the
    /// CHIP-8 key if it was one
    fn handle(&mut self, evt: KeyEvent) -> Option<u8> {
        if evt.modifiers.contains(KeyModifiers::CONTROL) && evt.code == KeyCode::Char('c') {
            self.quit = true;
            return None;
        }
        let code = normalise(evt.code);
        if code == self.keymap.quit {
            self.quit = true;
            None
        } else if code == self.keymap.pause {
            self.pause_toggles += 1;
            None
        } else if let Some(key) = self.keymap.get(&code) {
            self.last_pressed[key as usize] = Some(Instant::now());
            Some(key)
        } else {
            tracing::warn!("can't map {:?} to a CHIP-8 key", evt.code);
            None
        }
    }

    fn held(&self, key: u8) -> bool {
        self.last_pressed
            .get(key as usize)
            .copied()
            .flatten()
            .map_or(false, |t| t.elapsed() < KEY_HOLD)
    }

    /// drain pending events, waiting up to `timeout` for the first one
    fn read_events(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        let mut pressed = None;
        let mut wait = timeout;
        while poll(wait)? {
            if let Event::Key(evt) = read()? {
                if let Some(key) = self.handle(evt) {
                    pressed = Some(key);
                }
            }
            wait = Duration::from_millis(0);
        }
        Ok(pressed)
    }
}

impl Drop for TermKeyboard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Keyboard for TermKeyboard {
    fn is_key_down(&mut self, key: u8) -> io::Result<bool> {
        self.read_events(Duration::from_millis(0))?;
        Ok(self.held(key))
    }

    fn wait_for_key(&mut self) -> io::Result<KeyWait> {
        loop {
            if self.quit {
                return Ok(KeyWait::Quit);
            }
            if let Some(key) = self.read_events(WAIT_POLL)? {
                return Ok(KeyWait::Pressed(key));
            }
        }
    }

    fn poll_special(&mut self, paused: bool) -> io::Result<Special> {
        self.read_events(Duration::from_millis(0))?;
        let toggles = std::mem::take(&mut self.pause_toggles);
        Ok(Special {
            paused: paused ^ (toggles % 2 == 1),
            running: !self.quit,
        })
    }
}

/// what a [`ScriptedKeyboard`] reports on one `poll_special` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialEvent {
    TogglePause,
    Quit,
}

/// Keyboard implementation for testing: held keys are set directly, key
/// waits and special events are replayed in order. Once the script runs out,
/// waits report Quit and polls report nothing.
#[derive(Debug, Default)]
pub struct ScriptedKeyboard {
    held: [bool; 16],
    waits: VecDeque<KeyWait>,
    specials: VecDeque<Option<SpecialEvent>>,
    quit: bool,
}

impl ScriptedKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hold(&mut self, key: u8) -> &mut Self {
        self.held[key as usize & 0xf] = true;
        self
    }

    pub fn release(&mut self, key: u8) -> &mut Self {
        self.held[key as usize & 0xf] = false;
        self
    }

    pub fn then_wait(&mut self, result: KeyWait) -> &mut Self {
        self.waits.push_back(result);
        self
    }

    /// queue the outcome of the next `poll_special`; None is a quiet tick
    pub fn then_special(&mut self, event: Option<SpecialEvent>) -> &mut Self {
        self.specials.push_back(event);
        self
    }
}

impl Keyboard for ScriptedKeyboard {
    fn is_key_down(&mut self, key: u8) -> io::Result<bool> {
        Ok(self.held.get(key as usize).copied().unwrap_or(false))
    }

    fn wait_for_key(&mut self) -> io::Result<KeyWait> {
        Ok(self.waits.pop_front().unwrap_or(KeyWait::Quit))
    }

    fn poll_special(&mut self, paused: bool) -> io::Result<Special> {
        let mut paused = paused;
        match self.specials.pop_front().flatten() {
            Some(SpecialEvent::TogglePause) => paused = !paused,
            Some(SpecialEvent::Quit) => self.quit = true,
            None => {}
        }
        Ok(Special {
            paused,
            running: !self.quit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conventional_layout() {
        let k = Keymap::conventional();
        assert_eq!(k.get(&KeyCode::Char('x')), Some(0x0));
        assert_eq!(k.get(&KeyCode::Char('4')), Some(0xc));
        assert_eq!(k.get(&KeyCode::Char('V')), Some(0xf));
        assert_eq!(k.get(&KeyCode::Char('p')), None);
        assert_eq!(k.pause, KeyCode::Char(' '));
        assert_eq!(k.quit, KeyCode::Esc);
    }

    #[test]
    fn test_literal_layout() {
        let k = Keymap::literal();
        assert_eq!(k.get(&KeyCode::Char('0')), Some(0x0));
        assert_eq!(k.get(&KeyCode::Char('b')), Some(0xb));
    }

    #[test]
    fn test_key_file_overrides() -> Result<()> {
        let k = Keymap::from_ini_str("; remap\n0 = P\nA = Tab\nPAUSE = Enter\nQUIT = q\n")?;
        assert_eq!(k.get(&KeyCode::Char('p')), Some(0x0));
        // old binding for 0 is gone
        assert_eq!(k.get(&KeyCode::Char('x')), None);
        assert_eq!(k.get(&KeyCode::Tab), Some(0xa));
        assert_eq!(k.pause, KeyCode::Enter);
        assert_eq!(k.quit, KeyCode::Char('q'));
        // untouched bindings survive
        assert_eq!(k.get(&KeyCode::Char('w')), Some(0x5));
        Ok(())
    }

    #[test]
    fn test_key_file_errors() {
        assert!(matches!(
            Keymap::from_ini_str("G = p"),
            Err(Chip8Error::InvalidKeymap(_))
        ));
        assert!(Keymap::from_ini_str("1 = Banana").is_err());
        assert!(Keymap::from_ini_str("[keys\n1 = p").is_err());
    }

    #[test]
    fn test_key_file_sections() -> Result<()> {
        let k = Keymap::from_ini_str("# mine\nQUIT = Backspace\n\n[elsewhere]\n1 = p\n")?;
        assert_eq!(k.quit, KeyCode::Backspace);
        // only the general section counts
        assert_eq!(k.get(&KeyCode::Char('p')), None);
        assert_eq!(k.get(&KeyCode::Char('1')), Some(0x1));
        Ok(())
    }

    #[test]
    fn test_key_hold_outlasts_repeat_delay() {
        // common terminal auto-repeat delays are 250 to 500 ms
        assert!(KEY_HOLD >= Duration::from_millis(500));
    }

    #[test]
    fn test_held_key_stays_down_until_first_repeat() {
        let mut k = TermKeyboard {
            keymap: Keymap::conventional(),
            last_pressed: [None; 16],
            pause_toggles: 0,
            quit: false,
        };
        let press = KeyEvent::new(KeyCode::Char('w'), KeyModifiers::NONE);
        assert_eq!(k.handle(press), Some(0x5));
        assert!(k.held(0x5));
        assert!(!k.held(0x6));
        // no repeat yet 400 ms after the press
        k.last_pressed[0x5] = Instant::now().checked_sub(Duration::from_millis(400));
        assert!(k.held(0x5));
        k.last_pressed[0x5] = Instant::now().checked_sub(Duration::from_millis(600));
        assert!(!k.held(0x5));
    }

    #[test]
    fn test_scripted_keyboard() -> io::Result<()> {
        let mut k = ScriptedKeyboard::new();
        k.hold(0x5)
            .then_wait(KeyWait::Pressed(0xa))
            .then_special(None)
            .then_special(Some(SpecialEvent::TogglePause))
            .then_special(Some(SpecialEvent::Quit));
        assert!(k.is_key_down(0x5)?);
        assert!(!k.is_key_down(0x6)?);
        assert!(!k.is_key_down(0x20)?);
        assert_eq!(k.wait_for_key()?, KeyWait::Pressed(0xa));
        assert_eq!(k.wait_for_key()?, KeyWait::Quit);
        let s = k.poll_special(false)?;
        assert_eq!(s, Special { paused: false, running: true });
        let s = k.poll_special(s.paused)?;
        assert_eq!(s, Special { paused: true, running: true });
        let s = k.poll_special(s.paused)?;
        assert!(!s.running);
        Ok(())
    }
}
