use chip8_vm::display::{Display, TermDisplay};
use chip8_vm::framebuffer::{Framebuffer, CHIP8_TEST_CARD};
use chip8_vm::input::{Keyboard, Keymap, TermKeyboard};
use chip8_vm::rom;
use chip8_vm::sound::{Mute, SimpleBeep, Sound, TerminalBell};
use chip8_vm::{Chip8Error, Config, Emulator, HaltReason, Machine, Result};
use clap::{Parser, ValueEnum};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::Level;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum KeymapKind {
    /// 1234 / qwer / asdf / zxcv
    Conventional,
    /// 0-9 and a-f
    Literal,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum SoundKind {
    /// terminal bell on every timer tick
    Bell,
    /// PC speaker tone
    Beep,
    Mute,
}

#[derive(Parser, Debug)]
#[command(name = "chip8-vm", version, about = "Run CHIP-8 programs in the terminal.")]
struct Cli {
    /// ROM image to run
    #[arg(value_name = "ROM", required_unless_present_any = ["hex", "test_card"])]
    rom: Option<PathBuf>,

    /// Supply the ROM as a hex string instead of a file
    #[arg(long, value_name = "BYTES", conflicts_with = "rom")]
    hex: Option<String>,

    /// Keyboard layout
    #[arg(long, value_enum, default_value_t = KeymapKind::Conventional)]
    keymap: KeymapKind,

    /// INI key file with `<key> = <name>`, PAUSE and QUIT lines; replaces
    /// --keymap. Defaults to ./keys.ini when that exists
    #[arg(long, value_name = "PATH")]
    keys: Option<PathBuf>,

    /// What the sound timer does
    #[arg(long, value_enum, default_value_t = SoundKind::Bell)]
    sound: SoundKind,

    /// Print a listing of the ROM before the run and the machine state after
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Show the display test card and wait for a key
    #[arg(long, default_value_t = false)]
    test_card: bool,

    /// Where log output goes
    #[arg(long, value_name = "PATH", default_value = "chip8-vm.log")]
    log: PathBuf,

    #[command(flatten)]
    config: Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(&cli.log, cli.debug) {
        eprintln!("can't log to {}: {}", cli.log.display(), e);
        return ExitCode::FAILURE;
    }
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// the terminal belongs to the display, so logs go to a file
fn init_logging(path: &Path, debug: bool) -> Result<()> {
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(if debug { Level::TRACE } else { Level::INFO })
        .init();
    Ok(())
}

/// key file picked up from the working directory without --keys
const DEFAULT_KEY_FILE: &str = "keys.ini";

fn load_keymap(cli: &Cli) -> Result<Keymap> {
    keymap_from(cli.keys.as_deref(), Path::new(DEFAULT_KEY_FILE), cli.keymap)
}

fn keymap_from(keys: Option<&Path>, fallback: &Path, kind: KeymapKind) -> Result<Keymap> {
    match keys.or_else(|| Some(fallback).filter(|p| p.is_file())) {
        Some(path) => {
            tracing::info!("reading keys from {}", path.display());
            Keymap::from_ini_str(&fs::read_to_string(path)?)
        }
        None => Ok(match kind {
            KeymapKind::Conventional => Keymap::conventional(),
            KeymapKind::Literal => Keymap::literal(),
        }),
    }
}

fn load_rom(cli: &Cli) -> Result<Vec<u8>> {
    match (&cli.hex, &cli.rom) {
        (Some(text), _) => rom::from_hex(text),
        (None, Some(path)) => rom::read_rom(path),
        (None, None) => Err(Chip8Error::InvalidConfig("no ROM given".into())),
    }
}

fn make_sound(kind: SoundKind) -> Box<dyn Sound> {
    match kind {
        SoundKind::Bell => Box::new(TerminalBell),
        SoundKind::Beep => Box::new(SimpleBeep::new()),
        SoundKind::Mute => Box::new(Mute::new()),
    }
}

fn run(cli: &Cli) -> Result<()> {
    cli.config.validate()?;
    let keymap = load_keymap(cli)?;
    let config = &cli.config;

    if cli.test_card {
        let mut display = TermDisplay::new(config.scaling_factor, config.fg, config.bg)?;
        let mut keyboard = TermKeyboard::new(keymap)?;
        display.draw_frame(&Framebuffer::from_bytes(&CHIP8_TEST_CARD))?;
        keyboard.wait_for_key()?;
        return Ok(());
    }

    let rom = load_rom(cli)?;
    let machine = Machine::with_rom(&rom)?;
    tracing::info!("loaded {} byte ROM", rom.len());
    if cli.debug {
        print!("{}", rom::listing(&rom));
    }

    let mut emulator = Emulator::new(config, machine)?;
    let mut sound = make_sound(cli.sound);
    let outcome = {
        // both put the terminal back when dropped, before anything is printed
        let mut display = TermDisplay::new(config.scaling_factor, config.fg, config.bg)?;
        let mut keyboard = TermKeyboard::new(keymap)?;
        emulator.run(&mut display, &mut keyboard, sound.as_mut())
    };
    // the speaker may still be on if we stopped mid-tone
    if let Err(e) = sound.stop() {
        tracing::warn!("sound failed to stop: {}", e);
    }

    if cli.debug {
        println!("{}", emulator.machine());
    }
    match outcome? {
        HaltReason::Quit => println!("quit"),
        HaltReason::RomEnd => println!("end of ROM"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chip8_vm::WrapPolicy;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["chip8-vm", "game.ch8"]).unwrap();
        assert_eq!(cli.rom, Some(PathBuf::from("game.ch8")));
        assert_eq!(cli.config, Config::default());
        assert_eq!(cli.keymap, KeymapKind::Conventional);
        assert_eq!(cli.sound, SoundKind::Bell);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "chip8-vm",
            "--hex",
            "a2cc 6a06",
            "--wrap-x",
            "error",
            "--wrap-y",
            "off",
            "--clock-speed",
            "500",
            "--screen-buffer",
            "3",
            "--fg",
            "0xFF00FF00",
            "--seed",
            "7",
            "--sound",
            "mute",
        ])
        .unwrap();
        assert_eq!(cli.config.wrap_x, WrapPolicy::Fault);
        assert_eq!(cli.config.wrap_y, WrapPolicy::Clip);
        assert_eq!(cli.config.clock_speed, 500);
        assert_eq!(cli.config.screen_buffer, 3);
        assert_eq!(cli.config.fg, 0xFF00FF00);
        assert_eq!(cli.config.seed, Some(7));
        assert_eq!(load_rom(&cli).unwrap(), vec![0xa2, 0xcc, 0x6a, 0x06]);
    }

    #[test]
    fn test_key_file_fallback() -> Result<()> {
        use crossterm::event::KeyCode;

        let dir = std::env::temp_dir().join(format!("chip8-vm-keys-{}", std::process::id()));
        fs::create_dir_all(&dir)?;
        let fallback = dir.join(DEFAULT_KEY_FILE);
        let missing = dir.join("missing.ini");

        // no key file anywhere: the layout flag decides
        let k = keymap_from(None, &missing, KeymapKind::Literal)?;
        assert_eq!(k.get(&KeyCode::Char('b')), Some(0xb));

        fs::write(&fallback, "QUIT = q\n0 = p\n")?;
        let k = keymap_from(None, &fallback, KeymapKind::Literal)?;
        assert_eq!(k.quit, KeyCode::Char('q'));
        assert_eq!(k.get(&KeyCode::Char('p')), Some(0x0));

        // --keys wins over the working directory file
        let explicit = dir.join("explicit.ini");
        fs::write(&explicit, "QUIT = Tab\n")?;
        let k = keymap_from(Some(&explicit), &fallback, KeymapKind::Conventional)?;
        assert_eq!(k.quit, KeyCode::Tab);

        fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn test_cli_needs_a_rom() {
        assert!(Cli::try_parse_from(["chip8-vm"]).is_err());
        assert!(Cli::try_parse_from(["chip8-vm", "--test-card"]).is_ok());
        assert!(Cli::try_parse_from(["chip8-vm", "x.ch8", "--hex", "00e0"]).is_err());
        assert!(Cli::try_parse_from(["chip8-vm", "x.ch8", "--wrap-x", "sideways"]).is_err());
    }
}
