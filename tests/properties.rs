use chip8_vm::input::ScriptedKeyboard;
use chip8_vm::interpreter::Chip8Interpreter;
use chip8_vm::memory::MemoryMap;
use chip8_vm::{Config, Machine};
use proptest::prelude::*;

fn interpreter() -> Chip8Interpreter {
    Chip8Interpreter::new(&Config {
        seed: Some(3),
        ..Config::default()
    })
}

/// execute the next `n` instructions from PC
fn steps(m: &mut Machine, n: usize) {
    let mut i = interpreter();
    let mut k = ScriptedKeyboard::new();
    for _ in 0..n {
        i.step(m, &mut k).unwrap();
    }
}

fn program(words: &[u16]) -> Machine {
    let rom: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
    Machine::with_rom(&rom).unwrap()
}

proptest! {
    #[test]
    fn add_sets_carry(a: u8, b: u8) {
        let words = [0x6000 | u16::from(a), 0x6100 | u16::from(b), 0x8014];
        let mut m = program(&words);
        steps(&mut m, words.len());
        prop_assert_eq!(m.v(0), a.wrapping_add(b));
        prop_assert_eq!(m.flag(), u8::from(u16::from(a) + u16::from(b) > 0xff));
        prop_assert_eq!(m.v(1), b);
    }

    #[test]
    fn sub_sets_not_borrow(a: u8, b: u8) {
        let (a16, b16) = (u16::from(a), u16::from(b));
        let mut m = program(&[0x6000 | a16, 0x6100 | b16, 0x8015, 0x6200 | a16, 0x6300 | b16, 0x8237]);
        steps(&mut m, 3);
        prop_assert_eq!(m.v(0), a.wrapping_sub(b));
        prop_assert_eq!(m.flag(), u8::from(a > b));
        // SUBN is the same thing the other way round
        steps(&mut m, 3);
        prop_assert_eq!(m.v(2), b.wrapping_sub(a));
        prop_assert_eq!(m.flag(), u8::from(b > a));
    }

    #[test]
    fn add_into_flag_register_keeps_flag(a: u8, b: u8) {
        let words = [0x6F00 | u16::from(a), 0x6100 | u16::from(b), 0x8F14];
        let mut m = program(&words);
        steps(&mut m, words.len());
        prop_assert_eq!(m.flag(), u8::from(u16::from(a) + u16::from(b) > 0xff));
    }

    #[test]
    fn store_then_load_round_trips(
        regs in prop::array::uniform16(any::<u8>()),
        last in 0u8..16,
        addr in 0x300u16..0xf00,
    ) {
        let x = u16::from(last) << 8;
        let mut m = program(&[0xA000 | addr, 0xF055 | x, 0xF065 | x]);
        m.registers = regs;
        steps(&mut m, 2);
        for r in 0..=last {
            prop_assert_eq!(m.memory.read_byte(addr + u16::from(r)), regs[r as usize]);
        }
        m.registers = [0; 16];
        steps(&mut m, 1);
        for r in 0..16 {
            let expected = if r <= last as usize { regs[r] } else { 0 };
            prop_assert_eq!(m.registers[r], expected);
        }
        prop_assert_eq!(m.index_register, addr);
    }

    #[test]
    fn drawing_twice_erases(
        sprite in prop::collection::vec(any::<u8>(), 1..16),
        x in 0u8..64,
        y in 0u8..32,
    ) {
        let n = sprite.len() as u16;
        let draw = 0xD010 | n;
        let mut m = program(&[0xA300, draw, draw]);
        m.memory.get_rw_slice(0x300, sprite.len()).copy_from_slice(&sprite);
        m.registers[0] = x;
        m.registers[1] = y;
        steps(&mut m, 2);
        prop_assert_eq!(m.flag(), 0);
        let lit = m.framebuffer.lit_pixels().count();
        let bits: u32 = sprite.iter().map(|b| b.count_ones()).sum();
        // rows wrap off the bottom, so nothing is lost
        prop_assert_eq!(lit as u32, bits);

        steps(&mut m, 1);
        prop_assert!(m.framebuffer.is_blank());
        prop_assert_eq!(m.flag(), u8::from(bits > 0));
    }
}
