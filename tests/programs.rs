use octet::state::{PC_START_ADDR, Register};
use octet::{Chip8, Chip8Error, Key, Keypad};

fn load(rom: &[u8]) -> Chip8 {
    let mut chip = Chip8::with_seed(Some(1));
    chip.load_rom(rom).unwrap();
    chip
}

fn v(chip: &Chip8, reg: u8) -> u8 {
    chip.state().registers.read(Register::from_nibble(reg))
}

#[test]
fn clear_load_add() {
    let mut chip = load(&[0x00, 0xE0, 0x60, 0x0A, 0x70, 0x05, 0x00, 0x00]);
    let keypad = Keypad::new();
    for _ in 0..3 {
        chip.step(&keypad).unwrap();
    }
    assert_eq!(v(&chip, 0), 15);

    // The trailing 0000 is ignored
    chip.step(&keypad).unwrap();
    assert_eq!(v(&chip, 0), 15);
    assert_eq!(chip.state().pc, PC_START_ADDR + 8);
}

#[test]
fn counting_loop() {
    // V0 += 1 until V0 == 10, then park on a jump-to-self
    let rom = [
        0x70, 0x01, // 200: V0 += 1
        0x30, 0x0A, // 202: skip if V0 == 10
        0x12, 0x00, // 204: jump 200
        0x12, 0x06, // 206: jump 206
    ];
    let mut chip = load(&rom);
    let keypad = Keypad::new();
    for _ in 0..100 {
        chip.step(&keypad).unwrap();
    }
    assert_eq!(v(&chip, 0), 10);
    assert_eq!(chip.state().pc, 0x206);
}

#[test]
fn draws_a_number_with_the_font() {
    // Draw the BCD digits of 137 side by side
    let rom = [
        0x60, 0x89, // V0 = 137
        0xA3, 0x00, // I = 0x300
        0xF0, 0x33, // BCD V0
        0xF2, 0x65, // V0..V2 = 1, 3, 7
        0x63, 0x00, // V3 = 0 (x)
        0x64, 0x00, // V4 = 0 (y)
        0xF0, 0x29, // I = glyph V0
        0xD3, 0x45, // draw
        0x73, 0x05, // x += 5
        0xF1, 0x29, // I = glyph V1
        0xD3, 0x45, // draw
        0x73, 0x05, // x += 5
        0xF2, 0x29, // I = glyph V2
        0xD3, 0x45, // draw
    ];
    let mut chip = load(&rom);
    let keypad = Keypad::new();
    for _ in 0..rom.len() / 2 {
        chip.step(&keypad).unwrap();
    }

    let fb = chip.framebuffer();
    // Glyph 1 is 0x20, 0x60, 0x20, 0x20, 0x70
    assert!(fb.pixel(2, 0));
    assert!(!fb.pixel(0, 0));
    // Glyph 3 top row 0xF0 at x = 5
    assert!((5..9).all(|x| fb.pixel(x, 0)));
    // Glyph 7 bottom rows are 0x40 at x = 10
    assert!(fb.pixel(11, 4));
    assert_eq!(v(&chip, 0xF), 0);
}

#[test]
fn waits_for_input_between_steps() {
    let rom = [
        0xF3, 0x0A, // wait for key into V3
        0x12, 0x02, // park
    ];
    let mut chip = load(&rom);
    let mut keypad = Keypad::new();

    for _ in 0..10 {
        chip.step(&keypad).unwrap();
    }
    assert_eq!(chip.state().pc, PC_START_ADDR);

    keypad.press_key(Key::KeyD);
    chip.step(&keypad).unwrap();
    assert_eq!(v(&chip, 3), 0xD);
    assert_eq!(chip.state().pc, PC_START_ADDR + 2);
}

#[test]
fn nested_calls_unwind_in_order() {
    let rom = [
        0x22, 0x06, // 200: call 206
        0x12, 0x02, // 202: park
        0x00, 0x00, // 204
        0x61, 0x01, // 206: V1 = 1
        0x22, 0x0E, // 208: call 20E
        0x00, 0xEE, // 20A: return
        0x00, 0x00, // 20C
        0x62, 0x02, // 20E: V2 = 2
        0x00, 0xEE, // 210: return
    ];
    let mut chip = load(&rom);
    let keypad = Keypad::new();
    for _ in 0..7 {
        chip.step(&keypad).unwrap();
    }
    assert_eq!((v(&chip, 1), v(&chip, 2)), (1, 2));
    assert_eq!(chip.state().pc, 0x202);
    assert!(chip.state().stack.is_empty());
}

#[test]
fn oversized_rom_is_rejected() {
    let mut chip = Chip8::with_seed(Some(1));
    let result = chip.load_rom(&[0u8; 4000]);
    assert!(matches!(result, Err(Chip8Error::RomSize { size: 4000, .. })));
}
