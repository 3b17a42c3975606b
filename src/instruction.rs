use rand::Rng;

use crate::display::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::error::{Chip8Error, Result};
use crate::keypad::{Key, Keypad};
use crate::state::{Address, Chip8State, FONT_ADDR, FONT_HEIGHT, INDEX_MASK, Register};

pub trait Instruction {
    fn execute(&self, state: &mut Chip8State, keypad: &Keypad) -> Result<()>;
}

/// Classifies a raw instruction fetched from `at`.
pub fn decode(raw: u16, at: Address) -> Result<Box<dyn Instruction>> {
    let decoded = DecodedInstruction::new(raw);
    let unknown = || Chip8Error::UnknownOpcode { opcode: raw, pc: at };

    match decoded.opcode {
        0x0 => match decoded.nnn {
            0x0E0 => Ok(Box::new(ClearScreen)),
            0x0EE => Ok(Box::new(SubroutineReturn)),
            _ => Ok(Box::new(MachineRoutine(decoded))),
        },
        0x1 => Ok(Box::new(Jump(decoded))),
        0x2 => Ok(Box::new(SubroutineCall(decoded))),
        0x3 => Ok(Box::new(SkipEqImmediate(decoded))),
        0x4 => Ok(Box::new(SkipNeqImmediate(decoded))),
        0x5 if decoded.n == 0 => Ok(Box::new(SkipXEqY(decoded))),
        0x6 => Ok(Box::new(SetImmediate(decoded))),
        0x7 => Ok(Box::new(AddImmediate(decoded))),
        0x8 => match decoded.n {
            0x0 => Ok(Box::new(SetXToY(decoded))),
            0x1 => Ok(Box::new(BinaryOr(decoded))),
            0x2 => Ok(Box::new(BinaryAnd(decoded))),
            0x3 => Ok(Box::new(BinaryXor(decoded))),
            0x4 => Ok(Box::new(AddWithCarry(decoded))),
            0x5 => Ok(Box::new(SubtractYFromX(decoded))),
            0x6 => Ok(Box::new(RightShift(decoded))),
            0x7 => Ok(Box::new(SubtractXFromY(decoded))),
            0xE => Ok(Box::new(LeftShift(decoded))),
            _ => Err(unknown()),
        },
        0x9 if decoded.n == 0 => Ok(Box::new(SkipXNeqY(decoded))),
        0xA => Ok(Box::new(SetIndex(decoded))),
        0xB => Ok(Box::new(JumpWithOffset(decoded))),
        0xC => Ok(Box::new(Random(decoded))),
        0xD => Ok(Box::new(Draw(decoded))),
        0xE => match decoded.nn {
            0x9E => Ok(Box::new(SkipIfKeyPressed(decoded))),
            0xA1 => Ok(Box::new(SkipIfKeyNotPressed(decoded))),
            _ => Err(unknown()),
        },
        0xF => match decoded.nn {
            0x07 => Ok(Box::new(SetVxFromTimer(decoded))),
            0x0A => Ok(Box::new(WaitForKey(decoded))),
            0x15 => Ok(Box::new(SetDelayTimer(decoded))),
            0x18 => Ok(Box::new(SetSoundTimer(decoded))),
            0x1E => Ok(Box::new(AddToIndex(decoded))),
            0x29 => Ok(Box::new(FontChar(decoded))),
            0x33 => Ok(Box::new(BinaryCodedDecimal(decoded))),
            0x55 => Ok(Box::new(Store(decoded))),
            0x65 => Ok(Box::new(Load(decoded))),
            _ => Err(unknown()),
        },
        _ => Err(unknown()),
    }
}

struct DecodedInstruction {
    /// First nibble. Selects the instruction family.
    opcode: u8,
    /// Second nibble. Used to look up one of the 16 registers.
    x: Register,
    /// Third nibble. Used to look up one of the 16 registers.
    y: Register,
    /// Fourth nibble. A 4-bit number.
    n: u8,
    /// The second byte (third and fourth nibbles). An 8-bit immediate number.
    nn: u8,
    /// The second, third, and fourth nibbles. A 12-bit immediate address.
    nnn: Address,
}

impl DecodedInstruction {
    fn new(raw: u16) -> Self {
        DecodedInstruction {
            opcode: (raw >> 12) as u8,
            x: Register::from_nibble((raw >> 8) as u8),
            y: Register::from_nibble((raw >> 4) as u8),
            n: (raw & 0x0F) as u8,
            nn: (raw & 0x00FF) as u8,
            nnn: usize::from(raw & 0x0FFF),
        }
    }

    fn operands(&self, state: &Chip8State) -> (u8, u8) {
        (
            state.registers.read(self.x),
            state.registers.read(self.y),
        )
    }
}

/// Stores `value` in Vx and then the flag in VF, so the flag wins when x is F.
fn write_with_flag(state: &mut Chip8State, reg_x: Register, value: u8, flag: bool) {
    state.registers.write(reg_x, value);
    state.registers.write(Register::VF, u8::from(flag));
}

fn skip_if(state: &mut Chip8State, condition: bool) {
    if condition {
        state.pc += 2;
    }
}

struct ClearScreen;
impl Instruction for ClearScreen {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        state.clear_display();
        Ok(())
    }
}

struct SubroutineReturn;
impl Instruction for SubroutineReturn {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        state.pc = state.stack.pop()?;
        Ok(())
    }
}

/// 0NNN calls native code on the COSMAC VIP. There is none to run.
struct MachineRoutine(DecodedInstruction);
impl Instruction for MachineRoutine {
    fn execute(&self, _state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        log::debug!("ignoring machine code routine at {:#05X}", self.0.nnn);
        Ok(())
    }
}

struct Jump(DecodedInstruction);
impl Instruction for Jump {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        state.pc = self.0.nnn;
        Ok(())
    }
}

struct SubroutineCall(DecodedInstruction);
impl Instruction for SubroutineCall {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        state.stack.push(state.pc)?;
        state.pc = self.0.nnn;
        Ok(())
    }
}

struct SkipEqImmediate(DecodedInstruction);
impl Instruction for SkipEqImmediate {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let value_x = state.registers.read(self.0.x);
        skip_if(state, value_x == self.0.nn);
        Ok(())
    }
}

struct SkipNeqImmediate(DecodedInstruction);
impl Instruction for SkipNeqImmediate {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let value_x = state.registers.read(self.0.x);
        skip_if(state, value_x != self.0.nn);
        Ok(())
    }
}

struct SkipXEqY(DecodedInstruction);
impl Instruction for SkipXEqY {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let (value_x, value_y) = self.0.operands(state);
        skip_if(state, value_x == value_y);
        Ok(())
    }
}

struct SkipXNeqY(DecodedInstruction);
impl Instruction for SkipXNeqY {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let (value_x, value_y) = self.0.operands(state);
        skip_if(state, value_x != value_y);
        Ok(())
    }
}

struct SetImmediate(DecodedInstruction);
impl Instruction for SetImmediate {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        state.registers.write(self.0.x, self.0.nn);
        Ok(())
    }
}

struct AddImmediate(DecodedInstruction);
impl Instruction for AddImmediate {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let value_x = state.registers.read(self.0.x);
        state
            .registers
            .write(self.0.x, value_x.wrapping_add(self.0.nn));
        Ok(())
    }
}

struct SetXToY(DecodedInstruction);
impl Instruction for SetXToY {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let value_y = state.registers.read(self.0.y);
        state.registers.write(self.0.x, value_y);
        Ok(())
    }
}

struct BinaryOr(DecodedInstruction);
impl Instruction for BinaryOr {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let (value_x, value_y) = self.0.operands(state);
        state.registers.write(self.0.x, value_x | value_y);
        Ok(())
    }
}

struct BinaryAnd(DecodedInstruction);
impl Instruction for BinaryAnd {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let (value_x, value_y) = self.0.operands(state);
        state.registers.write(self.0.x, value_x & value_y);
        Ok(())
    }
}

struct BinaryXor(DecodedInstruction);
impl Instruction for BinaryXor {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let (value_x, value_y) = self.0.operands(state);
        state.registers.write(self.0.x, value_x ^ value_y);
        Ok(())
    }
}

struct AddWithCarry(DecodedInstruction);
impl Instruction for AddWithCarry {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let (value_x, value_y) = self.0.operands(state);
        let (sum, carry) = value_x.overflowing_add(value_y);
        write_with_flag(state, self.0.x, sum, carry);
        Ok(())
    }
}

struct SubtractYFromX(DecodedInstruction);
impl Instruction for SubtractYFromX {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let (value_x, value_y) = self.0.operands(state);
        write_with_flag(
            state,
            self.0.x,
            value_x.wrapping_sub(value_y),
            value_x > value_y,
        );
        Ok(())
    }
}

struct SubtractXFromY(DecodedInstruction);
impl Instruction for SubtractXFromY {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let (value_x, value_y) = self.0.operands(state);
        write_with_flag(
            state,
            self.0.x,
            value_y.wrapping_sub(value_x),
            value_y > value_x,
        );
        Ok(())
    }
}

struct RightShift(DecodedInstruction);
impl Instruction for RightShift {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let value_x = state.registers.read(self.0.x);
        write_with_flag(state, self.0.x, value_x >> 1, value_x & 0x01 == 1);
        Ok(())
    }
}

struct LeftShift(DecodedInstruction);
impl Instruction for LeftShift {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let value_x = state.registers.read(self.0.x);
        write_with_flag(state, self.0.x, value_x << 1, value_x >> 7 == 1);
        Ok(())
    }
}

struct SetIndex(DecodedInstruction);
impl Instruction for SetIndex {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        state.index = self.0.nnn;
        Ok(())
    }
}

struct JumpWithOffset(DecodedInstruction);
impl Instruction for JumpWithOffset {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        state.pc = usize::from(state.registers.read(Register::V0)) + self.0.nnn;
        Ok(())
    }
}

struct Random(DecodedInstruction);
impl Instruction for Random {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let random_value = state.rng.random::<u8>() & self.0.nn;
        state.registers.write(self.0.x, random_value);
        Ok(())
    }
}

struct Draw(DecodedInstruction);
impl Instruction for Draw {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let (value_x, value_y) = self.0.operands(state);
        let collision = state.draw_sprite(
            usize::from(value_x) % DISPLAY_WIDTH,
            usize::from(value_y) % DISPLAY_HEIGHT,
            self.0.n,
        )?;
        state.registers.write(Register::VF, u8::from(collision));
        Ok(())
    }
}

fn key_in(state: &Chip8State, reg: Register, keypad: &Keypad) -> bool {
    Key::from_index(state.registers.read(reg)).is_some_and(|key| keypad.is_key_pressed(key))
}

struct SkipIfKeyPressed(DecodedInstruction);
impl Instruction for SkipIfKeyPressed {
    fn execute(&self, state: &mut Chip8State, keypad: &Keypad) -> Result<()> {
        let is_key_pressed = key_in(state, self.0.x, keypad);
        skip_if(state, is_key_pressed);
        Ok(())
    }
}

struct SkipIfKeyNotPressed(DecodedInstruction);
impl Instruction for SkipIfKeyNotPressed {
    fn execute(&self, state: &mut Chip8State, keypad: &Keypad) -> Result<()> {
        let is_key_pressed = key_in(state, self.0.x, keypad);
        skip_if(state, !is_key_pressed);
        Ok(())
    }
}

struct SetVxFromTimer(DecodedInstruction);
impl Instruction for SetVxFromTimer {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        state.registers.write(self.0.x, state.delay_timer);
        Ok(())
    }
}

struct WaitForKey(DecodedInstruction);
impl Instruction for WaitForKey {
    fn execute(&self, state: &mut Chip8State, keypad: &Keypad) -> Result<()> {
        match keypad.first_pressed() {
            Some(key) => state.registers.write(self.0.x, key.index()),
            // Run this instruction again on the next step
            None => state.pc -= 2,
        }
        Ok(())
    }
}

struct SetDelayTimer(DecodedInstruction);
impl Instruction for SetDelayTimer {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        state.delay_timer = state.registers.read(self.0.x);
        Ok(())
    }
}

struct SetSoundTimer(DecodedInstruction);
impl Instruction for SetSoundTimer {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        state.sound_timer = state.registers.read(self.0.x);
        Ok(())
    }
}

struct AddToIndex(DecodedInstruction);
impl Instruction for AddToIndex {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let value_x = state.registers.read(self.0.x);
        state.index = (state.index + usize::from(value_x)) & INDEX_MASK;
        Ok(())
    }
}

struct FontChar(DecodedInstruction);
impl Instruction for FontChar {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let value_x = state.registers.read(self.0.x);
        state.index = FONT_ADDR + usize::from(value_x) * FONT_HEIGHT;
        Ok(())
    }
}

struct BinaryCodedDecimal(DecodedInstruction);
impl Instruction for BinaryCodedDecimal {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let value_x = state.registers.read(self.0.x);
        let bcd = [value_x / 100, (value_x / 10) % 10, value_x % 10];
        state.memory.write_slice(state.index, &bcd)
    }
}

struct Store(DecodedInstruction);
impl Instruction for Store {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        state
            .memory
            .write_slice(state.index, state.registers.through(self.0.x))
    }
}

struct Load(DecodedInstruction);
impl Instruction for Load {
    fn execute(&self, state: &mut Chip8State, _keypad: &Keypad) -> Result<()> {
        let values = state.memory.slice(state.index, self.0.x.index() + 1)?;
        state.registers.fill_from(values);
        Ok(())
    }
}
