use rand::rngs::StdRng;

use crate::display::{DISPLAY_HEIGHT, Framebuffer};
use crate::error::{Chip8Error, Result};

pub type Timer = u8;
pub type Address = usize;

pub const MEM_SIZE: usize = 4096;
pub const FONT_ADDR: Address = 0x000;
pub const FONT_HEIGHT: usize = 5;
pub const PC_START_ADDR: Address = 0x200;
pub const MAX_ROM_SIZE: usize = MEM_SIZE - PC_START_ADDR;
pub const NUM_REGISTERS: usize = 16;
pub const STACK_DEPTH: usize = 16;
/// I is a 16-bit register; arithmetic on it wraps here.
pub const INDEX_MASK: Address = 0xFFFF;

const FONT_DATA: [u8; 16 * FONT_HEIGHT] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Flat 4K address space with the font preloaded at [`FONT_ADDR`].
pub struct Memory {
    data: [u8; MEM_SIZE],
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        let data = {
            let mut data = [0; MEM_SIZE];
            data[FONT_ADDR..FONT_ADDR + FONT_DATA.len()].copy_from_slice(&FONT_DATA);
            data
        };

        Memory { data }
    }

    pub fn read(&self, addr: Address) -> Result<u8> {
        self.data
            .get(addr)
            .copied()
            .ok_or(Chip8Error::AddressOutOfRange { address: addr })
    }

    pub fn write(&mut self, addr: Address, value: u8) -> Result<()> {
        let cell = self
            .data
            .get_mut(addr)
            .ok_or(Chip8Error::AddressOutOfRange { address: addr })?;
        *cell = value;
        Ok(())
    }

    /// Copies a program to [`PC_START_ADDR`]. Nothing is written on failure.
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<()> {
        if rom.is_empty() || rom.len() > MAX_ROM_SIZE {
            return Err(Chip8Error::RomSize {
                size: rom.len(),
                max: MAX_ROM_SIZE,
            });
        }
        self.data[PC_START_ADDR..PC_START_ADDR + rom.len()].copy_from_slice(rom);
        Ok(())
    }

    /// `len` bytes starting at `addr`, or the first out-of-range address.
    pub fn slice(&self, addr: Address, len: usize) -> Result<&[u8]> {
        let end = addr + len;
        if end > MEM_SIZE {
            return Err(Chip8Error::AddressOutOfRange {
                address: addr.max(MEM_SIZE),
            });
        }
        Ok(&self.data[addr..end])
    }

    /// Writes all of `bytes` at `addr`, or nothing if any of them would land
    /// out of range.
    pub fn write_slice(&mut self, addr: Address, bytes: &[u8]) -> Result<()> {
        let end = addr + bytes.len();
        if end > MEM_SIZE {
            return Err(Chip8Error::AddressOutOfRange {
                address: addr.max(MEM_SIZE),
            });
        }
        self.data[addr..end].copy_from_slice(bytes);
        Ok(())
    }
}

/// A general purpose register, V0 through VF. Built from a 4-bit
/// instruction field, so it is always in range.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Register(u8);

impl Register {
    pub const V0: Register = Register(0x0);
    pub const VF: Register = Register(0xF);

    pub fn from_nibble(nibble: u8) -> Self {
        Register(nibble & 0x0F)
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

pub struct RegisterBank {
    registers: [u8; NUM_REGISTERS],
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBank {
    pub fn new() -> Self {
        RegisterBank {
            registers: [0; NUM_REGISTERS],
        }
    }

    pub fn read(&self, reg: Register) -> u8 {
        self.registers[reg.index()]
    }

    pub fn write(&mut self, reg: Register, value: u8) {
        self.registers[reg.index()] = value;
    }

    /// V0 through `last`, inclusive.
    pub fn through(&self, last: Register) -> &[u8] {
        &self.registers[..=last.index()]
    }

    /// Overwrites V0 onward with `values`.
    pub fn fill_from(&mut self, values: &[u8]) {
        self.registers[..values.len()].copy_from_slice(values);
    }
}

/// Fixed-depth return address stack.
///
/// `sp` is the number of stored addresses: a push checks for room, stores at
/// `sp`, then increments.
pub struct CallStack {
    entries: [Address; STACK_DEPTH],
    sp: usize,
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}

impl CallStack {
    pub fn new() -> Self {
        CallStack {
            entries: [0; STACK_DEPTH],
            sp: 0,
        }
    }

    pub fn push(&mut self, return_address: Address) -> Result<()> {
        if self.sp >= STACK_DEPTH {
            return Err(Chip8Error::StackOverflow { depth: self.sp });
        }
        self.entries[self.sp] = return_address;
        self.sp += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Address> {
        if self.sp == 0 {
            return Err(Chip8Error::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.entries[self.sp])
    }

    pub fn depth(&self) -> usize {
        self.sp
    }

    pub fn is_empty(&self) -> bool {
        self.sp == 0
    }
}

/// Everything an instruction can touch besides the keypad.
pub struct Chip8State {
    pub memory: Memory,
    pub registers: RegisterBank,
    pub pc: Address,
    pub index: Address,
    pub stack: CallStack,
    pub delay_timer: Timer,
    pub sound_timer: Timer,
    pub display: Framebuffer,
    pub rng: StdRng,
}

impl Chip8State {
    pub fn new(rng: StdRng) -> Self {
        Chip8State {
            memory: Memory::new(),
            registers: RegisterBank::new(),
            pc: PC_START_ADDR,
            index: 0,
            stack: CallStack::new(),
            delay_timer: 0,
            sound_timer: 0,
            display: Framebuffer::new(),
            rng,
        }
    }

    pub fn clear_display(&mut self) {
        self.display.clear();
    }

    /// Draws `rows` bytes of sprite data from I. Returns whether a lit pixel
    /// was erased.
    ///
    /// Rows below the bottom edge are never read, so only the visible part
    /// of the sprite has to lie inside memory.
    pub fn draw_sprite(&mut self, x: usize, y: usize, rows: u8) -> Result<bool> {
        let visible = usize::from(rows).min(DISPLAY_HEIGHT.saturating_sub(y));
        let sprite = self.memory.slice(self.index, visible)?;
        Ok(self.display.draw_sprite(x, y, sprite))
    }

    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }
}
