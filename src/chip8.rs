use std::path::Path;

use log::{debug, error, trace, warn};
use rand::{SeedableRng, rngs::StdRng};

use crate::display::Framebuffer;
use crate::error::{Chip8Error, Result};
use crate::instruction::decode;
use crate::keypad::Keypad;
use crate::state::{Address, Chip8State};

/// A CHIP-8 machine with one program loaded.
///
/// The driver calls [`Chip8::step`] at the instruction rate and
/// [`Chip8::tick_timers`] at 60 Hz. Nothing here blocks, including the
/// wait-for-key instruction, which rewinds the program counter and returns.
pub struct Chip8 {
    state: Chip8State,
}

impl Chip8 {
    pub fn new(rng: StdRng) -> Self {
        Chip8 {
            state: Chip8State::new(rng),
        }
    }

    /// Seeds the random source from `seed`, or from the OS when absent.
    pub fn with_seed(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Chip8::new(rng)
    }

    pub fn load_rom(&mut self, rom: &[u8]) -> Result<()> {
        self.state.memory.load_rom(rom)?;
        debug!("loaded {} byte ROM", rom.len());
        Ok(())
    }

    pub fn load_rom_file(&mut self, path: &Path) -> Result<()> {
        let rom = std::fs::read(path).map_err(|source| Chip8Error::RomRead {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_rom(&rom)
    }

    fn fetch_instruction(&mut self) -> Result<(u16, Address)> {
        let at = self.state.pc;
        let bytes = self.state.memory.slice(at, 2)?;
        let raw = u16::from_be_bytes([bytes[0], bytes[1]]);

        // Move the program counter to next instruction
        self.state.pc += 2;

        Ok((raw, at))
    }

    /// Fetches and executes one instruction.
    ///
    /// A full call stack is logged and the call skipped. Any other error
    /// halts the program; the program counter is left on the faulting
    /// instruction.
    pub fn step(&mut self, keypad: &Keypad) -> Result<()> {
        let (raw, at) = self.fetch_instruction().inspect_err(|e| error!("halting: {e}"))?;
        trace!("{at:#05X}: {raw:04X}");

        let outcome =
            decode(raw, at).and_then(|instruction| instruction.execute(&mut self.state, keypad));
        match outcome {
            Ok(()) => Ok(()),
            Err(e) if !e.is_fatal() => {
                warn!("{e} at {at:#05X}, call ignored");
                Ok(())
            }
            Err(e) => {
                self.state.pc = at;
                error!("halting: {e}");
                Err(e)
            }
        }
    }

    pub fn tick_timers(&mut self) {
        self.state.tick_timers();
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.state.display
    }

    /// True while the sound timer is running.
    pub fn sound_active(&self) -> bool {
        self.state.sound_timer > 0
    }

    pub fn state(&self) -> &Chip8State {
        &self.state
    }
}
