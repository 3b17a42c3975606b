//! A CHIP-8 virtual machine.
//!
//! [`chip8::Chip8`] is the interpreter; [`emulator::Emulator`] drives it in a
//! terminal with host keyboard input.

pub mod chip8;
pub mod clock;
pub mod display;
pub mod emulator;
pub mod error;
pub mod instruction;
pub mod keypad;
pub mod state;

pub use chip8::Chip8;
pub use error::Chip8Error;
pub use keypad::{Key, Keypad};
