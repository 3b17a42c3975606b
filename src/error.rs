use std::path::PathBuf;

use crate::state::Address;

/// Everything that can go wrong while loading or running a program.
#[derive(Debug, thiserror::Error)]
pub enum Chip8Error {
    #[error("memory access out of range at {address:#06X}")]
    AddressOutOfRange { address: usize },

    #[error("stack overflow: {depth} return addresses already stored")]
    StackOverflow { depth: usize },

    #[error("stack underflow: return with an empty call stack")]
    StackUnderflow,

    #[error("unknown opcode {opcode:#06X} at {pc:#05X}")]
    UnknownOpcode { opcode: u16, pc: Address },

    #[error("ROM is {size} bytes, expected 1 to {max} bytes")]
    RomSize { size: usize, max: usize },

    #[error("could not read ROM {}", path.display())]
    RomRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Chip8Error {
    /// Whether the machine has to stop. A full call stack only drops the call.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Chip8Error::StackOverflow { .. })
    }
}

pub type Result<T> = std::result::Result<T, Chip8Error>;
