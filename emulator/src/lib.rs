//! Instruction processor of a 36-bit ones-complement mainframe.

pub mod addressing;
pub mod config;
pub mod constants;
pub mod instruction_word;
pub mod instructions;
pub mod interrupts;
pub mod io;
pub mod loader;
pub mod processor;
pub mod registers;
pub mod storage;
pub mod word;

pub use self::{
    config::ProcessorConfig,
    instruction_word::{AddressingMode, InstructionWord},
    instructions::{decode, Disassembly, Mnemonic},
    interrupts::MachineInterrupt,
    loader::{Image, LoadError},
    processor::{Processor, ProcessorError, StopReason},
    storage::{MainStorage, Storage},
    word::Word36,
};
