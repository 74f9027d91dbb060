use crate::addressing::AccessInfo;
use crate::constants as C;
use crate::instruction_word::AddressingMode;

/// Initial state of a processor and the storage it is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Words of main storage
    pub storage_size: usize,

    /// Unit identifier of the main storage unit
    pub storage_upi: u32,

    /// Addressing mode to start in
    pub addressing_mode: AddressingMode,

    /// Processor privilege to start at
    pub privilege: u8,

    /// Start with the executive register window selected
    pub exec_register_set: bool,

    /// Initial quantum timer value
    pub quantum: i64,

    /// Program counter of the first instruction
    pub entry_point: u32,

    /// Access key loaded in the indicator/key register
    pub access_key: AccessInfo,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            storage_size: C::STORAGE_SIZE,
            storage_upi: C::MAIN_STORAGE_UPI,
            addressing_mode: AddressingMode::Extended,
            privilege: 0,
            exec_register_set: false,
            quantum: C::DEFAULT_QUANTUM,
            entry_point: C::PROGRAM_START as u32,
            access_key: AccessInfo::default(),
        }
    }
}

impl ProcessorConfig {
    #[must_use]
    pub fn basic_mode() -> Self {
        Self {
            addressing_mode: AddressingMode::Basic,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_privilege(mut self, privilege: u8) -> Self {
        self.privilege = privilege & 0b11;
        self
    }

    #[must_use]
    pub fn with_entry_point(mut self, entry_point: u32) -> Self {
        self.entry_point = entry_point;
        self
    }

    #[must_use]
    pub fn with_storage_size(mut self, storage_size: usize) -> Self {
        self.storage_size = storage_size;
        self
    }
}
