/// Absolute word address within a storage unit
pub type Address = u64;

/// Default size of the main storage unit, in words
pub const STORAGE_SIZE: usize = 0o1_000_000;

/// Unit identifier of the default main storage unit
pub const MAIN_STORAGE_UPI: u32 = 0;

/// Default place to start executing when nothing else is given
pub const PROGRAM_START: Address = 0o1000;

/// Start of the interrupt vector table; one word per interrupt class
pub const INTERRUPT_VECTOR_TABLE: Address = 0o200;

/// Where the interrupt save frame (PAR, DR, IKR, ISW0, ISW1) is written
pub const INTERRUPT_SAVE_AREA: Address = 0o300;

/// Number of words in the interrupt save frame
pub const INTERRUPT_SAVE_FRAME_SIZE: usize = 5;

/// Number of general registers in the register set
pub const GRS_SIZE: usize = 128;

/// Relative addresses below this one reference the register set instead of storage
pub const GRS_ADDRESS_LIMIT: u64 = 0o200;

/// Number of base registers
pub const BASE_REGISTER_COUNT: usize = 32;

/// First base register holding a bank descriptor table
pub const BDT_BASE_REGISTER: usize = 16;

/// Number of words in a bank descriptor
pub const BANK_DESCRIPTOR_SIZE: u64 = 8;

/// Bank names with level 0 and a BDI below this refer to a base register directly
pub const DIRECT_BANK_LIMIT: u32 = 32;

/// Basic-mode indirect addressing gives up after this many levels
pub const MAX_INDIRECT_DEPTH: usize = 64;

/// Default quantum timer value
pub const DEFAULT_QUANTUM: i64 = 0o10000;

/// Number of interrupt classes
pub const INTERRUPT_CLASS_COUNT: usize = 0o40;
