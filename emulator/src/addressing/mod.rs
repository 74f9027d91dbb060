//! Virtual to absolute address translation.
//!
//! A virtual address names a bank by level and bank descriptor index (BDI)
//! plus an offset in that bank. Banks are described by bank descriptors that
//! live in storage, in one bank descriptor table per level, and are made
//! addressable by loading them into one of the 32 base registers.

mod active_base_table;
mod bank_descriptor;
mod base_register;
mod translate;

use bitflags::bitflags;
use parse_display::Display;

use crate::constants as C;

pub use self::active_base_table::{ActiveBaseTable, ActiveBaseTableEntry};
pub use self::bank_descriptor::{BankDescriptor, BankType};
pub use self::base_register::BaseRegister;
pub use self::translate::{extended_mode_base_register, AddressSpace};

bitflags! {
    /// Enter, read and write permissions, in their architectural 3-bit layout
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessPermissions: u8 {
        const ENTER = 0b100;
        const READ  = 0b010;
        const WRITE = 0b001;
    }
}

impl Default for AccessPermissions {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Display for AccessPermissions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flag = |flag, c| if self.contains(flag) { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(Self::ENTER, 'E'),
            flag(Self::READ, 'R'),
            flag(Self::WRITE, 'W')
        )
    }
}

/// Kind of reference being validated against a bank
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display(style = "lowercase")]
pub enum AccessType {
    Enter,
    Read,
    Write,
    /// Enqueue/dequeue class references, the only ones a queue repository accepts
    Queue,
}

/// Ring and domain, used both as an access key (IKR) and an access lock (bank)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AccessInfo {
    pub ring: u8,
    pub domain: u16,
}

impl AccessInfo {
    /// Decode the 18-bit form: ring in the top two bits, domain in the low 16
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            ring: ((bits >> 16) & 0b11) as u8,
            domain: (bits & 0o177_777) as u16,
        }
    }

    #[must_use]
    pub const fn bits(self) -> u64 {
        ((self.ring as u64 & 0b11) << 16) | self.domain as u64
    }

    /// Whether a holder of this key gets the special permissions of a bank
    /// locked with `lock`, rather than its general ones
    #[must_use]
    pub const fn is_privileged_for(self, lock: AccessInfo) -> bool {
        self.ring < lock.ring || self.domain == lock.domain
    }
}

impl std::fmt::Display for AccessInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{:06o}", self.ring, self.domain)
    }
}

/// A word address in a given storage unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AbsoluteAddress {
    /// Unit identifier of the storage unit
    pub upi: u32,
    pub offset: C::Address,
}

impl AbsoluteAddress {
    #[must_use]
    pub const fn new(upi: u32, offset: C::Address) -> Self {
        Self { upi, offset }
    }

    /// The address `count` words further
    #[must_use]
    pub const fn add(self, count: u64) -> Self {
        Self {
            upi: self.upi,
            offset: self.offset + count,
        }
    }
}

impl std::fmt::Display for AbsoluteAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:o}", self.upi, self.offset)
    }
}

/// Level and bank descriptor index of a bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BankName {
    /// 0–7
    pub level: u8,
    /// 15-bit bank descriptor index
    pub bdi: u16,
}

impl BankName {
    #[must_use]
    pub const fn new(level: u8, bdi: u16) -> Self {
        Self {
            level: level & 0o7,
            bdi: bdi & 0o77_777,
        }
    }

    /// Decode the 18-bit form used in H1 of the PAR and of vectors
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self::new(((bits >> 15) & 0o7) as u8, (bits & 0o77_777) as u16)
    }

    #[must_use]
    pub const fn bits(self) -> u64 {
        ((self.level as u64) << 15) | self.bdi as u64
    }

    /// Level 0 names below 32 select a base register directly
    #[must_use]
    pub const fn is_direct(self) -> bool {
        self.level == 0 && (self.bdi as u32) < C::DIRECT_BANK_LIMIT
    }
}

impl std::fmt::Display for BankName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:05o}", self.level, self.bdi)
    }
}

/// A (level, BDI, offset) triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VirtualAddress {
    pub bank: BankName,
    pub offset: u64,
}

impl VirtualAddress {
    #[must_use]
    pub const fn new(level: u8, bdi: u16, offset: u64) -> Self {
        Self {
            bank: BankName::new(level, bdi),
            offset,
        }
    }
}

impl std::fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}+{:o}", self.bank, self.offset)
    }
}
