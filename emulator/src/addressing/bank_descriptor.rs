use parse_display::Display;

use super::{AccessInfo, AccessPermissions, BankName};
use crate::word::Word36;

/// Type field of a bank descriptor (word 0, bits 8–11)
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BankType {
    #[default]
    ExtendedMode,
    BasicMode,
    Gate,
    Indirect,
    Queue,
    QueueRepository,
}

impl BankType {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::ExtendedMode => 0,
            Self::BasicMode => 1,
            Self::Gate => 2,
            Self::Indirect => 3,
            Self::Queue => 4,
            Self::QueueRepository => 6,
        }
    }

    /// Decode a type field; reserved codes yield `None`
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::ExtendedMode,
            1 => Self::BasicMode,
            2 => Self::Gate,
            3 => Self::Indirect,
            4 => Self::Queue,
            6 => Self::QueueRepository,
            _ => return None,
        })
    }

    /// Whether the S (large bank) bit may be set for this type
    #[must_use]
    pub const fn allows_large(self) -> bool {
        matches!(self, Self::ExtendedMode | Self::Queue)
    }

    /// Gate and indirect descriptors name another bank instead of describing storage
    #[must_use]
    pub const fn is_indirection(self) -> bool {
        matches!(self, Self::Gate | Self::Indirect)
    }
}

/// An 8-word bank descriptor as found in a bank descriptor table.
///
/// Only the first four words are interpreted; the remaining ones are kept so
/// that a descriptor survives a read/modify/write cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BankDescriptor {
    pub general_permissions: AccessPermissions,
    pub special_permissions: AccessPermissions,
    pub bank_type: BankType,
    /// G bit: the bank may not be the target of a gate or indirect descriptor
    pub general_fault: bool,
    /// S bit: large bank, coarser limit granularity
    pub large: bool,
    /// U bit: upper limit suppression
    pub upper_limit_suppression: bool,
    pub access_lock: AccessInfo,
    /// Raw 9-bit lower limit
    pub lower_limit: u64,
    /// Raw 27-bit upper limit
    pub upper_limit: u64,
    /// Target of a gate or indirect descriptor
    pub target: BankName,
    pub upi: u32,
    pub displacement: u64,
    pub base_address: u64,
    pub extra: [Word36; 4],
}

impl BankDescriptor {
    /// Size of a descriptor in storage
    pub const SIZE: usize = 8;

    #[must_use]
    pub fn new(bank_type: BankType) -> Self {
        Self {
            bank_type,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_permissions(
        mut self,
        general: AccessPermissions,
        special: AccessPermissions,
    ) -> Self {
        self.general_permissions = general;
        self.special_permissions = special;
        self
    }

    #[must_use]
    pub fn with_lock(mut self, lock: AccessInfo) -> Self {
        self.access_lock = lock;
        self
    }

    #[must_use]
    pub fn with_limits(mut self, lower: u64, upper: u64) -> Self {
        self.lower_limit = lower & 0o777;
        self.upper_limit = upper & 0o777_777_777;
        self
    }

    #[must_use]
    pub fn with_base(mut self, upi: u32, base_address: u64) -> Self {
        self.upi = upi;
        self.base_address = base_address;
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: BankName) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub fn with_displacement(mut self, displacement: u64) -> Self {
        self.displacement = displacement & 0o777_777;
        self
    }

    #[must_use]
    pub fn with_large(mut self, large: bool) -> Self {
        self.large = large;
        self
    }

    #[must_use]
    pub fn with_general_fault(mut self, general_fault: bool) -> Self {
        self.general_fault = general_fault;
        self
    }

    /// Decode a descriptor; a reserved bank type yields `None`
    #[must_use]
    pub fn from_words(words: &[Word36; Self::SIZE]) -> Option<Self> {
        let w0 = words[0];
        let bank_type = BankType::from_code(((w0.bits() >> 24) & 0o17) as u8)?;

        let (target, lower_limit, upper_limit) = if bank_type.is_indirection() {
            (BankName::from_bits(words[1].h1()), 0, 0)
        } else {
            (
                BankName::default(),
                words[1].bits() >> 27,
                words[1].bits() & 0o777_777_777,
            )
        };

        Some(Self {
            general_permissions: AccessPermissions::from_bits_truncate((w0.s1() >> 3) as u8),
            special_permissions: AccessPermissions::from_bits_truncate((w0.s1() & 0o7) as u8),
            bank_type,
            general_fault: w0.bit(12),
            large: w0.bit(14),
            upper_limit_suppression: w0.bit(15),
            access_lock: AccessInfo::from_bits(w0.h2()),
            lower_limit,
            upper_limit,
            target,
            upi: words[2].s1() as u32,
            displacement: words[2].h2(),
            base_address: words[3].bits(),
            extra: [words[4], words[5], words[6], words[7]],
        })
    }

    #[must_use]
    pub fn to_words(&self) -> [Word36; Self::SIZE] {
        let w0 = (u64::from(self.general_permissions.bits()) << 33)
            | (u64::from(self.special_permissions.bits()) << 30)
            | (u64::from(self.bank_type.code()) << 24)
            | (u64::from(self.general_fault) << 23)
            | (u64::from(self.large) << 21)
            | (u64::from(self.upper_limit_suppression) << 20)
            | self.access_lock.bits();

        let w1 = if self.bank_type.is_indirection() {
            Word36::POSITIVE_ZERO.with_h1(self.target.bits())
        } else {
            Word36::new((self.lower_limit << 27) | self.upper_limit)
        };

        let w2 = Word36::POSITIVE_ZERO
            .with_s1(u64::from(self.upi))
            .with_h2(self.displacement);

        [
            Word36::new(w0),
            w1,
            w2,
            Word36::new(self.base_address),
            self.extra[0],
            self.extra[1],
            self.extra[2],
            self.extra[3],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn layout_test() {
        let descriptor = BankDescriptor::new(BankType::BasicMode)
            .with_permissions(
                AccessPermissions::READ,
                AccessPermissions::ENTER | AccessPermissions::READ | AccessPermissions::WRITE,
            )
            .with_lock(AccessInfo { ring: 1, domain: 5 })
            .with_limits(1, 0o7777)
            .with_base(2, 0o40000)
            .with_displacement(3);

        let words = descriptor.to_words();
        assert_eq!(words[0], Word36::new(0o270_100_200_005));
        assert_eq!(words[1], Word36::new(0o001_000_007_777));
        assert_eq!(words[2], Word36::new(0o020_000_000_003));
        assert_eq!(words[3], Word36::new(0o40000));
        assert_eq!(BankDescriptor::from_words(&words), Some(descriptor));
    }

    #[test]
    fn indirect_target_test() {
        let descriptor =
            BankDescriptor::new(BankType::Indirect).with_target(BankName::new(2, 0o17));
        let words = descriptor.to_words();
        assert_eq!(words[1].h1(), 0o200_017);
        assert_eq!(
            BankDescriptor::from_words(&words).map(|d| d.target),
            Some(BankName::new(2, 0o17))
        );
    }

    #[test]
    fn reserved_type_test() {
        let mut words = [Word36::POSITIVE_ZERO; BankDescriptor::SIZE];
        words[0] = Word36::new(5 << 24);
        assert_eq!(BankDescriptor::from_words(&words), None);
    }

    #[test]
    fn type_rules_test() {
        assert!(BankType::ExtendedMode.allows_large());
        assert!(BankType::Queue.allows_large());
        assert!(!BankType::BasicMode.allows_large());
        assert!(!BankType::Gate.allows_large());
        assert!(!BankType::Indirect.allows_large());
        assert!(!BankType::QueueRepository.allows_large());
    }
}
