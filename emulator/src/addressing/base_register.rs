use super::{
    AbsoluteAddress, AccessInfo, AccessPermissions, AccessType, BankDescriptor, BankName,
};
use crate::interrupts::{AddressingExceptionReason, MachineInterrupt, ReferenceViolationKind};
use crate::word::Word36;

/// A processor-resident window onto a bank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseRegister {
    pub base_address: AbsoluteAddress,
    pub general_permissions: AccessPermissions,
    pub special_permissions: AccessPermissions,
    pub access_lock: AccessInfo,
    pub large: bool,
    /// Raw 9-bit lower limit, see [`BaseRegister::lower_limit`]
    pub lower_limit_raw: u64,
    /// Raw 27-bit upper limit, see [`BaseRegister::upper_limit`]
    pub upper_limit_raw: u64,
    pub void: bool,
    /// Bank the register was loaded from, used to report faults
    pub bank: BankName,
}

impl Default for BaseRegister {
    fn default() -> Self {
        Self::void()
    }
}

impl BaseRegister {
    /// Size of the storage image used by the direct load and store instructions
    pub const IMAGE_SIZE: usize = 4;

    /// A register that does not describe any bank
    #[must_use]
    pub const fn void() -> Self {
        Self {
            base_address: AbsoluteAddress::new(0, 0),
            general_permissions: AccessPermissions::empty(),
            special_permissions: AccessPermissions::empty(),
            access_lock: AccessInfo { ring: 0, domain: 0 },
            large: false,
            lower_limit_raw: 0,
            upper_limit_raw: 0,
            void: true,
            bank: BankName { level: 0, bdi: 0 },
        }
    }

    /// A bank starting at `base` covering `size` words, with the same
    /// permissions for every key
    #[must_use]
    pub fn flat(base: AbsoluteAddress, size: u64, permissions: AccessPermissions) -> Self {
        Self {
            base_address: base,
            general_permissions: permissions,
            special_permissions: permissions,
            upper_limit_raw: size.saturating_sub(1) & 0o777_777_777,
            void: size == 0,
            ..Self::void()
        }
    }

    #[must_use]
    pub fn from_descriptor(descriptor: &BankDescriptor, bank: BankName) -> Self {
        Self {
            base_address: AbsoluteAddress::new(descriptor.upi, descriptor.base_address),
            general_permissions: descriptor.general_permissions,
            special_permissions: descriptor.special_permissions,
            access_lock: descriptor.access_lock,
            large: descriptor.large,
            lower_limit_raw: descriptor.lower_limit,
            upper_limit_raw: descriptor.upper_limit,
            void: false,
            bank,
        }
    }

    /// First valid relative address
    #[must_use]
    pub const fn lower_limit(&self) -> u64 {
        if self.large {
            self.lower_limit_raw << 15
        } else {
            self.lower_limit_raw << 9
        }
    }

    /// Last valid relative address
    #[must_use]
    pub const fn upper_limit(&self) -> u64 {
        if self.large {
            (self.upper_limit_raw << 6) | 0o77
        } else {
            self.upper_limit_raw
        }
    }

    #[must_use]
    pub const fn contains(&self, relative: u64) -> bool {
        !self.void && relative >= self.lower_limit() && relative <= self.upper_limit()
    }

    /// Permissions that apply to a given access key
    #[must_use]
    pub const fn permissions_for(&self, key: AccessInfo) -> AccessPermissions {
        if key.is_privileged_for(self.access_lock) {
            self.special_permissions
        } else {
            self.general_permissions
        }
    }

    /// Absolute address of a relative address, without any check
    #[must_use]
    pub const fn absolute(&self, relative: u64) -> AbsoluteAddress {
        self.base_address
            .add(relative.wrapping_sub(self.lower_limit()))
    }

    /// Validate a reference through this register and return its absolute address.
    ///
    /// # Errors
    ///
    /// A limits failure or a read/write denial raises a reference violation,
    /// an enter denial raises an addressing exception.
    pub fn check(
        &self,
        key: AccessInfo,
        relative: u64,
        access: AccessType,
        fetch: bool,
    ) -> Result<AbsoluteAddress, MachineInterrupt> {
        if !self.contains(relative) {
            return Err(MachineInterrupt::ReferenceViolation {
                kind: ReferenceViolationKind::StorageLimitsViolation,
                fetch,
            });
        }

        let permissions = self.permissions_for(key);
        match access {
            AccessType::Enter if !permissions.contains(AccessPermissions::ENTER) => {
                return Err(MachineInterrupt::AddressingException {
                    reason: AddressingExceptionReason::EnterAccessDenied,
                    bank: self.bank,
                });
            }
            AccessType::Read if !permissions.contains(AccessPermissions::READ) => {
                return Err(MachineInterrupt::ReferenceViolation {
                    kind: ReferenceViolationKind::ReadAccessViolation,
                    fetch,
                });
            }
            AccessType::Write if !permissions.contains(AccessPermissions::WRITE) => {
                return Err(MachineInterrupt::ReferenceViolation {
                    kind: ReferenceViolationKind::WriteAccessViolation,
                    fetch,
                });
            }
            AccessType::Queue
                if !permissions.contains(AccessPermissions::READ | AccessPermissions::WRITE) =>
            {
                return Err(MachineInterrupt::ReferenceViolation {
                    kind: ReferenceViolationKind::WriteAccessViolation,
                    fetch,
                });
            }
            _ => {}
        }

        Ok(self.absolute(relative))
    }

    /// Storage image: word 0 holds the permissions, the void and large flags
    /// and the lock, word 1 the raw limits, word 2 the UPI and word 3 the base.
    #[must_use]
    pub fn to_image(&self) -> [Word36; Self::IMAGE_SIZE] {
        let w0 = (u64::from(self.general_permissions.bits()) << 33)
            | (u64::from(self.special_permissions.bits()) << 30)
            | (u64::from(self.void) << 29)
            | (u64::from(self.large) << 21)
            | self.access_lock.bits();
        [
            Word36::new(w0),
            Word36::new((self.lower_limit_raw << 27) | self.upper_limit_raw),
            Word36::POSITIVE_ZERO.with_s1(u64::from(self.base_address.upi)),
            Word36::new(self.base_address.offset),
        ]
    }

    #[must_use]
    pub fn from_image(image: &[Word36; Self::IMAGE_SIZE]) -> Self {
        let w0 = image[0];
        Self {
            base_address: AbsoluteAddress::new(image[2].s1() as u32, image[3].bits()),
            general_permissions: AccessPermissions::from_bits_truncate((w0.s1() >> 3) as u8),
            special_permissions: AccessPermissions::from_bits_truncate((w0.s1() & 0o7) as u8),
            access_lock: AccessInfo::from_bits(w0.h2()),
            large: w0.bit(14),
            lower_limit_raw: image[1].bits() >> 27,
            upper_limit_raw: image[1].bits() & 0o777_777_777,
            void: w0.bit(6),
            bank: BankName::default(),
        }
    }
}

impl std::fmt::Display for BaseRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.void {
            return write!(f, "void");
        }

        write!(
            f,
            "{} base={} limits={:o}..={:o} gap={} sap={} lock={}",
            self.bank,
            self.base_address,
            self.lower_limit(),
            self.upper_limit(),
            self.general_permissions,
            self.special_permissions,
            self.access_lock
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::BankType;
    use pretty_assertions::assert_eq;

    fn register() -> BaseRegister {
        let descriptor = BankDescriptor::new(BankType::ExtendedMode)
            .with_permissions(
                AccessPermissions::READ,
                AccessPermissions::all(),
            )
            .with_lock(AccessInfo { ring: 2, domain: 9 })
            .with_limits(1, 0o1777)
            .with_base(0, 0o10000);
        BaseRegister::from_descriptor(&descriptor, BankName::new(1, 4))
    }

    #[test]
    fn limits_test() {
        let br = register();
        assert_eq!(br.lower_limit(), 0o1000);
        assert_eq!(br.upper_limit(), 0o1777);
        assert!(br.contains(0o1000));
        assert!(!br.contains(0o777));
        assert!(!br.contains(0o2000));

        let large = BaseRegister {
            large: true,
            ..br
        };
        assert_eq!(large.lower_limit(), 0o100_000);
        assert_eq!(large.upper_limit(), 0o177_777);
    }

    #[test]
    fn check_test() {
        let br = register();
        let user = AccessInfo { ring: 3, domain: 1 };
        let owner = AccessInfo { ring: 3, domain: 9 };

        assert_eq!(
            br.check(user, 0o1005, AccessType::Read, false),
            Ok(AbsoluteAddress::new(0, 0o10005))
        );
        assert_eq!(
            br.check(user, 0o1005, AccessType::Write, false),
            Err(MachineInterrupt::ReferenceViolation {
                kind: ReferenceViolationKind::WriteAccessViolation,
                fetch: false,
            })
        );
        assert_eq!(
            br.check(user, 0o1005, AccessType::Enter, false),
            Err(MachineInterrupt::AddressingException {
                reason: AddressingExceptionReason::EnterAccessDenied,
                bank: BankName::new(1, 4),
            })
        );
        assert!(br.check(owner, 0o1005, AccessType::Write, false).is_ok());
        assert_eq!(
            br.check(owner, 0o2000, AccessType::Read, true),
            Err(MachineInterrupt::ReferenceViolation {
                kind: ReferenceViolationKind::StorageLimitsViolation,
                fetch: true,
            })
        );
    }

    #[test]
    fn void_test() {
        let br = BaseRegister::void();
        assert!(!br.contains(0));
        assert_eq!(br.to_string(), "void");
    }

    #[test]
    fn image_test() {
        let br = BaseRegister {
            bank: BankName::default(),
            ..register()
        };
        let image = br.to_image();
        assert_eq!(image[0], Word36::new(0o270_000_400_011));
        assert_eq!(BaseRegister::from_image(&image), br);

        let void = BaseRegister::void();
        assert_eq!(BaseRegister::from_image(&void.to_image()), void);
    }
}
