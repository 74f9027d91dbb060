use tracing::{debug, trace, warn};

use super::{
    AbsoluteAddress, AccessInfo, AccessType, ActiveBaseTable, ActiveBaseTableEntry,
    BankDescriptor, BankName, BankType, BaseRegister, VirtualAddress,
};
use crate::constants as C;
use crate::interrupts::{AddressingExceptionReason, MachineInterrupt};
use crate::storage::Storage;

/// The base registers of a processor and the table of banks loaded into them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSpace {
    base_registers: [BaseRegister; C::BASE_REGISTER_COUNT],
    active_base_table: ActiveBaseTable,
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self {
            base_registers: [BaseRegister::void(); C::BASE_REGISTER_COUNT],
            active_base_table: ActiveBaseTable::new(),
        }
    }
}

fn addressing_exception(reason: AddressingExceptionReason, bank: BankName) -> MachineInterrupt {
    MachineInterrupt::AddressingException { reason, bank }
}

/// The S field may only be set on bank types that allow large banks
fn check_large(descriptor: &BankDescriptor, bank: BankName) -> Result<(), MachineInterrupt> {
    if descriptor.large && !descriptor.bank_type.allows_large() {
        return Err(addressing_exception(
            AddressingExceptionReason::BdTypeInvalid,
            bank,
        ));
    }
    Ok(())
}

impl AddressSpace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn base_register(&self, index: usize) -> &BaseRegister {
        &self.base_registers[index]
    }

    #[must_use]
    pub fn active_base_table(&self) -> &ActiveBaseTable {
        &self.active_base_table
    }

    /// Load a base register directly, as the LBUD/LBED family and the
    /// processor configuration do. The bank it held is forgotten.
    pub fn load_base_register(&mut self, index: usize, register: BaseRegister) {
        debug!(index, %register, "loading base register");
        self.base_registers[index] = register;
        self.active_base_table.invalidate(index);
    }

    /// Translate a virtual address, loading the bank into `base_register`
    /// when it is not already there.
    ///
    /// Level 0 names below 32 select the base register of that number and
    /// never touch bank descriptors or the active base table.
    ///
    /// # Errors
    ///
    /// Any addressing exception or reference violation found on the way. On
    /// error neither the base registers nor the active base table change.
    #[tracing::instrument(skip(self, storage), level = "trace")]
    pub fn translate<S: Storage>(
        &mut self,
        storage: &S,
        key: AccessInfo,
        address: VirtualAddress,
        base_register: usize,
        access: AccessType,
        fetch: bool,
    ) -> Result<AbsoluteAddress, MachineInterrupt> {
        let bank = address.bank;
        if bank.is_direct() {
            trace!(%bank, "direct base register reference");
            return self.base_registers[usize::from(bank.bdi)].check(
                key,
                address.offset,
                access,
                fetch,
            );
        }

        if self.active_base_table.matches(base_register, bank) {
            trace!(%bank, base_register, "bank already active");
            return self.base_registers[base_register].check(key, address.offset, access, fetch);
        }

        let (descriptor, true_bank) = self.resolve_descriptor(storage, bank, access)?;
        let register = BaseRegister::from_descriptor(&descriptor, true_bank);
        let absolute = register.check(key, address.offset, access, fetch)?;

        debug!(%bank, base_register, %register, "bank loaded by translation");
        self.base_registers[base_register] = register;
        self.active_base_table
            .set(base_register, ActiveBaseTableEntry::new(bank, 0));
        Ok(absolute)
    }

    /// Make a bank addressable through a base register (LBU, LBE, LAE, bank
    /// transfers and interrupt entry).
    ///
    /// A direct name copies the base register it names.
    ///
    /// # Errors
    ///
    /// Any addressing exception found while resolving the bank descriptor.
    #[tracing::instrument(skip(self, storage))]
    pub fn load_bank<S: Storage>(
        &mut self,
        storage: &S,
        base_register: usize,
        bank: BankName,
        access: AccessType,
    ) -> Result<(), MachineInterrupt> {
        let (register, active) = self.resolve_bank(storage, bank, access)?;
        self.install(base_register, register, active);
        Ok(())
    }

    /// The base register `bank` would be loaded with, and the name to record
    /// in the active base table, without changing anything.
    ///
    /// # Errors
    ///
    /// Any addressing exception found while resolving the bank descriptor.
    pub fn resolve_bank<S: Storage>(
        &self,
        storage: &S,
        bank: BankName,
        access: AccessType,
    ) -> Result<(BaseRegister, Option<BankName>), MachineInterrupt> {
        if bank.is_direct() {
            return Ok((self.base_registers[usize::from(bank.bdi)], None));
        }

        let (descriptor, true_bank) = self.resolve_descriptor(storage, bank, access)?;
        Ok((BaseRegister::from_descriptor(&descriptor, true_bank), Some(bank)))
    }

    /// Install a register produced by [`AddressSpace::resolve_bank`]
    pub fn install(&mut self, index: usize, register: BaseRegister, bank: Option<BankName>) {
        debug!(index, %register, "installing base register");
        self.base_registers[index] = register;
        match bank {
            Some(bank) => self
                .active_base_table
                .set(index, ActiveBaseTableEntry::new(bank, 0)),
            None => self.active_base_table.invalidate(index),
        }
    }

    /// Read the bank descriptor for `bank` from its level's table
    fn read_descriptor<S: Storage>(
        &self,
        storage: &S,
        bank: BankName,
    ) -> Result<BankDescriptor, MachineInterrupt> {
        let table = &self.base_registers[C::BDT_BASE_REGISTER + usize::from(bank.level)];
        let first = u64::from(bank.bdi) * C::BANK_DESCRIPTOR_SIZE;
        let last = first + C::BANK_DESCRIPTOR_SIZE - 1;
        if !table.contains(first) || !table.contains(last) {
            debug!(%bank, %table, "bank descriptor outside of its table");
            return Err(addressing_exception(
                AddressingExceptionReason::FatalAddressingException,
                bank,
            ));
        }

        let words = storage.read_block::<{ BankDescriptor::SIZE }>(table.absolute(first))?;
        BankDescriptor::from_words(&words)
            .ok_or_else(|| addressing_exception(AddressingExceptionReason::BdTypeInvalid, bank))
    }

    /// Find the descriptor that describes the storage of `bank`, following
    /// one gate or indirect hop, and validate it for `access`.
    ///
    /// Returns the descriptor and the true name of the bank it describes.
    fn resolve_descriptor<S: Storage>(
        &self,
        storage: &S,
        bank: BankName,
        access: AccessType,
    ) -> Result<(BankDescriptor, BankName), MachineInterrupt> {
        let mut descriptor = self.read_descriptor(storage, bank)?;
        let mut name = bank;
        check_large(&descriptor, bank)?;

        if descriptor.bank_type.is_indirection() {
            if descriptor.bank_type == BankType::Gate && access != AccessType::Enter {
                return Err(addressing_exception(
                    AddressingExceptionReason::GateBankBoundaryViolation,
                    bank,
                ));
            }

            let target = descriptor.target;
            let target_descriptor = if target.is_direct() {
                None
            } else {
                Some(self.read_descriptor(storage, target)?)
            };

            match target_descriptor {
                Some(next) if !next.bank_type.is_indirection() && !next.general_fault => {
                    trace!(from = %bank, to = %target, "following indirection");
                    descriptor = next;
                    name = target;
                }
                _ => {
                    return Err(addressing_exception(
                        AddressingExceptionReason::GBitSetIndirect,
                        target,
                    ));
                }
            }
        }

        let bdi = u64::from(name.bdi);
        if descriptor.displacement > bdi {
            warn!(
                bank = %name,
                displacement = descriptor.displacement,
                "bank descriptor displacement exceeds its index, result is architecturally undefined"
            );
            return Err(addressing_exception(
                AddressingExceptionReason::FatalAddressingException,
                name,
            ));
        }
        let true_bank = BankName::new(name.level, (bdi - descriptor.displacement) as u16);

        check_large(&descriptor, name)?;

        if descriptor.bank_type == BankType::QueueRepository {
            let reason = match access {
                AccessType::Queue => None,
                AccessType::Enter => Some(AddressingExceptionReason::EnterAccessDenied),
                AccessType::Read | AccessType::Write => {
                    Some(AddressingExceptionReason::GenericQueuingViolation)
                }
            };
            if let Some(reason) = reason {
                return Err(addressing_exception(reason, name));
            }
        }

        Ok((descriptor, true_bank))
    }

    /// Basic-mode base register holding a relative address.
    ///
    /// B12 to B15 are searched in order, or B14, B15, B12, B13 when the
    /// base register selection designator is set.
    #[must_use]
    pub fn basic_mode_base_register(&self, relative: u64, alternate_order: bool) -> Option<usize> {
        let order: [usize; 4] = if alternate_order {
            [14, 15, 12, 13]
        } else {
            [12, 13, 14, 15]
        };

        order
            .into_iter()
            .find(|index| self.base_registers[*index].contains(relative))
    }
}

/// Extended-mode base register designated by an instruction's `b` and `i`
/// fields. The i-bit selects B16–B31, but only at processor privilege 0 or 1.
#[must_use]
pub const fn extended_mode_base_register(b: u8, i: bool, privilege: u8) -> usize {
    if i && privilege < 2 {
        16 + b as usize
    } else {
        b as usize
    }
}
