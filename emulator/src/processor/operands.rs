//! Operand address formation and operand access.

use tracing::{debug, trace};

use super::Processor;
use crate::addressing::{extended_mode_base_register, AbsoluteAddress, AccessType};
use crate::constants as C;
use crate::instruction_word::{AddressingMode, InstructionWord, PartialWord};
use crate::interrupts::{
    AddressingExceptionReason, InvalidInstructionReason, MachineInterrupt,
};
use crate::registers::{DesignatorRegister, GeneralRegisterSet, IndexWidth, A0, R0, X0};
use crate::storage::Storage;
use crate::word::{ones_complement_add, Word36};

/// Where an operand lives once its address is formed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Location {
    /// A physical general register, addressed as storage
    Register(usize),

    /// A word of storage
    Storage {
        address: AbsoluteAddress,
        base_register: usize,
        relative: u64,
    },
}

type Result<T> = std::result::Result<T, MachineInterrupt>;

/// Bits 14–35 of an instruction word: x, h, i and u
const INDIRECT_FIELDS_MASK: u64 = 0o17_777_777;

impl<S: Storage> Processor<S> {
    pub(crate) fn index_width(&self) -> IndexWidth {
        if self.designators.uses_24bit_indexing() {
            IndexWidth::Bits24
        } else {
            IndexWidth::Bits18
        }
    }

    fn resolve_register(&self, logical: usize) -> usize {
        GeneralRegisterSet::resolve(logical, self.designators.exec_register_set())
    }

    /// Physical index of A(a)
    pub(crate) fn a_index(&self, a: u8) -> usize {
        self.resolve_register(A0 + usize::from(a))
    }

    /// Physical index of X(a)
    pub(crate) fn x_index(&self, a: u8) -> usize {
        self.resolve_register(X0 + usize::from(a))
    }

    /// Physical index of R(a)
    pub(crate) fn r_index(&self, a: u8) -> usize {
        self.resolve_register(R0 + usize::from(a))
    }

    /// A(a) in the active register set
    #[must_use]
    pub fn a(&self, a: u8) -> Word36 {
        self.registers.read(self.a_index(a))
    }

    pub(crate) fn set_a(&mut self, a: u8, word: Word36) {
        let index = self.a_index(a);
        self.registers.write(index, word);
    }

    /// A(a) and A(a+1)
    pub(crate) fn a_pair(&self, a: u8) -> (Word36, Word36) {
        let index = self.a_index(a);
        (
            self.registers.read(index),
            self.registers.read((index + 1) % C::GRS_SIZE),
        )
    }

    pub(crate) fn set_a_pair(&mut self, a: u8, (high, low): (Word36, Word36)) {
        let index = self.a_index(a);
        self.registers.write(index, high);
        self.registers.write((index + 1) % C::GRS_SIZE, low);
    }

    /// Partial word selected by j, for the instructions that have one
    pub(crate) fn partial_word(&self, instruction: InstructionWord) -> PartialWord {
        if instruction.f() < 0o70 && instruction.f() != 0o07 {
            instruction.partial_word(self.designators.quarter_word_mode())
        } else {
            PartialWord::W
        }
    }

    /// Form the relative address of an operand: the address field plus the
    /// index modifier, following basic-mode indirect chains.
    pub(crate) fn relative_address(&self, instruction: InstructionWord) -> Result<u64> {
        let mode = self.designators.addressing_mode();
        let mut current = instruction;
        for _ in 0..=C::MAX_INDIRECT_DEPTH {
            let address = self.indexed_address(current, mode);
            if mode == AddressingMode::Extended || !current.i() {
                return Ok(address);
            }

            trace!(address, "following indirect address");
            let location = self.location(current, address, 0, AccessType::Read)?;
            let word = self.read_location(location)?;
            current = InstructionWord::new(Word36::new(
                (current.word().bits() & !INDIRECT_FIELDS_MASK)
                    | (word.bits() & INDIRECT_FIELDS_MASK),
            ));
        }

        debug!("indirect address chain too long");
        Err(MachineInterrupt::AddressingException {
            reason: AddressingExceptionReason::FatalAddressingException,
            bank: self.program_address.bank_name(),
        })
    }

    fn indexed_address(&self, instruction: InstructionWord, mode: AddressingMode) -> u64 {
        let address = u64::from(instruction.address_field(mode));
        if instruction.x() == 0 {
            return address;
        }

        let width = self.index_width();
        let register = self.registers.register(self.x_index(instruction.x()));
        ones_complement_add(address, register.modifier(width), width.modifier_bits())
    }

    /// Apply the h-bit: add the increment of X(x) to its modifier
    pub(crate) fn increment_index(&mut self, instruction: InstructionWord) {
        if !instruction.h() || instruction.x() == 0 {
            return;
        }

        let width = self.index_width();
        let index = self.x_index(instruction.x());
        self.registers.register_mut(index).increment_modifier(width);
    }

    /// Locate the word `offset` words past a relative address
    pub(crate) fn location(
        &self,
        instruction: InstructionWord,
        relative: u64,
        offset: u64,
        access: AccessType,
    ) -> Result<Location> {
        let relative = relative + offset;
        let privilege = self.designators.processor_privilege();
        let base_register = match self.designators.addressing_mode() {
            AddressingMode::Basic => {
                if relative < C::GRS_ADDRESS_LIMIT {
                    return self.register_location(relative, access);
                }

                self.address_space
                    .basic_mode_base_register(
                        relative,
                        self.designators
                            .contains(DesignatorRegister::BASIC_MODE_BASE_REGISTER_SELECTION),
                    )
                    .ok_or(MachineInterrupt::storage_limits_violation(false))?
            }
            AddressingMode::Extended => {
                let base_register =
                    extended_mode_base_register(instruction.b(), instruction.i(), privilege);
                if base_register == 0 && relative < C::GRS_ADDRESS_LIMIT {
                    return self.register_location(relative, access);
                }
                base_register
            }
        };

        let address = self.address_space.base_register(base_register).check(
            self.indicator_key.access_key(),
            relative,
            access,
            false,
        )?;
        Ok(Location::Storage {
            address,
            base_register,
            relative,
        })
    }

    fn register_location(&self, relative: u64, access: AccessType) -> Result<Location> {
        let index = relative as usize;
        GeneralRegisterSet::check_access(
            index,
            self.designators.processor_privilege(),
            access == AccessType::Write,
        )?;
        Ok(Location::Register(index))
    }

    pub(crate) fn read_location(&self, location: Location) -> Result<Word36> {
        match location {
            Location::Register(index) => Ok(self.registers.read(index)),
            Location::Storage { address, .. } => Ok(self.storage.read(address)?),
        }
    }

    pub(crate) fn write_location(&mut self, location: Location, word: Word36) -> Result<()> {
        match location {
            Location::Register(index) => self.registers.write(index, word),
            Location::Storage { address, .. } => self.storage.write(address, word)?,
        }
        Ok(())
    }

    /// Value of an immediate (U or XU) operand
    pub(crate) fn immediate_operand(
        &self,
        instruction: InstructionWord,
        partial: PartialWord,
    ) -> Word36 {
        let value = if instruction.x() == 0 {
            u64::from(instruction.hiu())
        } else {
            let width = self.index_width();
            let register = self.registers.register(self.x_index(instruction.x()));
            // u, not d, even in extended mode; the sum is truncated to 18 bits
            ones_complement_add(
                u64::from(instruction.u()),
                register.modifier(width),
                width.modifier_bits(),
            ) & 0o777_777
        };

        if partial.is_sign_extended() {
            Word36::sign_extend(value, 18)
        } else {
            Word36::new(value)
        }
    }

    /// Fetch the operand of a data instruction, honouring j. Immediate
    /// operands are allowed.
    pub(crate) fn read_operand(&mut self, instruction: InstructionWord) -> Result<Word36> {
        let partial = self.partial_word(instruction);
        if partial.is_immediate() {
            let value = self.immediate_operand(instruction, partial);
            self.increment_index(instruction);
            return Ok(value);
        }

        let relative = self.relative_address(instruction)?;
        let location = self.location(instruction, relative, 0, AccessType::Read)?;
        let word = self.read_location(location)?;
        self.increment_index(instruction);
        Ok(partial.extract(word))
    }

    /// Fetch the operand as a full word, whatever j says
    pub(crate) fn read_operand_word(&mut self, instruction: InstructionWord) -> Result<Word36> {
        let relative = self.relative_address(instruction)?;
        let location = self.location(instruction, relative, 0, AccessType::Read)?;
        let word = self.read_location(location)?;
        self.increment_index(instruction);
        Ok(word)
    }

    /// Store into the operand, honouring j. U and XU are not storable.
    pub(crate) fn write_operand(&mut self, instruction: InstructionWord, value: Word36) -> Result<()> {
        self.modify_operand(instruction, |_| value).map(|_| ())
    }

    /// Read the operand, replace it with `update(old)` and return the value
    /// as stored. Only the partial word selected by j changes.
    pub(crate) fn modify_operand(
        &mut self,
        instruction: InstructionWord,
        update: impl FnOnce(Word36) -> Word36,
    ) -> Result<Word36> {
        let partial = self.partial_word(instruction);
        if partial.is_immediate() {
            return Err(MachineInterrupt::invalid_instruction(
                InvalidInstructionReason::UndefinedFunctionCode,
            ));
        }

        let relative = self.relative_address(instruction)?;
        let location = self.location(instruction, relative, 0, AccessType::Write)?;
        let old = self.read_location(location)?;
        let new = update(partial.extract(old));
        let word = partial
            .inject(old, new)
            .ok_or(MachineInterrupt::invalid_instruction(
                InvalidInstructionReason::UndefinedFunctionCode,
            ))?;
        self.write_location(location, word)?;
        self.increment_index(instruction);
        Ok(partial.extract(word))
    }

    /// Fetch `count` consecutive words starting at the operand address.
    /// Every address is checked before any word is read.
    pub(crate) fn read_consecutive_operands(
        &mut self,
        instruction: InstructionWord,
        count: usize,
    ) -> Result<Vec<Word36>> {
        let relative = self.relative_address(instruction)?;
        let locations = (0..count as u64)
            .map(|offset| self.location(instruction, relative, offset, AccessType::Read))
            .collect::<Result<Vec<_>>>()?;
        let words = locations
            .into_iter()
            .map(|location| self.read_location(location))
            .collect::<Result<Vec<_>>>()?;
        self.increment_index(instruction);
        Ok(words)
    }

    /// Store consecutive words starting at the operand address, lowest first.
    /// Every address is checked before any word is written.
    pub(crate) fn write_consecutive_operands(
        &mut self,
        instruction: InstructionWord,
        words: &[Word36],
    ) -> Result<()> {
        let relative = self.relative_address(instruction)?;
        let locations = (0..words.len() as u64)
            .map(|offset| self.location(instruction, relative, offset, AccessType::Write))
            .collect::<Result<Vec<_>>>()?;
        for (location, word) in locations.into_iter().zip(words) {
            self.write_location(location, *word)?;
        }
        self.increment_index(instruction);
        Ok(())
    }

    /// Relative address of a jump target. Nothing is read.
    pub(crate) fn jump_target(&mut self, instruction: InstructionWord) -> Result<u32> {
        let relative = self.relative_address(instruction)?;
        self.increment_index(instruction);
        Ok((relative & 0o77_777_777) as u32)
    }

    /// Shift count: the low seven bits of the operand address
    pub(crate) fn shift_count(&mut self, instruction: InstructionWord) -> Result<u32> {
        let relative = self.relative_address(instruction)?;
        self.increment_index(instruction);
        Ok((relative & 0o177) as u32)
    }

    pub(crate) fn jump(&mut self, target: u32) {
        debug!(target = format_args!("{target:06o}"), "jumping");
        self.program_address.set_program_counter(target);
    }

    /// Skip the next instruction
    pub(crate) fn skip(&mut self) {
        trace!("skipping next instruction");
        self.program_address.advance(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessorConfig;
    use pretty_assertions::assert_eq;

    fn basic() -> Processor {
        Processor::new(&ProcessorConfig::basic_mode().with_storage_size(0o10000))
    }

    fn extended() -> Processor {
        Processor::new(&ProcessorConfig::default().with_storage_size(0o10000))
    }

    #[test]
    fn indexed_address_test() {
        let mut processor = extended();
        // X3 = increment 2, modifier 0o100
        processor
            .registers
            .write(X0 + 3, Word36::new(0o000_002_000_100));
        processor.write_absolute(0o120, Word36::new(0o77)).unwrap();

        let instruction = InstructionWord::extended(0o10, 0, 1, 3, true, false, 0, 0o20);
        assert_eq!(processor.relative_address(instruction), Ok(0o120));
        assert_eq!(processor.read_operand(instruction), Ok(Word36::new(0o77)));
        // h-bit applied the increment
        assert_eq!(
            processor.registers.read(X0 + 3),
            Word36::new(0o000_002_000_102)
        );
    }

    #[test]
    fn negative_modifier_test() {
        let mut processor = extended();
        // modifier -1
        processor
            .registers
            .write(X0 + 1, Word36::new(0o777_776));
        let instruction = InstructionWord::extended(0o10, 0, 1, 1, false, false, 0, 0o20);
        assert_eq!(processor.relative_address(instruction), Ok(0o17));
    }

    #[test]
    fn grs_as_storage_test() {
        let mut processor = extended();
        processor.set_a(3, Word36::new(0o123));
        let instruction =
            InstructionWord::extended(0o10, 0, 0, 0, false, false, 0, (A0 + 3) as u16);
        assert_eq!(processor.read_operand(instruction), Ok(Word36::new(0o123)));

        // The same address through B1 is storage, and B1 is void
        let instruction =
            InstructionWord::extended(0o10, 0, 0, 0, false, false, 1, (A0 + 3) as u16);
        assert_eq!(
            processor.read_operand(instruction),
            Err(MachineInterrupt::storage_limits_violation(false))
        );
    }

    #[test]
    fn grs_protection_test() {
        let mut processor = extended();
        processor.designators.set_processor_privilege(2);
        // 0o50 lies in the hardware reserved range
        let instruction = InstructionWord::extended(0o10, 0, 0, 0, false, false, 0, 0o50);
        assert!(matches!(
            processor.read_operand(instruction),
            Err(MachineInterrupt::ReferenceViolation { .. })
        ));

        // R registers are read-only outside privilege 0
        let store = InstructionWord::extended(0o01, 0, 0, 0, false, false, 0, 0o101);
        assert!(processor.write_operand(store, Word36::new(1)).is_err());
        assert_eq!(processor.registers.read(0o101), Word36::POSITIVE_ZERO);
    }

    #[test]
    fn immediate_operand_test() {
        let mut processor = extended();
        let u = InstructionWord::extended(0o10, 0o16, 0, 0, false, false, 0, 0o7777);
        assert_eq!(processor.read_operand(u), Ok(Word36::new(0o7777)));

        // XU sign extends the 18-bit value; hiu = 0o777_000 is negative
        let xu = InstructionWord::extended(0o10, 0o17, 0, 0, true, true, 0o17, 0o7000);
        assert_eq!(
            processor.read_operand(xu),
            Ok(Word36::new(0o777_777_777_000))
        );

        // With an index register the 16-bit u field is used, b included
        let indexed = InstructionWord::extended(0o10, 0o16, 3, 1, false, false, 1, 0);
        assert_eq!(processor.read_operand(indexed), Ok(Word36::new(0o10000)));
        processor.registers.write(X0 + 1, Word36::new(5));
        assert_eq!(processor.read_operand(indexed), Ok(Word36::new(0o10005)));

        // Storing to an immediate is undefined
        assert_eq!(
            processor.write_operand(u, Word36::new(1)),
            Err(MachineInterrupt::invalid_instruction(
                InvalidInstructionReason::UndefinedFunctionCode
            ))
        );
    }

    #[test]
    fn partial_word_store_test() {
        let mut processor = extended();
        processor
            .write_absolute(0o400, Word36::new(0o111_222_333_444))
            .unwrap();
        // j = 1: H2
        let store = InstructionWord::extended(0o01, 1, 0, 0, false, false, 0, 0o400);
        processor.write_operand(store, Word36::new(0o555_666)).unwrap();
        assert_eq!(
            processor.read_absolute(0o400),
            Ok(Word36::new(0o111_222_555_666))
        );
    }

    #[test]
    fn basic_mode_indirect_test() {
        let mut processor = basic();
        // 0o500 holds an indirect word pointing at 0o600 with X2
        processor
            .write_absolute(0o500, Word36::new(0o000_002_000_600))
            .unwrap();
        processor
            .registers
            .write(X0 + 2, Word36::new(0o10));
        processor.write_absolute(0o610, Word36::new(0o42)).unwrap();

        let instruction = InstructionWord::basic(0o10, 0, 0, 0, false, true, 0o500);
        assert_eq!(processor.relative_address(instruction), Ok(0o610));
        assert_eq!(processor.read_operand(instruction), Ok(Word36::new(0o42)));
    }

    #[test]
    fn indirect_loop_test() {
        let mut processor = basic();
        // 0o500 points at itself with the i-bit set
        processor
            .write_absolute(0o500, Word36::new(0o000_000_200_500))
            .unwrap();
        let instruction = InstructionWord::basic(0o10, 0, 0, 0, false, true, 0o500);
        assert!(matches!(
            processor.relative_address(instruction),
            Err(MachineInterrupt::AddressingException {
                reason: AddressingExceptionReason::FatalAddressingException,
                ..
            })
        ));
    }

    #[test]
    fn consecutive_operands_checked_first_test() {
        let mut processor = extended();
        let last = 0o10000 - 1;
        processor.write_absolute(last, Word36::new(1)).unwrap();

        // The 12-bit displacement cannot reach the end of storage, X1 does
        processor
            .registers
            .write(X0 + 1, Word36::new(last));
        let instruction = InstructionWord::extended(0o71, 0o12, 0, 1, false, false, 0, 0);
        let result = processor.write_consecutive_operands(
            instruction,
            &[Word36::new(7), Word36::new(8)],
        );
        assert_eq!(result, Err(MachineInterrupt::storage_limits_violation(false)));
        // The first word was not written
        assert_eq!(processor.read_absolute(last), Ok(Word36::new(1)));
    }
}
