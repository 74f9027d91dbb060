use tracing::debug;

use super::arithmetic::set_carry_and_overflow;
use super::Result;
use crate::instruction_word::InstructionWord;
use crate::processor::Processor;
use crate::storage::Storage;
use crate::word::Word36;

pub(super) const POSITIVE_ZERO: Word36 = Word36::POSITIVE_ZERO;
pub(super) const NEGATIVE_ZERO: Word36 = Word36::NEGATIVE_ZERO;
pub(super) const POSITIVE_ONE: Word36 = Word36::POSITIVE_ONE;
pub(super) const NEGATIVE_ONE: Word36 = Word36::NEGATIVE_ONE;
pub(super) const FIELDATA_SPACES: Word36 = Word36::new(0o050_505_050_505);
pub(super) const FIELDATA_ZEROES: Word36 = Word36::new(0o606_060_606_060);
pub(super) const ASCII_SPACES: Word36 = Word36::new(0o040_040_040_040);
pub(super) const ASCII_ZEROES: Word36 = Word36::new(0o060_060_060_060);

/// SA, SNA, SMA
pub(super) fn store_a<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    transform: impl FnOnce(Word36) -> Word36,
) -> Result<()> {
    let value = transform(processor.a(instruction.a()));
    processor.write_operand(instruction, value)
}

pub(super) fn store_r<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let value = processor.registers.read(processor.r_index(instruction.a()));
    processor.write_operand(instruction, value)
}

pub(super) fn store_x<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let value = processor.registers.read(processor.x_index(instruction.a()));
    processor.write_operand(instruction, value)
}

/// SZ, SNZ, SP1, SN1 and the space and zero fills
pub(super) fn store_constant<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    value: Word36,
) -> Result<()> {
    processor.write_operand(instruction, value)
}

/// DS: A(a) to the operand, A(a+1) to the word after it
pub(super) fn store_double<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let (high, low) = processor.a_pair(instruction.a());
    processor.write_consecutive_operands(instruction, &[high, low])
}

/// INC, DEC, INC2, DEC2 skip the next instruction when the stored result is
/// zero. ADD1 and SUB1 set carry and overflow instead.
pub(super) fn increment<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    delta: i64,
    skip_on_zero: bool,
) -> Result<()> {
    let mut flags = (false, false);
    let stored = processor.modify_operand(instruction, |old| {
        let result = old.add(Word36::from_i64(delta));
        flags = (result.carry, result.overflow);
        result.sum
    })?;
    debug!(%stored, delta, "incremented operand");

    if skip_on_zero {
        if stored.is_zero() {
            processor.skip();
        }
        Ok(())
    } else {
        set_carry_and_overflow(processor, flags.0, flags.1)
    }
}

/// ENZ: replace a negative zero by a positive zero, skip if the operand is zero
pub(super) fn eliminate_negative_zero<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let stored = processor.modify_operand(instruction, |old| {
        if old.is_negative_zero() {
            Word36::POSITIVE_ZERO
        } else {
            old
        }
    })?;

    if stored.is_zero() {
        processor.skip();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::{execute, ext, extended_processor};
    use crate::interrupts::{InvalidInstructionReason, MachineInterrupt};
    use crate::registers::{DesignatorRegister, R0, X0};
    use crate::word::Word36;
    use pretty_assertions::assert_eq;

    #[test]
    fn store_registers_test() {
        let mut processor = extended_processor();
        processor.set_a(2, Word36::new(7));
        processor.registers.write(R0 + 1, Word36::new(0o11));
        processor.registers.write(X0 + 5, Word36::new(0o22));

        execute(&mut processor, ext(0o01, 0, 2, 0, 0o400)).unwrap();
        execute(&mut processor, ext(0o02, 0, 2, 0, 0o401)).unwrap();
        execute(&mut processor, ext(0o04, 0, 1, 0, 0o402)).unwrap();
        execute(&mut processor, ext(0o06, 0, 5, 0, 0o403)).unwrap();

        assert_eq!(processor.read_absolute(0o400), Ok(Word36::new(7)));
        assert_eq!(processor.read_absolute(0o401), Ok(Word36::from_i64(-7)));
        assert_eq!(processor.read_absolute(0o402), Ok(Word36::new(0o11)));
        assert_eq!(processor.read_absolute(0o403), Ok(Word36::new(0o22)));
    }

    #[test]
    fn store_magnitude_partial_test() {
        let mut processor = extended_processor();
        processor.set_a(0, Word36::from_i64(-3));
        processor
            .write_absolute(0o400, Word36::new(0o111_111_111_111))
            .unwrap();
        // SMA,H1
        execute(&mut processor, ext(0o03, 2, 0, 0, 0o400)).unwrap();
        assert_eq!(
            processor.read_absolute(0o400),
            Ok(Word36::new(0o000_003_111_111))
        );
    }

    #[test]
    fn store_constants_test() {
        let mut processor = extended_processor();
        let cases = [
            (0, Word36::POSITIVE_ZERO),
            (1, Word36::NEGATIVE_ZERO),
            (2, Word36::POSITIVE_ONE),
            (3, Word36::NEGATIVE_ONE),
            (4, Word36::new(0o050_505_050_505)),
            (5, Word36::new(0o606_060_606_060)),
            (6, Word36::new(0o040_040_040_040)),
            (7, Word36::new(0o060_060_060_060)),
        ];
        for (a, expected) in cases {
            processor.write_absolute(0o500, Word36::new(0o123)).unwrap();
            execute(&mut processor, ext(0o05, 0, a, 0, 0o500)).unwrap();
            assert_eq!(processor.read_absolute(0o500), Ok(expected), "a = {a}");
        }
    }

    #[test]
    fn store_to_immediate_rejected_test() {
        let mut processor = extended_processor();
        assert_eq!(
            execute(&mut processor, ext(0o01, 0o16, 0, 0, 0o400)),
            Err(MachineInterrupt::InvalidInstruction(
                InvalidInstructionReason::UndefinedFunctionCode
            ))
        );
    }

    #[test]
    fn store_double_test() {
        let mut processor = extended_processor();
        processor.set_a_pair(3, (Word36::new(1), Word36::new(2)));
        execute(&mut processor, ext(0o71, 0o12, 3, 0, 0o400)).unwrap();
        assert_eq!(processor.read_absolute(0o400), Ok(Word36::new(1)));
        assert_eq!(processor.read_absolute(0o401), Ok(Word36::new(2)));
    }

    #[test]
    fn increment_and_skip_test() {
        let mut processor = extended_processor();
        processor.write_absolute(0o400, Word36::new(1)).unwrap();

        // DEC: 1 -> 0, skips
        execute(&mut processor, ext(0o05, 0, 0o11, 0, 0o400)).unwrap();
        assert_eq!(processor.read_absolute(0o400), Ok(Word36::POSITIVE_ZERO));
        assert_eq!(processor.program_address.program_counter(), 0o1002);

        // INC2: 0 -> 2, no skip
        execute(&mut processor, ext(0o05, 0, 0o12, 0, 0o400)).unwrap();
        assert_eq!(processor.read_absolute(0o400), Ok(Word36::new(2)));
        assert_eq!(processor.program_address.program_counter(), 0o1003);
    }

    #[test]
    fn add1_sets_designators_test() {
        let mut processor = extended_processor();
        processor
            .write_absolute(0o400, Word36::new(0o377_777_777_777))
            .unwrap();
        // ADD1 overflows into the sign
        execute(&mut processor, ext(0o05, 0, 0o15, 0, 0o400)).unwrap();
        assert_eq!(
            processor.read_absolute(0o400),
            Ok(Word36::new(0o400_000_000_000))
        );
        assert!(processor.designators.contains(DesignatorRegister::OVERFLOW));
        assert!(!processor.designators.contains(DesignatorRegister::CARRY));
        assert_eq!(processor.program_address.program_counter(), 0o1001);
    }

    #[test]
    fn eliminate_negative_zero_test() {
        let mut processor = extended_processor();
        processor
            .write_absolute(0o400, Word36::NEGATIVE_ZERO)
            .unwrap();
        execute(&mut processor, ext(0o05, 0, 0o14, 0, 0o400)).unwrap();
        assert_eq!(processor.read_absolute(0o400), Ok(Word36::POSITIVE_ZERO));
        assert_eq!(processor.program_address.program_counter(), 0o1002);
    }
}
