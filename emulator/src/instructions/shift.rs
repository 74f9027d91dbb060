use tracing::debug;

use super::Result;
use crate::constants as C;
use crate::instruction_word::InstructionWord;
use crate::processor::Processor;
use crate::storage::Storage;
use crate::word::{DoubleWord72, Word36};

/// Single shifts of A(a) by the count in the operand address
pub(super) fn single<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    shift: fn(Word36, u32) -> Word36,
) -> Result<()> {
    let count = processor.shift_count(instruction)?;
    let a = processor.a(instruction.a());
    processor.set_a(instruction.a(), shift(a, count));
    Ok(())
}

/// Double shifts of A(a), A(a+1) as one 72-bit value
pub(super) fn double<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    shift: fn(DoubleWord72, u32) -> DoubleWord72,
) -> Result<()> {
    let count = processor.shift_count(instruction)?;
    let (high, low) = processor.a_pair(instruction.a());
    let value = shift(DoubleWord72::from_words(high, low), count);
    processor.set_a_pair(instruction.a(), value.words());
    Ok(())
}

/// LSC: the operand normalized into A(a), the rotation count into A(a+1)
pub(super) fn load_shift_and_count<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let operand = processor.read_operand_word(instruction)?;
    let (normalized, count) = operand.normalize();
    debug!(%operand, %normalized, count, "load shift and count");
    processor.set_a_pair(
        instruction.a(),
        (normalized, Word36::new(u64::from(count))),
    );
    Ok(())
}

/// DLSC: the operand pair normalized into A(a), A(a+1), the count into A(a+2)
pub(super) fn double_load_shift_and_count<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let words = processor.read_consecutive_operands(instruction, 2)?;
    let (normalized, count) = DoubleWord72::from_words(words[0], words[1]).normalize();
    processor.set_a_pair(instruction.a(), normalized.words());
    let index = (processor.a_index(instruction.a()) + 2) % C::GRS_SIZE;
    processor
        .registers
        .write(index, Word36::new(u64::from(count)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::{execute, ext, extended_processor};
    use crate::word::Word36;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_shift_test() {
        let mut processor = extended_processor();
        processor.set_a(0, Word36::new(0o400_000_000_001));

        // SSC 3
        execute(&mut processor, ext(0o73, 0, 0, 0, 3)).unwrap();
        assert_eq!(processor.a(0), Word36::new(0o140_000_000_000));

        // LSSC 3 undoes it
        execute(&mut processor, ext(0o73, 0o10, 0, 0, 3)).unwrap();
        assert_eq!(processor.a(0), Word36::new(0o400_000_000_001));

        // SSA 6 keeps the sign
        execute(&mut processor, ext(0o73, 4, 0, 0, 6)).unwrap();
        assert_eq!(processor.a(0), Word36::new(0o774_000_000_000));

        // SSL 6
        processor.set_a(1, Word36::new(0o400_000_000_000));
        execute(&mut processor, ext(0o73, 2, 1, 0, 6)).unwrap();
        assert_eq!(processor.a(1), Word36::new(0o004_000_000_000));

        // LSSL 36 clears the register
        execute(&mut processor, ext(0o73, 0o12, 1, 0, 36)).unwrap();
        assert_eq!(processor.a(1), Word36::POSITIVE_ZERO);
    }

    #[test]
    fn double_shift_test() {
        let mut processor = extended_processor();
        processor.set_a_pair(2, (Word36::new(1), Word36::new(0)));

        // DSL 36 moves the high word into the low word
        execute(&mut processor, ext(0o73, 3, 2, 0, 36)).unwrap();
        assert_eq!(processor.a_pair(2), (Word36::new(0), Word36::new(1)));

        // LDSC 1 rotates across the pair
        processor.set_a_pair(2, (Word36::new(0o400_000_000_000), Word36::new(0)));
        execute(&mut processor, ext(0o73, 0o11, 2, 0, 1)).unwrap();
        assert_eq!(processor.a_pair(2), (Word36::new(0), Word36::new(1)));
    }

    #[test]
    fn shift_count_uses_seven_bits_test() {
        let mut processor = extended_processor();
        processor.set_a(0, Word36::new(1));
        // 0o201 & 0o177 == 1
        execute(&mut processor, ext(0o73, 0o10, 0, 0, 0o201)).unwrap();
        assert_eq!(processor.a(0), Word36::new(2));
    }

    #[test]
    fn load_shift_and_count_test() {
        let mut processor = extended_processor();
        processor.write_absolute(0o400, Word36::new(1)).unwrap();
        execute(&mut processor, ext(0o73, 6, 4, 0, 0o400)).unwrap();
        assert_eq!(
            processor.a_pair(4),
            (Word36::new(0o200_000_000_000), Word36::new(34))
        );

        processor.write_absolute(0o400, Word36::NEGATIVE_ZERO).unwrap();
        execute(&mut processor, ext(0o73, 6, 4, 0, 0o400)).unwrap();
        assert_eq!(
            processor.a_pair(4),
            (Word36::NEGATIVE_ZERO, Word36::new(35))
        );
    }

    #[test]
    fn double_load_shift_and_count_test() {
        let mut processor = extended_processor();
        processor.write_absolute(0o400, Word36::new(0)).unwrap();
        processor.write_absolute(0o401, Word36::new(1)).unwrap();
        execute(&mut processor, ext(0o73, 7, 0, 0, 0o400)).unwrap();
        assert_eq!(
            processor.a_pair(0),
            (Word36::new(0o200_000_000_000), Word36::new(0))
        );
        assert_eq!(processor.a(2), Word36::new(70));
    }
}
