use tracing::debug;

use super::Result;
use crate::instruction_word::InstructionWord;
use crate::interrupts::{ArithmeticExceptionReason, MachineInterrupt, OperationTrapReason};
use crate::processor::Processor;
use crate::registers::DesignatorRegister;
use crate::storage::Storage;
use crate::word::{
    ones_complement_add, ones_complement_negate, DoubleWord72, Field, Word36, MAX_MAGNITUDE36,
};

pub(super) const HALVES: &[Field] = &[Field::H1, Field::H2];
pub(super) const THIRDS: &[Field] = &[Field::T1, Field::T2, Field::T3];

/// Record the carry and overflow of an addition. Overflow raises an
/// operation trap when DB27 is set; the result is already stored by then.
pub(super) fn set_carry_and_overflow<S: Storage>(
    processor: &mut Processor<S>,
    carry: bool,
    overflow: bool,
) -> Result<()> {
    processor
        .designators
        .set(DesignatorRegister::CARRY, carry);
    processor
        .designators
        .set(DesignatorRegister::OVERFLOW, overflow);

    if overflow
        && processor
            .designators
            .contains(DesignatorRegister::OPERATION_TRAP_ENABLED)
    {
        debug!("fixed-point overflow trap");
        return Err(MachineInterrupt::OperationTrap(
            OperationTrapReason::FixedPointBinaryIntegerOverflow,
        ));
    }
    Ok(())
}

/// Set DB23. Raises an arithmetic exception when DB29 is set, otherwise the
/// instruction completes without changing its destination.
fn divide_check<S: Storage>(processor: &mut Processor<S>) -> Result<()> {
    debug!("divide check");
    processor
        .designators
        .insert(DesignatorRegister::DIVIDE_CHECK);
    if processor
        .designators
        .contains(DesignatorRegister::ARITHMETIC_EXCEPTION_ENABLED)
    {
        return Err(MachineInterrupt::ArithmeticException(
            ArithmeticExceptionReason::DivideCheck,
        ));
    }
    Ok(())
}

fn adjust(operand: Word36, negate: bool, magnitude: bool) -> Word36 {
    let operand = if magnitude {
        operand.magnitude()
    } else {
        operand
    };
    if negate {
        operand.negate()
    } else {
        operand
    }
}

/// AA, ANA, AMA, ANMA
pub(super) fn add_a<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    negate: bool,
    magnitude: bool,
) -> Result<()> {
    let operand = adjust(processor.read_operand(instruction)?, negate, magnitude);
    let a = processor.a(instruction.a());
    let result = a.add(operand);
    debug!(%a, %operand, sum = %result.sum, result.carry, result.overflow, "add");
    processor.set_a(instruction.a(), result.sum);
    set_carry_and_overflow(processor, result.carry, result.overflow)
}

/// AU, ANU: the sum goes to A(a+1), A(a) is unchanged
pub(super) fn add_upper<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    negate: bool,
) -> Result<()> {
    let operand = adjust(processor.read_operand(instruction)?, negate, false);
    let (a, _) = processor.a_pair(instruction.a());
    let result = a.add(operand);
    processor.set_a_pair(instruction.a(), (a, result.sum));
    set_carry_and_overflow(processor, result.carry, result.overflow)
}

/// AX, ANX
pub(super) fn add_x<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    negate: bool,
) -> Result<()> {
    let operand = adjust(processor.read_operand(instruction)?, negate, false);
    let index = processor.x_index(instruction.a());
    let result = processor.registers.read(index).add(operand);
    processor.registers.write(index, result.sum);
    set_carry_and_overflow(processor, result.carry, result.overflow)
}

/// DA, DAN
pub(super) fn add_double<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    negate: bool,
) -> Result<()> {
    let words = processor.read_consecutive_operands(instruction, 2)?;
    let operand = DoubleWord72::from_words(words[0], words[1]);
    let operand = if negate { operand.negate() } else { operand };

    let (high, low) = processor.a_pair(instruction.a());
    let result = DoubleWord72::from_words(high, low).add(operand);
    debug!(sum = %result.sum, result.carry, result.overflow, "double add");
    processor.set_a_pair(instruction.a(), result.sum.words());
    set_carry_and_overflow(processor, result.carry, result.overflow)
}

/// AH, ANH, AT, ANT: independent ones-complement additions on each field.
/// Carries do not cross fields and no designator changes.
pub(super) fn add_fields<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    negate: bool,
    fields: &[Field],
) -> Result<()> {
    let operand = processor.read_operand_word(instruction)?;
    let a = processor.a(instruction.a());
    let result = fields.iter().fold(a, |result, &field| {
        let width = field.width();
        let addend = if negate {
            ones_complement_negate(operand.get(field), width)
        } else {
            operand.get(field)
        };
        result.with(field, ones_complement_add(a.get(field), addend, width))
    });
    processor.set_a(instruction.a(), result);
    Ok(())
}

/// MI: 72-bit product in A(a), A(a+1)
pub(super) fn multiply_integer<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let operand = processor.read_operand(instruction)?;
    let product = processor.a(instruction.a()).multiply(operand);
    debug!(%product, "multiply");
    processor.set_a_pair(instruction.a(), product.words());
    Ok(())
}

/// MSI: single-word product in A(a). A product that does not fit sets the
/// overflow designator, and traps when DB27 is set.
pub(super) fn multiply_single_integer<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let operand = processor.read_operand(instruction)?;
    let product = processor.a(instruction.a()).multiply(operand);
    processor.set_a(instruction.a(), product.low());

    let overflow = product.to_i128().abs() > i128::from(MAX_MAGNITUDE36);
    processor
        .designators
        .set(DesignatorRegister::OVERFLOW, overflow);
    if overflow
        && processor
            .designators
            .contains(DesignatorRegister::OPERATION_TRAP_ENABLED)
    {
        return Err(MachineInterrupt::OperationTrap(
            OperationTrapReason::MultiplySingleIntegerOverflow,
        ));
    }
    Ok(())
}

/// MF: the product shifted left one place, as for binary fractions
pub(super) fn multiply_fractional<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let operand = processor.read_operand(instruction)?;
    let product = processor
        .a(instruction.a())
        .multiply(operand)
        .shift_left_circular(1);
    processor.set_a_pair(instruction.a(), product.words());
    Ok(())
}

/// DI: A(a), A(a+1) divided by the operand; quotient to A(a), remainder to A(a+1)
pub(super) fn divide_integer<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let operand = processor.read_operand(instruction)?;
    let (high, low) = processor.a_pair(instruction.a());
    match DoubleWord72::from_words(high, low).divide(operand) {
        Ok(result) => {
            processor.set_a_pair(instruction.a(), (result.quotient, result.remainder));
            Ok(())
        }
        Err(error) => {
            debug!(%error, "divide integer failed");
            divide_check(processor)
        }
    }
}

/// DSF: A(a) scaled by 2^35 divided by the operand, quotient to A(a+1)
pub(super) fn divide_single_fractional<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let operand = processor.read_operand(instruction)?;
    let (a, _) = processor.a_pair(instruction.a());
    let dividend = DoubleWord72::sign_extend(a).shift_left_circular(35);
    match dividend.divide(operand) {
        Ok(result) => {
            processor.set_a_pair(instruction.a(), (a, result.quotient));
            Ok(())
        }
        Err(error) => {
            debug!(%error, "divide single fractional failed");
            divide_check(processor)
        }
    }
}

/// DF: A(a), A(a+1) shifted right one place divided by the operand;
/// quotient to A(a), remainder to A(a+1)
pub(super) fn divide_fractional<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let operand = processor.read_operand(instruction)?;
    let (high, low) = processor.a_pair(instruction.a());
    let dividend = DoubleWord72::from_words(high, low).shift_right_algebraic(1);
    match dividend.divide(operand) {
        Ok(result) => {
            processor.set_a_pair(instruction.a(), (result.quotient, result.remainder));
            Ok(())
        }
        Err(error) => {
            debug!(%error, "divide fractional failed");
            divide_check(processor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{execute, ext, extended_processor};
    use crate::interrupts::{ArithmeticExceptionReason, MachineInterrupt, OperationTrapReason};
    use crate::registers::{DesignatorRegister, X0};
    use crate::word::Word36;
    use pretty_assertions::assert_eq;

    #[test]
    fn add_a_test() {
        let mut processor = extended_processor();
        processor.set_a(5, Word36::new(5));
        processor.write_absolute(0o400, Word36::new(3)).unwrap();

        execute(&mut processor, ext(0o14, 0, 5, 0, 0o400)).unwrap();
        assert_eq!(processor.a(5), Word36::new(0o10));
        assert!(!processor.designators.contains(DesignatorRegister::CARRY));
        assert!(!processor.designators.contains(DesignatorRegister::OVERFLOW));

        // ANA: 8 - 3
        execute(&mut processor, ext(0o15, 0, 5, 0, 0o400)).unwrap();
        assert_eq!(processor.a(5), Word36::new(5));
        assert!(processor.designators.contains(DesignatorRegister::CARRY));

        // ANMA,U: 5 - |3|
        execute(&mut processor, ext(0o17, 0o16, 5, 0, 3)).unwrap();
        assert_eq!(processor.a(5), Word36::new(2));
    }

    #[test]
    fn overflow_trap_test() {
        let mut processor = extended_processor();
        processor.set_a(0, Word36::new(0o377_777_777_777));

        // Without DB27 only the designator is set
        execute(&mut processor, ext(0o14, 0o16, 0, 0, 1)).unwrap();
        assert!(processor.designators.contains(DesignatorRegister::OVERFLOW));

        processor.set_a(0, Word36::new(0o377_777_777_777));
        processor
            .designators
            .insert(DesignatorRegister::OPERATION_TRAP_ENABLED);
        assert_eq!(
            execute(&mut processor, ext(0o14, 0o16, 0, 0, 1)),
            Err(MachineInterrupt::OperationTrap(
                OperationTrapReason::FixedPointBinaryIntegerOverflow
            ))
        );
        // The sum is stored before the trap
        assert_eq!(processor.a(0), Word36::new(0o400_000_000_000));
    }

    #[test]
    fn add_upper_and_index_test() {
        let mut processor = extended_processor();
        processor.set_a(1, Word36::new(10));
        execute(&mut processor, ext(0o20, 0o16, 1, 0, 4)).unwrap();
        assert_eq!(processor.a_pair(1), (Word36::new(10), Word36::new(14)));
        execute(&mut processor, ext(0o21, 0o16, 1, 0, 4)).unwrap();
        assert_eq!(processor.a(2), Word36::new(6));

        processor.registers.write(X0 + 3, Word36::new(0o100));
        execute(&mut processor, ext(0o24, 0o16, 3, 0, 0o10)).unwrap();
        assert_eq!(processor.registers.read(X0 + 3), Word36::new(0o110));
        execute(&mut processor, ext(0o25, 0o16, 3, 0, 0o110)).unwrap();
        assert_eq!(processor.registers.read(X0 + 3), Word36::POSITIVE_ZERO);
    }

    #[test]
    fn add_double_test() {
        let mut processor = extended_processor();
        processor.set_a_pair(0, (Word36::new(0), Word36::new(0o777_777_777_776)));
        processor.write_absolute(0o400, Word36::new(0)).unwrap();
        processor.write_absolute(0o401, Word36::new(2)).unwrap();

        // The low word carries into the high word
        execute(&mut processor, ext(0o71, 0o10, 0, 0, 0o400)).unwrap();
        assert_eq!(
            processor.a_pair(0),
            (Word36::new(1), Word36::new(0))
        );

        execute(&mut processor, ext(0o71, 0o11, 0, 0, 0o400)).unwrap();
        assert_eq!(
            processor.a_pair(0),
            (Word36::new(0), Word36::new(0o777_777_777_776))
        );
    }

    #[test]
    fn add_halves_and_thirds_test() {
        let mut processor = extended_processor();
        processor.set_a(0, Word36::new(0o000_001_777_776));
        processor
            .write_absolute(0o400, Word36::new(0o000_002_000_002))
            .unwrap();
        // AH: H2 wraps around with an end-around carry, H1 is unaffected
        execute(&mut processor, ext(0o72, 0o04, 0, 0, 0o400)).unwrap();
        assert_eq!(processor.a(0), Word36::new(0o000_003_000_001));

        processor.set_a(1, Word36::new(0o0005_0005_0005));
        processor
            .write_absolute(0o401, Word36::new(0o0001_0002_0003))
            .unwrap();
        // ANT
        execute(&mut processor, ext(0o72, 0o07, 1, 0, 0o401)).unwrap();
        assert_eq!(processor.a(1), Word36::new(0o0004_0003_0002));
    }

    #[test]
    fn multiply_test() {
        let mut processor = extended_processor();
        processor.set_a(0, Word36::from_i64(-6));
        // MI,U by 7
        execute(&mut processor, ext(0o30, 0o16, 0, 0, 7)).unwrap();
        assert_eq!(
            processor.a_pair(0),
            (Word36::NEGATIVE_ZERO, Word36::from_i64(-42))
        );

        // MSI
        processor.set_a(2, Word36::new(1000));
        execute(&mut processor, ext(0o31, 0o16, 2, 0, 1000)).unwrap();
        assert_eq!(processor.a(2), Word36::new(1_000_000));
        assert!(!processor.designators.contains(DesignatorRegister::OVERFLOW));

        processor.set_a(2, Word36::new(1 << 30));
        execute(&mut processor, ext(0o31, 0o16, 2, 0, 0o100)).unwrap();
        assert!(processor.designators.contains(DesignatorRegister::OVERFLOW));
    }

    #[test]
    fn divide_test() {
        let mut processor = extended_processor();
        processor.set_a_pair(0, (Word36::POSITIVE_ZERO, Word36::new(100)));
        // DI,U by 7
        execute(&mut processor, ext(0o34, 0o16, 0, 0, 7)).unwrap();
        assert_eq!(processor.a_pair(0), (Word36::new(14), Word36::new(2)));

        processor.set_a_pair(2, (Word36::NEGATIVE_ZERO, Word36::from_i64(-100)));
        execute(&mut processor, ext(0o34, 0o16, 2, 0, 7)).unwrap();
        assert_eq!(
            processor.a_pair(2),
            (Word36::from_i64(-14), Word36::from_i64(-2))
        );
    }

    #[test]
    fn divide_check_test() {
        let mut processor = extended_processor();
        processor.set_a_pair(0, (Word36::new(0), Word36::new(100)));

        // Divide by zero without DB29: DB23 set, registers untouched
        execute(&mut processor, ext(0o34, 0o16, 0, 0, 0)).unwrap();
        assert!(processor
            .designators
            .contains(DesignatorRegister::DIVIDE_CHECK));
        assert_eq!(processor.a_pair(0), (Word36::new(0), Word36::new(100)));

        processor
            .designators
            .insert(DesignatorRegister::ARITHMETIC_EXCEPTION_ENABLED);
        assert_eq!(
            execute(&mut processor, ext(0o34, 0o16, 0, 0, 0)),
            Err(MachineInterrupt::ArithmeticException(
                ArithmeticExceptionReason::DivideCheck
            ))
        );
    }

    #[test]
    fn divide_single_fractional_test() {
        let mut processor = extended_processor();
        // (1 * 2^35) / 2^34
        processor.set_a(0, Word36::new(1));
        processor
            .write_absolute(0o400, Word36::new(1 << 34))
            .unwrap();
        execute(&mut processor, ext(0o35, 0, 0, 0, 0o400)).unwrap();
        assert_eq!(processor.a_pair(0), (Word36::new(1), Word36::new(2)));
    }
}
