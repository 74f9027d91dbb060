use tracing::debug;

use super::Result;
use crate::addressing::AccessType;
use crate::instruction_word::InstructionWord;
use crate::processor::Processor;
use crate::registers::{DesignatorRegister, GeneralRegisterSet};
use crate::storage::Storage;
use crate::word::{DoubleWord72, Word36};

/// Designators the conditional jumps can test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Designator {
    Overflow,
    Carry,
    DivideCheck,
    CharacteristicOverflow,
    CharacteristicUnderflow,
}

impl Designator {
    const fn flag(self) -> DesignatorRegister {
        match self {
            Self::Overflow => DesignatorRegister::OVERFLOW,
            Self::Carry => DesignatorRegister::CARRY,
            Self::DivideCheck => DesignatorRegister::DIVIDE_CHECK,
            Self::CharacteristicOverflow => DesignatorRegister::CHARACTERISTIC_OVERFLOW,
            Self::CharacteristicUnderflow => DesignatorRegister::CHARACTERISTIC_UNDERFLOW,
        }
    }
}

/// J, and JK whose jump keys are never set
pub(super) fn jump_if<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    condition: bool,
) -> Result<()> {
    let target = processor.jump_target(instruction)?;
    if condition {
        processor.jump(target);
    }
    Ok(())
}

pub(super) fn halt_and_jump<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let target = processor.jump_target(instruction)?;
    processor.jump(target);
    processor.halt();
    Ok(())
}

/// JZ, JNZ, JP, JN, JB, JNB
pub(super) fn jump_on_a<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    condition: fn(Word36) -> bool,
) -> Result<()> {
    let target = processor.jump_target(instruction)?;
    if condition(processor.a(instruction.a())) {
        processor.jump(target);
    }
    Ok(())
}

/// Jump when the designator is (or is not) set. The divide check
/// designator is cleared by the test.
pub(super) fn jump_on_designator<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    designator: Designator,
    when_set: bool,
) -> Result<()> {
    let target = processor.jump_target(instruction)?;
    let set = processor.designators.contains(designator.flag());
    if designator == Designator::DivideCheck {
        processor
            .designators
            .remove(DesignatorRegister::DIVIDE_CHECK);
    }
    if set == when_set {
        processor.jump(target);
    }
    Ok(())
}

/// JPS, JNS: test the sign of A(a), then rotate it left one place
pub(super) fn jump_and_shift<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    negative: bool,
) -> Result<()> {
    let target = processor.jump_target(instruction)?;
    let a = processor.a(instruction.a());
    processor.set_a(instruction.a(), a.shift_left_circular(1));
    if a.is_negative() == negative {
        processor.jump(target);
    }
    Ok(())
}

/// JGD: the j and a fields together name a GRS location. Jump if it holds
/// a value greater than zero, then decrement it.
pub(super) fn jump_greater_and_decrement<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let index = usize::from((instruction.j() << 4) | instruction.a()) & 0o177;
    GeneralRegisterSet::check_access(index, processor.designators.processor_privilege(), true)?;
    let target = processor.jump_target(instruction)?;

    let value = processor.registers.read(index);
    let decremented = value.add(Word36::NEGATIVE_ONE).sum;
    processor.registers.write(index, decremented);
    debug!(%value, %decremented, "jump greater and decrement");
    if value.is_positive() && !value.is_zero() {
        processor.jump(target);
    }
    Ok(())
}

/// JMGI: jump if the modifier of X(a) is greater than zero, then increment it
pub(super) fn jump_modifier_greater_and_increment<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let target = processor.jump_target(instruction)?;
    let width = processor.index_width();
    let index = processor.x_index(instruction.a());
    let register = processor.registers.register_mut(index);
    let greater = register.signed_modifier(width) > 0;
    register.increment_modifier(width);
    if greater {
        processor.jump(target);
    }
    Ok(())
}

/// LMJ: the return address goes to the modifier (H2) of X(a)
pub(super) fn load_modifier_and_jump<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let target = processor.jump_target(instruction)?;
    let index = processor.x_index(instruction.a());
    let link = processor
        .registers
        .read(index)
        .with_h2(u64::from(processor.program_address.program_counter()));
    processor.registers.write(index, link);
    processor.jump(target);
    Ok(())
}

/// SLJ: store the return address in H2 of the operand, resume at the word
/// after it
pub(super) fn store_location_and_jump<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let relative = processor.relative_address(instruction)?;
    let location = processor.location(instruction, relative, 0, AccessType::Write)?;
    let word = processor
        .read_location(location)?
        .with_h2(u64::from(processor.program_address.program_counter()));
    processor.write_location(location, word)?;
    processor.increment_index(instruction);
    processor.jump(((relative + 1) & 0o77_777_777) as u32);
    Ok(())
}

/// DJZ: jump if A(a), A(a+1) is a 72-bit zero of either sign
pub(super) fn double_jump_zero<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let target = processor.jump_target(instruction)?;
    let (high, low) = processor.a_pair(instruction.a());
    if DoubleWord72::from_words(high, low).is_zero() {
        processor.jump(target);
    }
    Ok(())
}
