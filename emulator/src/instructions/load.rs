use tracing::debug;

use super::Result;
use crate::instruction_word::InstructionWord;
use crate::processor::Processor;
use crate::registers::IndexWidth;
use crate::storage::Storage;
use crate::word::{DoubleWord72, Word36};

/// LA, LNA, LMA, LNMA
pub(super) fn load_a<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    transform: impl FnOnce(Word36) -> Word36,
) -> Result<()> {
    let operand = processor.read_operand(instruction)?;
    processor.set_a(instruction.a(), transform(operand));
    Ok(())
}

pub(super) fn load_r<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let operand = processor.read_operand(instruction)?;
    let index = processor.r_index(instruction.a());
    processor.registers.write(index, operand);
    Ok(())
}

pub(super) fn load_x<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let operand = processor.read_operand(instruction)?;
    let index = processor.x_index(instruction.a());
    processor.registers.write(index, operand);
    Ok(())
}

/// LXM loads the modifier at the current index width, LXLM always loads a
/// 24-bit modifier. The increment is kept.
pub(super) fn load_x_modifier<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    long: bool,
) -> Result<()> {
    let (operand, width) = if long {
        (processor.read_operand_word(instruction)?, IndexWidth::Bits24)
    } else {
        (processor.read_operand(instruction)?, processor.index_width())
    };

    let index = processor.x_index(instruction.a());
    processor
        .registers
        .register_mut(index)
        .set_modifier(width, operand.bits());
    Ok(())
}

/// LXI: load the increment, keeping the modifier
pub(super) fn load_x_increment<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let operand = processor.read_operand(instruction)?;
    let index = processor.x_index(instruction.a());
    let current = processor.registers.read(index);
    let updated = match processor.index_width() {
        IndexWidth::Bits18 => current.with_h1(operand.h2()),
        IndexWidth::Bits24 => current.with_t1(operand.t3()),
    };
    processor.registers.write(index, updated);
    Ok(())
}

/// DL, DLN, DLM
pub(super) fn load_double<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    transform: impl FnOnce(DoubleWord72) -> DoubleWord72,
) -> Result<()> {
    let words = processor.read_consecutive_operands(instruction, 2)?;
    let value = transform(DoubleWord72::from_words(words[0], words[1]));
    debug!(%value, "double load");
    processor.set_a_pair(instruction.a(), value.words());
    Ok(())
}
