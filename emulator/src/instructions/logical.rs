use super::Result;
use crate::instruction_word::InstructionWord;
use crate::processor::Processor;
use crate::storage::Storage;
use crate::word::{Word36, MASK36};

/// OR, XOR, AND: A(a) combined with the operand, result to A(a+1)
pub(super) fn logical<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    operation: impl FnOnce(u64, u64) -> u64,
) -> Result<()> {
    let operand = processor.read_operand(instruction)?;
    let (a, _) = processor.a_pair(instruction.a());
    let result = Word36::new(operation(a.bits(), operand.bits()) & MASK36);
    processor.set_a_pair(instruction.a(), (a, result));
    Ok(())
}

/// MLU: bits of the operand where R2 is set, bits of A(a) elsewhere, to A(a+1)
pub(super) fn masked_load_upper<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let operand = processor.read_operand(instruction)?;
    let mask = processor.registers.read(processor.r_index(2)).bits();
    let (a, _) = processor.a_pair(instruction.a());
    let result = Word36::new((operand.bits() & mask) | (a.bits() & !mask & MASK36));
    processor.set_a_pair(instruction.a(), (a, result));
    Ok(())
}
