use tracing::debug;

use super::Result;
use crate::addressing::{AccessType, BankName, BaseRegister};
use crate::constants as C;
use crate::instruction_word::InstructionWord;
use crate::interrupts::{InvalidInstructionReason, MachineInterrupt};
use crate::processor::Processor;
use crate::storage::Storage;
use crate::word::Word36;

/// Make `bank` addressable through `base_register`. A null name (level 0,
/// BDI 0) voids the register instead of copying B0.
fn load_bank<S: Storage>(
    processor: &mut Processor<S>,
    base_register: usize,
    bank: BankName,
) -> Result<()> {
    if bank == BankName::default() {
        debug!(base_register, "voiding base register");
        processor
            .address_space
            .load_base_register(base_register, BaseRegister::void());
        return Ok(());
    }

    processor.address_space.load_bank(
        &processor.storage,
        base_register,
        bank,
        AccessType::Read,
    )
}

fn user_base_register(instruction: InstructionWord) -> Result<usize> {
    match instruction.a() {
        0 => Err(MachineInterrupt::invalid_instruction(
            InvalidInstructionReason::InvalidBaseRegister,
        )),
        a => Ok(usize::from(a)),
    }
}

fn exec_base_register(instruction: InstructionWord) -> usize {
    C::BDT_BASE_REGISTER + usize::from(instruction.a())
}

/// LBU: load B(a) from the bank named in H1 of the operand
pub(super) fn load_bank_user<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let base_register = user_base_register(instruction)?;
    let operand = processor.read_operand_word(instruction)?;
    load_bank(processor, base_register, BankName::from_bits(operand.h1()))
}

/// LBE: load B(16+a) from the bank named in H1 of the operand
pub(super) fn load_bank_exec<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let operand = processor.read_operand_word(instruction)?;
    load_bank(
        processor,
        exec_base_register(instruction),
        BankName::from_bits(operand.h1()),
    )
}

/// LBUD, LBED: load a base register from a four-word storage image,
/// bypassing bank descriptors
pub(super) fn load_base_register_direct<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    exec: bool,
) -> Result<()> {
    let base_register = if exec {
        exec_base_register(instruction)
    } else {
        user_base_register(instruction)?
    };

    let words = processor.read_consecutive_operands(instruction, BaseRegister::IMAGE_SIZE)?;
    let mut image = [Word36::POSITIVE_ZERO; BaseRegister::IMAGE_SIZE];
    image.copy_from_slice(&words);
    processor
        .address_space
        .load_base_register(base_register, BaseRegister::from_image(&image));
    Ok(())
}

/// SBU: store the active base table entry of B(a), bank name in H1 and
/// offset in H2, or zero if no bank is recorded
pub(super) fn store_bank_user<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let word = processor
        .address_space
        .active_base_table()
        .get(usize::from(instruction.a()))
        .map_or(Word36::POSITIVE_ZERO, |entry| {
            Word36::POSITIVE_ZERO
                .with_h1(entry.bank.bits())
                .with_h2(u64::from(entry.offset))
        });
    processor.write_operand(instruction, word)
}

/// LAE: load B1 to B15 from the bank names in H1 of fifteen consecutive words
pub(super) fn load_addressing_environment<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let words = processor.read_consecutive_operands(instruction, 15)?;

    // Every name is resolved before any register is touched
    let registers = words
        .into_iter()
        .map(|word| {
            let bank = BankName::from_bits(word.h1());
            if bank == BankName::default() {
                Ok((BaseRegister::void(), None))
            } else {
                processor
                    .address_space
                    .resolve_bank(&processor.storage, bank, AccessType::Read)
            }
        })
        .collect::<Result<Vec<_>>>()?;

    for (base_register, (register, bank)) in (1..).zip(registers) {
        processor.address_space.install(base_register, register, bank);
    }
    Ok(())
}
