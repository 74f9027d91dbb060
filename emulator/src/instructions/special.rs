use tracing::debug;

use super::{decode, dispatch, Mnemonic, Result};
use crate::addressing::AccessType;
use crate::instruction_word::{InstructionWord, PartialWord};
use crate::interrupts::{InvalidInstructionReason, MachineInterrupt, SignalKind};
use crate::processor::{Location, Processor};
use crate::registers::{DesignatorRegister, IndicatorKeyRegister, ProgramAddressRegister};
use crate::storage::Storage;
use crate::word::Word36;

/// Value of the lock byte (S1) once set
const LOCKED: u64 = 0o01;

/// LD: replace the whole designator register
pub(super) fn load_designators<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let operand = processor.read_operand_word(instruction)?;
    processor.designators = DesignatorRegister::from_word(operand);
    debug!(dr = %processor.designators, "designators loaded");
    Ok(())
}

pub(super) fn store_designators<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let word = processor.designators.word();
    processor.write_operand(instruction, word)
}

/// Immediate value of the address field, indexed when x is set
fn immediate<S: Storage>(processor: &mut Processor<S>, instruction: InstructionWord) -> Word36 {
    let value = processor.immediate_operand(instruction, PartialWord::U);
    processor.increment_index(instruction);
    value
}

/// LPD: the immediate operand maps onto DB18 to DB35
pub(super) fn load_program_designators<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let value = immediate(processor, instruction);
    processor.designators.load_program_designators(value);
    Ok(())
}

pub(super) fn store_program_designators<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let word = processor.designators.program_designators();
    processor.write_operand(instruction, word)
}

/// What TS and TSS do when the lock is already set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TestAndSet {
    /// TS raises a test-and-set interrupt
    Interrupt,
    /// TSS falls through to the next instruction
    Skip,
}

fn lock_operand<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<(Location, u64, Word36)> {
    let relative = processor.relative_address(instruction)?;
    let location = processor.location(instruction, relative, 0, AccessType::Write)?;
    let word = processor.read_location(location)?;
    Ok((location, relative, word))
}

/// TS, TSS: set the lock in S1 of the operand if bit 5 is clear
pub(super) fn test_and_set<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    mode: TestAndSet,
) -> Result<()> {
    let (location, relative, word) = lock_operand(processor, instruction)?;
    if word.bit(5) {
        debug!(relative, ?mode, "lock already set");
        return match mode {
            TestAndSet::Interrupt => {
                let base_register = match location {
                    Location::Register(_) => 0,
                    Location::Storage { base_register, .. } => base_register as u8,
                };
                Err(MachineInterrupt::TestAndSet {
                    base_register,
                    relative_address: (relative & 0o77_777_777) as u32,
                })
            }
            TestAndSet::Skip => {
                processor.increment_index(instruction);
                Ok(())
            }
        };
    }

    processor.write_location(location, word.with_s1(LOCKED))?;
    processor.increment_index(instruction);
    if mode == TestAndSet::Skip {
        processor.skip();
    }
    Ok(())
}

/// TCS: clear S1 and skip if the lock was set
pub(super) fn test_and_clear<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let (location, _, word) = lock_operand(processor, instruction)?;
    if word.bit(5) {
        processor.write_location(location, word.with_s1(0))?;
        processor.skip();
    }
    processor.increment_index(instruction);
    Ok(())
}

/// ER, SGNL: hand the immediate operand to the executive
pub(super) fn signal<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
    kind: SignalKind,
) -> Result<()> {
    let value = immediate(processor, instruction);
    debug!(%kind, value = value.bits(), "signal");
    Err(MachineInterrupt::Signal {
        kind,
        value: value.bits() as u32,
    })
}

/// UR: reload PAR, DR and IKR from three consecutive words
pub(super) fn user_return<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let words = processor.read_consecutive_operands(instruction, 3)?;
    processor.restore_state(
        ProgramAddressRegister::from_word(words[0]),
        DesignatorRegister::from_word(words[1]),
        IndicatorKeyRegister::from_word(words[2]),
    )
}

/// EX: execute the instruction at the operand address. The target may not
/// itself be an EX.
pub(super) fn execute_remote<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let target = InstructionWord::new(processor.read_operand_word(instruction)?);
    if decode(target, processor.designators.addressing_mode()) == Some(Mnemonic::EX) {
        return Err(MachineInterrupt::invalid_instruction(
            InvalidInstructionReason::InvalidTargetInstruction,
        ));
    }

    // Stays set on failure: step() reports the interrupt as IndirectExecute
    // and clears it
    processor.executing_remote = true;
    let result = dispatch(processor, target);
    if result.is_ok() {
        processor.executing_remote = false;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::super::testing::{basic_processor, execute, ext, extended_processor};
    use crate::addressing::BankName;
    use crate::instruction_word::InstructionWord;
    use crate::interrupts::{InvalidInstructionReason, MachineInterrupt, SignalKind};
    use crate::registers::{DesignatorRegister, ProgramAddressRegister};
    use crate::word::Word36;
    use pretty_assertions::assert_eq;

    fn pc(processor: &crate::processor::Processor) -> u32 {
        processor.program_address.program_counter()
    }

    #[test]
    fn load_and_store_designators_test() {
        let mut processor = extended_processor();
        let dr = DesignatorRegister::CARRY | DesignatorRegister::QUANTUM_TIMER_ENABLED;
        processor.write_absolute(0o400, dr.word()).unwrap();

        // LD
        execute(&mut processor, ext(0o73, 0o15, 0o14, 0, 0o400)).unwrap();
        assert_eq!(processor.designators, dr);

        // SD
        execute(&mut processor, ext(0o73, 0o15, 0o15, 0, 0o401)).unwrap();
        assert_eq!(processor.read_absolute(0o401), Ok(dr.word()));
    }

    #[test]
    fn load_designators_requires_privilege_test() {
        let mut processor = extended_processor();
        processor.designators.set_processor_privilege(2);
        let before = processor.designators;
        processor
            .write_absolute(0o400, DesignatorRegister::BASIC_MODE.word())
            .unwrap();

        assert_eq!(
            execute(&mut processor, ext(0o73, 0o15, 0o14, 0, 0o400)),
            Err(MachineInterrupt::InvalidInstruction(
                InvalidInstructionReason::InvalidProcessorPrivilege
            ))
        );
        assert_eq!(processor.designators, before);
    }

    #[test]
    fn program_designators_test() {
        let mut processor = extended_processor();
        processor
            .designators
            .insert(DesignatorRegister::QUANTUM_TIMER_ENABLED);

        // LPD with DB18 (carry) and DB27 (operation trap enabled)
        let lpd = InstructionWord::extended(0o07, 0o14, 0, 0, true, false, 0, 0o400);
        execute(&mut processor, lpd).unwrap();
        assert!(processor.designators.contains(
            DesignatorRegister::CARRY | DesignatorRegister::OPERATION_TRAP_ENABLED
        ));
        assert!(processor
            .designators
            .contains(DesignatorRegister::QUANTUM_TIMER_ENABLED));

        // SPD stores only the program designators
        execute(&mut processor, ext(0o07, 0o15, 0, 0, 0o400)).unwrap();
        assert_eq!(
            processor.read_absolute(0o400),
            Ok(Word36::new(0o400_400))
        );
    }

    #[test]
    fn test_and_set_test() {
        let mut processor = extended_processor();
        processor
            .write_absolute(0o400, Word36::new(0o000_123_456_777))
            .unwrap();

        // TS on a clear lock sets it
        execute(&mut processor, ext(0o73, 0o17, 0, 0, 0o400)).unwrap();
        assert_eq!(
            processor.read_absolute(0o400),
            Ok(Word36::new(0o010_123_456_777))
        );
        assert_eq!(pc(&processor), 0o1001);

        // TS on a set lock interrupts
        assert_eq!(
            execute(&mut processor, ext(0o73, 0o17, 0, 0, 0o400)),
            Err(MachineInterrupt::TestAndSet {
                base_register: 0,
                relative_address: 0o400,
            })
        );

        // TSS on a set lock does not skip
        execute(&mut processor, ext(0o73, 0o17, 1, 0, 0o400)).unwrap();
        assert_eq!(pc(&processor), 0o1003);

        // TCS clears and skips
        execute(&mut processor, ext(0o73, 0o17, 2, 0, 0o400)).unwrap();
        assert_eq!(pc(&processor), 0o1005);
        assert_eq!(
            processor.read_absolute(0o400),
            Ok(Word36::new(0o000_123_456_777))
        );

        // TSS on a clear lock sets and skips
        execute(&mut processor, ext(0o73, 0o17, 1, 0, 0o400)).unwrap();
        assert_eq!(pc(&processor), 0o1007);
        // TCS on a clear lock does not skip
        processor.write_absolute(0o400, Word36::POSITIVE_ZERO).unwrap();
        execute(&mut processor, ext(0o73, 0o17, 2, 0, 0o400)).unwrap();
        assert_eq!(pc(&processor), 0o1010);
    }

    #[test]
    fn signal_test() {
        let mut processor = extended_processor();
        assert_eq!(
            execute(&mut processor, ext(0o73, 0o15, 0o17, 0, 0o42)),
            Err(MachineInterrupt::Signal {
                kind: SignalKind::Signal,
                value: 0o42,
            })
        );

        let mut processor = basic_processor();
        let er = InstructionWord::basic(0o72, 0o11, 0, 0, false, false, 0o1234);
        assert_eq!(
            execute(&mut processor, er),
            Err(MachineInterrupt::Signal {
                kind: SignalKind::ExecutiveRequest,
                value: 0o1234,
            })
        );
    }

    #[test]
    fn user_return_test() {
        let mut processor = extended_processor();
        let par = ProgramAddressRegister::new(BankName::new(0, 0), 0o2000);
        let mut dr = DesignatorRegister::CARRY;
        dr.set_processor_privilege(2);
        processor.write_absolute(0o400, par.word()).unwrap();
        processor.write_absolute(0o401, dr.word()).unwrap();
        processor
            .write_absolute(0o402, Word36::new(0o000_000_000_017))
            .unwrap();

        execute(&mut processor, ext(0o73, 0o15, 0o16, 0, 0o400)).unwrap();
        assert_eq!(processor.program_address, par);
        assert_eq!(processor.designators, dr);
        assert_eq!(processor.indicator_key.word(), Word36::new(0o17));
    }

    #[test]
    fn execute_remote_test() {
        let mut processor = extended_processor();
        // LA,U A3,0o77 as the target
        processor
            .write_absolute(0o400, ext(0o10, 0o16, 3, 0, 0o77).word())
            .unwrap();
        execute(&mut processor, ext(0o72, 0o10, 0, 0, 0o400)).unwrap();
        assert_eq!(processor.a(3), Word36::new(0o77));
        assert!(!processor.executing_remote);

        // An EX cannot target another EX
        processor
            .write_absolute(0o401, ext(0o72, 0o10, 0, 0, 0o400).word())
            .unwrap();
        assert_eq!(
            execute(&mut processor, ext(0o72, 0o10, 0, 0, 0o401)),
            Err(MachineInterrupt::InvalidInstruction(
                InvalidInstructionReason::InvalidTargetInstruction
            ))
        );
        assert!(!processor.executing_remote);
    }

    #[test]
    fn execute_remote_fault_keeps_flag_test() {
        let mut processor = extended_processor();
        processor.designators.set_processor_privilege(2);
        // LD as the target is privileged
        processor
            .write_absolute(0o400, ext(0o73, 0o15, 0o14, 0, 0o500).word())
            .unwrap();

        assert_eq!(
            execute(&mut processor, ext(0o72, 0o10, 0, 0, 0o400)),
            Err(MachineInterrupt::InvalidInstruction(
                InvalidInstructionReason::InvalidProcessorPrivilege
            ))
        );
        assert!(processor.executing_remote);
    }
}
