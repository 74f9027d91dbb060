//! The instruction processor: fetch, dispatch and interrupt servicing.

use parse_display::Display;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::addressing::{
    AbsoluteAddress, AccessPermissions, AccessType, AddressSpace, BankName, BaseRegister,
    VirtualAddress,
};
use crate::config::ProcessorConfig;
use crate::constants as C;
use crate::instruction_word::{AddressingMode, InstructionWord};
use crate::instructions;
use crate::interrupts::{MachineInterrupt, PendingInterrupts};
use crate::registers::{
    DesignatorRegister, GeneralRegisterSet, IndicatorKeyRegister, MidInstruction,
    ProgramAddressRegister,
};
use crate::storage::{MainStorage, Storage, StorageError};
use crate::word::Word36;

mod operands;

pub(crate) use self::operands::Location;

/// Why a processor stopped executing instructions
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display(style = "kebab-case")]
pub enum StopReason {
    /// A halt-and-jump instruction was executed
    Halted,
}

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("processor stopped: {0}")]
    Stopped(StopReason),

    #[error("could not service interrupt {interrupt}: {cause}")]
    InterruptService {
        interrupt: MachineInterrupt,
        cause: MachineInterrupt,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

type Result<T> = std::result::Result<T, ProcessorError>;

/// A single instruction processor attached to its storage
pub struct Processor<S: Storage = MainStorage> {
    pub registers: GeneralRegisterSet,
    pub designators: DesignatorRegister,
    pub indicator_key: IndicatorKeyRegister,
    pub program_address: ProgramAddressRegister,
    pub address_space: AddressSpace,
    pub storage: S,
    pub interrupts: PendingInterrupts,
    pub cycles: usize,
    storage_upi: u32,
    quantum_timer: i64,
    stop: Option<StopReason>,

    /// Program counter of the instruction being executed
    current_address: u32,
    /// Set while executing the target of an EX instruction
    pub(crate) executing_remote: bool,
}

impl<S: Storage> std::fmt::Debug for Processor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("program_address", &self.program_address)
            .field("designators", &self.designators)
            .field("indicator_key", &self.indicator_key)
            .field("registers", &self.registers)
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

impl<S: Storage> std::fmt::Display for Processor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "PAR  {}", self.program_address)?;
        writeln!(f, "DR   {}", self.designators)?;
        writeln!(f, "IKR  {}", self.indicator_key.word())?;
        writeln!(f, "QT   {}", self.quantum_timer)?;
        writeln!(f, "cycles {}", self.cycles)?;
        write!(f, "{}", self.registers)
    }
}

impl Processor<MainStorage> {
    /// A processor with fresh main storage, set up as described by `config`
    #[must_use]
    pub fn new(config: &ProcessorConfig) -> Self {
        let storage = MainStorage::new(config.storage_upi, config.storage_size);
        Self::with_storage(config, storage)
    }
}

impl Default for Processor<MainStorage> {
    fn default() -> Self {
        Self::new(&ProcessorConfig::default())
    }
}

impl<S: Storage> Processor<S> {
    /// A processor attached to existing storage.
    ///
    /// The whole storage unit is made addressable: through B0 in extended
    /// mode, through B0 and B12 in basic mode.
    #[must_use]
    pub fn with_storage(config: &ProcessorConfig, storage: S) -> Self {
        let mut designators = DesignatorRegister::empty();
        designators.set_processor_privilege(config.privilege);
        designators.set(
            DesignatorRegister::BASIC_MODE,
            config.addressing_mode == AddressingMode::Basic,
        );
        designators.set(
            DesignatorRegister::EXEC_REGISTER_SET,
            config.exec_register_set,
        );

        let mut indicator_key = IndicatorKeyRegister::default();
        indicator_key.set_access_key(config.access_key);

        let flat = BaseRegister::flat(
            AbsoluteAddress::new(config.storage_upi, 0),
            config.storage_size as u64,
            AccessPermissions::all(),
        );
        let mut address_space = AddressSpace::new();
        address_space.load_base_register(0, flat);
        if config.addressing_mode == AddressingMode::Basic {
            address_space.load_base_register(12, flat);
        }

        Self {
            registers: GeneralRegisterSet::new(),
            designators,
            indicator_key,
            program_address: ProgramAddressRegister::new(BankName::new(0, 0), config.entry_point),
            address_space,
            storage,
            interrupts: PendingInterrupts::new(),
            cycles: 0,
            storage_upi: config.storage_upi,
            quantum_timer: config.quantum,
            stop: None,
            current_address: config.entry_point,
            executing_remote: false,
        }
    }

    #[must_use]
    pub const fn quantum_timer(&self) -> i64 {
        self.quantum_timer
    }

    pub fn set_quantum_timer(&mut self, value: i64) {
        self.quantum_timer = value;
    }

    #[must_use]
    pub const fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }

    pub(crate) fn halt(&mut self) {
        info!("processor halted");
        self.stop = Some(StopReason::Halted);
    }

    /// Program counter of the instruction currently (or last) executed
    #[must_use]
    pub const fn current_address(&self) -> u32 {
        self.current_address
    }

    /// Raise an interrupt from outside the instruction stream, e.g. an I/O
    /// completion. It is serviced at the next interrupt point.
    #[tracing::instrument(skip(self))]
    pub fn raise_interrupt(&mut self, interrupt: MachineInterrupt) {
        self.interrupts.raise(interrupt);
    }

    /// Absolute address in the main storage unit, used for the interrupt
    /// vector and save areas
    pub(crate) const fn system_address(&self, offset: C::Address) -> AbsoluteAddress {
        AbsoluteAddress::new(self.storage_upi, offset)
    }

    /// Execute one instruction, or service one pending interrupt.
    ///
    /// An instruction that faults leaves the processor at the entry point of
    /// the interrupt handler.
    ///
    /// # Errors
    ///
    /// Fails once the processor is stopped, or when an interrupt cannot be
    /// serviced.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn step(&mut self) -> Result<()> {
        if let Some(reason) = self.stop {
            return Err(ProcessorError::Stopped(reason));
        }

        if self.service_pending(MidInstruction::BetweenInstructions)? {
            return Ok(());
        }

        if let Err(interrupt) = self.fetch_and_execute() {
            let point = if self.executing_remote {
                MidInstruction::IndirectExecute
            } else {
                interrupt.interrupt_point()
            };
            self.executing_remote = false;
            self.interrupts.raise(interrupt);
            self.service_pending(point)?;
        }

        self.tick_quantum_timer();
        self.cycles += 1;
        Ok(())
    }

    /// Step until the processor stops
    ///
    /// # Errors
    ///
    /// Fails when an interrupt cannot be serviced.
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self) -> Result<StopReason> {
        loop {
            self.step()?;
            if let Some(reason) = self.stop {
                return Ok(reason);
            }
        }
    }

    /// Step at most `limit` times. Returns the stop reason if the processor
    /// stopped before the limit was reached.
    ///
    /// # Errors
    ///
    /// Fails when an interrupt cannot be serviced.
    #[tracing::instrument(skip(self))]
    pub fn run_steps(&mut self, limit: usize) -> Result<Option<StopReason>> {
        for _ in 0..limit {
            self.step()?;
            if let Some(reason) = self.stop {
                return Ok(Some(reason));
            }
        }
        Ok(None)
    }

    fn fetch_and_execute(&mut self) -> std::result::Result<(), MachineInterrupt> {
        let instruction = self.fetch()?;
        self.program_address.advance(1);
        instructions::dispatch(self, instruction)
    }

    #[tracing::instrument(skip(self), err, level = "trace")]
    fn fetch(&mut self) -> std::result::Result<InstructionWord, MachineInterrupt> {
        let program_counter = self.program_address.program_counter();
        self.current_address = program_counter;
        let relative = u64::from(program_counter);

        let key = self.indicator_key.access_key();
        let absolute = match self.designators.addressing_mode() {
            // The bank named by PAR is (re)loaded into B0 when it is not active
            AddressingMode::Extended => self.address_space.translate(
                &self.storage,
                key,
                VirtualAddress {
                    bank: self.program_address.bank_name(),
                    offset: relative,
                },
                0,
                AccessType::Read,
                true,
            )?,
            AddressingMode::Basic => {
                let base_register = self
                    .address_space
                    .basic_mode_base_register(
                        relative,
                        self.designators
                            .contains(DesignatorRegister::BASIC_MODE_BASE_REGISTER_SELECTION),
                    )
                    .ok_or(MachineInterrupt::storage_limits_violation(true))?;
                self.address_space.base_register(base_register).check(
                    key,
                    relative,
                    AccessType::Read,
                    true,
                )?
            }
        };
        Ok(InstructionWord::from(self.storage.read(absolute)?))
    }

    fn tick_quantum_timer(&mut self) {
        let before = self.quantum_timer;
        self.quantum_timer -= 1;
        if before >= 0
            && self.quantum_timer < 0
            && self
                .designators
                .contains(DesignatorRegister::QUANTUM_TIMER_ENABLED)
        {
            debug!("quantum timer expired");
            self.interrupts.raise(MachineInterrupt::QuantumTimer);
        }
    }

    /// Service the most urgent eligible interrupt, if any. Returns whether
    /// one was serviced.
    fn service_pending(&mut self, point: MidInstruction) -> Result<bool> {
        let deferrable_enabled = self
            .designators
            .contains(DesignatorRegister::DEFERRABLE_INTERRUPT_ENABLED);
        match self.interrupts.take_next(deferrable_enabled) {
            Some(interrupt) => {
                self.service_interrupt(interrupt, point)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Save the processor state and enter the handler of an interrupt.
    ///
    /// The save frame holds PAR, DR, IKR and the two interrupt status words.
    /// When the interrupt happened in the middle of an instruction, the
    /// saved program counter designates that instruction.
    #[tracing::instrument(skip(self))]
    fn service_interrupt(&mut self, interrupt: MachineInterrupt, point: MidInstruction) -> Result<()> {
        let class = interrupt.class();
        info!(%interrupt, code = class.code(), %point, "servicing interrupt");

        let mut saved_address = self.program_address;
        if point != MidInstruction::BetweenInstructions {
            saved_address.set_program_counter(self.current_address);
        }

        let (status0, status1) = interrupt.status_words();
        let frame = [
            saved_address.word(),
            self.designators.word(),
            self.indicator_key.word(),
            status0,
            status1,
        ];
        let save_area = self.system_address(C::INTERRUPT_SAVE_AREA);
        self.storage.write_consecutive(save_area, &frame)?;

        let vector = self.storage.read(
            self.system_address(C::INTERRUPT_VECTOR_TABLE + C::Address::from(class.code())),
        )?;
        let handler_bank = BankName::from_bits(vector.h1());
        let handler_address = vector.h2() as u32;

        let mut designators = self.designators;
        designators.set_processor_privilege(0);
        designators.remove(
            DesignatorRegister::BASIC_MODE
                | DesignatorRegister::QUANTUM_TIMER_ENABLED
                | DesignatorRegister::DEFERRABLE_INTERRUPT_ENABLED,
        );
        designators.insert(DesignatorRegister::EXEC_REGISTER_SET);
        if interrupt.is_fault() {
            designators.insert(DesignatorRegister::FAULT_HANDLING_IN_PROGRESS);
        }

        let mut indicator_key = self.indicator_key;
        indicator_key.set_short_status_field(interrupt.short_status_field());
        indicator_key.set_interrupt_class(class.code());
        indicator_key.set_mid_instruction(point);
        indicator_key.set_access_key(Default::default());

        // DR and IKR only change once the handler bank is known to be usable
        self.address_space
            .load_bank(&self.storage, 0, handler_bank, AccessType::Enter)
            .map_err(|cause| {
                warn!(%interrupt, %cause, "interrupt handler bank could not be loaded");
                ProcessorError::InterruptService { interrupt, cause }
            })?;
        self.designators = designators;
        self.indicator_key = indicator_key;
        self.program_address = ProgramAddressRegister::new(handler_bank, handler_address);
        debug!(par = %self.program_address, "entered interrupt handler");
        Ok(())
    }

    /// Restore PAR, DR and IKR from a save frame, as UR does
    pub(crate) fn restore_state(
        &mut self,
        program_address: ProgramAddressRegister,
        designators: DesignatorRegister,
        indicator_key: IndicatorKeyRegister,
    ) -> std::result::Result<(), MachineInterrupt> {
        if designators.addressing_mode() == AddressingMode::Extended {
            self.address_space.load_bank(
                &self.storage,
                0,
                program_address.bank_name(),
                AccessType::Enter,
            )?;
        }

        debug!(par = %program_address, dr = %designators, "restoring processor state");
        self.program_address = program_address;
        self.designators = designators;
        self.indicator_key = indicator_key;
        Ok(())
    }

    /// Read a word in the main storage unit, bypassing translation
    ///
    /// # Errors
    ///
    /// Fails if the address is outside main storage.
    pub fn read_absolute(&self, offset: C::Address) -> std::result::Result<Word36, StorageError> {
        self.storage.read(self.system_address(offset))
    }

    /// Write a word in the main storage unit, bypassing translation
    ///
    /// # Errors
    ///
    /// Fails if the address is outside main storage.
    pub fn write_absolute(
        &mut self,
        offset: C::Address,
        word: Word36,
    ) -> std::result::Result<(), StorageError> {
        let address = self.system_address(offset);
        self.storage.write(address, word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupts::{InterruptClass, InvalidInstructionReason};
    use crate::registers::A0;
    use pretty_assertions::assert_eq;

    fn processor() -> Processor {
        Processor::new(&ProcessorConfig::default().with_storage_size(0o10000))
    }

    fn handler_vector(processor: &mut Processor, class: InterruptClass, address: u64) {
        processor
            .write_absolute(
                C::INTERRUPT_VECTOR_TABLE + u64::from(class.code()),
                Word36::new(address),
            )
            .unwrap();
    }

    #[test]
    fn step_executes_and_advances_test() {
        let mut processor = processor();
        // LA,U A2,0o17
        let la = InstructionWord::extended(0o10, 0o16, 2, 0, false, false, 0, 0o17);
        processor.write_absolute(0o1000, la.word()).unwrap();

        processor.step().unwrap();
        assert_eq!(processor.registers.read(A0 + 2), Word36::new(0o17));
        assert_eq!(processor.program_address.program_counter(), 0o1001);
        assert_eq!(processor.cycles, 1);
    }

    #[test]
    fn undefined_instruction_enters_handler_test() {
        let mut processor = processor();
        handler_vector(&mut processor, InterruptClass::InvalidInstruction, 0o2000);
        processor.designators.set_processor_privilege(3);

        processor.step().unwrap();

        assert_eq!(processor.program_address.program_counter(), 0o2000);
        assert_eq!(processor.designators.processor_privilege(), 0);
        assert!(processor
            .designators
            .contains(DesignatorRegister::FAULT_HANDLING_IN_PROGRESS));
        assert_eq!(processor.indicator_key.interrupt_class(), 0o16);
        assert_eq!(
            processor.indicator_key.mid_instruction(),
            MidInstruction::MidExecution
        );

        // The saved PAR designates the faulting instruction
        let saved = ProgramAddressRegister::from_word(
            processor.read_absolute(C::INTERRUPT_SAVE_AREA).unwrap(),
        );
        assert_eq!(saved.program_counter(), 0o1000);
        let saved_designators =
            DesignatorRegister::from_word(processor.read_absolute(C::INTERRUPT_SAVE_AREA + 1).unwrap());
        assert_eq!(saved_designators.processor_privilege(), 3);
        assert!(processor.interrupts.is_empty());
    }

    #[test]
    fn execute_remote_fault_is_indirect_execute_test() {
        let mut processor = processor();
        handler_vector(&mut processor, InterruptClass::InvalidInstruction, 0o2000);
        processor.designators.set_processor_privilege(2);
        // EX 0o400, whose target is LD 0o500
        let ex = InstructionWord::extended(0o72, 0o10, 0, 0, false, false, 0, 0o400);
        let ld = InstructionWord::extended(0o73, 0o15, 0o14, 0, false, false, 0, 0o500);
        processor.write_absolute(0o1000, ex.word()).unwrap();
        processor.write_absolute(0o400, ld.word()).unwrap();

        processor.step().unwrap();
        assert_eq!(processor.program_address.program_counter(), 0o2000);
        assert_eq!(processor.indicator_key.interrupt_class(), 0o16);
        assert_eq!(
            processor.indicator_key.mid_instruction(),
            MidInstruction::IndirectExecute
        );
        assert!(!processor.executing_remote);

        // The saved PAR designates the EX instruction
        let saved = ProgramAddressRegister::from_word(
            processor.read_absolute(C::INTERRUPT_SAVE_AREA).unwrap(),
        );
        assert_eq!(saved.program_counter(), 0o1000);
    }

    #[test]
    fn fetch_loads_program_bank_test() {
        use crate::addressing::{BankDescriptor, BankType};

        let mut processor = processor();
        let bank = BankName::new(1, 0o40);
        let descriptor = BankDescriptor::new(BankType::ExtendedMode)
            .with_permissions(AccessPermissions::all(), AccessPermissions::all())
            .with_limits(0, 0o777)
            .with_base(0, 0o6000);
        for (offset, word) in descriptor.to_words().into_iter().enumerate() {
            processor
                .write_absolute(0o4000 + u64::from(bank.bdi) * 8 + offset as u64, word)
                .unwrap();
        }
        processor.address_space.load_base_register(
            C::BDT_BASE_REGISTER + 1,
            BaseRegister::flat(AbsoluteAddress::new(0, 0o4000), 0o1000, AccessPermissions::READ),
        );

        // LA,U A2,017 at offset 010 of the bank, which no base register holds yet
        let la = InstructionWord::extended(0o10, 0o16, 2, 0, false, false, 0, 0o17);
        processor.write_absolute(0o6010, la.word()).unwrap();
        processor.program_address = ProgramAddressRegister::new(bank, 0o10);

        processor.step().unwrap();
        assert_eq!(processor.registers.read(A0 + 2), Word36::new(0o17));
        assert!(processor.address_space.active_base_table().matches(0, bank));
        assert_eq!(
            processor.address_space.base_register(0).base_address,
            AbsoluteAddress::new(0, 0o6000)
        );
        assert_eq!(processor.program_address.program_counter(), 0o11);
    }

    #[test]
    fn external_interrupt_serviced_between_instructions_test() {
        let mut processor = processor();
        handler_vector(&mut processor, InterruptClass::HardwareCheck, 0o3000);
        processor.raise_interrupt(MachineInterrupt::HardwareCheck(
            crate::interrupts::HardwareCheckReason::Channel,
        ));

        processor.step().unwrap();
        assert_eq!(processor.program_address.program_counter(), 0o3000);
        let saved = ProgramAddressRegister::from_word(
            processor.read_absolute(C::INTERRUPT_SAVE_AREA).unwrap(),
        );
        assert_eq!(saved.program_counter(), 0o1000);
    }

    #[test]
    fn deferrable_interrupts_wait_test() {
        let mut processor = processor();
        processor.raise_interrupt(MachineInterrupt::QuantumTimer);
        // NOP at 0o1000
        processor
            .write_absolute(
                0o1000,
                InstructionWord::extended(0o73, 0o14, 0, 0, false, false, 0, 0).word(),
            )
            .unwrap();

        processor.step().unwrap();
        assert_eq!(processor.program_address.program_counter(), 0o1001);
        assert!(processor.interrupts.contains(InterruptClass::QuantumTimer));
    }

    #[test]
    fn quantum_timer_test() {
        let mut processor = processor();
        processor
            .designators
            .insert(DesignatorRegister::QUANTUM_TIMER_ENABLED);
        processor.set_quantum_timer(1);
        for address in 0o1000..0o1003 {
            processor
                .write_absolute(
                    address,
                    InstructionWord::extended(0o73, 0o14, 0, 0, false, false, 0, 0).word(),
                )
                .unwrap();
        }

        processor.step().unwrap();
        assert!(processor.interrupts.is_empty());
        processor.step().unwrap();
        assert_eq!(processor.quantum_timer(), -1);
        assert!(processor.interrupts.contains(InterruptClass::QuantumTimer));
    }

    #[test]
    fn unserviceable_interrupt_test() {
        let mut processor = processor();
        // Vector points at a bank whose descriptor table does not exist
        processor
            .write_absolute(
                C::INTERRUPT_VECTOR_TABLE + 0o16,
                Word36::new(0).with_h1(BankName::new(1, 0o40).bits()),
            )
            .unwrap();
        processor.designators.set_processor_privilege(3);
        let indicator_key = processor.indicator_key;

        let error = processor.step().unwrap_err();
        assert!(matches!(
            error,
            ProcessorError::InterruptService {
                interrupt: MachineInterrupt::InvalidInstruction(
                    InvalidInstructionReason::UndefinedFunctionCode
                ),
                ..
            }
        ));
        // The failed entry leaves the interrupted state in place
        assert_eq!(processor.designators.processor_privilege(), 3);
        assert!(!processor
            .designators
            .contains(DesignatorRegister::EXEC_REGISTER_SET));
        assert_eq!(processor.indicator_key, indicator_key);
    }

    #[test]
    fn halted_processor_refuses_to_step_test() {
        let mut processor = processor();
        processor.halt();
        assert!(matches!(
            processor.step(),
            Err(ProcessorError::Stopped(StopReason::Halted))
        ));
    }
}
