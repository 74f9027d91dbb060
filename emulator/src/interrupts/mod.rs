//! Machine interrupts.
//!
//! Every fault or condition detected while executing an instruction is
//! returned as a [`MachineInterrupt`]. The processor queues it in its
//! [`PendingInterrupts`] and services the most urgent one at the next
//! interrupt point.

mod pending;

use parse_display::Display;
use thiserror::Error;

use crate::addressing::BankName;
use crate::registers::MidInstruction;
use crate::storage::StorageError;
use crate::word::Word36;

pub use self::pending::PendingInterrupts;

/// Fault or non-fault condition
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display(style = "kebab-case")]
pub enum Category {
    Fault,
    NonFault,
}

/// How an interrupt relates to the instruction stream
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display(style = "lowercase")]
pub enum Synchrony {
    /// Caused by the current instruction; dropped when pre-empted
    Synchronous,
    /// Caused by something outside the instruction stream
    Asynchronous,
    /// Recorded in processor state until taken or cleared
    Pended,
    /// Sent to every processor
    Broadcast,
}

/// Whether servicing may wait for the deferrable-interrupt enable designator
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display(style = "lowercase")]
pub enum Deferrability {
    /// Must be taken at the next interrupt point
    Exigent,
    /// Waits until DB13 is set
    Deferrable,
}

/// Interrupt classes, numbered by their architectural class code.
///
/// A lower code means a higher priority.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum InterruptClass {
    HardwareDefault = 0o0,
    HardwareCheck = 0o1,
    Diagnostic = 0o2,
    ReferenceViolation = 0o10,
    AddressingException = 0o11,
    TerminalAddressingException = 0o12,
    RcsGenericStackUnderOverflow = 0o13,
    Signal = 0o14,
    TestAndSet = 0o15,
    InvalidInstruction = 0o16,
    PageException = 0o17,
    ArithmeticException = 0o20,
    DataException = 0o21,
    OperationTrap = 0o22,
    Breakpoint = 0o23,
    QuantumTimer = 0o24,
    SoftwareBreak = 0o27,
    JumpHistoryFull = 0o30,
    DynamicAddressTranslation = 0o32,
    UpiInitial = 0o33,
    UpiNormal = 0o34,
}

impl InterruptClass {
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn category(self) -> Category {
        match self {
            Self::Signal
            | Self::TestAndSet
            | Self::Breakpoint
            | Self::QuantumTimer
            | Self::SoftwareBreak
            | Self::JumpHistoryFull
            | Self::DynamicAddressTranslation
            | Self::UpiInitial
            | Self::UpiNormal => Category::NonFault,
            _ => Category::Fault,
        }
    }

    #[must_use]
    pub const fn synchrony(self) -> Synchrony {
        match self {
            Self::HardwareDefault
            | Self::HardwareCheck
            | Self::Diagnostic
            | Self::JumpHistoryFull => Synchrony::Asynchronous,
            Self::QuantumTimer | Self::SoftwareBreak => Synchrony::Pended,
            Self::UpiInitial | Self::UpiNormal => Synchrony::Broadcast,
            _ => Synchrony::Synchronous,
        }
    }

    #[must_use]
    pub const fn deferrability(self) -> Deferrability {
        match self {
            Self::QuantumTimer
            | Self::SoftwareBreak
            | Self::JumpHistoryFull
            | Self::UpiInitial
            | Self::UpiNormal => Deferrability::Deferrable,
            _ => Deferrability::Exigent,
        }
    }

    /// Point in the instruction the interrupt is reported at
    #[must_use]
    pub const fn interrupt_point(self) -> MidInstruction {
        match self {
            Self::Signal
            | Self::QuantumTimer
            | Self::SoftwareBreak
            | Self::JumpHistoryFull
            | Self::UpiInitial
            | Self::UpiNormal => MidInstruction::BetweenInstructions,
            _ => MidInstruction::MidExecution,
        }
    }
}

/// Reason carried by a hardware check
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display(style = "lowercase")]
pub enum HardwareCheckReason {
    /// A storage unit could not complete a reference
    Storage,
    /// An I/O channel reported a system error
    Channel,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display(style = "kebab-case")]
pub enum ReferenceViolationKind {
    GrsViolation,
    StorageLimitsViolation,
    ReadAccessViolation,
    WriteAccessViolation,
}

impl ReferenceViolationKind {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::GrsViolation => 0,
            Self::StorageLimitsViolation => 1,
            Self::ReadAccessViolation => 2,
            Self::WriteAccessViolation => 3,
        }
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display(style = "kebab-case")]
pub enum AddressingExceptionReason {
    FatalAddressingException,
    GBitSetIndirect,
    EnterAccessDenied,
    InvalidSourceLevelBdi,
    GateBankBoundaryViolation,
    InvalidIsValue,
    GoToInhibitSet,
    GenericQueuingViolation,
    MaxCountExceeded,
    BdTypeInvalid,
}

impl AddressingExceptionReason {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::FatalAddressingException => 0,
            Self::GBitSetIndirect => 1,
            Self::EnterAccessDenied => 2,
            Self::InvalidSourceLevelBdi => 3,
            Self::GateBankBoundaryViolation => 4,
            Self::InvalidIsValue => 5,
            Self::GoToInhibitSet => 6,
            Self::GenericQueuingViolation => 7,
            Self::MaxCountExceeded => 0o10,
            Self::BdTypeInvalid => 0o11,
        }
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display(style = "kebab-case")]
pub enum InvalidInstructionReason {
    UndefinedFunctionCode,
    InvalidLinkageRegister,
    InvalidProcessorPrivilege,
    InvalidBaseRegister,
    InvalidTargetInstruction,
}

impl InvalidInstructionReason {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::UndefinedFunctionCode => 0,
            Self::InvalidLinkageRegister => 1,
            Self::InvalidProcessorPrivilege => 2,
            Self::InvalidBaseRegister => 3,
            Self::InvalidTargetInstruction => 4,
        }
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display(style = "kebab-case")]
pub enum ArithmeticExceptionReason {
    CharacteristicOverflow,
    CharacteristicUnderflow,
    DivideCheck,
}

impl ArithmeticExceptionReason {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::CharacteristicOverflow => 0,
            Self::CharacteristicUnderflow => 1,
            Self::DivideCheck => 2,
        }
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display(style = "kebab-case")]
pub enum OperationTrapReason {
    FixedPointBinaryIntegerOverflow,
    FixedPointDecimalIntegerOverflow,
    MultiplySingleIntegerOverflow,
}

impl OperationTrapReason {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::FixedPointBinaryIntegerOverflow => 1,
            Self::FixedPointDecimalIntegerOverflow => 2,
            Self::MultiplySingleIntegerOverflow => 3,
        }
    }
}

/// What raised a signal interrupt
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display(style = "kebab-case")]
pub enum SignalKind {
    /// ER, a basic-mode executive request
    ExecutiveRequest,
    /// SGNL
    Signal,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineInterrupt {
    #[error("hardware default")]
    HardwareDefault,

    #[error("hardware check ({0})")]
    HardwareCheck(HardwareCheckReason),

    #[error("diagnostic")]
    Diagnostic,

    #[error("reference violation: {kind} (fetch: {fetch})")]
    ReferenceViolation {
        kind: ReferenceViolationKind,
        fetch: bool,
    },

    #[error("addressing exception: {reason} on bank {bank}")]
    AddressingException {
        reason: AddressingExceptionReason,
        bank: BankName,
    },

    #[error("terminal addressing exception on bank {bank}")]
    TerminalAddressingException { bank: BankName },

    #[error("RCS/generic stack under/overflow (underflow: {underflow}, B{base_register}, {relative_address:o})")]
    RcsGenericStackUnderOverflow {
        underflow: bool,
        base_register: u8,
        relative_address: u32,
    },

    #[error("{kind} {value:o}")]
    Signal { kind: SignalKind, value: u32 },

    #[error("test and set on B{base_register} {relative_address:o}")]
    TestAndSet {
        base_register: u8,
        relative_address: u32,
    },

    #[error("invalid instruction: {0}")]
    InvalidInstruction(InvalidInstructionReason),

    #[error("page exception on bank {bank}")]
    PageException { bank: BankName },

    #[error("arithmetic exception: {0}")]
    ArithmeticException(ArithmeticExceptionReason),

    #[error("data exception")]
    DataException,

    #[error("operation trap: {0}")]
    OperationTrap(OperationTrapReason),

    #[error("breakpoint")]
    Breakpoint,

    #[error("quantum timer expired")]
    QuantumTimer,

    #[error("software break")]
    SoftwareBreak,

    #[error("jump history full")]
    JumpHistoryFull,

    #[error("dynamic address translation")]
    DynamicAddressTranslation,

    #[error("UPI initial from {source_upi}")]
    UpiInitial { source_upi: u32 },

    #[error("UPI normal from {source_upi}")]
    UpiNormal { source_upi: u32 },
}

impl MachineInterrupt {
    #[must_use]
    pub const fn storage_limits_violation(fetch: bool) -> Self {
        Self::ReferenceViolation {
            kind: ReferenceViolationKind::StorageLimitsViolation,
            fetch,
        }
    }

    #[must_use]
    pub const fn invalid_instruction(reason: InvalidInstructionReason) -> Self {
        Self::InvalidInstruction(reason)
    }

    #[must_use]
    pub const fn class(&self) -> InterruptClass {
        match self {
            Self::HardwareDefault => InterruptClass::HardwareDefault,
            Self::HardwareCheck(_) => InterruptClass::HardwareCheck,
            Self::Diagnostic => InterruptClass::Diagnostic,
            Self::ReferenceViolation { .. } => InterruptClass::ReferenceViolation,
            Self::AddressingException { .. } => InterruptClass::AddressingException,
            Self::TerminalAddressingException { .. } => {
                InterruptClass::TerminalAddressingException
            }
            Self::RcsGenericStackUnderOverflow { .. } => {
                InterruptClass::RcsGenericStackUnderOverflow
            }
            Self::Signal { .. } => InterruptClass::Signal,
            Self::TestAndSet { .. } => InterruptClass::TestAndSet,
            Self::InvalidInstruction(_) => InterruptClass::InvalidInstruction,
            Self::PageException { .. } => InterruptClass::PageException,
            Self::ArithmeticException(_) => InterruptClass::ArithmeticException,
            Self::DataException => InterruptClass::DataException,
            Self::OperationTrap(_) => InterruptClass::OperationTrap,
            Self::Breakpoint => InterruptClass::Breakpoint,
            Self::QuantumTimer => InterruptClass::QuantumTimer,
            Self::SoftwareBreak => InterruptClass::SoftwareBreak,
            Self::JumpHistoryFull => InterruptClass::JumpHistoryFull,
            Self::DynamicAddressTranslation => InterruptClass::DynamicAddressTranslation,
            Self::UpiInitial { .. } => InterruptClass::UpiInitial,
            Self::UpiNormal { .. } => InterruptClass::UpiNormal,
        }
    }

    #[must_use]
    pub const fn category(&self) -> Category {
        self.class().category()
    }

    #[must_use]
    pub const fn synchrony(&self) -> Synchrony {
        self.class().synchrony()
    }

    #[must_use]
    pub const fn deferrability(&self) -> Deferrability {
        self.class().deferrability()
    }

    #[must_use]
    pub const fn interrupt_point(&self) -> MidInstruction {
        self.class().interrupt_point()
    }

    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self.category(), Category::Fault)
    }

    /// Interrupt-specific reason code stored in the IKR short status field
    #[must_use]
    pub const fn short_status_field(&self) -> u8 {
        match self {
            Self::HardwareCheck(HardwareCheckReason::Storage) => 0,
            Self::HardwareCheck(HardwareCheckReason::Channel) => 1,
            Self::ReferenceViolation { kind, fetch } => ((*fetch as u8) << 5) | kind.code(),
            Self::AddressingException { reason, .. } => reason.code(),
            Self::RcsGenericStackUnderOverflow { underflow, .. } => *underflow as u8,
            Self::Signal { kind, .. } => match kind {
                SignalKind::ExecutiveRequest => 0,
                SignalKind::Signal => 1,
            },
            Self::InvalidInstruction(reason) => reason.code(),
            Self::ArithmeticException(reason) => reason.code(),
            Self::OperationTrap(reason) => reason.code(),
            _ => 0,
        }
    }

    /// The two interrupt status words written to the save area
    #[must_use]
    pub const fn status_words(&self) -> (Word36, Word36) {
        let zero = Word36::POSITIVE_ZERO;
        match self {
            Self::AddressingException { bank, .. }
            | Self::TerminalAddressingException { bank }
            | Self::PageException { bank } => (zero.with_h1(bank.bits()), zero),
            Self::RcsGenericStackUnderOverflow {
                base_register,
                relative_address,
                ..
            }
            | Self::TestAndSet {
                base_register,
                relative_address,
            } => (
                zero.with_s1(*base_register as u64),
                Word36::new(*relative_address as u64),
            ),
            Self::Signal { value, .. } => (Word36::new(*value as u64), zero),
            Self::UpiInitial { source_upi } | Self::UpiNormal { source_upi } => {
                (Word36::new(*source_upi as u64), zero)
            }
            _ => (zero, zero),
        }
    }
}

impl From<StorageError> for MachineInterrupt {
    fn from(_: StorageError) -> Self {
        Self::HardwareCheck(HardwareCheckReason::Storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    #[rustfmt::skip]
    fn class_table_test() {
        use InterruptClass as I;

        let table = [
            (I::HardwareCheck, 0o1, Category::Fault, Synchrony::Asynchronous, Deferrability::Exigent),
            (I::ReferenceViolation, 0o10, Category::Fault, Synchrony::Synchronous, Deferrability::Exigent),
            (I::AddressingException, 0o11, Category::Fault, Synchrony::Synchronous, Deferrability::Exigent),
            (I::Signal, 0o14, Category::NonFault, Synchrony::Synchronous, Deferrability::Exigent),
            (I::InvalidInstruction, 0o16, Category::Fault, Synchrony::Synchronous, Deferrability::Exigent),
            (I::QuantumTimer, 0o24, Category::NonFault, Synchrony::Pended, Deferrability::Deferrable),
            (I::JumpHistoryFull, 0o30, Category::NonFault, Synchrony::Asynchronous, Deferrability::Deferrable),
            (I::UpiNormal, 0o34, Category::NonFault, Synchrony::Broadcast, Deferrability::Deferrable),
        ];

        for (class, code, category, synchrony, deferrability) in table {
            assert_eq!(class.code(), code, "{class}");
            assert_eq!(class.category(), category, "{class}");
            assert_eq!(class.synchrony(), synchrony, "{class}");
            assert_eq!(class.deferrability(), deferrability, "{class}");
        }

        assert_eq!(I::Signal.interrupt_point(), MidInstruction::BetweenInstructions);
        assert_eq!(I::TestAndSet.interrupt_point(), MidInstruction::MidExecution);
    }

    #[test]
    fn short_status_field_test() {
        let violation = MachineInterrupt::ReferenceViolation {
            kind: ReferenceViolationKind::WriteAccessViolation,
            fetch: true,
        };
        assert_eq!(violation.short_status_field(), 0o43);
        assert_eq!(
            MachineInterrupt::InvalidInstruction(InvalidInstructionReason::InvalidProcessorPrivilege)
                .short_status_field(),
            2
        );
    }

    #[test]
    fn status_words_test() {
        let interrupt = MachineInterrupt::AddressingException {
            reason: AddressingExceptionReason::GBitSetIndirect,
            bank: BankName::new(3, 0o20),
        };
        assert_eq!(
            interrupt.status_words(),
            (Word36::new(0o300_020_000_000), Word36::POSITIVE_ZERO)
        );

        let interrupt = MachineInterrupt::TestAndSet {
            base_register: 4,
            relative_address: 0o1234,
        };
        assert_eq!(
            interrupt.status_words(),
            (Word36::new(0o040_000_000_000), Word36::new(0o1234))
        );
    }

    #[test]
    fn display_test() {
        let interrupt = MachineInterrupt::AddressingException {
            reason: AddressingExceptionReason::FatalAddressingException,
            bank: BankName::new(1, 0o40),
        };
        assert_eq!(
            interrupt.to_string(),
            "addressing exception: fatal-addressing-exception on bank 1:00040"
        );
    }
}
