//! The general register set and the processor state registers.
//!
//! The 128 general registers are addressed by index. Several ranges are
//! aliased: the last four index registers overlap the first four accumulators
//! both in the user window (`X12..X15` / `A0..A3`) and in the executive window
//! (`EX12..EX15` / `EA0..EA3`).

mod designator;
mod indicator_key;
mod program_address;

use std::fmt::Write as _;

use tracing::debug;

use crate::constants as C;
use crate::interrupts::{MachineInterrupt, ReferenceViolationKind};
use crate::word::{ones_complement_add, ones_complement_to_i64, Word36};

pub use self::designator::DesignatorRegister;
pub use self::indicator_key::{IndicatorKeyRegister, MidInstruction};
pub use self::program_address::ProgramAddressRegister;

/// First user index register
pub const X0: usize = 0;

/// First user accumulator
pub const A0: usize = 0o14;

/// First user scratch register
pub const R0: usize = 0o100;

/// First executive scratch register
pub const ER0: usize = 0o120;

/// First executive index register
pub const EX0: usize = 0o140;

/// First executive accumulator
pub const EA0: usize = 0o154;

/// Registers below this index may be accessed by any program
const UNRESTRICTED_LIMIT: usize = 0o40;

/// Registers from [`UNRESTRICTED_LIMIT`] to this index are never accessible to software
const HARDWARE_RESERVED_LIMIT: usize = 0o100;

#[rustfmt::skip]
static REGISTER_NAMES: [&str; C::GRS_SIZE] = [
    "X0", "X1", "X2", "X3", "X4", "X5", "X6", "X7",
    "X8", "X9", "X10", "X11", "A0", "A1", "A2", "A3",
    "A4", "A5", "A6", "A7", "A8", "A9", "A10", "A11",
    "A12", "A13", "A14", "A15", "GRS034", "GRS035", "GRS036", "GRS037",
    "GRS040", "GRS041", "GRS042", "GRS043", "GRS044", "GRS045", "GRS046", "GRS047",
    "GRS050", "GRS051", "GRS052", "GRS053", "GRS054", "GRS055", "GRS056", "GRS057",
    "GRS060", "GRS061", "GRS062", "GRS063", "GRS064", "GRS065", "GRS066", "GRS067",
    "GRS070", "GRS071", "GRS072", "GRS073", "GRS074", "GRS075", "GRS076", "GRS077",
    "R0", "R1", "R2", "R3", "R4", "R5", "R6", "R7",
    "R8", "R9", "R10", "R11", "R12", "R13", "R14", "R15",
    "ER0", "ER1", "ER2", "ER3", "ER4", "ER5", "ER6", "ER7",
    "ER8", "ER9", "ER10", "ER11", "ER12", "ER13", "ER14", "ER15",
    "EX0", "EX1", "EX2", "EX3", "EX4", "EX5", "EX6", "EX7",
    "EX8", "EX9", "EX10", "EX11", "EA0", "EA1", "EA2", "EA3",
    "EA4", "EA5", "EA6", "EA7", "EA8", "EA9", "EA10", "EA11",
    "EA12", "EA13", "EA14", "EA15", "GRS174", "GRS175", "GRS176", "GRS177",
];

/// Name of a physical register, as used in listings
#[must_use]
pub fn register_name(index: usize) -> &'static str {
    REGISTER_NAMES[index]
}

/// Whether a register is a plain word or an index register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegisterRole {
    #[default]
    General,

    /// Supports the increment/modifier views
    Index,
}

/// Width of the modifier used by index registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    /// 18-bit modifier in H2, 18-bit increment in H1
    Bits18,

    /// 24-bit modifier in bits 12–35, 12-bit increment in T1
    Bits24,
}

impl IndexWidth {
    #[must_use]
    pub const fn modifier_bits(self) -> u32 {
        match self {
            IndexWidth::Bits18 => 18,
            IndexWidth::Bits24 => 24,
        }
    }

    #[must_use]
    pub const fn increment_bits(self) -> u32 {
        match self {
            IndexWidth::Bits18 => 18,
            IndexWidth::Bits24 => 12,
        }
    }
}

/// A single general register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Register {
    word: Word36,
    role: RegisterRole,
}

impl Register {
    #[must_use]
    pub const fn new(role: RegisterRole) -> Self {
        Self {
            word: Word36::POSITIVE_ZERO,
            role,
        }
    }

    #[must_use]
    pub const fn word(&self) -> Word36 {
        self.word
    }

    pub fn set_word(&mut self, word: Word36) {
        self.word = word;
    }

    #[must_use]
    pub const fn role(&self) -> RegisterRole {
        self.role
    }

    /// Raw modifier field
    #[must_use]
    pub const fn modifier(&self, width: IndexWidth) -> u64 {
        match width {
            IndexWidth::Bits18 => self.word.h2(),
            IndexWidth::Bits24 => self.word.bits() & 0o77_777_777,
        }
    }

    /// Raw increment field
    #[must_use]
    pub const fn increment(&self, width: IndexWidth) -> u64 {
        match width {
            IndexWidth::Bits18 => self.word.h1(),
            IndexWidth::Bits24 => self.word.t1(),
        }
    }

    /// Modifier interpreted as a signed value
    #[must_use]
    pub const fn signed_modifier(&self, width: IndexWidth) -> i64 {
        ones_complement_to_i64(self.modifier(width), width.modifier_bits())
    }

    /// Increment interpreted as a signed value
    #[must_use]
    pub const fn signed_increment(&self, width: IndexWidth) -> i64 {
        ones_complement_to_i64(self.increment(width), width.increment_bits())
    }

    pub fn set_modifier(&mut self, width: IndexWidth, value: u64) {
        self.word = match width {
            IndexWidth::Bits18 => self.word.with_h2(value),
            IndexWidth::Bits24 => {
                Word36::new((self.word.bits() & !0o77_777_777) | (value & 0o77_777_777))
            }
        };
    }

    /// Add the signed increment to the modifier, in place.
    ///
    /// # Panics
    ///
    /// Panics if the register does not have the index role.
    pub fn increment_modifier(&mut self, width: IndexWidth) {
        assert_eq!(
            self.role,
            RegisterRole::Index,
            "increment/modify on a non-index register"
        );

        let bits = width.modifier_bits();
        let increment = Word36::sign_extend(self.increment(width), width.increment_bits());
        let modifier = ones_complement_add(self.modifier(width), increment.bits(), bits);
        self.set_modifier(width, modifier);
    }
}

/// The 128-register general register set
#[derive(Clone, PartialEq, Eq)]
pub struct GeneralRegisterSet {
    registers: [Register; C::GRS_SIZE],
}

impl Default for GeneralRegisterSet {
    fn default() -> Self {
        let mut registers = [Register::new(RegisterRole::General); C::GRS_SIZE];
        for index in (X0..A0 + 4).chain(EX0..EA0 + 4) {
            registers[index] = Register::new(RegisterRole::Index);
        }
        Self { registers }
    }
}

impl GeneralRegisterSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a physical register. An index above 127 is a programming error and panics.
    #[must_use]
    pub fn read(&self, index: usize) -> Word36 {
        self.registers[index].word
    }

    pub fn write(&mut self, index: usize, word: Word36) {
        self.registers[index].word = word;
    }

    #[must_use]
    pub fn register(&self, index: usize) -> &Register {
        &self.registers[index]
    }

    pub fn register_mut(&mut self, index: usize) -> &mut Register {
        &mut self.registers[index]
    }

    /// Map a logical register index to the physical one, depending on which
    /// register window is selected.
    #[must_use]
    pub fn resolve(logical: usize, exec_register_set: bool) -> usize {
        if !exec_register_set {
            return logical;
        }

        match logical {
            i if i < A0 => EX0 + i,
            i if i < A0 + 16 => EA0 + (i - A0),
            i if (R0..R0 + 16).contains(&i) => ER0 + (i - R0),
            i => i,
        }
    }

    /// Whether software running at `privilege` may access a register
    #[must_use]
    pub const fn is_access_allowed(index: usize, privilege: u8, is_write: bool) -> bool {
        if index < UNRESTRICTED_LIMIT {
            true
        } else if index < HARDWARE_RESERVED_LIMIT {
            false
        } else {
            privilege == 0 || !is_write
        }
    }

    /// Like [`GeneralRegisterSet::is_access_allowed`], reporting a violation as an interrupt
    ///
    /// # Errors
    ///
    /// Returns a [`MachineInterrupt::ReferenceViolation`] when access is denied.
    pub fn check_access(
        index: usize,
        privilege: u8,
        is_write: bool,
    ) -> Result<(), MachineInterrupt> {
        if Self::is_access_allowed(index, privilege, is_write) {
            Ok(())
        } else {
            debug!(
                register = register_name(index),
                privilege, is_write, "register access denied"
            );
            Err(MachineInterrupt::ReferenceViolation {
                kind: ReferenceViolationKind::GrsViolation,
                fetch: false,
            })
        }
    }
}

impl std::fmt::Debug for GeneralRegisterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.registers
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| !r.word.is_positive_zero())
                    .map(|(i, r)| (REGISTER_NAMES[i], r.word)),
            )
            .finish()
    }
}

impl std::fmt::Display for GeneralRegisterSet {
    /// Every non-zero register, four per line
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut line = String::new();
        let mut count = 0;
        for (index, register) in self.registers.iter().enumerate() {
            if register.word.is_positive_zero() {
                continue;
            }

            if count > 0 && count % 4 == 0 {
                writeln!(f, "{}", line.trim_end())?;
                line.clear();
            }
            write!(line, "{:>6} = {}  ", REGISTER_NAMES[index], register.word)?;
            count += 1;
        }
        write!(f, "{}", line.trim_end())
    }
}
