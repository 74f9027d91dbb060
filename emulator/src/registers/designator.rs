use bitflags::bitflags;

use crate::instruction_word::AddressingMode;
use crate::word::Word36;

/// Mask for designator bit `n`, architectural numbering
const fn db(n: u32) -> u64 {
    1 << (35 - n)
}

bitflags! {
    /// Processor mode and condition flags
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DesignatorRegister: u64 {
        const ACTIVITY_LEVEL_QUEUE_MONITOR       = db(0);
        const FAULT_HANDLING_IN_PROGRESS         = db(6);
        const EXECUTIVE_24BIT_INDEXING           = db(11);
        const QUANTUM_TIMER_ENABLED              = db(12);
        const DEFERRABLE_INTERRUPT_ENABLED       = db(13);
        const PROCESSOR_PRIVILEGE                = db(14) | db(15);
        const BASIC_MODE                         = db(16);
        const EXEC_REGISTER_SET                  = db(17);
        const CARRY                              = db(18);
        const OVERFLOW                           = db(19);
        const CHARACTERISTIC_UNDERFLOW           = db(21);
        const CHARACTERISTIC_OVERFLOW            = db(22);
        const DIVIDE_CHECK                       = db(23);
        const OPERATION_TRAP_ENABLED             = db(27);
        const ARITHMETIC_EXCEPTION_ENABLED       = db(29);
        const BASIC_MODE_BASE_REGISTER_SELECTION = db(31);
        const QUARTER_WORD_MODE                  = db(32);

        const _ = !0;
    }
}

impl Default for DesignatorRegister {
    fn default() -> Self {
        Self::empty()
    }
}

impl DesignatorRegister {
    /// Designators a program may load and store itself (LPD/SPD)
    pub const PROGRAM_DESIGNATORS: Self = Self::CARRY
        .union(Self::OVERFLOW)
        .union(Self::CHARACTERISTIC_UNDERFLOW)
        .union(Self::CHARACTERISTIC_OVERFLOW)
        .union(Self::DIVIDE_CHECK)
        .union(Self::OPERATION_TRAP_ENABLED)
        .union(Self::QUARTER_WORD_MODE);

    #[must_use]
    pub const fn from_word(word: Word36) -> Self {
        Self::from_bits_retain(word.bits())
    }

    #[must_use]
    pub const fn word(self) -> Word36 {
        Word36::new(self.bits())
    }

    /// Processor privilege, 0 (most privileged) to 3
    #[must_use]
    pub const fn processor_privilege(self) -> u8 {
        ((self.bits() & Self::PROCESSOR_PRIVILEGE.bits()) >> (35 - 15)) as u8
    }

    /// Set both privilege bits in one step
    pub fn set_processor_privilege(&mut self, privilege: u8) {
        let field = (u64::from(privilege) & 0b11) << (35 - 15);
        *self = Self::from_bits_retain((self.bits() & !Self::PROCESSOR_PRIVILEGE.bits()) | field);
    }

    #[must_use]
    pub const fn addressing_mode(self) -> AddressingMode {
        if self.contains(Self::BASIC_MODE) {
            AddressingMode::Basic
        } else {
            AddressingMode::Extended
        }
    }

    #[must_use]
    pub const fn exec_register_set(self) -> bool {
        self.contains(Self::EXEC_REGISTER_SET)
    }

    #[must_use]
    pub const fn quarter_word_mode(self) -> bool {
        self.contains(Self::QUARTER_WORD_MODE)
    }

    /// 24-bit indexing is only honored in extended mode at privilege 0 or 1
    #[must_use]
    pub const fn uses_24bit_indexing(self) -> bool {
        self.contains(Self::EXECUTIVE_24BIT_INDEXING)
            && !self.contains(Self::BASIC_MODE)
            && self.processor_privilege() < 2
    }

    /// Replace the program designators with those found in `word`, leaving
    /// every other designator alone
    pub fn load_program_designators(&mut self, word: Word36) {
        let loaded = Self::from_bits_retain(word.bits()) & Self::PROGRAM_DESIGNATORS;
        *self = self.difference(Self::PROGRAM_DESIGNATORS).union(loaded);
    }

    #[must_use]
    pub const fn program_designators(self) -> Word36 {
        Word36::new(self.intersection(Self::PROGRAM_DESIGNATORS).bits())
    }
}

impl std::fmt::Debug for DesignatorRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DR({:012o})", self.bits())
    }
}

impl std::fmt::Display for DesignatorRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:012o} (pp={} {}{}{}{})",
            self.bits(),
            self.processor_privilege(),
            self.addressing_mode(),
            if self.exec_register_set() { " exec" } else { "" },
            if self.contains(Self::CARRY) { " carry" } else { "" },
            if self.contains(Self::OVERFLOW) { " overflow" } else { "" },
        )
    }
}
