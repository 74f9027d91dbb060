use crate::addressing::BankName;
use crate::word::{ones_complement_add, Word36};

/// Program Address Register: current bank name in H1, program counter in H2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgramAddressRegister(Word36);

impl ProgramAddressRegister {
    #[must_use]
    pub const fn new(bank: BankName, program_counter: u32) -> Self {
        Self(Word36::new((bank.bits() << 18) | (program_counter as u64 & 0o777_777)))
    }

    #[must_use]
    pub const fn from_word(word: Word36) -> Self {
        Self(word)
    }

    #[must_use]
    pub const fn word(self) -> Word36 {
        self.0
    }

    #[must_use]
    pub const fn bank_name(self) -> BankName {
        BankName::from_bits(self.0.h1())
    }

    pub fn set_bank_name(&mut self, bank: BankName) {
        self.0 = self.0.with_h1(bank.bits());
    }

    #[must_use]
    pub const fn program_counter(self) -> u32 {
        self.0.h2() as u32
    }

    pub fn set_program_counter(&mut self, program_counter: u32) {
        self.0 = self.0.with_h2(u64::from(program_counter));
    }

    /// Advance the program counter by `count` words, wrapping within 18 bits
    pub fn advance(&mut self, count: u32) {
        let next = (self.program_counter() + count) & 0o777_777;
        self.set_program_counter(next);
    }

    /// Add a signed displacement to the program counter
    pub fn displace(&mut self, displacement: i64) {
        let delta = Word36::from_i64(displacement).h2();
        let next = ones_complement_add(u64::from(self.program_counter()), delta, 18);
        self.set_program_counter(next as u32);
    }
}

impl std::fmt::Display for ProgramAddressRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:06o}", self.bank_name(), self.program_counter())
    }
}
