use parse_display::Display;

use crate::addressing::AccessInfo;
use crate::word::Word36;

/// Where an instruction was when an interrupt was taken (IKR bits 6–8)
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default)]
#[display(style = "kebab-case")]
pub enum MidInstruction {
    #[default]
    BetweenInstructions,
    MidExecution,
    IndirectExecute,
}

impl MidInstruction {
    #[must_use]
    pub const fn code(self) -> u64 {
        match self {
            Self::BetweenInstructions => 0,
            Self::MidExecution => 1,
            Self::IndirectExecute => 2,
        }
    }

    #[must_use]
    pub const fn from_code(code: u64) -> Self {
        match code {
            1 => Self::MidExecution,
            2 => Self::IndirectExecute,
            _ => Self::BetweenInstructions,
        }
    }
}

/// Interrupt status and access key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndicatorKeyRegister(Word36);

impl IndicatorKeyRegister {
    #[must_use]
    pub const fn from_word(word: Word36) -> Self {
        Self(word)
    }

    #[must_use]
    pub const fn word(self) -> Word36 {
        self.0
    }

    #[must_use]
    pub const fn short_status_field(self) -> u8 {
        self.0.s1() as u8
    }

    pub fn set_short_status_field(&mut self, value: u8) {
        self.0 = self.0.with_s1(u64::from(value));
    }

    #[must_use]
    pub const fn mid_instruction(self) -> MidInstruction {
        MidInstruction::from_code((self.0.bits() >> 27) & 0o7)
    }

    pub fn set_mid_instruction(&mut self, mid: MidInstruction) {
        let bits = (self.0.bits() & !(0o7 << 27)) | (mid.code() << 27);
        self.0 = Word36::new(bits);
    }

    /// Pending-interrupt information, bits 9–11
    #[must_use]
    pub const fn pending_interrupt_information(self) -> u8 {
        ((self.0.bits() >> 24) & 0o7) as u8
    }

    pub fn set_pending_interrupt_information(&mut self, value: u8) {
        let bits = (self.0.bits() & !(0o7 << 24)) | ((u64::from(value) & 0o7) << 24);
        self.0 = Word36::new(bits);
    }

    #[must_use]
    pub const fn interrupt_class(self) -> u8 {
        self.0.s3() as u8
    }

    pub fn set_interrupt_class(&mut self, class: u8) {
        self.0 = self.0.with_s3(u64::from(class));
    }

    #[must_use]
    pub const fn access_key(self) -> AccessInfo {
        AccessInfo::from_bits(self.0.h2())
    }

    pub fn set_access_key(&mut self, key: AccessInfo) {
        self.0 = self.0.with_h2(key.bits());
    }
}

impl std::fmt::Display for IndicatorKeyRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (ssf={:02o} class={:02o} {} key={})",
            self.0,
            self.short_status_field(),
            self.interrupt_class(),
            self.mid_instruction(),
            self.access_key()
        )
    }
}
