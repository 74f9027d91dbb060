//! Decoding of instruction words.
//!
//! ```text
//!  0     5 6   9 10 13 14 17 18 19 20                   35
//! +-------+-----+-----+-----+--+--+-----------------------+
//! |   f   |  j  |  a  |  x  |h |i |           u           |  basic mode
//! +-------+-----+-----+-----+--+--+-----+-----------------+
//! |   f   |  j  |  a  |  x  |h |i |  b  |        d        |  extended mode
//! +-------+-----+-----+-----+--+--+-----+-----------------+
//! ```

use parse_display::Display;

use crate::word::{Field, Word36};

/// Which of the two field layouts an instruction is decoded with
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display(style = "lowercase")]
pub enum AddressingMode {
    Basic,
    Extended,
}

/// Partial-word transfer selected by the j-field of a load or store
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartialWord {
    W,
    H2,
    H1,
    XH2,
    XH1,
    Q2,
    XT3,
    Q4,
    XT2,
    Q3,
    XT1,
    Q1,
    S6,
    S5,
    S4,
    S3,
    S2,
    S1,
    /// Immediate operand, the 18-bit `hiu` field (or `u` alone with indexing)
    U,
    /// Sign-extended immediate operand
    XU,
}

impl PartialWord {
    /// Partial word selected by `j`; quarter-word mode changes the meaning of 4–7
    #[must_use]
    pub const fn from_j(j: u8, quarter_word_mode: bool) -> Self {
        match (j, quarter_word_mode) {
            (0, _) => Self::W,
            (1, _) => Self::H2,
            (2, _) => Self::H1,
            (3, _) => Self::XH2,
            (4, false) => Self::XH1,
            (4, true) => Self::Q2,
            (5, false) => Self::XT3,
            (5, true) => Self::Q4,
            (6, false) => Self::XT2,
            (6, true) => Self::Q3,
            (7, false) => Self::XT1,
            (7, true) => Self::Q1,
            (0o10, _) => Self::S6,
            (0o11, _) => Self::S5,
            (0o12, _) => Self::S4,
            (0o13, _) => Self::S3,
            (0o14, _) => Self::S2,
            (0o15, _) => Self::S1,
            (0o16, _) => Self::U,
            _ => Self::XU,
        }
    }

    /// The storage field this partial word covers, `None` for immediates
    #[must_use]
    pub const fn field(self) -> Option<Field> {
        Some(match self {
            Self::W => Field::W,
            Self::H1 | Self::XH1 => Field::H1,
            Self::H2 | Self::XH2 => Field::H2,
            Self::XT1 => Field::T1,
            Self::XT2 => Field::T2,
            Self::XT3 => Field::T3,
            Self::Q1 => Field::Q1,
            Self::Q2 => Field::Q2,
            Self::Q3 => Field::Q3,
            Self::Q4 => Field::Q4,
            Self::S1 => Field::S1,
            Self::S2 => Field::S2,
            Self::S3 => Field::S3,
            Self::S4 => Field::S4,
            Self::S5 => Field::S5,
            Self::S6 => Field::S6,
            Self::U | Self::XU => return None,
        })
    }

    #[must_use]
    pub const fn is_sign_extended(self) -> bool {
        matches!(
            self,
            Self::XH1 | Self::XH2 | Self::XT1 | Self::XT2 | Self::XT3 | Self::XU
        )
    }

    #[must_use]
    pub const fn is_immediate(self) -> bool {
        matches!(self, Self::U | Self::XU)
    }

    /// Extract the selected part of a word, right-justified and sign-extended
    /// where the designator calls for it.
    #[must_use]
    pub const fn extract(self, word: Word36) -> Word36 {
        match self.field() {
            Some(field) if self.is_sign_extended() => word.get_extended(field),
            Some(field) => Word36::new(word.get(field)),
            None => word,
        }
    }

    /// Merge `value` into `target` according to this partial word.
    ///
    /// Returns `None` for the immediate designators, which cannot be stored.
    #[must_use]
    pub const fn inject(self, target: Word36, value: Word36) -> Option<Word36> {
        match self.field() {
            Some(field) => Some(target.with(field, value.bits())),
            None => None,
        }
    }
}

/// A decoded instruction word
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InstructionWord(Word36);

impl InstructionWord {
    #[must_use]
    pub const fn new(word: Word36) -> Self {
        Self(word)
    }

    /// Assemble a basic-mode instruction
    #[must_use]
    pub const fn basic(f: u8, j: u8, a: u8, x: u8, h: bool, i: bool, u: u16) -> Self {
        let bits = ((f as u64 & 0o77) << 30)
            | ((j as u64 & 0o17) << 26)
            | ((a as u64 & 0o17) << 22)
            | ((x as u64 & 0o17) << 18)
            | ((h as u64) << 17)
            | ((i as u64) << 16)
            | (u as u64);
        Self(Word36::new(bits))
    }

    /// Assemble an extended-mode instruction
    #[must_use]
    pub const fn extended(f: u8, j: u8, a: u8, x: u8, h: bool, i: bool, b: u8, d: u16) -> Self {
        let u = ((b as u16 & 0o17) << 12) | (d & 0o7777);
        Self::basic(f, j, a, x, h, i, u)
    }

    #[must_use]
    pub const fn word(self) -> Word36 {
        self.0
    }

    /// Function code, bits 0–5
    #[must_use]
    pub const fn f(self) -> u8 {
        self.0.s1() as u8
    }

    /// Partial-word or minor function designator, bits 6–9
    #[must_use]
    pub const fn j(self) -> u8 {
        ((self.0.bits() >> 26) & 0o17) as u8
    }

    /// Register (or minor function) designator, bits 10–13
    #[must_use]
    pub const fn a(self) -> u8 {
        ((self.0.bits() >> 22) & 0o17) as u8
    }

    /// Index register designator, bits 14–17
    #[must_use]
    pub const fn x(self) -> u8 {
        ((self.0.bits() >> 18) & 0o17) as u8
    }

    /// Index increment designator, bit 18
    #[must_use]
    pub const fn h(self) -> bool {
        self.0.bit(18)
    }

    /// Indirect (basic) or base-register-bank (extended) designator, bit 19
    #[must_use]
    pub const fn i(self) -> bool {
        self.0.bit(19)
    }

    /// Address field, bits 20–35 (basic mode)
    #[must_use]
    pub const fn u(self) -> u16 {
        (self.0.bits() & 0o177_777) as u16
    }

    /// Bits 18–35, used as an 18-bit immediate operand
    #[must_use]
    pub const fn hiu(self) -> u32 {
        self.0.h2() as u32
    }

    /// Base register designator, bits 20–23 (extended mode)
    #[must_use]
    pub const fn b(self) -> u8 {
        ((self.0.bits() >> 12) & 0o17) as u8
    }

    /// Displacement, bits 24–35 (extended mode)
    #[must_use]
    pub const fn d(self) -> u16 {
        (self.0.bits() & 0o7777) as u16
    }

    /// Address field under the given layout: `u` in basic mode, `d` in extended mode
    #[must_use]
    pub const fn address_field(self, mode: AddressingMode) -> u16 {
        match mode {
            AddressingMode::Basic => self.u(),
            AddressingMode::Extended => self.d(),
        }
    }

    /// Partial-word designator carried by `j`
    #[must_use]
    pub const fn partial_word(self, quarter_word_mode: bool) -> PartialWord {
        PartialWord::from_j(self.j(), quarter_word_mode)
    }

    /// Copy of the instruction with its `a` field replaced
    #[must_use]
    pub const fn with_a(self, a: u8) -> Self {
        let bits = (self.0.bits() & !(0o17 << 22)) | ((a as u64 & 0o17) << 22);
        Self(Word36::new(bits))
    }
}

impl From<Word36> for InstructionWord {
    fn from(word: Word36) -> Self {
        Self(word)
    }
}

impl std::fmt::Debug for InstructionWord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "InstructionWord {{ f: {:02o}, j: {:02o}, a: {:02o}, x: {:02o}, h: {}, i: {}, u: {:06o} }}",
            self.f(),
            self.j(),
            self.a(),
            self.x(),
            u8::from(self.h()),
            u8::from(self.i()),
            self.u()
        )
    }
}

impl std::fmt::Display for InstructionWord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}
