//! Instruction decoding and execution.
//!
//! Decoding walks static tables keyed by the function code, then by `j` or
//! `a` for the function codes that hold several instructions. Every
//! mnemonic declares the privilege it needs, the modes it exists in and the
//! kind of operand it takes.

use parse_display::Display;
use tracing::{debug, info};

use crate::instruction_word::{AddressingMode, InstructionWord, PartialWord};
use crate::interrupts::{InvalidInstructionReason, MachineInterrupt};
use crate::processor::Processor;
use crate::storage::Storage;

mod arithmetic;
mod bank;
mod jump;
mod load;
mod logical;
mod shift;
mod special;
mod store;

type Result<T> = std::result::Result<T, MachineInterrupt>;

#[allow(clippy::upper_case_acronyms)]
#[rustfmt::skip]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    // Loads
    LA, LNA, LMA, LNMA, LR, LX, LXM, LXI, LXLM, DL, DLN, DLM,
    // Stores
    SA, SNA, SMA, SR, SX, SZ, SNZ, SP1, SN1, SFS, SFZ, SAS, SAZ, DS,
    // Increments
    INC, DEC, INC2, DEC2, ADD1, SUB1, ENZ,
    // Arithmetic
    AA, ANA, AMA, ANMA, AU, ANU, AX, ANX, DA, DAN, AH, ANH, AT, ANT,
    MI, MSI, MF, DI, DSF, DF,
    // Logical
    OR, XOR, AND, MLU,
    // Shifts
    SSC, DSC, SSL, DSL, SSA, DSA, LSC, DLSC, LSSC, LDSC, LSSL, LDSL,
    // Tests
    TEP, TOP, TLEM, TZ, TNZ, TE, TNE, TLE, TG, TW, TNW, TP, TN,
    // Jumps
    J, JK, HLTJ, JZ, JNZ, JP, JN, JB, JNB, JO, JNO, JC, JNC, JDF, JNDF,
    JFO, JNFO, JFU, JNFU, JPS, JNS, JGD, JMGI, LMJ, SLJ, DJZ,
    // Addressing environment
    LBU, LBE, LBUD, LBED, SBU, LAE,
    // Processor state
    LD, SD, LPD, SPD, TS, TSS, TCS, ER, SGNL, UR, NOP, EX,
}

/// Addressing modes an instruction exists in
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display(style = "lowercase")]
pub enum ModeRequirement {
    Basic,
    Extended,
    Both,
}

impl ModeRequirement {
    const fn allows(self, mode: AddressingMode) -> bool {
        matches!(
            (self, mode),
            (Self::Both, _)
                | (Self::Basic, AddressingMode::Basic)
                | (Self::Extended, AddressingMode::Extended)
        )
    }
}

/// What the address part of an instruction designates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// No operand
    None,
    /// A partial word selected by j, immediate operands allowed
    Data,
    /// A partial word selected by j, immediates rejected
    Store,
    /// A full word, j being a minor function code
    Word,
    /// Several consecutive words
    Consecutive(usize),
    /// The operand address is a jump target
    Jump,
    /// The operand address is a shift count
    ShiftCount,
    /// The operand address itself is the value
    Immediate,
}

impl OperandKind {
    const fn has_partial_word(self) -> bool {
        matches!(self, Self::Data | Self::Store)
    }
}

/// Register designated by the a-field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    A,
    X,
    R,
    /// The a-field is a minor function code or unused
    None,
}

impl Mnemonic {
    /// Highest (least privileged) processor privilege allowed to execute this
    #[must_use]
    pub const fn privilege(self) -> u8 {
        match self {
            Self::LD | Self::UR | Self::LBUD | Self::LBED | Self::HLTJ => 0,
            Self::LBE => 1,
            _ => 3,
        }
    }

    #[must_use]
    pub const fn mode(self) -> ModeRequirement {
        match self {
            Self::SLJ | Self::ER | Self::JK => ModeRequirement::Basic,
            Self::SGNL
            | Self::LXLM
            | Self::LBU
            | Self::LBE
            | Self::LBUD
            | Self::LBED
            | Self::SBU
            | Self::LAE => ModeRequirement::Extended,
            _ => ModeRequirement::Both,
        }
    }

    #[must_use]
    pub const fn operand(self) -> OperandKind {
        use Mnemonic as M;
        match self {
            M::LA | M::LNA | M::LMA | M::LNMA | M::LR | M::LX | M::LXM | M::LXI
            | M::AA | M::ANA | M::AMA | M::ANMA | M::AU | M::ANU | M::AX | M::ANX
            | M::MI | M::MSI | M::MF | M::DI | M::DSF | M::DF
            | M::OR | M::XOR | M::AND | M::MLU
            | M::TEP | M::TOP | M::TLEM | M::TZ | M::TNZ | M::TE | M::TNE | M::TLE | M::TG
            | M::TW | M::TNW | M::TP | M::TN => OperandKind::Data,
            M::SA | M::SNA | M::SMA | M::SR | M::SX
            | M::SZ | M::SNZ | M::SP1 | M::SN1 | M::SFS | M::SFZ | M::SAS | M::SAZ
            | M::INC | M::DEC | M::INC2 | M::DEC2 | M::ADD1 | M::SUB1 | M::ENZ => {
                OperandKind::Store
            }
            M::DL | M::DLN | M::DLM | M::DS | M::DA | M::DAN | M::DLSC => {
                OperandKind::Consecutive(2)
            }
            M::UR => OperandKind::Consecutive(3),
            M::LBUD | M::LBED => OperandKind::Consecutive(4),
            M::LAE => OperandKind::Consecutive(15),
            M::SSC | M::DSC | M::SSL | M::DSL | M::SSA | M::DSA
            | M::LSSC | M::LDSC | M::LSSL | M::LDSL => OperandKind::ShiftCount,
            M::J | M::JK | M::HLTJ | M::JZ | M::JNZ | M::JP | M::JN | M::JB | M::JNB
            | M::JO | M::JNO | M::JC | M::JNC | M::JDF | M::JNDF | M::JFO | M::JNFO
            | M::JFU | M::JNFU | M::JPS | M::JNS | M::JGD | M::JMGI | M::LMJ | M::SLJ
            | M::DJZ => OperandKind::Jump,
            M::LPD | M::ER | M::SGNL => OperandKind::Immediate,
            M::NOP => OperandKind::None,
            M::LXLM | M::AH | M::ANH | M::AT | M::ANT | M::LSC | M::LBU | M::LBE | M::SBU
            | M::LD | M::SD | M::SPD | M::TS | M::TSS | M::TCS | M::EX => OperandKind::Word,
        }
    }

    #[must_use]
    pub const fn register(self) -> RegisterKind {
        use Mnemonic as M;
        match self {
            M::LR | M::SR => RegisterKind::R,
            M::LX | M::LXM | M::LXI | M::LXLM | M::SX | M::AX | M::ANX | M::TLEM
            | M::JMGI | M::LMJ => RegisterKind::X,
            M::SZ | M::SNZ | M::SP1 | M::SN1 | M::SFS | M::SFZ | M::SAS | M::SAZ
            | M::INC | M::DEC | M::INC2 | M::DEC2 | M::ADD1 | M::SUB1 | M::ENZ
            | M::J | M::JK | M::HLTJ | M::JO | M::JNO | M::JC | M::JNC | M::JDF | M::JNDF
            | M::JFO | M::JNFO | M::JFU | M::JNFU | M::JGD | M::SLJ | M::LPD | M::SPD
            | M::LD | M::SD | M::TS | M::TSS | M::TCS | M::ER | M::SGNL | M::UR | M::NOP
            | M::EX | M::LAE => RegisterKind::None,
            _ => RegisterKind::A,
        }
    }
}

#[derive(Clone, Copy)]
enum Decode {
    Undefined,
    Op(Mnemonic),
    ByJ(&'static [Decode; 16]),
    ByA(&'static [Decode; 16]),
}

use Decode::{ByA, ByJ, Op};
const NO: Decode = Decode::Undefined;

#[rustfmt::skip]
static FUNCTIONS: [Decode; 64] = {
    use Mnemonic as M;
    [
        // 000
        NO, Op(M::SA), Op(M::SNA), Op(M::SMA), Op(M::SR), ByA(&F005), Op(M::SX), ByJ(&F007),
        // 010
        Op(M::LA), Op(M::LNA), Op(M::LMA), Op(M::LNMA), Op(M::AA), Op(M::ANA), Op(M::AMA), Op(M::ANMA),
        // 020
        Op(M::AU), Op(M::ANU), NO, Op(M::LR), Op(M::AX), Op(M::ANX), Op(M::LXM), Op(M::LX),
        // 030
        Op(M::MI), Op(M::MSI), Op(M::MF), NO, Op(M::DI), Op(M::DSF), Op(M::DF), NO,
        // 040
        Op(M::OR), Op(M::XOR), Op(M::AND), Op(M::MLU), Op(M::TEP), Op(M::TOP), Op(M::LXI), Op(M::TLEM),
        // 050
        Op(M::TZ), Op(M::TNZ), Op(M::TE), Op(M::TNE), Op(M::TLE), Op(M::TG), Op(M::TW), Op(M::TNW),
        // 060
        Op(M::TP), Op(M::TN), NO, NO, NO, NO, NO, NO,
        // 070
        Op(M::JGD), ByJ(&F071), ByJ(&F072), ByJ(&F073), ByJ(&F074), ByJ(&F075), NO, NO,
    ]
};

#[rustfmt::skip]
static F005: [Decode; 16] = {
    use Mnemonic as M;
    [
        Op(M::SZ), Op(M::SNZ), Op(M::SP1), Op(M::SN1), Op(M::SFS), Op(M::SFZ), Op(M::SAS), Op(M::SAZ),
        Op(M::INC), Op(M::DEC), Op(M::INC2), Op(M::DEC2), Op(M::ENZ), Op(M::ADD1), Op(M::SUB1), NO,
    ]
};

#[rustfmt::skip]
static F007: [Decode; 16] = [
    NO, NO, NO, NO, NO, NO, NO, NO,
    NO, NO, NO, NO, Op(Mnemonic::LPD), Op(Mnemonic::SPD), NO, NO,
];

#[rustfmt::skip]
static F071: [Decode; 16] = {
    use Mnemonic as M;
    [
        NO, NO, NO, NO, NO, NO, NO, NO,
        Op(M::DA), Op(M::DAN), Op(M::DS), Op(M::DL), Op(M::DLN), Op(M::DLM), Op(M::DJZ), NO,
    ]
};

#[rustfmt::skip]
static F072: [Decode; 16] = {
    use Mnemonic as M;
    [
        NO, Op(M::SLJ), Op(M::JPS), Op(M::JNS), Op(M::AH), Op(M::ANH), Op(M::AT), Op(M::ANT),
        Op(M::EX), Op(M::ER), NO, NO, NO, NO, NO, NO,
    ]
};

#[rustfmt::skip]
static F073: [Decode; 16] = {
    use Mnemonic as M;
    [
        Op(M::SSC), Op(M::DSC), Op(M::SSL), Op(M::DSL), Op(M::SSA), Op(M::DSA), Op(M::LSC), Op(M::DLSC),
        Op(M::LSSC), Op(M::LDSC), Op(M::LSSL), Op(M::LDSL), ByA(&F073_14), ByA(&F073_15), NO, ByA(&F073_17),
    ]
};

#[rustfmt::skip]
static F073_14: [Decode; 16] = [
    Op(Mnemonic::NOP), NO, NO, NO, NO, NO, NO, NO,
    NO, NO, NO, NO, NO, NO, NO, NO,
];

#[rustfmt::skip]
static F073_15: [Decode; 16] = {
    use Mnemonic as M;
    [
        NO, NO, NO, NO, NO, NO, NO, NO,
        NO, NO, NO, NO, Op(M::LD), Op(M::SD), Op(M::UR), Op(M::SGNL),
    ]
};

#[rustfmt::skip]
static F073_17: [Decode; 16] = {
    use Mnemonic as M;
    [
        Op(M::TS), Op(M::TSS), Op(M::TCS), NO, NO, NO, NO, NO,
        NO, NO, NO, NO, NO, NO, NO, NO,
    ]
};

#[rustfmt::skip]
static F074: [Decode; 16] = {
    use Mnemonic as M;
    [
        Op(M::JZ), Op(M::JNZ), Op(M::JP), Op(M::JN), ByA(&F074_04), NO, NO, NO,
        Op(M::JNB), Op(M::JB), Op(M::JMGI), Op(M::LMJ), ByA(&F074_14), ByA(&F074_15), Op(M::JC), Op(M::JNC),
    ]
};

#[rustfmt::skip]
static F074_04: [Decode; 16] = {
    use Mnemonic as M;
    [
        Op(M::J), Op(M::JK), Op(M::JK), Op(M::JK), Op(M::JK), Op(M::JK), Op(M::JK), Op(M::JK),
        Op(M::JK), Op(M::JK), Op(M::JK), Op(M::JK), Op(M::JK), Op(M::JK), Op(M::JK), Op(M::JK),
    ]
};

#[rustfmt::skip]
static F074_14: [Decode; 16] = {
    use Mnemonic as M;
    [
        Op(M::JO), Op(M::JFU), Op(M::JFO), Op(M::JDF), NO, NO, NO, NO,
        NO, NO, NO, NO, NO, NO, NO, NO,
    ]
};

#[rustfmt::skip]
static F074_15: [Decode; 16] = {
    use Mnemonic as M;
    [
        Op(M::JNO), Op(M::JNFU), Op(M::JNFO), Op(M::JNDF), NO, Op(M::HLTJ), NO, NO,
        NO, NO, NO, NO, NO, NO, NO, NO,
    ]
};

#[rustfmt::skip]
static F075: [Decode; 16] = {
    use Mnemonic as M;
    [
        NO, NO, NO, Op(M::LBU), Op(M::SBU), Op(M::LBE), NO, Op(M::LBUD),
        Op(M::LBED), NO, Op(M::LAE), Op(M::LXLM), NO, NO, NO, NO,
    ]
};

/// Decode an instruction word in the given addressing mode. Returns `None`
/// for undefined function codes.
#[must_use]
pub fn decode(instruction: InstructionWord, mode: AddressingMode) -> Option<Mnemonic> {
    let mut entry = FUNCTIONS[usize::from(instruction.f())];
    loop {
        entry = match entry {
            Decode::Undefined => return None,
            Op(mnemonic) => {
                return mnemonic.mode().allows(mode).then_some(mnemonic);
            }
            ByJ(table) => table[usize::from(instruction.j())],
            ByA(table) => table[usize::from(instruction.a())],
        };
    }
}

/// Decode and execute one instruction.
///
/// The privilege check happens before anything is read or written.
#[tracing::instrument(skip(processor), level = "debug")]
pub(crate) fn dispatch<S: Storage>(
    processor: &mut Processor<S>,
    instruction: InstructionWord,
) -> Result<()> {
    let mode = processor.designators.addressing_mode();
    let mnemonic = decode(instruction, mode).ok_or(MachineInterrupt::invalid_instruction(
        InvalidInstructionReason::UndefinedFunctionCode,
    ))?;

    let privilege = processor.designators.processor_privilege();
    if privilege > mnemonic.privilege() {
        debug!(%mnemonic, privilege, required = mnemonic.privilege(), "privileged instruction");
        return Err(MachineInterrupt::invalid_instruction(
            InvalidInstructionReason::InvalidProcessorPrivilege,
        ));
    }

    info!(
        address = format_args!("{:06o}", processor.current_address()),
        "Executing instruction \"{}\"",
        Disassembly::new(instruction, mode, processor.designators.quarter_word_mode())
    );
    execute(processor, mnemonic, instruction)
}

fn execute<S: Storage>(
    processor: &mut Processor<S>,
    mnemonic: Mnemonic,
    instruction: InstructionWord,
) -> Result<()> {
    use Mnemonic as M;
    let p = processor;
    let i = instruction;
    match mnemonic {
        M::LA => load::load_a(p, i, |w| w),
        M::LNA => load::load_a(p, i, crate::word::Word36::negate),
        M::LMA => load::load_a(p, i, crate::word::Word36::magnitude),
        M::LNMA => load::load_a(p, i, |w| w.magnitude().negate()),
        M::LR => load::load_r(p, i),
        M::LX => load::load_x(p, i),
        M::LXM => load::load_x_modifier(p, i, false),
        M::LXLM => load::load_x_modifier(p, i, true),
        M::LXI => load::load_x_increment(p, i),
        M::DL => load::load_double(p, i, |d| d),
        M::DLN => load::load_double(p, i, crate::word::DoubleWord72::negate),
        M::DLM => load::load_double(p, i, crate::word::DoubleWord72::magnitude),

        M::SA => store::store_a(p, i, |w| w),
        M::SNA => store::store_a(p, i, crate::word::Word36::negate),
        M::SMA => store::store_a(p, i, crate::word::Word36::magnitude),
        M::SR => store::store_r(p, i),
        M::SX => store::store_x(p, i),
        M::SZ => store::store_constant(p, i, store::POSITIVE_ZERO),
        M::SNZ => store::store_constant(p, i, store::NEGATIVE_ZERO),
        M::SP1 => store::store_constant(p, i, store::POSITIVE_ONE),
        M::SN1 => store::store_constant(p, i, store::NEGATIVE_ONE),
        M::SFS => store::store_constant(p, i, store::FIELDATA_SPACES),
        M::SFZ => store::store_constant(p, i, store::FIELDATA_ZEROES),
        M::SAS => store::store_constant(p, i, store::ASCII_SPACES),
        M::SAZ => store::store_constant(p, i, store::ASCII_ZEROES),
        M::DS => store::store_double(p, i),
        M::INC => store::increment(p, i, 1, true),
        M::DEC => store::increment(p, i, -1, true),
        M::INC2 => store::increment(p, i, 2, true),
        M::DEC2 => store::increment(p, i, -2, true),
        M::ADD1 => store::increment(p, i, 1, false),
        M::SUB1 => store::increment(p, i, -1, false),
        M::ENZ => store::eliminate_negative_zero(p, i),

        M::AA => arithmetic::add_a(p, i, false, false),
        M::ANA => arithmetic::add_a(p, i, true, false),
        M::AMA => arithmetic::add_a(p, i, false, true),
        M::ANMA => arithmetic::add_a(p, i, true, true),
        M::AU => arithmetic::add_upper(p, i, false),
        M::ANU => arithmetic::add_upper(p, i, true),
        M::AX => arithmetic::add_x(p, i, false),
        M::ANX => arithmetic::add_x(p, i, true),
        M::DA => arithmetic::add_double(p, i, false),
        M::DAN => arithmetic::add_double(p, i, true),
        M::AH => arithmetic::add_fields(p, i, false, arithmetic::HALVES),
        M::ANH => arithmetic::add_fields(p, i, true, arithmetic::HALVES),
        M::AT => arithmetic::add_fields(p, i, false, arithmetic::THIRDS),
        M::ANT => arithmetic::add_fields(p, i, true, arithmetic::THIRDS),
        M::MI => arithmetic::multiply_integer(p, i),
        M::MSI => arithmetic::multiply_single_integer(p, i),
        M::MF => arithmetic::multiply_fractional(p, i),
        M::DI => arithmetic::divide_integer(p, i),
        M::DSF => arithmetic::divide_single_fractional(p, i),
        M::DF => arithmetic::divide_fractional(p, i),

        M::OR => logical::logical(p, i, |a, b| a | b),
        M::XOR => logical::logical(p, i, |a, b| a ^ b),
        M::AND => logical::logical(p, i, |a, b| a & b),
        M::MLU => logical::masked_load_upper(p, i),

        M::SSC => shift::single(p, i, crate::word::Word36::shift_right_circular),
        M::SSL => shift::single(p, i, crate::word::Word36::shift_right_logical),
        M::SSA => shift::single(p, i, crate::word::Word36::shift_right_algebraic),
        M::LSSC => shift::single(p, i, crate::word::Word36::shift_left_circular),
        M::LSSL => shift::single(p, i, crate::word::Word36::shift_left_logical),
        M::DSC => shift::double(p, i, crate::word::DoubleWord72::shift_right_circular),
        M::DSL => shift::double(p, i, crate::word::DoubleWord72::shift_right_logical),
        M::DSA => shift::double(p, i, crate::word::DoubleWord72::shift_right_algebraic),
        M::LDSC => shift::double(p, i, crate::word::DoubleWord72::shift_left_circular),
        M::LDSL => shift::double(p, i, crate::word::DoubleWord72::shift_left_logical),
        M::LSC => shift::load_shift_and_count(p, i),
        M::DLSC => shift::double_load_shift_and_count(p, i),

        M::TEP => test::test_parity(p, i, true),
        M::TOP => test::test_parity(p, i, false),
        M::TLEM => test::test_less_or_equal_modifier(p, i),
        M::TZ => test::skip_if(p, i, |op, _| op.is_zero()),
        M::TNZ => test::skip_if(p, i, |op, _| !op.is_zero()),
        M::TE => test::skip_if(p, i, |op, a| op == a),
        M::TNE => test::skip_if(p, i, |op, a| op != a),
        M::TLE => test::skip_if(p, i, |op, a| op.compare(a).is_le()),
        M::TG => test::skip_if(p, i, |op, a| op.compare(a).is_gt()),
        M::TP => test::skip_if(p, i, |op, _| !op.is_negative()),
        M::TN => test::skip_if(p, i, |op, _| op.is_negative()),
        M::TW => test::test_within_range(p, i, true),
        M::TNW => test::test_within_range(p, i, false),

        M::J => jump::jump_if(p, i, true),
        // Jump keys are not modelled, none is ever set
        M::JK => jump::jump_if(p, i, false),
        M::HLTJ => jump::halt_and_jump(p, i),
        M::JZ => jump::jump_on_a(p, i, crate::word::Word36::is_zero),
        M::JNZ => jump::jump_on_a(p, i, |a| !a.is_zero()),
        M::JP => jump::jump_on_a(p, i, |a| !a.is_negative()),
        M::JN => jump::jump_on_a(p, i, crate::word::Word36::is_negative),
        M::JB => jump::jump_on_a(p, i, |a| a.bit(35)),
        M::JNB => jump::jump_on_a(p, i, |a| !a.bit(35)),
        M::JO => jump::jump_on_designator(p, i, jump::Designator::Overflow, true),
        M::JNO => jump::jump_on_designator(p, i, jump::Designator::Overflow, false),
        M::JC => jump::jump_on_designator(p, i, jump::Designator::Carry, true),
        M::JNC => jump::jump_on_designator(p, i, jump::Designator::Carry, false),
        M::JDF => jump::jump_on_designator(p, i, jump::Designator::DivideCheck, true),
        M::JNDF => jump::jump_on_designator(p, i, jump::Designator::DivideCheck, false),
        M::JFO => jump::jump_on_designator(p, i, jump::Designator::CharacteristicOverflow, true),
        M::JNFO => {
            jump::jump_on_designator(p, i, jump::Designator::CharacteristicOverflow, false)
        }
        M::JFU => {
            jump::jump_on_designator(p, i, jump::Designator::CharacteristicUnderflow, true)
        }
        M::JNFU => {
            jump::jump_on_designator(p, i, jump::Designator::CharacteristicUnderflow, false)
        }
        M::JPS => jump::jump_and_shift(p, i, false),
        M::JNS => jump::jump_and_shift(p, i, true),
        M::JGD => jump::jump_greater_and_decrement(p, i),
        M::JMGI => jump::jump_modifier_greater_and_increment(p, i),
        M::LMJ => jump::load_modifier_and_jump(p, i),
        M::SLJ => jump::store_location_and_jump(p, i),
        M::DJZ => jump::double_jump_zero(p, i),

        M::LBU => bank::load_bank_user(p, i),
        M::LBE => bank::load_bank_exec(p, i),
        M::LBUD => bank::load_base_register_direct(p, i, false),
        M::LBED => bank::load_base_register_direct(p, i, true),
        M::SBU => bank::store_bank_user(p, i),
        M::LAE => bank::load_addressing_environment(p, i),

        M::LD => special::load_designators(p, i),
        M::SD => special::store_designators(p, i),
        M::LPD => special::load_program_designators(p, i),
        M::SPD => special::store_program_designators(p, i),
        M::TS => special::test_and_set(p, i, special::TestAndSet::Interrupt),
        M::TSS => special::test_and_set(p, i, special::TestAndSet::Skip),
        M::TCS => special::test_and_clear(p, i),
        M::ER => special::signal(p, i, crate::interrupts::SignalKind::ExecutiveRequest),
        M::SGNL => special::signal(p, i, crate::interrupts::SignalKind::Signal),
        M::UR => special::user_return(p, i),
        M::NOP => Ok(()),
        M::EX => special::execute_remote(p, i),
    }
}

/// Assembler-like rendering of an instruction word
#[derive(Debug, Clone, Copy)]
pub struct Disassembly {
    instruction: InstructionWord,
    mode: AddressingMode,
    quarter_word_mode: bool,
}

impl Disassembly {
    #[must_use]
    pub const fn new(
        instruction: InstructionWord,
        mode: AddressingMode,
        quarter_word_mode: bool,
    ) -> Self {
        Self {
            instruction,
            mode,
            quarter_word_mode,
        }
    }
}

impl std::fmt::Display for Disassembly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let i = self.instruction;
        let Some(mnemonic) = decode(i, self.mode) else {
            return write!(f, "+{}", i.word());
        };

        let mut opcode = mnemonic.to_string();
        let partial = i.partial_word(self.quarter_word_mode);
        if mnemonic.operand().has_partial_word() && partial != PartialWord::W {
            opcode = format!("{opcode},{partial}");
        }

        let mut operands = Vec::new();
        match mnemonic.register() {
            RegisterKind::A => operands.push(format!("A{}", i.a())),
            RegisterKind::X => operands.push(format!("X{}", i.a())),
            RegisterKind::R => operands.push(format!("R{}", i.a())),
            RegisterKind::None => {}
        }
        if mnemonic == Mnemonic::JGD {
            operands.push(format!("{:03o}", (i.j() << 4) | i.a()));
        }

        if mnemonic.operand() != OperandKind::None {
            match self.mode {
                AddressingMode::Basic => operands.push(format!("{:o}", i.u())),
                AddressingMode::Extended => operands.push(format!("{:o}", i.d())),
            }
            if i.x() != 0 {
                let star = if i.h() { "*" } else { "" };
                operands.push(format!("{star}X{}", i.x()));
            }
            match self.mode {
                AddressingMode::Basic if i.i() => operands.push("*".to_owned()),
                AddressingMode::Extended if i.i() => operands.push(format!("B{}", 16 + i.b())),
                AddressingMode::Extended if i.b() != 0 => operands.push(format!("B{}", i.b())),
                _ => {}
            }
        }

        if operands.is_empty() {
            write!(f, "{opcode}")
        } else {
            write!(f, "{opcode:<8}{}", operands.join(","))
        }
    }
}
