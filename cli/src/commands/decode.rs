use clap::{ArgAction, Parser};
use ip36_emulator::{word::MASK36, AddressingMode, Disassembly, InstructionWord, Word36};

use super::parse_octal;

fn parse_word(input: &str) -> Result<Word36, String> {
    let bits = parse_octal(input)?;
    if bits > MASK36 {
        return Err(format!("{input} does not fit in 36 bits"));
    }
    Ok(Word36::new(bits))
}

#[derive(Parser, Debug)]
pub struct DecodeOpt {
    /// Instruction words, in octal
    #[clap(value_parser = parse_word, required = true)]
    words: Vec<Word36>,

    /// Decode in basic mode instead of extended mode
    #[clap(short, long, action = ArgAction::SetTrue)]
    basic: bool,

    /// Interpret j as a quarter-word designator
    #[clap(short, long, action = ArgAction::SetTrue)]
    quarter_word: bool,
}

impl DecodeOpt {
    #[allow(clippy::unnecessary_wraps)]
    pub fn exec(&self) -> anyhow::Result<()> {
        let mode = if self.basic {
            AddressingMode::Basic
        } else {
            AddressingMode::Extended
        };

        for word in &self.words {
            let disassembly = Disassembly::new(InstructionWord::from(*word), mode, self.quarter_word);
            println!("{word}  {disassembly}");
        }
        Ok(())
    }
}
