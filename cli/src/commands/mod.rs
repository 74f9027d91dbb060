mod completion;
mod decode;
mod run;

#[derive(clap::Subcommand, Debug)]
pub enum Subcommand {
    /// Load an octal image and run it until the processor halts
    Run(self::run::RunOpt),

    /// Disassemble instruction words
    Decode(self::decode::DecodeOpt),

    /// Generate shell completions
    Completion(self::completion::CompletionOpt),
}

impl Subcommand {
    /// Run a subcommand
    pub fn exec(self) -> anyhow::Result<()> {
        match self {
            Self::Run(opt) => opt.exec(),
            Self::Decode(opt) => opt.exec(),
            Self::Completion(opt) => opt.exec(),
        }
    }
}

/// An octal number, with or without a leading `0o`
fn parse_octal(input: &str) -> Result<u64, String> {
    let digits = input.strip_prefix("0o").unwrap_or(input);
    u64::from_str_radix(digits, 8).map_err(|e| format!("invalid octal number {input:?}: {e}"))
}
