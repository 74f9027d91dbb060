use std::process::exit;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, ValueHint};
use ip36_emulator::{Image, Processor, ProcessorConfig};
use tracing::{debug, info, warn};

use super::parse_octal;

#[derive(Parser, Debug)]
pub struct RunOpt {
    /// Octal image to load
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// Program counter of the first instruction, in octal
    #[clap(short, long, value_parser = parse_octal, default_value = "1000")]
    entry_point: u64,

    /// Start in basic mode instead of extended mode
    #[clap(short, long, action = ArgAction::SetTrue)]
    basic: bool,

    /// Processor privilege to start at
    #[clap(short, long, value_parser = clap::value_parser!(u8).range(0..=3), default_value = "0")]
    privilege: u8,

    /// Words of main storage, in octal
    #[clap(long, value_parser = parse_octal)]
    storage_size: Option<u64>,

    /// Stop after this many steps even if the processor did not halt
    #[clap(short, long, value_parser)]
    max_steps: Option<usize>,
}

impl RunOpt {
    fn config(&self) -> anyhow::Result<ProcessorConfig> {
        let mut config = if self.basic {
            ProcessorConfig::basic_mode()
        } else {
            ProcessorConfig::default()
        };
        if let Some(size) = self.storage_size {
            config = config.with_storage_size(usize::try_from(size)?);
        }
        let entry_point = u32::try_from(self.entry_point).context("entry point is too large")?;
        Ok(config
            .with_privilege(self.privilege)
            .with_entry_point(entry_point))
    }

    pub fn exec(self) -> anyhow::Result<()> {
        info!(path = %self.input, "Reading image");
        let source = std::fs::read_to_string(&self.input)
            .with_context(|| format!("could not read {}", self.input))?;

        let image = match Image::parse(&source) {
            Ok(image) => image,
            Err(e) => {
                let report = miette::Report::new(e)
                    .with_source_code(miette::NamedSource::new(self.input.as_str(), source));
                eprintln!("{report:?}");
                exit(1);
            }
        };

        let config = self.config()?;
        debug!(?config, "Building processor");
        let mut processor = Processor::new(&config);
        let words = image
            .load_into(&mut processor)
            .context("could not load image")?;
        info!(words, segments = image.segments.len(), "Image loaded");

        info!(mode = %config.addressing_mode, entry_point = format_args!("{:o}", config.entry_point), "Running");
        match self.max_steps {
            Some(limit) => {
                if processor.run_steps(limit)?.is_none() {
                    warn!(limit, "processor did not halt");
                }
            }
            None => {
                processor.run()?;
            }
        }

        info!(cycles = processor.cycles, "End of program");
        println!("{processor}");
        Ok(())
    }
}
