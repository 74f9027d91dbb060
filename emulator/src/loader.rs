//! Octal word images.
//!
//! An image is a text file of lines like `001000: 100160000005 740040001000`:
//! an octal address followed by the octal words stored from that address on.
//! Everything after a `#` is a comment and blank lines are ignored.

#![allow(
    unused_assignments,
    reason = "the miette Diagnostic derive generates this"
)]

use miette::{Diagnostic, SourceOffset, SourceSpan};
use nom::{
    character::complete::{char, oct_digit1, space0, space1},
    combinator::{all_consuming, opt, rest},
    multi::separated_list0,
    sequence::{pair, preceded, terminated},
    IResult, Offset,
};
use thiserror::Error;
use tracing::debug;

use crate::constants as C;
use crate::processor::Processor;
use crate::storage::{Storage, StorageError};
use crate::word::{Word36, MASK36};

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("invalid syntax on line {line}")]
    #[diagnostic(
        code(ip36::image::syntax),
        help("lines look like `address: word word ...`, in octal")
    )]
    Syntax {
        line: usize,
        #[label("here")]
        span: SourceOffset,
    },

    #[error("{text} on line {line} does not fit in 36 bits")]
    #[diagnostic(code(ip36::image::range))]
    WordOutOfRange {
        line: usize,
        text: String,
        #[label("too large")]
        span: SourceSpan,
    },

    #[error("image does not fit in storage")]
    #[diagnostic(code(ip36::image::storage))]
    Storage(#[from] StorageError),
}

/// Consecutive words starting at an address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub address: C::Address,
    pub words: Vec<Word36>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Image {
    pub segments: Vec<Segment>,
}

fn comment(input: &str) -> IResult<&str, &str> {
    preceded(char('#'), rest)(input)
}

/// `address: word word ...`, words kept as text so that range errors can
/// point at them
fn data_line(input: &str) -> IResult<&str, Option<(&str, Vec<&str>)>> {
    let entry = pair(
        terminated(oct_digit1, char(':')),
        preceded(space0, separated_list0(space1, oct_digit1)),
    );
    preceded(space0, terminated(opt(entry), pair(space0, opt(comment))))(input)
}

fn parse_octal(text: &str) -> Option<u64> {
    u64::from_str_radix(text, 8)
        .ok()
        .filter(|value| *value <= MASK36)
}

impl Image {
    /// Parse an image.
    ///
    /// # Errors
    ///
    /// A [`LoadError`] pointing at the first offending line.
    pub fn parse(source: &str) -> Result<Self, LoadError> {
        let mut segments = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let line_number = index + 1;
            let base = source.offset(line);
            let entry = match all_consuming(data_line)(line) {
                Ok((_, entry)) => entry,
                Err(nom::Err::Error(error) | nom::Err::Failure(error)) => {
                    return Err(LoadError::Syntax {
                        line: line_number,
                        span: (base + line.offset(error.input)).into(),
                    });
                }
                Err(nom::Err::Incomplete(_)) => {
                    return Err(LoadError::Syntax {
                        line: line_number,
                        span: (base + line.len()).into(),
                    });
                }
            };

            let Some((address, words)) = entry else {
                continue;
            };
            let range_error = |text: &str| LoadError::WordOutOfRange {
                line: line_number,
                text: text.to_owned(),
                span: (base + line.offset(text), text.len()).into(),
            };

            let address = parse_octal(address).ok_or_else(|| range_error(address))?;
            let words = words
                .into_iter()
                .map(|text| parse_octal(text).map(Word36::new).ok_or_else(|| range_error(text)))
                .collect::<Result<Vec<_>, _>>()?;
            segments.push(Segment { address, words });
        }

        Ok(Self { segments })
    }

    /// Number of words in the image
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.iter().map(|segment| segment.words.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the image into the main storage of a processor.
    ///
    /// # Errors
    ///
    /// Fails if a word falls outside storage. Words before it are written.
    pub fn load_into<S: Storage>(&self, processor: &mut Processor<S>) -> Result<usize, LoadError> {
        for segment in &self.segments {
            debug!(
                address = format_args!("{:06o}", segment.address),
                words = segment.words.len(),
                "loading segment"
            );
            for (address, word) in (segment.address..).zip(&segment.words) {
                processor.write_absolute(address, *word)?;
            }
        }
        Ok(self.len())
    }
}

impl std::str::FromStr for Image {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
