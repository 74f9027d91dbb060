//! Word-addressed storage units.
//!
//! The processor only ever reads and writes single words at absolute
//! addresses. Block transfers are sequences of such accesses, performed in
//! ascending address order.

use thiserror::Error;
use tracing::debug;

use crate::addressing::AbsoluteAddress;
use crate::constants as C;
use crate::word::Word36;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The given address is outside the storage unit
    #[error("invalid address {0}")]
    InvalidAddress(AbsoluteAddress),

    /// No storage unit answers to this UPI
    #[error("unknown storage unit {0}")]
    UnknownUnit(u32),
}

/// A storage collaborator
pub trait Storage {
    /// Read one word
    ///
    /// # Errors
    ///
    /// Fails if the address is invalid or out of bounds.
    fn read(&self, address: AbsoluteAddress) -> Result<Word36, StorageError>;

    /// Write one word
    ///
    /// # Errors
    ///
    /// Fails if the address is invalid or out of bounds.
    fn write(&mut self, address: AbsoluteAddress, word: Word36) -> Result<(), StorageError>;

    /// Read `N` consecutive words, lowest address first
    ///
    /// # Errors
    ///
    /// Fails on the first invalid address; earlier reads have no side effect.
    fn read_block<const N: usize>(
        &self,
        address: AbsoluteAddress,
    ) -> Result<[Word36; N], StorageError>
    where
        Self: Sized,
    {
        let mut words = [Word36::POSITIVE_ZERO; N];
        for (offset, word) in (0..).zip(words.iter_mut()) {
            *word = self.read(address.add(offset))?;
        }
        Ok(words)
    }

    /// Read `count` consecutive words, lowest address first
    ///
    /// # Errors
    ///
    /// Fails on the first invalid address.
    fn read_consecutive(
        &self,
        address: AbsoluteAddress,
        count: usize,
    ) -> Result<Vec<Word36>, StorageError> {
        (0..count as u64)
            .map(|offset| self.read(address.add(offset)))
            .collect()
    }

    /// Write consecutive words, lowest address first
    ///
    /// # Errors
    ///
    /// Fails on the first invalid address; the words before it are already written.
    fn write_consecutive(
        &mut self,
        address: AbsoluteAddress,
        words: &[Word36],
    ) -> Result<(), StorageError> {
        for (offset, word) in (0..).zip(words) {
            self.write(address.add(offset), *word)?;
        }
        Ok(())
    }
}

/// A single in-memory storage unit
#[derive(Clone, PartialEq, Eq)]
pub struct MainStorage {
    upi: u32,
    words: Vec<Word36>,
}

impl Default for MainStorage {
    fn default() -> Self {
        Self::new(C::MAIN_STORAGE_UPI, C::STORAGE_SIZE)
    }
}

impl std::fmt::Debug for MainStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MainStorage {{ upi: {}, size: {} }}", self.upi, self.words.len())
    }
}

impl MainStorage {
    #[must_use]
    pub fn new(upi: u32, size: usize) -> Self {
        debug!(upi, size, "allocating storage unit");
        Self {
            upi,
            words: vec![Word36::POSITIVE_ZERO; size],
        }
    }

    #[must_use]
    pub const fn upi(&self) -> u32 {
        self.upi
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn index(&self, address: AbsoluteAddress) -> Result<usize, StorageError> {
        if address.upi != self.upi {
            return Err(StorageError::UnknownUnit(address.upi));
        }

        usize::try_from(address.offset)
            .ok()
            .filter(|index| *index < self.words.len())
            .ok_or(StorageError::InvalidAddress(address))
    }
}

impl Storage for MainStorage {
    fn read(&self, address: AbsoluteAddress) -> Result<Word36, StorageError> {
        let index = self.index(address)?;
        Ok(self.words[index])
    }

    fn write(&mut self, address: AbsoluteAddress, word: Word36) -> Result<(), StorageError> {
        let index = self.index(address)?;
        self.words[index] = word;
        Ok(())
    }
}
