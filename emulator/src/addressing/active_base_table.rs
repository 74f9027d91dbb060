use super::BankName;

/// Number of base registers tracked by the table (B0–B15)
const ENTRIES: usize = 16;

/// Bank currently loaded into one of the user base registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActiveBaseTableEntry {
    pub bank: BankName,
    /// Subset offset the bank was loaded with
    pub offset: u32,
}

impl ActiveBaseTableEntry {
    #[must_use]
    pub const fn new(bank: BankName, offset: u32) -> Self {
        Self { bank, offset }
    }
}

/// Which bank each of B0–B15 was loaded from.
///
/// An entry is only present while the base register still reflects the
/// descriptor it was loaded from. Loading a base register by any other means
/// invalidates its entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActiveBaseTable {
    entries: [Option<ActiveBaseTableEntry>; ENTRIES],
}

impl ActiveBaseTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for a base register; registers past B15 are never tracked
    #[must_use]
    pub fn get(&self, base_register: usize) -> Option<ActiveBaseTableEntry> {
        self.entries.get(base_register).copied().flatten()
    }

    pub fn set(&mut self, base_register: usize, entry: ActiveBaseTableEntry) {
        if let Some(slot) = self.entries.get_mut(base_register) {
            *slot = Some(entry);
        }
    }

    pub fn invalidate(&mut self, base_register: usize) {
        if let Some(slot) = self.entries.get_mut(base_register) {
            *slot = None;
        }
    }

    /// Whether a base register currently holds `bank`
    #[must_use]
    pub fn matches(&self, base_register: usize, bank: BankName) -> bool {
        self.get(base_register).is_some_and(|entry| entry.bank == bank)
    }

    /// Entries in base register order
    pub fn iter(&self) -> impl Iterator<Item = (usize, ActiveBaseTableEntry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.map(|entry| (index, entry)))
    }
}
