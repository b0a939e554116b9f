use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::money::Money;

/// Category given to imported rows that carry none.
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(pub i64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(EntryId)
    }
}

/// Direction chosen when an entry is keyed in by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Credit,
    Debit,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Credit => write!(f, "Credit"),
            EntryKind::Debit => write!(f, "Debit"),
        }
    }
}

/// A stored ledger entry. The id is assigned by the store and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub date: NaiveDate,
    pub description: String,
    pub category: String,
    pub amount: Money,
    #[serde(default)]
    pub reconciled: bool,
}

/// An entry that has not been written to a store yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub date: NaiveDate,
    pub description: String,
    pub category: String,
    pub amount: Money,
    pub reconciled: bool,
}

impl NewEntry {
    pub fn new(date: NaiveDate, description: &str, category: &str, amount: Money) -> Self {
        NewEntry {
            date,
            description: description.to_string(),
            category: category.to_string(),
            amount,
            reconciled: false,
        }
    }

    /// Manual entry takes a magnitude; debits are stored negated and credits
    /// as entered.
    pub fn manual(
        date: NaiveDate,
        description: &str,
        category: &str,
        kind: EntryKind,
        amount: Money,
    ) -> Self {
        let amount = match kind {
            EntryKind::Debit => -amount.abs(),
            EntryKind::Credit => amount,
        };
        NewEntry::new(date, description, category, amount)
    }

    pub fn with_id(self, id: EntryId) -> LedgerEntry {
        LedgerEntry {
            id,
            date: self.date,
            description: self.description,
            category: self.category,
            amount: self.amount,
            reconciled: self.reconciled,
        }
    }
}
