//! Duplicate suppression against entries already in the ledger.
//!
//! A candidate is a duplicate when some stored entry has the same date, the
//! same description (exact, case-sensitive) and the same amount. Two real
//! transactions sharing all three are collapsed, descriptions that differ by
//! a character are not, and rows of the same file are not compared with each
//! other. That is accepted behavior.

use checkbook_core::{LedgerEntry, Money, NewEntry};
use chrono::NaiveDate;
use std::collections::HashSet;

#[derive(Debug, PartialEq, Eq, Hash)]
struct DuplicateKey<'a> {
    date: NaiveDate,
    description: &'a str,
    amount: Money,
}

impl<'a> DuplicateKey<'a> {
    fn of_stored(e: &'a LedgerEntry) -> Self {
        DuplicateKey {
            date: e.date,
            description: &e.description,
            amount: e.amount,
        }
    }

    fn of_candidate(e: &'a NewEntry) -> Self {
        DuplicateKey {
            date: e.date,
            description: &e.description,
            amount: e.amount,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Deduplicated {
    pub fresh: Vec<NewEntry>,
    pub duplicates: Vec<NewEntry>,
}

pub fn remove_existing(candidates: Vec<NewEntry>, existing: &[LedgerEntry]) -> Deduplicated {
    let known: HashSet<DuplicateKey<'_>> = existing.iter().map(DuplicateKey::of_stored).collect();

    let (duplicates, fresh) = candidates
        .into_iter()
        .partition(|c| known.contains(&DuplicateKey::of_candidate(c)));

    Deduplicated { fresh, duplicates }
}
