//! The check register view: filtering, chronological running balances and
//! display ordering over a snapshot of entries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::entry::LedgerEntry;
use super::money::Money;
use super::period::DateRange;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseOptionError {
    #[error("Unknown sort order: '{0}' (expected 'asc' or 'desc')")]
    SortOrder(String),
    #[error("Unknown reconciled status: '{0}' (expected 'all', 'reconciled' or 'unreconciled')")]
    Reconciled(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    #[serde(alias = "ascending")]
    Asc,
    #[serde(alias = "descending")]
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(ParseOptionError::SortOrder(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconciledFilter {
    #[default]
    All,
    Reconciled,
    Unreconciled,
}

impl ReconciledFilter {
    pub fn matches(self, reconciled: bool) -> bool {
        match self {
            ReconciledFilter::All => true,
            ReconciledFilter::Reconciled => reconciled,
            ReconciledFilter::Unreconciled => !reconciled,
        }
    }
}

impl FromStr for ReconciledFilter {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(ReconciledFilter::All),
            "reconciled" | "true" | "yes" => Ok(ReconciledFilter::Reconciled),
            "unreconciled" | "false" | "no" => Ok(ReconciledFilter::Unreconciled),
            other => Err(ParseOptionError::Reconciled(other.to_string())),
        }
    }
}

/// Predicates applied to the register before balances are computed. Every
/// predicate that is set must hold; empty substrings are inactive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFilter {
    pub dates: DateRange,
    pub description: Option<String>,
    pub category: Option<String>,
    pub reconciled: ReconciledFilter,
}

impl EntryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_date(mut self, start: NaiveDate) -> Self {
        self.dates.start = Some(start);
        self
    }

    pub fn to_date(mut self, end: NaiveDate) -> Self {
        self.dates.end = Some(end);
        self
    }

    pub fn description_contains(mut self, needle: &str) -> Self {
        self.description = Some(needle.to_string());
        self
    }

    pub fn category_contains(mut self, needle: &str) -> Self {
        self.category = Some(needle.to_string());
        self
    }

    pub fn reconciled(mut self, status: ReconciledFilter) -> Self {
        self.reconciled = status;
        self
    }

    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.dates.contains(entry.date)
            && contains_ignore_case(&entry.description, self.description.as_deref())
            && contains_ignore_case(&entry.category, self.category.as_deref())
            && self.reconciled.matches(entry.reconciled)
    }
}

fn contains_ignore_case(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        None | Some("") => true,
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRow {
    pub entry: LedgerEntry,
    pub running_balance: Money,
}

impl RegisterRow {
    pub fn is_negative(&self) -> bool {
        self.running_balance.is_negative()
    }
}

/// Builds the register view.
///
/// Balances are always accumulated oldest-first over the filtered set; the
/// requested order only decides how the rows are laid out afterwards. Both
/// sorts are stable, so entries sharing a date keep their snapshot order.
pub fn render(
    entries: Vec<LedgerEntry>,
    filter: Option<&EntryFilter>,
    order: SortOrder,
) -> Vec<RegisterRow> {
    let mut visible: Vec<LedgerEntry> = match filter {
        Some(filter) => entries.into_iter().filter(|e| filter.matches(e)).collect(),
        None => entries,
    };

    visible.sort_by_key(|e| e.date);

    let mut balance = Money::zero();
    let mut rows: Vec<RegisterRow> = visible
        .into_iter()
        .map(|entry| {
            balance = balance + entry.amount;
            RegisterRow {
                entry,
                running_balance: balance,
            }
        })
        .collect();

    if order == SortOrder::Desc {
        rows.sort_by(|a, b| b.entry.date.cmp(&a.entry.date));
    }

    rows
}

/// Distinct descriptions and categories, in first-seen order, for
/// autocompleting manual entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Suggestions {
    pub descriptions: Vec<String>,
    pub categories: Vec<String>,
}

pub fn suggestions(entries: &[LedgerEntry]) -> Suggestions {
    fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
        let mut seen = HashSet::new();
        values
            .filter(|v| seen.insert(*v))
            .map(str::to_string)
            .collect()
    }

    Suggestions {
        descriptions: distinct(entries.iter().map(|e| e.description.as_str())),
        categories: distinct(entries.iter().map(|e| e.category.as_str())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryId, NewEntry};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(
        id: i64,
        on: (i32, u32, u32),
        desc: &str,
        cat: &str,
        cents: i64,
        reconciled: bool,
    ) -> LedgerEntry {
        let mut e = NewEntry::new(date(on.0, on.1, on.2), desc, cat, Money::from_cents(cents))
            .with_id(EntryId(id));
        e.reconciled = reconciled;
        e
    }

    /// Snapshot in id (insertion) order, deliberately not in date order.
    fn sample() -> Vec<LedgerEntry> {
        vec![
            entry(1, (2024, 1, 10), "Paycheck", "Income", 150_000, true),
            entry(2, (2024, 1, 5), "Opening deposit", "Transfer", 20_000, true),
            entry(3, (2024, 1, 10), "Rent", "Housing", -120_000, false),
            entry(4, (2024, 2, 1), "Coffee Shop", "Dining", -450, false),
            entry(5, (2024, 1, 20), "GROCERY OUTLET", "Food", -8_215, true),
            entry(6, (2024, 3, 15), "Car repair", "Auto", -95_000, false),
        ]
    }

    fn ids(rows: &[RegisterRow]) -> Vec<i64> {
        rows.iter().map(|r| r.entry.id.0).collect()
    }

    #[test]
    fn empty_input_yields_empty_register() {
        assert!(render(Vec::new(), None, SortOrder::Asc).is_empty());
        assert!(render(Vec::new(), Some(&EntryFilter::new()), SortOrder::Desc).is_empty());
    }

    #[test]
    fn ascending_is_chronological_with_insertion_tie_break() {
        let rows = render(sample(), None, SortOrder::Asc);
        assert_eq!(ids(&rows), vec![2, 1, 3, 5, 4, 6]);
        let balances: Vec<i64> = rows.iter().map(|r| r.running_balance.to_cents()).collect();
        assert_eq!(balances, vec![20_000, 170_000, 50_000, 41_785, 41_335, -53_665]);
    }

    #[test]
    fn last_balance_equals_total() {
        let entries = sample();
        let total: Money = entries.iter().map(|e| e.amount).sum();
        let rows = render(entries, None, SortOrder::Asc);
        assert_eq!(rows.last().unwrap().running_balance, total);
    }

    #[test]
    fn descending_reorders_rows_but_keeps_balances() {
        let asc = render(sample(), None, SortOrder::Asc);
        let desc = render(sample(), None, SortOrder::Desc);

        // Same-date entries keep their ascending relative order.
        assert_eq!(ids(&desc), vec![6, 4, 5, 1, 3, 2]);

        for row in &desc {
            let twin = asc.iter().find(|r| r.entry.id == row.entry.id).unwrap();
            assert_eq!(row.running_balance, twin.running_balance);
        }
    }

    #[test]
    fn balances_invariant_under_order_for_filtered_view() {
        let filter = EntryFilter::new().reconciled(ReconciledFilter::Unreconciled);
        let asc = render(sample(), Some(&filter), SortOrder::Asc);
        let desc = render(sample(), Some(&filter), SortOrder::Desc);
        let mut a: Vec<(i64, i64)> = asc
            .iter()
            .map(|r| (r.entry.id.0, r.running_balance.to_cents()))
            .collect();
        let mut d: Vec<(i64, i64)> = desc
            .iter()
            .map(|r| (r.entry.id.0, r.running_balance.to_cents()))
            .collect();
        a.sort();
        d.sort();
        assert_eq!(a, d);
    }

    #[test]
    fn balance_starts_from_first_visible_entry() {
        let filter = EntryFilter::new().from_date(date(2024, 1, 20));
        let rows = render(sample(), Some(&filter), SortOrder::Asc);
        assert_eq!(ids(&rows), vec![5, 4, 6]);
        assert_eq!(rows[0].running_balance.to_cents(), -8_215);
        assert_eq!(rows[2].running_balance.to_cents(), -8_215 - 450 - 95_000);
    }

    #[test]
    fn date_range_is_inclusive_on_both_ends() {
        let filter = EntryFilter::new()
            .from_date(date(2024, 1, 10))
            .to_date(date(2024, 2, 1));
        let rows = render(sample(), Some(&filter), SortOrder::Asc);
        assert_eq!(ids(&rows), vec![1, 3, 5, 4]);
    }

    #[test]
    fn substring_filters_ignore_case() {
        let filter = EntryFilter::new().description_contains("grocery");
        assert_eq!(ids(&render(sample(), Some(&filter), SortOrder::Asc)), vec![5]);

        let filter = EntryFilter::new().category_contains("DIN");
        assert_eq!(ids(&render(sample(), Some(&filter), SortOrder::Asc)), vec![4]);
    }

    #[test]
    fn empty_substring_is_inactive() {
        let filter = EntryFilter::new()
            .description_contains("")
            .category_contains("");
        assert_eq!(render(sample(), Some(&filter), SortOrder::Asc).len(), 6);
    }

    #[test]
    fn reconciled_status_filter() {
        let rec = EntryFilter::new().reconciled(ReconciledFilter::Reconciled);
        assert_eq!(ids(&render(sample(), Some(&rec), SortOrder::Asc)), vec![2, 1, 5]);

        let unrec = EntryFilter::new().reconciled(ReconciledFilter::Unreconciled);
        assert_eq!(ids(&render(sample(), Some(&unrec), SortOrder::Asc)), vec![3, 4, 6]);
    }

    #[test]
    fn filter_is_neither_lossy_nor_permissive() {
        let filters = [
            EntryFilter::new(),
            EntryFilter::new().from_date(date(2024, 1, 10)),
            EntryFilter::new().to_date(date(2024, 1, 10)),
            EntryFilter::new()
                .description_contains("o")
                .reconciled(ReconciledFilter::Reconciled),
            EntryFilter::new()
                .category_contains("o")
                .from_date(date(2024, 1, 6))
                .to_date(date(2024, 3, 1)),
            EntryFilter::new().description_contains("no such thing"),
        ];
        for filter in &filters {
            let rows = render(sample(), Some(filter), SortOrder::Desc);
            assert!(rows.iter().all(|r| filter.matches(&r.entry)));
            let expected = sample().iter().filter(|e| filter.matches(e)).count();
            assert_eq!(rows.len(), expected, "filter {filter:?}");
        }
    }

    #[test]
    fn negative_running_balance_is_flagged() {
        let rows = render(sample(), None, SortOrder::Asc);
        assert!(!rows[0].is_negative());
        assert!(rows.last().unwrap().is_negative());
    }

    #[test]
    fn sort_order_parse_and_display() {
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert!("sideways".parse::<SortOrder>().is_err());
        assert_eq!(SortOrder::Desc.to_string(), "desc");
        assert_eq!(SortOrder::default(), SortOrder::Asc);
    }

    #[test]
    fn reconciled_filter_parse() {
        assert_eq!("all".parse::<ReconciledFilter>().unwrap(), ReconciledFilter::All);
        assert_eq!("true".parse::<ReconciledFilter>().unwrap(), ReconciledFilter::Reconciled);
        assert_eq!(
            "Unreconciled".parse::<ReconciledFilter>().unwrap(),
            ReconciledFilter::Unreconciled
        );
        assert!("maybe".parse::<ReconciledFilter>().is_err());
    }

    #[test]
    fn suggestions_are_distinct_in_first_seen_order() {
        let mut entries = sample();
        entries.push(entry(7, (2024, 4, 1), "Paycheck", "Income", 150_000, false));
        let s = suggestions(&entries);
        assert_eq!(s.descriptions.len(), 6);
        assert_eq!(s.descriptions[0], "Paycheck");
        assert_eq!(
            s.categories,
            vec!["Income", "Transfer", "Housing", "Dining", "Food", "Auto"]
        );
    }
}
