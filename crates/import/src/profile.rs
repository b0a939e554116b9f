//! Bank export layouts, described as data.
//!
//! A profile says which header labels identify a layout and where the date,
//! description, category and amount live in each row. `CsvProfile::extract`
//! is the single interpreter for all of them.

use checkbook_core::{Money, NewEntry, UNCATEGORIZED};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::csv::{parse_amount, parse_date, RowError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AmountColumns {
    /// One signed column.
    Single { amount: usize },
    /// Separate credit and debit columns; the amount is their sum. A blank or
    /// unparseable side counts as zero.
    CreditDebit { credit: usize, debit: usize },
}

impl AmountColumns {
    fn highest_index(&self) -> usize {
        match *self {
            AmountColumns::Single { amount } => amount,
            AmountColumns::CreditDebit { credit, debit } => credit.max(debit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub date: usize,
    pub description: usize,
    #[serde(default)]
    pub category: Option<usize>,
    pub amount: AmountColumns,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvProfile {
    pub name: String,
    /// Every label must appear somewhere in the header line.
    pub header_signature: Vec<String>,
    pub columns: ColumnMap,
    /// Rows with fewer fields are skipped. Defaults to one past the highest
    /// mapped column.
    #[serde(default)]
    pub min_fields: Option<usize>,
    /// Tried before the built-in date formats.
    #[serde(default)]
    pub date_format: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Failed to parse profiles TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid profile '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

impl CsvProfile {
    pub fn required_fields(&self) -> usize {
        self.min_fields.unwrap_or_else(|| {
            let c = &self.columns;
            c.date
                .max(c.description)
                .max(c.category.unwrap_or(0))
                .max(c.amount.highest_index())
                + 1
        })
    }

    pub fn matches_header(&self, header: &str) -> bool {
        self.header_signature
            .iter()
            .all(|label| header.contains(label.as_str()))
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        let invalid = |reason: &str| ProfileError::Invalid {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if self.header_signature.is_empty() {
            return Err(invalid("header_signature has no labels"));
        }
        if self.header_signature.iter().any(|l| l.trim().is_empty()) {
            return Err(invalid("header_signature contains an empty label"));
        }
        let required = self.required_fields();
        if required <= self.columns.date || required <= self.columns.description {
            return Err(invalid("min_fields does not cover the date and description columns"));
        }
        Ok(())
    }

    /// Maps one tokenized data row to an unsaved entry.
    pub fn extract(&self, fields: &[String]) -> Result<NewEntry, RowError> {
        let required = self.required_fields();
        if fields.len() < required {
            return Err(RowError::TooFewFields {
                found: fields.len(),
                required,
            });
        }

        let field = |idx: usize| fields.get(idx).map(String::as_str).unwrap_or("");

        let date = parse_date(field(self.columns.date), self.date_format.as_deref())?;
        let description = field(self.columns.description).trim();

        let amount = match self.columns.amount {
            AmountColumns::Single { amount } => parse_amount(field(amount))?,
            AmountColumns::CreditDebit { credit, debit } => {
                let side = |idx: usize| parse_amount(field(idx)).unwrap_or_else(|_| Money::zero());
                side(credit) + side(debit)
            }
        };

        let category = self
            .columns
            .category
            .map(|idx| field(idx).trim())
            .filter(|c| !c.is_empty())
            .unwrap_or(UNCATEGORIZED);

        Ok(NewEntry::new(date, description, category, amount))
    }
}

/// Ordered set of known layouts; detection picks the first match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRegistry {
    profiles: Vec<CsvProfile>,
}

#[derive(Deserialize)]
struct ProfileFile {
    #[serde(default, rename = "profile")]
    profiles: Vec<CsvProfile>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProfileRegistry {
    pub fn new(profiles: Vec<CsvProfile>) -> Result<Self, ProfileError> {
        for profile in &profiles {
            profile.validate()?;
        }
        Ok(Self { profiles })
    }

    pub fn builtin() -> Self {
        Self {
            profiles: vec![
                CsvProfile {
                    name: "Bank Format 1 (Credit/Debit Columns)".to_string(),
                    header_signature: labels(&[
                        "Account",
                        "Date",
                        "Pending?",
                        "Description",
                        "Category",
                        "Check",
                        "Credit",
                        "Debit",
                    ]),
                    columns: ColumnMap {
                        date: 1,
                        description: 3,
                        category: Some(4),
                        amount: AmountColumns::CreditDebit {
                            credit: 6,
                            debit: 7,
                        },
                    },
                    min_fields: Some(5),
                    date_format: None,
                },
                CsvProfile {
                    name: "Bank Format 2 (Single Amount Column)".to_string(),
                    header_signature: labels(&[
                        "Date",
                        "Description",
                        "Original Description",
                        "Category",
                        "Amount",
                        "Status",
                    ]),
                    columns: ColumnMap {
                        date: 0,
                        description: 1,
                        category: Some(3),
                        amount: AmountColumns::Single { amount: 4 },
                    },
                    min_fields: Some(5),
                    date_format: None,
                },
            ],
        }
    }

    /// Parses `[[profile]]` tables.
    pub fn profiles_from_toml(toml_content: &str) -> Result<Vec<CsvProfile>, ProfileError> {
        let file: ProfileFile = toml::from_str(toml_content)?;
        for profile in &file.profiles {
            profile.validate()?;
        }
        Ok(file.profiles)
    }

    /// Built-in layouts followed by the ones described in `toml_content`.
    pub fn builtin_with_toml(toml_content: &str) -> Result<Self, ProfileError> {
        let mut registry = Self::builtin();
        registry.extend(Self::profiles_from_toml(toml_content)?);
        Ok(registry)
    }

    pub fn extend(&mut self, profiles: impl IntoIterator<Item = CsvProfile>) {
        self.profiles.extend(profiles);
    }

    pub fn profiles(&self) -> &[CsvProfile] {
        &self.profiles
    }

    pub fn detect(&self, header: &str) -> Option<&CsvProfile> {
        self.profiles.iter().find(|p| p.matches_header(header))
    }
}

fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
