use checkbook_core::{Money, NewEntry};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

use crate::profile::ProfileRegistry;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsvError {
    #[error("CSV file is empty or has no data rows")]
    Empty,
    #[error("Unrecognized CSV format; header was: {header}")]
    UnrecognizedFormat { header: String },
}

/// Why a single data row was left out of an import.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("row has {found} fields, at least {required} required")]
    TooFewFields { found: usize, required: usize },
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based line number in the source text.
    pub line: usize,
    pub reason: RowError,
}

#[derive(Debug, Clone)]
pub struct ParsedCsv {
    pub profile: String,
    pub rows: Vec<NewEntry>,
    pub skipped: Vec<SkippedRow>,
}

/// Splits one line of a bank export into fields.
///
/// A `"` opens a quoted field only at the start of the line or right after a
/// comma, and closes it only right before a comma, `\r` or the end of the
/// line. Any other quote is kept as text. Only the last field is trimmed.
pub fn split_line(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;

    for (i, &c) in chars.iter().enumerate() {
        if c == '"' && !in_quote && (i == 0 || chars[i - 1] == ',') {
            in_quote = true;
            continue;
        }
        if c == '"' && in_quote && matches!(chars.get(i + 1), None | Some(',') | Some('\r')) {
            in_quote = false;
            continue;
        }
        if c == ',' && !in_quote {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    fields.push(current.trim().to_string());

    fields
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%Y/%m/%d", "%m-%d-%Y", "%b %d, %Y", "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M %p",
];

/// Parses a calendar date, trying `preferred` first. Timestamps with an
/// offset are converted to their UTC date; other timestamps keep their date.
pub(crate) fn parse_date(s: &str, preferred: Option<&str>) -> Result<NaiveDate, RowError> {
    let s = s.trim();

    if let Some(format) = preferred {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Ok(date);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc).date_naive());
    }

    Err(RowError::InvalidDate(s.to_string()))
}

/// Parses a bank amount: `$`, thousands separators and spaces are ignored and
/// `(12.34)` means `-12.34`.
pub(crate) fn parse_amount(s: &str) -> Result<Money, RowError> {
    let s = s.trim();
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let cleaned = s.replace([',', '$', ' '], "");
    let mut dec = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| RowError::InvalidAmount(s.to_string()))?;
    if negative {
        dec = -dec;
    }
    Ok(Money::from_decimal(dec))
}

/// Detects the layout from the header line and extracts every data row.
///
/// Blank lines are ignored. A header that matches no profile aborts before any
/// row is read; individual bad rows are skipped and reported.
pub fn parse_bank_csv(text: &str, registry: &ProfileRegistry) -> Result<ParsedCsv, CsvError> {
    let mut lines = text
        .split('\n')
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| (idx + 1, line));

    let (_, header) = lines.next().ok_or(CsvError::Empty)?;
    let data: Vec<(usize, &str)> = lines.collect();
    if data.is_empty() {
        return Err(CsvError::Empty);
    }

    let profile = registry
        .detect(header)
        .ok_or_else(|| CsvError::UnrecognizedFormat {
            header: header.trim().to_string(),
        })?;
    debug!(profile = %profile.name, rows = data.len(), "Detected CSV layout");

    let mut rows = Vec::with_capacity(data.len());
    let mut skipped = Vec::new();
    for (line, text) in data {
        match profile.extract(&split_line(text)) {
            Ok(entry) => rows.push(entry),
            Err(reason) => {
                warn!(line, "Skipped CSV row: {reason}");
                skipped.push(SkippedRow { line, reason });
            }
        }
    }

    Ok(ParsedCsv {
        profile: profile.name.clone(),
        rows,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── split_line ────────────────────────────────────────────────────────────

    #[test]
    fn quoted_comma_stays_in_field() {
        assert_eq!(
            split_line(r#"Account,2024-01-01,N,"Coffee, Shop",Dining,,,-4.50"#),
            vec!["Account", "2024-01-01", "N", "Coffee, Shop", "Dining", "", "", "-4.50"]
        );
    }

    #[test]
    fn plain_fields() {
        assert_eq!(split_line("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(split_line(""), vec![""]);
        assert_eq!(split_line("a,,"), vec!["a", "", ""]);
    }

    #[test]
    fn quoted_first_and_last_fields() {
        assert_eq!(split_line(r#""a,1",b,"c,2""#), vec!["a,1", "b", "c,2"]);
        assert_eq!(split_line("\"x\",\"y\"\r"), vec!["x", "y"]);
    }

    #[test]
    fn empty_quoted_field() {
        assert_eq!(split_line(r#"a,"",b"#), vec!["a", "", "b"]);
    }

    #[test]
    fn mid_field_quotes_are_literal() {
        assert_eq!(split_line(r#"2x4 6" board,9.99"#), vec![r#"2x4 6" board"#, "9.99"]);
    }

    #[test]
    fn only_last_field_is_trimmed() {
        assert_eq!(split_line(" a , b \r"), vec![" a ", "b"]);
    }

    #[test]
    fn unterminated_quote_swallows_rest_of_line() {
        assert_eq!(split_line(r#"a,"b,c"#), vec!["a", "b,c"]);
    }

    // ── parse_amount ──────────────────────────────────────────────────────────

    #[test]
    fn parse_amount_variants() {
        assert_eq!(parse_amount("123.45").unwrap().to_cents(), 12345);
        assert_eq!(parse_amount("$99.99").unwrap().to_cents(), 9999);
        assert_eq!(parse_amount("1,234.56").unwrap().to_cents(), 123456);
        assert_eq!(parse_amount("-12.34").unwrap().to_cents(), -1234);
        assert_eq!(parse_amount("(75.25)").unwrap().to_cents(), -7525);
        assert_eq!(parse_amount(" 0 ").unwrap().to_cents(), 0);
        assert_eq!(parse_amount("100").unwrap().to_cents(), 10000);
    }

    #[test]
    fn parse_amount_invalid() {
        assert!(parse_amount("").is_err());
        assert!(parse_amount("not_a_number").is_err());
        assert!(parse_amount("()").is_err());
    }

    // ── parse_date ────────────────────────────────────────────────────────────

    #[test]
    fn parse_date_formats() {
        assert_eq!(parse_date("2024-01-15", None).unwrap(), date(2024, 1, 15));
        assert_eq!(parse_date("01/15/2024", None).unwrap(), date(2024, 1, 15));
        assert_eq!(parse_date("1/5/24", None).unwrap(), date(2024, 1, 5));
        assert_eq!(parse_date("2024/01/15", None).unwrap(), date(2024, 1, 15));
        assert_eq!(parse_date("Jan 15, 2024", None).unwrap(), date(2024, 1, 15));
    }

    #[test]
    fn parse_date_timestamps() {
        assert_eq!(
            parse_date("2024-01-15 23:59:59", None).unwrap(),
            date(2024, 1, 15)
        );
        // 20:00 at UTC-5 is already the next day in UTC.
        assert_eq!(
            parse_date("2024-01-15T20:00:00-05:00", None).unwrap(),
            date(2024, 1, 16)
        );
    }

    #[test]
    fn parse_date_preferred_format_wins() {
        assert_eq!(
            parse_date("02/01/2024", Some("%d/%m/%Y")).unwrap(),
            date(2024, 1, 2)
        );
        assert_eq!(parse_date("02/01/2024", None).unwrap(), date(2024, 2, 1));
    }

    #[test]
    fn parse_date_invalid() {
        assert!(matches!(
            parse_date("not-a-date", None),
            Err(RowError::InvalidDate(_))
        ));
    }

    // ── parse_bank_csv ────────────────────────────────────────────────────────

    const FORMAT_1: &str = "Account,Date,Pending?,Description,Category,Check,Credit,Debit\r\n\
        Checking,2024-01-01,N,\"Coffee, Shop\",Dining,,,-4.50\r\n\
        Checking,2024-01-02,N,Paycheck,Income,,2000.00,\r\n\
        \r\n\
        Checking,2024-01-03,N,Hardware,Home,,0,-12.34\r\n";

    #[test]
    fn parses_credit_debit_export() {
        let parsed = parse_bank_csv(FORMAT_1, &ProfileRegistry::builtin()).unwrap();
        assert_eq!(parsed.profile, "Bank Format 1 (Credit/Debit Columns)");
        assert!(parsed.skipped.is_empty());
        let amounts: Vec<i64> = parsed.rows.iter().map(|e| e.amount.to_cents()).collect();
        assert_eq!(amounts, vec![-450, 200_000, -1234]);
        assert_eq!(parsed.rows[0].description, "Coffee, Shop");
        assert_eq!(parsed.rows[0].category, "Dining");
    }

    #[test]
    fn parses_single_amount_export() {
        let text = "Date,Description,Original Description,Category,Amount,Status\n\
            2024-02-01,Refund,REFUND 9,Shopping,50.00,Posted\n\
            02/03/2024,Gas,SHELL 42,Auto,-38.10,Pending\n";
        let parsed = parse_bank_csv(text, &ProfileRegistry::builtin()).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].amount.to_cents(), 5_000);
        assert_eq!(parsed.rows[0].category, "Shopping");
        assert_eq!(parsed.rows[1].date, date(2024, 2, 3));
    }

    #[test]
    fn bad_rows_are_skipped_with_line_numbers() {
        let text = "Date,Description,Original Description,Category,Amount,Status\n\
            2024-02-01,Refund,REFUND 9,Shopping,50.00,Posted\n\
            2024-02-02,Short\n\
            2024-02-03,Broken,X,Misc,abc,Posted\n\
            yesterday,Late,X,Misc,1.00,Posted\n\
            2024-02-05,Fine,X,Misc,1.00,Posted\n";
        let parsed = parse_bank_csv(text, &ProfileRegistry::builtin()).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        let lines: Vec<usize> = parsed.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
        assert!(matches!(parsed.skipped[0].reason, RowError::TooFewFields { .. }));
        assert!(matches!(parsed.skipped[1].reason, RowError::InvalidAmount(_)));
        assert!(matches!(parsed.skipped[2].reason, RowError::InvalidDate(_)));
    }

    #[test]
    fn unknown_header_aborts() {
        let text = "When,What,How much\n2024-01-01,Thing,1.00\n";
        assert!(matches!(
            parse_bank_csv(text, &ProfileRegistry::builtin()),
            Err(CsvError::UnrecognizedFormat { .. })
        ));
    }

    #[test]
    fn header_only_or_blank_is_empty() {
        let registry = ProfileRegistry::builtin();
        assert_eq!(parse_bank_csv("", &registry).unwrap_err(), CsvError::Empty);
        assert_eq!(parse_bank_csv("\n \n", &registry).unwrap_err(), CsvError::Empty);
        assert_eq!(
            parse_bank_csv(
                "Date,Description,Original Description,Category,Amount,Status\n",
                &registry
            )
            .unwrap_err(),
            CsvError::Empty
        );
    }
}
