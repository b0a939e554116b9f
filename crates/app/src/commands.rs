use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use checkbook::{parse_document, AppConfig, Ledger, LedgerError};
use checkbook_core::{
    Confirmed, EntryFilter, EntryId, EntryKind, LedgerEntry, Money, NewEntry, RegisterRow,
    SortOrder,
};
use checkbook_import::CsvError;
use checkbook_storage::{get_setting, set_setting, FileMirror, SqliteStore};
use chrono::NaiveDate;
use tracing::warn;

use crate::{AddArgs, ListArgs};

type CliLedger = Ledger<SqliteStore, FileMirror>;

const SORT_ORDER_KEY: &str = "sort_order";

pub async fn list(ledger: &CliLedger, config: &AppConfig, args: ListArgs) -> Result<()> {
    let order = resolve_order(ledger, config, args.order).await?;

    let mut filter = EntryFilter::new().reconciled(args.status);
    if let Some(from) = args.from {
        filter = filter.from_date(from);
    }
    if let Some(to) = args.to {
        filter = filter.to_date(to);
    }
    if let Some(description) = &args.description {
        filter = filter.description_contains(description);
    }
    if let Some(category) = &args.category {
        filter = filter.category_contains(category);
    }

    let rows = ledger.register(Some(&filter), order).await?;
    if rows.is_empty() {
        println!("No entries.");
        return Ok(());
    }

    println!(
        "{:>5}  {:<8}  {:<32}  {:<18}  {:>12}  {:>12}  {}",
        "ID", "Date", "Description", "Category", "Amount", "Balance", "R"
    );
    for row in &rows {
        println!("{}", format_row(row));
    }
    Ok(())
}

/// `--order` is saved as the new preference; otherwise the saved preference,
/// then the config file, then ascending.
async fn resolve_order(
    ledger: &CliLedger,
    config: &AppConfig,
    requested: Option<SortOrder>,
) -> Result<SortOrder> {
    let pool = ledger.store().pool();
    if let Some(order) = requested {
        set_setting(pool, SORT_ORDER_KEY, &order.to_string())
            .await
            .context("Failed to save sort order")?;
        return Ok(order);
    }

    let saved = get_setting(pool, SORT_ORDER_KEY)
        .await
        .context("Failed to read sort order")?;
    let saved = saved.and_then(|s| match s.parse::<SortOrder>() {
        Ok(order) => Some(order),
        Err(e) => {
            warn!("Ignoring saved sort order: {e}");
            None
        }
    });
    Ok(saved.or(config.default_order).unwrap_or_default())
}

fn format_row(row: &RegisterRow) -> String {
    let e = &row.entry;
    format!(
        "{:>5}  {:<8}  {:<32}  {:<18}  {:>12}  {:>12}{}  {}",
        e.id.0,
        e.date.format("%m/%d/%y").to_string(),
        truncate(&e.description, 32),
        truncate(&e.category, 18),
        e.amount.to_string(),
        row.running_balance.to_string(),
        if row.is_negative() { "!" } else { " " },
        if e.reconciled { "R" } else { "" },
    )
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub async fn add(ledger: &CliLedger, args: AddArgs) -> Result<()> {
    let kind = if args.debit {
        EntryKind::Debit
    } else {
        EntryKind::Credit
    };
    let entry = NewEntry::manual(
        args.date,
        &args.description,
        &args.category,
        kind,
        Money::from_decimal(args.amount),
    );
    let amount = entry.amount;
    let id = ledger.add_entry(entry).await?;
    println!("Added entry {id} ({kind}, {amount}).");
    Ok(())
}

pub async fn delete(ledger: &CliLedger, id: EntryId, yes: bool) -> Result<()> {
    let Some(entry) = ledger.entry(id).await? else {
        println!("Entry {id} does not exist.");
        return Ok(());
    };
    if !confirm(&delete_prompt(&entry), yes)? {
        println!("Delete cancelled.");
        return Ok(());
    }

    if ledger.delete_entry(id).await? {
        println!("Deleted entry {id}.");
    } else {
        println!("Entry {id} does not exist.");
    }
    Ok(())
}

fn delete_prompt(entry: &LedgerEntry) -> String {
    format!(
        "Delete entry {} ({}, {}, {})?",
        entry.id,
        entry.date.format("%m/%d/%y"),
        entry.description,
        entry.amount
    )
}

pub async fn reconcile(ledger: &CliLedger, id: EntryId, reconciled: bool) -> Result<()> {
    if !ledger.set_reconciled(id, reconciled).await? {
        println!("Entry {id} does not exist.");
    } else if reconciled {
        println!("Entry {id} marked reconciled.");
    } else {
        println!("Entry {id} marked unreconciled.");
    }
    Ok(())
}

pub async fn purge(ledger: &CliLedger, cutoff: NaiveDate, yes: bool) -> Result<()> {
    let eligible = ledger
        .entries()
        .await?
        .iter()
        .filter(|e| e.reconciled && e.date <= cutoff)
        .count();
    if eligible == 0 {
        println!("No reconciled entries on or before {cutoff}.");
        return Ok(());
    }

    let prompt = format!(
        "Permanently delete {eligible} reconciled entries dated on or before {cutoff}? This cannot be undone."
    );
    if !confirm(&prompt, yes)? {
        println!("Purge cancelled.");
        return Ok(());
    }

    let summary = ledger.purge(Confirmed::new(cutoff)).await?;
    println!("Purged {} entries.", summary.removed);
    Ok(())
}

pub async fn import_csv(ledger: &CliLedger, file: &Path, reconciled: bool, yes: bool) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read CSV file: {}", file.display()))?;
    let pending = match ledger.stage_csv(&text).await {
        Ok(pending) => pending,
        Err(e @ LedgerError::Csv(CsvError::UnrecognizedFormat { .. })) => {
            let known: Vec<&str> = ledger
                .profiles()
                .profiles()
                .iter()
                .map(|p| p.name.as_str())
                .collect();
            return Err(anyhow::Error::new(e).context(format!(
                "No CSV format matched; known formats: {}",
                known.join(", ")
            )));
        }
        Err(e) => return Err(e.into()),
    };

    println!("Detected format: {}", pending.profile());
    for skipped in pending.skipped() {
        println!("  skipped line {}: {}", skipped.line, skipped.reason);
    }
    if pending.duplicates() > 0 {
        println!("  {} entries already in the ledger", pending.duplicates());
    }
    if pending.is_empty() {
        println!("Nothing new to import.");
        return Ok(());
    }

    for entry in pending.entries() {
        println!(
            "  {}  {:<32}  {:<18}  {:>12}",
            entry.date.format("%m/%d/%y"),
            truncate(&entry.description, 32),
            truncate(&entry.category, 18),
            entry.amount.to_string()
        );
    }

    let prompt = format!(
        "Import {} entries totalling {}{}?",
        pending.len(),
        pending.total(),
        if reconciled { " as reconciled" } else { "" }
    );
    if !confirm(&prompt, yes)? {
        println!("Import cancelled.");
        return Ok(());
    }

    let summary = ledger.commit_import(pending, reconciled).await?;
    if summary.duplicates > 0 {
        println!(
            "  {} entries were added by another import in the meantime",
            summary.duplicates
        );
    }
    println!("Imported {} entries.", summary.ids.len());
    Ok(())
}

pub async fn export(ledger: &CliLedger, out: &Path) -> Result<()> {
    let document = ledger.export().await?;
    std::fs::create_dir_all(out)
        .with_context(|| format!("Failed to create output directory: {}", out.display()))?;
    let path = out.join(&document.file_name);
    std::fs::write(&path, document.contents)
        .with_context(|| format!("Failed to write export: {}", path.display()))?;
    println!("Exported ledger to {}", path.display());
    Ok(())
}

pub async fn import_json(ledger: &CliLedger, file: &Path, yes: bool) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read ledger file: {}", file.display()))?;
    let entries = parse_document(&text)?;
    let current = ledger.entries().await?.len();

    let prompt = format!(
        "Replace all {current} current entries with {} entries from {}?",
        entries.len(),
        file.display()
    );
    if !confirm(&prompt, yes)? {
        println!("Import cancelled.");
        return Ok(());
    }

    let count = ledger.replace_all(Confirmed::new(entries)).await?;
    println!("Ledger replaced with {count} entries.");
    Ok(())
}

pub async fn suggest(ledger: &CliLedger) -> Result<()> {
    let suggestions = ledger.suggestions().await?;
    println!("Descriptions:");
    for d in &suggestions.descriptions {
        println!("  {d}");
    }
    println!("Categories:");
    for c in &suggestions.categories {
        println!("  {c}");
    }
    Ok(())
}

fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    ask(prompt, &mut stdin.lock(), &mut stdout)
}

fn ask(prompt: &str, input: &mut impl BufRead, output: &mut impl Write) -> Result<bool> {
    write!(output, "{prompt} [y/N] ")?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
