use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::{debug, info, warn};

use super::dates::{format_due_date, parse_due_date};
use super::{Bucket, Ledger, LedgerEntry};
use crate::error::WatchError;
use crate::registry::write_atomic;

pub const ACTIVE_SHEET: &str = "Active";
pub const PAST_DUE_SHEET: &str = "PastDue";

const HEADERS: [&str; 6] = [
    "job_key",
    "title",
    "submission_count",
    "status",
    "due_date",
    "first_seen_date",
];

const FIRST_SEEN_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn write_workbook(path: &Path, ledger: &Ledger) -> Result<()> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    for (name, entries) in [
        (ACTIVE_SHEET, ledger.active()),
        (PAST_DUE_SHEET, ledger.past_due()),
    ] {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        write_sheet(sheet, entries, &header)?;
    }

    let bytes = workbook
        .save_to_buffer()
        .context("serializing ledger workbook")?;
    write_atomic(path, &bytes)
}

fn write_sheet(sheet: &mut Worksheet, entries: &[LedgerEntry], header: &Format) -> Result<()> {
    for (col, name) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, header)?;
    }

    for (idx, entry) in entries.iter().enumerate() {
        let row = idx as u32 + 1;
        sheet.write_string(row, 0, &entry.job_key)?;
        sheet.write_string(row, 1, &entry.title)?;
        if let Some(count) = entry.submission_count {
            sheet.write_number(row, 2, count as f64)?;
        }
        sheet.write_string(row, 3, entry.bucket.label())?;
        if let Some(due) = entry.due_date {
            sheet.write_string(row, 4, format_due_date(due))?;
        }
        sheet.write_string(
            row,
            5,
            entry.first_seen_date.format(FIRST_SEEN_FORMAT).to_string(),
        )?;
    }

    sheet.set_freeze_panes(1, 0)?;
    sheet.autofit();
    Ok(())
}

/// Read both sheets; any unreadable part is treated as empty.
pub(crate) fn read_workbook(path: &Path, today: NaiveDate) -> Ledger {
    if !path.exists() {
        info!("No ledger at {:?}, starting empty", path);
        return Ledger::new();
    }

    let mut workbook: Xlsx<_> = match open_workbook(path) {
        Ok(wb) => wb,
        Err(e) => {
            warn!(
                "{}; starting with an empty ledger",
                WatchError::CorruptState {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            );
            return Ledger::new();
        }
    };

    let mut entries = Vec::new();
    for (name, bucket) in [
        (ACTIVE_SHEET, Bucket::Active),
        (PAST_DUE_SHEET, Bucket::PastDue),
    ] {
        match workbook.worksheet_range(name) {
            Ok(range) => {
                let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
                entries.extend(read_rows(&rows, bucket, today));
            }
            Err(e) => warn!("Ledger sheet '{}' unreadable in {:?}: {}", name, path, e),
        }
    }

    let ledger = Ledger::from_entries(entries);
    debug!("Loaded {} ledger entries from {:?}", ledger.len(), path);
    ledger
}

fn read_rows(rows: &[Vec<Data>], bucket: Bucket, today: NaiveDate) -> Vec<LedgerEntry> {
    let Some((header, body)) = rows.split_first() else {
        return Vec::new();
    };
    let columns: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| (cell_text(cell).to_ascii_lowercase(), idx))
        .collect();
    let Some(&key_col) = columns.get("job_key") else {
        warn!("Ledger sheet has no job_key column, ignoring it");
        return Vec::new();
    };
    let cell = |row: &[Data], name: &str| -> Option<Data> {
        columns.get(name).and_then(|&idx| row.get(idx)).cloned()
    };

    body.iter()
        .filter_map(|row| {
            let job_key = row.get(key_col).map(cell_text)?;
            if job_key.is_empty() {
                return None;
            }
            let title = cell(row, "title").map(|c| cell_text(&c)).unwrap_or_default();
            let submission_count = cell(row, "submission_count").and_then(|c| cell_count(&c));
            let due_date = cell(row, "due_date")
                .map(|c| cell_text(&c))
                .and_then(|raw| parse_due_date(&raw, today));
            let first_seen_date = cell(row, "first_seen_date")
                .map(|c| cell_text(&c))
                .and_then(|raw| NaiveDate::parse_from_str(&raw, FIRST_SEEN_FORMAT).ok())
                .unwrap_or(today);

            Some(LedgerEntry {
                job_key,
                title,
                due_date,
                submission_count,
                bucket,
                first_seen_date,
            })
        })
        .collect()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

fn cell_count(cell: &Data) -> Option<u64> {
    match cell {
        Data::Int(i) if *i >= 0 => Some(*i as u64),
        Data::Float(f) if *f >= 0.0 => Some(f.round() as u64),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
