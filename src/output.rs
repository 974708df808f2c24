use std::cmp::Ordering;
use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use itertools::Itertools;
use tabled::{settings::Style, Table, Tabled};

use crate::data::SignalStatus;
use crate::scanner::{ScanOutcome, ScanRow};

const CSV_HEADER: [&str; 7] = [
    "symbol",
    "status",
    "live_level",
    "live_touches",
    "cand_level",
    "cand_touches",
    "distance",
];

#[derive(Tabled)]
struct SignalRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Touches")]
    touches: String,
    #[tabled(rename = "Cand Level")]
    cand_level: String,
    #[tabled(rename = "Cand Touches")]
    cand_touches: String,
    #[tabled(rename = "Distance")]
    distance: String,
}

impl SignalRow {
    fn from_scan(row: &ScanRow) -> Self {
        match &row.outcome {
            ScanOutcome::Signal(signal) => Self {
                symbol: row.symbol.clone(),
                status: signal.status.to_string(),
                level: signal
                    .live_level
                    .map_or_else(|| "-".to_string(), format_price),
                touches: match signal.candidate {
                    Some(_) => signal.live_touches.to_string(),
                    None => "-".to_string(),
                },
                cand_level: signal
                    .candidate
                    .map_or_else(|| "-".to_string(), |c| format_price(c.price)),
                cand_touches: signal
                    .candidate
                    .map_or_else(|| "-".to_string(), |c| c.touches.to_string()),
                distance: signal
                    .distance
                    .map_or_else(|| "-".to_string(), format_price),
            },
            ScanOutcome::Failed(message) => Self {
                symbol: row.symbol.clone(),
                status: format!("error: {message}"),
                level: "-".to_string(),
                touches: "-".to_string(),
                cand_level: "-".to_string(),
                cand_touches: "-".to_string(),
                distance: "-".to_string(),
            },
        }
    }
}

fn format_price(value: f64) -> String {
    if value == 0.0 {
        "0.00".to_string()
    } else if value.abs() >= 1.0 {
        format!("{value:.2}")
    } else {
        format!("{value:.6}")
    }
}

fn status_rank(row: &ScanRow) -> u8 {
    match &row.outcome {
        ScanOutcome::Signal(signal) => match signal.status {
            SignalStatus::Breakout => 0,
            SignalStatus::Near => 1,
            SignalStatus::NoLevel => 2,
        },
        ScanOutcome::Failed(_) => 3,
    }
}

fn distance(row: &ScanRow) -> Option<f64> {
    match &row.outcome {
        ScanOutcome::Signal(signal) => signal.distance,
        ScanOutcome::Failed(_) => None,
    }
}

/// Orders rows the way the report reads: breakouts first, then near levels,
/// then symbols without a level, failures last. Within a status, rows sort
/// by signed distance and then by symbol.
pub fn sorted_rows(rows: Vec<ScanRow>) -> Vec<ScanRow> {
    rows.into_iter()
        .sorted_by(|a, b| {
            status_rank(a)
                .cmp(&status_rank(b))
                .then_with(|| match (distance(a), distance(b)) {
                    (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                })
                .then_with(|| a.symbol.cmp(&b.symbol))
        })
        .collect()
}

pub fn print_report(rows: &[ScanRow]) {
    if rows.is_empty() {
        println!("No markets scanned.");
        return;
    }

    let table_rows: Vec<SignalRow> = rows.iter().map(SignalRow::from_scan).collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("\n{table}\n");

    let mut breakouts = 0;
    let mut near = 0;
    let mut errors = 0;
    for row in rows {
        match &row.outcome {
            ScanOutcome::Signal(signal) if signal.status == SignalStatus::Breakout => {
                breakouts += 1;
            }
            ScanOutcome::Signal(signal) if signal.status == SignalStatus::Near => near += 1,
            ScanOutcome::Failed(_) => errors += 1,
            _ => {}
        }
    }
    println!(
        "{} markets | {breakouts} breakouts | {near} near | {errors} errors",
        rows.len()
    );
}

/// Writes the rows as CSV with the report's column layout. Numbers keep full
/// precision; absent fields stay empty.
pub fn write_csv<P: AsRef<Path>>(rows: &[ScanRow], path: P) -> Result<()> {
    let file = File::create(path.as_ref())
        .with_context(|| format!("failed to create {}", path.as_ref().display()))?;
    write_csv_to(rows, file)
}

fn write_csv_to<W: io::Write>(rows: &[ScanRow], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;
    for row in rows {
        csv_writer.write_record(csv_record(row))?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn csv_record(row: &ScanRow) -> [String; 7] {
    match &row.outcome {
        ScanOutcome::Signal(signal) => [
            row.symbol.clone(),
            signal.status.to_string(),
            signal
                .live_level
                .map_or_else(String::new, |v| v.to_string()),
            signal.live_touches.to_string(),
            signal
                .candidate
                .map_or_else(String::new, |c| c.price.to_string()),
            signal
                .candidate
                .map_or_else(String::new, |c| c.touches.to_string()),
            signal.distance.map_or_else(String::new, |v| v.to_string()),
        ],
        ScanOutcome::Failed(message) => [
            row.symbol.clone(),
            format!("error: {message}"),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ],
    }
}
