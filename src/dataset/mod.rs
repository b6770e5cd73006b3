use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

pub mod models;
pub use models::*;

use crate::extract::tokenizer::parse_date;

/// Raw extraction table written by `extract`.
pub const RAW_FILE: &str = "games.csv";
/// Cleaned rows with their source page and text, for tracing back to the document.
pub const CLEAN_FILE: &str = "games_clean.csv";
/// Tidy table consumed by the Q&A step.
pub const FINAL_FILE: &str = "games_final.csv";

/// A `games.csv` row that could not be turned into a `RawGame`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("line {line}: unreadable date '{value}'")]
    Date { line: usize, value: String },
    #[error("line {line}: unreadable {column} '{value}'")]
    Goals {
        line: usize,
        column: &'static str,
        value: String,
    },
    #[error("line {line}: no venue for opponent '{opponent}'")]
    Venue { line: usize, opponent: String },
    #[error("line {line}: {message}")]
    Csv { line: usize, message: String },
}

/// Rows loaded from a CSV file, with the ones that had to be skipped.
#[derive(Debug, Default)]
pub struct LoadedRows {
    pub games: Vec<RawGame>,
    pub unreadable: Vec<RowError>,
}

// ── Writing ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct RawCsvRow<'a> {
    date: String,
    opponent: &'a str,
    venue: &'a str,
    result: &'a str,
    goals_for: u32,
    goals_against: u32,
    page: Option<usize>,
    raw: &'a str,
}

const RAW_COLUMNS: [&str; 8] = [
    "date",
    "opponent",
    "venue",
    "result",
    "goals_for",
    "goals_against",
    "page",
    "raw",
];

fn write_rows<'a>(path: &Path, rows: impl Iterator<Item = RawCsvRow<'a>>) -> Result<()> {
    // header written by hand so an empty table still has one
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    wtr.write_record(RAW_COLUMNS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the raw extraction table (`date, opponent, venue, result, goals_for,
/// goals_against, page, raw`) in document order. `result` is the printed mark.
pub fn write_raw_games(path: &Path, games: &[RawGame]) -> Result<()> {
    write_rows(
        path,
        games.iter().map(|g| RawCsvRow {
            date: g.date.format("%Y-%m-%d").to_string(),
            opponent: &g.opponent,
            venue: g.venue.as_str(),
            result: g.asserted.map(|m| m.as_str()).unwrap_or(""),
            goals_for: g.goals_for,
            goals_against: g.goals_against,
            page: g.page,
            raw: &g.raw,
        }),
    )
}

/// Write cleaned games with the page and source text of each, same columns as
/// the raw table but with the derived result.
pub fn write_clean_games(path: &Path, games: &[GameRecord], sources: &[RawGame]) -> Result<()> {
    write_rows(
        path,
        games.iter().zip(sources).map(|(g, src)| RawCsvRow {
            date: g.date.format("%Y-%m-%d").to_string(),
            opponent: &g.opponent,
            venue: g.venue.as_str(),
            result: g.result.as_str(),
            goals_for: g.goals_for,
            goals_against: g.goals_against,
            page: src.page,
            raw: &src.raw,
        }),
    )
}

/// Write the tidy table: `date, opponent, venue, result, goals_for, goals_against`.
pub fn write_final_games(path: &Path, games: &[GameRecord]) -> Result<()> {
    let text = final_csv_string(games)?;
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Render the tidy table as CSV text (also the payload sent to the language model).
pub fn final_csv_string(games: &[GameRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    if games.is_empty() {
        wtr.write_record([
            "date",
            "opponent",
            "venue",
            "result",
            "goals_for",
            "goals_against",
        ])?;
    }
    for g in games {
        wtr.serialize(g)?;
    }
    let bytes = wtr.into_inner().context("Failed to flush CSV buffer")?;
    Ok(String::from_utf8(bytes)?)
}

// ── Reading ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct InputRow {
    date: String,
    #[serde(alias = "team")]
    opponent: String,
    #[serde(default)]
    venue: String,
    #[serde(alias = "wl", default)]
    result: String,
    #[serde(alias = "gf")]
    goals_for: String,
    #[serde(alias = "ga")]
    goals_against: String,
    #[serde(default)]
    page: Option<usize>,
    #[serde(default)]
    raw: String,
}

/// Read a raw (`games.csv`) or tidy (`games_final.csv`) table.
///
/// Rows with an unreadable date, goal count or venue are skipped and listed in
/// `unreadable`. A blank venue is taken from an "at"/"vs" prefix on the
/// opponent, then from `default_venue`.
pub fn read_games(
    path: &Path,
    window: &SeasonWindow,
    default_venue: Option<Venue>,
) -> Result<LoadedRows> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut out = LoadedRows::default();
    for (idx, row) in rdr.deserialize::<InputRow>().enumerate() {
        // header is line 1
        let line = idx + 2;
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                out.unreadable.push(RowError::Csv {
                    line,
                    message: e.to_string(),
                });
                continue;
            }
        };
        match convert_row(line, row, window, default_venue) {
            Ok(g) => out.games.push(g),
            Err(e) => {
                debug!("Skipping row: {}", e);
                out.unreadable.push(e);
            }
        }
    }
    if !out.unreadable.is_empty() {
        warn!(
            "{} unreadable row(s) in {}",
            out.unreadable.len(),
            path.display()
        );
    }
    Ok(out)
}

fn convert_row(
    line: usize,
    row: InputRow,
    window: &SeasonWindow,
    default_venue: Option<Venue>,
) -> Result<RawGame, RowError> {
    let date = parse_date(&row.date, window).ok_or_else(|| RowError::Date {
        line,
        value: row.date.clone(),
    })?;
    let goals_for = parse_goals(line, "goals_for", &row.goals_for)?;
    let goals_against = parse_goals(line, "goals_against", &row.goals_against)?;

    let (prefix_venue, opponent) = split_venue_prefix(&row.opponent);
    let venue = row
        .venue
        .parse::<Venue>()
        .ok()
        .or(prefix_venue)
        .or(default_venue)
        .ok_or_else(|| RowError::Venue {
            line,
            opponent: row.opponent.clone(),
        })?;

    Ok(RawGame {
        date,
        opponent: opponent.to_string(),
        venue,
        asserted: ResultMark::from_letter(&row.result),
        goals_for,
        goals_against,
        page: row.page,
        raw: row.raw,
    })
}

fn parse_goals(line: usize, column: &'static str, value: &str) -> Result<u32, RowError> {
    // pandas writes integer columns with NaN holes as floats ("8.0")
    let v = value.trim();
    let v = v.strip_suffix(".0").unwrap_or(v);
    v.parse::<u32>().map_err(|_| RowError::Goals {
        line,
        column,
        value: value.to_string(),
    })
}

/// Split a leading "at"/"@"/"vs" marker off an opponent name.
pub fn split_venue_prefix(opponent: &str) -> (Option<Venue>, &str) {
    let s = opponent.trim_start_matches(|c: char| c == '=' || c == ' ').trim();
    if let Some(rest) = s.strip_prefix('@') {
        return (Some(Venue::Away), rest.trim());
    }
    if let Some((head, rest)) = s.split_once(char::is_whitespace) {
        let venue = match head.to_lowercase().as_str() {
            "at" => Some(Venue::Away),
            "vs" | "vs." => Some(Venue::Home),
            _ => None,
        };
        if venue.is_some() {
            return (venue, rest.trim());
        }
    }
    (None, s)
}
