use tracing::debug;

use super::source::Page;
use super::tokenizer::{normalize_line, tokenize, Token};
use crate::dataset::{RawGame, SeasonWindow, Venue};

/// Why a line (or merged pair of lines) did not form a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LineMiss {
    #[error("no date")]
    NoDate,
    #[error("date {month}/{day} has no year inside the season window")]
    YearlessDate { month: u32, day: u32 },
    #[error("more than one date")]
    MultipleDates,
    #[error("no score")]
    NoScore,
    #[error("no opponent")]
    NoOpponent,
    #[error("no venue marker")]
    NoVenue,
}

#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    pub window: SeasonWindow,
    pub max_score: u32,
    /// Venue for lines that carry no marker at all
    pub default_venue: Option<Venue>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            window: SeasonWindow::default(),
            max_score: 35,
            default_venue: None,
        }
    }
}

/// A line that held a date or score but did not validate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub page: usize,
    pub text: String,
    pub reason: LineMiss,
}

/// Candidate games in document order plus an account of what was skipped.
#[derive(Debug, Default)]
pub struct Extraction {
    pub games: Vec<RawGame>,
    pub lines_scanned: usize,
    /// Lines that matched no game, alone or merged
    pub unmatched: usize,
    /// Games built from two physical lines
    pub merged: usize,
    pub fragments: Vec<Fragment>,
}

/// Build one candidate game from a line of schedule text.
///
/// The line must carry exactly one date, a score, an opponent and a venue
/// (or a default venue). The first score and first result letter win.
pub fn recognize(text: &str, page: usize, opts: &ExtractOptions) -> Result<RawGame, LineMiss> {
    let tokens = tokenize(text, &opts.window, opts.max_score);

    let date_positions: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_date())
        .map(|(i, _)| i)
        .collect();
    if date_positions.len() > 1 {
        return Err(LineMiss::MultipleDates);
    }
    let date_idx = *date_positions.first().ok_or(LineMiss::NoDate)?;
    let date = match tokens[date_idx] {
        Token::Date(d) => d,
        Token::YearlessDate { month, day } => return Err(LineMiss::YearlessDate { month, day }),
        _ => return Err(LineMiss::NoDate),
    };

    let (score_idx, goals_for, goals_against) = tokens
        .iter()
        .enumerate()
        .find_map(|(i, t)| match t {
            Token::Score(gf, ga) => Some((i, *gf, *ga)),
            _ => None,
        })
        .ok_or(LineMiss::NoScore)?;

    let result = tokens.iter().enumerate().find_map(|(i, t)| match t {
        Token::Result(m) => Some((i, *m)),
        _ => None,
    });

    let stop = result.map_or(score_idx, |(i, _)| i.min(score_idx));
    let opponent = opponent_between(&tokens, date_idx + 1, stop)
        .or_else(|| opponent_between(&tokens, 0, tokens.len()))
        .ok_or(LineMiss::NoOpponent)?;

    let venue = resolve_venue(&tokens)
        .or(opts.default_venue)
        .ok_or(LineMiss::NoVenue)?;

    Ok(RawGame {
        date,
        opponent,
        venue,
        asserted: result.map(|(_, m)| m),
        goals_for,
        goals_against,
        page: Some(page),
        raw: text.to_string(),
    })
}

fn opponent_between(tokens: &[Token], from: usize, to: usize) -> Option<String> {
    if from >= to {
        return None;
    }
    let words: Vec<&str> = tokens[from..to]
        .iter()
        .filter_map(|t| match t {
            Token::Word(w) => Some(w.as_str()),
            _ => None,
        })
        .collect();
    let name = words
        .join(" ")
        .trim_matches(|c: char| c.is_whitespace() || "-:|,=".contains(c))
        .to_string();
    name.chars().any(char::is_alphabetic).then_some(name)
}

/// Neutral beats away beats home; bare H/A/N letters come last.
fn resolve_venue(tokens: &[Token]) -> Option<Venue> {
    let has = |v: Venue| tokens.iter().any(|t| *t == Token::Venue(v));
    if has(Venue::Neutral) {
        Some(Venue::Neutral)
    } else if has(Venue::Away) {
        Some(Venue::Away)
    } else if has(Venue::Home) {
        Some(Venue::Home)
    } else {
        tokens.iter().find_map(|t| match t {
            Token::VenueLetter(v) => Some(*v),
            _ => None,
        })
    }
}

/// Whether a line carries a date and whether it carries a score.
fn line_shape(text: &str, opts: &ExtractOptions) -> (bool, bool) {
    let tokens = tokenize(text, &opts.window, opts.max_score);
    (
        tokens.iter().any(Token::is_date),
        tokens.iter().any(|t| matches!(t, Token::Score(..))),
    )
}

fn is_fragment(text: &str, opts: &ExtractOptions) -> bool {
    let (date, score) = line_shape(text, opts);
    date || score
}

/// Head of a two-line record: a date and no score, followed by a line with a
/// score and no date.
fn is_split_record(head: &str, tail: &str, opts: &ExtractOptions) -> bool {
    line_shape(head, opts) == (true, false) && line_shape(tail, opts) == (false, true)
}

/// Scan every page and collect candidate games in document order.
pub fn parse_pages(pages: &[Page], opts: &ExtractOptions) -> Extraction {
    let mut out = Extraction::default();
    for page in pages {
        parse_page(page, opts, &mut out);
    }
    out
}

/// Single-line records are taken as they are. A date line without a score is
/// merged with the next line only when that line has a score and no date, and
/// the merged text validates.
fn parse_page(page: &Page, opts: &ExtractOptions, out: &mut Extraction) {
    let lines: Vec<String> = page
        .text
        .lines()
        .map(normalize_line)
        .filter(|l| !l.is_empty())
        .collect();
    out.lines_scanned += lines.len();

    let mut i = 0;
    while i < lines.len() {
        let miss = match recognize(&lines[i], page.number, opts) {
            Ok(game) => {
                out.games.push(game);
                i += 1;
                continue;
            }
            Err(miss) => miss,
        };

        if let Some(next) = lines.get(i + 1) {
            if is_split_record(&lines[i], next, opts) {
                let joined = format!("{} {}", lines[i], next);
                if let Ok(game) = recognize(&joined, page.number, opts) {
                    out.games.push(game);
                    out.merged += 1;
                    i += 2;
                    continue;
                }
            }
        }

        out.unmatched += 1;
        if is_fragment(&lines[i], opts) {
            debug!("page {}: skipped '{}' ({})", page.number, lines[i], miss);
            out.fragments.push(Fragment {
                page: page.number,
                text: lines[i].clone(),
                reason: miss,
            });
        }
        i += 1;
    }
}
