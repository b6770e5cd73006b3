use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a game was played, from the schedule owner's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    Home,
    Away,
    Neutral,
}

impl Venue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Home => "Home",
            Venue::Away => "Away",
            Venue::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Venue {
    type Err = String;

    /// Accepts CSV labels ("Home") as well as schedule markers ("vs", "@", "N").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_end_matches('.').to_lowercase().as_str() {
            "home" | "h" | "vs" | "v" | "versus" => Ok(Venue::Home),
            "away" | "a" | "at" | "@" => Ok(Venue::Away),
            "neutral" | "n" => Ok(Venue::Neutral),
            other => Err(format!("unknown venue '{}'", other)),
        }
    }
}

/// Outcome of a decided game. Ties do not occur in this sport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameResult {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "L")]
    Loss,
}

impl GameResult {
    /// `Win` iff `goals_for > goals_against`; `None` on a level score.
    pub fn from_goals(goals_for: u32, goals_against: u32) -> Option<Self> {
        match goals_for.cmp(&goals_against) {
            std::cmp::Ordering::Greater => Some(GameResult::Win),
            std::cmp::Ordering::Less => Some(GameResult::Loss),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameResult::Win => "W",
            GameResult::Loss => "L",
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result letter as printed on the schedule. Unlike `GameResult` it can say "T".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultMark {
    Win,
    Loss,
    Tie,
}

impl ResultMark {
    pub fn from_letter(s: &str) -> Option<Self> {
        match s.trim() {
            "W" | "w" => Some(ResultMark::Win),
            "L" | "l" => Some(ResultMark::Loss),
            "T" | "t" => Some(ResultMark::Tie),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultMark::Win => "W",
            ResultMark::Loss => "L",
            ResultMark::Tie => "T",
        }
    }

    /// Whether the printed letter agrees with a computed result.
    pub fn agrees_with(&self, result: GameResult) -> bool {
        matches!(
            (self, result),
            (ResultMark::Win, GameResult::Win) | (ResultMark::Loss, GameResult::Loss)
        )
    }
}

impl From<GameResult> for ResultMark {
    fn from(r: GameResult) -> Self {
        match r {
            GameResult::Win => ResultMark::Win,
            GameResult::Loss => ResultMark::Loss,
        }
    }
}

/// Candidate row as produced by the extractor (or read back from `games.csv`),
/// before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawGame {
    pub date: NaiveDate,
    pub opponent: String,
    pub venue: Venue,
    /// Result letter printed next to the score, if any
    pub asserted: Option<ResultMark>,
    pub goals_for: u32,
    pub goals_against: u32,
    /// 1-based source page, when known
    pub page: Option<usize>,
    /// Source text the row was recognised from
    pub raw: String,
}

/// One validated game of the season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub date: NaiveDate,
    pub opponent: String,
    pub venue: Venue,
    pub result: GameResult,
    pub goals_for: u32,
    pub goals_against: u32,
}

impl GameRecord {
    /// Signed goal margin (positive on a win).
    pub fn margin(&self) -> i64 {
        self.goals_for as i64 - self.goals_against as i64
    }
}

impl From<&GameRecord> for RawGame {
    fn from(g: &GameRecord) -> Self {
        RawGame {
            date: g.date,
            opponent: g.opponent.clone(),
            venue: g.venue,
            asserted: Some(g.result.into()),
            goals_for: g.goals_for,
            goals_against: g.goals_against,
            page: None,
            raw: String::new(),
        }
    }
}

/// Collapse whitespace, trim, and case-fold an opponent name for comparison.
pub fn opponent_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Calendar range of the actual season; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeasonWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl SeasonWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        SeasonWindow { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    pub fn is_bounded(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// Place a yearless month/day inside the window.
    ///
    /// Tries the start year, then the end year. Returns `None` when the window
    /// has no bounds, or when neither candidate falls inside it.
    pub fn resolve_year(&self, month: u32, day: u32) -> Option<NaiveDate> {
        let mut years: Vec<i32> = Vec::with_capacity(2);
        if let Some(s) = self.start {
            years.push(s.year());
        }
        if let Some(e) = self.end {
            if !years.contains(&e.year()) {
                years.push(e.year());
            }
        }
        years
            .into_iter()
            .filter_map(|y| NaiveDate::from_ymd_opt(y, month, day))
            .find(|d| self.contains(*d))
    }
}
