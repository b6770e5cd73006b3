//! Schedule line tokenizer.
//!
//! A line is first split into lexemes (digit runs, word runs, single symbols),
//! then a small grammar folds lexeme sequences into typed tokens. Dates and
//! scores use different delimiters (`/` or a hyphen triple for dates, a single
//! hyphen pair for scores), so `12-07-2024` is always a date and never a 12-7
//! score.

use chrono::NaiveDate;

use crate::dataset::{ResultMark, SeasonWindow, Venue};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Date(NaiveDate),
    /// Month/day written without a year that the season window could not place.
    YearlessDate { month: u32, day: u32 },
    Score(u32, u32),
    Result(ResultMark),
    /// "at", "@", "vs", "neutral"
    Venue(Venue),
    /// Lone H/A/N column marker; weaker than a venue word.
    VenueLetter(Venue),
    Word(String),
    /// Times, weekday names, stray numbers and punctuation.
    Noise(String),
}

impl Token {
    pub fn is_date(&self) -> bool {
        matches!(self, Token::Date(_) | Token::YearlessDate { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Lexeme {
    Num(String),
    Word(String),
    Sym(char),
}

/// Map exotic spaces and dashes to ASCII, collapse whitespace, trim.
pub fn normalize_line(s: &str) -> String {
    let mapped: String = s
        .chars()
        .map(|c| match c {
            '\u{00a0}' | '\u{2007}' | '\u{2009}' | '\u{202f}' => ' ',
            '\u{2010}'..='\u{2015}' | '\u{2212}' => '-',
            c => c,
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn lex(line: &str) -> Vec<Lexeme> {
    let mut out = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() {
            let mut n = String::new();
            while let Some(&d) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                n.push(d);
                chars.next();
            }
            out.push(Lexeme::Num(n));
        } else if c.is_alphabetic() {
            let mut w = String::new();
            while let Some(&d) = chars.peek() {
                if !(d.is_alphabetic() || d == '\'' || d == '.' || d == '&') {
                    break;
                }
                w.push(d);
                chars.next();
            }
            out.push(Lexeme::Word(w));
        } else {
            out.push(Lexeme::Sym(c));
            chars.next();
        }
    }
    out
}

/// Tokenize one normalised schedule line.
///
/// Scores above `max_score` (or longer than two digits) never become `Score`
/// tokens. Yearless dates are placed with `window` when possible.
pub fn tokenize(line: &str, window: &SeasonWindow, max_score: u32) -> Vec<Token> {
    let lx = lex(line);
    let mut tokens = Vec::with_capacity(lx.len());
    let mut i = 0;

    while i < lx.len() {
        match &lx[i] {
            Lexeme::Num(a) => {
                let (token, used) = numeric_token(&lx, i, a, window, max_score);
                tokens.push(token);
                i += used;
            }
            Lexeme::Word(w) => {
                if let Some((token, used)) = month_name_date(&lx, i, w, window) {
                    tokens.push(token);
                    i += used;
                } else {
                    tokens.push(classify_word(w));
                    i += 1;
                }
            }
            Lexeme::Sym('@') => {
                tokens.push(Token::Venue(Venue::Away));
                i += 1;
            }
            Lexeme::Sym(c) => {
                tokens.push(Token::Noise(c.to_string()));
                i += 1;
            }
        }
    }
    tokens
}

/// First date found in `text`, if any. Used for CSV date cells.
pub fn parse_date(text: &str, window: &SeasonWindow) -> Option<NaiveDate> {
    tokenize(&normalize_line(text), window, 99)
        .into_iter()
        .find_map(|t| match t {
            Token::Date(d) => Some(d),
            _ => None,
        })
}

// ── Grammar helpers ──────────────────────────────────────────────────────────

fn num_at(lx: &[Lexeme], i: usize) -> Option<&str> {
    match lx.get(i) {
        Some(Lexeme::Num(n)) => Some(n.as_str()),
        _ => None,
    }
}

fn sym_at(lx: &[Lexeme], i: usize, c: char) -> bool {
    matches!(lx.get(i), Some(Lexeme::Sym(s)) if *s == c)
}

fn numeric_token(
    lx: &[Lexeme],
    i: usize,
    a: &str,
    window: &SeasonWindow,
    max_score: u32,
) -> (Token, usize) {
    // M/D/Y or M/D
    if sym_at(lx, i + 1, '/') {
        if let Some(b) = num_at(lx, i + 2) {
            if sym_at(lx, i + 3, '/') {
                if let Some(c) = num_at(lx, i + 4) {
                    let tok = ymd(c, a, b)
                        .map(Token::Date)
                        .unwrap_or_else(|| Token::Noise(format!("{}/{}/{}", a, b, c)));
                    return (tok, 5);
                }
            }
            return (month_day(a, b, window), 3);
        }
    }

    if sym_at(lx, i + 1, '-') {
        if let Some(b) = num_at(lx, i + 2) {
            // Hyphen triples are date fragments: YYYY-MM-DD or MM-DD-YYYY.
            if sym_at(lx, i + 3, '-') || sym_at(lx, i + 3, '/') {
                if let Some(c) = num_at(lx, i + 4) {
                    let date = if sym_at(lx, i + 3, '/') {
                        None
                    } else if a.len() == 4 {
                        ymd(a, b, c)
                    } else {
                        ymd(c, a, b)
                    };
                    let tok = date
                        .map(Token::Date)
                        .unwrap_or_else(|| Token::Noise(format!("{}-{}-{}", a, b, c)));
                    return (tok, 5);
                }
            }
            let tok = score_pair(a, b, max_score)
                .map(|(gf, ga)| Token::Score(gf, ga))
                .unwrap_or_else(|| Token::Noise(format!("{}-{}", a, b)));
            return (tok, 3);
        }
    }

    // clock times ("7:00")
    if sym_at(lx, i + 1, ':') {
        if let Some(b) = num_at(lx, i + 2) {
            return (Token::Noise(format!("{}:{}", a, b)), 3);
        }
    }

    (Token::Noise(a.to_string()), 1)
}

fn score_pair(a: &str, b: &str, max_score: u32) -> Option<(u32, u32)> {
    if a.len() > 2 || b.len() > 2 {
        return None;
    }
    let gf: u32 = a.parse().ok()?;
    let ga: u32 = b.parse().ok()?;
    (gf <= max_score && ga <= max_score).then_some((gf, ga))
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    let year: i32 = match y.len() {
        2 => 2000 + y.parse::<i32>().ok()?,
        4 => y.parse().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, m.parse().ok()?, d.parse().ok()?)
}

fn month_day(m: &str, d: &str, window: &SeasonWindow) -> Token {
    match (m.parse::<u32>(), d.parse::<u32>()) {
        (Ok(month), Ok(day)) if (1..=12).contains(&month) && (1..=31).contains(&day) => window
            .resolve_year(month, day)
            .map(Token::Date)
            .unwrap_or(Token::YearlessDate { month, day }),
        _ => Token::Noise(format!("{}/{}", m, d)),
    }
}

fn month_number(key: &str) -> Option<u32> {
    let m = match key {
        "jan" | "january" => 1,
        "feb" | "february" => 2,
        "mar" | "march" => 3,
        "apr" | "april" => 4,
        "may" => 5,
        "jun" | "june" => 6,
        "jul" | "july" => 7,
        "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" => 10,
        "nov" | "november" => 11,
        "dec" | "december" => 12,
        _ => return None,
    };
    Some(m)
}

/// "Jan 5", "January 5, 2024", "Sept. 5 2024"
fn month_name_date(
    lx: &[Lexeme],
    i: usize,
    word: &str,
    window: &SeasonWindow,
) -> Option<(Token, usize)> {
    let month = month_number(&word.trim_end_matches('.').to_lowercase())?;
    let day_str = num_at(lx, i + 1).filter(|d| d.len() <= 2)?;
    let day: u32 = day_str.parse().ok()?;

    let year_at = |j: usize| num_at(lx, j).filter(|y| y.len() == 4);
    let (year, used) = if sym_at(lx, i + 2, ',') && year_at(i + 3).is_some() {
        (year_at(i + 3), 4)
    } else if year_at(i + 2).is_some() {
        (year_at(i + 2), 3)
    } else {
        (None, 2)
    };

    let token = match year.and_then(|y| y.parse::<i32>().ok()) {
        Some(y) => NaiveDate::from_ymd_opt(y, month, day)
            .map(Token::Date)
            .unwrap_or_else(|| Token::Noise(format!("{} {}", word, day_str))),
        None if (1..=31).contains(&day) => window
            .resolve_year(month, day)
            .map(Token::Date)
            .unwrap_or(Token::YearlessDate { month, day }),
        None => Token::Noise(format!("{} {}", word, day_str)),
    };
    Some((token, used))
}

fn classify_word(w: &str) -> Token {
    let bare = w.trim_end_matches('.');
    let key = bare.to_lowercase();

    match key.as_str() {
        "at" => return Token::Venue(Venue::Away),
        "vs" | "v" | "versus" => return Token::Venue(Venue::Home),
        "neutral" => return Token::Venue(Venue::Neutral),
        _ => {}
    }

    if bare.chars().count() == 1 {
        if let Some(mark) = ResultMark::from_letter(bare) {
            return Token::Result(mark);
        }
        match bare {
            "H" => return Token::VenueLetter(Venue::Home),
            "A" => return Token::VenueLetter(Venue::Away),
            "N" => return Token::VenueLetter(Venue::Neutral),
            _ => {}
        }
    }

    match key.as_str() {
        "mon" | "monday" | "tue" | "tues" | "tuesday" | "wed" | "wednesday" | "thu" | "thur"
        | "thurs" | "thursday" | "fri" | "friday" | "sat" | "saturday" | "sun" | "sunday"
        | "am" | "pm" | "ot" | "tbd" | "tba" => Token::Noise(w.to_string()),
        _ => Token::Word(w.to_string()),
    }
}
