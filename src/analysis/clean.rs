use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::dataset::{opponent_key, GameRecord, GameResult, RawGame, ResultMark, SeasonWindow};

/// Validation bounds for the cleaner.
#[derive(Debug, Clone, Copy)]
pub struct CleanOptions {
    pub window: SeasonWindow,
    pub min_score: u32,
    pub max_score: u32,
    /// Warn when the season window drops more than this many rows
    pub window_exclusion_warn: usize,
    /// Acceptance check: the number of games the season really had
    pub expected_games: Option<usize>,
}

impl Default for CleanOptions {
    fn default() -> Self {
        CleanOptions {
            window: SeasonWindow::default(),
            min_score: 1,
            max_score: 35,
            window_exclusion_warn: 3,
            expected_games: None,
        }
    }
}

/// Why a candidate row was dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("opponent '{0}' has no letters")]
    BadOpponent(String),
    #[error("date {0} outside season window")]
    OutsideSeason(NaiveDate),
    #[error("score {goals_for}-{goals_against} outside {min}..={max}")]
    ScoreOutOfBounds {
        goals_for: u32,
        goals_against: u32,
        min: u32,
        max: u32,
    },
    #[error("tied score {0}-{0}")]
    Tie(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub game: RawGame,
    pub reason: RejectReason,
}

/// Printed result letter that disagrees with the score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub date: NaiveDate,
    pub opponent: String,
    pub asserted: ResultMark,
    pub computed: GameResult,
    pub goals_for: u32,
    pub goals_against: u32,
}

/// Validated table plus an account of everything discarded or flagged.
#[derive(Debug, Default)]
pub struct CleanReport {
    /// Tidy table, ordered by date
    pub games: Vec<GameRecord>,
    /// Candidate row behind each entry of `games`, same order
    pub sources: Vec<RawGame>,
    pub rejected: Vec<Rejected>,
    /// Later occurrences of an already-seen (date, opponent)
    pub duplicates: Vec<RawGame>,
    pub mismatches: Vec<Mismatch>,
    pub warnings: Vec<String>,
}

impl CleanReport {
    pub fn window_exclusions(&self) -> usize {
        self.rejected
            .iter()
            .filter(|r| matches!(r.reason, RejectReason::OutsideSeason(_)))
            .count()
    }
}

/// Check one candidate against the bounds. Checks run opponent, window,
/// score bounds, tie; the first failure is reported.
pub fn validate(game: &RawGame, opts: &CleanOptions) -> Result<GameResult, RejectReason> {
    if !game.opponent.chars().any(char::is_alphabetic) {
        return Err(RejectReason::BadOpponent(game.opponent.clone()));
    }
    if !opts.window.contains(game.date) {
        return Err(RejectReason::OutsideSeason(game.date));
    }
    let bounds = opts.min_score..=opts.max_score;
    if !bounds.contains(&game.goals_for) || !bounds.contains(&game.goals_against) {
        return Err(RejectReason::ScoreOutOfBounds {
            goals_for: game.goals_for,
            goals_against: game.goals_against,
            min: opts.min_score,
            max: opts.max_score,
        });
    }
    GameResult::from_goals(game.goals_for, game.goals_against)
        .ok_or(RejectReason::Tie(game.goals_for))
}

fn tidy_opponent(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validate, deduplicate and order a raw candidate table.
///
/// Produces a new table; the input is never edited. `result` always comes
/// from the score, and a disagreeing printed letter is listed in
/// `mismatches`. Duplicates are by (date, case-folded opponent), first
/// occurrence kept.
pub fn clean_games(raw: &[RawGame], opts: &CleanOptions) -> CleanReport {
    let mut report = CleanReport::default();
    let mut seen: HashSet<(NaiveDate, String)> = HashSet::new();
    let mut kept: Vec<(GameRecord, RawGame)> = Vec::new();

    for game in raw {
        let result = match validate(game, opts) {
            Ok(r) => r,
            Err(reason) => {
                warn!(
                    "Rejected {} {} {}-{}: {}",
                    game.date, game.opponent, game.goals_for, game.goals_against, reason
                );
                report.rejected.push(Rejected {
                    game: game.clone(),
                    reason,
                });
                continue;
            }
        };

        if !seen.insert((game.date, opponent_key(&game.opponent))) {
            report.duplicates.push(game.clone());
            continue;
        }

        let opponent = tidy_opponent(&game.opponent);
        if let Some(mark) = game.asserted {
            if !mark.agrees_with(result) {
                warn!(
                    "Result mismatch {} {}: printed {} but score {}-{} is {}",
                    game.date,
                    opponent,
                    mark.as_str(),
                    game.goals_for,
                    game.goals_against,
                    result
                );
                report.mismatches.push(Mismatch {
                    date: game.date,
                    opponent: opponent.clone(),
                    asserted: mark,
                    computed: result,
                    goals_for: game.goals_for,
                    goals_against: game.goals_against,
                });
            }
        }

        let record = GameRecord {
            date: game.date,
            opponent: opponent.clone(),
            venue: game.venue,
            result,
            goals_for: game.goals_for,
            goals_against: game.goals_against,
        };
        kept.push((record, RawGame { opponent, ..game.clone() }));
    }

    // stable: same-day games keep document order
    kept.sort_by_key(|(g, _)| g.date);
    (report.games, report.sources) = kept.into_iter().unzip();

    let excluded = report.window_exclusions();
    if excluded > opts.window_exclusion_warn {
        report.warnings.push(format!(
            "season window excluded {} row(s), more than the expected {}; \
             check --season-start/--season-end",
            excluded, opts.window_exclusion_warn
        ));
    }
    if let Some(expected) = opts.expected_games {
        if report.games.len() != expected {
            report.warnings.push(format!(
                "{} game(s) survived cleaning but {} were expected; \
                 some schedule layouts may not be covered",
                report.games.len(),
                expected
            ));
        }
    }
    for w in &report.warnings {
        warn!("{}", w);
    }

    info!(
        "Cleaned {} candidate(s): {} kept, {} rejected, {} duplicate(s), {} mismatch(es)",
        raw.len(),
        report.games.len(),
        report.rejected.len(),
        report.duplicates.len(),
        report.mismatches.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Venue;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn raw(date: NaiveDate, opp: &str, gf: u32, ga: u32, mark: Option<ResultMark>) -> RawGame {
        RawGame {
            date,
            opponent: opp.into(),
            venue: Venue::Home,
            asserted: mark,
            goals_for: gf,
            goals_against: ga,
            page: Some(1),
            raw: String::new(),
        }
    }

    fn season() -> CleanOptions {
        CleanOptions {
            window: SeasonWindow::new(Some(d(2024, 2, 1)), Some(d(2024, 5, 31))),
            ..CleanOptions::default()
        }
    }

    #[test]
    fn result_follows_goals_for_every_kept_game() {
        let input = vec![
            raw(d(2024, 3, 2), "Navy", 8, 9, Some(ResultMark::Loss)),
            raw(d(2024, 3, 9), "Army", 10, 9, None),
        ];
        let out = clean_games(&input, &season());
        for g in &out.games {
            assert_eq!(g.result == GameResult::Win, g.goals_for > g.goals_against);
        }
    }

    #[test]
    fn rejects_window_bounds_ties_and_junk() {
        let input = vec![
            raw(d(2023, 12, 7), "Navy", 12, 7, None),
            raw(d(2024, 3, 2), "Army", 0, 9, None),
            raw(d(2024, 3, 3), "Duke", 40, 9, None),
            raw(d(2024, 3, 4), "Yale", 7, 7, Some(ResultMark::Tie)),
            raw(d(2024, 3, 5), "12 34", 7, 6, None),
            raw(d(2024, 3, 6), "Penn", 7, 6, None),
        ];
        let out = clean_games(&input, &season());
        assert_eq!(out.games.len(), 1);
        let reasons: Vec<&RejectReason> = out.rejected.iter().map(|r| &r.reason).collect();
        assert_eq!(reasons[0], &RejectReason::OutsideSeason(d(2023, 12, 7)));
        assert!(matches!(reasons[1], RejectReason::ScoreOutOfBounds { goals_for: 0, .. }));
        assert!(matches!(reasons[2], RejectReason::ScoreOutOfBounds { goals_for: 40, .. }));
        assert_eq!(reasons[3], &RejectReason::Tie(7));
        assert_eq!(reasons[4], &RejectReason::BadOpponent("12 34".into()));
        assert_eq!(out.window_exclusions(), 1);
    }

    #[test]
    fn duplicates_keep_first_occurrence_case_insensitively() {
        let input = vec![
            raw(d(2024, 3, 2), "Navy", 8, 9, None),
            raw(d(2024, 3, 2), "NAVY ", 9, 8, None),
            raw(d(2024, 3, 9), "Navy", 11, 9, None),
        ];
        let out = clean_games(&input, &season());
        assert_eq!(out.games.len(), 2);
        assert_eq!(out.duplicates.len(), 1);
        assert_eq!(out.games[0].goals_for, 8);
    }

    #[test]
    fn mismatch_is_reported_not_hidden() {
        let input = vec![
            raw(d(2024, 3, 2), "Navy", 8, 9, Some(ResultMark::Win)),
            raw(d(2024, 3, 9), "Army", 9, 8, Some(ResultMark::Tie)),
        ];
        let out = clean_games(&input, &season());
        assert_eq!(out.mismatches.len(), 2);
        assert_eq!(out.mismatches[0].asserted, ResultMark::Win);
        assert_eq!(out.mismatches[0].computed, GameResult::Loss);
        assert_eq!(out.games[0].result, GameResult::Loss);
    }

    #[test]
    fn output_is_ordered_by_date() {
        let input = vec![
            raw(d(2024, 4, 2), "Navy", 8, 9, None),
            raw(d(2024, 3, 2), "Army", 10, 9, None),
        ];
        let out = clean_games(&input, &season());
        assert_eq!(out.games[0].opponent, "Army");
    }

    #[test]
    fn sources_follow_the_sorted_games() {
        let mut late = raw(d(2024, 4, 2), "Navy  Academy", 8, 9, None);
        late.page = Some(2);
        late.raw = "4/2/2024 at Navy Academy L 8-9".into();
        let input = vec![late, raw(d(2024, 3, 2), "Army", 10, 9, None)];
        let out = clean_games(&input, &season());
        assert_eq!(out.sources.len(), out.games.len());
        assert_eq!(out.sources[1].page, Some(2));
        assert_eq!(out.sources[1].opponent, "Navy Academy");
        assert_eq!(out.sources[1].raw, "4/2/2024 at Navy Academy L 8-9");
    }

    #[test]
    fn cleaning_is_idempotent() {
        let input = vec![
            raw(d(2024, 4, 2), "Navy ", 8, 9, Some(ResultMark::Win)),
            raw(d(2024, 3, 2), "Army", 10, 9, None),
            raw(d(2024, 3, 2), "army", 10, 9, None),
            raw(d(2024, 1, 2), "Duke", 10, 9, None),
        ];
        let once = clean_games(&input, &season());
        let again_input: Vec<RawGame> = once.games.iter().map(RawGame::from).collect();
        let twice = clean_games(&again_input, &season());
        assert_eq!(once.games, twice.games);
        assert!(twice.duplicates.is_empty());
        assert!(twice.rejected.is_empty());
        assert!(twice.mismatches.is_empty());
    }

    #[test]
    fn window_and_expected_count_warnings() {
        let input: Vec<RawGame> = (1..=5)
            .map(|i| raw(d(2023, 11, i), "Navy", 8, 9, None))
            .collect();
        let opts = CleanOptions {
            expected_games: Some(19),
            ..season()
        };
        let out = clean_games(&input, &opts);
        assert_eq!(out.warnings.len(), 2);
        assert!(out.warnings[0].contains("excluded 5"));
        assert!(out.warnings[1].contains("19 were expected"));
    }
}
