use super::clean::CleanReport;
use super::sensitivity::{flipped, Swing, SweepRow};
use super::stats::SeasonSummary;
use crate::dataset::{GameRecord, RowError};
use crate::extract::ExtractedText;

fn game_line(g: &GameRecord) -> String {
    format!(
        "{}  {:<28} {:>2}-{:<2} {}",
        g.date, g.opponent, g.goals_for, g.goals_against, g.venue
    )
}

fn finish(lines: Vec<String>) -> String {
    lines.join("\n") + "\n"
}

/// Extraction account: line counts, merged records and skipped fragments.
pub fn render_extraction(text: &ExtractedText) -> String {
    let ex = &text.extraction;
    let mut lines = vec![
        format!(
            "Source: {} ({} page(s), {} characters)",
            text.source,
            text.pages.len(),
            text.chars
        ),
        format!("Lines scanned: {}", ex.lines_scanned),
        format!(
            "Candidate games: {} ({} from two-line records)",
            ex.games.len(),
            ex.merged
        ),
        format!("Unmatched lines: {}", ex.unmatched),
    ];
    if !ex.fragments.is_empty() {
        lines.push("Fragments (date or score present, no game):".to_string());
        lines.extend(
            ex.fragments
                .iter()
                .map(|f| format!("  p{} {:?}: {}", f.page, f.text, f.reason)),
        );
    }
    finish(lines)
}

/// Statistics plus the cleaning account.
pub fn render_summary(
    summary: &SeasonSummary,
    report: &CleanReport,
    unreadable: &[RowError],
) -> String {
    let mut lines = vec![
        format!("Games: {}", summary.games),
        format!("Record: {}-{}", summary.wins, summary.losses),
        format!(
            "Avg GF: {:.2}  Avg GA: {:.2}",
            summary.avg_goals_for, summary.avg_goals_against
        ),
    ];
    if !summary.by_venue.is_empty() {
        let splits: Vec<String> = summary
            .by_venue
            .iter()
            .map(|v| format!("{}: {}-{}", v.venue, v.wins, v.losses))
            .collect();
        lines.push(splits.join(" | "));
    }
    lines.push(format!("One-goal losses: {}", summary.one_goal_losses.len()));
    lines.extend(
        summary
            .one_goal_losses
            .iter()
            .map(|g| format!("  {}", game_line(g))),
    );

    lines.push("\n=== Cleaning ===".to_string());
    lines.push(format!("Rejected: {}", report.rejected.len()));
    lines.extend(report.rejected.iter().map(|r| {
        format!(
            "  {} {} {}-{}: {}",
            r.game.date, r.game.opponent, r.game.goals_for, r.game.goals_against, r.reason
        )
    }));
    lines.push(format!("Duplicates removed: {}", report.duplicates.len()));
    lines.extend(report.duplicates.iter().map(|g| {
        format!("  {} {} {}-{}", g.date, g.opponent, g.goals_for, g.goals_against)
    }));
    lines.push(format!("Result mismatches: {}", report.mismatches.len()));
    lines.extend(report.mismatches.iter().map(|m| {
        format!(
            "  {} {}: printed {} but {}-{} is {}",
            m.date,
            m.opponent,
            m.asserted.as_str(),
            m.goals_for,
            m.goals_against,
            m.computed
        )
    }));
    if !unreadable.is_empty() {
        lines.push(format!("Unreadable rows: {}", unreadable.len()));
        lines.extend(unreadable.iter().map(|e| format!("  {}", e)));
    }
    lines.extend(report.warnings.iter().map(|w| format!("WARNING: {}", w)));
    finish(lines)
}

fn flip_table(games: &[&GameRecord]) -> String {
    if games.is_empty() {
        return "(none)".to_string();
    }
    games.iter().map(|g| game_line(g)).collect::<Vec<_>>().join("\n")
}

/// Sweep table followed by flipped-game lists for each detail swing.
pub fn render_flips(games: &[GameRecord], rows: &[SweepRow], detail_swings: &[u32]) -> String {
    let mut lines: Vec<String> = rows
        .iter()
        .map(|r| {
            format!(
                "d={d}: +{d}GF -> {} flips | -{d}GA -> {} flips | \
                 best split +{}GF/-{}GA -> {} flips",
                r.offense_flips,
                r.defense_flips,
                r.best.swing.goals_for,
                r.best.swing.goals_against,
                r.best.flips,
                d = r.d,
            )
        })
        .collect();

    let dmax = rows.last().map_or(0, |r| r.d);
    for &d in detail_swings.iter().filter(|&&d| d <= dmax) {
        lines.push(format!(
            "\n=== Flips with +{} GF ===\n{}",
            d,
            flip_table(&flipped(games, Swing::offense(d)))
        ));
        lines.push(format!(
            "\n=== Flips with -{} GA ===\n{}",
            d,
            flip_table(&flipped(games, Swing::defense(d)))
        ));
    }
    finish(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{clean_games, sensitivity::sweep, stats::summarize, CleanOptions};
    use crate::dataset::{GameResult, RawGame, ResultMark, Venue};
    use chrono::NaiveDate;

    fn game(day: u32, opp: &str, gf: u32, ga: u32) -> GameRecord {
        GameRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            opponent: opp.into(),
            venue: Venue::Away,
            result: GameResult::from_goals(gf, ga).unwrap(),
            goals_for: gf,
            goals_against: ga,
        }
    }

    #[test]
    fn flips_text_matches_sweep() {
        let games = vec![game(2, "Navy", 8, 9), game(9, "Army", 13, 14)];
        let rows = sweep(&games, 2);
        let text = render_flips(&games, &rows, &[2, 4]);
        assert!(text.starts_with(
            "d=1: +1GF -> 0 flips | -1GA -> 0 flips | best split +0GF/-1GA -> 0 flips\n"
        ));
        assert!(text.contains(
            "d=2: +2GF -> 2 flips | -2GA -> 2 flips | best split +0GF/-2GA -> 2 flips"
        ));
        assert!(text.contains("=== Flips with +2 GF ==="));
        assert!(!text.contains("+4 GF"));
        assert!(text.contains("Navy"));
    }

    #[test]
    fn empty_flip_list_says_none() {
        let games = vec![game(2, "Navy", 12, 9)];
        let rows = sweep(&games, 2);
        let text = render_flips(&games, &rows, &[2]);
        assert!(text.contains("=== Flips with -2 GA ===\n(none)"));
    }

    #[test]
    fn summary_lists_mismatches_and_rejects() {
        let raw = vec![
            RawGame::from(&game(2, "Navy", 8, 9)),
            RawGame {
                asserted: Some(ResultMark::Win),
                ..RawGame::from(&game(9, "Army", 13, 14))
            },
            RawGame::from(&game(10, "Duke", 50, 9)),
        ];
        let report = clean_games(&raw, &CleanOptions::default());
        let text = render_summary(&summarize(&report.games), &report, &[]);
        assert!(text.contains("Record: 0-2"));
        assert!(text.contains("Avg GF: 10.50  Avg GA: 11.50"));
        assert!(text.contains("Away: 0-2"));
        assert!(text.contains("One-goal losses: 2"));
        assert!(text.contains("Rejected: 1"));
        assert!(text.contains("printed W but 13-14 is L"));
    }
}
