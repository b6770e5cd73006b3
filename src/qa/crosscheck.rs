//! Ask the Q&A backend questions whose answers are already known locally
//! and compare. Verdicts are reported only; the dataset is never touched.

use std::fmt;
use tracing::{info, warn};

use super::QaBackend;
use crate::analysis::{flipped, summarize, Swing};
use crate::dataset::GameRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every expected figure appears in the answer
    Agrees,
    /// The answer has numbers, but not the expected ones
    Disagrees,
    /// No numbers in the answer, or no answer at all
    Unclear,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Agrees => "AGREES",
            Verdict::Disagrees => "DISAGREES",
            Verdict::Unclear => "UNCLEAR",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Check {
    pub label: &'static str,
    pub question: String,
    pub expected: Vec<f64>,
    pub tolerance: f64,
    /// How the expected figures read in the report
    pub expected_text: String,
}

impl Check {
    fn exact(
        label: &'static str,
        question: String,
        expected: Vec<f64>,
        expected_text: String,
    ) -> Self {
        Check {
            label,
            question,
            expected,
            tolerance: 0.0,
            expected_text,
        }
    }
}

/// Averages may come back rounded to one decimal.
const AVERAGE_TOLERANCE: f64 = 0.051;

pub fn standard_checks(games: &[GameRecord], flip_swing: u32) -> Vec<Check> {
    let s = summarize(games);
    let flips = flipped(games, Swing::offense(flip_swing)).len();
    vec![
        Check::exact(
            "record",
            "What was the team's win-loss record for the season? Give it as wins-losses.".into(),
            vec![s.wins as f64, s.losses as f64],
            format!("{}-{}", s.wins, s.losses),
        ),
        Check {
            label: "avg goals for",
            question: "What was the team's average goals scored per game?".into(),
            expected: vec![s.avg_goals_for],
            tolerance: AVERAGE_TOLERANCE,
            expected_text: format!("{:.2}", s.avg_goals_for),
        },
        Check {
            label: "avg goals against",
            question: "What was the team's average goals allowed per game?".into(),
            expected: vec![s.avg_goals_against],
            tolerance: AVERAGE_TOLERANCE,
            expected_text: format!("{:.2}", s.avg_goals_against),
        },
        Check::exact(
            "one-goal losses",
            "How many games did the team lose by exactly one goal?".into(),
            vec![s.one_goal_losses.len() as f64],
            s.one_goal_losses.len().to_string(),
        ),
        Check::exact(
            "flips",
            format!(
                "If the team had scored {} more goal(s) in every game, how many of its losses \
                 would have become wins? A tied score does not count as a win.",
                flip_swing
            ),
            vec![flips as f64],
            flips.to_string(),
        ),
    ]
}

/// Unsigned decimal numbers in reading order. A '-' is never a sign, so
/// "10-9" reads as 10 and 9.
pub fn numbers_in(text: &str) -> Vec<f64> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if !chars[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
            i += 1;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
        }
        let token: String = chars[start..i].iter().collect();
        if let Ok(n) = token.parse::<f64>() {
            out.push(n);
        }
    }
    out
}

pub fn verify(check: &Check, answer: &str) -> Verdict {
    let found = numbers_in(answer);
    if found.is_empty() {
        return Verdict::Unclear;
    }
    let all_present = check
        .expected
        .iter()
        .all(|e| found.iter().any(|n| (n - e).abs() <= check.tolerance + 1e-9));
    if all_present {
        Verdict::Agrees
    } else {
        Verdict::Disagrees
    }
}

#[derive(Debug)]
pub struct CheckOutcome {
    pub check: Check,
    pub reply: std::result::Result<String, String>,
    pub verdict: Verdict,
}

pub async fn run_crosschecks(
    backend: &dyn QaBackend,
    csv: &str,
    checks: Vec<Check>,
) -> Vec<CheckOutcome> {
    let mut outcomes = Vec::with_capacity(checks.len());
    for check in checks {
        let (reply, verdict) = match backend.ask(csv, &check.question).await {
            Ok(answer) => {
                let v = verify(&check, &answer);
                (Ok(answer), v)
            }
            Err(e) => (Err(format!("{:#}", e)), Verdict::Unclear),
        };
        match verdict {
            Verdict::Agrees => info!("Cross-check '{}': {}", check.label, verdict),
            _ => warn!(
                "Cross-check '{}': {} (expected {})",
                check.label, verdict, check.expected_text
            ),
        }
        outcomes.push(CheckOutcome { check, reply, verdict });
    }
    outcomes
}

pub fn render_crosschecks(outcomes: &[CheckOutcome]) -> String {
    let agreed = outcomes.iter().filter(|o| o.verdict == Verdict::Agrees).count();
    let mut lines = vec![format!(
        "=== Cross-check ({}/{} agree) ===",
        agreed,
        outcomes.len()
    )];
    for o in outcomes {
        lines.push(format!(
            "[{}] {}: expected {}",
            o.verdict, o.check.label, o.check.expected_text
        ));
        lines.push(format!("  Q: {}", o.check.question));
        lines.push(match &o.reply {
            Ok(a) => format!("  A: {}", a.trim_end()),
            Err(e) => format!("  ERROR: {}", e),
        });
    }
    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{GameResult, Venue};
    use crate::qa::testing::Scripted;
    use chrono::NaiveDate;

    fn game(day: u32, gf: u32, ga: u32) -> GameRecord {
        GameRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            opponent: format!("Team {}", day),
            venue: Venue::Home,
            result: GameResult::from_goals(gf, ga).unwrap(),
            goals_for: gf,
            goals_against: ga,
        }
    }

    fn season() -> Vec<GameRecord> {
        vec![game(1, 8, 9), game(2, 13, 14), game(3, 12, 5)]
    }

    #[test]
    fn numbers_ignore_hyphens_as_signs() {
        assert_eq!(numbers_in("a 10-9 record"), vec![10.0, 9.0]);
        assert_eq!(numbers_in("about 10.21 goals."), vec![10.21]);
        assert_eq!(numbers_in("none at all"), Vec::<f64>::new());
    }

    #[test]
    fn verdicts() {
        let checks = standard_checks(&season(), 2);
        let record = &checks[0];
        assert_eq!(record.expected_text, "1-2");
        assert_eq!(verify(record, "They finished 1-2."), Verdict::Agrees);
        assert_eq!(verify(record, "They finished 2-1."), Verdict::Agrees);
        assert_eq!(verify(record, "They finished 3-0."), Verdict::Disagrees);
        assert_eq!(verify(record, "I cannot tell."), Verdict::Unclear);

        let avg_for = &checks[1];
        assert_eq!(verify(avg_for, "Roughly 11.0 per game"), Verdict::Agrees);
        assert_eq!(verify(avg_for, "Roughly 11.2 per game"), Verdict::Disagrees);
    }

    #[test]
    fn flip_check_uses_local_sensitivity() {
        let checks = standard_checks(&season(), 2);
        assert_eq!(checks[3].expected, vec![2.0]);
        assert_eq!(checks[4].expected, vec![2.0]);
        assert!(checks[4].question.contains("2 more goal(s)"));
    }

    #[tokio::test]
    async fn backend_errors_are_unclear() {
        let backend = Scripted(vec![
            ("win-loss", "The record was 1-2."),
            ("lose by exactly one", "Three games."),
        ]);
        let outcomes = run_crosschecks(&backend, "csv", standard_checks(&season(), 2)).await;
        let verdicts: Vec<Verdict> = outcomes.iter().map(|o| o.verdict).collect();
        assert_eq!(
            verdicts,
            vec![
                Verdict::Agrees,
                Verdict::Unclear,
                Verdict::Unclear,
                Verdict::Unclear,
                Verdict::Unclear
            ]
        );
        let text = render_crosschecks(&outcomes);
        assert!(text.starts_with("=== Cross-check (1/5 agree) ==="));
        assert!(text.contains("[AGREES] record: expected 1-2"));
    }
}
