//! "What-if" goal swings.
//!
//! A swing adds `goals_for` to every game's goals-for and takes
//! `goals_against` off every game's goals-against (floored at zero), then
//! recomputes the result. A loss flips when the new margin is strictly
//! positive; a level score after the swing is not a win.

use crate::dataset::{GameRecord, GameResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Swing {
    pub goals_for: u32,
    pub goals_against: u32,
}

impl Swing {
    /// `+d` goals for, nothing off goals against.
    pub fn offense(d: u32) -> Self {
        Swing {
            goals_for: d,
            goals_against: 0,
        }
    }

    /// `-d` goals against only.
    pub fn defense(d: u32) -> Self {
        Swing {
            goals_for: 0,
            goals_against: d,
        }
    }

    pub fn split(goals_for: u32, goals_against: u32) -> Self {
        Swing {
            goals_for,
            goals_against,
        }
    }
}

/// Result of one game after the swing, or `None` if it ends level.
pub fn swung_result(game: &GameRecord, swing: Swing) -> Option<GameResult> {
    GameResult::from_goals(
        game.goals_for + swing.goals_for,
        game.goals_against.saturating_sub(swing.goals_against),
    )
}

/// Losses that become wins under `swing`, in table order.
pub fn flipped(games: &[GameRecord], swing: Swing) -> Vec<&GameRecord> {
    games
        .iter()
        .filter(|g| g.result == GameResult::Loss)
        .filter(|g| swung_result(g, swing) == Some(GameResult::Win))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitOutcome {
    pub swing: Swing,
    pub flips: usize,
}

/// Every split `x + y = d`, `x` ascending.
pub fn all_splits(games: &[GameRecord], d: u32) -> Vec<SplitOutcome> {
    (0..=d)
        .map(|x| {
            let swing = Swing::split(x, d - x);
            SplitOutcome {
                swing,
                flips: flipped(games, swing).len(),
            }
        })
        .collect()
}

/// The split of `d` that flips the most losses; the first maximum wins ties.
pub fn best_split(games: &[GameRecord], d: u32) -> SplitOutcome {
    all_splits(games, d)
        .into_iter()
        .fold(None::<SplitOutcome>, |best, o| match best {
            Some(b) if b.flips >= o.flips => Some(b),
            _ => Some(o),
        })
        .unwrap_or(SplitOutcome {
            swing: Swing::defense(d),
            flips: 0,
        })
}

/// One line of the sweep table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepRow {
    pub d: u32,
    pub offense_flips: usize,
    pub defense_flips: usize,
    pub best: SplitOutcome,
}

/// Sweep d = 1..=dmax.
pub fn sweep(games: &[GameRecord], dmax: u32) -> Vec<SweepRow> {
    (1..=dmax)
        .map(|d| SweepRow {
            d,
            offense_flips: flipped(games, Swing::offense(d)).len(),
            defense_flips: flipped(games, Swing::defense(d)).len(),
            best: best_split(games, d),
        })
        .collect()
}
