use crate::dataset::{GameRecord, GameResult, Venue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VenueSplit {
    pub venue: Venue,
    pub wins: usize,
    pub losses: usize,
}

/// Descriptive statistics for one season.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonSummary {
    pub games: usize,
    pub wins: usize,
    pub losses: usize,
    /// 0.0 for an empty season
    pub avg_goals_for: f64,
    pub avg_goals_against: f64,
    pub one_goal_losses: Vec<GameRecord>,
    /// Home, Away, Neutral; venues with no games are omitted
    pub by_venue: Vec<VenueSplit>,
}

/// A loss by exactly one goal.
pub fn is_one_goal_loss(g: &GameRecord) -> bool {
    g.result == GameResult::Loss && g.margin().abs() == 1
}

pub fn one_goal_losses(games: &[GameRecord]) -> Vec<&GameRecord> {
    games.iter().filter(|g| is_one_goal_loss(g)).collect()
}

fn mean(values: impl Iterator<Item = u32>, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    values.map(f64::from).sum::<f64>() / n as f64
}

pub fn summarize(games: &[GameRecord]) -> SeasonSummary {
    let n = games.len();
    let wins = games.iter().filter(|g| g.result == GameResult::Win).count();

    let by_venue = [Venue::Home, Venue::Away, Venue::Neutral]
        .into_iter()
        .filter_map(|venue| {
            let at: Vec<&GameRecord> = games.iter().filter(|g| g.venue == venue).collect();
            if at.is_empty() {
                return None;
            }
            let wins = at.iter().filter(|g| g.result == GameResult::Win).count();
            Some(VenueSplit {
                venue,
                wins,
                losses: at.len() - wins,
            })
        })
        .collect();

    SeasonSummary {
        games: n,
        wins,
        losses: n - wins,
        avg_goals_for: mean(games.iter().map(|g| g.goals_for), n),
        avg_goals_against: mean(games.iter().map(|g| g.goals_against), n),
        one_goal_losses: one_goal_losses(games).into_iter().cloned().collect(),
        by_venue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn game(day: u32, venue: Venue, gf: u32, ga: u32) -> GameRecord {
        GameRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            opponent: format!("Team {}", day),
            venue,
            result: GameResult::from_goals(gf, ga).unwrap(),
            goals_for: gf,
            goals_against: ga,
        }
    }

    #[test]
    fn record_and_averages() {
        let games = vec![
            game(1, Venue::Home, 8, 9),
            game(2, Venue::Away, 13, 14),
            game(3, Venue::Home, 12, 5),
        ];
        let s = summarize(&games);
        assert_eq!((s.games, s.wins, s.losses), (3, 1, 2));
        assert_relative_eq!(s.avg_goals_for, 11.0, epsilon = 1e-9);
        assert_relative_eq!(s.avg_goals_against, 28.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn one_goal_losses_exclude_one_goal_wins() {
        let games = vec![
            game(1, Venue::Home, 8, 9),
            game(2, Venue::Home, 10, 9),
            game(3, Venue::Home, 7, 9),
        ];
        let s = summarize(&games);
        assert_eq!(s.one_goal_losses.len(), 1);
        assert_eq!(s.one_goal_losses[0].goals_for, 8);
    }

    #[test]
    fn venue_split_omits_unused_venues() {
        let games = vec![
            game(1, Venue::Home, 8, 9),
            game(2, Venue::Home, 10, 9),
            game(3, Venue::Neutral, 7, 9),
        ];
        let s = summarize(&games);
        assert_eq!(
            s.by_venue,
            vec![
                VenueSplit { venue: Venue::Home, wins: 1, losses: 1 },
                VenueSplit { venue: Venue::Neutral, wins: 0, losses: 1 },
            ]
        );
    }

    #[test]
    fn empty_season_has_zero_averages() {
        let s = summarize(&[]);
        assert_eq!(s.games, 0);
        assert_relative_eq!(s.avg_goals_for, 0.0);
        assert!(s.by_venue.is_empty());
    }
}
