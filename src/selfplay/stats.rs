use super::GameResult;
use crate::replay::GameOutcome;
use std::time::Duration;

/// barrier-joined output of one self-play phase, games sorted by
/// game id so downstream ingest is deterministic
#[derive(Debug, Default)]
pub struct SelfPlayReport {
    pub games: Vec<GameResult>,
    pub cancelled: usize,
}

impl SelfPlayReport {
    pub fn total_games(&self) -> usize {
        self.games.len()
    }
    pub fn total_experiences(&self) -> usize {
        self.games.iter().map(|g| g.experiences.len()).sum()
    }
    pub fn illegal_actions(&self) -> usize {
        self.games.iter().map(|g| g.illegal_actions).sum()
    }
    pub fn error_games(&self) -> usize {
        self.games
            .iter()
            .filter(|g| g.termination == crate::replay::TerminationReason::Error)
            .count()
    }
    pub fn outcomes(&self) -> [usize; 4] {
        let mut histogram = [0; 4];
        for game in self.games.iter() {
            histogram[game.outcome.index()] += 1;
        }
        histogram
    }
    pub fn average_length(&self) -> f32 {
        if self.games.is_empty() {
            0.0
        } else {
            self.games.iter().map(|g| g.length as f32).sum::<f32>() / self.games.len() as f32
        }
    }
    pub fn wall_time(&self) -> Duration {
        self.games.iter().map(|g| g.duration).max().unwrap_or_default()
    }
    /// decisive + draw share of the main side, for evaluation
    pub fn score_for_main(&self) -> (usize, usize, usize) {
        let mut wins = 0;
        let mut draws = 0;
        let mut losses = 0;
        for game in self.games.iter() {
            let main = GameResult::main_side(game.game_id);
            match game.outcome {
                GameOutcome::Draw | GameOutcome::Ongoing => draws += 1,
                GameOutcome::WhiteWins => {
                    if main == crate::chess::Side::White {
                        wins += 1
                    } else {
                        losses += 1
                    }
                }
                GameOutcome::BlackWins => {
                    if main == crate::chess::Side::Black {
                        wins += 1
                    } else {
                        losses += 1
                    }
                }
            }
        }
        (wins, draws, losses)
    }
}
