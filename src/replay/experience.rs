use crate::Quality;
use crate::Reward;
use crate::chess::Side;

/// basic (s, a, r, s', done) tuple the approximator trains on
#[derive(Debug, Clone, PartialEq)]
pub struct Experience {
    pub state: Vec<f32>,
    pub action: usize,
    pub reward: Reward,
    pub next_state: Vec<f32>,
    pub terminal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    WhiteWins,
    BlackWins,
    Draw,
    Ongoing,
}

impl GameOutcome {
    pub fn index(&self) -> usize {
        match self {
            Self::WhiteWins => 0,
            Self::BlackWins => 1,
            Self::Draw => 2,
            Self::Ongoing => 3,
        }
    }
    pub fn is_decisive(&self) -> bool {
        matches!(self, Self::WhiteWins | Self::BlackWins)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    GameEnded,
    StepLimit,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Early,
    Mid,
    End,
}

impl GamePhase {
    /// total partition of the game by ply
    pub fn of(move_number: u32) -> Self {
        match move_number {
            0..=20 => Self::Early,
            21..=60 => Self::Mid,
            _ => Self::End,
        }
    }
    pub fn index(&self) -> usize {
        match self {
            Self::Early => 0,
            Self::Mid => 1,
            Self::End => 2,
        }
    }
}

/// experience plus the game metadata curation runs on
#[derive(Debug, Clone)]
pub struct EnhancedExperience {
    pub experience: Experience,
    pub game_id: u64,
    pub move_number: u32,
    pub side: Side,
    pub outcome: GameOutcome,
    pub termination: TerminationReason,
    pub quality: Quality,
    pub phase: GamePhase,
}

impl EnhancedExperience {
    pub fn new(
        experience: Experience,
        game_id: u64,
        move_number: u32,
        side: Side,
        outcome: GameOutcome,
        termination: TerminationReason,
    ) -> Self {
        assert!(move_number >= 1, "move numbers start at 1");
        let quality = Self::quality_score(outcome, move_number, experience.reward);
        let phase = GamePhase::of(move_number);
        Self {
            experience,
            game_id,
            move_number,
            side,
            outcome,
            termination,
            quality,
            phase,
        }
    }

    /// deterministic curation score in [0, 1]: decisive games beat
    /// draws beat unfinished ones, sharpened by the reward signal
    /// and slightly by depth into the game
    pub fn quality_score(outcome: GameOutcome, move_number: u32, reward: Reward) -> Quality {
        let base = match outcome {
            GameOutcome::WhiteWins | GameOutcome::BlackWins => 0.7,
            GameOutcome::Draw => 0.5,
            GameOutcome::Ongoing => 0.3,
        };
        let signal = 0.2 * reward.clamp(-1.0, 1.0);
        let depth = 0.1 * (move_number.min(100) as f32 / 100.0);
        (base + signal + depth).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn experience(reward: Reward) -> Experience {
        Experience {
            state: vec![0.0; 4],
            action: 0,
            reward,
            next_state: vec![0.0; 4],
            terminal: false,
        }
    }

    #[test]
    fn quality_is_deterministic_and_bounded() {
        for outcome in [
            GameOutcome::WhiteWins,
            GameOutcome::BlackWins,
            GameOutcome::Draw,
            GameOutcome::Ongoing,
        ] {
            for move_number in [1, 20, 60, 300] {
                for reward in [-10.0, -1.0, 0.0, 1.0, 10.0] {
                    let a = EnhancedExperience::quality_score(outcome, move_number, reward);
                    let b = EnhancedExperience::quality_score(outcome, move_number, reward);
                    assert_eq!(a, b);
                    assert!((0.0..=1.0).contains(&a));
                }
            }
        }
    }

    #[test]
    fn decisive_games_score_above_unfinished() {
        let win = EnhancedExperience::quality_score(GameOutcome::WhiteWins, 10, 1.0);
        let ongoing = EnhancedExperience::quality_score(GameOutcome::Ongoing, 10, 0.0);
        assert!(win > ongoing);
    }

    #[test]
    fn phase_partition_is_total() {
        for ply in 1..300 {
            // of() always lands in exactly one bucket
            let _ = GamePhase::of(ply);
        }
        assert_eq!(GamePhase::of(1), GamePhase::Early);
        assert_eq!(GamePhase::of(20), GamePhase::Early);
        assert_eq!(GamePhase::of(21), GamePhase::Mid);
        assert_eq!(GamePhase::of(60), GamePhase::Mid);
        assert_eq!(GamePhase::of(61), GamePhase::End);
    }

    #[test]
    fn move_numbers_start_at_one() {
        let result = std::panic::catch_unwind(|| {
            EnhancedExperience::new(
                experience(0.0),
                0,
                0,
                Side::White,
                GameOutcome::Ongoing,
                TerminationReason::GameEnded,
            )
        });
        assert!(result.is_err());
    }
}
