use super::shaping;
use crate::Reward;
use crate::chess::Board;
use crate::chess::GameStatus;
use crate::chess::Side;

/// reward coefficients. all rewards everywhere are from the
/// perspective of the side that just moved.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub win: Reward,
    pub loss: Reward,
    pub draw: Reward,
    pub step_penalty: Reward,
    pub step_limit_penalty: Reward,
    pub invalid_move_reward: Reward,
    pub enable_position_rewards: bool,
    pub material_weight: Reward,
    pub activity_weight: Reward,
    pub enable_game_length_normalization: bool,
    pub max_game_length: u32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            win: 1.0,
            loss: -1.0,
            draw: 0.0,
            step_penalty: -0.001,
            step_limit_penalty: -0.5,
            invalid_move_reward: -0.1,
            enable_position_rewards: false,
            material_weight: 0.01,
            activity_weight: 0.005,
            enable_game_length_normalization: false,
            max_game_length: 200,
        }
    }
}

impl RewardConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("win", self.win),
            ("loss", self.loss),
            ("draw", self.draw),
            ("step_penalty", self.step_penalty),
            ("step_limit_penalty", self.step_limit_penalty),
            ("invalid_move_reward", self.invalid_move_reward),
            ("material_weight", self.material_weight),
            ("activity_weight", self.activity_weight),
        ] {
            if !value.is_finite() {
                return Err(format!("reward coefficient {} must be finite", name));
            }
        }
        if self.max_game_length == 0 {
            return Err("max_game_length must be positive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RewardShaper {
    config: RewardConfig,
}

impl RewardShaper {
    pub fn new(config: RewardConfig) -> Self {
        Self { config }
    }
    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// the rules engine rejected the action; the environment did
    /// not advance
    pub fn invalid(&self) -> Reward {
        self.config.invalid_move_reward
    }

    /// game ended by a chess rule. reward for the given side,
    /// optionally scaled by game length
    pub fn terminal(&self, status: GameStatus, side: Side, length: u32) -> Reward {
        let raw = match status.winner() {
            Some(winner) if winner == side => self.config.win,
            Some(_) => self.config.loss,
            None => self.config.draw,
        };
        self.normalize(raw, length)
    }

    /// episode hit the step limit without a chess ending. kept
    /// distinct from draw so the two are never conflated downstream
    pub fn step_limit(&self) -> Reward {
        self.config.step_limit_penalty
    }

    /// ordinary in-game step: flat penalty plus optional position
    /// shaping from the mover's perspective
    pub fn ongoing(&self, pre: &Board, post: &Board, mover: Side) -> Reward {
        let mut reward = self.config.step_penalty;
        if self.config.enable_position_rewards {
            reward += self.config.material_weight
                * (shaping::material(post, mover) - shaping::material(pre, mover));
            reward += self.config.activity_weight
                * (shaping::activity(post, mover) - shaping::activity(pre, mover));
        }
        reward
    }

    fn normalize(&self, reward: Reward, length: u32) -> Reward {
        if !self.config.enable_game_length_normalization {
            return reward;
        }
        let max = self.config.max_game_length;
        let ratio = length.clamp(1, max) as Reward / max as Reward;
        reward / ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::Move;

    #[test]
    fn ongoing_step_is_exactly_the_penalty() {
        let shaper = RewardShaper::new(RewardConfig {
            enable_position_rewards: false,
            step_penalty: -0.001,
            ..RewardConfig::default()
        });
        let pre = Board::new();
        let post = pre.apply(Move::try_from("e2e4").unwrap()).unwrap();
        assert_eq!(shaper.ongoing(&pre, &post, Side::White), -0.001);
    }

    #[test]
    fn terminal_signs_follow_the_mover() {
        let shaper = RewardShaper::new(RewardConfig::default());
        let mate = GameStatus::BlackWins;
        assert!(shaper.terminal(mate, Side::Black, 6) > 0.0);
        assert!(shaper.terminal(mate, Side::White, 6) < 0.0);
        assert_eq!(shaper.terminal(GameStatus::DrawStalemate, Side::White, 30), 0.0);
    }

    #[test]
    fn fools_mate_pays_the_loser_negative() {
        let shaper = RewardShaper::new(RewardConfig::default());
        let board = Board::from_fen(
            "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
        )
        .unwrap();
        let status = board.status();
        assert_eq!(status, crate::chess::GameStatus::BlackWins);
        assert!(shaper.terminal(status, Side::White, 4).is_sign_negative());
        assert!(shaper.terminal(status, Side::Black, 4).is_sign_positive());
    }

    #[test]
    fn step_limit_is_not_a_draw() {
        let shaper = RewardShaper::new(RewardConfig::default());
        assert_ne!(
            shaper.step_limit(),
            shaper.terminal(GameStatus::DrawFiftyMove, Side::White, 200)
        );
    }

    #[test]
    fn length_normalization_amplifies_short_games() {
        let shaper = RewardShaper::new(RewardConfig {
            enable_game_length_normalization: true,
            max_game_length: 200,
            ..RewardConfig::default()
        });
        let short = shaper.terminal(GameStatus::WhiteWins, Side::White, 20);
        let long = shaper.terminal(GameStatus::WhiteWins, Side::White, 200);
        assert!(short > long);
        assert_eq!(long, 1.0);
    }

    #[test]
    fn capture_raises_material_shaping() {
        let shaper = RewardShaper::new(RewardConfig {
            enable_position_rewards: true,
            step_penalty: 0.0,
            activity_weight: 0.0,
            material_weight: 1.0,
            ..RewardConfig::default()
        });
        // white queen takes the black rook on d8
        let pre = Board::from_fen("3r4/8/8/8/3Q4/8/8/4K2k w - - 0 1").unwrap();
        let post = pre.apply(Move::try_from("d4d8").unwrap()).unwrap();
        assert_eq!(shaper.ongoing(&pre, &post, Side::White), 5.0);
    }
}
