use crate::approximator::Mode;
use crate::checkpoint::CheckpointConfig;
use crate::errors::ChessError;
use crate::errors::Result;
use crate::replay::StoreConfig;
use crate::rewards::RewardConfig;
use crate::validator::ValidationConfig;
use std::path::Path;

/// how much gets generated and played per cycle
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub initial_games_per_cycle: usize,
    pub min_games_per_cycle: usize,
    pub max_games_per_cycle: usize,
    pub max_concurrent_games: usize,
    pub max_steps_per_game: u32,
    pub evaluation_games_per_cycle: u64,
    pub min_training_ratio: f32,
    pub max_training_ratio: f32,
    pub opponent_update_frequency: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            initial_games_per_cycle: 16,
            min_games_per_cycle: 4,
            max_games_per_cycle: 64,
            max_concurrent_games: 4,
            max_steps_per_game: 200,
            evaluation_games_per_cycle: 8,
            min_training_ratio: 0.25,
            max_training_ratio: 4.0,
            opponent_update_frequency: 5,
        }
    }
}

/// approximator shape and optimizer knobs
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub mode: Mode,
    pub hidden_layers: Vec<usize>,
    pub batch_size: usize,
    pub max_batches_per_cycle: usize,
    pub learning_rate: f32,
    pub discount: f32,
    pub exploration_rate: f32,
    pub target_update_frequency: usize,
    pub gradient_clip_threshold: f32,
    pub min_policy_entropy: f32,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Value,
            hidden_layers: vec![256],
            batch_size: 32,
            max_batches_per_cycle: 16,
            learning_rate: 1e-3,
            discount: 0.99,
            exploration_rate: 0.1,
            target_update_frequency: 10,
            gradient_clip_threshold: 5.0,
            min_policy_entropy: 0.5,
        }
    }
}

/// one immutable bundle per run. built from defaults, optionally a
/// json file, then environment overrides, then validated.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduling: ScheduleConfig,
    pub learning: LearningConfig,
    pub store: StoreConfig,
    pub rewards: RewardConfig,
    pub checkpointing: CheckpointConfig,
    pub validation: ValidationConfig,
    pub master_seed: u64,
    pub deterministic_mode: bool,
}

impl Config {
    pub fn new() -> Self {
        Self {
            master_seed: 42,
            deterministic_mode: true,
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ChessError::ConfigInvalid(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| ChessError::ConfigInvalid(format!("{}: {}", path.display(), e)))
    }

    /// CHESSRL_SEED and CHESSRL_CHECKPOINT_DIR override the file
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(seed) = std::env::var("CHESSRL_SEED") {
            self.master_seed = seed.parse().map_err(|_| {
                ChessError::ConfigInvalid(format!("CHESSRL_SEED must be an integer, got {}", seed))
            })?;
        }
        if let Ok(directory) = std::env::var("CHESSRL_CHECKPOINT_DIR") {
            self.checkpointing.checkpoint_directory = directory;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.scheduling;
        if s.min_games_per_cycle == 0 || s.min_games_per_cycle > s.max_games_per_cycle {
            return Err(invalid("games_per_cycle bounds are inverted or zero"));
        }
        if !(s.min_games_per_cycle..=s.max_games_per_cycle)
            .contains(&s.initial_games_per_cycle)
        {
            return Err(invalid("initial_games_per_cycle outside its bounds"));
        }
        if s.max_concurrent_games == 0 {
            return Err(invalid("max_concurrent_games must be positive"));
        }
        if s.max_steps_per_game == 0 {
            return Err(invalid("max_steps_per_game must be positive"));
        }
        if s.min_training_ratio <= 0.0 || s.min_training_ratio > s.max_training_ratio {
            return Err(invalid("training ratio bounds are inverted or non-positive"));
        }
        if s.opponent_update_frequency == 0 {
            return Err(invalid("opponent_update_frequency must be positive"));
        }
        let l = &self.learning;
        if l.batch_size == 0 {
            return Err(invalid("batch_size must be positive"));
        }
        if l.max_batches_per_cycle == 0 {
            return Err(invalid("max_batches_per_cycle must be positive"));
        }
        if !(l.learning_rate.is_finite() && l.learning_rate > 0.0 && l.learning_rate < 1.0) {
            return Err(invalid("learning_rate must lie in (0, 1)"));
        }
        if !(0.0..=1.0).contains(&l.discount) {
            return Err(invalid("discount must lie in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&l.exploration_rate) {
            return Err(invalid("exploration_rate must lie in [0, 1]"));
        }
        if l.gradient_clip_threshold <= 0.0 {
            return Err(invalid("gradient_clip_threshold must be positive"));
        }
        self.store.validate().map_err(invalid_string)?;
        self.rewards.validate().map_err(invalid_string)?;
        self.checkpointing.validate().map_err(invalid_string)?;
        self.validation.validate().map_err(invalid_string)?;
        Ok(())
    }
}

fn invalid(message: &str) -> ChessError {
    ChessError::ConfigInvalid(message.to_string())
}
fn invalid_string(message: String) -> ChessError {
    ChessError::ConfigInvalid(message)
}
