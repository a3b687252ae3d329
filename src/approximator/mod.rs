mod network;
mod params;

pub use network::Network;
pub use params::Params;

use crate::Reward;
use crate::codec::ActionMask;
use crate::errors::Result;
use rand::Rng;
use rand::rngs::SmallRng;

/// objective the approximator trains. scores out of forward() are
/// q-values under Value and logits under Policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Value,
    Policy,
}

/// softmax temperature for policy-mode action sampling
pub const TEMPERATURE: f32 = 1.0;

/// one training example drawn from the replay store
#[derive(Debug, Clone)]
pub struct TrainingSample {
    pub state: Vec<f32>,
    pub action: usize,
    pub reward: Reward,
    pub next_state: Vec<f32>,
    pub terminal: bool,
}

/// metrics out of a single optimizer step. every field must be
/// finite for the update to count as valid.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct UpdateResult {
    pub loss: f32,
    pub gradient_norm: f32,
    pub policy_entropy: f32,
    pub q_mean: f32,
    pub target_mean: f32,
}

impl UpdateResult {
    pub fn is_finite(&self) -> bool {
        self.loss.is_finite()
            && self.gradient_norm.is_finite()
            && self.policy_entropy.is_finite()
            && self.q_mean.is_finite()
            && self.target_mean.is_finite()
    }
}

/// capability set the core is polymorphic over. workers hold frozen
/// snapshots through &Self, the orchestrator owns the one mutable
/// training instance.
pub trait Approximator: Send + Sync {
    fn mode(&self) -> Mode;
    fn state_dim(&self) -> usize;
    fn action_dim(&self) -> usize;
    /// deterministic given identical parameters; never mutates input
    fn forward(&self, state: &[f32]) -> Vec<f32>;
    /// one optimizer step over the batch; gradients clipped
    fn train_batch(&mut self, batch: &[TrainingSample]) -> Result<UpdateResult>;
    /// opaque parameter blob sufficient to reconstruct forward()
    fn snapshot(&self) -> Vec<u8>;
    fn restore(&mut self, blob: &[u8]) -> Result<()>;
    /// undo the most recent optimizer step, if any
    fn rollback(&mut self);
    fn reset_optimizer(&mut self);
    fn set_exploration(&mut self, rate: f32);
    fn exploration(&self) -> f32;

    /// masked action selection. value mode is epsilon-greedy,
    /// policy mode samples the masked softmax. both only ever
    /// return actions inside the mask.
    fn select_action(
        &self,
        state: &[f32],
        mask: &ActionMask,
        exploration: f32,
        rng: &mut SmallRng,
    ) -> usize {
        assert!(!mask.is_empty(), "no legal actions to select from");
        let scores = self.forward(state);
        match self.mode() {
            Mode::Value => {
                if rng.random::<f32>() < exploration {
                    let legal = mask.iter().collect::<Vec<_>>();
                    legal[rng.random_range(0..legal.len())]
                } else {
                    mask.iter()
                        .max_by(|&a, &b| {
                            scores[a]
                                .partial_cmp(&scores[b])
                                .unwrap_or(std::cmp::Ordering::Equal)
                        })
                        .expect("mask is non-empty")
                }
            }
            Mode::Policy => {
                let legal = mask.iter().collect::<Vec<_>>();
                let peak = legal
                    .iter()
                    .map(|&a| scores[a])
                    .fold(f32::NEG_INFINITY, f32::max);
                let weights = legal
                    .iter()
                    .map(|&a| ((scores[a] - peak) / TEMPERATURE).exp())
                    .collect::<Vec<_>>();
                let total = weights.iter().sum::<f32>();
                let mut draw = rng.random::<f32>() * total;
                for (action, weight) in legal.iter().zip(weights.iter()) {
                    draw -= weight;
                    if draw <= 0.0 {
                        return *action;
                    }
                }
                *legal.last().expect("mask is non-empty")
            }
        }
    }
}
