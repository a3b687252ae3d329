use super::LearningConfig;
use super::ScheduleConfig;
use super::ScheduleSnapshot;
use crate::validator::ConvergenceStatus;

/// mutable knobs the orchestrator adapts between cycles, always
/// inside their configured bounds
#[derive(Debug, Clone)]
pub struct Schedule {
    games_per_cycle: usize,
    training_ratio: f32,
    exploration: f32,
    min_games: usize,
    max_games: usize,
    min_ratio: f32,
    max_ratio: f32,
    max_batches: usize,
    min_entropy: f32,
}

impl Schedule {
    pub fn new(scheduling: &ScheduleConfig, learning: &LearningConfig) -> Self {
        Self {
            games_per_cycle: scheduling.initial_games_per_cycle,
            training_ratio: 1.0_f32
                .clamp(scheduling.min_training_ratio, scheduling.max_training_ratio),
            exploration: learning.exploration_rate,
            min_games: scheduling.min_games_per_cycle,
            max_games: scheduling.max_games_per_cycle,
            min_ratio: scheduling.min_training_ratio,
            max_ratio: scheduling.max_training_ratio,
            max_batches: learning.max_batches_per_cycle,
            min_entropy: learning.min_policy_entropy,
        }
    }

    pub fn games_per_cycle(&self) -> usize {
        self.games_per_cycle
    }
    pub fn exploration(&self) -> f32 {
        self.exploration
    }

    /// batches to draw this cycle: games times ratio, capped
    pub fn batches(&self) -> usize {
        ((self.games_per_cycle as f32 * self.training_ratio).ceil() as usize)
            .clamp(1, self.max_batches)
    }

    /// steer the next cycle from the convergence classification:
    /// stagnation wants more data and fewer updates, instability
    /// wants fewer updates outright, decline widens exploration
    pub fn adapt(&mut self, status: ConvergenceStatus, average_entropy: f32) {
        match status {
            ConvergenceStatus::Stagnant => {
                self.scale_games(1.25);
                self.scale_ratio(0.8);
            }
            ConvergenceStatus::Unstable => {
                self.scale_games(0.9);
                self.scale_ratio(0.5);
            }
            ConvergenceStatus::Declining => {
                self.scale_ratio(0.9);
                self.exploration = (self.exploration * 1.25).min(1.0);
            }
            ConvergenceStatus::Improving
            | ConvergenceStatus::Converged
            | ConvergenceStatus::InsufficientData => {}
        }
        if average_entropy.is_finite() && average_entropy < self.min_entropy {
            self.exploration = (self.exploration * 1.1).min(1.0);
        }
    }

    fn scale_games(&mut self, factor: f32) {
        self.games_per_cycle = ((self.games_per_cycle as f32 * factor).round() as usize)
            .clamp(self.min_games, self.max_games);
    }
    fn scale_ratio(&mut self, factor: f32) {
        self.training_ratio = (self.training_ratio * factor).clamp(self.min_ratio, self.max_ratio);
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        ScheduleSnapshot {
            games_per_cycle: self.games_per_cycle,
            training_ratio: self.training_ratio,
            exploration: self.exploration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> Schedule {
        Schedule::new(&ScheduleConfig::default(), &LearningConfig::default())
    }

    #[test]
    fn stagnation_asks_for_more_games() {
        let mut s = schedule();
        let before = s.games_per_cycle();
        s.adapt(ConvergenceStatus::Stagnant, 2.0);
        assert!(s.games_per_cycle() > before);
        assert!(s.snapshot().training_ratio < 1.0);
    }

    #[test]
    fn bounds_always_hold() {
        let mut s = schedule();
        for _ in 0..50 {
            s.adapt(ConvergenceStatus::Stagnant, 2.0);
        }
        assert_eq!(s.games_per_cycle(), ScheduleConfig::default().max_games_per_cycle);
        assert!(s.snapshot().training_ratio >= ScheduleConfig::default().min_training_ratio);
        for _ in 0..50 {
            s.adapt(ConvergenceStatus::Unstable, 2.0);
        }
        assert!(s.games_per_cycle() >= ScheduleConfig::default().min_games_per_cycle);
    }

    #[test]
    fn improvement_changes_nothing() {
        let mut s = schedule();
        let before = s.snapshot();
        s.adapt(ConvergenceStatus::Improving, 2.0);
        let after = s.snapshot();
        assert_eq!(before.games_per_cycle, after.games_per_cycle);
        assert_eq!(before.training_ratio, after.training_ratio);
        assert_eq!(before.exploration, after.exploration);
    }

    #[test]
    fn collapsing_entropy_widens_exploration() {
        let mut s = schedule();
        let before = s.exploration();
        s.adapt(ConvergenceStatus::Improving, 0.01);
        assert!(s.exploration() > before);
    }

    #[test]
    fn batches_respect_the_cap() {
        let s = schedule();
        assert!(s.batches() <= LearningConfig::default().max_batches_per_cycle);
        assert!(s.batches() >= 1);
    }
}
