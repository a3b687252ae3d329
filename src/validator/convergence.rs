use super::ValidationConfig;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceStatus {
    InsufficientData,
    Improving,
    Stagnant,
    Declining,
    Converged,
    Unstable,
}

/// per-cycle aggregates the analyzer trends over
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct CyclePoint {
    pub average_reward: f32,
    pub average_loss: f32,
    pub average_entropy: f32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConvergenceAnalysis {
    pub status: ConvergenceStatus,
    pub reward_slope: f32,
    pub loss_slope: f32,
    pub entropy_slope: f32,
    pub stability: f32,
    pub recommendations: Vec<String>,
}

/// sliding-window trend analysis over the most recent cycles.
/// stability is 1 minus the reward standard deviation normalized
/// by the magnitude of the mean.
#[derive(Debug, Clone)]
pub struct ConvergenceAnalyzer {
    window: usize,
    stability_threshold: f32,
    entropy_floor: f32,
    history: VecDeque<CyclePoint>,
}

impl ConvergenceAnalyzer {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            window: config.convergence_window,
            stability_threshold: config.convergence_stability_threshold,
            entropy_floor: config.policy_collapse_entropy_threshold * 2.0,
            history: VecDeque::new(),
        }
    }

    pub fn push(&mut self, point: CyclePoint) {
        self.history.push_back(point);
        while self.history.len() > self.window {
            self.history.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn analyze(&self) -> ConvergenceAnalysis {
        if self.history.len() < self.window {
            return ConvergenceAnalysis {
                status: ConvergenceStatus::InsufficientData,
                reward_slope: 0.0,
                loss_slope: 0.0,
                entropy_slope: 0.0,
                stability: 0.0,
                recommendations: vec![format!(
                    "need {} cycles before trends mean anything",
                    self.window
                )],
            };
        }
        let rewards = self.series(|p| p.average_reward);
        let losses = self.series(|p| p.average_loss);
        let entropies = self.series(|p| p.average_entropy);
        let reward_slope = Self::slope(&rewards);
        let loss_slope = Self::slope(&losses);
        let entropy_slope = Self::slope(&entropies);
        let stability = Self::stability(&rewards);
        let entropy_low = Self::mean(&entropies) < self.entropy_floor;

        let epsilon = crate::TREND_EPSILON;
        let mut recommendations = Vec::new();
        let status = if stability < crate::STABILITY_FLOOR {
            recommendations.push("reduce updates per cycle until training settles".to_string());
            ConvergenceStatus::Unstable
        } else if reward_slope > epsilon {
            ConvergenceStatus::Improving
        } else if reward_slope < -epsilon && entropy_low {
            recommendations.push("consider stopping; policy is narrowing while rewards fall".to_string());
            ConvergenceStatus::Declining
        } else if reward_slope.abs() <= epsilon && stability >= self.stability_threshold {
            recommendations.push("training has converged; stopping is safe".to_string());
            ConvergenceStatus::Converged
        } else {
            recommendations.push("generate more games per cycle".to_string());
            ConvergenceStatus::Stagnant
        };
        ConvergenceAnalysis {
            status,
            reward_slope,
            loss_slope,
            entropy_slope,
            stability,
            recommendations,
        }
    }

    fn series(&self, f: impl Fn(&CyclePoint) -> f32) -> Vec<f32> {
        self.history.iter().map(f).collect()
    }

    fn mean(values: &[f32]) -> f32 {
        values.iter().sum::<f32>() / values.len() as f32
    }

    /// least-squares slope over cycle index
    fn slope(values: &[f32]) -> f32 {
        let n = values.len() as f32;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = Self::mean(values);
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (i, y) in values.iter().enumerate() {
            let dx = i as f32 - mean_x;
            numerator += dx * (y - mean_y);
            denominator += dx * dx;
        }
        if denominator == 0.0 {
            0.0
        } else {
            numerator / denominator
        }
    }

    fn stability(values: &[f32]) -> f32 {
        let mean = Self::mean(values);
        let variance = values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f32>()
            / values.len() as f32;
        (1.0 - variance.sqrt() / (mean.abs() + 1.0)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer(window: usize) -> ConvergenceAnalyzer {
        ConvergenceAnalyzer::new(&ValidationConfig {
            convergence_window: window,
            ..ValidationConfig::default()
        })
    }

    fn point(reward: f32, entropy: f32) -> CyclePoint {
        CyclePoint {
            average_reward: reward,
            average_loss: 0.5,
            average_entropy: entropy,
        }
    }

    #[test]
    fn short_history_is_insufficient() {
        let mut a = analyzer(20);
        for i in 0..10 {
            a.push(point(i as f32, 2.0));
        }
        assert_eq!(a.analyze().status, ConvergenceStatus::InsufficientData);
    }

    #[test]
    fn flat_and_stable_converges() {
        // zero slope, stability comfortably at the 0.9 default
        let mut a = analyzer(20);
        for i in 0..20 {
            let wiggle = if i % 2 == 0 { 0.05 } else { -0.05 };
            a.push(point(wiggle, 2.0));
        }
        let analysis = a.analyze();
        assert!(analysis.reward_slope.abs() < crate::TREND_EPSILON);
        assert!(analysis.stability >= 0.9);
        assert_eq!(analysis.status, ConvergenceStatus::Converged);
    }

    #[test]
    fn rising_rewards_improve() {
        let mut a = analyzer(10);
        for i in 0..10 {
            a.push(point(i as f32 * 0.5, 2.0));
        }
        assert_eq!(a.analyze().status, ConvergenceStatus::Improving);
    }

    #[test]
    fn falling_rewards_with_narrow_policy_decline() {
        let mut a = analyzer(10);
        for i in 0..10 {
            a.push(point(5.0 - i as f32 * 0.5, 0.05));
        }
        assert_eq!(a.analyze().status, ConvergenceStatus::Declining);
    }

    #[test]
    fn flat_but_noisy_stagnates() {
        // slope zero but too noisy for the convergence threshold
        let mut a = analyzer(20);
        for i in 0..20 {
            let wiggle = if i % 2 == 0 { 0.5 } else { -0.5 };
            a.push(point(wiggle, 2.0));
        }
        let analysis = a.analyze();
        assert!(analysis.stability < 0.9);
        assert!(analysis.stability >= crate::STABILITY_FLOOR);
        assert_eq!(analysis.status, ConvergenceStatus::Stagnant);
    }

    #[test]
    fn wild_swings_are_unstable() {
        let mut a = analyzer(10);
        for i in 0..10 {
            let swing = if i % 2 == 0 { 5.0 } else { -5.0 };
            a.push(point(swing, 2.0));
        }
        assert_eq!(a.analyze().status, ConvergenceStatus::Unstable);
    }
}
