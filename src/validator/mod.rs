mod convergence;
mod update;

pub use convergence::ConvergenceAnalysis;
pub use convergence::ConvergenceAnalyzer;
pub use convergence::ConvergenceStatus;
pub use convergence::CyclePoint;
pub use update::TrainingValidator;
pub use update::UpdateValidation;
pub use update::ValidationIssue;

/// health thresholds for the per-update screen and the windowed
/// convergence analysis
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub convergence_window: usize,
    pub convergence_stability_threshold: f32,
    pub enable_early_stopping: bool,
    pub exploding_gradient_threshold: f32,
    pub vanishing_gradient_threshold: f32,
    pub policy_collapse_entropy_threshold: f32,
    pub q_overestimation_threshold: f32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            convergence_window: 20,
            convergence_stability_threshold: 0.9,
            enable_early_stopping: false,
            exploding_gradient_threshold: 10.0,
            vanishing_gradient_threshold: 1e-6,
            policy_collapse_entropy_threshold: 0.1,
            q_overestimation_threshold: 5.0,
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.convergence_window < 2 {
            return Err("convergence_window must be at least 2".to_string());
        }
        if !(0.0..=1.0).contains(&self.convergence_stability_threshold) {
            return Err("convergence_stability_threshold must lie in [0, 1]".to_string());
        }
        if self.exploding_gradient_threshold <= self.vanishing_gradient_threshold {
            return Err("gradient thresholds are inverted".to_string());
        }
        Ok(())
    }
}
