use super::ValidationConfig;
use crate::approximator::UpdateResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationIssue {
    ExplodingGradients,
    VanishingGradients,
    PolicyCollapse,
    NumericalInstability,
    QOverestimation,
    LossExplosion,
}

impl ValidationIssue {
    /// blocking issues invalidate the update outright; the rest
    /// are reported and recommended against
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::ExplodingGradients | Self::NumericalInstability)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UpdateValidation {
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

/// per-update health screen. keeps the previous loss around to
/// spot explosions across consecutive updates.
#[derive(Debug, Clone)]
pub struct TrainingValidator {
    config: ValidationConfig,
    previous_loss: Option<f32>,
}

impl TrainingValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            previous_loss: None,
        }
    }

    pub fn reset(&mut self) {
        self.previous_loss = None;
    }

    pub fn screen(&mut self, result: &UpdateResult) -> UpdateValidation {
        let mut issues = Vec::new();
        let mut warnings = Vec::new();
        let mut recommendations = Vec::new();

        if !result.is_finite() {
            issues.push(ValidationIssue::NumericalInstability);
            recommendations.push("roll back the update and lower the learning rate".to_string());
        }
        if result.gradient_norm > self.config.exploding_gradient_threshold {
            issues.push(ValidationIssue::ExplodingGradients);
            recommendations.push("tighten gradient clipping".to_string());
        } else if result.gradient_norm.is_finite()
            && result.gradient_norm < self.config.vanishing_gradient_threshold
        {
            issues.push(ValidationIssue::VanishingGradients);
            warnings.push(format!(
                "gradient norm {:.3e} below {:.3e}",
                result.gradient_norm, self.config.vanishing_gradient_threshold
            ));
        }
        if result.policy_entropy.is_finite()
            && result.policy_entropy < self.config.policy_collapse_entropy_threshold
        {
            issues.push(ValidationIssue::PolicyCollapse);
            recommendations.push("raise exploration or add entropy regularization".to_string());
        }
        if result.q_mean.is_finite()
            && result.target_mean.is_finite()
            && (result.q_mean - result.target_mean).abs() > self.config.q_overestimation_threshold
        {
            issues.push(ValidationIssue::QOverestimation);
            warnings.push(format!(
                "q mean {:.3} drifted from target mean {:.3}",
                result.q_mean, result.target_mean
            ));
        }
        if let Some(previous) = self.previous_loss {
            if previous > 0.0
                && result.loss.is_finite()
                && result.loss / previous > crate::LOSS_EXPLOSION_FACTOR
            {
                issues.push(ValidationIssue::LossExplosion);
                warnings.push(format!(
                    "loss jumped {:.1}x in one update",
                    result.loss / previous
                ));
            }
        }
        if result.loss.is_finite() {
            self.previous_loss = Some(result.loss);
        }

        UpdateValidation {
            is_valid: !issues.iter().any(|i| i.is_blocking()),
            issues,
            warnings,
            recommendations,
        }
    }
}
