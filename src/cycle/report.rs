use crate::Performance;
use crate::selfplay::SelfPlayReport;
use crate::validator::ConvergenceStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Completed,
    EarlyStopped,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SelfPlayStats {
    pub games: usize,
    pub experiences: usize,
    pub outcomes: [usize; 4],
    pub average_length: f32,
    pub cancelled: usize,
    pub error_games: usize,
    pub illegal_actions: usize,
}

impl From<&SelfPlayReport> for SelfPlayStats {
    fn from(report: &SelfPlayReport) -> Self {
        Self {
            games: report.total_games(),
            experiences: report.total_experiences(),
            outcomes: report.outcomes(),
            average_length: report.average_length(),
            cancelled: report.cancelled,
            error_games: report.error_games(),
            illegal_actions: report.illegal_actions(),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TrainingStats {
    pub batches: usize,
    pub valid_updates: usize,
    pub invalid_updates: usize,
    pub average_loss: f32,
    pub average_entropy: f32,
    pub average_gradient_norm: f32,
    pub average_q: f32,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct EvaluationStats {
    pub games: usize,
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
    pub performance: Performance,
}

impl EvaluationStats {
    /// win_rate + half the draw_rate
    pub fn score(wins: usize, draws: usize, games: usize) -> Performance {
        if games == 0 {
            0.0
        } else {
            (wins as f32 + 0.5 * draws as f32) / games as f32
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScheduleSnapshot {
    pub games_per_cycle: usize,
    pub training_ratio: f32,
    pub exploration: f32,
}

/// everything one cycle produced, in phase order
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CycleRecord {
    pub cycle: u64,
    pub self_play: SelfPlayStats,
    pub training: TrainingStats,
    pub evaluation: EvaluationStats,
    pub schedule: ScheduleSnapshot,
    pub convergence_status: ConvergenceStatus,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct FinalMetrics {
    pub total_games: usize,
    pub total_experiences: usize,
    pub total_updates: usize,
    pub best_checkpoint: Option<String>,
    pub best_performance: Option<Performance>,
}

/// structured result returned across the api boundary instead of
/// a panic or an early process exit
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunReport {
    pub completed_cycles: u64,
    pub final_metrics: FinalMetrics,
    pub stop_reason: StopReason,
    pub issues: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_blends_wins_and_draws() {
        assert_eq!(EvaluationStats::score(4, 0, 8), 0.5);
        assert_eq!(EvaluationStats::score(0, 8, 8), 0.5);
        assert_eq!(EvaluationStats::score(8, 0, 8), 1.0);
        assert_eq!(EvaluationStats::score(0, 0, 0), 0.0);
    }
}
