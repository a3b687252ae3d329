mod config;
mod events;
mod orchestrator;
mod play;
mod report;
mod schedule;

pub use config::Config;
pub use config::LearningConfig;
pub use config::ScheduleConfig;
pub use events::Events;
pub use events::TrainingEvent;
pub use orchestrator::Orchestrator;
pub use play::PlayReply;
pub use play::PlaySession;
pub use report::CycleRecord;
pub use report::EvaluationStats;
pub use report::FinalMetrics;
pub use report::RunReport;
pub use report::ScheduleSnapshot;
pub use report::SelfPlayStats;
pub use report::StopReason;
pub use report::TrainingStats;

use crate::errors::Result;

/// library entry point behind `run train`
pub fn train(config: Config, cycles: u64) -> Result<RunReport> {
    let mut orchestrator = Orchestrator::new(config)?;
    Ok(orchestrator.run(cycles))
}

/// library entry point behind `run eval`
pub fn evaluate(config: Config, checkpoint: &str, games: u64) -> Result<EvaluationStats> {
    Orchestrator::new(config)?.evaluate_checkpoint(checkpoint, games)
}
