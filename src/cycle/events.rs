use super::StopReason;
use crate::Performance;
use crate::validator::ValidationIssue;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::Sender;

/// progress reporting as a typed stream the caller may consume or
/// ignore; a dropped receiver costs nothing
#[derive(Debug, Clone)]
pub enum TrainingEvent {
    RunStarted { cycles: u64 },
    CycleStarted { cycle: u64 },
    SelfPlayFinished { cycle: u64, games: usize, experiences: usize },
    TrainingFinished { cycle: u64, batches: usize, invalid: usize },
    EvaluationFinished { cycle: u64, performance: Performance },
    CheckpointSaved { cycle: u64, id: String, best: bool },
    ValidationFlagged { cycle: u64, issue: ValidationIssue },
    Stopped { reason: StopReason },
}

#[derive(Debug, Default)]
pub struct Events(Option<Sender<TrainingEvent>>);

impl Events {
    pub fn ignored() -> Self {
        Self(None)
    }
    pub fn channel() -> (Self, Receiver<TrainingEvent>) {
        let (tx, rx) = std::sync::mpsc::channel();
        (Self(Some(tx)), rx)
    }
    /// send errors mean nobody is listening, which is fine
    pub fn emit(&self, event: TrainingEvent) {
        if let Some(tx) = &self.0 {
            tx.send(event).ok();
        }
    }
}
