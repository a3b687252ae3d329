mod experience;
mod store;

pub use experience::EnhancedExperience;
pub use experience::Experience;
pub use experience::GameOutcome;
pub use experience::GamePhase;
pub use experience::TerminationReason;
pub use store::CleanupStrategy;
pub use store::ReplayStats;
pub use store::ReplayStore;
pub use store::SamplingStrategy;
pub use store::StoreConfig;
