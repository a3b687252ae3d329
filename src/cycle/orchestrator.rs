use super::Config;
use super::CycleRecord;
use super::EvaluationStats;
use super::Events;
use super::FinalMetrics;
use super::RunReport;
use super::SelfPlayStats;
use super::StopReason;
use super::TrainingEvent;
use super::TrainingStats;
use super::schedule::Schedule;
use crate::approximator::Approximator;
use crate::approximator::Network;
use crate::approximator::TrainingSample;
use crate::checkpoint::CheckpointManager;
use crate::errors::ChessError;
use crate::errors::Result;
use crate::replay::ReplayStore;
use crate::replay::TerminationReason;
use crate::rewards::RewardShaper;
use crate::seed::SeedManager;
use crate::selfplay::Runner;
use crate::validator::ConvergenceAnalyzer;
use crate::validator::ConvergenceStatus;
use crate::validator::CyclePoint;
use crate::validator::TrainingValidator;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Instant;

/// drives the cycle loop: self-play, ingest, train, evaluate,
/// checkpoint, adapt. sole owner of every long-lived component;
/// workers only ever see frozen parameter snapshots.
pub struct Orchestrator {
    config: Config,
    seeds: SeedManager,
    network: Network,
    store: ReplayStore,
    validator: TrainingValidator,
    analyzer: ConvergenceAnalyzer,
    checkpoints: CheckpointManager,
    schedule: Schedule,
    events: Events,
    stop: Arc<AtomicBool>,
    opponent_blob: Vec<u8>,
    last_record: Option<CycleRecord>,
    totals: FinalMetrics,
    issues: Vec<String>,
}

impl Orchestrator {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let seed = if config.deterministic_mode {
            config.master_seed
        } else {
            rand::random()
        };
        let seeds = SeedManager::new(seed);
        let learning = &config.learning;
        let mut network = Network::new(
            learning.mode,
            &learning.hidden_layers,
            learning.learning_rate,
            learning.discount,
            learning.gradient_clip_threshold,
            learning.target_update_frequency,
            &mut seeds.init_rng(),
        );
        network.set_exploration(learning.exploration_rate);
        if network.state_dim() != crate::FEATURES || network.action_dim() != crate::ACTIONS {
            return Err(ChessError::CodecMismatch {
                expected: crate::FEATURES,
                actual: network.state_dim(),
            });
        }
        let store = ReplayStore::new(config.store.clone(), &seeds);
        let validator = TrainingValidator::new(config.validation.clone());
        let analyzer = ConvergenceAnalyzer::new(&config.validation);
        let checkpoints = CheckpointManager::new(&config.checkpointing)?;
        let schedule = Schedule::new(&config.scheduling, &config.learning);
        let opponent_blob = network.snapshot();
        log::info!(
            "orchestrator up: seed {}, {} features, {} actions",
            seed,
            crate::FEATURES,
            crate::ACTIONS
        );
        Ok(Self {
            config,
            seeds,
            network,
            store,
            validator,
            analyzer,
            checkpoints,
            schedule,
            events: Events::ignored(),
            stop: Arc::new(AtomicBool::new(false)),
            opponent_blob,
            last_record: None,
            totals: FinalMetrics::default(),
            issues: Vec::new(),
        })
    }

    /// cooperative stop flag; checked at cycle boundaries and
    /// between moves inside the runner
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// attach a consumer to the progress stream
    pub fn subscribe(&mut self) -> std::sync::mpsc::Receiver<TrainingEvent> {
        let (events, receiver) = Events::channel();
        self.events = events;
        receiver
    }

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// the top-level loop. runs T cycles or stops early on
    /// cancellation, converged/declining verdicts, or failure.
    pub fn run(&mut self, cycles: u64) -> RunReport {
        self.events.emit(TrainingEvent::RunStarted { cycles });
        let mut completed = 0;
        let mut stop_reason = StopReason::Completed;
        for cycle in 1..=cycles {
            if self.stop.load(Ordering::Relaxed) {
                stop_reason = StopReason::Cancelled;
                break;
            }
            match self.run_cycle(cycle) {
                Ok(record) => {
                    completed += 1;
                    let status = record.convergence_status;
                    log::info!(
                        "cycle {}: {} games, loss {:.4}, performance {:.3}, {:?}",
                        cycle,
                        record.self_play.games,
                        record.training.average_loss,
                        record.evaluation.performance,
                        status
                    );
                    self.last_record = Some(record);
                    if self.config.validation.enable_early_stopping
                        && matches!(
                            status,
                            ConvergenceStatus::Converged | ConvergenceStatus::Declining
                        )
                    {
                        log::info!("early stop: validator reports {:?}", status);
                        stop_reason = StopReason::EarlyStopped;
                        break;
                    }
                }
                Err(ChessError::Cancelled) => {
                    stop_reason = StopReason::Cancelled;
                    break;
                }
                Err(e) => {
                    log::error!("cycle {} failed: {}", cycle, e);
                    self.issues.push(e.to_string());
                    self.dump_diagnostics();
                    stop_reason = StopReason::Failed;
                    break;
                }
            }
        }
        self.events.emit(TrainingEvent::Stopped {
            reason: stop_reason,
        });
        RunReport {
            completed_cycles: completed,
            final_metrics: self.final_metrics(),
            stop_reason,
            issues: self.issues.clone(),
        }
    }

    fn run_cycle(&mut self, cycle: u64) -> Result<CycleRecord> {
        let started = Instant::now();
        self.events.emit(TrainingEvent::CycleStarted { cycle });

        // opponent snapshot policy: refresh every
        // opponent_update_frequency cycles, frozen in between
        if (cycle - 1) % self.config.scheduling.opponent_update_frequency == 0 {
            self.opponent_blob = self.network.snapshot();
        }
        let mut opponent = self.network.clone();
        opponent.restore(&self.opponent_blob)?;

        // self-play phase
        let games = self.schedule.games_per_cycle() as u64;
        let exploration = self.schedule.exploration();
        let selfplay_seeds = self.seeds.derived(b"selfplay", cycle);
        let report = Runner::new(
            RewardShaper::new(self.config.rewards.clone()),
            &selfplay_seeds,
            self.config.scheduling.max_steps_per_game,
            self.config.scheduling.max_concurrent_games,
        )
        .run(&self.network, &opponent, games, exploration, &self.stop);
        let self_play = SelfPlayStats::from(&report);
        self.events.emit(TrainingEvent::SelfPlayFinished {
            cycle,
            games: self_play.games,
            experiences: self_play.experiences,
        });
        if self_play.illegal_actions > crate::MAX_ILLEGAL_ACTIONS_PER_CYCLE {
            return Err(ChessError::Internal(format!(
                "{} illegal actions from the approximator in cycle {}",
                self_play.illegal_actions, cycle
            )));
        }

        // ingest phase: error games contribute nothing
        let experiences = report
            .games
            .into_iter()
            .filter(|g| g.termination != TerminationReason::Error)
            .flat_map(|g| g.experiences)
            .collect::<Vec<_>>();
        let average_reward = if experiences.is_empty() {
            0.0
        } else {
            experiences
                .iter()
                .map(|e| e.experience.reward)
                .sum::<f32>()
                / experiences.len() as f32
        };
        self.totals.total_games += self_play.games;
        self.totals.total_experiences += experiences.len();
        self.store.ingest(experiences);

        // training phase
        let training = self.train(cycle)?;
        self.events.emit(TrainingEvent::TrainingFinished {
            cycle,
            batches: training.batches,
            invalid: training.invalid_updates,
        });

        // evaluation phase
        let evaluation = self.evaluate(cycle)?;
        self.events.emit(TrainingEvent::EvaluationFinished {
            cycle,
            performance: evaluation.performance,
        });

        // checkpoint phase
        if cycle % self.config.checkpointing.checkpoint_interval == 0 {
            self.checkpoint(cycle, evaluation.performance);
        }

        // adaptation phase
        self.analyzer.push(CyclePoint {
            average_reward,
            average_loss: training.average_loss,
            average_entropy: training.average_entropy,
        });
        let status = self.analyzer.analyze().status;
        self.schedule.adapt(status, training.average_entropy);

        Ok(CycleRecord {
            cycle,
            self_play,
            training,
            evaluation,
            schedule: self.schedule.snapshot(),
            convergence_status: status,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// draw and apply mini-batches, screening every update. invalid
    /// updates are rolled back; too many of them abort the run.
    fn train(&mut self, cycle: u64) -> Result<TrainingStats> {
        let batch_size = self.config.learning.batch_size;
        let strategy = self.config.store.sampling_strategy;
        let mut stats = TrainingStats::default();
        let mut loss = 0.0;
        let mut entropy = 0.0;
        let mut norm = 0.0;
        let mut q = 0.0;
        for batch_index in 0..self.schedule.batches() {
            if self.store.len() < batch_size {
                break;
            }
            let batch = self
                .store
                .sample(batch_size, strategy)
                .into_iter()
                .map(|e| TrainingSample {
                    state: e.state,
                    action: e.action,
                    reward: e.reward,
                    next_state: e.next_state,
                    terminal: e.terminal,
                })
                .collect::<Vec<_>>();
            let result = self.network.train_batch(&batch)?;
            let validation = self.validator.screen(&result);
            for issue in validation.issues.iter() {
                self.events.emit(TrainingEvent::ValidationFlagged {
                    cycle,
                    issue: *issue,
                });
            }
            stats.batches += 1;
            if validation.is_valid {
                stats.valid_updates += 1;
                loss += result.loss;
                entropy += result.policy_entropy;
                norm += result.gradient_norm;
                q += result.q_mean;
            } else {
                self.network.rollback();
                stats.invalid_updates += 1;
                log::warn!(
                    "cycle {}: update {} rolled back ({:?})",
                    cycle,
                    batch_index,
                    validation.issues
                );
                if stats.invalid_updates > crate::MAX_NONFINITE_UPDATES_PER_CYCLE {
                    return Err(ChessError::NonFiniteUpdate { batch: batch_index });
                }
            }
        }
        if stats.valid_updates > 0 {
            let n = stats.valid_updates as f32;
            stats.average_loss = loss / n;
            stats.average_entropy = entropy / n;
            stats.average_gradient_norm = norm / n;
            stats.average_q = q / n;
        }
        self.totals.total_updates += stats.valid_updates;
        Ok(stats)
    }

    /// head-to-head against the best checkpoint so far, or the
    /// frozen opponent snapshot before any checkpoint exists.
    /// both sides play greedily.
    fn evaluate(&mut self, cycle: u64) -> Result<EvaluationStats> {
        let contender = self.network.clone();
        let mut rival = self.network.clone();
        let best = self.checkpoints.select_best().map(|c| c.id.clone());
        match best {
            Some(id) => match self.checkpoints.load_blob(&id) {
                Ok(blob) => rival.restore(&blob)?,
                Err(e) => {
                    log::warn!("evaluation falls back to opponent snapshot: {}", e);
                    rival.restore(&self.opponent_blob)?;
                }
            },
            None => rival.restore(&self.opponent_blob)?,
        }
        let seeds = self.seeds.derived(b"evaluation", cycle);
        let report = Runner::new(
            RewardShaper::new(self.config.rewards.clone()),
            &seeds,
            self.config.scheduling.max_steps_per_game,
            self.config.scheduling.max_concurrent_games,
        )
        .run(
            &contender,
            &rival,
            self.config.scheduling.evaluation_games_per_cycle,
            0.0,
            &self.stop,
        );
        let (wins, draws, losses) = report.score_for_main();
        let games = report.total_games();
        Ok(EvaluationStats {
            games,
            wins,
            draws,
            losses,
            performance: EvaluationStats::score(wins, draws, games),
        })
    }

    /// persist and validate a checkpoint; io failures keep the
    /// previous best and the run alive
    fn checkpoint(&mut self, cycle: u64, performance: f32) {
        let blob = self.network.snapshot();
        match self.checkpoints.save(cycle, &blob, performance) {
            Ok(id) => {
                let network = self.network.clone();
                if let Err(e) = self.checkpoints.validate(&id, &network) {
                    log::warn!("checkpoint {} validation: {}", id, e);
                }
                if let Err(e) = self.checkpoints.prune() {
                    log::warn!("checkpoint prune: {}", e);
                }
                let best = self
                    .checkpoints
                    .get(&id)
                    .map(|c| c.is_best)
                    .unwrap_or(false);
                self.events.emit(TrainingEvent::CheckpointSaved { cycle, id, best });
            }
            Err(e) => {
                log::warn!("checkpoint save failed, keeping previous best: {}", e);
                self.issues.push(e.to_string());
            }
        }
    }

    /// evaluate a saved checkpoint against a fresh baseline
    pub fn evaluate_checkpoint(&mut self, id: &str, games: u64) -> Result<EvaluationStats> {
        let mut contender = self.network.clone();
        self.checkpoints.load(id, &mut contender)?;
        let baseline = self.network.clone();
        let seeds = self.seeds.derived(b"evaluation", 0);
        let report = Runner::new(
            RewardShaper::new(self.config.rewards.clone()),
            &seeds,
            self.config.scheduling.max_steps_per_game,
            self.config.scheduling.max_concurrent_games,
        )
        .run(&contender, &baseline, games, 0.0, &self.stop);
        let (wins, draws, losses) = report.score_for_main();
        let total = report.total_games();
        Ok(EvaluationStats {
            games: total,
            wins,
            draws,
            losses,
            performance: EvaluationStats::score(wins, draws, total),
        })
    }

    /// restore the current best checkpoint into the live network
    pub fn restore_best(&mut self) -> Result<Option<String>> {
        let best = self.checkpoints.select_best().map(|c| c.id.clone());
        match best {
            None => Ok(None),
            Some(id) => {
                let mut network = self.network.clone();
                self.checkpoints.load(&id, &mut network)?;
                self.network = network;
                Ok(Some(id))
            }
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    fn final_metrics(&self) -> FinalMetrics {
        let best = self.checkpoints.select_best();
        FinalMetrics {
            total_games: self.totals.total_games,
            total_experiences: self.totals.total_experiences,
            total_updates: self.totals.total_updates,
            best_checkpoint: best.map(|c| c.id.clone()),
            best_performance: best.map(|c| c.performance_score),
        }
    }

    /// on unrecoverable errors, leave the last cycle record and the
    /// convergence picture next to the checkpoints
    fn dump_diagnostics(&self) {
        let diagnostics = serde_json::json!({
            "last_cycle": self.last_record,
            "convergence": if self.analyzer.is_empty() { None } else { Some(self.analyzer.analyze()) },
            "issues": self.issues,
        });
        let path = self.checkpoints.directory().join("diagnostics.json");
        if let Err(e) = std::fs::write(&path, diagnostics.to_string()) {
            log::error!("diagnostics dump failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str, seed: u64) -> Config {
        let directory = std::env::temp_dir().join(format!(
            "chessrl-orch-{}-{}",
            std::process::id(),
            name
        ));
        std::fs::remove_dir_all(&directory).ok();
        let mut config = Config::new();
        config.master_seed = seed;
        config.scheduling.initial_games_per_cycle = 2;
        config.scheduling.min_games_per_cycle = 1;
        config.scheduling.max_games_per_cycle = 4;
        config.scheduling.max_concurrent_games = 2;
        config.scheduling.max_steps_per_game = 3;
        config.scheduling.evaluation_games_per_cycle = 2;
        config.learning.hidden_layers = vec![8];
        config.learning.batch_size = 2;
        config.learning.max_batches_per_cycle = 2;
        config.checkpointing.checkpoint_directory = directory.to_string_lossy().into_owned();
        config
    }

    #[test]
    fn two_cycles_end_to_end() {
        let mut orchestrator = Orchestrator::new(config("e2e", 42)).unwrap();
        let report = orchestrator.run(2);
        assert_eq!(report.stop_reason, StopReason::Completed);
        assert_eq!(report.completed_cycles, 2);
        assert_eq!(report.final_metrics.total_games, 4);
        assert!(report.final_metrics.total_updates <= 4);
        let best = report.final_metrics.best_performance.unwrap();
        assert!((0.0..=1.0).contains(&best));
        assert!(report.final_metrics.best_checkpoint.is_some());
    }

    #[test]
    fn identical_seeds_replay_identically() {
        let report_a = Orchestrator::new(config("replay-a", 2025)).unwrap().run(1);
        let report_b = Orchestrator::new(config("replay-b", 2025)).unwrap().run(1);
        assert_eq!(
            report_a.final_metrics.total_experiences,
            report_b.final_metrics.total_experiences
        );
        assert_eq!(
            report_a.final_metrics.best_performance,
            report_b.final_metrics.best_performance
        );
    }

    #[test]
    fn cancellation_stops_at_the_boundary() {
        let mut orchestrator = Orchestrator::new(config("cancel", 7)).unwrap();
        orchestrator.stop_handle().store(true, Ordering::Relaxed);
        let report = orchestrator.run(5);
        assert_eq!(report.stop_reason, StopReason::Cancelled);
        assert_eq!(report.completed_cycles, 0);
    }

    #[test]
    fn events_cover_every_phase() {
        let mut orchestrator = Orchestrator::new(config("events", 13)).unwrap();
        let receiver = orchestrator.subscribe();
        orchestrator.run(1);
        let events = receiver.try_iter().collect::<Vec<_>>();
        assert!(matches!(events.first(), Some(TrainingEvent::RunStarted { .. })));
        assert!(events.iter().any(|e| matches!(e, TrainingEvent::SelfPlayFinished { .. })));
        assert!(events.iter().any(|e| matches!(e, TrainingEvent::EvaluationFinished { .. })));
        assert!(events.iter().any(|e| matches!(e, TrainingEvent::CheckpointSaved { .. })));
        assert!(matches!(events.last(), Some(TrainingEvent::Stopped { .. })));
    }

    #[test]
    fn bad_config_refuses_to_start() {
        let mut bad = config("bad", 1);
        bad.learning.batch_size = 0;
        assert!(matches!(
            Orchestrator::new(bad),
            Err(ChessError::ConfigInvalid(_))
        ));
    }
}
