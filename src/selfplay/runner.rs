use super::SelfPlayReport;
use super::game;
use crate::approximator::Approximator;
use crate::rewards::RewardShaper;
use crate::seed::SeedManager;
use rayon::iter::IntoParallelIterator;
use rayon::iter::ParallelIterator;
use std::sync::atomic::AtomicBool;

/// concurrent game generator. workers get frozen approximator
/// references and per-game rng seeds; completion order is
/// irrelevant because results are re-sorted by game id at the
/// barrier.
pub struct Runner<'a> {
    shaper: RewardShaper,
    seeds: &'a SeedManager,
    max_steps: u32,
    concurrency: usize,
}

impl<'a> Runner<'a> {
    pub fn new(
        shaper: RewardShaper,
        seeds: &'a SeedManager,
        max_steps: u32,
        concurrency: usize,
    ) -> Self {
        Self {
            shaper,
            seeds,
            max_steps,
            concurrency: concurrency.clamp(1, num_cpus::get()),
        }
    }

    /// run `games` complete games between the main and opponent
    /// parameter sets, at most `concurrency` in flight
    pub fn run<A: Approximator>(
        &self,
        main: &A,
        opponent: &A,
        games: u64,
        exploration: f32,
        stop: &AtomicBool,
    ) -> SelfPlayReport {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .build()
            .expect("build worker pool");
        let mut results = pool.install(|| {
            (0..games)
                .into_par_iter()
                .filter_map(|game_id| {
                    game::play(
                        game_id,
                        main,
                        opponent,
                        &self.shaper,
                        self.seeds,
                        self.max_steps,
                        exploration,
                        stop,
                    )
                })
                .collect::<Vec<_>>()
        });
        results.sort_by_key(|g| g.game_id);
        let cancelled = games as usize - results.len();
        log::debug!(
            "self-play: {} games, {} cancelled, {} experiences",
            results.len(),
            cancelled,
            results.iter().map(|g| g.experiences.len()).sum::<usize>()
        );
        SelfPlayReport {
            games: results,
            cancelled,
        }
    }
}
