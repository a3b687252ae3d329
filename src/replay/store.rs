use super::EnhancedExperience;
use super::Experience;
use crate::seed::SeedManager;
use rand::Rng;
use rand::rngs::SmallRng;
use std::collections::BTreeSet;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    Uniform,
    Recent,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupStrategy {
    OldestFirst,
    LowestQuality,
    Random,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub max_experience_buffer_size: usize,
    pub sampling_strategy: SamplingStrategy,
    pub cleanup_strategy: CleanupStrategy,
    pub memory_cleanup_interval: usize,
    pub enable_memory_optimization: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_experience_buffer_size: 50_000,
            sampling_strategy: SamplingStrategy::Mixed,
            cleanup_strategy: CleanupStrategy::LowestQuality,
            memory_cleanup_interval: 10,
            enable_memory_optimization: true,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_experience_buffer_size == 0 {
            return Err("max_experience_buffer_size must be positive".to_string());
        }
        Ok(())
    }
}

/// aggregate counters, maintained in the same mutation that moves
/// the buffer so a reader never sees them out of sync
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ReplayStats {
    pub size: usize,
    pub capacity: usize,
    pub total_ingested: u64,
    pub total_evicted: u64,
    pub total_discarded: u64,
    pub total_sampled: u64,
    pub outcomes: [u64; 4],
    pub phases: [u64; 3],
    pub quality_deciles: [u64; 10],
}

struct Stored {
    seq: u64,
    experience: EnhancedExperience,
}

/// bounded curated buffer. insertion-ordered arena addressed by a
/// monotone sequence number; single writer (the orchestrator),
/// never shared with workers.
pub struct ReplayStore {
    config: StoreConfig,
    entries: VecDeque<Stored>,
    next_seq: u64,
    ingests: usize,
    sampling_rng: SmallRng,
    eviction_rng: SmallRng,
    stats: ReplayStats,
}

impl ReplayStore {
    pub fn new(config: StoreConfig, seeds: &SeedManager) -> Self {
        let stats = ReplayStats {
            capacity: config.max_experience_buffer_size,
            ..ReplayStats::default()
        };
        Self {
            entries: VecDeque::with_capacity(config.max_experience_buffer_size.min(1 << 16)),
            next_seq: 0,
            ingests: 0,
            sampling_rng: seeds.sampling_rng(),
            eviction_rng: seeds.eviction_rng(),
            stats,
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn capacity(&self) -> usize {
        self.config.max_experience_buffer_size
    }

    /// append a batch, then evict back under capacity. counters
    /// move in the same call. a batch larger than the whole buffer
    /// sheds its oldest extras up front and counts them discarded.
    pub fn ingest(&mut self, mut batch: Vec<EnhancedExperience>) {
        let capacity = self.capacity();
        if batch.len() > capacity {
            let excess = batch.len() - capacity;
            batch.drain(..excess);
            self.stats.total_discarded += excess as u64;
        }
        for experience in batch {
            self.stats.total_ingested += 1;
            self.count(&experience, 1);
            self.entries.push_back(Stored {
                seq: self.next_seq,
                experience,
            });
            self.next_seq += 1;
        }
        self.evict_to(capacity);
        self.ingests += 1;
        if self.config.enable_memory_optimization
            && self.config.memory_cleanup_interval > 0
            && self.ingests % self.config.memory_cleanup_interval == 0
        {
            self.entries.shrink_to_fit();
        }
        self.stats.size = self.entries.len();
    }

    /// reduce to capacity under the configured strategy
    pub fn cleanup(&mut self) {
        self.evict_to(self.capacity());
        self.stats.size = self.entries.len();
    }

    pub fn stats(&self) -> ReplayStats {
        let mut stats = self.stats.clone();
        stats.size = self.entries.len();
        stats
    }

    /// draw n basic experiences under the given strategy. uniform
    /// is without replacement while n fits, recent draws from the
    /// freshest quarter (at least n wide), mixed is half and half.
    pub fn sample(&mut self, n: usize, strategy: SamplingStrategy) -> Vec<Experience> {
        if self.entries.is_empty() || n == 0 {
            return Vec::new();
        }
        let batch = match strategy {
            SamplingStrategy::Uniform => self.sample_range(n, 0),
            SamplingStrategy::Recent => {
                let window = self.recent_window(n);
                self.sample_range(n, self.entries.len() - window)
            }
            SamplingStrategy::Mixed => {
                let uniform = n / 2;
                let recent = n - uniform;
                let window = self.recent_window(recent);
                let mut batch = self.sample_range(uniform, 0);
                batch.extend(self.sample_range(recent, self.entries.len() - window));
                batch
            }
        };
        self.stats.total_sampled += batch.len() as u64;
        batch
    }

    fn recent_window(&self, n: usize) -> usize {
        (self.entries.len() / 4).max(n).min(self.entries.len())
    }

    /// sample from entries[start..], without replacement when it
    /// fits, with replacement otherwise
    fn sample_range(&mut self, n: usize, start: usize) -> Vec<Experience> {
        let len = self.entries.len() - start;
        if n == 0 || len == 0 {
            return Vec::new();
        }
        if n <= len {
            rand::seq::index::sample(&mut self.sampling_rng, len, n)
                .into_iter()
                .map(|i| self.entries[start + i].experience.experience.clone())
                .collect()
        } else {
            (0..n)
                .map(|_| {
                    let i = self.sampling_rng.random_range(0..len);
                    self.entries[start + i].experience.experience.clone()
                })
                .collect()
        }
    }

    fn evict_to(&mut self, capacity: usize) {
        if self.entries.len() <= capacity {
            return;
        }
        let excess = self.entries.len() - capacity;
        match self.config.cleanup_strategy {
            CleanupStrategy::OldestFirst => {
                for _ in 0..excess {
                    if let Some(stored) = self.entries.pop_front() {
                        self.count(&stored.experience, -1);
                        self.stats.total_evicted += 1;
                    }
                }
            }
            CleanupStrategy::LowestQuality => {
                // ascending quality, ties broken by oldest first
                let mut ranked = self
                    .entries
                    .iter()
                    .map(|s| (s.experience.quality, s.seq))
                    .collect::<Vec<_>>();
                ranked.sort_by(|a, b| {
                    a.0.partial_cmp(&b.0)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(a.1.cmp(&b.1))
                });
                let doomed = ranked
                    .into_iter()
                    .take(excess)
                    .map(|(_, seq)| seq)
                    .collect::<BTreeSet<_>>();
                self.remove_seqs(&doomed);
            }
            CleanupStrategy::Random => {
                let doomed = rand::seq::index::sample(
                    &mut self.eviction_rng,
                    self.entries.len(),
                    excess,
                )
                .into_iter()
                .map(|i| self.entries[i].seq)
                .collect::<BTreeSet<_>>();
                self.remove_seqs(&doomed);
            }
        }
    }

    fn remove_seqs(&mut self, doomed: &BTreeSet<u64>) {
        let mut removed = 0u64;
        let mut histograms = [0i64; 17];
        self.entries.retain(|stored| {
            if doomed.contains(&stored.seq) {
                removed += 1;
                // defer histogram updates out of the closure
                histograms[stored.experience.outcome.index()] -= 1;
                histograms[4 + stored.experience.phase.index()] -= 1;
                histograms[7 + Self::decile(stored.experience.quality)] -= 1;
                false
            } else {
                true
            }
        });
        for i in 0..4 {
            self.stats.outcomes[i] = (self.stats.outcomes[i] as i64 + histograms[i]) as u64;
        }
        for i in 0..3 {
            self.stats.phases[i] = (self.stats.phases[i] as i64 + histograms[4 + i]) as u64;
        }
        for i in 0..10 {
            self.stats.quality_deciles[i] =
                (self.stats.quality_deciles[i] as i64 + histograms[7 + i]) as u64;
        }
        self.stats.total_evicted += removed;
    }

    fn count(&mut self, experience: &EnhancedExperience, sign: i64) {
        let outcome = &mut self.stats.outcomes[experience.outcome.index()];
        *outcome = (*outcome as i64 + sign) as u64;
        let phase = &mut self.stats.phases[experience.phase.index()];
        *phase = (*phase as i64 + sign) as u64;
        let decile = &mut self.stats.quality_deciles[Self::decile(experience.quality)];
        *decile = (*decile as i64 + sign) as u64;
    }

    fn decile(quality: f32) -> usize {
        ((quality * 10.0) as usize).min(9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::Side;
    use crate::replay::GameOutcome;
    use crate::replay::TerminationReason;

    fn experience(game_id: u64, move_number: u32, reward: f32) -> EnhancedExperience {
        EnhancedExperience::new(
            Experience {
                state: vec![game_id as f32, move_number as f32],
                action: 0,
                reward,
                next_state: vec![0.0, 0.0],
                terminal: false,
            },
            game_id,
            move_number,
            Side::White,
            GameOutcome::Ongoing,
            TerminationReason::GameEnded,
        )
    }

    fn store(capacity: usize, cleanup: CleanupStrategy) -> ReplayStore {
        ReplayStore::new(
            StoreConfig {
                max_experience_buffer_size: capacity,
                cleanup_strategy: cleanup,
                ..StoreConfig::default()
            },
            &SeedManager::new(42),
        )
    }

    #[test]
    fn capacity_holds_after_every_ingest() {
        let mut store = store(25, CleanupStrategy::OldestFirst);
        for wave in 0..10 {
            store.ingest((0..7).map(|i| experience(wave, i + 1, 0.0)).collect());
            assert!(store.len() <= 25);
        }
        assert!(store.stats().total_evicted > 0);
    }

    #[test]
    fn lowest_quality_evicts_the_k_smallest() {
        let mut store = store(50, CleanupStrategy::LowestQuality);
        // descending quality: later items are strictly worse
        let batch = (0..100)
            .map(|i| experience(i, 1, 1.0 - i as f32 / 50.0))
            .collect::<Vec<_>>();
        let qualities = batch.iter().map(|e| e.quality).collect::<Vec<_>>();
        let mut expected = qualities.clone();
        expected.sort_by(|a, b| b.partial_cmp(a).unwrap());
        expected.truncate(50);
        store.ingest(batch);
        assert_eq!(store.len(), 50);
        let mut kept = store
            .entries
            .iter()
            .map(|s| s.experience.quality)
            .collect::<Vec<_>>();
        kept.sort_by(|a, b| b.partial_cmp(a).unwrap());
        assert_eq!(kept, expected);
    }

    #[test]
    fn oldest_first_keeps_the_newest() {
        let mut store = store(3, CleanupStrategy::OldestFirst);
        store.ingest((0..5).map(|i| experience(i, 1, 0.0)).collect());
        let ids = store
            .entries
            .iter()
            .map(|s| s.experience.game_id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn sampling_is_deterministic_under_a_seed() {
        let build = || {
            let mut s = store(100, CleanupStrategy::OldestFirst);
            s.ingest((0..50).map(|i| experience(i, 1, 0.1)).collect());
            s
        };
        for strategy in [
            SamplingStrategy::Uniform,
            SamplingStrategy::Recent,
            SamplingStrategy::Mixed,
        ] {
            let a = build().sample(10, strategy);
            let b = build().sample(10, strategy);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn uniform_without_replacement_has_no_duplicates() {
        let mut store = store(100, CleanupStrategy::OldestFirst);
        store.ingest((0..50).map(|i| experience(i, 1, 0.0)).collect());
        let batch = store.sample(50, SamplingStrategy::Uniform);
        let mut ids = batch
            .iter()
            .map(|e| e.state[0] as u64)
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn oversized_batches_shed_their_oldest_and_count_discards() {
        let mut store = store(10, CleanupStrategy::OldestFirst);
        store.ingest((0..25).map(|i| experience(i, 1, 0.0)).collect());
        assert_eq!(store.len(), 10);
        let stats = store.stats();
        assert_eq!(stats.total_discarded, 15);
        // the newest ten survive
        assert_eq!(
            store.entries.front().unwrap().experience.game_id,
            15
        );
    }

    #[test]
    fn histograms_track_the_buffer() {
        let mut store = store(10, CleanupStrategy::OldestFirst);
        store.ingest((0..10).map(|i| experience(i, 1, 0.0)).collect());
        let stats = store.stats();
        assert_eq!(stats.outcomes[GameOutcome::Ongoing.index()], 10);
        assert_eq!(stats.phases.iter().sum::<u64>(), 10);
        assert_eq!(stats.quality_deciles.iter().sum::<u64>(), 10);
        store.ingest((10..15).map(|i| experience(i, 1, 0.0)).collect());
        let stats = store.stats();
        assert_eq!(stats.phases.iter().sum::<u64>(), 10);
    }
}
