use rand::SeedableRng;
use rand::rngs::SmallRng;

/// every stream of randomness in a run is derived from the master
/// seed by FNV-1a mixing over a domain label, so two runs with the
/// same seed replay identically regardless of which subsystems
/// happen to draw in which order. owned by the orchestrator and
/// passed by reference into the runner.
#[derive(Debug, Clone, Copy)]
pub struct SeedManager {
    master: u64,
}

impl SeedManager {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new(master: u64) -> Self {
        Self { master }
    }
    pub fn master(&self) -> u64 {
        self.master
    }

    /// per-game rng, stable under worker scheduling
    pub fn game_rng(&self, game_id: u64) -> SmallRng {
        SmallRng::seed_from_u64(self.mix(b"game", game_id))
    }
    pub fn sampling_rng(&self) -> SmallRng {
        SmallRng::seed_from_u64(self.mix(b"sampling", 0))
    }
    pub fn eviction_rng(&self) -> SmallRng {
        SmallRng::seed_from_u64(self.mix(b"eviction", 0))
    }
    pub fn init_rng(&self) -> SmallRng {
        SmallRng::seed_from_u64(self.mix(b"init", 0))
    }
    /// a whole derived seed domain, e.g. one per evaluation pass,
    /// so evaluation games never replay self-play trajectories
    pub fn derived(&self, label: &[u8], n: u64) -> SeedManager {
        SeedManager::new(self.mix(label, n))
    }

    fn mix(&self, label: &[u8], n: u64) -> u64 {
        let mut hash = Self::FNV_OFFSET;
        for byte in self
            .master
            .to_le_bytes()
            .iter()
            .chain(label.iter())
            .chain(n.to_le_bytes().iter())
        {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
        }
        hash
    }
}

impl crate::Arbitrary for SeedManager {
    fn random() -> Self {
        Self::new(rand::random())
    }
}
