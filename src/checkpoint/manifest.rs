use super::CheckpointFormat;
use crate::Performance;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Valid,
    Invalid,
    Unknown,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CheckpointMeta {
    pub id: String,
    pub cycle: u64,
    pub performance_score: Performance,
    pub is_best: bool,
    pub format_tag: CheckpointFormat,
    pub created_at: u64,
    pub validation_status: ValidationStatus,
}

/// the manifest is the source of truth for what exists and which
/// checkpoint is best; filenames are never trusted for that
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Manifest {
    pub checkpoints: Vec<CheckpointMeta>,
}

impl Manifest {
    pub const FILE: &'static str = "manifest";

    pub fn load(directory: &Path) -> std::io::Result<Self> {
        let path = directory.join(Self::FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(std::io::Error::other)
    }

    /// write to temp then rename, so a crash never leaves a torn
    /// manifest behind
    pub fn save(&self, directory: &Path) -> std::io::Result<()> {
        let text = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        let temp = directory.join(format!("{}.tmp", Self::FILE));
        std::fs::write(&temp, text)?;
        std::fs::rename(temp, directory.join(Self::FILE))
    }

    pub fn get(&self, id: &str) -> Option<&CheckpointMeta> {
        self.checkpoints.iter().find(|c| c.id == id)
    }
    pub fn get_mut(&mut self, id: &str) -> Option<&mut CheckpointMeta> {
        self.checkpoints.iter_mut().find(|c| c.id == id)
    }

    /// best = highest score among valid checkpoints, latest wins
    /// ties
    pub fn best(&self) -> Option<&CheckpointMeta> {
        self.checkpoints
            .iter()
            .filter(|c| c.validation_status == ValidationStatus::Valid)
            .max_by(|a, b| {
                a.performance_score
                    .partial_cmp(&b.performance_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.created_at.cmp(&b.created_at))
                    .then(a.cycle.cmp(&b.cycle))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: &str, cycle: u64, score: f32, status: ValidationStatus) -> CheckpointMeta {
        CheckpointMeta {
            id: id.to_string(),
            cycle,
            performance_score: score,
            is_best: false,
            format_tag: CheckpointFormat::Native,
            created_at: cycle,
            validation_status: status,
        }
    }

    #[test]
    fn best_ignores_invalid_checkpoints() {
        let manifest = Manifest {
            checkpoints: vec![
                meta("cycle_1", 1, 0.9, ValidationStatus::Invalid),
                meta("cycle_2", 2, 0.5, ValidationStatus::Valid),
            ],
        };
        assert_eq!(manifest.best().unwrap().id, "cycle_2");
    }

    #[test]
    fn ties_break_toward_the_latest() {
        let manifest = Manifest {
            checkpoints: vec![
                meta("cycle_1", 1, 0.5, ValidationStatus::Valid),
                meta("cycle_2", 2, 0.5, ValidationStatus::Valid),
            ],
        };
        assert_eq!(manifest.best().unwrap().id, "cycle_2");
    }

    #[test]
    fn manifest_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("chessrl-manifest-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let manifest = Manifest {
            checkpoints: vec![meta("cycle_3", 3, 0.75, ValidationStatus::Valid)],
        };
        manifest.save(&dir).unwrap();
        let loaded = Manifest::load(&dir).unwrap();
        assert_eq!(loaded.checkpoints.len(), 1);
        assert_eq!(loaded.checkpoints[0].id, "cycle_3");
        std::fs::remove_dir_all(dir).ok();
    }
}
