use super::CheckpointFormat;
use super::CheckpointMeta;
use super::Manifest;
use super::ValidationStatus;
use crate::Performance;
use crate::approximator::Approximator;
use crate::errors::ChessError;
use crate::errors::Result;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    pub checkpoint_interval: u64,
    pub max_model_versions: usize,
    pub checkpoint_directory: String,
    pub compress: bool,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: 1,
            max_model_versions: 10,
            checkpoint_directory: "checkpoints".to_string(),
            compress: false,
        }
    }
}

impl CheckpointConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.checkpoint_interval == 0 {
            return Err("checkpoint_interval must be positive".to_string());
        }
        if self.max_model_versions == 0 {
            return Err("max_model_versions must be positive".to_string());
        }
        Ok(())
    }
}

/// owns the checkpoint directory. blobs are written atomically and
/// the manifest, not the filesystem, decides which checkpoint is
/// best.
pub struct CheckpointManager {
    directory: PathBuf,
    max_versions: usize,
    compress: bool,
    manifest: Manifest,
}

impl CheckpointManager {
    pub fn new(config: &CheckpointConfig) -> Result<Self> {
        let directory = PathBuf::from(&config.checkpoint_directory);
        std::fs::create_dir_all(&directory)?;
        let manifest = Manifest::load(&directory)?;
        Ok(Self {
            directory,
            max_versions: config.max_model_versions,
            compress: config.compress,
            manifest,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn format(&self) -> CheckpointFormat {
        if self.compress {
            CheckpointFormat::NativeCompressed
        } else {
            CheckpointFormat::Native
        }
    }

    fn path_of(&self, meta: &CheckpointMeta) -> PathBuf {
        self.directory
            .join(format!("{}.{}", meta.id, meta.format_tag.extension()))
    }

    /// persist a parameter blob for the given cycle. the new entry
    /// starts out Unknown; validate() decides whether it may ever
    /// become best.
    pub fn save(&mut self, cycle: u64, blob: &[u8], performance: Performance) -> Result<String> {
        let id = format!("cycle_{}", cycle);
        let format = self.format();
        let path = self
            .directory
            .join(format!("{}.{}", id, format.extension()));
        let temp = self.directory.join(format!("{}.tmp", id));
        {
            let mut file = std::fs::File::create(&temp)?;
            if self.compress {
                let mut encoder =
                    flate2::write::GzEncoder::new(&mut file, flate2::Compression::default());
                encoder.write_all(blob)?;
                encoder.finish()?;
            } else {
                file.write_all(blob)?;
            }
            file.sync_all()?;
        }
        std::fs::rename(&temp, &path)?;
        let created_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let meta = CheckpointMeta {
            id: id.clone(),
            cycle,
            performance_score: performance,
            is_best: false,
            format_tag: format,
            created_at,
            validation_status: ValidationStatus::Unknown,
        };
        self.manifest.checkpoints.retain(|c| c.id != id);
        self.manifest.checkpoints.push(meta);
        self.manifest.save(&self.directory)?;
        log::info!("saved checkpoint {} ({:.3})", id, performance);
        Ok(id)
    }

    /// read the raw parameter blob back, decompressing as needed.
    /// archives are recognized but refused with their backend.
    pub fn load_blob(&self, id: &str) -> Result<Vec<u8>> {
        let meta = self
            .manifest
            .get(id)
            .ok_or_else(|| ChessError::CheckpointValidationFailed {
                id: id.to_string(),
                reason: "not in manifest".to_string(),
            })?;
        let path = self.path_of(meta);
        let detected = CheckpointFormat::detect(&path);
        match detected {
            CheckpointFormat::Archive => {
                return Err(ChessError::CheckpointFormatMismatch {
                    found: detected,
                    expected: meta.format_tag,
                    backend: CheckpointFormat::Archive.backend(),
                });
            }
            CheckpointFormat::Unknown => {
                return Err(ChessError::CheckpointFormatMismatch {
                    found: detected,
                    expected: meta.format_tag,
                    backend: meta.format_tag.backend(),
                });
            }
            _ => {}
        }
        let bytes = std::fs::read(&path)?;
        if detected == CheckpointFormat::NativeCompressed {
            let mut decoder = flate2::read::GzDecoder::new(&bytes[..]);
            let mut blob = Vec::new();
            decoder.read_to_end(&mut blob)?;
            Ok(blob)
        } else {
            Ok(bytes)
        }
    }

    /// restore a checkpoint into the target approximator. failures
    /// mark the checkpoint invalid so it can never become best.
    pub fn load(&mut self, id: &str, target: &mut dyn Approximator) -> Result<()> {
        let blob = match self.load_blob(id) {
            Ok(blob) => blob,
            Err(e @ ChessError::CheckpointFormatMismatch { .. }) => return Err(e),
            Err(e) => {
                self.mark(id, ValidationStatus::Invalid)?;
                return Err(ChessError::CheckpointValidationFailed {
                    id: id.to_string(),
                    reason: e.to_string(),
                });
            }
        };
        if let Err(e) = target.restore(&blob) {
            self.mark(id, ValidationStatus::Invalid)?;
            return Err(ChessError::CheckpointValidationFailed {
                id: id.to_string(),
                reason: e.to_string(),
            });
        }
        Ok(())
    }

    /// a checkpoint is valid iff its blob restores and a probe
    /// forward pass comes back finite
    pub fn validate<A: Approximator + Clone>(&mut self, id: &str, template: &A) -> Result<bool> {
        let mut probe = template.clone();
        let healthy = match self.load_blob(id) {
            Ok(blob) => probe.restore(&blob).is_ok() && {
                let zeros = vec![0.0; probe.state_dim()];
                probe.forward(&zeros).iter().all(|v| v.is_finite())
            },
            Err(_) => false,
        };
        self.mark(
            id,
            if healthy {
                ValidationStatus::Valid
            } else {
                ValidationStatus::Invalid
            },
        )?;
        Ok(healthy)
    }

    fn mark(&mut self, id: &str, status: ValidationStatus) -> Result<()> {
        if let Some(meta) = self.manifest.get_mut(id) {
            meta.validation_status = status;
        }
        self.refresh_best();
        self.manifest.save(&self.directory)?;
        Ok(())
    }

    /// recompute is_best flags from the manifest scoring rule
    fn refresh_best(&mut self) {
        let best = self.manifest.best().map(|c| c.id.clone());
        for meta in self.manifest.checkpoints.iter_mut() {
            meta.is_best = Some(&meta.id) == best.as_ref();
        }
    }

    pub fn select_best(&self) -> Option<&CheckpointMeta> {
        self.manifest.best()
    }

    pub fn list(&self) -> &[CheckpointMeta] {
        &self.manifest.checkpoints
    }

    pub fn get(&self, id: &str) -> Option<&CheckpointMeta> {
        self.manifest.get(id)
    }

    /// drop the oldest non-best checkpoints beyond the version cap
    pub fn prune(&mut self) -> Result<()> {
        while self.manifest.checkpoints.len() > self.max_versions {
            let doomed = self
                .manifest
                .checkpoints
                .iter()
                .find(|c| !c.is_best)
                .map(|c| c.id.clone());
            match doomed {
                None => break,
                Some(id) => {
                    if let Some(meta) = self.manifest.get(&id) {
                        let path = self.path_of(meta);
                        if let Err(e) = std::fs::remove_file(&path) {
                            log::warn!("prune: {}: {}", path.display(), e);
                        }
                    }
                    self.manifest.checkpoints.retain(|c| c.id != id);
                    log::debug!("pruned checkpoint {}", id);
                }
            }
        }
        self.manifest.save(&self.directory)?;
        Ok(())
    }
}
