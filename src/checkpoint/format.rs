use std::io::Read;
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];
const BLOB_MAGIC: [u8; 4] = *b"CRLB";

/// on-disk checkpoint flavors, named by extension and confirmed by
/// signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointFormat {
    Native,
    NativeCompressed,
    Archive,
    Unknown,
}

impl CheckpointFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Native => "bin",
            Self::NativeCompressed => "bin.gz",
            Self::Archive => "zip",
            Self::Unknown => "",
        }
    }

    /// backend suggestion surfaced on format mismatches
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Native => "byteorder",
            Self::NativeCompressed => "flate2",
            Self::Archive => "zip",
            Self::Unknown => "unknown",
        }
    }

    /// classify a file by signature first, filename second
    pub fn detect(path: &Path) -> Self {
        let mut head = [0u8; 4];
        let sniffed = std::fs::File::open(path)
            .and_then(|mut f| f.read_exact(&mut head))
            .is_ok();
        if sniffed {
            if head[..2] == GZIP_MAGIC {
                return Self::NativeCompressed;
            }
            if head == ZIP_MAGIC {
                return Self::Archive;
            }
            if head == BLOB_MAGIC {
                return Self::Native;
            }
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.ends_with(".bin.gz") {
            Self::NativeCompressed
        } else if name.ends_with(".bin") {
            Self::Native
        } else if name.ends_with(".zip") {
            Self::Archive
        } else {
            Self::Unknown
        }
    }
}

impl std::fmt::Display for CheckpointFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::NativeCompressed => write!(f, "native_compressed"),
            Self::Archive => write!(f, "archive"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn scratch(name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("chessrl-format-{}-{}", std::process::id(), name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn signatures_win_over_names() {
        let path = scratch("mislabeled.bin", &[0x1f, 0x8b, 0x08, 0x00]);
        assert_eq!(CheckpointFormat::detect(&path), CheckpointFormat::NativeCompressed);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn archives_are_recognized() {
        let path = scratch("params.zip", &[b'P', b'K', 0x03, 0x04]);
        assert_eq!(CheckpointFormat::detect(&path), CheckpointFormat::Archive);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn native_blobs_are_recognized() {
        let path = scratch("cycle_1.bin", b"CRLB rest of blob");
        assert_eq!(CheckpointFormat::detect(&path), CheckpointFormat::Native);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_files_fall_back_to_names() {
        let path = std::env::temp_dir().join("chessrl-format-no-such-file.bin.gz");
        assert_eq!(CheckpointFormat::detect(&path), CheckpointFormat::NativeCompressed);
    }
}
