//! Filesystem-backed content source and progress snapshots.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use quest_engine::{AdventureData, AdventureLoader, ProgressStorage, SessionProgress};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("adventure '{requested}' is not available (source provides '{found}')")]
    UnknownAdventure { requested: String, found: String },
}

/// Where adventure content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Bundled,
    File(PathBuf),
}

impl ContentSource {
    #[must_use]
    pub fn from_arg(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Bundled, Self::File)
    }

    /// Read whatever adventure this source provides.
    pub fn load(&self) -> Result<AdventureData, StorageError> {
        match self {
            Self::Bundled => {
                AdventureData::from_json(quest_engine::constants::MIDNIGHT_EXPRESS_DATA).map_err(
                    |source| StorageError::Json {
                        path: PathBuf::from("<bundled>"),
                        source,
                    },
                )
            }
            Self::File(path) => {
                let raw = fs::read_to_string(path).map_err(|source| StorageError::Io {
                    path: path.clone(),
                    source,
                })?;
                AdventureData::from_json(&raw).map_err(|source| StorageError::Json {
                    path: path.clone(),
                    source,
                })
            }
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Bundled => "bundled".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

impl AdventureLoader for ContentSource {
    type Error = StorageError;

    fn load_adventure(&self, adventure_id: &str) -> Result<AdventureData, Self::Error> {
        let data = self.load()?;
        if data.meta.id != adventure_id {
            return Err(StorageError::UnknownAdventure {
                requested: adventure_id.to_string(),
                found: data.meta.id,
            });
        }
        Ok(data)
    }
}

/// One pretty-printed JSON file per slot.
#[derive(Debug, Clone)]
pub struct JsonDirStorage {
    dir: PathBuf,
}

impl JsonDirStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        let safe: String = slot
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl ProgressStorage for JsonDirStorage {
    type Error = StorageError;

    fn save_progress(&self, slot: &str, progress: &SessionProgress) -> Result<(), Self::Error> {
        let path = self.slot_path(slot);
        let json = serde_json::to_string_pretty(progress).map_err(|source| StorageError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| StorageError::Io { path, source })
    }

    fn load_progress(&self, slot: &str) -> Result<Option<SessionProgress>, Self::Error> {
        let path = self.slot_path(slot);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Json { path, source })
    }

    fn delete_progress(&self, slot: &str) -> Result<(), Self::Error> {
        let path = self.slot_path(slot);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}
