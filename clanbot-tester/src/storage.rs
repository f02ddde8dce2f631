use clanbot_game::{World, WorldError, WorldStorage};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cannot access world file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("world file {path} is not a valid snapshot")]
    Parse {
        path: PathBuf,
        #[source]
        source: WorldError,
    },
    #[error("cannot serialize world for {path}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// World snapshot kept as one pretty-printed JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn parse_error(&self, source: WorldError) -> StorageError {
        StorageError::Parse {
            path: self.path.clone(),
            source,
        }
    }
}

impl WorldStorage for JsonFileStorage {
    type Error = StorageError;

    fn load_world(&self) -> Result<Option<World>, Self::Error> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::info!("no world file at {}, starting fresh", self.path.display());
                return Ok(None);
            }
            Err(err) => return Err(self.io_error(err)),
        };
        World::from_json(&raw)
            .map(Some)
            .map_err(|err| self.parse_error(err))
    }

    fn save_world(&self, world: &World) -> Result<(), Self::Error> {
        let json = world.to_json().map_err(|source| StorageError::Serialize {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(|err| self.io_error(err))?;
        log::debug!("saved world to {}", self.path.display());
        Ok(())
    }
}
