use std::{io, path::PathBuf};
use thiserror::Error;

/// Catalog problems that stop startup. Nothing renders with partial data.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("catalog entry #{position} is missing an id")]
    MissingId { position: usize },
    #[error("duplicate catalog id: {id}")]
    DuplicateId { id: String },
    #[error("read catalog {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("fetch catalog {url}")]
    Fetch {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("parse catalog")]
    Parse(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage key is empty")]
    EmptyKey,
    #[error("storage io at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Non-fatal: the in-memory store stays authoritative for the session.
#[derive(Debug, Error)]
pub enum PersistenceWarning {
    #[error("could not read saved state")]
    Read(#[source] StorageError),
    #[error("saved state is corrupt, starting fresh")]
    Corrupt(#[source] serde_json::Error),
    #[error("could not serialize state")]
    Serialize(#[source] serde_json::Error),
    #[error("could not save state")]
    Write(#[source] StorageError),
}

/// Every rejected import looks the same to the user; `reason` is for logs.
#[derive(Debug, Error)]
#[error("invalid import code")]
pub struct InvalidImport {
    reason: String,
}

impl InvalidImport {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("tier {value} is out of range (max {max})")]
pub struct TierOutOfRange {
    pub value: u8,
    pub max: u8,
}
