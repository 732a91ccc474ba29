#![forbid(unsafe_code)]

use br_core::{ActorSpecError, Handle, HandleError, MetadataValueId, ObjectKind};
use std::io;
use std::path::PathBuf;

pub type BoxedStoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Setup mistakes caught before any row is read.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("options must have one and only one of --map, --move or --unmap (got {given})")]
    ModeSelection { given: usize },
    #[error("invalid acting identity {value:?}: {reason}")]
    InvalidActor {
        value: String,
        reason: ActorSpecError,
    },
    #[error("acting identity cannot be found: {0}")]
    UnknownActor(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("{identifier:?} is not a valid handle: {reason}")]
    MalformedHandle {
        identifier: String,
        reason: HandleError,
    },
    #[error("{identifier} does not resolve to {expected}")]
    NotFound {
        identifier: String,
        expected: ObjectKind,
    },
    #[error("{identifier} does not resolve to {expected} (found {actual})")]
    WrongKind {
        identifier: String,
        expected: ObjectKind,
        actual: ObjectKind,
    },
    #[error("lookup of {identifier} failed: {source}")]
    Lookup {
        identifier: String,
        #[source]
        source: BoxedStoreError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
}

/// Any condition that stops the whole run. Rows already committed stay committed
/// and stay journaled.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("input csv {} not found", .0.display())]
    InputMissing(PathBuf),
    #[error("rollback csv {} cannot be created: {source}", .path.display())]
    RollbackUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("input csv {} cannot be read: {source}", .path.display())]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("input csv is missing required column {0:?}")]
    MissingColumn(&'static str),
    #[error("input csv: {0}")]
    Source(#[source] csv::Error),
    #[error("line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
    #[error("line {line}: {source}")]
    Resolution {
        line: u64,
        #[source]
        source: ResolveError,
    },
    #[error("rollback journal: {0}")]
    Journal(#[from] JournalError),
    #[error("line {line}: store: {source}")]
    Store {
        line: u64,
        #[source]
        source: BoxedStoreError,
    },
    #[error("store: {0}")]
    StoreSetup(#[source] BoxedStoreError),
}

impl BatchError {
    pub(crate) fn store<E>(line: u64) -> impl FnOnce(E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        move |err| Self::Store {
            line,
            source: Box::new(err),
        }
    }

    /// Input line the failure is attributed to, when it happened inside the row loop.
    pub fn line(&self) -> Option<u64> {
        match self {
            Self::MalformedRow { line, .. }
            | Self::Resolution { line, .. }
            | Self::Store { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// A row that could not be applied. The run continues with the next row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("no metadata value found for metadata_value_id {0}")]
    ValueNotFound(MetadataValueId),
    #[error("collection {collection} owns item {item} and cannot be unmapped from it")]
    UnmapOwning { item: Handle, collection: Handle },
}
