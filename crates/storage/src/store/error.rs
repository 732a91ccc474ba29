#![forbid(unsafe_code)]

use br_core::ObjectKind;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("unknown id {0}")]
    UnknownId(i64),
    #[error("kind mismatch (id={id}, expected={expected}, actual={actual})")]
    KindMismatch {
        id: i64,
        expected: ObjectKind,
        actual: ObjectKind,
    },
    #[error("handle already registered: {0}")]
    HandleTaken(String),
    #[error("actor already registered: {0}")]
    ActorTaken(String),
}
