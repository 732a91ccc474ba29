#![forbid(unsafe_code)]

use anyhow::Context as _;
use br_core::Actor;
use br_engine::BatchPaths;
use br_storage::SqliteStore;
use clap::Args;
use std::path::PathBuf;

pub const STORE_ENV: &str = "BR_STORAGE_DIR";
pub const DEFAULT_STORE_DIR: &str = ".batchrecon";

/// Flags shared by both tools.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Input CSV file
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: PathBuf,

    /// Rollback CSV file to create
    #[arg(short = 'r', long = "rollback", value_name = "FILE")]
    pub rollback: PathBuf,

    /// Acting identity: email address or numeric id
    #[arg(short = 'e', long = "eperson", value_name = "EMAIL|ID")]
    pub eperson: String,

    /// Log every row, skip and rollback line
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Archive store directory
    #[arg(long = "store", value_name = "DIR", env = STORE_ENV, default_value = DEFAULT_STORE_DIR)]
    pub store: PathBuf,
}

impl CommonArgs {
    pub fn paths(&self) -> BatchPaths {
        BatchPaths::new(&self.file, &self.rollback)
    }

    pub fn open_store(&self) -> anyhow::Result<SqliteStore> {
        SqliteStore::open(&self.store)
            .with_context(|| format!("open archive store at {}", self.store.display()))
    }

    pub fn actor(&self, store: &SqliteStore) -> anyhow::Result<Actor> {
        Ok(br_engine::resolve_actor(store, &self.eperson)?)
    }
}
