#![forbid(unsafe_code)]

//! Batch reconciliation with a rollback journal.
//!
//! A run reads one CSV file top to bottom. Every row that changes the store is first
//! written to the rollback file, then applied and committed on its own. Fatal
//! conditions ([`BatchError`]) stop the run; row conditions ([`RowError`]) are
//! logged and the run moves on.

pub mod apply;
pub mod classify;
pub mod driver;
pub mod error;
pub mod journal;
pub mod preflight;
pub mod resolve;
pub mod skip;
pub mod source;

pub use apply::RowOutcome;
pub use classify::{MembershipMode, MetadataOp, normalize_text};
pub use driver::{BatchReport, MembershipBatch, MetadataBatch};
pub use error::{BatchError, ConfigError, JournalError, ResolveError, RowError};
pub use journal::{
    MembershipRollback, MetadataRollback, NO_OWNING_COLLECTION, RollbackJournal, RollbackRecord,
};
pub use preflight::BatchPaths;
pub use source::{MembershipRow, MetadataRow, RecordSource, SourceRow};

use br_core::{Actor, ActorSpec, ArchiveStore};
use tracing::info;

/// Looks the acting identity up by email or numeric id.
pub fn resolve_actor<S: ArchiveStore>(store: &S, value: &str) -> Result<Actor, BatchError> {
    let wanted = ActorSpec::parse(value).map_err(|reason| ConfigError::InvalidActor {
        value: value.to_string(),
        reason,
    })?;
    store
        .find_actor(&wanted)
        .map_err(|err| BatchError::StoreSetup(Box::new(err)))?
        .ok_or_else(|| ConfigError::UnknownActor(wanted.to_string()).into())
}

/// Creates, updates and deletes metadata values as each row's shape dictates.
pub fn run_metadata_batch<S: ArchiveStore>(
    store: &mut S,
    paths: &BatchPaths,
    actor: &Actor,
) -> Result<BatchReport, BatchError> {
    let mut journal = paths.preflight::<MetadataRollback>()?;
    let source = RecordSource::<_, MetadataRow>::open(&paths.input)?;
    info!(input = %paths.input.display(), rollback = %paths.rollback.display(), actor = %actor.email, "metadata batch started");
    let report = MetadataBatch::new(store, actor.id).run(source, &mut journal)?;
    journal.finish()?;
    log_report("metadata", &report);
    Ok(report)
}

/// Maps, moves or unmaps every listed item according to `mode`.
pub fn run_membership_batch<S: ArchiveStore>(
    store: &mut S,
    paths: &BatchPaths,
    actor: &Actor,
    mode: MembershipMode,
) -> Result<BatchReport, BatchError> {
    let mut journal = paths.preflight::<MembershipRollback>()?;
    let source = RecordSource::<_, MembershipRow>::open(&paths.input)?;
    info!(input = %paths.input.display(), rollback = %paths.rollback.display(), actor = %actor.email, mode = mode.as_str(), "membership batch started");
    let report = MembershipBatch::new(store, actor.id, mode).run(source, &mut journal)?;
    journal.finish()?;
    log_report("membership", &report);
    Ok(report)
}

fn log_report(kind: &str, report: &BatchReport) {
    info!(
        kind,
        rows = report.rows,
        applied = report.applied,
        unchanged = report.unchanged,
        skipped = report.skipped,
        failed = report.failed,
        "batch finished"
    );
}
