#![forbid(unsafe_code)]

//! Batch Driver: one pass over the source, in file order, one unit of work per row.
//!
//! Any `BatchError` returned from a row stops the run where it is. Rows before it
//! stay committed and journaled. A `RowError` is logged and the next row is read.

use crate::apply::{Applier, RowOutcome};
use crate::classify::{MembershipMode, MetadataOp};
use crate::error::{BatchError, RowError};
use crate::journal::{MembershipRollback, MetadataRollback, RollbackJournal};
use crate::resolve;
use crate::skip;
use crate::source::{MembershipRow, MetadataRow, SourceRow};
use br_core::{ActorId, ArchiveStore, CollectionRef, ItemRef, MetadataValue, MetadataValueId};
use std::io::Write;
use tracing::{debug, warn};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub rows: u64,
    pub applied: u64,
    pub unchanged: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl BatchReport {
    fn record(&mut self, line: u64, outcome: &RowOutcome) {
        self.rows += 1;
        match outcome {
            RowOutcome::Applied => self.applied += 1,
            RowOutcome::Unchanged => self.unchanged += 1,
            RowOutcome::Skipped => self.skipped += 1,
            RowOutcome::Failed(err) => {
                self.failed += 1;
                warn!(line, error = %err, "row not applied");
            }
        }
    }
}

pub struct MetadataBatch<'s, S> {
    applier: Applier<'s, S>,
}

impl<'s, S: ArchiveStore> MetadataBatch<'s, S> {
    pub fn new(store: &'s mut S, actor: ActorId) -> Self {
        Self {
            applier: Applier::new(store, actor),
        }
    }

    pub fn run<I, W>(
        &mut self,
        rows: I,
        journal: &mut RollbackJournal<W, MetadataRollback>,
    ) -> Result<BatchReport, BatchError>
    where
        I: IntoIterator<Item = Result<SourceRow<MetadataRow>, BatchError>>,
        W: Write,
    {
        let mut report = BatchReport::default();
        for next in rows {
            let SourceRow { line, row } = next?;
            let outcome = self.process(line, row, journal)?;
            report.record(line, &outcome);
        }
        Ok(report)
    }

    fn process<W: Write>(
        &mut self,
        line: u64,
        row: MetadataRow,
        journal: &mut RollbackJournal<W, MetadataRollback>,
    ) -> Result<RowOutcome, BatchError> {
        let op = MetadataOp::classify(row).map_err(|reason| BatchError::MalformedRow { line, reason })?;
        debug!(
            line,
            op = op.as_str(),
            value_id = op.value_id().map(MetadataValueId::get),
            text = %op.text(),
            "processing metadata row"
        );
        match op {
            MetadataOp::Create { item, field, text } => {
                let item: ItemRef = resolve::by_id(self.applier.store(), item.get())
                    .map_err(|source| BatchError::Resolution { line, source })?;
                self.applier
                    .create_value(line, journal, &item, field, &text)
            }
            MetadataOp::Update { id, field, text } => {
                let Some(previous) = self.stored_value(line, id)? else {
                    return Ok(RowOutcome::Failed(RowError::ValueNotFound(id)));
                };
                if skip::is_noop(&previous, &text, field) {
                    debug!(line, value_id = %id, text = %previous.text, "value already up to date, skipping");
                    return Ok(RowOutcome::Skipped);
                }
                self.applier
                    .update_value(line, journal, &previous, field, &text)
            }
            MetadataOp::Delete { id } => {
                let Some(previous) = self.stored_value(line, id)? else {
                    return Ok(RowOutcome::Failed(RowError::ValueNotFound(id)));
                };
                self.applier.delete_value(line, journal, &previous)
            }
        }
    }

    fn stored_value(
        &self,
        line: u64,
        id: MetadataValueId,
    ) -> Result<Option<MetadataValue>, BatchError> {
        self.applier
            .store()
            .metadata_value(id)
            .map_err(BatchError::store(line))
    }
}

pub struct MembershipBatch<'s, S> {
    applier: Applier<'s, S>,
    mode: MembershipMode,
}

impl<'s, S: ArchiveStore> MembershipBatch<'s, S> {
    pub fn new(store: &'s mut S, actor: ActorId, mode: MembershipMode) -> Self {
        Self {
            applier: Applier::new(store, actor),
            mode,
        }
    }

    pub fn run<I, W>(
        &mut self,
        rows: I,
        journal: &mut RollbackJournal<W, MembershipRollback>,
    ) -> Result<BatchReport, BatchError>
    where
        I: IntoIterator<Item = Result<SourceRow<MembershipRow>, BatchError>>,
        W: Write,
    {
        let mut report = BatchReport::default();
        for next in rows {
            let SourceRow { line, row } = next?;
            debug!(
                line,
                item = %row.item_handle,
                collection = %row.collection_handle,
                mode = self.mode.as_str(),
                "processing membership row"
            );
            let item: ItemRef = resolve::by_handle(self.applier.store(), &row.item_handle)
                .map_err(|source| BatchError::Resolution { line, source })?;
            let collection: CollectionRef =
                resolve::by_handle(self.applier.store(), &row.collection_handle)
                    .map_err(|source| BatchError::Resolution { line, source })?;
            let outcome =
                self.applier
                    .change_membership(line, journal, self.mode, &item, &collection)?;
            report.record(line, &outcome);
        }
        Ok(report)
    }
}
