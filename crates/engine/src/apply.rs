#![forbid(unsafe_code)]

//! Mutation Applier.
//!
//! Every entry point takes the run's journal and writes the rollback record before
//! it opens the row's unit of work. A row is visible once its own unit commits;
//! a unit dropped early (row error, unchanged membership, fatal store error)
//! discards whatever it staged.

use crate::classify::MembershipMode;
use crate::error::{BatchError, RowError};
use crate::journal::{MembershipRollback, MetadataRollback, RollbackJournal};
use br_core::{
    ActorId, ArchiveStore, ChangeDetail, ChangeKind, ChangeNotice, CollectionRef, DEFAULT_LANGUAGE,
    FieldId, ItemId, ItemRef, MetadataValue, UnitOfWork,
};
use std::io::Write;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowOutcome {
    Applied,
    /// Journaled, but the store already had the requested membership state.
    Unchanged,
    /// No-op update: nothing journaled, nothing written.
    Skipped,
    Failed(RowError),
}

pub struct Applier<'s, S> {
    store: &'s mut S,
    actor: ActorId,
}

impl<'s, S: ArchiveStore> Applier<'s, S> {
    pub fn new(store: &'s mut S, actor: ActorId) -> Self {
        Self { store, actor }
    }

    pub fn store(&self) -> &S {
        self.store
    }

    pub fn create_value<W: Write>(
        &mut self,
        line: u64,
        journal: &mut RollbackJournal<W, MetadataRollback>,
        item: &ItemRef,
        field: FieldId,
        text: &str,
    ) -> Result<RowOutcome, BatchError> {
        let id = self
            .store
            .reserve_metadata_value_id()
            .map_err(BatchError::store(line))?;
        journal.record_before(&MetadataRollback::for_create(id, item.id, field))?;

        let value = MetadataValue {
            id,
            item: item.id,
            field,
            text: text.to_string(),
            language: Some(DEFAULT_LANGUAGE.to_string()),
        };
        let notice = self.metadata_notice(item.id, ChangeDetail::ValueCreated(id));
        let mut unit = self.store.begin().map_err(BatchError::store(line))?;
        unit.insert_metadata_value(&value)
            .map_err(BatchError::store(line))?;
        unit.notify(&notice).map_err(BatchError::store(line))?;
        unit.commit().map_err(BatchError::store(line))?;
        debug!(line, value_id = %id, item = %item.handle, field = %field, text, "created metadata value");
        Ok(RowOutcome::Applied)
    }

    pub fn update_value<W: Write>(
        &mut self,
        line: u64,
        journal: &mut RollbackJournal<W, MetadataRollback>,
        previous: &MetadataValue,
        field: Option<FieldId>,
        text: &str,
    ) -> Result<RowOutcome, BatchError> {
        journal.record_before(&MetadataRollback::for_update(previous))?;

        let next = MetadataValue {
            field: field.unwrap_or(previous.field),
            text: text.to_string(),
            ..previous.clone()
        };
        let notice = self.metadata_notice(previous.item, ChangeDetail::ValueUpdated(previous.id));
        let mut unit = self.store.begin().map_err(BatchError::store(line))?;
        if !unit
            .update_metadata_value(&next)
            .map_err(BatchError::store(line))?
        {
            return Ok(RowOutcome::Failed(RowError::ValueNotFound(previous.id)));
        }
        unit.notify(&notice).map_err(BatchError::store(line))?;
        unit.commit().map_err(BatchError::store(line))?;
        debug!(
            line,
            value_id = %previous.id,
            old = %previous.text,
            new = %next.text,
            field = %next.field,
            "updated metadata value"
        );
        Ok(RowOutcome::Applied)
    }

    pub fn delete_value<W: Write>(
        &mut self,
        line: u64,
        journal: &mut RollbackJournal<W, MetadataRollback>,
        previous: &MetadataValue,
    ) -> Result<RowOutcome, BatchError> {
        journal.record_before(&MetadataRollback::for_delete(previous))?;

        let notice = self.metadata_notice(previous.item, ChangeDetail::ValueDeleted(previous.id));
        let mut unit = self.store.begin().map_err(BatchError::store(line))?;
        if !unit
            .delete_metadata_value(previous.id)
            .map_err(BatchError::store(line))?
        {
            return Ok(RowOutcome::Failed(RowError::ValueNotFound(previous.id)));
        }
        unit.notify(&notice).map_err(BatchError::store(line))?;
        unit.commit().map_err(BatchError::store(line))?;
        debug!(
            line,
            value_id = %previous.id,
            item = %previous.item,
            field = %previous.field,
            text = %previous.text,
            "deleted metadata value"
        );
        Ok(RowOutcome::Applied)
    }

    /// Journals the item's owning collection as it stands now, then applies `mode`.
    pub fn change_membership<W: Write>(
        &mut self,
        line: u64,
        journal: &mut RollbackJournal<W, MembershipRollback>,
        mode: MembershipMode,
        item: &ItemRef,
        collection: &CollectionRef,
    ) -> Result<RowOutcome, BatchError> {
        let owning = self
            .store
            .owning_collection(item.id)
            .map_err(BatchError::store(line))?;
        journal.record_before(&MembershipRollback::new(item, owning.as_ref()))?;

        let owned_by_target = owning
            .as_ref()
            .is_some_and(|owner| owner.id == collection.id);
        if mode == MembershipMode::Unmap && owned_by_target {
            return Ok(RowOutcome::Failed(RowError::UnmapOwning {
                item: item.handle.clone(),
                collection: collection.handle.clone(),
            }));
        }

        let mut unit = self.store.begin().map_err(BatchError::store(line))?;
        let (changed, detail) = match mode {
            MembershipMode::Map => (
                unit.map_item(item.id, collection.id)
                    .map_err(BatchError::store(line))?,
                ChangeDetail::Mapped(collection.id),
            ),
            MembershipMode::Unmap => (
                unit.unmap_item(item.id, collection.id)
                    .map_err(BatchError::store(line))?,
                ChangeDetail::Unmapped(collection.id),
            ),
            MembershipMode::Move => (
                unit.move_item(item.id, collection.id)
                    .map_err(BatchError::store(line))?,
                ChangeDetail::Moved {
                    from: owning.as_ref().map(|owner| owner.id),
                    to: collection.id,
                },
            ),
        };
        if !changed {
            debug!(line, item = %item.handle, collection = %collection.handle, mode = mode.as_str(), "membership already in place");
            return Ok(RowOutcome::Unchanged);
        }
        unit.notify(&ChangeNotice {
            subject: item.id,
            kind: ChangeKind::MembershipModified,
            actor: self.actor,
            detail,
        })
        .map_err(BatchError::store(line))?;
        unit.commit().map_err(BatchError::store(line))?;
        debug!(line, item = %item.handle, collection = %collection.handle, mode = mode.as_str(), "membership changed");
        Ok(RowOutcome::Applied)
    }

    fn metadata_notice(&self, subject: ItemId, detail: ChangeDetail) -> ChangeNotice {
        ChangeNotice {
            subject,
            kind: ChangeKind::MetadataModified,
            actor: self.actor,
            detail,
        }
    }
}
