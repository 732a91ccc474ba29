#![forbid(unsafe_code)]

//! Rollback Journal Writer.
//!
//! The journal is opened once per run and owned by the driver. Each record is
//! written and flushed before the mutation it describes is applied, in input order.
//! The header is written when the journal is opened, so an aborted or empty run
//! still leaves a well-formed file.

use crate::error::{BatchError, JournalError};
use br_core::{CollectionRef, FieldId, ItemId, ItemRef, MetadataValue, MetadataValueId};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::Path;
use tracing::debug;

pub const NO_OWNING_COLLECTION: &str = "no owning collection";

pub trait RollbackRecord: Serialize {
    const HEADER: &'static [&'static str];

    /// Column the record is keyed by, as written.
    fn key(&self) -> String;

    /// Restored value, as written.
    fn value(&self) -> &str;
}

/// Pre-mutation state of a metadata value, in the input's column vocabulary.
/// The empty column tells which side of a create/delete pair the row is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MetadataRollback {
    pub metadata_value_id: Option<i64>,
    pub text_value: String,
    pub item_id: i64,
    pub metadata_field_id: i64,
}

impl MetadataRollback {
    /// Undoing a create is deleting the new id, so the text is left empty.
    pub fn for_create(id: MetadataValueId, item: ItemId, field: FieldId) -> Self {
        Self {
            metadata_value_id: Some(id.get()),
            text_value: String::new(),
            item_id: item.get(),
            metadata_field_id: field.get(),
        }
    }

    pub fn for_update(previous: &MetadataValue) -> Self {
        Self {
            metadata_value_id: Some(previous.id.get()),
            text_value: previous.text.clone(),
            item_id: previous.item.get(),
            metadata_field_id: previous.field.get(),
        }
    }

    /// Undoing a delete is re-creating the text, so the value id is left empty.
    pub fn for_delete(previous: &MetadataValue) -> Self {
        Self {
            metadata_value_id: None,
            ..Self::for_update(previous)
        }
    }
}

impl RollbackRecord for MetadataRollback {
    const HEADER: &'static [&'static str] =
        &["metadata_value_id", "text_value", "item_id", "metadata_field_id"];

    fn key(&self) -> String {
        self.metadata_value_id
            .map_or_else(String::new, |id| id.to_string())
    }

    fn value(&self) -> &str {
        &self.text_value
    }
}

/// Item handle with the handle of the collection that owned it before the row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MembershipRollback {
    pub item_id: String,
    pub previous_owning_collection: String,
}

impl MembershipRollback {
    pub fn new(item: &ItemRef, owning: Option<&CollectionRef>) -> Self {
        Self {
            item_id: item.handle.to_string(),
            previous_owning_collection: owning.map_or_else(
                || NO_OWNING_COLLECTION.to_string(),
                |collection| collection.handle.to_string(),
            ),
        }
    }
}

impl RollbackRecord for MembershipRollback {
    const HEADER: &'static [&'static str] = &["item_id", "previous_owning_collection"];

    fn key(&self) -> String {
        self.item_id.clone()
    }

    fn value(&self) -> &str {
        &self.previous_owning_collection
    }
}

pub struct RollbackJournal<W: Write, R> {
    writer: csv::Writer<W>,
    written: u64,
    _record: PhantomData<fn(&R)>,
}

impl<R: RollbackRecord> RollbackJournal<File, R> {
    /// Creates (or truncates) the rollback file and writes its header.
    pub fn create(path: &Path) -> Result<Self, BatchError> {
        let file = File::create(path).map_err(|source| BatchError::RollbackUnwritable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(file)?)
    }
}

impl<W: Write, R: RollbackRecord> RollbackJournal<W, R> {
    pub fn new(out: W) -> Result<Self, JournalError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(out);
        writer.write_record(R::HEADER)?;
        writer.flush()?;
        Ok(Self {
            writer,
            written: 0,
            _record: PhantomData,
        })
    }

    /// Appends one record and flushes it before returning.
    pub fn record_before(&mut self, record: &R) -> Result<(), JournalError> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        self.written += 1;
        debug!(key = %record.key(), value = %record.value(), "rollback line written");
        Ok(())
    }

    pub fn entries_written(&self) -> u64 {
        self.written
    }

    pub fn finish(self) -> Result<W, JournalError> {
        self.writer.into_inner().map_err(|err| {
            let cause = err.error();
            JournalError::Io(io::Error::new(cause.kind(), cause.to_string()))
        })
    }
}
