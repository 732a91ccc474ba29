#![forbid(unsafe_code)]

use super::{StoreError, now_ms};
use br_core::{
    ChangeDetail, ChangeNotice, CollectionId, ItemId, MetadataValue, MetadataValueId, UnitOfWork,
};
use rusqlite::{OptionalExtension, Transaction, params};
use serde_json::json;

/// One row's worth of writes. Dropping it without [`UnitOfWork::commit`] rolls the
/// transaction back.
pub struct SqliteUnit<'a> {
    tx: Transaction<'a>,
    ts_ms: i64,
}

impl<'a> SqliteUnit<'a> {
    pub(super) fn new(tx: Transaction<'a>) -> Self {
        Self {
            tx,
            ts_ms: now_ms(),
        }
    }

    fn owning_collection(&self, item: ItemId) -> Result<Option<i64>, StoreError> {
        let row = self
            .tx
            .query_row(
                "SELECT owning_collection FROM objects WHERE id = ?1 AND kind = 'item'",
                params![item.get()],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?;
        row.ok_or(StoreError::UnknownId(item.get()))
    }
}

impl UnitOfWork for SqliteUnit<'_> {
    type Error = StoreError;

    fn insert_metadata_value(&mut self, value: &MetadataValue) -> Result<(), StoreError> {
        self.tx.execute(
            r#"
            INSERT INTO metadata_values(id, item_id, field_id, text_value, language)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                value.id.get(),
                value.item.get(),
                value.field.get(),
                value.text,
                value.language
            ],
        )?;
        Ok(())
    }

    fn update_metadata_value(&mut self, value: &MetadataValue) -> Result<bool, StoreError> {
        let updated = self.tx.execute(
            r#"
            UPDATE metadata_values
            SET field_id = ?2, text_value = ?3, language = ?4
            WHERE id = ?1
            "#,
            params![
                value.id.get(),
                value.field.get(),
                value.text,
                value.language
            ],
        )?;
        Ok(updated > 0)
    }

    fn delete_metadata_value(&mut self, id: MetadataValueId) -> Result<bool, StoreError> {
        let deleted = self
            .tx
            .execute("DELETE FROM metadata_values WHERE id = ?1", params![id.get()])?;
        Ok(deleted > 0)
    }

    fn map_item(&mut self, item: ItemId, collection: CollectionId) -> Result<bool, StoreError> {
        let inserted = self.tx.execute(
            "INSERT OR IGNORE INTO collection_items(collection_id, item_id) VALUES (?1, ?2)",
            params![collection.get(), item.get()],
        )?;
        Ok(inserted > 0)
    }

    fn unmap_item(&mut self, item: ItemId, collection: CollectionId) -> Result<bool, StoreError> {
        if self.owning_collection(item)? == Some(collection.get()) {
            return Err(StoreError::InvalidInput(
                "the owning collection cannot be unmapped",
            ));
        }
        let deleted = self.tx.execute(
            "DELETE FROM collection_items WHERE collection_id = ?1 AND item_id = ?2",
            params![collection.get(), item.get()],
        )?;
        Ok(deleted > 0)
    }

    fn move_item(&mut self, item: ItemId, to: CollectionId) -> Result<bool, StoreError> {
        let previous = self.owning_collection(item)?;
        if previous == Some(to.get()) {
            return Ok(false);
        }
        self.tx.execute(
            "UPDATE objects SET owning_collection = ?2 WHERE id = ?1",
            params![item.get(), to.get()],
        )?;
        self.tx.execute(
            "INSERT OR IGNORE INTO collection_items(collection_id, item_id) VALUES (?1, ?2)",
            params![to.get(), item.get()],
        )?;
        if let Some(previous) = previous {
            self.tx.execute(
                "DELETE FROM collection_items WHERE collection_id = ?1 AND item_id = ?2",
                params![previous, item.get()],
            )?;
        }
        Ok(true)
    }

    fn notify(&mut self, notice: &ChangeNotice) -> Result<(), StoreError> {
        let payload = match &notice.detail {
            ChangeDetail::ValueCreated(id) => json!({"action": "create", "metadata_value_id": id.get()}),
            ChangeDetail::ValueUpdated(id) => json!({"action": "update", "metadata_value_id": id.get()}),
            ChangeDetail::ValueDeleted(id) => json!({"action": "delete", "metadata_value_id": id.get()}),
            ChangeDetail::Mapped(collection) => json!({"action": "map", "collection_id": collection.get()}),
            ChangeDetail::Unmapped(collection) => {
                json!({"action": "unmap", "collection_id": collection.get()})
            }
            ChangeDetail::Moved { from, to } => json!({
                "action": "move",
                "from_collection_id": from.map(CollectionId::get),
                "to_collection_id": to.get(),
            }),
        };
        let payload_json = serde_json::to_string(&payload)?;
        self.tx.execute(
            r#"
            INSERT INTO events(ts_ms, subject_id, actor_id, type, payload_json)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                self.ts_ms,
                notice.subject.get(),
                notice.actor.get(),
                notice.kind.as_str(),
                payload_json
            ],
        )?;
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        self.tx.commit()?;
        Ok(())
    }
}
