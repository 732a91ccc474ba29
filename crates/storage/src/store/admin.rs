#![forbid(unsafe_code)]

use super::{METADATA_VALUE_SEQ, SqliteStore, StoreError, next_counter_tx, now_ms};
use br_core::{
    Actor, ActorId, CollectionId, FieldId, Handle, ItemId, MetadataValue, MetadataValueId,
};
use rusqlite::{ErrorCode, params};

// Registration of objects and identities. The batch tools never call these; they
// exist for operators seeding a store and for tests.
impl SqliteStore {
    pub fn create_collection(&mut self, handle: &Handle) -> Result<CollectionId, StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO objects(kind, handle, owning_collection, created_at_ms) VALUES ('collection', ?1, NULL, ?2)",
            params![handle.as_str(), now_ms()],
        )
        .map_err(|err| map_unique(err, StoreError::HandleTaken(handle.to_string())))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(CollectionId::new(id))
    }

    pub fn create_item(
        &mut self,
        handle: &Handle,
        owning: Option<CollectionId>,
    ) -> Result<ItemId, StoreError> {
        let tx = self.conn.transaction()?;
        if let Some(owning) = owning {
            let kind = tx
                .query_row(
                    "SELECT kind FROM objects WHERE id = ?1",
                    params![owning.get()],
                    |row| row.get::<_, String>(0),
                )
                .map_err(|err| match err {
                    rusqlite::Error::QueryReturnedNoRows => StoreError::UnknownId(owning.get()),
                    other => StoreError::Sql(other),
                })?;
            if kind != "collection" {
                return Err(StoreError::InvalidInput("owning collection must be a collection"));
            }
        }
        tx.execute(
            "INSERT INTO objects(kind, handle, owning_collection, created_at_ms) VALUES ('item', ?1, ?2, ?3)",
            params![handle.as_str(), owning.map(CollectionId::get), now_ms()],
        )
        .map_err(|err| map_unique(err, StoreError::HandleTaken(handle.to_string())))?;
        let id = tx.last_insert_rowid();
        if let Some(owning) = owning {
            tx.execute(
                "INSERT INTO collection_items(collection_id, item_id) VALUES (?1, ?2)",
                params![owning.get(), id],
            )?;
        }
        tx.commit()?;
        Ok(ItemId::new(id))
    }

    pub fn create_actor(&mut self, email: &str) -> Result<Actor, StoreError> {
        let email = email.trim().to_ascii_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(StoreError::InvalidInput("actor email must contain '@'"));
        }
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO actors(email, created_at_ms) VALUES (?1, ?2)",
            params![email, now_ms()],
        )
        .map_err(|err| map_unique(err, StoreError::ActorTaken(email.clone())))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Actor {
            id: ActorId::new(id),
            email,
        })
    }

    pub fn add_metadata_value(
        &mut self,
        item: ItemId,
        field: FieldId,
        text: &str,
        language: Option<&str>,
    ) -> Result<MetadataValue, StoreError> {
        let tx = self.conn.transaction()?;
        let id = MetadataValueId::new(next_counter_tx(&tx, METADATA_VALUE_SEQ)?);
        tx.execute(
            r#"
            INSERT INTO metadata_values(id, item_id, field_id, text_value, language)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![id.get(), item.get(), field.get(), text, language],
        )?;
        tx.commit()?;
        Ok(MetadataValue {
            id,
            item,
            field,
            text: text.to_string(),
            language: language.map(str::to_string),
        })
    }
}

fn map_unique(err: rusqlite::Error, conflict: StoreError) -> StoreError {
    if let rusqlite::Error::SqliteFailure(inner, _) = &err
        && inner.code == ErrorCode::ConstraintViolation
    {
        return conflict;
    }
    StoreError::Sql(err)
}
