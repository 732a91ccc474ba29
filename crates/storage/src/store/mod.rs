#![forbid(unsafe_code)]

mod admin;
mod error;
mod schema;
mod unit;

pub use error::StoreError;
pub use unit::SqliteUnit;

use br_core::{
    Actor, ActorId, ActorSpec, ArchiveStore, CollectionId, CollectionRef, FieldId, Handle, ItemId,
    MembershipEdge, MetadataValue, MetadataValueId, ObjectKind, ResolvedObject,
};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::Path;
use std::time::Duration;

const DB_FILE_NAME: &str = "batchrecon.db";
const METADATA_VALUE_SEQ: &str = "metadata_value_seq";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRow {
    pub seq: i64,
    pub ts_ms: i64,
    pub subject_id: i64,
    pub actor_id: i64,
    pub event_type: String,
    pub payload_json: String,
}

impl EventRow {
    pub fn event_id(&self) -> String {
        format!("evt_{:016}", self.seq)
    }
}

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref();
        std::fs::create_dir_all(storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        schema::install_schema(&conn)?;

        Ok(Self { conn })
    }

    pub fn metadata_values_for(&self, item: ItemId) -> Result<Vec<MetadataValue>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, item_id, field_id, text_value, language
            FROM metadata_values
            WHERE item_id = ?1
            ORDER BY id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![item.get()], metadata_value_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn events(&self, limit: usize) -> Result<Vec<EventRow>, StoreError> {
        let limit = i64::try_from(limit).map_err(|_| StoreError::InvalidInput("limit is too large"))?;
        let mut stmt = self.conn.prepare(
            r#"
            SELECT seq, ts_ms, subject_id, actor_id, type, payload_json
            FROM events
            ORDER BY seq ASC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(EventRow {
                seq: row.get(0)?,
                ts_ms: row.get(1)?,
                subject_id: row.get(2)?,
                actor_id: row.get(3)?,
                event_type: row.get(4)?,
                payload_json: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl ArchiveStore for SqliteStore {
    type Error = StoreError;
    type Unit<'a> = SqliteUnit<'a>;

    fn resolve_handle(&self, handle: &Handle) -> Result<Option<ResolvedObject>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, kind, handle FROM objects WHERE handle = ?1",
                params![handle.as_str()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, kind, handle)| resolved_object(id, &kind, handle))
            .transpose()
    }

    fn object_by_id(&self, id: i64) -> Result<Option<ResolvedObject>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, kind, handle FROM objects WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, kind, handle)| resolved_object(id, &kind, handle))
            .transpose()
    }

    fn metadata_value(&self, id: MetadataValueId) -> Result<Option<MetadataValue>, StoreError> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, item_id, field_id, text_value, language
                FROM metadata_values
                WHERE id = ?1
                "#,
                params![id.get()],
                metadata_value_from_row,
            )
            .optional()?)
    }

    fn owning_collection(&self, item: ItemId) -> Result<Option<CollectionRef>, StoreError> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT c.id, c.handle
                FROM objects i
                JOIN objects c ON c.id = i.owning_collection
                WHERE i.id = ?1 AND i.kind = 'item'
                "#,
                params![item.get()],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        row.map(|(id, handle)| {
            Ok(CollectionRef {
                id: CollectionId::new(id),
                handle: stored_handle(handle)?,
            })
        })
        .transpose()
    }

    fn memberships(&self, item: ItemId) -> Result<Vec<MembershipEdge>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT ci.collection_id, COALESCE(o.owning_collection = ci.collection_id, 0)
            FROM collection_items ci
            JOIN objects o ON o.id = ci.item_id
            WHERE ci.item_id = ?1
            ORDER BY ci.collection_id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![item.get()], |row| {
            Ok(MembershipEdge {
                item,
                collection: CollectionId::new(row.get(0)?),
                is_owning: row.get::<_, i64>(1)? != 0,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn find_actor(&self, wanted: &ActorSpec) -> Result<Option<Actor>, StoreError> {
        let actor = match wanted {
            ActorSpec::Email(email) => self
                .conn
                .query_row(
                    "SELECT id, email FROM actors WHERE email = ?1",
                    params![email],
                    actor_from_row,
                )
                .optional()?,
            ActorSpec::Id(id) => self
                .conn
                .query_row(
                    "SELECT id, email FROM actors WHERE id = ?1",
                    params![id.get()],
                    actor_from_row,
                )
                .optional()?,
        };
        Ok(actor)
    }

    fn reserve_metadata_value_id(&mut self) -> Result<MetadataValueId, StoreError> {
        let tx = self.conn.transaction()?;
        let next = next_counter_tx(&tx, METADATA_VALUE_SEQ)?;
        tx.commit()?;
        Ok(MetadataValueId::new(next))
    }

    fn begin(&mut self) -> Result<SqliteUnit<'_>, StoreError> {
        Ok(SqliteUnit::new(self.conn.transaction()?))
    }
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

fn next_counter_tx(tx: &Transaction<'_>, name: &str) -> Result<i64, StoreError> {
    let current: i64 = tx
        .query_row(
            "SELECT value FROM counters WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);
    let next = current + 1;
    tx.execute(
        r#"
        INSERT INTO counters(name, value) VALUES (?1, ?2)
        ON CONFLICT(name) DO UPDATE SET value=excluded.value
        "#,
        params![name, next],
    )?;
    Ok(next)
}

fn stored_handle(raw: String) -> Result<Handle, StoreError> {
    Handle::try_new(raw).map_err(|_| StoreError::InvalidInput("stored handle is malformed"))
}

fn resolved_object(id: i64, kind: &str, handle: String) -> Result<ResolvedObject, StoreError> {
    let kind = ObjectKind::parse(kind).ok_or(StoreError::InvalidInput("stored object kind is unknown"))?;
    Ok(ResolvedObject {
        id,
        kind,
        handle: stored_handle(handle)?,
    })
}

fn metadata_value_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MetadataValue> {
    Ok(MetadataValue {
        id: MetadataValueId::new(row.get(0)?),
        item: ItemId::new(row.get(1)?),
        field: FieldId::new(row.get(2)?),
        text: row.get(3)?,
        language: row.get(4)?,
    })
}

fn actor_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Actor> {
    Ok(Actor {
        id: ActorId::new(row.get(0)?),
        email: row.get(1)?,
    })
}
