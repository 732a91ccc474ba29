#![forbid(unsafe_code)]

use super::StoreError;
use rusqlite::{Connection, params};

const SCHEMA_VERSION: &str = "v1";

const SQL: &str = r#"
        CREATE TABLE IF NOT EXISTS meta (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS counters (
          name TEXT PRIMARY KEY,
          value INTEGER NOT NULL
        );

        -- Identifier index: every item and collection, keyed by internal id and by handle.
        -- `owning_collection` is only set for items.
        CREATE TABLE IF NOT EXISTS objects (
          id INTEGER PRIMARY KEY,
          kind TEXT NOT NULL CHECK (kind IN ('item', 'collection')),
          handle TEXT NOT NULL UNIQUE,
          owning_collection INTEGER REFERENCES objects(id),
          created_at_ms INTEGER NOT NULL
        );

        -- One row per membership, owning one included.
        CREATE TABLE IF NOT EXISTS collection_items (
          collection_id INTEGER NOT NULL REFERENCES objects(id),
          item_id INTEGER NOT NULL REFERENCES objects(id),
          PRIMARY KEY (collection_id, item_id)
        );

        CREATE TABLE IF NOT EXISTS metadata_values (
          id INTEGER PRIMARY KEY,
          item_id INTEGER NOT NULL REFERENCES objects(id),
          field_id INTEGER NOT NULL,
          text_value TEXT NOT NULL,
          language TEXT
        );

        CREATE TABLE IF NOT EXISTS actors (
          id INTEGER PRIMARY KEY,
          email TEXT NOT NULL UNIQUE,
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS events (
          seq INTEGER PRIMARY KEY AUTOINCREMENT,
          ts_ms INTEGER NOT NULL,
          subject_id INTEGER NOT NULL,
          actor_id INTEGER NOT NULL,
          type TEXT NOT NULL,
          payload_json TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_collection_items_item ON collection_items(item_id);
        CREATE INDEX IF NOT EXISTS idx_metadata_values_item ON metadata_values(item_id);
        CREATE INDEX IF NOT EXISTS idx_events_subject_seq ON events(subject_id, seq);
"#;

pub(super) fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
        params!["schema_version", SCHEMA_VERSION],
    )?;
    Ok(())
}
