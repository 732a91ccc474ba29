#![forbid(unsafe_code)]

use br_core::{
    Actor, ActorSpec, ArchiveStore, ChangeNotice, CollectionRef, FieldId, Handle, ItemId,
    MembershipEdge, MetadataValue, MetadataValueId, ResolvedObject, UnitOfWork,
};
use br_engine::{
    BatchError, BatchPaths, MetadataBatch, MetadataRollback, MetadataRow, RecordSource, ResolveError,
    RollbackJournal, run_metadata_batch,
};
use br_storage::{MemoryStore, MemoryUnit, SqliteStore, StoreError};
use std::cell::RefCell;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

const HEADER: &str = "metadata_value_id,item_id,metadata_field_id,text_value\n";

fn handle(value: &str) -> Handle {
    Handle::try_new(value).expect("handle")
}

struct Fixture {
    _dir: tempfile::TempDir,
    store: SqliteStore,
    actor: Actor,
    item: ItemId,
    collection: br_core::CollectionId,
    root: std::path::PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = dir.path().to_path_buf();
        let mut store = SqliteStore::open(root.join("store")).expect("open store");
        let actor = store.create_actor("curator@example.org").expect("actor");
        let collection = store.create_collection(&handle("2142/1")).expect("collection");
        let item = store
            .create_item(&handle("2142/2"), Some(collection))
            .expect("item");
        Self {
            _dir: dir,
            store,
            actor,
            item,
            collection,
            root,
        }
    }

    fn value(&mut self, field: i64, text: &str) -> MetadataValue {
        self.store
            .add_metadata_value(self.item, FieldId::new(field), text, Some("en"))
            .expect("seed value")
    }

    fn run(&mut self, name: &str, input: &str) -> (Result<br_engine::BatchReport, BatchError>, String) {
        let paths = BatchPaths::new(self.root.join(format!("{name}.csv")), self.root.join(format!("{name}.rollback.csv")));
        std::fs::write(&paths.input, input).expect("write input");
        let result = run_metadata_batch(&mut self.store, &paths, &self.actor);
        (result, read(&paths.rollback))
    }

    fn replay(&mut self, name: &str, rollback: &str) -> br_engine::BatchReport {
        let (result, _) = self.run(name, rollback);
        result.expect("replay rollback")
    }

    fn stored(&self, id: MetadataValueId) -> Option<MetadataValue> {
        self.store.metadata_value(id).expect("lookup")
    }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).expect("read rollback")
}

fn data_lines(rollback: &str) -> Vec<&str> {
    rollback.lines().skip(1).collect()
}

#[test]
fn second_identical_run_skips_every_row() {
    let mut fx = Fixture::new();
    let title = fx.value(64, "Old title");
    let subject = fx.value(57, "Rivers");
    let input = format!(
        "{HEADER}{},{},64,New title\n{},{},57,Lakes\n",
        title.id, fx.item, subject.id, fx.item
    );

    let (first, rollback) = fx.run("first", &input);
    let first = first.expect("first run");
    assert_eq!(first.applied, 2);
    assert_eq!(data_lines(&rollback).len(), 2);

    let (second, rollback) = fx.run("second", &input);
    let second = second.expect("second run");
    assert_eq!(second.rows, 2);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.applied, 0);
    assert!(data_lines(&rollback).is_empty(), "{rollback}");
    assert_eq!(fx.store.events(10).expect("events").len(), 2);
}

#[test]
fn update_rollback_restores_previous_text() {
    let mut fx = Fixture::new();
    let value = fx.value(64, "A");
    let input = format!("{HEADER}{},{},64,B\n", value.id, fx.item);

    let (report, rollback) = fx.run("update", &input);
    report.expect("update run");
    assert_eq!(fx.stored(value.id).expect("value").text, "B");
    assert_eq!(
        data_lines(&rollback),
        vec![format!("{},A,{},64", value.id, fx.item)]
    );

    let report = fx.replay("undo", &rollback);
    assert_eq!(report.applied, 1);
    assert_eq!(fx.stored(value.id).expect("value").text, "A");
}

#[test]
fn create_is_undone_by_its_rollback_row() {
    let mut fx = Fixture::new();
    let input = format!("{HEADER},{},70,X\n", fx.item);

    let (report, rollback) = fx.run("create", &input);
    assert_eq!(report.expect("create run").applied, 1);
    let created = fx.store.metadata_values_for(fx.item).expect("values");
    assert_eq!(created.len(), 1);
    let created = &created[0];
    assert_eq!(created.text, "X");
    assert_eq!(created.field, FieldId::new(70));
    assert_eq!(created.language.as_deref(), Some("en"));
    assert_eq!(
        data_lines(&rollback),
        vec![format!("{},,{},70", created.id, fx.item)]
    );

    fx.replay("undo", &rollback);
    assert!(fx.stored(created.id).is_none());
}

#[test]
fn delete_is_undone_by_recreating_the_text() {
    let mut fx = Fixture::new();
    let value = fx.value(64, "Keep me");
    let input = format!("{HEADER}{},{},64,\n", value.id, fx.item);

    let (report, rollback) = fx.run("delete", &input);
    report.expect("delete run");
    assert!(fx.stored(value.id).is_none());
    assert_eq!(
        data_lines(&rollback),
        vec![format!(",Keep me,{},64", fx.item)]
    );

    fx.replay("undo", &rollback);
    let restored = fx.store.metadata_values_for(fx.item).expect("values");
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].text, "Keep me");
    assert_eq!(restored[0].field, FieldId::new(64));
    assert!(restored[0].id > value.id);
}

#[test]
fn same_text_under_another_field_is_updated() {
    let mut fx = Fixture::new();
    let value = fx.value(64, "Title");
    let input = format!("{HEADER}{},{},65,Title\n", value.id, fx.item);

    let (report, rollback) = fx.run("field", &input);
    let report = report.expect("run");
    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped, 0);
    assert_eq!(fx.stored(value.id).expect("value").field, FieldId::new(65));
    assert_eq!(
        data_lines(&rollback),
        vec![format!("{},Title,{},64", value.id, fx.item)]
    );
}

#[test]
fn decomposed_input_matches_composed_stored_text() {
    let mut fx = Fixture::new();
    let value = fx.value(64, "Caf\u{e9}");
    let input = format!("{HEADER}{},{},64,Cafe\u{301}\n", value.id, fx.item);

    let (report, _) = fx.run("nfc", &input);
    assert_eq!(report.expect("run").skipped, 1);
}

#[test]
fn missing_value_is_reported_and_the_run_continues() {
    let mut fx = Fixture::new();
    let value = fx.value(64, "A");
    let input = format!(
        "{HEADER}9999,{},64,Ghost\n9998,{},64,\n{},{},64,B\n",
        fx.item, fx.item, value.id, fx.item
    );

    let (report, rollback) = fx.run("missing", &input);
    let report = report.expect("run");
    assert_eq!(report.rows, 3);
    assert_eq!(report.failed, 2);
    assert_eq!(report.applied, 1);
    assert_eq!(fx.stored(value.id).expect("value").text, "B");
    assert_eq!(data_lines(&rollback).len(), 1);
}

#[test]
fn creating_on_a_collection_stops_the_run() {
    let mut fx = Fixture::new();
    let value = fx.value(64, "A");
    let input = format!(
        "{HEADER}{},{},64,B\n,{},64,Misplaced\n{},{},64,C\n",
        value.id, fx.item, fx.collection, value.id, fx.item
    );

    let (result, rollback) = fx.run("wrong_kind", &input);
    let err = result.expect_err("fatal");
    assert_eq!(err.line(), Some(3));
    assert!(matches!(
        err,
        BatchError::Resolution {
            source: ResolveError::WrongKind { .. },
            ..
        }
    ));
    assert_eq!(fx.stored(value.id).expect("value").text, "B");
    assert_eq!(data_lines(&rollback).len(), 1);
}

#[test]
fn malformed_id_stops_the_run_after_earlier_rows_commit() {
    let mut fx = Fixture::new();
    let value = fx.value(64, "A");
    let input = format!("{HEADER}{},{},64,B\nnot-a-number,{},64,C\n", value.id, fx.item, fx.item);

    let (result, rollback) = fx.run("malformed", &input);
    assert!(matches!(
        result,
        Err(BatchError::MalformedRow { line: 3, .. })
    ));
    assert_eq!(fx.stored(value.id).expect("value").text, "B");
    assert_eq!(data_lines(&rollback).len(), 1);
}

#[test]
fn item_id_is_ignored_outside_create() {
    let mut fx = Fixture::new();
    let first = fx.value(64, "A");
    let second = fx.value(57, "C");
    let input = format!(
        "{HEADER}{},n/a,64,B\n{},{},57,D\n",
        first.id, second.id, fx.item
    );

    let (report, rollback) = fx.run("loose_item", &input);
    let report = report.expect("run");
    assert_eq!(report.applied, 2);
    assert_eq!(fx.stored(first.id).expect("value").text, "B");
    assert_eq!(fx.stored(second.id).expect("value").text, "D");
    assert_eq!(data_lines(&rollback).len(), 2);
}

#[test]
fn unknown_actor_is_a_configuration_error() {
    let fx = Fixture::new();
    let err = br_engine::resolve_actor(&fx.store, "nobody@example.org").expect_err("unknown");
    assert!(matches!(err, BatchError::Config(_)));
    let err = br_engine::resolve_actor(&fx.store, "not an id").expect_err("invalid");
    assert!(matches!(err, BatchError::Config(_)));
    let actor = br_engine::resolve_actor(&fx.store, &fx.actor.id.to_string()).expect("by id");
    assert_eq!(actor, fx.actor);
}

// Records store and journal activity into one shared log.
#[derive(Clone, Default)]
struct Trace(Rc<RefCell<Vec<&'static str>>>);

impl Trace {
    fn push(&self, event: &'static str) {
        self.0.borrow_mut().push(event);
    }

    fn events(&self) -> Vec<&'static str> {
        self.0.borrow().clone()
    }
}

struct TracedJournal {
    trace: Trace,
    pending: usize,
}

impl Write for TracedJournal {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.pending > 0 {
            self.trace.push("journal");
            self.pending = 0;
        }
        Ok(())
    }
}

struct TracedStore {
    inner: MemoryStore,
    trace: Trace,
}

struct TracedUnit<'a> {
    inner: MemoryUnit<'a>,
    trace: Trace,
}

impl ArchiveStore for TracedStore {
    type Error = StoreError;
    type Unit<'a> = TracedUnit<'a>;

    fn resolve_handle(&self, handle: &Handle) -> Result<Option<ResolvedObject>, StoreError> {
        self.inner.resolve_handle(handle)
    }

    fn object_by_id(&self, id: i64) -> Result<Option<ResolvedObject>, StoreError> {
        self.inner.object_by_id(id)
    }

    fn metadata_value(&self, id: MetadataValueId) -> Result<Option<MetadataValue>, StoreError> {
        self.inner.metadata_value(id)
    }

    fn owning_collection(&self, item: ItemId) -> Result<Option<CollectionRef>, StoreError> {
        self.inner.owning_collection(item)
    }

    fn memberships(&self, item: ItemId) -> Result<Vec<MembershipEdge>, StoreError> {
        self.inner.memberships(item)
    }

    fn find_actor(&self, spec: &ActorSpec) -> Result<Option<Actor>, StoreError> {
        self.inner.find_actor(spec)
    }

    fn reserve_metadata_value_id(&mut self) -> Result<MetadataValueId, StoreError> {
        self.inner.reserve_metadata_value_id()
    }

    fn begin(&mut self) -> Result<TracedUnit<'_>, StoreError> {
        Ok(TracedUnit {
            inner: self.inner.begin()?,
            trace: self.trace.clone(),
        })
    }
}

impl UnitOfWork for TracedUnit<'_> {
    type Error = StoreError;

    fn insert_metadata_value(&mut self, value: &MetadataValue) -> Result<(), StoreError> {
        self.trace.push("write");
        self.inner.insert_metadata_value(value)
    }

    fn update_metadata_value(&mut self, value: &MetadataValue) -> Result<bool, StoreError> {
        self.trace.push("write");
        self.inner.update_metadata_value(value)
    }

    fn delete_metadata_value(&mut self, id: MetadataValueId) -> Result<bool, StoreError> {
        self.trace.push("write");
        self.inner.delete_metadata_value(id)
    }

    fn map_item(&mut self, item: ItemId, collection: br_core::CollectionId) -> Result<bool, StoreError> {
        self.trace.push("write");
        self.inner.map_item(item, collection)
    }

    fn unmap_item(&mut self, item: ItemId, collection: br_core::CollectionId) -> Result<bool, StoreError> {
        self.trace.push("write");
        self.inner.unmap_item(item, collection)
    }

    fn move_item(&mut self, item: ItemId, to: br_core::CollectionId) -> Result<bool, StoreError> {
        self.trace.push("write");
        self.inner.move_item(item, to)
    }

    fn notify(&mut self, notice: &ChangeNotice) -> Result<(), StoreError> {
        self.inner.notify(notice)
    }

    fn commit(self) -> Result<(), StoreError> {
        self.trace.push("commit");
        self.inner.commit()
    }
}

#[test]
fn every_row_is_journaled_before_its_write() {
    let trace = Trace::default();
    let mut inner = MemoryStore::new();
    let actor = inner.create_actor("curator@example.org").expect("actor");
    let item = inner.create_item(&handle("2142/2"), None).expect("item");
    let updated = inner
        .add_metadata_value(item, FieldId::new(64), "A", Some("en"))
        .expect("value");
    let deleted = inner
        .add_metadata_value(item, FieldId::new(65), "Gone", Some("en"))
        .expect("value");
    let skipped = inner
        .add_metadata_value(item, FieldId::new(66), "Same", Some("en"))
        .expect("value");
    let mut store = TracedStore {
        inner,
        trace: trace.clone(),
    };

    let input = format!(
        "{HEADER},{item},70,New\n{},{item},64,B\n{},{item},66,Same\n{},{item},65,\n",
        updated.id, skipped.id, deleted.id
    );
    let rows = RecordSource::<_, MetadataRow>::from_reader(input.as_bytes()).expect("source");
    let mut journal = RollbackJournal::<_, MetadataRollback>::new(TracedJournal {
        trace: trace.clone(),
        pending: 0,
    })
    .expect("journal");
    // header
    assert_eq!(trace.events(), vec!["journal"]);

    let report = MetadataBatch::new(&mut store, actor.id)
        .run(rows, &mut journal)
        .expect("run");
    assert_eq!(report.applied, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(journal.entries_written(), 3);
    assert_eq!(
        trace.events(),
        vec![
            "journal", "journal", "write", "commit", "journal", "write", "commit", "journal",
            "write", "commit",
        ]
    );
    assert_eq!(store.inner.notices().len(), 3);
    assert!(store.inner.notices().iter().all(|notice| notice.actor == actor.id));
}

#[test]
fn unknown_value_id_commits_nothing() {
    let mut store = MemoryStore::new();
    let actor = store.create_actor("curator@example.org").expect("actor");
    let item = store.create_item(&handle("2142/2"), None).expect("item");
    let input = format!("{HEADER}77,{item},64,B\n");
    let rows: Vec<_> = RecordSource::<_, MetadataRow>::from_reader(input.as_bytes())
        .expect("source")
        .collect();
    let mut journal = RollbackJournal::<_, MetadataRollback>::new(Vec::new()).expect("journal");

    let report = MetadataBatch::new(&mut store, actor.id)
        .run(rows, &mut journal)
        .expect("run");
    assert_eq!(report.failed, 1);
    assert_eq!(store.commit_count(), 0);
    let out = String::from_utf8(journal.finish().expect("finish")).expect("utf8");
    assert_eq!(out.lines().count(), 1);
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().expect("log buffer").clone()).expect("utf8")
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn verbose_run_logs_each_row_and_rollback_line() {
    let mut fx = Fixture::new();
    let value = fx.value(64, "Old");
    let input = format!("{HEADER}{},{},64,Cafe\u{301}\n", value.id, fx.item);

    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let (report, _) = tracing::subscriber::with_default(subscriber, || fx.run("verbose", &input));
    report.expect("run");

    let out = logs.contents();
    let processing = out
        .lines()
        .find(|line| line.contains("processing metadata row"))
        .expect("row line");
    assert!(processing.contains(&format!("value_id={}", value.id)), "{processing}");
    assert!(processing.contains("text=Caf\u{e9}"), "{processing}");
    let written = out
        .lines()
        .find(|line| line.contains("rollback line written"))
        .expect("rollback line");
    assert!(written.contains(&format!("key={}", value.id)), "{written}");
    assert!(written.contains("value=Old"), "{written}");
}
