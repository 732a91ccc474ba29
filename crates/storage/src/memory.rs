#![forbid(unsafe_code)]

//! In-memory tier of the archive store.
//!
//! Same contract as [`SqliteStore`](crate::SqliteStore), no persistence. A unit of
//! work stages a full copy of the state and swaps it in on commit, so a dropped
//! unit leaves the store untouched.

use crate::StoreError;
use br_core::{
    Actor, ActorId, ActorSpec, ArchiveStore, ChangeNotice, CollectionId, CollectionRef, FieldId,
    Handle, ItemId, MembershipEdge, MetadataValue, MetadataValueId, ObjectKind, ResolvedObject,
    UnitOfWork,
};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug)]
struct ObjectRecord {
    kind: ObjectKind,
    handle: Handle,
    owning_collection: Option<CollectionId>,
}

#[derive(Clone, Debug, Default)]
struct MemoryState {
    objects: BTreeMap<i64, ObjectRecord>,
    handles: BTreeMap<Handle, i64>,
    // (collection, item)
    memberships: BTreeSet<(i64, i64)>,
    values: BTreeMap<MetadataValueId, MetadataValue>,
    actors: BTreeMap<ActorId, Actor>,
    notices: Vec<ChangeNotice>,
    last_object_id: i64,
    last_actor_id: i64,
}

impl MemoryState {
    fn owning_collection(&self, item: ItemId) -> Result<Option<CollectionId>, StoreError> {
        match self.objects.get(&item.get()) {
            Some(record) if record.kind == ObjectKind::Item => Ok(record.owning_collection),
            Some(record) => Err(StoreError::KindMismatch {
                id: item.get(),
                expected: ObjectKind::Item,
                actual: record.kind,
            }),
            None => Err(StoreError::UnknownId(item.get())),
        }
    }

    fn register(&mut self, handle: &Handle, record: ObjectRecord) -> Result<i64, StoreError> {
        if self.handles.contains_key(handle) {
            return Err(StoreError::HandleTaken(handle.to_string()));
        }
        self.last_object_id += 1;
        let id = self.last_object_id;
        self.handles.insert(handle.clone(), id);
        self.objects.insert(id, record);
        Ok(id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: MemoryState,
    last_value_id: i64,
    commits: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_collection(&mut self, handle: &Handle) -> Result<CollectionId, StoreError> {
        let record = ObjectRecord {
            kind: ObjectKind::Collection,
            handle: handle.clone(),
            owning_collection: None,
        };
        self.state.register(handle, record).map(CollectionId::new)
    }

    pub fn create_item(
        &mut self,
        handle: &Handle,
        owning: Option<CollectionId>,
    ) -> Result<ItemId, StoreError> {
        if let Some(owning) = owning {
            match self.state.objects.get(&owning.get()) {
                Some(record) if record.kind == ObjectKind::Collection => {}
                Some(_) => {
                    return Err(StoreError::InvalidInput(
                        "owning collection must be a collection",
                    ));
                }
                None => return Err(StoreError::UnknownId(owning.get())),
            }
        }
        let record = ObjectRecord {
            kind: ObjectKind::Item,
            handle: handle.clone(),
            owning_collection: owning,
        };
        let id = self.state.register(handle, record)?;
        if let Some(owning) = owning {
            self.state.memberships.insert((owning.get(), id));
        }
        Ok(ItemId::new(id))
    }

    pub fn create_actor(&mut self, email: &str) -> Result<Actor, StoreError> {
        let email = email.trim().to_ascii_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(StoreError::InvalidInput("actor email must contain '@'"));
        }
        if self.state.actors.values().any(|actor| actor.email == email) {
            return Err(StoreError::ActorTaken(email));
        }
        self.state.last_actor_id += 1;
        let actor = Actor {
            id: ActorId::new(self.state.last_actor_id),
            email,
        };
        self.state.actors.insert(actor.id, actor.clone());
        Ok(actor)
    }

    pub fn add_metadata_value(
        &mut self,
        item: ItemId,
        field: FieldId,
        text: &str,
        language: Option<&str>,
    ) -> Result<MetadataValue, StoreError> {
        self.state.owning_collection(item)?;
        let id = self.reserve_metadata_value_id()?;
        let value = MetadataValue {
            id,
            item,
            field,
            text: text.to_string(),
            language: language.map(str::to_string),
        };
        self.state.values.insert(id, value.clone());
        Ok(value)
    }

    pub fn metadata_values_for(&self, item: ItemId) -> Vec<MetadataValue> {
        self.state
            .values
            .values()
            .filter(|value| value.item == item)
            .cloned()
            .collect()
    }

    /// Change notifications of every committed unit, oldest first.
    pub fn notices(&self) -> &[ChangeNotice] {
        &self.state.notices
    }

    pub fn commit_count(&self) -> u64 {
        self.commits
    }
}

impl ArchiveStore for MemoryStore {
    type Error = StoreError;
    type Unit<'a> = MemoryUnit<'a>;

    fn resolve_handle(&self, handle: &Handle) -> Result<Option<ResolvedObject>, StoreError> {
        let Some(id) = self.state.handles.get(handle).copied() else {
            return Ok(None);
        };
        self.object_by_id(id)
    }

    fn object_by_id(&self, id: i64) -> Result<Option<ResolvedObject>, StoreError> {
        Ok(self.state.objects.get(&id).map(|record| ResolvedObject {
            id,
            kind: record.kind,
            handle: record.handle.clone(),
        }))
    }

    fn metadata_value(&self, id: MetadataValueId) -> Result<Option<MetadataValue>, StoreError> {
        Ok(self.state.values.get(&id).cloned())
    }

    fn owning_collection(&self, item: ItemId) -> Result<Option<CollectionRef>, StoreError> {
        let Some(record) = self.state.objects.get(&item.get()) else {
            return Ok(None);
        };
        let Some(owning) = record.owning_collection else {
            return Ok(None);
        };
        let collection = self
            .state
            .objects
            .get(&owning.get())
            .ok_or(StoreError::UnknownId(owning.get()))?;
        Ok(Some(CollectionRef {
            id: owning,
            handle: collection.handle.clone(),
        }))
    }

    fn memberships(&self, item: ItemId) -> Result<Vec<MembershipEdge>, StoreError> {
        let owning = self
            .state
            .objects
            .get(&item.get())
            .and_then(|record| record.owning_collection);
        Ok(self
            .state
            .memberships
            .iter()
            .filter(|(_, member)| *member == item.get())
            .map(|(collection, _)| MembershipEdge {
                item,
                collection: CollectionId::new(*collection),
                is_owning: owning == Some(CollectionId::new(*collection)),
            })
            .collect())
    }

    fn find_actor(&self, wanted: &ActorSpec) -> Result<Option<Actor>, StoreError> {
        Ok(match wanted {
            ActorSpec::Email(email) => self
                .state
                .actors
                .values()
                .find(|actor| actor.email == *email)
                .cloned(),
            ActorSpec::Id(id) => self.state.actors.get(id).cloned(),
        })
    }

    fn reserve_metadata_value_id(&mut self) -> Result<MetadataValueId, StoreError> {
        self.last_value_id += 1;
        Ok(MetadataValueId::new(self.last_value_id))
    }

    fn begin(&mut self) -> Result<MemoryUnit<'_>, StoreError> {
        let staged = self.state.clone();
        Ok(MemoryUnit {
            store: self,
            staged,
        })
    }
}

pub struct MemoryUnit<'a> {
    store: &'a mut MemoryStore,
    staged: MemoryState,
}

impl UnitOfWork for MemoryUnit<'_> {
    type Error = StoreError;

    fn insert_metadata_value(&mut self, value: &MetadataValue) -> Result<(), StoreError> {
        self.staged.owning_collection(value.item)?;
        if self.staged.values.contains_key(&value.id) {
            return Err(StoreError::InvalidInput("metadata value id already in use"));
        }
        self.staged.values.insert(value.id, value.clone());
        Ok(())
    }

    fn update_metadata_value(&mut self, value: &MetadataValue) -> Result<bool, StoreError> {
        match self.staged.values.get_mut(&value.id) {
            Some(stored) => {
                stored.field = value.field;
                stored.text = value.text.clone();
                stored.language = value.language.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_metadata_value(&mut self, id: MetadataValueId) -> Result<bool, StoreError> {
        Ok(self.staged.values.remove(&id).is_some())
    }

    fn map_item(&mut self, item: ItemId, collection: CollectionId) -> Result<bool, StoreError> {
        self.staged.owning_collection(item)?;
        Ok(self
            .staged
            .memberships
            .insert((collection.get(), item.get())))
    }

    fn unmap_item(&mut self, item: ItemId, collection: CollectionId) -> Result<bool, StoreError> {
        if self.staged.owning_collection(item)? == Some(collection) {
            return Err(StoreError::InvalidInput(
                "the owning collection cannot be unmapped",
            ));
        }
        Ok(self
            .staged
            .memberships
            .remove(&(collection.get(), item.get())))
    }

    fn move_item(&mut self, item: ItemId, to: CollectionId) -> Result<bool, StoreError> {
        let previous = self.staged.owning_collection(item)?;
        if previous == Some(to) {
            return Ok(false);
        }
        if let Some(record) = self.staged.objects.get_mut(&item.get()) {
            record.owning_collection = Some(to);
        }
        self.staged.memberships.insert((to.get(), item.get()));
        if let Some(previous) = previous {
            self.staged
                .memberships
                .remove(&(previous.get(), item.get()));
        }
        Ok(true)
    }

    fn notify(&mut self, notice: &ChangeNotice) -> Result<(), StoreError> {
        self.staged.notices.push(notice.clone());
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        self.store.state = self.staged;
        self.store.commits += 1;
        Ok(())
    }
}
