#![forbid(unsafe_code)]

//! Narrow contract between the batch engine and whatever persists archival objects.
//!
//! Reads go straight through [`ArchiveStore`]. Every write happens inside a
//! [`UnitOfWork`] obtained from [`ArchiveStore::begin`]; a unit becomes visible only
//! when [`UnitOfWork::commit`] returns, and dropping it uncommitted discards it.

use crate::ids::{CollectionId, Handle, ItemId, MetadataValueId};
use crate::model::{
    Actor, ActorSpec, ChangeNotice, CollectionRef, MembershipEdge, MetadataValue, ResolvedObject,
};

pub trait ArchiveStore {
    type Error: std::error::Error + Send + Sync + 'static;
    type Unit<'a>: UnitOfWork<Error = Self::Error>
    where
        Self: 'a;

    /// Looks a handle up in the identifier index. `None` when nothing is registered.
    fn resolve_handle(&self, handle: &Handle) -> Result<Option<ResolvedObject>, Self::Error>;

    /// Looks an internal id up in the identifier index.
    fn object_by_id(&self, id: i64) -> Result<Option<ResolvedObject>, Self::Error>;

    fn metadata_value(&self, id: MetadataValueId) -> Result<Option<MetadataValue>, Self::Error>;

    fn owning_collection(&self, item: ItemId) -> Result<Option<CollectionRef>, Self::Error>;

    /// All memberships of an item, owning one included, ordered by collection id.
    fn memberships(&self, item: ItemId) -> Result<Vec<MembershipEdge>, Self::Error>;

    fn find_actor(&self, wanted: &ActorSpec) -> Result<Option<Actor>, Self::Error>;

    /// Durably hands out the id the next created value will carry, outside any unit
    /// of work. Ids are never reused, even when the unit that was meant to use one is
    /// discarded.
    fn reserve_metadata_value_id(&mut self) -> Result<MetadataValueId, Self::Error>;

    fn begin(&mut self) -> Result<Self::Unit<'_>, Self::Error>;
}

pub trait UnitOfWork {
    type Error;

    fn insert_metadata_value(&mut self, value: &MetadataValue) -> Result<(), Self::Error>;

    /// Returns `false` when the value no longer exists.
    fn update_metadata_value(&mut self, value: &MetadataValue) -> Result<bool, Self::Error>;

    /// Returns `false` when the value no longer exists.
    fn delete_metadata_value(&mut self, id: MetadataValueId) -> Result<bool, Self::Error>;

    /// Adds a non-owning membership. Returns `false` when the item already belongs to
    /// the collection.
    fn map_item(&mut self, item: ItemId, collection: CollectionId) -> Result<bool, Self::Error>;

    /// Removes a non-owning membership. Returns `false` when there was none.
    fn unmap_item(&mut self, item: ItemId, collection: CollectionId) -> Result<bool, Self::Error>;

    /// Makes `to` the owning collection and drops the previous owning membership.
    /// Returns `false` when `to` already owns the item.
    fn move_item(&mut self, item: ItemId, to: CollectionId) -> Result<bool, Self::Error>;

    fn notify(&mut self, notice: &ChangeNotice) -> Result<(), Self::Error>;

    fn commit(self) -> Result<(), Self::Error>;
}
