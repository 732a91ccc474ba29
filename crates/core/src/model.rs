#![forbid(unsafe_code)]

use crate::ids::{ActorId, CollectionId, FieldId, Handle, ItemId, MetadataValueId};
use std::fmt;

pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Item,
    Collection,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Item => "item",
            ObjectKind::Collection => "collection",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "item" => Some(ObjectKind::Item),
            "collection" => Some(ObjectKind::Collection),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the store's identifier index knows about an object, before any kind check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedObject {
    pub id: i64,
    pub kind: ObjectKind,
    pub handle: Handle,
}

/// A reference whose kind is fixed at the type level.
///
/// `from_resolved` is only called after `KIND` has been checked against the
/// resolved object, so implementations never see a mismatched kind.
pub trait Kinded: Sized {
    const KIND: ObjectKind;

    fn from_resolved(object: ResolvedObject) -> Self;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemRef {
    pub id: ItemId,
    pub handle: Handle,
}

impl Kinded for ItemRef {
    const KIND: ObjectKind = ObjectKind::Item;

    fn from_resolved(object: ResolvedObject) -> Self {
        Self {
            id: ItemId::new(object.id),
            handle: object.handle,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionRef {
    pub id: CollectionId,
    pub handle: Handle,
}

impl Kinded for CollectionRef {
    const KIND: ObjectKind = ObjectKind::Collection;

    fn from_resolved(object: ResolvedObject) -> Self {
        Self {
            id: CollectionId::new(object.id),
            handle: object.handle,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataValue {
    pub id: MetadataValueId,
    pub item: ItemId,
    pub field: FieldId,
    pub text: String,
    pub language: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MembershipEdge {
    pub item: ItemId,
    pub collection: CollectionId,
    pub is_owning: bool,
}

/// How the acting identity was given on the command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActorSpec {
    Email(String),
    Id(ActorId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActorSpecError {
    Empty,
    InvalidId,
}

impl ActorSpecError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "acting identity must not be empty",
            Self::InvalidId => "acting identity must be an email or a positive numeric id",
        }
    }
}

impl fmt::Display for ActorSpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ActorSpecError {}

impl ActorSpec {
    pub fn parse(value: &str) -> Result<Self, ActorSpecError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ActorSpecError::Empty);
        }
        if value.contains('@') {
            return Ok(Self::Email(value.to_ascii_lowercase()));
        }
        ActorId::parse(value)
            .map(Self::Id)
            .map_err(|_| ActorSpecError::InvalidId)
    }
}

impl fmt::Display for ActorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email(email) => f.write_str(email),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: ActorId,
    pub email: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    MetadataModified,
    MembershipModified,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::MetadataModified => "modify_metadata",
            ChangeKind::MembershipModified => "modify_membership",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeDetail {
    ValueCreated(MetadataValueId),
    ValueUpdated(MetadataValueId),
    ValueDeleted(MetadataValueId),
    Mapped(CollectionId),
    Unmapped(CollectionId),
    Moved {
        from: Option<CollectionId>,
        to: CollectionId,
    },
}

/// Change notification raised inside a unit of work, scoped to the owning item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeNotice {
    pub subject: ItemId,
    pub kind: ChangeKind,
    pub actor: ActorId,
    pub detail: ChangeDetail,
}
