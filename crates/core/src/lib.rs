#![forbid(unsafe_code)]

pub mod ids;
pub mod model;
pub mod port;

pub use ids::{
    ActorId, CollectionId, FieldId, Handle, HandleError, ItemId, MetadataValueId, NumericIdError,
};
pub use model::{
    Actor, ActorSpec, ActorSpecError, ChangeDetail, ChangeKind, ChangeNotice, CollectionRef,
    DEFAULT_LANGUAGE, ItemRef, Kinded, MembershipEdge, MetadataValue, ObjectKind, ResolvedObject,
};
pub use port::{ArchiveStore, UnitOfWork};
