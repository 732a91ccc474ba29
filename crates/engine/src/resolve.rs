#![forbid(unsafe_code)]

//! Identifier Resolver: handle or internal id to a strongly-kinded reference.

use crate::error::ResolveError;
use br_core::{ArchiveStore, Handle, Kinded, ResolvedObject};

/// Resolves an external handle, failing unless it names an object of kind `K`.
pub fn by_handle<K, S>(store: &S, identifier: &str) -> Result<K, ResolveError>
where
    K: Kinded,
    S: ArchiveStore,
{
    let handle = Handle::try_new(identifier).map_err(|reason| ResolveError::MalformedHandle {
        identifier: identifier.to_string(),
        reason,
    })?;
    let found = store
        .resolve_handle(&handle)
        .map_err(|err| lookup_failed(identifier, err))?;
    expect_kind(identifier, found)
}

/// Resolves an internal id (as carried by metadata input), failing unless it names
/// an object of kind `K`.
pub fn by_id<K, S>(store: &S, id: i64) -> Result<K, ResolveError>
where
    K: Kinded,
    S: ArchiveStore,
{
    let identifier = id.to_string();
    let found = store
        .object_by_id(id)
        .map_err(|err| lookup_failed(&identifier, err))?;
    expect_kind(&identifier, found)
}

fn expect_kind<K: Kinded>(
    identifier: &str,
    found: Option<ResolvedObject>,
) -> Result<K, ResolveError> {
    let Some(object) = found else {
        return Err(ResolveError::NotFound {
            identifier: identifier.to_string(),
            expected: K::KIND,
        });
    };
    if object.kind != K::KIND {
        return Err(ResolveError::WrongKind {
            identifier: identifier.to_string(),
            expected: K::KIND,
            actual: object.kind,
        });
    }
    Ok(K::from_resolved(object))
}

fn lookup_failed<E>(identifier: &str, err: E) -> ResolveError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ResolveError::Lookup {
        identifier: identifier.to_string(),
        source: Box::new(err),
    }
}
