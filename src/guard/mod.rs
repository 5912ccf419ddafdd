//! Ownership checks.
//!
//! Resource existence is always resolved before the caller's identity, so a
//! missing id yields `NotFound` no matter who asks. An unknown caller is
//! `Forbidden`, never `NotFound`.

use crate::models::{Art, Gallery, ResourceKind, User};
use crate::store::{Store, StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forbidden {
    /// The caller subject has no user row
    UnknownCaller,
    /// The caller exists but does not own the resource
    NotOwner(ResourceKind),
}

#[derive(Debug)]
pub enum GuardError {
    NotFound(ResourceKind),
    Forbidden(Forbidden),
    Store(StoreError),
}

impl From<StoreError> for GuardError {
    fn from(err: StoreError) -> Self {
        GuardError::Store(err)
    }
}

/// A resource with exactly one owning user
pub trait Owned: Sized {
    const KIND: ResourceKind;

    fn load(store: &Store, id: i64) -> StoreResult<Self>;

    fn owner_id(&self) -> i64;
}

impl Owned for Art {
    const KIND: ResourceKind = ResourceKind::Art;

    fn load(store: &Store, id: i64) -> StoreResult<Self> {
        store.get_art(id)
    }

    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

impl Owned for Gallery {
    const KIND: ResourceKind = ResourceKind::Gallery;

    fn load(store: &Store, id: i64) -> StoreResult<Self> {
        store.get_gallery(id)
    }

    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

/// A resource together with its verified owner
#[derive(Debug)]
pub struct Ownership<R> {
    pub resource: R,
    pub owner: User,
}

/// Resolve the user row for a caller subject
pub fn resolve_caller(store: &Store, subject: &str) -> Result<User, GuardError> {
    match store.get_user_by_auth_sub(subject) {
        Ok(user) => Ok(user),
        Err(StoreError::NotFound(_)) => Err(GuardError::Forbidden(Forbidden::UnknownCaller)),
        Err(e) => Err(GuardError::Store(e)),
    }
}

/// Check that `subject` owns the resource `id`
pub fn check_ownership<R: Owned>(
    store: &Store,
    id: i64,
    subject: &str,
) -> Result<Ownership<R>, GuardError> {
    let resource = match R::load(store, id) {
        Ok(r) => r,
        Err(StoreError::NotFound(_)) => return Err(GuardError::NotFound(R::KIND)),
        Err(e) => return Err(GuardError::Store(e)),
    };

    let caller = resolve_caller(store, subject)?;

    if resource.owner_id() != caller.id {
        return Err(GuardError::Forbidden(Forbidden::NotOwner(R::KIND)));
    }

    Ok(Ownership {
        resource,
        owner: caller,
    })
}

/// Check that `subject` is the user `user_id` itself
pub fn check_self_access(store: &Store, user_id: i64, subject: &str) -> Result<User, GuardError> {
    let user = match store.get_user(user_id) {
        Ok(u) => u,
        Err(StoreError::NotFound(_)) => return Err(GuardError::NotFound(ResourceKind::User)),
        Err(e) => return Err(GuardError::Store(e)),
    };

    if user.auth_sub != subject {
        return Err(GuardError::Forbidden(Forbidden::NotOwner(ResourceKind::User)));
    }

    Ok(user)
}
