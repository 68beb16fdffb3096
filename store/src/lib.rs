//! Record types and abstract storage traits for ShareCenter.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The engine depends only on the traits: it reads whole tables once
//! when a center is opened and afterwards writes through [`CenterStore::commit`],
//! which applies a [`ChangeSet`] atomically.

pub mod batch;
pub mod error;
pub mod event;
pub mod group;
pub mod meta;
pub mod request;
pub mod share;
pub mod system;
pub mod user;

pub use batch::{Change, ChangeSet};
pub use error::StoreError;
pub use event::EventStore;
pub use group::{GroupRecord, GroupStore};
pub use meta::{LedgerCounters, MetaStore};
pub use request::{RequestKind, RequestRecord, RequestStore};
pub use share::{ShareRecord, ShareStore};
pub use system::{SystemRecord, SystemStore};
pub use user::{Party, UserRecord, UserStore};

/// A complete storage backend for a center.
///
/// `commit` must apply every change in the set or none of them.
pub trait CenterStore:
    SystemStore + UserStore + GroupStore + ShareStore + RequestStore + EventStore + MetaStore + Send + Sync
{
    fn commit(&self, changes: &ChangeSet) -> Result<(), StoreError>;
}
