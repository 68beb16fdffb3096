//! LMDB storage backend for ShareCenter.
//!
//! Implements all storage traits from `sharecenter-store` using the `heed`
//! LMDB bindings. Each table maps to one named LMDB database within a single
//! environment, and every [`ChangeSet`](sharecenter_store::ChangeSet) is
//! applied in one write transaction.

mod codec;
pub mod environment;
pub mod error;
pub mod event;
pub mod group;
pub mod integrity;
pub mod meta;
pub mod migration;
pub mod request;
pub mod share;
pub mod system;
pub mod user;
pub mod write_batch;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use write_batch::WriteBatch;
