//! In-memory stand-ins for the center's two outside dependencies.
//!
//! `NullClock` replaces wall-clock time with a value tests set and advance.
//! `NullStore` keeps every table in memory and can be told to fail its next
//! commit, which is how rollback and `STORAGE_FAILURE` paths get exercised
//! without a disk.

pub mod clock;
pub mod store;

pub use clock::NullClock;
pub use store::NullStore;
