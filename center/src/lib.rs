//! ShareCenter engine: a registry of systems and users, an ownership graph of
//! groups, time-limited shares of resource URIs and the request workflow that
//! links them.
//!
//! Design:
//! - One writer at a time stages a mutation against the published ledger and
//!   commits it to the store as a single change set
//! - Readers clone the published `Arc<Ledger>` and never block writers
//! - Every committed change is described by a sequenced event, persisted in
//!   the store and fanned out to subscribers after the commit
//! - Blocked proposals are silent: they return `false` or `None`

mod blocklist;
pub mod center;
pub mod config;
pub mod error;
pub mod events;
mod graph;
pub mod ledger;
mod registry;
pub mod requests;
pub mod shares;

pub use center::{Caller, CenterStats, Receipt, ShareCenter};
pub use config::CenterConfig;
pub use error::ConfigError;
pub use events::{EventBus, Listener, ListenerMap, Subscription};
pub use ledger::Ledger;
pub use requests::Accepted;
pub use shares::VisibleShares;
