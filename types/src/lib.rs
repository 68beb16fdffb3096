//! Fundamental types for ShareCenter.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! addresses, numeric identifiers, timestamps and the clock seam, validated URIs,
//! access levels, ledger events and the numbered error taxonomy.

pub mod access;
pub mod address;
pub mod error;
pub mod event;
pub mod id;
pub mod time;
pub mod uri;

pub use access::AccessLevel;
pub use address::{Address, InvalidAddress};
pub use error::{CenterError, ErrorCategory, ErrorKind};
pub use event::{CenterEvent, EventName, EventRecord, RequestType};
pub use id::{GroupId, RequestId, ShareId};
pub use time::{Clock, Expiry, Lifetime, SystemClock, Timestamp};
pub use uri::{Uri, MAX_URI_LENGTH};
