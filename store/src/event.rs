//! Event log storage trait.

use crate::StoreError;
use sharecenter_types::EventRecord;

/// Append-only log of committed events, keyed by sequence number.
pub trait EventStore {
    /// Up to `limit` events with `seq >= from`, in sequence order.
    fn events_from(&self, from: u64, limit: usize) -> Result<Vec<EventRecord>, StoreError>;

    /// Sequence number of the newest event, or 0 for an empty log.
    fn last_event_seq(&self) -> Result<u64, StoreError>;
}
