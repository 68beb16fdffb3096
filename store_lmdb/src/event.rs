//! LMDB implementation of EventStore.
//!
//! Events are keyed by the big-endian sequence number, so a range scan from
//! `from` yields them in commit order.

use sharecenter_store::{EventStore, StoreError};
use sharecenter_types::EventRecord;

use crate::codec::decode;
use crate::environment::LmdbEnvironment;
use crate::LmdbError;

impl EventStore for LmdbEnvironment {
    fn events_from(&self, from: u64, limit: usize) -> Result<Vec<EventRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let start = from.to_be_bytes();
        let range = (std::ops::Bound::Included(&start[..]), std::ops::Bound::Unbounded);
        let mut out = Vec::new();
        for entry in self.events_db.range(&rtxn, &range).map_err(LmdbError::from)? {
            if out.len() >= limit {
                break;
            }
            let (_, bytes) = entry.map_err(LmdbError::from)?;
            out.push(decode(bytes)?);
        }
        Ok(out)
    }

    fn last_event_seq(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self.events_db.last(&rtxn).map_err(LmdbError::from)? {
            Some((key, _)) => {
                let arr: [u8; 8] = key.try_into().map_err(|_| {
                    LmdbError::Serialization(format!("event key has {} bytes", key.len()))
                })?;
                Ok(u64::from_be_bytes(arr))
            }
            None => Ok(0),
        }
    }
}
