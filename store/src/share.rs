//! Share storage trait.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use sharecenter_types::{AccessLevel, Address, Expiry, GroupId, ShareId, Timestamp, Uri};

/// A URI granted to one owning group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecord {
    pub id: ShareId,
    pub group: GroupId,
    pub uri: Uri,
    pub access: AccessLevel,
    pub expiry: Expiry,
    pub created_by: Address,
    pub created_at: Timestamp,
}

impl ShareRecord {
    /// Expired shares stay stored but are hidden from every read.
    pub fn is_visible(&self, now: Timestamp) -> bool {
        !self.expiry.is_expired(now)
    }
}

pub trait ShareStore {
    fn get_share(&self, id: ShareId) -> Result<Option<ShareRecord>, StoreError>;
    fn iter_shares(&self) -> Result<Vec<ShareRecord>, StoreError>;
}
