//! System registry storage trait.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use sharecenter_types::{Address, Timestamp};

/// An external caller authorized to act on behalf of users.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRecord {
    pub address: Address,
    pub active: bool,
    pub added_at: Timestamp,
}

pub trait SystemStore {
    fn get_system(&self, address: &Address) -> Result<Option<SystemRecord>, StoreError>;
    fn iter_systems(&self) -> Result<Vec<SystemRecord>, StoreError>;
}
