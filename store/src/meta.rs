//! Ledger metadata storage trait.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use sharecenter_types::{Address, GroupId, RequestId, ShareId};

/// Next identifiers to hand out. Persisted with every commit that allocates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCounters {
    pub next_group: GroupId,
    pub next_share: ShareId,
    pub next_request: RequestId,
    pub next_event: u64,
}

impl Default for LedgerCounters {
    fn default() -> Self {
        Self {
            next_group: GroupId::FIRST,
            next_share: ShareId::FIRST,
            next_request: RequestId::FIRST,
            next_event: 1,
        }
    }
}

/// Ledger-wide bookkeeping: the registry owner and id counters.
pub trait MetaStore {
    fn get_owner(&self) -> Result<Option<Address>, StoreError>;
    fn get_counters(&self) -> Result<Option<LedgerCounters>, StoreError>;
}
