//! LMDB implementation of GroupStore.
//!
//! Groups are keyed by the big-endian id so iteration yields creation order.

use sharecenter_store::{GroupRecord, GroupStore, StoreError};
use sharecenter_types::GroupId;

use crate::codec::{all_values, get_value};
use crate::environment::LmdbEnvironment;
use crate::LmdbError;

impl GroupStore for LmdbEnvironment {
    fn get_group(&self, id: GroupId) -> Result<Option<GroupRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(get_value(&self.groups_db, &rtxn, &id.to_key())?)
    }

    fn iter_groups(&self) -> Result<Vec<GroupRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(all_values(&self.groups_db, &rtxn)?)
    }
}
