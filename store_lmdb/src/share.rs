//! LMDB implementation of ShareStore.

use sharecenter_store::{ShareRecord, ShareStore, StoreError};
use sharecenter_types::ShareId;

use crate::codec::{all_values, get_value};
use crate::environment::LmdbEnvironment;
use crate::LmdbError;

impl ShareStore for LmdbEnvironment {
    fn get_share(&self, id: ShareId) -> Result<Option<ShareRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(get_value(&self.shares_db, &rtxn, &id.to_key())?)
    }

    fn iter_shares(&self) -> Result<Vec<ShareRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(all_values(&self.shares_db, &rtxn)?)
    }
}
