//! LMDB implementation of SystemStore.

use sharecenter_store::{StoreError, SystemRecord, SystemStore};
use sharecenter_types::Address;

use crate::codec::{all_values, get_value};
use crate::environment::LmdbEnvironment;
use crate::LmdbError;

impl SystemStore for LmdbEnvironment {
    fn get_system(&self, address: &Address) -> Result<Option<SystemRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(get_value(&self.systems_db, &rtxn, address.as_str().as_bytes())?)
    }

    fn iter_systems(&self) -> Result<Vec<SystemRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(all_values(&self.systems_db, &rtxn)?)
    }
}
