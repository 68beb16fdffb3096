//! LMDB implementation of UserStore.

use sharecenter_store::{StoreError, UserRecord, UserStore};
use sharecenter_types::Address;

use crate::codec::{all_values, get_value};
use crate::environment::LmdbEnvironment;
use crate::LmdbError;

impl UserStore for LmdbEnvironment {
    fn get_user(&self, address: &Address) -> Result<Option<UserRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(get_value(&self.users_db, &rtxn, address.as_str().as_bytes())?)
    }

    fn iter_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(all_values(&self.users_db, &rtxn)?)
    }
}
