//! LMDB implementation of RequestStore.

use sharecenter_store::{RequestRecord, RequestStore, StoreError};
use sharecenter_types::RequestId;

use crate::codec::{all_values, get_value};
use crate::environment::LmdbEnvironment;
use crate::LmdbError;

impl RequestStore for LmdbEnvironment {
    fn get_request(&self, id: RequestId) -> Result<Option<RequestRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(get_value(&self.requests_db, &rtxn, &id.to_key())?)
    }

    fn iter_requests(&self) -> Result<Vec<RequestRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(all_values(&self.requests_db, &rtxn)?)
    }
}
