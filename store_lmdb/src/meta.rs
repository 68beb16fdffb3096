//! LMDB implementation of MetaStore, plus the schema version record.

use sharecenter_store::{LedgerCounters, MetaStore, StoreError};
use sharecenter_types::Address;

use crate::codec::get_value;
use crate::environment::LmdbEnvironment;
use crate::LmdbError;

pub(crate) const OWNER_KEY: &[u8] = b"owner";
pub(crate) const COUNTERS_KEY: &[u8] = b"counters";
pub(crate) const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

impl LmdbEnvironment {
    /// Stored schema version, or 0 for a fresh database.
    pub fn schema_version(&self) -> Result<u32, LmdbError> {
        let rtxn = self.env.read_txn()?;
        match self.meta_db.get(&rtxn, SCHEMA_VERSION_KEY)? {
            Some(bytes) => {
                let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                    LmdbError::Serialization(format!(
                        "schema version has {} bytes, expected 4",
                        bytes.len()
                    ))
                })?;
                Ok(u32::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    pub(crate) fn set_schema_version(&self, version: u32) -> Result<(), LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        self.meta_db
            .put(&mut wtxn, SCHEMA_VERSION_KEY, &version.to_le_bytes())?;
        wtxn.commit()?;
        Ok(())
    }
}

impl MetaStore for LmdbEnvironment {
    fn get_owner(&self) -> Result<Option<Address>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(get_value(&self.meta_db, &rtxn, OWNER_KEY)?)
    }

    fn get_counters(&self) -> Result<Option<LedgerCounters>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(get_value(&self.meta_db, &rtxn, COUNTERS_KEY)?)
    }
}
