//! Write batching: applies a whole [`ChangeSet`] inside a single LMDB write
//! transaction.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = env.write_batch()?;
//! batch.apply(&changes)?;
//! batch.commit()?;
//! ```
//!
//! If the batch is dropped without calling [`WriteBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).

use heed::RwTxn;

use sharecenter_store::{
    Change, ChangeSet, GroupRecord, LedgerCounters, RequestRecord, ShareRecord, StoreError,
    SystemRecord, UserRecord,
};
use sharecenter_types::{Address, EventRecord, RequestId, ShareId};

use crate::codec::encode;
use crate::environment::LmdbEnvironment;
use crate::meta::{COUNTERS_KEY, OWNER_KEY};
use crate::LmdbError;

pub struct WriteBatch<'a> {
    txn: RwTxn<'a>,
    env: &'a LmdbEnvironment,
    ops: usize,
}

impl<'a> WriteBatch<'a> {
    pub(crate) fn new(env: &'a LmdbEnvironment) -> Result<Self, StoreError> {
        let txn = env.env().write_txn().map_err(LmdbError::from)?;
        Ok(Self { txn, env, ops: 0 })
    }

    /// Stage every change in the set.
    pub fn apply(&mut self, changes: &ChangeSet) -> Result<(), StoreError> {
        for change in changes.iter() {
            match change {
                Change::PutOwner(owner) => self.put_owner(owner)?,
                Change::PutCounters(counters) => self.put_counters(counters)?,
                Change::PutSystem(record) => self.put_system(record)?,
                Change::PutUser(record) => self.put_user(record)?,
                Change::PutGroup(record) => self.put_group(record)?,
                Change::PutShare(record) => self.put_share(record)?,
                Change::DeleteShare(id) => self.delete_share(*id)?,
                Change::PutRequest(record) => self.put_request(record)?,
                Change::DeleteRequest(id) => self.delete_request(*id)?,
                Change::AppendEvent(record) => self.append_event(record)?,
            }
        }
        Ok(())
    }

    // ── Meta ────────────────────────────────────────────────────────────

    pub fn put_owner(&mut self, owner: &Address) -> Result<(), StoreError> {
        let bytes = encode(owner)?;
        self.env
            .meta_db
            .put(&mut self.txn, OWNER_KEY, &bytes)
            .map_err(LmdbError::from)?;
        self.ops += 1;
        Ok(())
    }

    pub fn put_counters(&mut self, counters: &LedgerCounters) -> Result<(), StoreError> {
        let bytes = encode(counters)?;
        self.env
            .meta_db
            .put(&mut self.txn, COUNTERS_KEY, &bytes)
            .map_err(LmdbError::from)?;
        self.ops += 1;
        Ok(())
    }

    // ── Registry ────────────────────────────────────────────────────────

    pub fn put_system(&mut self, record: &SystemRecord) -> Result<(), StoreError> {
        let bytes = encode(record)?;
        self.env
            .systems_db
            .put(&mut self.txn, record.address.as_str().as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        self.ops += 1;
        Ok(())
    }

    pub fn put_user(&mut self, record: &UserRecord) -> Result<(), StoreError> {
        let bytes = encode(record)?;
        self.env
            .users_db
            .put(&mut self.txn, record.address.as_str().as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        self.ops += 1;
        Ok(())
    }

    // ── Groups and shares ───────────────────────────────────────────────

    pub fn put_group(&mut self, record: &GroupRecord) -> Result<(), StoreError> {
        let bytes = encode(record)?;
        self.env
            .groups_db
            .put(&mut self.txn, &record.id.to_key(), &bytes)
            .map_err(LmdbError::from)?;
        self.ops += 1;
        Ok(())
    }

    pub fn put_share(&mut self, record: &ShareRecord) -> Result<(), StoreError> {
        let bytes = encode(record)?;
        self.env
            .shares_db
            .put(&mut self.txn, &record.id.to_key(), &bytes)
            .map_err(LmdbError::from)?;
        self.ops += 1;
        Ok(())
    }

    pub fn delete_share(&mut self, id: ShareId) -> Result<(), StoreError> {
        self.env
            .shares_db
            .delete(&mut self.txn, &id.to_key())
            .map_err(LmdbError::from)?;
        self.ops += 1;
        Ok(())
    }

    // ── Requests ────────────────────────────────────────────────────────

    pub fn put_request(&mut self, record: &RequestRecord) -> Result<(), StoreError> {
        let bytes = encode(record)?;
        self.env
            .requests_db
            .put(&mut self.txn, &record.id.to_key(), &bytes)
            .map_err(LmdbError::from)?;
        self.ops += 1;
        Ok(())
    }

    pub fn delete_request(&mut self, id: RequestId) -> Result<(), StoreError> {
        self.env
            .requests_db
            .delete(&mut self.txn, &id.to_key())
            .map_err(LmdbError::from)?;
        self.ops += 1;
        Ok(())
    }

    // ── Events ──────────────────────────────────────────────────────────

    pub fn append_event(&mut self, record: &EventRecord) -> Result<(), StoreError> {
        let bytes = encode(record)?;
        self.env
            .events_db
            .put(&mut self.txn, &record.seq.to_be_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        self.ops += 1;
        Ok(())
    }

    /// Number of operations staged so far.
    pub fn len(&self) -> usize {
        self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops == 0
    }

    /// Commit all staged operations atomically.
    pub fn commit(self) -> Result<(), StoreError> {
        let ops = self.ops;
        self.txn.commit().map_err(LmdbError::from)?;
        tracing::trace!(ops, "committed write batch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharecenter_store::{CenterStore, GroupStore, MetaStore, ShareStore, SystemStore};
    use sharecenter_types::{AccessLevel, Expiry, GroupId, Timestamp, Uri};

    fn open_env(dir: &tempfile::TempDir) -> LmdbEnvironment {
        LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).unwrap()
    }

    fn share(id: u64) -> ShareRecord {
        ShareRecord {
            id: ShareId::new(id),
            group: GroupId::new(1),
            uri: Uri::parse("file://doc").unwrap(),
            access: AccessLevel::Read,
            expiry: Expiry::Indefinite,
            created_by: Address::new("0xalice"),
            created_at: Timestamp::new(10),
        }
    }

    #[test]
    fn dropped_batch_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let env = open_env(&dir);
        {
            let mut batch = env.write_batch().unwrap();
            batch.put_share(&share(1)).unwrap();
            assert_eq!(batch.len(), 1);
        }
        assert!(env.get_share(ShareId::new(1)).unwrap().is_none());
    }

    #[test]
    fn commit_applies_every_change() {
        let dir = tempfile::tempdir().unwrap();
        let env = open_env(&dir);
        let mut changes = ChangeSet::new();
        changes.push(Change::PutOwner(Address::new("0xowner")));
        changes.push(Change::PutSystem(SystemRecord {
            address: Address::new("0xsys"),
            active: true,
            added_at: Timestamp::new(5),
        }));
        changes.push(Change::PutGroup(GroupRecord::new(
            GroupId::new(1),
            Address::new("0xalice"),
            true,
            Timestamp::new(5),
        )));
        changes.push(Change::PutShare(share(1)));
        changes.push(Change::PutShare(share(2)));
        changes.push(Change::DeleteShare(ShareId::new(1)));
        env.commit(&changes).unwrap();

        assert_eq!(env.get_owner().unwrap(), Some(Address::new("0xowner")));
        assert_eq!(env.iter_systems().unwrap().len(), 1);
        assert!(env.get_group(GroupId::new(1)).unwrap().is_some());
        assert!(env.get_share(ShareId::new(1)).unwrap().is_none());
        assert_eq!(env.get_share(ShareId::new(2)).unwrap(), Some(share(2)));
    }
}
