//! Thread-safe in-memory store for tests.

use sharecenter_store::{
    CenterStore, Change, ChangeSet, EventStore, GroupRecord, GroupStore, LedgerCounters,
    MetaStore, RequestRecord, RequestStore, ShareRecord, ShareStore, StoreError, SystemRecord,
    SystemStore, UserRecord, UserStore,
};
use sharecenter_types::{Address, EventRecord, GroupId, RequestId, ShareId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct Tables {
    owner: Option<Address>,
    counters: Option<LedgerCounters>,
    systems: BTreeMap<Address, SystemRecord>,
    users: BTreeMap<Address, UserRecord>,
    groups: BTreeMap<GroupId, GroupRecord>,
    shares: BTreeMap<ShareId, ShareRecord>,
    requests: BTreeMap<RequestId, RequestRecord>,
    events: BTreeMap<u64, EventRecord>,
}

/// An in-memory center store for testing.
/// Thread-safe; a commit applies under a single lock so it is atomic.
pub struct NullStore {
    tables: Mutex<Tables>,
    fail_next_commit: AtomicBool,
    commits: AtomicUsize,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            fail_next_commit: AtomicBool::new(false),
            commits: AtomicUsize::new(0),
        }
    }

    /// Make the next `commit` fail without applying anything.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn share_count(&self) -> usize {
        self.tables.lock().unwrap().shares.len()
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemStore for NullStore {
    fn get_system(&self, address: &Address) -> Result<Option<SystemRecord>, StoreError> {
        Ok(self.tables.lock().unwrap().systems.get(address).cloned())
    }

    fn iter_systems(&self) -> Result<Vec<SystemRecord>, StoreError> {
        Ok(self.tables.lock().unwrap().systems.values().cloned().collect())
    }
}

impl UserStore for NullStore {
    fn get_user(&self, address: &Address) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.tables.lock().unwrap().users.get(address).cloned())
    }

    fn iter_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.tables.lock().unwrap().users.values().cloned().collect())
    }
}

impl GroupStore for NullStore {
    fn get_group(&self, id: GroupId) -> Result<Option<GroupRecord>, StoreError> {
        Ok(self.tables.lock().unwrap().groups.get(&id).cloned())
    }

    fn iter_groups(&self) -> Result<Vec<GroupRecord>, StoreError> {
        Ok(self.tables.lock().unwrap().groups.values().cloned().collect())
    }
}

impl ShareStore for NullStore {
    fn get_share(&self, id: ShareId) -> Result<Option<ShareRecord>, StoreError> {
        Ok(self.tables.lock().unwrap().shares.get(&id).cloned())
    }

    fn iter_shares(&self) -> Result<Vec<ShareRecord>, StoreError> {
        Ok(self.tables.lock().unwrap().shares.values().cloned().collect())
    }
}

impl RequestStore for NullStore {
    fn get_request(&self, id: RequestId) -> Result<Option<RequestRecord>, StoreError> {
        Ok(self.tables.lock().unwrap().requests.get(&id).cloned())
    }

    fn iter_requests(&self) -> Result<Vec<RequestRecord>, StoreError> {
        Ok(self.tables.lock().unwrap().requests.values().cloned().collect())
    }
}

impl EventStore for NullStore {
    fn events_from(&self, from: u64, limit: usize) -> Result<Vec<EventRecord>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .events
            .range(from..)
            .take(limit)
            .map(|(_, e)| e.clone())
            .collect())
    }

    fn last_event_seq(&self) -> Result<u64, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .events
            .keys()
            .next_back()
            .copied()
            .unwrap_or(0))
    }
}

impl MetaStore for NullStore {
    fn get_owner(&self) -> Result<Option<Address>, StoreError> {
        Ok(self.tables.lock().unwrap().owner.clone())
    }

    fn get_counters(&self) -> Result<Option<LedgerCounters>, StoreError> {
        Ok(self.tables.lock().unwrap().counters)
    }
}

impl CenterStore for NullStore {
    fn commit(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected commit failure".into()));
        }
        let mut tables = self.tables.lock().unwrap();
        for change in changes.iter() {
            match change {
                Change::PutOwner(owner) => tables.owner = Some(owner.clone()),
                Change::PutCounters(counters) => tables.counters = Some(*counters),
                Change::PutSystem(r) => {
                    tables.systems.insert(r.address.clone(), r.clone());
                }
                Change::PutUser(r) => {
                    tables.users.insert(r.address.clone(), r.clone());
                }
                Change::PutGroup(r) => {
                    tables.groups.insert(r.id, r.clone());
                }
                Change::PutShare(r) => {
                    tables.shares.insert(r.id, r.clone());
                }
                Change::DeleteShare(id) => {
                    tables.shares.remove(id);
                }
                Change::PutRequest(r) => {
                    tables.requests.insert(r.id, r.clone());
                }
                Change::DeleteRequest(id) => {
                    tables.requests.remove(id);
                }
                Change::AppendEvent(e) => {
                    tables.events.insert(e.seq, e.clone());
                }
            }
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharecenter_types::{CenterEvent, Timestamp};

    fn test_system() -> SystemRecord {
        SystemRecord {
            address: Address::new("0xsystem"),
            active: true,
            added_at: Timestamp::new(1000),
        }
    }

    #[test]
    fn test_commit_then_read() {
        let store = NullStore::new();
        let mut changes = ChangeSet::new();
        changes.push(Change::PutSystem(test_system()));
        changes.push(Change::PutOwner(Address::new("0xowner")));
        store.commit(&changes).unwrap();

        let system = store.get_system(&Address::new("0xsystem")).unwrap();
        assert_eq!(system, Some(test_system()));
        assert_eq!(store.get_owner().unwrap(), Some(Address::new("0xowner")));
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn test_injected_failure_applies_nothing() {
        let store = NullStore::new();
        let mut changes = ChangeSet::new();
        changes.push(Change::PutSystem(test_system()));
        store.fail_next_commit();
        assert!(store.commit(&changes).is_err());
        assert!(store.iter_systems().unwrap().is_empty());

        store.commit(&changes).unwrap();
        assert_eq!(store.iter_systems().unwrap().len(), 1);
    }

    #[test]
    fn test_events_from_respects_range_and_limit() {
        let store = NullStore::new();
        let mut changes = ChangeSet::new();
        for seq in 1..=5 {
            changes.push(Change::AppendEvent(EventRecord {
                seq,
                at: Timestamp::new(seq),
                event: CenterEvent::Error { code: 0 },
            }));
        }
        store.commit(&changes).unwrap();

        let page = store.events_from(2, 2).unwrap();
        assert_eq!(page.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(store.last_event_seq().unwrap(), 5);
    }
}
