//! In-memory ledger snapshot and the transaction overlay mutations stage into.
//!
//! A [`Ledger`] is an immutable-by-convention snapshot shared behind an `Arc`.
//! Mutations never touch it directly: they stage into a [`Txn`], which reads
//! through to the base snapshot and records copies of everything it changes.
//! Once the store has durably committed the resulting [`ChangeSet`], the same
//! change set is applied to the published ledger with [`Ledger::apply`].

use std::collections::{BTreeMap, BTreeSet};

use sharecenter_store::{
    CenterStore, Change, ChangeSet, GroupRecord, LedgerCounters, RequestRecord, ShareRecord,
    StoreError, SystemRecord, UserRecord,
};
use sharecenter_types::{Address, CenterError, CenterEvent, GroupId, RequestId, ShareId, Timestamp};

/// Read access shared by the published ledger and a staging transaction.
pub(crate) trait LedgerView {
    fn group(&self, id: GroupId) -> Option<&GroupRecord>;
    fn user(&self, address: &Address) -> Option<&UserRecord>;

    fn require_group(&self, id: GroupId) -> Result<&GroupRecord, CenterError> {
        self.group(id).ok_or(CenterError::GroupNotActive(id))
    }

    fn require_user(&self, address: &Address) -> Result<&UserRecord, CenterError> {
        self.user(address)
            .ok_or_else(|| CenterError::NotAUser(address.clone()))
    }
}

#[derive(Clone, Debug)]
pub struct Ledger {
    pub(crate) owner: Address,
    pub(crate) counters: LedgerCounters,
    pub(crate) systems: BTreeMap<Address, SystemRecord>,
    pub(crate) users: BTreeMap<Address, UserRecord>,
    pub(crate) groups: BTreeMap<GroupId, GroupRecord>,
    pub(crate) shares: BTreeMap<ShareId, ShareRecord>,
    pub(crate) requests: BTreeMap<RequestId, RequestRecord>,
    /// Address -> groups it owns or is a member of.
    memberships: BTreeMap<Address, BTreeSet<GroupId>>,
    /// Group -> shares it owns.
    shares_by_group: BTreeMap<GroupId, BTreeSet<ShareId>>,
}

impl Ledger {
    pub(crate) fn empty(owner: Address) -> Self {
        Self {
            owner,
            counters: LedgerCounters::default(),
            systems: BTreeMap::new(),
            users: BTreeMap::new(),
            groups: BTreeMap::new(),
            shares: BTreeMap::new(),
            requests: BTreeMap::new(),
            memberships: BTreeMap::new(),
            shares_by_group: BTreeMap::new(),
        }
    }

    /// Read every table from the store and rebuild the derived indexes.
    pub(crate) fn load<S: CenterStore>(store: &S, owner: Address) -> Result<Self, StoreError> {
        let mut ledger = Self::empty(owner);
        ledger.counters = store.get_counters()?.unwrap_or_default();
        for system in store.iter_systems()? {
            ledger.systems.insert(system.address.clone(), system);
        }
        for user in store.iter_users()? {
            ledger.users.insert(user.address.clone(), user);
        }
        for group in store.iter_groups()? {
            ledger.index_group(&group);
            ledger.groups.insert(group.id, group);
        }
        for share in store.iter_shares()? {
            ledger
                .shares_by_group
                .entry(share.group)
                .or_default()
                .insert(share.id);
            ledger.shares.insert(share.id, share);
        }
        for request in store.iter_requests()? {
            ledger.requests.insert(request.id, request);
        }
        Ok(ledger)
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn counters(&self) -> LedgerCounters {
        self.counters
    }

    /// Groups `address` owns or is a member of (personal group included).
    pub(crate) fn memberships(&self, address: &Address) -> impl Iterator<Item = GroupId> + '_ {
        self.memberships
            .get(address)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub(crate) fn shares_of(&self, group: GroupId) -> impl Iterator<Item = &ShareRecord> + '_ {
        self.shares_by_group
            .get(&group)
            .into_iter()
            .flat_map(|set| set.iter())
            .filter_map(|id| self.shares.get(id))
    }

    /// Apply a committed change set.
    pub(crate) fn apply(&mut self, changes: &ChangeSet) {
        for change in changes.iter() {
            match change {
                Change::PutOwner(owner) => self.owner = owner.clone(),
                Change::PutCounters(counters) => self.counters = *counters,
                Change::PutSystem(record) => {
                    self.systems.insert(record.address.clone(), record.clone());
                }
                Change::PutUser(record) => {
                    self.users.insert(record.address.clone(), record.clone());
                }
                Change::PutGroup(record) => {
                    if let Some(old) = self.groups.remove(&record.id) {
                        self.unindex_group(&old);
                    }
                    self.index_group(record);
                    self.groups.insert(record.id, record.clone());
                }
                Change::PutShare(record) => {
                    if let Some(old) = self.shares.insert(record.id, record.clone()) {
                        self.unindex_share(old.group, old.id);
                    }
                    self.shares_by_group
                        .entry(record.group)
                        .or_default()
                        .insert(record.id);
                }
                Change::DeleteShare(id) => {
                    if let Some(old) = self.shares.remove(id) {
                        self.unindex_share(old.group, old.id);
                    }
                }
                Change::PutRequest(record) => {
                    self.requests.insert(record.id, record.clone());
                }
                Change::DeleteRequest(id) => {
                    self.requests.remove(id);
                }
                Change::AppendEvent(_) => {}
            }
        }
    }

    fn index_group(&mut self, group: &GroupRecord) {
        for address in std::iter::once(&group.owner).chain(group.members.iter()) {
            self.memberships
                .entry(address.clone())
                .or_default()
                .insert(group.id);
        }
    }

    fn unindex_group(&mut self, group: &GroupRecord) {
        for address in std::iter::once(&group.owner).chain(group.members.iter()) {
            if let Some(set) = self.memberships.get_mut(address) {
                set.remove(&group.id);
                if set.is_empty() {
                    self.memberships.remove(address);
                }
            }
        }
    }

    fn unindex_share(&mut self, group: GroupId, id: ShareId) {
        if let Some(set) = self.shares_by_group.get_mut(&group) {
            set.remove(&id);
            if set.is_empty() {
                self.shares_by_group.remove(&group);
            }
        }
    }
}

impl LedgerView for Ledger {
    fn group(&self, id: GroupId) -> Option<&GroupRecord> {
        self.groups.get(&id)
    }

    fn user(&self, address: &Address) -> Option<&UserRecord> {
        self.users.get(address)
    }
}

/// Staged, uncommitted changes layered over a base snapshot.
///
/// Groups, users and systems are never deleted, so their overlays hold plain
/// records. Shares and requests can be deleted; `None` marks a tombstone.
pub(crate) struct Txn<'a> {
    base: &'a Ledger,
    pub(crate) now: Timestamp,
    counters: LedgerCounters,
    systems: BTreeMap<Address, SystemRecord>,
    users: BTreeMap<Address, UserRecord>,
    groups: BTreeMap<GroupId, GroupRecord>,
    shares: BTreeMap<ShareId, Option<ShareRecord>>,
    requests: BTreeMap<RequestId, Option<RequestRecord>>,
    events: Vec<CenterEvent>,
}

/// What a finished transaction hands to the commit path.
pub(crate) struct Staged {
    pub(crate) changes: ChangeSet,
    pub(crate) counters: LedgerCounters,
    pub(crate) events: Vec<CenterEvent>,
}

impl<'a> Txn<'a> {
    pub(crate) fn new(base: &'a Ledger, now: Timestamp) -> Self {
        Self {
            base,
            now,
            counters: base.counters,
            systems: BTreeMap::new(),
            users: BTreeMap::new(),
            groups: BTreeMap::new(),
            shares: BTreeMap::new(),
            requests: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    pub(crate) fn base(&self) -> &'a Ledger {
        self.base
    }

    pub(crate) fn owner(&self) -> &'a Address {
        &self.base.owner
    }

    pub(crate) fn emit(&mut self, event: CenterEvent) {
        self.events.push(event);
    }

    // ── Systems and users ───────────────────────────────────────────────

    pub(crate) fn system(&self, address: &Address) -> Option<&SystemRecord> {
        self.systems
            .get(address)
            .or_else(|| self.base.systems.get(address))
    }

    pub(crate) fn put_system(&mut self, record: SystemRecord) {
        self.systems.insert(record.address.clone(), record);
    }

    pub(crate) fn put_user(&mut self, record: UserRecord) {
        self.users.insert(record.address.clone(), record);
    }

    pub(crate) fn user_mut(&mut self, address: &Address) -> Result<&mut UserRecord, CenterError> {
        if !self.users.contains_key(address) {
            let record = self
                .base
                .users
                .get(address)
                .cloned()
                .ok_or_else(|| CenterError::NotAUser(address.clone()))?;
            self.users.insert(address.clone(), record);
        }
        self.users
            .get_mut(address)
            .ok_or_else(|| CenterError::NotAUser(address.clone()))
    }

    // ── Groups ──────────────────────────────────────────────────────────

    pub(crate) fn put_group(&mut self, record: GroupRecord) {
        self.groups.insert(record.id, record);
    }

    pub(crate) fn group_mut(&mut self, id: GroupId) -> Result<&mut GroupRecord, CenterError> {
        if !self.groups.contains_key(&id) {
            let record = self
                .base
                .groups
                .get(&id)
                .cloned()
                .ok_or(CenterError::GroupNotActive(id))?;
            self.groups.insert(id, record);
        }
        self.groups
            .get_mut(&id)
            .ok_or(CenterError::GroupNotActive(id))
    }

    pub(crate) fn alloc_group_id(&mut self) -> GroupId {
        let id = self.counters.next_group;
        self.counters.next_group = id.next();
        id
    }

    // ── Shares ──────────────────────────────────────────────────────────

    pub(crate) fn share(&self, id: ShareId) -> Option<&ShareRecord> {
        match self.shares.get(&id) {
            Some(staged) => staged.as_ref(),
            None => self.base.shares.get(&id),
        }
    }

    pub(crate) fn put_share(&mut self, record: ShareRecord) {
        self.shares.insert(record.id, Some(record));
    }

    pub(crate) fn delete_share(&mut self, id: ShareId) {
        self.shares.insert(id, None);
    }

    pub(crate) fn alloc_share_id(&mut self) -> ShareId {
        let id = self.counters.next_share;
        self.counters.next_share = id.next();
        id
    }

    // ── Requests ────────────────────────────────────────────────────────

    pub(crate) fn request(&self, id: RequestId) -> Option<&RequestRecord> {
        match self.requests.get(&id) {
            Some(staged) => staged.as_ref(),
            None => self.base.requests.get(&id),
        }
    }

    /// First live request matching `pred`, staged or committed.
    pub(crate) fn find_request(
        &self,
        pred: impl Fn(&RequestRecord) -> bool,
    ) -> Option<RequestId> {
        let staged = self
            .requests
            .values()
            .flatten()
            .find(|r| pred(r))
            .map(|r| r.id);
        staged.or_else(|| {
            self.base
                .requests
                .values()
                .filter(|r| !self.requests.contains_key(&r.id))
                .find(|r| pred(r))
                .map(|r| r.id)
        })
    }

    pub(crate) fn put_request(&mut self, record: RequestRecord) {
        self.requests.insert(record.id, Some(record));
    }

    pub(crate) fn delete_request(&mut self, id: RequestId) {
        self.requests.insert(id, None);
    }

    pub(crate) fn alloc_request_id(&mut self) -> RequestId {
        let id = self.counters.next_request;
        self.counters.next_request = id.next();
        id
    }

    /// Turn the overlay into a change set. Events are returned unsequenced.
    pub(crate) fn finish(self) -> Staged {
        let mut changes = ChangeSet::new();
        changes.extend(self.systems.into_values().map(Change::PutSystem));
        changes.extend(self.users.into_values().map(Change::PutUser));
        changes.extend(self.groups.into_values().map(Change::PutGroup));
        for (id, share) in self.shares {
            changes.push(match share {
                Some(record) => Change::PutShare(record),
                None => Change::DeleteShare(id),
            });
        }
        for (id, request) in self.requests {
            changes.push(match request {
                Some(record) => Change::PutRequest(record),
                None => Change::DeleteRequest(id),
            });
        }
        Staged {
            changes,
            counters: self.counters,
            events: self.events,
        }
    }
}

impl LedgerView for Txn<'_> {
    fn group(&self, id: GroupId) -> Option<&GroupRecord> {
        self.groups.get(&id).or_else(|| self.base.groups.get(&id))
    }

    fn user(&self, address: &Address) -> Option<&UserRecord> {
        self.users
            .get(address)
            .or_else(|| self.base.users.get(address))
    }
}
