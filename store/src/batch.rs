//! Change sets: the unit of atomic commit.

use sharecenter_types::{Address, EventRecord, RequestId, ShareId};

use crate::group::GroupRecord;
use crate::meta::LedgerCounters;
use crate::request::RequestRecord;
use crate::share::ShareRecord;
use crate::system::SystemRecord;
use crate::user::UserRecord;

/// One staged write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    PutOwner(Address),
    PutCounters(LedgerCounters),
    PutSystem(SystemRecord),
    PutUser(UserRecord),
    PutGroup(GroupRecord),
    PutShare(ShareRecord),
    DeleteShare(ShareId),
    PutRequest(RequestRecord),
    DeleteRequest(RequestId),
    AppendEvent(EventRecord),
}

/// An ordered list of writes applied all-or-nothing by [`crate::CenterStore::commit`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Events carried by this change set, in append order.
    pub fn events(&self) -> impl Iterator<Item = &EventRecord> {
        self.changes.iter().filter_map(|c| match c {
            Change::AppendEvent(record) => Some(record),
            _ => None,
        })
    }
}

impl Extend<Change> for ChangeSet {
    fn extend<T: IntoIterator<Item = Change>>(&mut self, iter: T) {
        self.changes.extend(iter);
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}
