//! Group storage trait.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use sharecenter_types::{Address, GroupId, Timestamp};
use std::collections::BTreeSet;

/// A node of the sharing graph.
///
/// Edge sets are stored on both endpoints: `parents`/`subgroups` for
/// hierarchy edges and `share_grantors`/`share_grantees` for peer share-group
/// grants. A group sees the shares of everything reachable through `parents`
/// and `share_grantors`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: GroupId,
    pub owner: Address,
    /// Created implicitly at user registration.
    pub personal: bool,
    /// Readers.
    pub members: BTreeSet<Address>,
    /// Members with write delegation (always a subset of `members`).
    pub writers: BTreeSet<Address>,
    pub parents: BTreeSet<GroupId>,
    pub subgroups: BTreeSet<GroupId>,
    /// Groups that granted this group visibility into their shares.
    pub share_grantors: BTreeSet<GroupId>,
    /// Groups this group granted visibility into its shares.
    pub share_grantees: BTreeSet<GroupId>,
    /// Parents that invited this group and await its acceptance.
    pub pending_parents: BTreeSet<GroupId>,
    /// Children that asked to join this group and await its acceptance.
    pub pending_subgroups: BTreeSet<GroupId>,
    pub created_at: Timestamp,
}

impl GroupRecord {
    pub fn new(id: GroupId, owner: Address, personal: bool, now: Timestamp) -> Self {
        Self {
            id,
            owner,
            personal,
            members: BTreeSet::new(),
            writers: BTreeSet::new(),
            parents: BTreeSet::new(),
            subgroups: BTreeSet::new(),
            share_grantors: BTreeSet::new(),
            share_grantees: BTreeSet::new(),
            pending_parents: BTreeSet::new(),
            pending_subgroups: BTreeSet::new(),
            created_at: now,
        }
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        &self.owner == address
    }

    /// Owners and writers may add and delete shares.
    pub fn can_write(&self, address: &Address) -> bool {
        self.is_owner(address) || self.writers.contains(address)
    }

    /// Whether `address` belongs to this group in any role.
    pub fn includes(&self, address: &Address) -> bool {
        self.is_owner(address) || self.members.contains(address)
    }

    /// Direct ancestors: hierarchy parents plus share-group grantors.
    pub fn visible_sources(&self) -> impl Iterator<Item = &GroupId> {
        self.parents.iter().chain(self.share_grantors.iter())
    }

    /// Share-group peers on either side of the grant.
    pub fn share_groups(&self) -> BTreeSet<GroupId> {
        self.share_grantors
            .union(&self.share_grantees)
            .copied()
            .collect()
    }
}

pub trait GroupStore {
    fn get_group(&self, id: GroupId) -> Result<Option<GroupRecord>, StoreError>;
    fn iter_groups(&self) -> Result<Vec<GroupRecord>, StoreError>;
}
