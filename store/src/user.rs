//! User storage trait.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use sharecenter_types::{Address, GroupId, Timestamp};
use std::collections::BTreeSet;
use std::fmt;

/// A blacklist entry: either a single address or everyone in a group.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Party {
    User(Address),
    Group(GroupId),
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::User(addr) => write!(f, "user {addr}"),
            Party::Group(id) => write!(f, "group {id}"),
        }
    }
}

/// A registered user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub address: Address,
    /// The system that registered this user; only it may act for the user.
    pub system: Address,
    pub personal_group: GroupId,
    /// Parties forbidden from connecting to this user.
    pub blacklist: BTreeSet<Party>,
    /// Addresses exempt from the blacklist.
    pub whitelist: BTreeSet<Address>,
    pub created_at: Timestamp,
}

impl UserRecord {
    pub fn new(address: Address, system: Address, personal_group: GroupId, now: Timestamp) -> Self {
        Self {
            address,
            system,
            personal_group,
            blacklist: BTreeSet::new(),
            whitelist: BTreeSet::new(),
            created_at: now,
        }
    }
}

pub trait UserStore {
    fn get_user(&self, address: &Address) -> Result<Option<UserRecord>, StoreError>;
    fn iter_users(&self) -> Result<Vec<UserRecord>, StoreError>;
}
