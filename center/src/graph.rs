//! The group graph: membership, write delegation, hierarchy edges and
//! share-group grants.
//!
//! A group sees the shares of every group reachable through its `parents`
//! and `share_grantors`. That ancestor relation is kept acyclic: an edge
//! making `child` see `parent` is refused when `child` is already an
//! ancestor of `parent`, or is `parent` itself.

use std::collections::BTreeSet;

use sharecenter_store::{CenterStore, GroupRecord, RequestKind};
use sharecenter_types::{Address, CenterError, CenterEvent, GroupId};

use crate::blocklist::blocked_by;
use crate::center::{authorize, Caller, Receipt, ShareCenter};
use crate::ledger::{LedgerView, Txn};

/// Every group `start` can see through, excluding `start` itself.
///
/// Explicit worklist; the visited set bounds the walk in diamond-shaped
/// graphs.
pub(crate) fn ancestors<V: LedgerView + ?Sized>(view: &V, start: GroupId) -> BTreeSet<GroupId> {
    let mut visited = BTreeSet::new();
    let mut stack: Vec<GroupId> = match view.group(start) {
        Some(group) => group.visible_sources().copied().collect(),
        None => return visited,
    };
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        if let Some(group) = view.group(id) {
            stack.extend(group.visible_sources().filter(|s| !visited.contains(s)));
        }
    }
    visited
}

/// Whether letting `child` see `parent` would close a cycle.
pub(crate) fn would_cycle<V: LedgerView + ?Sized>(view: &V, parent: GroupId, child: GroupId) -> bool {
    parent == child || ancestors(view, parent).contains(&child)
}

pub(crate) fn require_owner<'v, V: LedgerView + ?Sized>(
    view: &'v V,
    user: &Address,
    group: GroupId,
) -> Result<&'v GroupRecord, CenterError> {
    let record = view.require_group(group)?;
    if !record.is_owner(user) {
        return Err(CenterError::NotOwnerOfGroup {
            user: user.clone(),
            group,
        });
    }
    Ok(record)
}

/// Owners and writers may manage a group's shares.
pub(crate) fn require_writer<'v, V: LedgerView + ?Sized>(
    view: &'v V,
    user: &Address,
    group: GroupId,
) -> Result<&'v GroupRecord, CenterError> {
    let record = view.require_group(group)?;
    if !record.can_write(user) {
        return Err(CenterError::NotOwnerOfGroup {
            user: user.clone(),
            group,
        });
    }
    Ok(record)
}

fn group_subject(id: GroupId) -> String {
    format!("group {id}")
}

/// Refuse a hierarchy edge that is missing an endpoint, cyclic or present.
pub(crate) fn check_link(txn: &Txn<'_>, parent: GroupId, child: GroupId) -> Result<(), CenterError> {
    let parent_record = txn.require_group(parent)?;
    txn.require_group(child)?;
    if would_cycle(txn, parent, child) {
        return Err(CenterError::CircularDependency { parent, child });
    }
    if parent_record.subgroups.contains(&child) {
        return Err(CenterError::InGroup {
            group: parent,
            subject: group_subject(child),
        });
    }
    Ok(())
}

/// Stage a checked hierarchy edge, clearing any handshake state for the pair.
///
/// A join or invitation still pending for the pair is settled by the new
/// edge, so its record goes too and it is announced as accepted.
pub(crate) fn link(txn: &mut Txn<'_>, parent: GroupId, child: GroupId) -> Result<(), CenterError> {
    let p = txn.group_mut(parent)?;
    p.subgroups.insert(child);
    p.pending_subgroups.remove(&child);
    let c = txn.group_mut(child)?;
    c.parents.insert(parent);
    c.pending_parents.remove(&parent);
    txn.emit(CenterEvent::GroupLinked { parent, child });

    for kind in [
        RequestKind::Join { child, parent },
        RequestKind::Invite { parent, child },
    ] {
        if let Some(settled) = txn.find_request(|r| r.kind == kind) {
            txn.delete_request(settled);
            txn.emit(CenterEvent::RequestAccepted {
                request: settled,
                kind: kind.request_type(),
            });
        }
    }
    Ok(())
}

impl<S: CenterStore> ShareCenter<S> {
    // ── Groups and members ──────────────────────────────────────────────

    pub fn create_group(&self, caller: &Caller) -> Result<Receipt<GroupId>, CenterError> {
        self.mutate("create_group", |txn| {
            authorize(txn, caller)?;
            let group = txn.alloc_group_id();
            txn.put_group(GroupRecord::new(group, caller.user.clone(), false, txn.now));
            txn.emit(CenterEvent::GroupCreated {
                group,
                owner: caller.user.clone(),
            });
            Ok(group)
        })
    }

    /// Add `user` as a reader of `group`.
    ///
    /// Returns `false`, with nothing committed, if `user` has blacklisted the
    /// caller or the group.
    pub fn add_user_to_group(
        &self,
        caller: &Caller,
        group: GroupId,
        user: &Address,
    ) -> Result<Receipt<bool>, CenterError> {
        self.mutate("add_user_to_group", |txn| {
            authorize(txn, caller)?;
            let record = require_owner(txn, &caller.user, group)?;
            txn.require_user(user)?;
            if record.includes(user) {
                return Err(CenterError::InGroup {
                    group,
                    subject: user.to_string(),
                });
            }
            if blocked_by(txn, user, &caller.user, Some(group)) {
                self.note_blocked("add_user_to_group", &caller.user, user);
                return Ok(false);
            }
            txn.group_mut(group)?.members.insert(user.clone());
            txn.emit(CenterEvent::ReaderAdded {
                group,
                user: user.clone(),
            });
            Ok(true)
        })
    }

    /// Remove `user` from `group`, revoking write delegation too.
    pub fn remove_user_from_group(
        &self,
        caller: &Caller,
        group: GroupId,
        user: &Address,
    ) -> Result<Receipt<()>, CenterError> {
        self.mutate("remove_user_from_group", |txn| {
            authorize(txn, caller)?;
            let record = require_owner(txn, &caller.user, group)?;
            txn.require_user(user)?;
            if !record.members.contains(user) {
                return Err(CenterError::NotInGroup {
                    group,
                    subject: user.to_string(),
                });
            }
            let record = txn.group_mut(group)?;
            record.members.remove(user);
            let was_writer = record.writers.remove(user);
            if was_writer {
                txn.emit(CenterEvent::WriterRevoked {
                    group,
                    user: user.clone(),
                });
            }
            txn.emit(CenterEvent::ReaderRevoked {
                group,
                user: user.clone(),
            });
            Ok(())
        })
    }

    /// Delegate share management in `group` to `user`, adding them as a
    /// member first if needed.
    ///
    /// Returns `false`, with nothing committed, if `user` is not yet a
    /// member and has blacklisted the caller or the group.
    pub fn add_writer(
        &self,
        caller: &Caller,
        group: GroupId,
        user: &Address,
    ) -> Result<Receipt<bool>, CenterError> {
        self.mutate("add_writer", |txn| {
            authorize(txn, caller)?;
            let record = require_owner(txn, &caller.user, group)?;
            txn.require_user(user)?;
            if record.can_write(user) {
                return Err(CenterError::InGroup {
                    group,
                    subject: format!("writer {user}"),
                });
            }
            let is_member = record.members.contains(user);
            if !is_member && blocked_by(txn, user, &caller.user, Some(group)) {
                self.note_blocked("add_writer", &caller.user, user);
                return Ok(false);
            }
            let record = txn.group_mut(group)?;
            record.members.insert(user.clone());
            record.writers.insert(user.clone());
            if !is_member {
                txn.emit(CenterEvent::ReaderAdded {
                    group,
                    user: user.clone(),
                });
            }
            txn.emit(CenterEvent::WriterAdded {
                group,
                user: user.clone(),
            });
            Ok(true)
        })
    }

    /// Withdraw write delegation; `user` stays a reader.
    pub fn revoke_writer(
        &self,
        caller: &Caller,
        group: GroupId,
        user: &Address,
    ) -> Result<Receipt<()>, CenterError> {
        self.mutate("revoke_writer", |txn| {
            authorize(txn, caller)?;
            let record = require_owner(txn, &caller.user, group)?;
            if !record.writers.contains(user) {
                return Err(CenterError::NotInGroup {
                    group,
                    subject: format!("writer {user}"),
                });
            }
            txn.group_mut(group)?.writers.remove(user);
            txn.emit(CenterEvent::WriterRevoked {
                group,
                user: user.clone(),
            });
            Ok(())
        })
    }

    // ── Hierarchy edges ─────────────────────────────────────────────────

    /// Make `child` a subgroup of `parent` directly. The caller must own both.
    pub fn add_group_to_group(
        &self,
        caller: &Caller,
        parent: GroupId,
        child: GroupId,
    ) -> Result<Receipt<()>, CenterError> {
        self.mutate("add_group_to_group", |txn| {
            authorize(txn, caller)?;
            require_owner(txn, &caller.user, parent)?;
            require_owner(txn, &caller.user, child)?;
            check_link(txn, parent, child)?;
            link(txn, parent, child)
        })
    }

    /// Remove a hierarchy edge. Either endpoint's owner may do this.
    pub fn remove_group_from_group(
        &self,
        caller: &Caller,
        parent: GroupId,
        child: GroupId,
    ) -> Result<Receipt<()>, CenterError> {
        self.mutate("remove_group_from_group", |txn| {
            authorize(txn, caller)?;
            let parent_record = txn.require_group(parent)?;
            let child_record = txn.require_group(child)?;
            if !parent_record.is_owner(&caller.user) && !child_record.is_owner(&caller.user) {
                return Err(CenterError::NotOwnerOfGroup {
                    user: caller.user.clone(),
                    group: parent,
                });
            }
            if !parent_record.subgroups.contains(&child) {
                return Err(CenterError::NotInGroup {
                    group: parent,
                    subject: group_subject(child),
                });
            }
            txn.group_mut(parent)?.subgroups.remove(&child);
            txn.group_mut(child)?.parents.remove(&parent);
            txn.emit(CenterEvent::GroupUnlinked { parent, child });
            Ok(())
        })
    }

    // ── Share-group grants ──────────────────────────────────────────────

    /// Let `peer` see the shares of `group` (and, through it, of `group`'s
    /// ancestors) without transferring ownership.
    ///
    /// Returns `false`, with nothing committed, if `peer`'s owner has
    /// blacklisted the caller or `group`.
    pub fn add_share_group(
        &self,
        caller: &Caller,
        group: GroupId,
        peer: GroupId,
    ) -> Result<Receipt<bool>, CenterError> {
        self.mutate("add_share_group", |txn| {
            authorize(txn, caller)?;
            let record = require_owner(txn, &caller.user, group)?;
            let peer_owner = txn.require_group(peer)?.owner.clone();
            if would_cycle(txn, group, peer) {
                return Err(CenterError::CircularDependency {
                    parent: group,
                    child: peer,
                });
            }
            if record.share_grantees.contains(&peer) {
                return Err(CenterError::InGroup {
                    group: peer,
                    subject: format!("share group {group}"),
                });
            }
            if blocked_by(txn, &peer_owner, &caller.user, Some(group)) {
                self.note_blocked("add_share_group", &caller.user, &peer_owner);
                return Ok(false);
            }
            txn.group_mut(group)?.share_grantees.insert(peer);
            txn.group_mut(peer)?.share_grantors.insert(group);
            txn.emit(CenterEvent::ShareGroupAdded { group, peer });
            Ok(true)
        })
    }

    /// Withdraw a share-group grant. Either side's owner may do this.
    pub fn remove_share_group(
        &self,
        caller: &Caller,
        group: GroupId,
        peer: GroupId,
    ) -> Result<Receipt<()>, CenterError> {
        self.mutate("remove_share_group", |txn| {
            authorize(txn, caller)?;
            let record = txn.require_group(group)?;
            let peer_record = txn.require_group(peer)?;
            if !record.is_owner(&caller.user) && !peer_record.is_owner(&caller.user) {
                return Err(CenterError::NotOwnerOfGroup {
                    user: caller.user.clone(),
                    group,
                });
            }
            if !record.share_grantees.contains(&peer) {
                return Err(CenterError::NotInGroup {
                    group: peer,
                    subject: format!("share group {group}"),
                });
            }
            txn.group_mut(group)?.share_grantees.remove(&peer);
            txn.group_mut(peer)?.share_grantors.remove(&group);
            txn.emit(CenterEvent::ShareGroupRemoved { group, peer });
            Ok(())
        })
    }

    // ── Reads ───────────────────────────────────────────────────────────

    /// Personal, owned and member groups of `user`.
    pub fn get_group_ids(&self, user: &Address) -> Result<Vec<GroupId>, CenterError> {
        let ledger = self.snapshot();
        ledger.require_user(user)?;
        Ok(ledger.memberships(user).collect())
    }

    pub fn get_group(&self, group: GroupId) -> Result<GroupRecord, CenterError> {
        self.snapshot().require_group(group).cloned()
    }

    pub fn get_sub_groups(&self, group: GroupId) -> Result<Vec<GroupId>, CenterError> {
        self.read_group(group, |g| g.subgroups.iter().copied().collect())
    }

    pub fn get_parent_groups(&self, group: GroupId) -> Result<Vec<GroupId>, CenterError> {
        self.read_group(group, |g| g.parents.iter().copied().collect())
    }

    /// Share-group peers on either side of a grant.
    pub fn get_share_groups(&self, group: GroupId) -> Result<Vec<GroupId>, CenterError> {
        self.read_group(group, |g| g.share_groups().into_iter().collect())
    }

    /// Readers of `group`, writers included. The owner is not listed.
    pub fn get_group_members(&self, group: GroupId) -> Result<Vec<Address>, CenterError> {
        self.read_group(group, |g| g.members.iter().cloned().collect())
    }

    pub fn get_pending_parents(&self, group: GroupId) -> Result<Vec<GroupId>, CenterError> {
        self.read_group(group, |g| g.pending_parents.iter().copied().collect())
    }

    pub fn get_pending_subgroups(&self, group: GroupId) -> Result<Vec<GroupId>, CenterError> {
        self.read_group(group, |g| g.pending_subgroups.iter().copied().collect())
    }

    /// Every group whose shares `group` can see.
    pub fn get_ancestors(&self, group: GroupId) -> Result<Vec<GroupId>, CenterError> {
        let ledger = self.snapshot();
        ledger.require_group(group)?;
        Ok(ancestors(ledger.as_ref(), group).into_iter().collect())
    }

    fn read_group<T>(
        &self,
        group: GroupId,
        f: impl FnOnce(&GroupRecord) -> T,
    ) -> Result<T, CenterError> {
        let ledger = self.snapshot();
        let record = ledger.require_group(group)?;
        tracing::trace!(group = %group, "group read");
        Ok(f(record))
    }
}
