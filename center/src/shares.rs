//! Share records and recursive share visibility.

use std::collections::{BTreeMap, BTreeSet};

use sharecenter_store::{CenterStore, ShareRecord};
use sharecenter_types::{
    AccessLevel, Address, CenterError, CenterEvent, Expiry, GroupId, Lifetime, ShareId, Timestamp,
    Uri,
};

use crate::center::{authorize, Caller, Receipt, ShareCenter};
use crate::graph::require_writer;
use crate::ledger::{LedgerView, Txn};

/// Shares visible to a user, keyed by owning group.
pub type VisibleShares = BTreeMap<GroupId, Vec<ShareRecord>>;

/// Resolve a caller-supplied lifetime against `now`.
pub(crate) fn resolve_expiry(lifetime: Lifetime, now: Timestamp) -> Result<Expiry, CenterError> {
    match (lifetime, lifetime.expiry_from(now)) {
        (_, Some(expiry)) => Ok(expiry),
        (Lifetime::Seconds(secs), None) => Err(CenterError::NonnegativeTime(secs)),
        (Lifetime::Indefinite, None) => Ok(Expiry::Indefinite),
    }
}

/// Stage one share per target group. The caller must be able to write every
/// group; an empty or repeated target list is refused.
pub(crate) fn stage_shares(
    txn: &mut Txn<'_>,
    creator: &Address,
    uri: &Uri,
    groups: &[GroupId],
    access: AccessLevel,
    expiry: Expiry,
) -> Result<Vec<ShareId>, CenterError> {
    if groups.is_empty() {
        return Err(CenterError::GroupNotActive(GroupId::NONE));
    }
    let mut seen = BTreeSet::new();
    for &group in groups {
        if !seen.insert(group) {
            return Err(CenterError::GroupNotActive(group));
        }
        require_writer(txn, creator, group)?;
    }

    let mut ids = Vec::with_capacity(groups.len());
    for &group in groups {
        let id = txn.alloc_share_id();
        txn.put_share(ShareRecord {
            id,
            group,
            uri: uri.clone(),
            access,
            expiry,
            created_by: creator.clone(),
            created_at: txn.now,
        });
        txn.emit(CenterEvent::ShareAdded {
            share: id,
            group,
            uri: uri.clone(),
        });
        ids.push(id);
    }
    Ok(ids)
}

impl<S: CenterStore> ShareCenter<S> {
    /// Create one share of `uri` in each of `groups`, all or nothing.
    pub fn create_share(
        &self,
        caller: &Caller,
        uri: &str,
        groups: &[GroupId],
        lifetime: Lifetime,
        access: AccessLevel,
    ) -> Result<Receipt<Vec<ShareId>>, CenterError> {
        self.mutate("create_share", |txn| {
            let uri = Uri::parse(uri)?;
            let expiry = resolve_expiry(lifetime, txn.now)?;
            authorize(txn, caller)?;
            stage_shares(txn, &caller.user, &uri, groups, access, expiry)
        })
    }

    /// Single-group form of [`ShareCenter::create_share`].
    pub fn add_share(
        &self,
        caller: &Caller,
        uri: &str,
        group: GroupId,
        lifetime: Lifetime,
        access: AccessLevel,
    ) -> Result<Receipt<ShareId>, CenterError> {
        self.mutate("add_share", |txn| {
            let uri = Uri::parse(uri)?;
            let expiry = resolve_expiry(lifetime, txn.now)?;
            authorize(txn, caller)?;
            stage_shares(txn, &caller.user, &uri, &[group], access, expiry)?
                .into_iter()
                .next()
                .ok_or(CenterError::GroupNotActive(group))
        })
    }

    /// Delete a share. Expired shares can still be deleted.
    pub fn delete_share(&self, caller: &Caller, share: ShareId) -> Result<Receipt<()>, CenterError> {
        self.mutate("delete_share", |txn| {
            authorize(txn, caller)?;
            let group = txn
                .share(share)
                .ok_or(CenterError::ShareDoesNotExist(share))?
                .group;
            let can_write = txn.group(group).is_some_and(|g| g.can_write(&caller.user));
            if !can_write {
                return Err(CenterError::DoesNotOwnShare {
                    user: caller.user.clone(),
                    share,
                });
            }
            txn.delete_share(share);
            txn.emit(CenterEvent::ShareDeleted { share, group });
            Ok(())
        })
    }

    /// Physically remove every expired share. Registry owner only.
    pub fn purge_expired(&self, caller: &Address) -> Result<Receipt<Vec<ShareId>>, CenterError> {
        self.mutate("purge_expired", |txn| {
            if caller != txn.owner() {
                return Err(CenterError::NotOwner(caller.clone()));
            }
            let now = txn.now;
            let expired: Vec<(ShareId, GroupId)> = txn
                .base()
                .shares
                .values()
                .filter(|s| s.expiry.is_expired(now))
                .map(|s| (s.id, s.group))
                .collect();
            for &(share, group) in &expired {
                txn.delete_share(share);
                txn.emit(CenterEvent::ShareDeleted { share, group });
            }
            Ok(expired.into_iter().map(|(id, _)| id).collect())
        })
    }

    /// Unexpired shares owned directly by `group`.
    pub fn get_shares(&self, group: GroupId) -> Result<Vec<ShareRecord>, CenterError> {
        let ledger = self.snapshot();
        ledger.require_group(group)?;
        let now = self.now();
        Ok(ledger
            .shares_of(group)
            .filter(|s| s.is_visible(now))
            .cloned()
            .collect())
    }

    /// A share record regardless of expiry.
    pub fn get_share(&self, share: ShareId) -> Result<ShareRecord, CenterError> {
        self.snapshot()
            .shares
            .get(&share)
            .cloned()
            .ok_or(CenterError::ShareDoesNotExist(share))
    }

    /// Every unexpired share `user` can see, keyed by owning group.
    ///
    /// Starts from each group the user owns or belongs to and walks the
    /// ancestor graph with one visited set for the whole call, so each group
    /// and therefore each share is reported once. Groups with nothing
    /// visible are omitted.
    pub fn get_all_shares(&self, user: &Address) -> Result<VisibleShares, CenterError> {
        let ledger = self.snapshot();
        ledger.require_user(user)?;
        let now = self.now();

        let mut visited = BTreeSet::new();
        let mut stack: Vec<GroupId> = ledger.memberships(user).collect();
        let mut out = VisibleShares::new();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(group) = ledger.group(id) else {
                continue;
            };
            let visible: Vec<ShareRecord> = ledger
                .shares_of(id)
                .filter(|s| s.is_visible(now))
                .cloned()
                .collect();
            if !visible.is_empty() {
                out.insert(id, visible);
            }
            stack.extend(group.visible_sources().filter(|s| !visited.contains(s)));
        }
        tracing::debug!(user = %user, groups = out.len(), "resolved visible shares");
        Ok(out)
    }
}
