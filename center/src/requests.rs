//! Two-party handshakes: join requests, invitations and share offers.
//!
//! A proposal records a pending request; the counterpart accepts or rejects
//! it and the proposer may withdraw it. Accepting re-checks the graph,
//! performs the effect and removes the request in one commit. Requests never
//! expire.

use serde::Serialize;
use sharecenter_store::{CenterStore, RequestKind, RequestRecord};
use sharecenter_types::{
    AccessLevel, Address, CenterError, CenterEvent, GroupId, Lifetime, RequestId, RequestType,
    ShareId, Uri,
};

use crate::blocklist::blocked_by;
use crate::center::{authorize, Caller, Receipt, ShareCenter};
use crate::graph::{check_link, link, require_owner, require_writer};
use crate::ledger::{LedgerView, Txn};
use crate::shares::{resolve_expiry, stage_shares};

/// Outcome of [`ShareCenter::accept_request`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Accepted {
    Linked { parent: GroupId, child: GroupId },
    Shares(Vec<ShareId>),
}

/// The user expected to accept or reject a request.
fn counterpart<V: LedgerView + ?Sized>(view: &V, kind: &RequestKind) -> Option<Address> {
    match kind {
        RequestKind::Join { parent, .. } => view.group(*parent).map(|g| g.owner.clone()),
        RequestKind::Invite { child, .. } => view.group(*child).map(|g| g.owner.clone()),
        RequestKind::Share { to_user, .. } => Some(to_user.clone()),
    }
}

/// The group a request was proposed from.
fn proposing_group(kind: &RequestKind) -> GroupId {
    match kind {
        RequestKind::Join { child, .. } => *child,
        RequestKind::Invite { parent, .. } => *parent,
        RequestKind::Share { from_group, .. } => *from_group,
    }
}

fn propose(txn: &mut Txn<'_>, proposer: &Address, kind: RequestKind) -> RequestId {
    let id = txn.alloc_request_id();
    let request_type = kind.request_type();
    txn.put_request(RequestRecord {
        id,
        proposer: proposer.clone(),
        kind,
        created_at: txn.now,
    });
    txn.emit(CenterEvent::RequestProposed {
        request: id,
        kind: request_type,
        proposer: proposer.clone(),
    });
    id
}

/// Delete a request and the pending-set entry that mirrors it.
fn remove_request(txn: &mut Txn<'_>, id: RequestId, kind: &RequestKind) -> Result<(), CenterError> {
    match kind {
        RequestKind::Join { child, parent } => {
            txn.group_mut(*parent)?.pending_subgroups.remove(child);
        }
        RequestKind::Invite { parent, child } => {
            txn.group_mut(*child)?.pending_parents.remove(parent);
        }
        RequestKind::Share { .. } => {}
    }
    txn.delete_request(id);
    Ok(())
}

fn load_request(txn: &Txn<'_>, id: RequestId) -> Result<RequestRecord, CenterError> {
    txn.request(id)
        .cloned()
        .ok_or(CenterError::RequestDoesNotExist(id))
}

fn stage_accept_join(
    txn: &mut Txn<'_>,
    caller: &Caller,
    target: GroupId,
    id: RequestId,
) -> Result<(GroupId, GroupId), CenterError> {
    let (child, parent) = match txn.request(id).map(|r| &r.kind) {
        Some(RequestKind::Join { child, parent }) => (*child, *parent),
        _ => {
            return Err(CenterError::NoPendingSubgroup {
                group: target,
                request: id,
            })
        }
    };
    if parent != target {
        return Err(CenterError::RequestGroupMismatch {
            request: id,
            expected: parent,
            actual: target,
        });
    }
    require_owner(txn, &caller.user, parent)?;
    check_link(txn, parent, child)?;
    remove_request(txn, id, &RequestKind::Join { child, parent })?;
    txn.emit(CenterEvent::RequestAccepted {
        request: id,
        kind: RequestType::Join,
    });
    link(txn, parent, child)?;
    Ok((parent, child))
}

fn stage_accept_invite(
    txn: &mut Txn<'_>,
    caller: &Caller,
    target: GroupId,
    id: RequestId,
) -> Result<(GroupId, GroupId), CenterError> {
    let (parent, child) = match txn.request(id).map(|r| &r.kind) {
        Some(RequestKind::Invite { parent, child }) => (*parent, *child),
        _ => {
            return Err(CenterError::NoPendingParent {
                group: target,
                request: id,
            })
        }
    };
    if child != target {
        return Err(CenterError::RequestGroupMismatch {
            request: id,
            expected: child,
            actual: target,
        });
    }
    require_owner(txn, &caller.user, child)?;
    check_link(txn, parent, child)?;
    remove_request(txn, id, &RequestKind::Invite { parent, child })?;
    txn.emit(CenterEvent::RequestAccepted {
        request: id,
        kind: RequestType::Invite,
    });
    link(txn, parent, child)?;
    Ok((parent, child))
}

fn stage_accept_share(
    txn: &mut Txn<'_>,
    caller: &Caller,
    id: RequestId,
    groups: &[GroupId],
) -> Result<Vec<ShareId>, CenterError> {
    let request = load_request(txn, id)?;
    let RequestKind::Share {
        to_user,
        uri,
        access,
        expiry,
        ..
    } = &request.kind
    else {
        return Err(CenterError::RequestDoesNotExist(id));
    };
    if to_user != &caller.user {
        return Err(CenterError::NotAUser(caller.user.clone()));
    }
    let personal;
    let targets = if groups.is_empty() {
        personal = [txn.require_user(&caller.user)?.personal_group];
        &personal[..]
    } else {
        groups
    };
    remove_request(txn, id, &request.kind)?;
    txn.emit(CenterEvent::RequestAccepted {
        request: id,
        kind: RequestType::Share,
    });
    stage_shares(txn, &caller.user, uri, targets, *access, *expiry)
}

impl<S: CenterStore> ShareCenter<S> {
    // ── Proposals ───────────────────────────────────────────────────────

    /// Ask for `child` to become a subgroup of `parent`.
    ///
    /// Returns the pending request id, the existing id for a duplicate, or
    /// `None` if `parent`'s owner blocks the caller.
    pub fn request_join(
        &self,
        caller: &Caller,
        child: GroupId,
        parent: GroupId,
    ) -> Result<Receipt<Option<RequestId>>, CenterError> {
        self.mutate("request_join", |txn| {
            authorize(txn, caller)?;
            require_owner(txn, &caller.user, child)?;
            let parent_owner = txn.require_group(parent)?.owner.clone();
            check_link(txn, parent, child)?;
            if blocked_by(txn, &parent_owner, &caller.user, Some(child)) {
                self.note_blocked("request_join", &caller.user, &parent_owner);
                return Ok(None);
            }
            let kind = RequestKind::Join { child, parent };
            if let Some(existing) = txn.find_request(|r| r.kind == kind) {
                return Ok(Some(existing));
            }
            let id = propose(txn, &caller.user, kind);
            txn.group_mut(parent)?.pending_subgroups.insert(child);
            Ok(Some(id))
        })
    }

    /// Invite `child` to become a subgroup of `parent`.
    ///
    /// Returns the pending request id, the existing id for a duplicate, or
    /// `None` if `child`'s owner blocks the caller.
    pub fn invite_group(
        &self,
        caller: &Caller,
        parent: GroupId,
        child: GroupId,
    ) -> Result<Receipt<Option<RequestId>>, CenterError> {
        self.mutate("invite_group", |txn| {
            authorize(txn, caller)?;
            require_owner(txn, &caller.user, parent)?;
            let child_owner = txn.require_group(child)?.owner.clone();
            check_link(txn, parent, child)?;
            if blocked_by(txn, &child_owner, &caller.user, Some(parent)) {
                self.note_blocked("invite_group", &caller.user, &child_owner);
                return Ok(None);
            }
            let kind = RequestKind::Invite { parent, child };
            if let Some(existing) = txn.find_request(|r| r.kind == kind) {
                return Ok(Some(existing));
            }
            let id = propose(txn, &caller.user, kind);
            txn.group_mut(child)?.pending_parents.insert(parent);
            Ok(Some(id))
        })
    }

    /// Offer a share of `uri` from `from_group` to `to_user`. The expiry is
    /// fixed now, not when the offer is accepted.
    pub fn request_share(
        &self,
        caller: &Caller,
        from_group: GroupId,
        to_user: &Address,
        uri: &str,
        lifetime: Lifetime,
        access: AccessLevel,
    ) -> Result<Receipt<Option<RequestId>>, CenterError> {
        self.mutate("request_share", |txn| {
            let uri = Uri::parse(uri)?;
            let expiry = resolve_expiry(lifetime, txn.now)?;
            authorize(txn, caller)?;
            require_writer(txn, &caller.user, from_group)?;
            txn.require_user(to_user)?;
            if blocked_by(txn, to_user, &caller.user, Some(from_group)) {
                self.note_blocked("request_share", &caller.user, to_user);
                return Ok(None);
            }
            let kind = RequestKind::Share {
                from_group,
                to_user: to_user.clone(),
                uri,
                access,
                expiry,
            };
            Ok(Some(propose(txn, &caller.user, kind)))
        })
    }

    // ── Responses ───────────────────────────────────────────────────────

    /// Accept a join request targeting `parent`.
    pub fn accept_subgroup(
        &self,
        caller: &Caller,
        parent: GroupId,
        request: RequestId,
    ) -> Result<Receipt<()>, CenterError> {
        self.mutate("accept_subgroup", |txn| {
            authorize(txn, caller)?;
            stage_accept_join(txn, caller, parent, request).map(|_| ())
        })
    }

    /// Accept an invitation targeting `child`.
    pub fn accept_parent_group(
        &self,
        caller: &Caller,
        child: GroupId,
        request: RequestId,
    ) -> Result<Receipt<()>, CenterError> {
        self.mutate("accept_parent_group", |txn| {
            authorize(txn, caller)?;
            stage_accept_invite(txn, caller, child, request).map(|_| ())
        })
    }

    /// Accept a share offer into `groups`, or the caller's personal group
    /// when `groups` is empty.
    pub fn accept_share_request(
        &self,
        caller: &Caller,
        request: RequestId,
        groups: &[GroupId],
    ) -> Result<Receipt<Vec<ShareId>>, CenterError> {
        self.mutate("accept_share_request", |txn| {
            authorize(txn, caller)?;
            stage_accept_share(txn, caller, request, groups)
        })
    }

    /// Accept any request addressed to the caller.
    pub fn accept_request(
        &self,
        caller: &Caller,
        request: RequestId,
    ) -> Result<Receipt<Accepted>, CenterError> {
        self.mutate("accept_request", |txn| {
            authorize(txn, caller)?;
            match load_request(txn, request)?.kind {
                RequestKind::Join { parent, .. } => {
                    let (parent, child) = stage_accept_join(txn, caller, parent, request)?;
                    Ok(Accepted::Linked { parent, child })
                }
                RequestKind::Invite { child, .. } => {
                    let (parent, child) = stage_accept_invite(txn, caller, child, request)?;
                    Ok(Accepted::Linked { parent, child })
                }
                RequestKind::Share { .. } => {
                    stage_accept_share(txn, caller, request, &[]).map(Accepted::Shares)
                }
            }
        })
    }

    /// Decline a request addressed to the caller.
    pub fn reject_request(&self, caller: &Caller, request: RequestId) -> Result<Receipt<()>, CenterError> {
        self.mutate("reject_request", |txn| {
            authorize(txn, caller)?;
            let record = load_request(txn, request)?;
            match &record.kind {
                RequestKind::Join { parent, .. } => {
                    require_owner(txn, &caller.user, *parent)?;
                }
                RequestKind::Invite { child, .. } => {
                    require_owner(txn, &caller.user, *child)?;
                }
                RequestKind::Share { to_user, .. } => {
                    if to_user != &caller.user {
                        return Err(CenterError::NotAUser(caller.user.clone()));
                    }
                }
            }
            remove_request(txn, request, &record.kind)?;
            txn.emit(CenterEvent::RequestRejected { request });
            Ok(())
        })
    }

    /// Retract a request the caller proposed, or one proposed from a group
    /// the caller owns.
    pub fn withdraw_request(&self, caller: &Caller, request: RequestId) -> Result<Receipt<()>, CenterError> {
        self.mutate("withdraw_request", |txn| {
            authorize(txn, caller)?;
            let record = load_request(txn, request)?;
            let from = proposing_group(&record.kind);
            let owns_source = txn.group(from).is_some_and(|g| g.is_owner(&caller.user));
            if record.proposer != caller.user && !owns_source {
                return Err(CenterError::NotOwnerOfGroup {
                    user: caller.user.clone(),
                    group: from,
                });
            }
            remove_request(txn, request, &record.kind)?;
            txn.emit(CenterEvent::RequestWithdrawn { request });
            Ok(())
        })
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn get_request(&self, request: RequestId) -> Result<RequestRecord, CenterError> {
        self.snapshot()
            .requests
            .get(&request)
            .cloned()
            .ok_or(CenterError::RequestDoesNotExist(request))
    }

    /// Pending requests waiting on `user`'s answer.
    pub fn get_incoming_requests(&self, user: &Address) -> Result<Vec<RequestRecord>, CenterError> {
        let ledger = self.snapshot();
        ledger.require_user(user)?;
        Ok(ledger
            .requests
            .values()
            .filter(|r| counterpart(ledger.as_ref(), &r.kind).as_ref() == Some(user))
            .cloned()
            .collect())
    }

    /// Pending requests `user` proposed.
    pub fn get_outgoing_requests(&self, user: &Address) -> Result<Vec<RequestRecord>, CenterError> {
        let ledger = self.snapshot();
        ledger.require_user(user)?;
        Ok(ledger
            .requests
            .values()
            .filter(|r| &r.proposer == user)
            .cloned()
            .collect())
    }
}
