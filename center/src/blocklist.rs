//! Per-user blacklists and whitelists.
//!
//! User U blocks actor X, optionally acting through group h, when X is not on
//! U's whitelist and any of these hold: X is on U's blacklist, h is on U's
//! blacklist, or X owns or belongs to a group on U's blacklist. Blocked edge
//! and membership attempts are silent no-ops.

use sharecenter_store::{CenterStore, Party, UserRecord};
use sharecenter_types::{Address, CenterError, CenterEvent, GroupId};

use crate::center::{authorize, Caller, Receipt, ShareCenter};
use crate::ledger::{LedgerView, Txn};

pub(crate) fn blocks<V: LedgerView + ?Sized>(
    view: &V,
    user: &UserRecord,
    actor: &Address,
    via: Option<GroupId>,
) -> bool {
    if actor == &user.address || user.whitelist.contains(actor) {
        return false;
    }
    user.blacklist.iter().any(|party| match party {
        Party::User(address) => address == actor,
        Party::Group(group) => {
            via == Some(*group) || view.group(*group).is_some_and(|g| g.includes(actor))
        }
    })
}

/// Whether the user at `target` blocks `actor`. Unknown targets block nobody.
pub(crate) fn blocked_by<V: LedgerView + ?Sized>(
    view: &V,
    target: &Address,
    actor: &Address,
    via: Option<GroupId>,
) -> bool {
    view.user(target)
        .is_some_and(|user| blocks(view, user, actor, via))
}

enum ListEdit {
    Blacklist(Party),
    Unblacklist(Party),
    Whitelist(Address),
    Unwhitelist(Address),
}

/// Apply `edit` to the caller's lists; `false` if nothing changed.
fn edit_lists(txn: &mut Txn<'_>, caller: &Caller, edit: ListEdit) -> Result<bool, CenterError> {
    authorize(txn, caller)?;
    match &edit {
        ListEdit::Blacklist(Party::User(a)) | ListEdit::Whitelist(a) => {
            txn.require_user(a)?;
        }
        ListEdit::Blacklist(Party::Group(g)) => {
            txn.require_group(*g)?;
        }
        ListEdit::Unblacklist(_) | ListEdit::Unwhitelist(_) => {}
    }
    let user = txn.user_mut(&caller.user)?;
    let changed = match edit {
        ListEdit::Blacklist(party) => user.blacklist.insert(party),
        ListEdit::Unblacklist(party) => user.blacklist.remove(&party),
        ListEdit::Whitelist(address) => user.whitelist.insert(address),
        ListEdit::Unwhitelist(address) => user.whitelist.remove(&address),
    };
    if changed {
        txn.emit(CenterEvent::BlacklistUpdated {
            user: caller.user.clone(),
        });
    }
    Ok(changed)
}

impl<S: CenterStore> ShareCenter<S> {
    pub fn blacklist_user(&self, caller: &Caller, user: &Address) -> Result<Receipt<bool>, CenterError> {
        self.mutate("blacklist_user", |txn| {
            edit_lists(txn, caller, ListEdit::Blacklist(Party::User(user.clone())))
        })
    }

    pub fn blacklist_group(&self, caller: &Caller, group: GroupId) -> Result<Receipt<bool>, CenterError> {
        self.mutate("blacklist_group", |txn| {
            edit_lists(txn, caller, ListEdit::Blacklist(Party::Group(group)))
        })
    }

    pub fn unblacklist_user(&self, caller: &Caller, user: &Address) -> Result<Receipt<bool>, CenterError> {
        self.mutate("unblacklist_user", |txn| {
            edit_lists(txn, caller, ListEdit::Unblacklist(Party::User(user.clone())))
        })
    }

    pub fn unblacklist_group(&self, caller: &Caller, group: GroupId) -> Result<Receipt<bool>, CenterError> {
        self.mutate("unblacklist_group", |txn| {
            edit_lists(txn, caller, ListEdit::Unblacklist(Party::Group(group)))
        })
    }

    /// Exempt `user` from every blacklist entry of the caller.
    pub fn whitelist_user(&self, caller: &Caller, user: &Address) -> Result<Receipt<bool>, CenterError> {
        self.mutate("whitelist_user", |txn| {
            edit_lists(txn, caller, ListEdit::Whitelist(user.clone()))
        })
    }

    pub fn unwhitelist_user(&self, caller: &Caller, user: &Address) -> Result<Receipt<bool>, CenterError> {
        self.mutate("unwhitelist_user", |txn| {
            edit_lists(txn, caller, ListEdit::Unwhitelist(user.clone()))
        })
    }

    /// Whether `target` currently blocks `actor` acting through `via`.
    pub fn is_blocked(&self, target: &Address, actor: &Address, via: Option<GroupId>) -> bool {
        let ledger = self.snapshot();
        blocked_by(ledger.as_ref(), target, actor, via)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::*;
    use sharecenter_types::{Address, ErrorKind, GroupId};

    #[test]
    fn blacklisted_user_cannot_add_target() {
        let (center, users) = setup(&["alice", "mallory"]);
        let (alice, mallory) = (&users[0], &users[1]);
        center.blacklist_user(&alice.caller, &mallory.caller.user).unwrap();

        let group = center.create_group(&mallory.caller).unwrap().value;
        let receipt = center
            .add_user_to_group(&mallory.caller, group, &alice.caller.user)
            .unwrap();
        assert!(!receipt.value);
        assert!(receipt.events.is_empty());
        assert!(center.get_group_members(group).unwrap().is_empty());
    }

    #[test]
    fn blacklisted_group_blocks_its_members_and_itself() {
        let (center, users) = setup(&["alice", "bob", "carol"]);
        let (alice, bob, carol) = (&users[0], &users[1], &users[2]);
        let gang = center.create_group(&bob.caller).unwrap().value;
        center.add_user_to_group(&bob.caller, gang, &carol.caller.user).unwrap();
        center.blacklist_group(&alice.caller, gang).unwrap();

        // carol belongs to the blacklisted group
        assert!(center.is_blocked(&alice.caller.user, &carol.caller.user, None));
        // bob owns it
        assert!(center.is_blocked(&alice.caller.user, &bob.caller.user, None));

        let carols = center.create_group(&carol.caller).unwrap().value;
        let receipt = center
            .add_user_to_group(&carol.caller, carols, &alice.caller.user)
            .unwrap();
        assert!(!receipt.value);
    }

    #[test]
    fn whitelist_overrides_blacklist() {
        let (center, users) = setup(&["alice", "bob"]);
        let (alice, bob) = (&users[0], &users[1]);
        let group = center.create_group(&bob.caller).unwrap().value;
        center.blacklist_group(&alice.caller, group).unwrap();
        assert!(center.is_blocked(&alice.caller.user, &bob.caller.user, Some(group)));

        center.whitelist_user(&alice.caller, &bob.caller.user).unwrap();
        assert!(!center.is_blocked(&alice.caller.user, &bob.caller.user, Some(group)));
        assert!(center
            .add_user_to_group(&bob.caller, group, &alice.caller.user)
            .unwrap()
            .value);

        center.unwhitelist_user(&alice.caller, &bob.caller.user).unwrap();
        assert!(center.is_blocked(&alice.caller.user, &bob.caller.user, Some(group)));
    }

    #[test]
    fn list_edits_are_idempotent() {
        let (center, users) = setup(&["alice", "bob"]);
        let (alice, bob) = (&users[0], &users[1]);
        let first = center.blacklist_user(&alice.caller, &bob.caller.user).unwrap();
        assert!(first.value);
        assert_eq!(first.events.len(), 1);

        let again = center.blacklist_user(&alice.caller, &bob.caller.user).unwrap();
        assert!(!again.value);
        assert!(again.events.is_empty());

        assert!(center.unblacklist_user(&alice.caller, &bob.caller.user).unwrap().value);
        assert!(!center.unblacklist_user(&alice.caller, &bob.caller.user).unwrap().value);
        assert!(!center.is_blocked(&alice.caller.user, &bob.caller.user, None));
    }

    #[test]
    fn list_targets_must_exist() {
        let (center, users) = setup(&["alice"]);
        let alice = &users[0];
        let err = center
            .blacklist_user(&alice.caller, &Address::new("0xghost"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IsNotAUser);
        let err = center
            .blacklist_group(&alice.caller, GroupId::new(77))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GroupNotActive);
        let err = center
            .whitelist_user(&alice.caller, &Address::new("0xghost"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IsNotAUser);
    }

    #[test]
    fn unblacklisting_a_group_lifts_the_block() {
        let (center, users) = setup(&["alice", "bob"]);
        let (alice, bob) = (&users[0], &users[1]);
        center.blacklist_group(&alice.caller, bob.personal).unwrap();
        assert!(center.is_blocked(&alice.caller.user, &bob.caller.user, None));
        center.unblacklist_group(&alice.caller, bob.personal).unwrap();
        assert!(!center.is_blocked(&alice.caller.user, &bob.caller.user, None));
    }
}
