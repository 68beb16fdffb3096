//! End-to-end scenarios over an in-memory store: registration, hierarchy
//! handshakes, recursive visibility, blocking, expiry and commit failures.

use std::sync::{Arc, Mutex};

use sharecenter_center::{Caller, ListenerMap, ShareCenter};
use sharecenter_nullables::{NullClock, NullStore};
use sharecenter_types::{
    AccessLevel, Address, CenterEvent, ErrorKind, EventName, GroupId, Lifetime,
};

struct Member {
    caller: Caller,
    personal: GroupId,
}

fn owner() -> Address {
    Address::new("0xowner")
}

fn open() -> (ShareCenter<NullStore>, Arc<NullClock>) {
    let clock = Arc::new(NullClock::new(1_000));
    let center =
        ShareCenter::open_with_clock(NullStore::new(), owner(), clock.clone(), 64).unwrap();
    (center, clock)
}

fn register(center: &ShareCenter<NullStore>, system: &str, name: &str) -> Member {
    let system = Address::new(system);
    if !center.is_added_system(&system) {
        center.add_system(&owner(), system.clone()).unwrap();
    }
    let user = Address::new(name);
    let personal = center.create_user(&system, user.clone()).unwrap().value;
    Member {
        caller: Caller::new(system, user),
        personal,
    }
}

/// `child` joins `parent` through a request its owner accepts.
fn join(center: &ShareCenter<NullStore>, child: &Member, parent: &Member) {
    let id = center
        .request_join(&child.caller, child.personal, parent.personal)
        .unwrap()
        .value
        .expect("join was blocked");
    center.accept_subgroup(&parent.caller, parent.personal, id).unwrap();
}

fn share(center: &ShareCenter<NullStore>, member: &Member, uri: &str) {
    center
        .add_share(&member.caller, uri, member.personal, Lifetime::Indefinite, AccessLevel::Read)
        .unwrap();
}

fn uris(center: &ShareCenter<NullStore>, member: &Member) -> Vec<(GroupId, String)> {
    center
        .get_all_shares(&member.caller.user)
        .unwrap()
        .into_iter()
        .flat_map(|(group, shares)| {
            shares
                .into_iter()
                .map(move |s| (group, s.uri.as_str().to_string()))
        })
        .collect()
}

#[test]
fn grandfather_mother_son() {
    let (center, _) = open();
    let grandfather = register(&center, "0xsys", "0xgrandfather");
    let mother = register(&center, "0xsys", "0xmother");
    let son = register(&center, "0xsys", "0xson");

    share(&center, &grandfather, "grandfatherURI");
    share(&center, &mother, "motherURI");
    share(&center, &son, "sonURI");

    join(&center, &mother, &grandfather);
    join(&center, &son, &grandfather);
    join(&center, &son, &mother);

    assert_eq!(
        uris(&center, &son),
        vec![
            (grandfather.personal, "grandfatherURI".to_string()),
            (mother.personal, "motherURI".to_string()),
            (son.personal, "sonURI".to_string()),
        ]
    );
    assert_eq!(
        uris(&center, &mother),
        vec![
            (grandfather.personal, "grandfatherURI".to_string()),
            (mother.personal, "motherURI".to_string()),
        ]
    );
    assert_eq!(
        uris(&center, &grandfather),
        vec![(grandfather.personal, "grandfatherURI".to_string())]
    );
}

#[test]
fn get_all_shares_is_idempotent_over_a_diamond() {
    let (center, _) = open();
    let top = register(&center, "0xsys", "0xtop");
    let left = register(&center, "0xsys", "0xleft");
    let right = register(&center, "0xsys", "0xright");
    let bottom = register(&center, "0xsys", "0xbottom");
    share(&center, &top, "ipfs://top");

    join(&center, &left, &top);
    join(&center, &right, &top);
    join(&center, &bottom, &left);
    join(&center, &bottom, &right);

    let first = center.get_all_shares(&bottom.caller.user).unwrap();
    let second = center.get_all_shares(&bottom.caller.user).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert_eq!(first[&top.personal].len(), 1);
}

#[test]
fn cycles_are_refused_and_leave_the_graph_unchanged() {
    let (center, _) = open();
    let alice = register(&center, "0xsys", "0xalice");
    let a = center.create_group(&alice.caller).unwrap().value;
    let b = center.create_group(&alice.caller).unwrap().value;
    let c = center.create_group(&alice.caller).unwrap().value;
    center.add_group_to_group(&alice.caller, a, b).unwrap();
    center.add_group_to_group(&alice.caller, b, c).unwrap();

    let before: Vec<_> = [a, b, c].map(|g| center.get_group(g).unwrap()).into();
    for (parent, child) in [(c, a), (b, a), (c, b), (a, a)] {
        let err = center.add_group_to_group(&alice.caller, parent, child).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CircularDependency);
    }
    let err = center.add_share_group(&alice.caller, c, a).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircularDependency);

    let after: Vec<_> = [a, b, c].map(|g| center.get_group(g).unwrap()).into();
    assert_eq!(before, after);
}

#[test]
fn blacklisted_actor_never_succeeds_and_never_raises() {
    let (center, _) = open();
    let alice = register(&center, "0xsys", "0xalice");
    let mallory = register(&center, "0xsys", "0xmallory");
    center.blacklist_user(&alice.caller, &mallory.caller.user).unwrap();

    let group = center.create_group(&mallory.caller).unwrap().value;
    let added = center
        .add_user_to_group(&mallory.caller, group, &alice.caller.user)
        .unwrap();
    assert!(!added.value);

    let invite = center
        .invite_group(&mallory.caller, group, alice.personal)
        .unwrap();
    assert_eq!(invite.value, None);

    let granted = center
        .add_share_group(&mallory.caller, group, alice.personal)
        .unwrap();
    assert!(!granted.value);

    assert!(center.get_incoming_requests(&alice.caller.user).unwrap().is_empty());
    assert!(center.get_share_groups(alice.personal).unwrap().is_empty());
    assert_eq!(center.stats().unwrap().blocked, 3);
}

#[test]
fn one_second_share_expires() {
    let (center, clock) = open();
    let alice = register(&center, "0xsys", "0xalice");
    let id = center
        .add_share(&alice.caller, "ipfs://brief", alice.personal, Lifetime::Seconds(1), AccessLevel::Read)
        .unwrap()
        .value;
    assert_eq!(center.get_shares(alice.personal).unwrap().len(), 1);

    clock.advance(1);
    assert!(center.get_shares(alice.personal).unwrap().is_empty());
    assert!(center.get_all_shares(&alice.caller.user).unwrap().is_empty());
    // the record lingers until purged
    assert_eq!(center.get_share(id).unwrap().id, id);

    let purged = center.purge_expired(&owner()).unwrap();
    assert_eq!(purged.value, vec![id]);
    assert!(center.get_share(id).is_err());
}

#[test]
fn independent_systems_do_not_interfere() {
    let (center, _) = open();
    let alice = register(&center, "0xsys-a", "0xalice");
    let bob = register(&center, "0xsys-b", "0xbob");

    assert_ne!(alice.personal, bob.personal);
    assert_eq!(center.get_user(&alice.caller.user).unwrap().system, Address::new("0xsys-a"));
    assert_eq!(center.get_user(&bob.caller.user).unwrap().system, Address::new("0xsys-b"));

    // system B cannot act for a user registered by system A
    let hijack = Caller::new("0xsys-b", "0xalice");
    let err = center.create_group(&hijack).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IsNotAUser);

    let err = center
        .create_user(&Address::new("0xsys-b"), Address::new("0xalice"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserAlreadyExists);
}

#[test]
fn failed_commit_leaves_state_unchanged_and_records_error() {
    let (center, _) = open();
    let alice = register(&center, "0xsys", "0xalice");
    let before = center.snapshot();
    let groups_before = center.get_group_ids(&alice.caller.user).unwrap();
    let last_seq = center.stats().unwrap().last_event_seq;

    center.store().fail_next_commit();
    let err = center.create_group(&alice.caller).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageFailure);
    assert_eq!(center.get_group_ids(&alice.caller.user).unwrap(), groups_before);
    assert_eq!(center.snapshot().counters().next_group, before.counters().next_group);

    let events = center.events_from(last_seq + 1, 10).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].event,
        CenterEvent::Error {
            code: ErrorKind::StorageFailure.code()
        }
    );

    // the id was not burnt
    let group = center.create_group(&alice.caller).unwrap().value;
    assert_eq!(group, before.counters().next_group);
}

#[test]
fn watch_replays_history_then_delivers_live_events() {
    let (center, _) = open();
    let alice = register(&center, "0xsys", "0xalice");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let groups = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&groups);
    let listeners = ListenerMap::new()
        .on_any(move |record| sink.lock().unwrap().push(record.seq))
        .on(EventName::GroupCreated, move |_| *counter.lock().unwrap() += 1);
    let subscription = center.watch_events(listeners, 1).unwrap();

    // SystemAdded, UserCreated, GroupCreated
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(*groups.lock().unwrap(), 1);

    center.create_group(&alice.caller).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(*groups.lock().unwrap(), 2);

    drop(subscription);
    center.create_group(&alice.caller).unwrap();
    assert_eq!(seen.lock().unwrap().len(), 4);
}

#[test]
fn failed_mutations_are_announced() {
    let (center, _) = open();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = center.subscribe(move |record| sink.lock().unwrap().push(record.event.clone()));

    center
        .create_user(&Address::new("0xnobody"), Address::new("0xalice"))
        .unwrap_err();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![CenterEvent::Error {
            code: ErrorKind::IsNotARegisteredSystem.code()
        }]
    );
}
