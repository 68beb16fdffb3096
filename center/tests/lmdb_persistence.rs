//! A center over LMDB survives being closed and reopened.

use std::sync::{Arc, Mutex};

use sharecenter_center::{Caller, CenterConfig, ListenerMap, ShareCenter};
use sharecenter_nullables::NullClock;
use sharecenter_store::SystemStore;
use sharecenter_store_lmdb::LmdbEnvironment;
use sharecenter_types::{AccessLevel, Address, EventName, Lifetime};

const MAP_SIZE: usize = 16 * 1024 * 1024;

fn open(dir: &std::path::Path, owner: &str) -> ShareCenter<LmdbEnvironment> {
    let env = LmdbEnvironment::open(dir, MAP_SIZE).unwrap();
    ShareCenter::open_with_clock(env, Address::new(owner), Arc::new(NullClock::new(500)), 64)
        .unwrap()
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let alice = Caller::new("0xsys", "0xalice");
    let bob = Caller::new("0xsys", "0xbob");

    let (parent, child, share, request) = {
        let center = open(dir.path(), "0xowner");
        center.add_system(&Address::new("0xowner"), Address::new("0xsys")).unwrap();
        let alice_group = center.create_user(&alice.system, alice.user.clone()).unwrap().value;
        center.create_user(&bob.system, bob.user.clone()).unwrap();

        let parent = center.create_group(&alice).unwrap().value;
        let child = center.create_group(&bob).unwrap().value;
        let id = center.request_join(&bob, child, parent).unwrap().value.unwrap();
        center.accept_subgroup(&alice, parent, id).unwrap();

        let share = center
            .add_share(&alice, "ipfs://kept", parent, Lifetime::Indefinite, AccessLevel::Read)
            .unwrap()
            .value;
        let pending = center
            .invite_group(&alice, alice_group, child)
            .unwrap()
            .value
            .unwrap();
        (parent, child, share, pending)
    };

    let center = open(dir.path(), "0xsomeone-else");
    assert_eq!(center.owner(), Address::new("0xowner"));
    assert!(center.is_added_system(&Address::new("0xsys")));
    assert_eq!(center.get_sub_groups(parent).unwrap(), vec![child]);
    assert_eq!(center.get_share(share).unwrap().uri.as_str(), "ipfs://kept");
    assert_eq!(center.get_request(request).unwrap().proposer, alice.user);
    assert_eq!(center.get_pending_parents(child).unwrap().len(), 1);

    let visible = center.get_all_shares(&bob.user).unwrap();
    assert_eq!(visible[&parent][0].id, share);

    // counters were persisted, so fresh ids continue where they left off
    let next = center.create_group(&bob).unwrap().value;
    assert!(next > child);
    assert!(center.store().get_system(&Address::new("0xsys")).unwrap().is_some());
}

#[test]
fn event_log_replays_in_order_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let center = open(dir.path(), "0xowner");
        center.add_system(&Address::new("0xowner"), Address::new("0xsys")).unwrap();
        center.create_user(&Address::new("0xsys"), Address::new("0xalice")).unwrap();
        // rejected mutations are logged too
        center.create_user(&Address::new("0xsys"), Address::new("0xalice")).unwrap_err();
    }

    let center = open(dir.path(), "0xowner");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = center
        .watch_events(
            ListenerMap::new().on_any(move |record| {
                sink.lock().unwrap().push((record.seq, record.event.name()))
            }),
            1,
        )
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (1, EventName::SystemAdded),
            (2, EventName::UserCreated),
            (3, EventName::GroupCreated),
            (4, EventName::Error),
        ]
    );
    assert_eq!(center.stats().unwrap().last_event_seq, 4);

    center.create_group(&Caller::new("0xsys", "0xalice")).unwrap();
    assert_eq!(seen.lock().unwrap().last(), Some(&(5, EventName::GroupCreated)));
}

#[test]
fn config_drives_open() {
    let dir = tempfile::tempdir().unwrap();
    let config = CenterConfig {
        owner: Address::new("0xconfigured"),
        data_dir: dir.path().to_path_buf(),
        map_size_mb: 16,
        ..CenterConfig::default()
    };
    let env = LmdbEnvironment::open(&config.data_dir, config.map_size_bytes()).unwrap();
    let center =
        ShareCenter::open_with_config(env, &config, Arc::new(NullClock::new(1))).unwrap();
    assert_eq!(center.owner(), Address::new("0xconfigured"));
}
