//! The engine handle: snapshot publication, the commit path and events.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::Serialize;
use sharecenter_store::{CenterStore, Change, ChangeSet};
use sharecenter_types::{
    Address, CenterError, CenterEvent, Clock, EventRecord, SystemClock, Timestamp,
};
use sharecenter_utils::StatsCounter;
use tokio::sync::broadcast;

use crate::events::{EventBus, ListenerMap, Subscription};
use crate::ledger::{Ledger, LedgerView, Txn};
use crate::CenterConfig;

const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Page size used when replaying the persisted event log.
const REPLAY_PAGE: usize = 256;

const STAT_NAMES: &[&str] = &["commits", "failed_mutations", "blocked", "events"];

/// The identity a user-level mutation runs under: a system acting on behalf
/// of one of the users it registered.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Caller {
    pub system: Address,
    pub user: Address,
}

impl Caller {
    pub fn new(system: impl Into<Address>, user: impl Into<Address>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Result of a successful mutation and the events it committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt<T> {
    pub value: T,
    pub events: Vec<EventRecord>,
}

impl<T> Receipt<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Receipt<U> {
        Receipt {
            value: f(self.value),
            events: self.events,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CenterStats {
    pub owner: Address,
    pub systems: usize,
    pub users: usize,
    pub groups: usize,
    pub shares: usize,
    pub requests: usize,
    pub last_event_seq: u64,
    pub commits: u64,
    pub failed_mutations: u64,
    pub blocked: u64,
}

/// A storage-backed access-control registry.
///
/// Mutations are serialized by a writer lock, staged against the current
/// snapshot, committed to the store as one change set and only then
/// published. Reads clone the published snapshot and take no lock while
/// traversing.
pub struct ShareCenter<S: CenterStore> {
    store: S,
    state: RwLock<Arc<Ledger>>,
    write_lock: Mutex<()>,
    clock: Arc<dyn Clock>,
    bus: Arc<EventBus>,
    stats: StatsCounter,
}

impl<S: CenterStore> ShareCenter<S> {
    /// Open a center over `store` using the wall clock.
    pub fn open(store: S, owner: Address) -> Result<Self, CenterError> {
        Self::open_with_clock(store, owner, Arc::new(SystemClock), DEFAULT_EVENT_CHANNEL_CAPACITY)
    }

    /// Open a center using the owner and channel capacity from `config`.
    pub fn open_with_config(
        store: S,
        config: &CenterConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CenterError> {
        Self::open_with_clock(
            store,
            config.owner.clone(),
            clock,
            config.event_channel_capacity,
        )
    }

    /// Open a center, recording `owner` if the store has none yet.
    ///
    /// A store that already records an owner keeps it; a differing `owner`
    /// argument is ignored with a warning.
    pub fn open_with_clock(
        store: S,
        owner: Address,
        clock: Arc<dyn Clock>,
        event_channel_capacity: usize,
    ) -> Result<Self, CenterError> {
        let owner = match store.get_owner()? {
            Some(stored) => {
                if stored != owner {
                    tracing::warn!(
                        stored = %stored,
                        configured = %owner,
                        "registry owner already recorded; ignoring configured owner"
                    );
                }
                stored
            }
            None => {
                let mut changes = ChangeSet::new();
                changes.push(Change::PutOwner(owner.clone()));
                changes.push(Change::PutCounters(store.get_counters()?.unwrap_or_default()));
                store.commit(&changes)?;
                tracing::info!(owner = %owner, "recorded registry owner");
                owner
            }
        };

        let ledger = Ledger::load(&store, owner)?;
        tracing::info!(
            systems = ledger.systems.len(),
            users = ledger.users.len(),
            groups = ledger.groups.len(),
            shares = ledger.shares.len(),
            requests = ledger.requests.len(),
            "share center opened"
        );

        Ok(Self {
            store,
            state: RwLock::new(Arc::new(ledger)),
            write_lock: Mutex::new(()),
            clock,
            bus: Arc::new(EventBus::new(event_channel_capacity)),
            stats: StatsCounter::new(STAT_NAMES),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// The published ledger as of the last commit.
    pub fn snapshot(&self) -> Arc<Ledger> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    // ── Commit path ─────────────────────────────────────────────────────

    /// Stage `f` against the current snapshot and commit what it staged.
    ///
    /// A staged transaction with no changes and no events commits nothing.
    /// On failure an `Error` event is committed in place of the mutation.
    pub(crate) fn mutate<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut Txn<'_>) -> Result<T, CenterError>,
    ) -> Result<Receipt<T>, CenterError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let base = self.snapshot();
        let now = self.clock.now();

        let mut txn = Txn::new(&base, now);
        let value = match f(&mut txn) {
            Ok(value) => value,
            Err(err) => return Err(self.fail(op, err, &base, now)),
        };
        let staged = txn.finish();

        if staged.changes.is_empty() && staged.events.is_empty() {
            tracing::debug!(op, "mutation staged nothing");
            return Ok(Receipt {
                value,
                events: Vec::new(),
            });
        }

        let mut counters = staged.counters;
        let mut changes = staged.changes;
        let records = sequence(&mut counters.next_event, now, staged.events);
        changes.extend(records.iter().cloned().map(Change::AppendEvent));
        changes.push(Change::PutCounters(counters));

        if let Err(err) = self.store.commit(&changes) {
            tracing::warn!(op, error = %err, "commit failed; snapshot unchanged");
            return Err(self.fail(op, err.into(), &base, now));
        }

        drop(base);
        self.publish(&changes, &records);
        self.stats.increment("commits");
        tracing::info!(op, events = records.len(), "mutation committed");
        Ok(Receipt {
            value,
            events: records,
        })
    }

    /// Commit an `Error` event for a failed mutation and hand the error back.
    fn fail(&self, op: &'static str, err: CenterError, base: &Ledger, now: Timestamp) -> CenterError {
        self.stats.increment("failed_mutations");
        tracing::debug!(op, code = err.code(), error = %err, "mutation rejected");

        let mut counters = base.counters();
        let records = sequence(
            &mut counters.next_event,
            now,
            vec![CenterEvent::Error { code: err.code() }],
        );
        let mut changes = ChangeSet::new();
        changes.extend(records.iter().cloned().map(Change::AppendEvent));
        changes.push(Change::PutCounters(counters));

        match self.store.commit(&changes) {
            Ok(()) => self.publish(&changes, &records),
            Err(store_err) => {
                tracing::warn!(op, error = %store_err, "failed to record error event")
            }
        }
        err
    }

    fn publish(&self, changes: &ChangeSet, records: &[EventRecord]) {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            Arc::make_mut(&mut state).apply(changes);
        }
        for record in records {
            self.bus.emit(record);
        }
        self.stats.add("events", records.len() as u64);
    }

    pub(crate) fn note_blocked(&self, op: &'static str, actor: &Address, target: &Address) {
        self.stats.increment("blocked");
        tracing::debug!(op, actor = %actor, target = %target, "blocked by blacklist");
    }

    // ── Events ──────────────────────────────────────────────────────────

    /// Replay persisted events with `seq >= from_seq` to `listeners`, then
    /// keep delivering live events in commit order until the returned
    /// subscription is cancelled or dropped.
    ///
    /// Live listeners run on the committing thread with the writer lock held.
    /// A listener that calls a mutating operation on this center deadlocks;
    /// hand work off through [`event_stream`](Self::event_stream) instead.
    pub fn watch_events(
        &self,
        listeners: ListenerMap,
        from_seq: u64,
    ) -> Result<Subscription, CenterError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = from_seq.max(1);
        loop {
            let page = self.store.events_from(next, REPLAY_PAGE)?;
            for record in &page {
                listeners.dispatch(record);
            }
            match page.last() {
                Some(last) if page.len() == REPLAY_PAGE => next = last.seq + 1,
                _ => break,
            }
        }
        Ok(self.bus.subscribe(listeners))
    }

    /// Deliver live events to `listener` until the subscription is dropped.
    ///
    /// `listener` runs with the writer lock held and must not call a mutating
    /// operation on this center, or it deadlocks.
    pub fn subscribe(
        &self,
        listener: impl Fn(&EventRecord) + Send + Sync + 'static,
    ) -> Subscription {
        self.bus.subscribe(ListenerMap::new().on_any(listener))
    }

    /// An async stream of events committed from now on.
    pub fn event_stream(&self) -> broadcast::Receiver<EventRecord> {
        self.bus.stream()
    }

    /// Up to `limit` persisted events with `seq >= from`.
    pub fn events_from(&self, from: u64, limit: usize) -> Result<Vec<EventRecord>, CenterError> {
        Ok(self.store.events_from(from, limit)?)
    }

    pub fn stats(&self) -> Result<CenterStats, CenterError> {
        let ledger = self.snapshot();
        Ok(CenterStats {
            owner: ledger.owner().clone(),
            systems: ledger.systems.len(),
            users: ledger.users.len(),
            groups: ledger.groups.len(),
            shares: ledger.shares.len(),
            requests: ledger.requests.len(),
            last_event_seq: self.store.last_event_seq()?,
            commits: self.stats.get("commits"),
            failed_mutations: self.stats.get("failed_mutations"),
            blocked: self.stats.get("blocked"),
        })
    }
}

/// Assign consecutive sequence numbers starting at `*next`.
fn sequence(next: &mut u64, at: Timestamp, events: Vec<CenterEvent>) -> Vec<EventRecord> {
    events
        .into_iter()
        .map(|event| {
            let seq = *next;
            *next += 1;
            EventRecord { seq, at, event }
        })
        .collect()
}

/// Check that `caller.system` is added and registered `caller.user`.
pub(crate) fn authorize(txn: &Txn<'_>, caller: &Caller) -> Result<(), CenterError> {
    match txn.system(&caller.system) {
        Some(system) if system.active => {}
        _ => return Err(CenterError::NotARegisteredSystem(caller.system.clone())),
    }
    match txn.user(&caller.user) {
        Some(user) if user.system == caller.system => Ok(()),
        _ => Err(CenterError::NotAUser(caller.user.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharecenter_nullables::{NullClock, NullStore};
    use sharecenter_store::MetaStore;
    use sharecenter_types::{ErrorKind, EventName};
    use std::sync::atomic::{AtomicU64, Ordering};

    fn open(store: NullStore) -> ShareCenter<NullStore> {
        ShareCenter::open_with_clock(store, Address::new("0xowner"), Arc::new(NullClock::new(100)), 16)
            .unwrap()
    }

    #[test]
    fn first_open_records_owner_and_reopen_keeps_it() {
        let store = NullStore::new();
        let center = open(store);
        assert_eq!(center.store().get_owner().unwrap(), Some(Address::new("0xowner")));

        let store = center.store;
        let center = ShareCenter::open_with_clock(
            store,
            Address::new("0xsomeone-else"),
            Arc::new(NullClock::new(100)),
            16,
        )
        .unwrap();
        assert_eq!(center.snapshot().owner(), &Address::new("0xowner"));
    }

    #[test]
    fn failed_mutation_commits_an_error_event() {
        let center = open(NullStore::new());
        let err = center
            .add_system(&Address::new("0xmallory"), Address::new("0xsys"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IsNotOwner);

        let events = center.events_from(1, 10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, CenterEvent::Error { code: 0 });
        assert_eq!(center.stats().unwrap().failed_mutations, 1);
    }

    #[test]
    fn failed_commit_leaves_snapshot_unchanged() {
        let center = open(NullStore::new());
        center.store().fail_next_commit();
        let err = center
            .add_system(&Address::new("0xowner"), Address::new("0xsys"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        assert!(!center.is_added_system(&Address::new("0xsys")));

        // The error event itself was recorded on the next commit attempt.
        let events = center.events_from(1, 10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, CenterEvent::Error { code: 17 });
    }

    #[test]
    fn receipts_carry_sequenced_events() {
        let center = open(NullStore::new());
        let owner = Address::new("0xowner");
        let first = center.add_system(&owner, Address::new("0xsys")).unwrap();
        assert_eq!(first.events.len(), 1);
        assert_eq!(first.events[0].seq, 1);
        assert_eq!(first.events[0].at, Timestamp::new(100));

        let second = center
            .create_user(&Address::new("0xsys"), Address::new("0xalice"))
            .unwrap();
        let seqs: Vec<u64> = second.events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![2, 3]);
    }

    #[test]
    fn watch_replays_history_then_follows_live() {
        let center = open(NullStore::new());
        let owner = Address::new("0xowner");
        center.add_system(&owner, Address::new("0xsys1")).unwrap();
        center.add_system(&owner, Address::new("0xsys2")).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = center
            .watch_events(
                ListenerMap::new().on_any(move |r| sink.lock().unwrap().push(r.seq)),
                2,
            )
            .unwrap();
        center.add_system(&owner, Address::new("0xsys3")).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![2, 3]);

        drop(sub);
        center.add_system(&owner, Address::new("0xsys4")).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn named_listener_only_sees_its_events() {
        let center = open(NullStore::new());
        let errors = Arc::new(AtomicU64::new(0));
        let e = Arc::clone(&errors);
        let _sub = center
            .watch_events(
                ListenerMap::new().on(EventName::Error, move |_| {
                    e.fetch_add(1, Ordering::SeqCst);
                }),
                1,
            )
            .unwrap();
        let owner = Address::new("0xowner");
        center.add_system(&owner, Address::new("0xsys")).unwrap();
        let _ = center.add_system(&Address::new("0xnobody"), Address::new("0xsys"));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn event_stream_yields_commits() {
        let center = open(NullStore::new());
        let mut rx = center.event_stream();
        center
            .add_system(&Address::new("0xowner"), Address::new("0xsys"))
            .unwrap();
        let record = rx.recv().await.unwrap();
        assert_eq!(record.event.name(), EventName::SystemAdded);
    }
}
