//! End-to-end dispatches with real forked workers.
//!
//! Each test forks, so they are serialised on one lock, and every test gets its
//! own queue key under a fresh temp directory.
use std::sync::{Mutex, MutexGuard};

use shuttle_core::{Coordinator, DispatchConfig, DispatchReport};
use shuttle_exec::{CompletionChannel, CompletionRecord, HandshakeKind, QueueKey};
use shuttle_model::{BusRole, Roster, Weekday};
use tempfile::TempDir;

static FORK_LOCK: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    FORK_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

struct Harness {
    _dir: TempDir,
    key: QueueKey,
    coordinator: Coordinator,
}

fn harness(handshake: HandshakeKind) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let key = QueueKey::new(dir.path(), b'S');
    let config = DispatchConfig {
        queue: key.clone(),
        handshake,
        handshake_timeout_ms: Some(10_000),
        completion_timeout_ms: Some(10_000),
        poll_interval_ms: 5,
    };
    Harness {
        _dir: dir,
        key,
        coordinator: Coordinator::new(config).unwrap(),
    }
}

fn monday_roster(names: &[&str]) -> Roster {
    let mut roster = Roster::new();
    for name in names {
        roster.add(name, vec![Weekday::Monday]).unwrap();
    }
    roster
}

fn counts(report: &DispatchReport) -> Vec<(BusRole, usize, u32)> {
    report
        .buses
        .iter()
        .map(|b| (b.role, b.sent.len(), b.acknowledged))
        .collect()
}

#[test]
fn nobody_available_opens_no_queue() {
    let _guard = serial();
    let h = harness(HandshakeKind::Pipe);
    let roster = monday_roster(&["A", "B"]);

    let report = h
        .coordinator
        .dispatch(Weekday::Sunday, &roster.list_available(Weekday::Sunday))
        .unwrap();

    assert!(report.buses.is_empty());
    assert!(!CompletionChannel::exists(&h.key).unwrap());
}

#[test]
fn one_bus_carries_only_that_days_applicants() {
    let _guard = serial();
    let h = harness(HandshakeKind::Pipe);
    let mut roster = Roster::new();
    roster.add("A", vec![Weekday::Monday]).unwrap();
    roster.add("B", vec![Weekday::Monday]).unwrap();
    roster.add("C", vec![Weekday::Tuesday]).unwrap();

    let report = h
        .coordinator
        .dispatch(Weekday::Monday, &roster.list_available(Weekday::Monday))
        .unwrap();

    assert_eq!(counts(&report), vec![(BusRole::First, 2, 2)]);
    assert_eq!(report.buses[0].sent, ["A", "B"]);
    assert!(report.buses[0].is_complete());
    assert!(!CompletionChannel::exists(&h.key).unwrap());
}

#[test]
fn exactly_five_runs_an_empty_second_bus() {
    let _guard = serial();
    let h = harness(HandshakeKind::Pipe);
    let roster = monday_roster(&["A", "B", "C", "D", "E"]);

    let report = h
        .coordinator
        .dispatch(Weekday::Monday, &roster.list_available(Weekday::Monday))
        .unwrap();

    assert_eq!(
        counts(&report),
        vec![(BusRole::First, 5, 5), (BusRole::Second, 0, 0)]
    );
    assert!(report.buses.iter().all(|b| b.is_complete()));
}

#[test]
fn seven_split_across_sequential_buses() {
    let _guard = serial();
    let h = harness(HandshakeKind::Pipe);
    let roster = monday_roster(&["A", "B", "C", "D", "E", "F", "G"]);

    let report = h
        .coordinator
        .dispatch(Weekday::Monday, &roster.list_available(Weekday::Monday))
        .unwrap();

    assert_eq!(
        counts(&report),
        vec![(BusRole::First, 5, 5), (BusRole::Second, 2, 2)]
    );
    let (first, second) = (&report.buses[0], &report.buses[1]);
    assert_eq!(first.sent, ["A", "B", "C", "D", "E"]);
    assert_eq!(second.sent, ["F", "G"]);
    assert_ne!(first.pid, second.pid);
    assert!(first.reaped_at <= second.spawned_at);
    assert!(!CompletionChannel::exists(&h.key).unwrap());
}

#[cfg(target_os = "linux")]
#[test]
fn signal_handshake_dispatches_both_buses() {
    let _guard = serial();
    let h = harness(HandshakeKind::Signal);
    let roster = monday_roster(&["A", "B", "C", "D", "E", "F"]);

    let report = h
        .coordinator
        .dispatch(Weekday::Monday, &roster.list_available(Weekday::Monday))
        .unwrap();

    assert_eq!(
        counts(&report),
        vec![(BusRole::First, 5, 5), (BusRole::Second, 1, 1)]
    );
    assert_eq!(report.total_acknowledged(), 6);
}

#[test]
fn stale_records_from_an_aborted_run_are_ignored() {
    let _guard = serial();
    let h = harness(HandshakeKind::Pipe);

    let leftover = CompletionChannel::open(&h.key).unwrap();
    leftover
        .sender()
        .post(&CompletionRecord::for_role(BusRole::First, 42))
        .unwrap();
    std::mem::forget(leftover);

    let roster = monday_roster(&["A", "B", "C"]);
    let report = h
        .coordinator
        .dispatch(Weekday::Monday, &roster.list_available(Weekday::Monday))
        .unwrap();

    assert_eq!(counts(&report), vec![(BusRole::First, 3, 3)]);
    assert!(!CompletionChannel::exists(&h.key).unwrap());
}

#[test]
fn repeated_dispatches_recreate_the_queue() {
    let _guard = serial();
    let h = harness(HandshakeKind::Pipe);
    let roster = monday_roster(&["A"]);
    let names = roster.list_available(Weekday::Monday);

    for _ in 0..2 {
        let report = h.coordinator.dispatch(Weekday::Monday, &names).unwrap();
        assert_eq!(counts(&report), vec![(BusRole::First, 1, 1)]);
        assert!(!CompletionChannel::exists(&h.key).unwrap());
    }
}
