use nfsim::prelude::*;
use serial_test::serial;
use std::sync::mpsc::channel;

mod common;
use common::*;

#[test]
#[serial]
fn new_functions_stabilize_after_the_delay() {
    let mut rt = runtime();
    let id = rt.add_nf(NfType::Nrf, &NfRequest::default()).unwrap();
    let created = rt.app.store.get(id).unwrap().created_at;
    assert_eq!(rt.app.store.get(id).unwrap().status, NfStatus::Starting);

    rt.wait(Duration::from_millis(4900));
    assert_eq!(rt.app.store.get(id).unwrap().status, NfStatus::Starting);

    rt.wait(Duration::from_millis(200));
    let nrf = rt.app.store.get(id).unwrap();
    assert_eq!(nrf.status, NfStatus::Stable);
    assert!(nrf.status_timestamp >= created + Duration::from_secs(5));
}

#[test]
#[serial]
fn deleted_functions_ignore_their_timer() {
    let mut rt = runtime();
    let id = rt.add_nf(NfType::Nrf, &NfRequest::default()).unwrap();
    rt.wait(Duration::from_secs(1));
    rt.delete_nf(id).unwrap();

    rt.wait(Duration::from_secs(10));
    assert!(rt.app.store.is_empty());
    assert!(!rt.app.lifecycle.is_pending(id));
}

#[test]
#[serial]
fn stopped_functions_stay_stopped() {
    let mut rt = runtime();
    let console = rt.open_console();
    let id = rt.add_nf(NfType::Amf, &NfRequest::default()).unwrap();
    rt.run(console, Operation::Stop(NfType::Amf)).unwrap();
    assert_eq!(rt.app.store.get(id).unwrap().status, NfStatus::Stopped);

    rt.wait(Duration::from_secs(10));
    assert_eq!(rt.app.store.get(id).unwrap().status, NfStatus::Stopped);
}

#[test]
#[serial]
fn restart_rearms_the_timer() {
    let mut rt = runtime();
    let console = rt.open_console();
    let id = rt.add_nf(NfType::Amf, &NfRequest::default()).unwrap();

    rt.wait(Duration::from_secs(1));
    rt.run(console, Operation::Stop(NfType::Amf)).unwrap();
    rt.run(console, Operation::Start(NfType::Amf)).unwrap();
    let restarted = rt.sim_time();
    assert_eq!(restarted, SimTime::from(2.0));

    // the timer armed on creation would have fired at 5.0
    rt.wait(Duration::from_millis(4500));
    assert_eq!(rt.app.store.get(id).unwrap().status, NfStatus::Starting);

    rt.wait(Duration::from_secs(1));
    let amf = rt.app.store.get(id).unwrap();
    assert_eq!(amf.status, NfStatus::Stable);
    assert_eq!(amf.status_timestamp, restarted + Duration::from_secs(5));
}

#[test]
#[serial]
fn lifecycle_notifications() {
    let (tx, rx) = channel();
    let sim = Simulation::new(SimConfig::default())
        .unwrap()
        .with_sink(ChannelSink(tx));
    let mut rt = runtime_with(sim);

    let id = rt.add_nf(NfType::Smf, &NfRequest::default()).unwrap();
    rt.wait(Duration::from_secs(6));
    rt.delete_nf(id).unwrap();

    let received = rx.try_iter().collect::<Vec<_>>();
    assert!(matches!(
        received[0],
        Notification::Lifecycle {
            from: None,
            to: NfStatus::Starting,
            ..
        }
    ));
    assert!(matches!(
        received[1],
        Notification::Lifecycle {
            from: Some(NfStatus::Starting),
            to: NfStatus::Stable,
            ..
        }
    ));
    assert!(matches!(received[2], Notification::Removed { nf, .. } if nf == id));
    assert_eq!(received.len(), 3);
    assert_eq!(received[1].at(), SimTime::from(5.0));
}

#[test]
#[serial]
fn store_subscribers_see_changes() {
    let mut rt = runtime();
    let events = rt.app.store.subscribe();
    let id = rt.add_nf(NfType::Nrf, &NfRequest::default()).unwrap();
    rt.wait(Duration::from_secs(6));

    let changes = events
        .try_iter()
        .filter(|event| event.kind == EntityKind::NetworkFunction && event.id == id.raw())
        .map(|event| event.change)
        .collect::<Vec<_>>();
    assert_eq!(changes, vec![Change::Added, Change::Updated]);
}
