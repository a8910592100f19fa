use nfsim::prelude::*;
use serial_test::serial;
use std::net::Ipv4Addr;

mod common;
use common::*;

const AMF: Ipv4Addr = Ipv4Addr::new(192, 168, 70, 132);

#[test]
#[serial]
fn restricted_ping_across_subnets_fails_at_once() {
    let (mut rt, console) = deployed();
    rt.attach(console, NfType::Nrf).unwrap();
    let before = rt.sim_time();

    let target = Ipv4Addr::new(192, 168, 1, 50);
    let results = rt
        .ping(console, Some(target), PingMode::SubnetRestricted)
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].target, target);
    assert_eq!(results[0].sent, 4);
    assert_eq!(results[0].received, 0);
    assert_eq!(results[0].loss_percent(), 100);
    assert_eq!(rt.sim_time(), before);

    let output = rt.take_output(console);
    assert!(output.iter().any(|l| l.contains("transmit failed")));
    assert!(output
        .iter()
        .any(|l| l == "4 packets transmitted, 0 received, 100% packet loss"));
}

#[test]
#[serial]
fn ping_sends_one_packet_per_interval() {
    let (mut rt, console) = deployed();
    rt.attach(console, NfType::Nrf).unwrap();
    let before = rt.sim_time();

    let results = rt.ping(console, Some(AMF), PingMode::Raw).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].sent, 4);
    assert_eq!(results[0].rtts.len() as u32, results[0].received);
    assert!(results[0].rtts.iter().all(|rtt| (1..=56).contains(rtt)));
    assert_eq!(rt.sim_time(), before + Duration::from_secs(3));

    let output = rt.take_output(console);
    assert_eq!(output[0], "PING 192.168.70.132 (AMF-1): 4 packets");
    assert_eq!(output.len(), 1 + 4 + 2 + usize::from(results[0].received > 0));
}

#[test]
#[serial]
fn stable_neighbours_are_mostly_reachable() {
    let (mut rt, console) = deployed();
    rt.attach(console, NfType::Nrf).unwrap();

    let mut sent = 0;
    let mut received = 0;
    for _ in 0..50 {
        for stats in rt.ping(console, Some(AMF), PingMode::Raw).unwrap() {
            sent += stats.sent;
            received += stats.received;
        }
    }
    let ratio = f64::from(received) / f64::from(sent);
    assert!((0.8..=0.97).contains(&ratio), "ratio = {ratio}");
}

#[test]
#[serial]
fn subnet_sweep_covers_every_neighbour() {
    let (mut rt, console) = deployed();
    rt.attach(console, NfType::Nrf).unwrap();

    let results = rt.ping(console, None, PingMode::SubnetRestricted).unwrap();
    assert_eq!(results.len(), 10);
    assert!(results.iter().all(|stats| stats.sent == 4));
    let nrf = rt.app.store.nf_by_type(NfType::Nrf).unwrap().config.ip_address;
    assert!(results.iter().all(|stats| stats.target != nrf));
}

#[test]
#[serial]
fn ping_needs_a_running_source() {
    let mut rt = runtime();
    let console = rt.open_console();
    let err = rt.ping(console, Some(AMF), PingMode::Raw).unwrap_err();
    assert_eq!(err, ErrorKind::NotFound);

    rt.attach(console, NfType::Amf).unwrap();
    let err = rt.ping(console, Some(AMF), PingMode::Raw).unwrap_err();
    assert_eq!(err, ErrorKind::NotFound);
    assert_eq!(err.message, "service oai-amf is not running");
}

#[test]
#[serial]
fn concurrent_ping_from_one_source_is_rejected() {
    let (mut rt, console) = deployed();
    rt.attach(console, NfType::Nrf).unwrap();
    let other = rt.open_console();
    rt.attach(other, NfType::Nrf).unwrap();

    let (app, mut ctx) = rt.split();
    app.ping(console, Some(AMF), PingMode::Raw, &mut ctx).unwrap();
    let err = app
        .ping(other, Some(AMF), PingMode::Raw, &mut ctx)
        .unwrap_err();
    assert_eq!(err, ErrorKind::State);

    rt.settle();
    assert_eq!(rt.app.take_ping_results(console).len(), 1);
    assert!(rt.app.take_ping_results(other).is_empty());
}

#[test]
#[serial]
fn removing_the_source_ends_the_session() {
    let (mut rt, console) = deployed();
    rt.attach(console, NfType::Nrf).unwrap();
    let nrf = rt.app.store.nf_by_type(NfType::Nrf).unwrap().id;

    let (app, mut ctx) = rt.split();
    app.ping(console, Some(AMF), PingMode::Raw, &mut ctx).unwrap();
    rt.wait(Duration::from_millis(1500));
    rt.delete_nf(nrf).unwrap();

    assert!(rt.settle());
    let output = rt.take_output(console);
    assert_eq!(output.last().unwrap(), &format!("ping: source {nrf} was removed"));
    assert!(!rt.app.is_busy());
}

#[test]
#[serial]
fn unmanaged_targets_rarely_answer() {
    let (mut rt, console) = deployed();
    rt.attach(console, NfType::Nrf).unwrap();
    let target = Ipv4Addr::new(192, 168, 70, 250);

    let mut received = 0;
    for _ in 0..25 {
        received += rt.ping(console, Some(target), PingMode::Raw).unwrap()[0].received;
    }
    assert!(received < 30, "received = {received}");
}
