use nfsim::prelude::*;
use serial_test::serial;

mod common;
use common::*;

#[test]
#[serial]
fn stable_upf_creates_its_peers_once() {
    let mut rt = runtime();
    let console = rt.open_console();
    let upf = rt.add_nf(NfType::Upf, &NfRequest::default()).unwrap();
    assert_eq!(rt.app.store.count::<Connection>(), 0);

    rt.wait(Duration::from_secs(6));
    assert_eq!(count_of(&rt, NfType::Smf), 1);
    assert_eq!(count_of(&rt, NfType::ExtDn), 1);
    assert_eq!(rt.app.store.count::<NetworkFunction>(), 3);

    let smf = rt.app.store.nf_by_type(NfType::Smf).unwrap().id;
    let ext_dn = rt.app.store.nf_by_type(NfType::ExtDn).unwrap().id;
    let n4 = rt
        .app
        .store
        .all::<Connection>()
        .find(|con| con.interface_name == "N4")
        .unwrap();
    assert_eq!((n4.source_id, n4.target_id), (upf, smf));
    assert_eq!(n4.protocol, "PFCP");
    let n6 = rt
        .app
        .store
        .all::<Connection>()
        .find(|con| con.interface_name == "N6")
        .unwrap();
    assert_eq!((n6.source_id, n6.target_id), (ext_dn, upf));

    // peers stabilizing and a restart of the upf change nothing
    rt.run(console, Operation::Stop(NfType::Upf)).unwrap();
    rt.run(console, Operation::Start(NfType::Upf)).unwrap();
    rt.wait(Duration::from_secs(10));
    assert_eq!(rt.app.store.count::<NetworkFunction>(), 3);
    assert_eq!(interfaces(&rt), vec!["N4", "N6"]);
}

#[test]
#[serial]
fn upf_reuses_existing_peers() {
    let mut rt = runtime();
    let smf = rt.add_nf(NfType::Smf, &NfRequest::default()).unwrap();
    let upf = rt.add_nf(NfType::Upf, &NfRequest::default()).unwrap();
    rt.wait(Duration::from_secs(6));

    assert_eq!(count_of(&rt, NfType::Smf), 1);
    let n4 = rt.app.store.all::<Connection>().find(|con| con.interface_name == "N4");
    assert!(n4.is_some_and(|con| con.joins(upf, smf)));
}

#[test]
#[serial]
fn removed_upf_is_not_wired() {
    let mut rt = runtime();
    let upf = rt.add_nf(NfType::Upf, &NfRequest::default()).unwrap();
    rt.wait(Duration::from_secs(1));
    rt.delete_nf(upf).unwrap();
    rt.wait(Duration::from_secs(10));
    assert!(rt.app.store.is_empty());
}

#[test]
#[serial]
fn new_functions_join_the_first_bus() {
    let (mut rt, _) = deployed();
    let bus = rt.app.store.first_bus().unwrap().id;

    let amf = rt.add_nf(NfType::Amf, &NfRequest::default()).unwrap();
    let links = rt
        .app
        .store
        .all::<BusConnection>()
        .filter(|link| link.nf_id == amf)
        .collect::<Vec<_>>();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].bus_id, bus);
    assert_eq!(links[0].interface_name, "Namf");
    assert_eq!(links[0].protocol, "HTTP/2");

    let upf = rt.add_nf(NfType::Upf, &NfRequest::default()).unwrap();
    assert!(!rt.app.store.all::<BusConnection>().any(|link| link.nf_id == upf));
}

#[test]
#[serial]
fn manual_addresses_are_validated() {
    let (mut rt, _) = deployed();
    let taken = NfRequest {
        ip: Some("192.168.70.130".to_string()),
        ..NfRequest::default()
    };
    let err = rt.add_nf(NfType::Amf, &taken).unwrap_err();
    assert_eq!(err, ErrorKind::Conflict);

    let request = NfRequest {
        ip: Some("10.0.0.1".to_string()),
        port: Some(7000),
        position: Some(Position::new(10.0, 20.0)),
    };
    let id = rt.add_nf(NfType::Amf, &request).unwrap();
    let amf = rt.app.store.get(id).unwrap();
    assert_eq!(amf.config.ip_address.to_string(), "10.0.0.1");
    assert_eq!(amf.config.port, 7000);
    assert_eq!(amf.name, "AMF-2");
}
