//!
//! Automatic wiring of network functions.
//!
//! All rules are idempotent. A link is only inserted if no equivalent
//! link exists yet.
//!

use crate::{
    error::{Error, Result},
    model::{
        BusConnection, BusConnectionId, BusId, Connection, ConnectionId, LinkStatus, NfId, NfType,
    },
    store::TopologyStore,
    time::SimTime,
};

/// The UPF to SMF control interface.
pub const N4: (&str, &str) = ("N4", "PFCP");
/// The data network to UPF user plane interface.
pub const N6: (&str, &str) = ("N6", "IP");

///
/// Ensures a connection between two NFs exists for an interface, in
/// either direction. Returns the existing or the new connection.
///
pub fn ensure_connection(
    store: &mut TopologyStore,
    source: NfId,
    target: NfId,
    (interface, protocol): (&str, &str),
    is_manual: bool,
    now: SimTime,
) -> ConnectionId {
    if let Some(existing) = store
        .all::<Connection>()
        .find(|con| con.joins(source, target) && con.interface_name == interface)
    {
        return existing.id;
    }

    let id = store.next_id();
    let con = Connection {
        id,
        source_id: source,
        target_id: target,
        interface_name: interface.to_string(),
        protocol: protocol.to_string(),
        status: LinkStatus::Active,
        is_manual,
        created_at: now,
    };
    tracing::debug!("connecting {source} -> {target} ({interface})");
    // fresh keys never collide
    let _ = store.add(con);
    id
}

/// Ensures an NF is attached to a bus. At most one attachment exists per
/// NF and bus.
pub fn ensure_bus_link(
    store: &mut TopologyStore,
    nf: NfId,
    bus: BusId,
    (interface, protocol): (&str, &str),
    now: SimTime,
) -> BusConnectionId {
    if let Some(existing) = store
        .all::<BusConnection>()
        .find(|link| link.nf_id == nf && link.bus_id == bus)
    {
        return existing.id;
    }

    let id = store.next_id();
    let link = BusConnection {
        id,
        nf_id: nf,
        bus_id: bus,
        interface_name: interface.to_string(),
        protocol: protocol.to_string(),
        status: LinkStatus::Active,
        created_at: now,
    };
    tracing::debug!("attaching {nf} to {bus} ({interface})");
    let _ = store.add(link);
    id
}

///
/// Attaches a newly created NF to the first bus of the topology.
///
/// Types that never join a bus, and topologies without a bus, are
/// skipped.
///
pub fn attach_to_first_bus(
    store: &mut TopologyStore,
    nf: NfId,
    now: SimTime,
) -> Option<BusConnectionId> {
    let entity = store.get(nf)?;
    if entity.nf_type.is_bus_excluded() {
        return None;
    }
    let interface = entity.nf_type.sbi_interface();
    let protocol = entity.config.http_protocol.to_string();
    let bus = store.first_bus()?.id;
    Some(ensure_bus_link(store, nf, bus, (interface, protocol.as_str()), now))
}

/// The peers of a UPF, as ensured by [`wire_upf`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpfPeers {
    pub smf: NfId,
    pub ext_dn: NfId,
    pub n4: ConnectionId,
    pub n6: ConnectionId,
}

///
/// Wires a stable UPF to its peers.
///
/// Ensures an SMF and a data network exist, creating missing ones through
/// `ensure_nf`, then ensures exactly one N4 connection UPF to SMF and one
/// N6 connection data network to UPF.
///
/// # Errors
///
/// Returns a `NotFound` error if the UPF does not exist, or any error of
/// `ensure_nf`.
///
pub fn wire_upf<F>(
    store: &mut TopologyStore,
    upf: NfId,
    now: SimTime,
    mut ensure_nf: F,
) -> Result<UpfPeers>
where
    F: FnMut(&mut TopologyStore, NfType) -> Result<NfId>,
{
    if !store.contains(upf) {
        return Err(Error::not_found(format!("{upf} does not exist")));
    }

    let mut peer = |store: &mut TopologyStore, typ: NfType| match store.nf_by_type(typ) {
        Some(nf) => Ok(nf.id),
        None => ensure_nf(store, typ),
    };
    let smf = peer(store, NfType::Smf)?;
    let ext_dn = peer(store, NfType::ExtDn)?;

    let n4 = ensure_connection(store, upf, smf, N4, false, now);
    let n6 = ensure_connection(store, ext_dn, upf, N6, false, now);
    Ok(UpfPeers {
        smf,
        ext_dn,
        n4,
        n6,
    })
}
