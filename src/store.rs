//!
//! The in-memory topology store.
//!
//! The store owns every entity of the simulated topology in four keyed
//! collections. Keys are drawn from a single counter and never reused,
//! so a stale key can never point to a newer entity. Writes are
//! whole-entity replacements. Every write is announced to all
//! subscribers.
//!

use fxhash::{FxHashMap, FxHashSet};
use std::{
    collections::BTreeMap,
    fmt::{Debug, Display},
    net::Ipv4Addr,
    sync::mpsc::{self, Receiver, Sender},
};

use crate::{
    error::{Error, Result},
    model::{
        Bus, BusConnection, BusConnectionId, BusId, Connection, ConnectionId, NetworkFunction,
        NfId, NfType,
    },
};

/// The four kinds of entities a topology consists of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    NetworkFunction,
    Connection,
    Bus,
    BusConnection,
}

/// A change of a single entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Added,
    Updated,
    Removed,
}

/// A change notification, as delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreEvent {
    pub kind: EntityKind,
    pub id: u64,
    pub change: Change,
}

/// An entity that lives in a [`TopologyStore`].
pub trait Entity: Clone + Debug + 'static {
    type Id: Key<Entity = Self>;
    const KIND: EntityKind;

    fn id(&self) -> Self::Id;

    fn collection(store: &TopologyStore) -> &Collection<Self>;
    fn collection_mut(store: &mut TopologyStore) -> &mut Collection<Self>;
}

/// The key of an [`Entity`].
pub trait Key: Copy + Ord + Display + Debug + From<u64> + Into<u64> + 'static {
    type Entity: Entity<Id = Self>;
}

/// All entities of one kind, ordered by key and thus by creation.
pub struct Collection<T: Entity> {
    items: BTreeMap<T::Id, T>,
}

impl<T: Entity> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }
}

impl<T: Entity> Debug for Collection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.items.values()).finish()
    }
}

macro_rules! entity {
    ($typ:ty, $id:ty, $kind:ident, $field:ident) => {
        impl Entity for $typ {
            type Id = $id;
            const KIND: EntityKind = EntityKind::$kind;

            fn id(&self) -> $id {
                self.id
            }

            fn collection(store: &TopologyStore) -> &Collection<Self> {
                &store.$field
            }

            fn collection_mut(store: &mut TopologyStore) -> &mut Collection<Self> {
                &mut store.$field
            }
        }

        impl Key for $id {
            type Entity = $typ;
        }
    };
}

entity!(NetworkFunction, NfId, NetworkFunction, nfs);
entity!(Connection, ConnectionId, Connection, connections);
entity!(Bus, BusId, Bus, buses);
entity!(BusConnection, BusConnectionId, BusConnection, bus_connections);

///
/// The single shared mutable resource of a simulation.
///
#[derive(Debug, Default)]
pub struct TopologyStore {
    nfs: Collection<NetworkFunction>,
    connections: Collection<Connection>,
    buses: Collection<Bus>,
    bus_connections: Collection<BusConnection>,

    next_key: u64,
    name_counters: FxHashMap<NfType, u32>,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl TopologyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws a fresh key. Keys are unique across all kinds.
    pub fn next_id<K: Key>(&mut self) -> K {
        self.next_key += 1;
        K::from(self.next_key)
    }

    /// Generates the next display name for a type, like `AMF-3`.
    /// Counters are never reset, so names are not reused either.
    pub fn next_name(&mut self, typ: NfType) -> String {
        let counter = self.name_counters.entry(typ).or_insert(0);
        *counter += 1;
        format!("{typ}-{counter}")
    }

    /// Registers a new subscriber for change notifications.
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, kind: EntityKind, id: u64, change: Change) {
        let event = StoreEvent { kind, id, change };
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    ///
    /// Inserts a new entity.
    ///
    /// # Errors
    ///
    /// Returns a `Conflict` error if the key is already taken.
    ///
    pub fn add<T: Entity>(&mut self, entity: T) -> Result<T::Id> {
        let id = entity.id();
        let items = &mut T::collection_mut(self).items;
        if items.contains_key(&id) {
            return Err(Error::conflict(format!("{id} already exists")));
        }
        items.insert(id, entity);
        self.notify(T::KIND, id.into(), Change::Added);
        Ok(id)
    }

    ///
    /// Replaces an existing entity as a whole.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error if no entity with that key exists.
    ///
    pub fn update<T: Entity>(&mut self, entity: T) -> Result<()> {
        let id = entity.id();
        match T::collection_mut(self).items.get_mut(&id) {
            Some(slot) => *slot = entity,
            None => return Err(Error::not_found(format!("{id} does not exist"))),
        }
        self.notify(T::KIND, id.into(), Change::Updated);
        Ok(())
    }

    /// Removes an entity, returning it if it existed.
    pub fn remove<K: Key>(&mut self, id: K) -> Option<K::Entity> {
        let entity = <K::Entity as Entity>::collection_mut(self).items.remove(&id)?;
        self.notify(<K::Entity as Entity>::KIND, id.into(), Change::Removed);
        Some(entity)
    }

    #[must_use]
    pub fn get<K: Key>(&self, id: K) -> Option<&K::Entity> {
        <K::Entity as Entity>::collection(self).items.get(&id)
    }

    #[must_use]
    pub fn contains<K: Key>(&self, id: K) -> bool {
        self.get(id).is_some()
    }

    /// All entities of a kind, in creation order.
    pub fn all<T: Entity>(&self) -> impl Iterator<Item = &T> + '_ {
        T::collection(self).items.values()
    }

    #[must_use]
    pub fn count<T: Entity>(&self) -> usize {
        T::collection(self).items.len()
    }

    pub fn nfs(&self) -> impl Iterator<Item = &NetworkFunction> + '_ {
        self.all::<NetworkFunction>()
    }

    /// Whether the store holds no entities at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nfs.items.is_empty()
            && self.connections.items.is_empty()
            && self.buses.items.is_empty()
            && self.bus_connections.items.is_empty()
    }

    /// The oldest network function of a type.
    #[must_use]
    pub fn nf_by_type(&self, typ: NfType) -> Option<&NetworkFunction> {
        self.nfs().find(|nf| nf.nf_type == typ)
    }

    #[must_use]
    pub fn nf_by_address(&self, addr: Ipv4Addr) -> Option<&NetworkFunction> {
        self.nfs().find(|nf| nf.config.ip_address == addr)
    }

    #[must_use]
    pub fn nf_by_name(&self, name: &str) -> Option<&NetworkFunction> {
        self.nfs().find(|nf| nf.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn types_present(&self) -> FxHashSet<NfType> {
        self.nfs().map(|nf| nf.nf_type).collect()
    }

    #[must_use]
    pub fn addresses_in_use(&self) -> FxHashSet<Ipv4Addr> {
        self.nfs().map(|nf| nf.config.ip_address).collect()
    }

    #[must_use]
    pub fn ports_in_use(&self) -> FxHashSet<u16> {
        self.nfs().map(|nf| nf.config.port).collect()
    }

    /// The first bus, in creation order.
    #[must_use]
    pub fn first_bus(&self) -> Option<&Bus> {
        self.all::<Bus>().next()
    }

    /// Every connection and bus connection touching an NF.
    #[must_use]
    pub fn links_of(&self, nf: NfId) -> (Vec<ConnectionId>, Vec<BusConnectionId>) {
        let connections = self
            .all::<Connection>()
            .filter(|con| con.touches(nf))
            .map(|con| con.id)
            .collect();
        let bus_connections = self
            .all::<BusConnection>()
            .filter(|con| con.nf_id == nf)
            .map(|con| con.id)
            .collect();
        (connections, bus_connections)
    }

    /// Removes every link touching an NF. Returns the number of
    /// removed links.
    pub fn detach(&mut self, nf: NfId) -> usize {
        let (connections, bus_connections) = self.links_of(nf);
        let n = connections.len() + bus_connections.len();
        for id in connections {
            self.remove(id);
        }
        for id in bus_connections {
            self.remove(id);
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKind,
        model::{HttpProtocol, LinkStatus, NfConfig, NfStatus, Orientation, Position},
        time::SimTime,
    };

    fn nf(store: &mut TopologyStore, typ: NfType, host: u8) -> NfId {
        let id = store.next_id();
        let name = store.next_name(typ);
        store
            .add(NetworkFunction {
                id,
                nf_type: typ,
                name,
                position: Position::default(),
                config: NfConfig {
                    ip_address: Ipv4Addr::new(192, 168, 1, host),
                    port: 8000 + u16::from(host),
                    http_protocol: HttpProtocol::Http2,
                },
                status: NfStatus::Starting,
                status_timestamp: SimTime::ZERO,
                created_at: SimTime::ZERO,
            })
            .unwrap()
    }

    #[test]
    fn crud_with_notifications() {
        let mut store = TopologyStore::new();
        let rx = store.subscribe();

        let amf = nf(&mut store, NfType::Amf, 10);
        assert_eq!(store.get(amf).unwrap().name, "AMF-1");

        let mut updated = store.get(amf).unwrap().clone();
        updated.status = NfStatus::Stable;
        store.update(updated).unwrap();
        assert!(store.get(amf).unwrap().is_stable());

        assert!(store.remove(amf).is_some());
        assert!(store.remove(amf).is_none());

        let events = rx.try_iter().map(|e| e.change).collect::<Vec<_>>();
        assert_eq!(events, vec![Change::Added, Change::Updated, Change::Removed]);
    }

    #[test]
    fn update_of_missing_entity() {
        let mut store = TopologyStore::new();
        let amf = nf(&mut store, NfType::Amf, 10);
        let ghost = store.remove(amf).unwrap();
        assert_eq!(store.update(ghost).unwrap_err(), ErrorKind::NotFound);
        assert!(store.is_empty());
    }

    #[test]
    fn keys_and_names_are_not_reused() {
        let mut store = TopologyStore::new();
        let a = nf(&mut store, NfType::Smf, 10);
        store.remove(a);
        let b = nf(&mut store, NfType::Smf, 10);
        assert_ne!(a, b);
        assert_eq!(store.get(b).unwrap().name, "SMF-2");
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut store = TopologyStore::new();
        let rx = store.subscribe();
        drop(rx);
        nf(&mut store, NfType::Nrf, 10);
        assert!(store.subscribers.is_empty());
    }

    #[test]
    fn lookups() {
        let mut store = TopologyStore::new();
        let smf = nf(&mut store, NfType::Smf, 10);
        let upf = nf(&mut store, NfType::Upf, 11);

        assert_eq!(store.nf_by_type(NfType::Upf).unwrap().id, upf);
        assert_eq!(
            store.nf_by_address(Ipv4Addr::new(192, 168, 1, 10)).unwrap().id,
            smf
        );
        assert!(store.nf_by_name("upf-1").is_some());
        assert!(store.ports_in_use().contains(&8011));
        assert_eq!(store.types_present().len(), 2);
    }

    #[test]
    fn detach_removes_all_links() {
        let mut store = TopologyStore::new();
        let smf = nf(&mut store, NfType::Smf, 10);
        let upf = nf(&mut store, NfType::Upf, 11);
        let bus: BusId = store.next_id();
        store
            .add(Bus {
                id: bus,
                name: "SBI".into(),
                position: Position::default(),
                orientation: Orientation::Horizontal,
                length: 800.0,
            })
            .unwrap();
        let id = store.next_id();
        store
            .add(Connection {
                id,
                source_id: upf,
                target_id: smf,
                interface_name: "N4".into(),
                protocol: "PFCP".into(),
                status: LinkStatus::Active,
                is_manual: false,
                created_at: SimTime::ZERO,
            })
            .unwrap();
        let id = store.next_id();
        store
            .add(BusConnection {
                id,
                nf_id: smf,
                bus_id: bus,
                interface_name: "Nsmf".into(),
                protocol: "HTTP/2".into(),
                status: LinkStatus::Active,
                created_at: SimTime::ZERO,
            })
            .unwrap();

        assert_eq!(store.detach(smf), 2);
        assert_eq!(store.count::<Connection>(), 0);
        assert_eq!(store.count::<BusConnection>(), 0);
        assert_eq!(store.count::<Bus>(), 1);
        assert_eq!(store.detach(upf), 0);
    }
}
