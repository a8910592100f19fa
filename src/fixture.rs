//!
//! Declarative topology fixtures.
//!
//! A fixture lists buses, network functions and the links between them.
//! Entries reference each other by a fixture-local `key`.
//!
//! ```yaml
//! buses:
//!   - { key: sbi, name: SBI, length: 960 }
//! nfs:
//!   - { key: amf, type: AMF, ip: 192.168.70.132, port: 8080 }
//!   - { key: smf, type: SMF }
//! connections:
//!   - { source: amf, target: smf, interface: N11, protocol: HTTP/2 }
//! bus_links:
//!   - { nf: amf, bus: sbi, interface: Namf, protocol: HTTP/2 }
//! ```
//!

use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    net::Ipv4Addr,
    path::{Path, PathBuf},
};

use crate::{
    error::{Error, Result},
    model::{NfType, Orientation, Position},
};

static EMBEDDED: &str = include_str!("../fixtures/oai-5gc.yaml");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub buses: Vec<BusDef>,
    pub nfs: Vec<NfDef>,
    pub connections: Vec<ConnectionDef>,
    pub bus_links: Vec<BusLinkDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusDef {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default = "default_bus_length")]
    pub length: f64,
}

fn default_bus_length() -> f64 {
    800.0
}

/// The definition of a network function. Missing addresses are
/// assigned by the allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NfDef {
    pub key: String,
    #[serde(rename = "type")]
    pub nf_type: NfType,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub ip: Option<Ipv4Addr>,
    #[serde(default)]
    pub port: Option<u16>,
}

impl NfDef {
    /// A definition without addresses.
    #[must_use]
    pub fn bare(nf_type: NfType) -> Self {
        Self {
            key: nf_type.service_name().to_string(),
            nf_type,
            position: Position::default(),
            ip: None,
            port: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDef {
    pub source: String,
    pub target: String,
    pub interface: String,
    pub protocol: String,
}

impl ConnectionDef {
    fn touches(&self, key: &str) -> bool {
        self.source == key || self.target == key
    }

    /// Service based control plane traffic, which a shared bus carries.
    fn is_control_plane(&self) -> bool {
        let protocol = self.protocol.to_ascii_uppercase();
        protocol.starts_with("HTTP") || protocol == "SBI"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusLinkDef {
    pub nf: String,
    pub bus: String,
    pub interface: String,
    pub protocol: String,
}

impl Fixture {
    /// Parses and validates a YAML fixture.
    ///
    /// # Errors
    ///
    /// Fails on malformed YAML or dangling references.
    pub fn from_yaml(s: &str) -> Result<Self> {
        let fixture: Fixture = serde_yml::from_str(s)?;
        fixture.validate()?;
        Ok(fixture)
    }

    /// Reads, parses and validates a YAML fixture file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| Error::from(e).context(path.display()))?;
        Self::from_yaml(&raw).map_err(|e| e.context(path.display()))
    }

    /// The demo topology shipped with the crate.
    ///
    /// # Errors
    ///
    /// Fails only if the embedded document is broken.
    pub fn embedded() -> Result<Self> {
        Self::from_yaml(EMBEDDED)
    }

    /// The fixed default set used when no fixture can be fetched:
    /// one entity of every core type, no addresses, no links.
    #[must_use]
    pub fn fallback() -> Self {
        Fixture {
            nfs: NfType::ALL
                .into_iter()
                .filter(|t| !t.is_radio_access())
                .map(NfDef::bare)
                .collect(),
            ..Fixture::default()
        }
    }

    ///
    /// Checks keys and references.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error describing the first problem found.
    ///
    pub fn validate(&self) -> Result<()> {
        let mut nf_keys = FxHashSet::default();
        for nf in &self.nfs {
            if !nf_keys.insert(nf.key.as_str()) {
                return Err(Error::validation(format!("duplicate nf key '{}'", nf.key)));
            }
            if nf.port == Some(0) {
                return Err(Error::validation(format!("{}: invalid port 0", nf.key)));
            }
        }

        let mut bus_keys = FxHashSet::default();
        for bus in &self.buses {
            if !bus_keys.insert(bus.key.as_str()) {
                return Err(Error::validation(format!("duplicate bus key '{}'", bus.key)));
            }
        }

        let check_nf = |key: &str| {
            if nf_keys.contains(key) {
                Ok(())
            } else {
                Err(Error::validation(format!("unknown nf key '{key}'")))
            }
        };

        for con in &self.connections {
            check_nf(&con.source)?;
            check_nf(&con.target)?;
        }
        for link in &self.bus_links {
            check_nf(&link.nf)?;
            if !bus_keys.contains(link.bus.as_str()) {
                return Err(Error::validation(format!("unknown bus key '{}'", link.bus)));
            }
        }

        let mut addresses = FxHashSet::default();
        let mut ports = FxHashSet::default();
        for nf in &self.nfs {
            if let Some(ip) = nf.ip {
                if !addresses.insert(ip) {
                    return Err(Error::validation(format!("{}: address {ip} used twice", nf.key)));
                }
            }
            if let Some(port) = nf.port {
                if !ports.insert(port) {
                    return Err(Error::validation(format!("{}: port {port} used twice", nf.key)));
                }
            }
        }
        Ok(())
    }

    /// The first definition of a type.
    #[must_use]
    pub fn nf_def(&self, nf_type: NfType) -> Option<&NfDef> {
        self.nfs.iter().find(|nf| nf.nf_type == nf_type)
    }

    #[must_use]
    pub fn nf_by_key(&self, key: &str) -> Option<&NfDef> {
        self.nfs.iter().find(|nf| nf.key == key)
    }

    #[must_use]
    pub fn bus_by_key(&self, key: &str) -> Option<&BusDef> {
        self.buses.iter().find(|bus| bus.key == key)
    }

    /// The distinct types defined, in definition order.
    #[must_use]
    pub fn types(&self) -> Vec<NfType> {
        let mut seen = FxHashSet::default();
        self.nfs
            .iter()
            .map(|nf| nf.nf_type)
            .filter(|t| seen.insert(*t))
            .collect()
    }

    ///
    /// The core network part of the fixture.
    ///
    /// Drops radio access entities and every link touching them, direct
    /// control plane connections between two entities that share a bus,
    /// and duplicate links.
    ///
    #[must_use]
    pub fn without_radio_access(&self) -> Self {
        let excluded = self
            .nfs
            .iter()
            .filter(|nf| nf.nf_type.is_radio_access())
            .map(|nf| nf.key.as_str())
            .collect::<FxHashSet<_>>();

        let bus_links = {
            let mut seen = FxHashSet::default();
            self.bus_links
                .iter()
                .filter(|link| !excluded.contains(link.nf.as_str()))
                .filter(|link| seen.insert((link.nf.as_str(), link.bus.as_str())))
                .cloned()
                .collect::<Vec<_>>()
        };

        let share_bus = |a: &str, b: &str| {
            bus_links.iter().any(|la| {
                la.nf == a && bus_links.iter().any(|lb| lb.nf == b && lb.bus == la.bus)
            })
        };

        let mut seen = FxHashSet::default();
        let connections = self
            .connections
            .iter()
            .filter(|con| !excluded.iter().any(|key| con.touches(key)))
            .filter(|con| !(con.is_control_plane() && share_bus(&con.source, &con.target)))
            .filter(|con| {
                let (a, b) = if con.source <= con.target {
                    (con.source.as_str(), con.target.as_str())
                } else {
                    (con.target.as_str(), con.source.as_str())
                };
                seen.insert((a, b, con.interface.as_str()))
            })
            .cloned()
            .collect();

        Fixture {
            buses: self.buses.clone(),
            nfs: self
                .nfs
                .iter()
                .filter(|nf| !excluded.contains(nf.key.as_str()))
                .cloned()
                .collect(),
            connections,
            bus_links,
        }
    }
}

/// Where a fixture is fetched from.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FixtureSource {
    /// The demo topology shipped with the crate.
    #[default]
    Embedded,
    Path(PathBuf),
    Inline(String),
}

impl FixtureSource {
    /// Fetches and validates the fixture.
    ///
    /// # Errors
    ///
    /// Returns an `ExternalResource` error if the fixture cannot be read
    /// or parsed, a `Validation` error if it is inconsistent.
    pub fn fetch(&self) -> Result<Fixture> {
        match self {
            FixtureSource::Embedded => Fixture::embedded(),
            FixtureSource::Path(path) => Fixture::load(path),
            FixtureSource::Inline(yaml) => Fixture::from_yaml(yaml),
        }
    }
}

impl From<Option<PathBuf>> for FixtureSource {
    fn from(path: Option<PathBuf>) -> Self {
        path.map_or(FixtureSource::Embedded, FixtureSource::Path)
    }
}
