//!
//! The entities of a simulated 5G core topology.
//!
//! All entities are owned by the [`TopologyStore`](crate::store::TopologyStore).
//! Components never keep copies of them across events, they fetch them
//! again before acting.
//!

use serde::{Deserialize, Serialize};
use std::{fmt::Display, net::Ipv4Addr, str::FromStr};

use crate::{
    error::{Error, Result},
    time::SimTime,
};

mod nf_type;
pub use self::nf_type::*;

macro_rules! entity_id {
    ($($(#[$meta:meta])* $name:ident => $prefix:literal),* $(,)?) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            /// The raw store key.
            #[must_use]
            pub fn raw(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    )*};
}

entity_id! {
    /// The key of a [`NetworkFunction`].
    NfId => "nf",
    /// The key of a [`Connection`].
    ConnectionId => "con",
    /// The key of a [`Bus`].
    BusId => "bus",
    /// The key of a [`BusConnection`].
    BusConnectionId => "buscon",
    /// A terminal session of a simulation.
    ConsoleId => "console",
}

/// The lifecycle state of a network function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NfStatus {
    Starting,
    Stable,
    Stopped,
}

impl Display for NfStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            NfStatus::Starting => "starting",
            NfStatus::Stable => "stable",
            NfStatus::Stopped => "stopped",
        })
    }
}

/// The HTTP version used on service based interfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpProtocol {
    #[serde(rename = "HTTP/1")]
    Http1,
    #[default]
    #[serde(rename = "HTTP/2")]
    Http2,
}

impl Display for HttpProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            HttpProtocol::Http1 => "HTTP/1",
            HttpProtocol::Http2 => "HTTP/2",
        })
    }
}

impl FromStr for HttpProtocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "HTTP/1" | "HTTP/1.1" | "HTTP1" | "1" => Ok(HttpProtocol::Http1),
            "HTTP/2" | "HTTP2" | "2" => Ok(HttpProtocol::Http2),
            _ => Err(Error::validation(format!(
                "unknown http protocol '{s}', expected HTTP/1 or HTTP/2"
            ))),
        }
    }
}

/// A point on the canvas. Presentation only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The addressing configuration of a network function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NfConfig {
    pub ip_address: Ipv4Addr,
    pub port: u16,
    pub http_protocol: HttpProtocol,
}

/// Parses a textual IPv4 address.
///
/// # Errors
///
/// Returns a `Validation` error if `s` is not a dotted quad.
pub fn parse_address(s: &str) -> Result<Ipv4Addr> {
    s.trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| Error::validation(format!("invalid IPv4 address '{s}'")))
}

/// Checks that `port` lies in 1..=65535.
///
/// # Errors
///
/// Returns a `Validation` error otherwise.
pub fn parse_port(port: u32) -> Result<u16> {
    match u16::try_from(port) {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(Error::validation(format!(
            "invalid port {port}, expected 1-65535"
        ))),
    }
}

/// The /24 prefix of an address.
#[must_use]
pub fn subnet_of(addr: Ipv4Addr) -> [u8; 3] {
    let [a, b, c, _] = addr.octets();
    [a, b, c]
}

/// A simulated 5G core network function.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkFunction {
    pub id: NfId,
    pub nf_type: NfType,
    pub name: String,
    pub position: Position,
    pub config: NfConfig,
    pub status: NfStatus,
    pub status_timestamp: SimTime,
    pub created_at: SimTime,
}

impl NetworkFunction {
    #[must_use]
    pub fn service_name(&self) -> &'static str {
        self.nf_type.service_name()
    }

    #[must_use]
    pub fn subnet(&self) -> [u8; 3] {
        subnet_of(self.config.ip_address)
    }

    #[must_use]
    pub fn shares_subnet(&self, addr: Ipv4Addr) -> bool {
        self.subnet() == subnet_of(addr)
    }

    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.status == NfStatus::Stable
    }
}

/// The state of a logical link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Active,
    Inactive,
}

/// A directed logical link between two network functions.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub id: ConnectionId,
    pub source_id: NfId,
    pub target_id: NfId,
    pub interface_name: String,
    pub protocol: String,
    pub status: LinkStatus,
    pub is_manual: bool,
    pub created_at: SimTime,
}

impl Connection {
    /// Whether the connection links `a` and `b`, in either direction.
    #[must_use]
    pub fn joins(&self, a: NfId, b: NfId) -> bool {
        (self.source_id == a && self.target_id == b) || (self.source_id == b && self.target_id == a)
    }

    #[must_use]
    pub fn touches(&self, nf: NfId) -> bool {
        self.source_id == nf || self.target_id == nf
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

/// A shared service bus, connecting many network functions at once.
#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    pub id: BusId,
    pub name: String,
    pub position: Position,
    pub orientation: Orientation,
    pub length: f64,
}

/// The attachment of one network function to one bus.
#[derive(Debug, Clone, PartialEq)]
pub struct BusConnection {
    pub id: BusConnectionId,
    pub nf_id: NfId,
    pub bus_id: BusId,
    pub interface_name: String,
    pub protocol: String,
    pub status: LinkStatus,
    pub created_at: SimTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn address_validation() {
        assert_eq!(
            parse_address("192.168.1.20").unwrap(),
            Ipv4Addr::new(192, 168, 1, 20)
        );
        assert_eq!(parse_address("192.168.1").unwrap_err(), ErrorKind::Validation);
        assert_eq!(parse_address("300.1.1.1").unwrap_err(), ErrorKind::Validation);
    }

    #[test]
    fn port_validation() {
        assert_eq!(parse_port(8080).unwrap(), 8080);
        assert_eq!(parse_port(65535).unwrap(), 65535);
        assert_eq!(parse_port(0).unwrap_err(), ErrorKind::Validation);
        assert_eq!(parse_port(65536).unwrap_err(), ErrorKind::Validation);
    }

    #[test]
    fn protocols() {
        assert_eq!("http/1.1".parse::<HttpProtocol>().unwrap(), HttpProtocol::Http1);
        assert_eq!("HTTP/2".parse::<HttpProtocol>().unwrap(), HttpProtocol::Http2);
        assert!("spdy".parse::<HttpProtocol>().is_err());
        assert_eq!(HttpProtocol::default().to_string(), "HTTP/2");
    }

    #[test]
    fn subnets() {
        assert_eq!(subnet_of(Ipv4Addr::new(192, 168, 1, 20)), [192, 168, 1]);
        assert_ne!(
            subnet_of(Ipv4Addr::new(192, 168, 1, 20)),
            subnet_of(Ipv4Addr::new(192, 168, 2, 20))
        );
    }

    #[test]
    fn connection_direction() {
        let con = Connection {
            id: ConnectionId(1),
            source_id: NfId(1),
            target_id: NfId(2),
            interface_name: "N4".into(),
            protocol: "PFCP".into(),
            status: LinkStatus::Active,
            is_manual: false,
            created_at: SimTime::ZERO,
        };
        assert!(con.joins(NfId(2), NfId(1)));
        assert!(!con.joins(NfId(2), NfId(3)));
        assert_eq!(con.id.to_string(), "con#1");
    }
}
