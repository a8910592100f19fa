use serde::{de::Visitor, Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::{Error, Result};

///
/// The fixed set of network function types a topology may contain.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NfType {
    Nrf,
    Amf,
    Smf,
    Upf,
    Ausf,
    Udm,
    Udr,
    Pcf,
    Nssf,
    Gnb,
    Ue,
    Mysql,
    ExtDn,
}

use NfType::*;

impl NfType {
    /// Every type, in canonical order.
    pub const ALL: [NfType; 13] = [
        Nrf, Amf, Smf, Upf, Ausf, Udm, Udr, Pcf, Nssf, Gnb, Ue, Mysql, ExtDn,
    ];

    /// The display name, as used in entity names like `AMF-1`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Nrf => "NRF",
            Amf => "AMF",
            Smf => "SMF",
            Upf => "UPF",
            Ausf => "AUSF",
            Udm => "UDM",
            Udr => "UDR",
            Pcf => "PCF",
            Nssf => "NSSF",
            Gnb => "gNB",
            Ue => "UE",
            Mysql => "MySQL",
            ExtDn => "ext-dn",
        }
    }

    /// The compose service name of the type.
    #[must_use]
    pub const fn service_name(self) -> &'static str {
        match self {
            Nrf => "oai-nrf",
            Amf => "oai-amf",
            Smf => "oai-smf",
            Upf => "oai-upf",
            Ausf => "oai-ausf",
            Udm => "oai-udm",
            Udr => "oai-udr",
            Pcf => "oai-pcf",
            Nssf => "oai-nssf",
            Gnb => "oai-gnb",
            Ue => "oai-nr-ue",
            Mysql => "mysql",
            ExtDn => "oai-ext-dn",
        }
    }

    /// The name of the service based interface the type exposes on a bus.
    #[must_use]
    pub const fn sbi_interface(self) -> &'static str {
        match self {
            Nrf => "Nnrf",
            Amf => "Namf",
            Smf => "Nsmf",
            Ausf => "Nausf",
            Udm => "Nudm",
            Udr => "Nudr",
            Pcf => "Npcf",
            Nssf => "Nnssf",
            Upf | Gnb | Ue | Mysql | ExtDn => "SBI",
        }
    }

    /// Resolves a compose service name, e.g. `oai-nrf`.
    #[must_use]
    pub fn from_service_name(name: &str) -> Option<NfType> {
        Self::ALL
            .into_iter()
            .find(|typ| typ.service_name().eq_ignore_ascii_case(name))
    }

    /// Resolves either a service name or a display name.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error naming the service if neither matches.
    pub fn resolve(name: &str) -> Result<NfType> {
        Self::from_service_name(name)
            .or_else(|| name.parse().ok())
            .ok_or_else(|| Error::not_found(format!("no such service: {name}")))
    }

    /// Radio access types are not part of the core deployment.
    #[must_use]
    pub const fn is_radio_access(self) -> bool {
        matches!(self, Gnb | Ue)
    }

    /// Types that are never attached to a service bus automatically.
    #[must_use]
    pub const fn is_bus_excluded(self) -> bool {
        matches!(self, Upf | Gnb | Ue)
    }
}

impl Display for NfType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NfType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|typ| typ.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::validation(format!("unknown network function type '{s}'")))
    }
}

impl Serialize for NfType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NfType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct NfTypeVisitor;
        impl Visitor<'_> for NfTypeVisitor {
            type Value = NfType;
            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a network function type like 'AMF' or 'ext-dn'")
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(NfTypeVisitor)
    }
}
