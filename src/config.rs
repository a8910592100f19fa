//!
//! Simulation parameters.
//!
//! A [`SimConfig`] can be written in YAML. Every field is optional,
//! missing fields take their default value.
//!
//! ```yaml
//! network_name: oai-public-net
//! http_protocol: HTTP/2
//! stabilization_delay: 5.0
//! startup_delay: { min: 0.3, max: 2.3 }
//! ping: { packets: 4, interval: 1.0 }
//! allocation:
//!   subnets: [192.168.1.0, 192.168.2.0]
//!   ports: { first: 8080, last: 9999 }
//! limits: { max_events: 100000, horizon: 3600.0 }
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{fs, net::Ipv4Addr, path::Path, path::PathBuf};

use crate::{
    error::{Error, Result},
    model::HttpProtocol,
    runtime::RuntimeLimit,
    time::{Duration, SimTime},
};

/// The complete set of simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// The name of the simulated compose network.
    pub network_name: String,
    /// The HTTP version applied to every network function.
    pub http_protocol: HttpProtocol,
    /// Seconds from `starting` to `stable`.
    pub stabilization_delay: f64,
    /// Per-entity delay of bring-up commands.
    pub startup_delay: DelayRange,
    /// Per-entity delay of tear-down commands.
    pub teardown_delay: DelayRange,
    /// Seconds a start or stop command takes.
    pub control_delay: f64,
    pub ping: PingConfig,
    pub allocation: AllocationPolicy,
    /// Bounds of the simulation run.
    pub limits: Limits,
    /// The topology fixture. The embedded demo topology is used if unset.
    pub fixture: Option<PathBuf>,
    /// A seed for the simulation RNG.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            network_name: "oai-public-net".to_string(),
            http_protocol: HttpProtocol::Http2,
            stabilization_delay: 5.0,
            startup_delay: DelayRange { min: 0.3, max: 2.3 },
            teardown_delay: DelayRange { min: 0.2, max: 0.8 },
            control_delay: 0.5,
            ping: PingConfig::default(),
            allocation: AllocationPolicy::default(),
            limits: Limits::default(),
            fixture: None,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Parses and validates a YAML configuration.
    ///
    /// # Errors
    ///
    /// Fails on malformed YAML or invalid parameters.
    pub fn from_yaml(s: &str) -> Result<Self> {
        let config: SimConfig = serde_yml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| Error::from(e).context(path.display()))?;
        Self::from_yaml(&raw).map_err(|e| e.context(path.display()))
    }

    /// Checks the parameters for consistency.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error naming the first invalid parameter.
    pub fn validate(&self) -> Result<()> {
        seconds("stabilization_delay", self.stabilization_delay)?;
        seconds("control_delay", self.control_delay)?;
        self.startup_delay.validate("startup_delay")?;
        self.teardown_delay.validate("teardown_delay")?;
        if self.ping.packets == 0 {
            return Err(Error::validation("ping.packets must be at least 1"));
        }
        seconds("ping.interval", self.ping.interval)?;
        if let Some(horizon) = self.limits.horizon {
            seconds("limits.horizon", horizon)?;
        }
        if self.limits.max_events == Some(0) {
            return Err(Error::validation("limits.max_events must be at least 1"));
        }
        self.allocation.validate()
    }

    #[must_use]
    pub fn stabilization_delay(&self) -> Duration {
        Duration::from_secs_f64(self.stabilization_delay)
    }

    #[must_use]
    pub fn control_delay(&self) -> Duration {
        Duration::from_secs_f64(self.control_delay)
    }

    /// The runtime limit described by `limits`.
    #[must_use]
    pub fn runtime_limit(&self) -> RuntimeLimit {
        RuntimeLimit {
            max_events: self.limits.max_events,
            horizon: self
                .limits
                .horizon
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .map(SimTime::from_duration),
        }
    }
}

/// Bounds of a simulation run. A long running session stops dispatching
/// once a bound is hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// The maximum number of dispatched events.
    pub max_events: Option<usize>,
    /// Seconds of simulated time after which no event is dispatched.
    pub horizon: Option<f64>,
}

/// Converts a parameter given in seconds, rejecting negative, NaN and
/// unrepresentable values.
fn seconds(name: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        Error::validation(format!(
            "{name} must be a non-negative number of seconds, got {secs}"
        ))
    })
}

/// A uniform distribution of delays, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min: f64,
    pub max: f64,
}

impl DelayRange {
    /// Draws a delay from `[min, max)`.
    pub fn sample(&self, rng: &mut impl Rng) -> Duration {
        let secs = if self.max > self.min {
            rng.random_range(self.min..self.max)
        } else {
            self.min
        };
        Duration::from_secs_f64(secs)
    }

    fn validate(&self, name: &str) -> Result<()> {
        seconds(name, self.min)?;
        seconds(name, self.max)?;
        if self.max < self.min {
            return Err(Error::validation(format!(
                "{name} must satisfy 0 <= min <= max, got {}..{}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PingConfig {
    /// Packets per ping target.
    pub packets: u32,
    /// Seconds between two packets.
    pub interval: f64,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            packets: 4,
            interval: 1.0,
        }
    }
}

impl PingConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval)
    }
}

/// The pools addresses and ports are taken from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllocationPolicy {
    /// /24 networks in priority order. Only the first three octets are used.
    pub subnets: Vec<Ipv4Addr>,
    /// The host part range within each subnet.
    pub hosts: HostRange,
    pub ports: PortRange,
    /// The /16 network used once all subnets are exhausted.
    pub reserved: Ipv4Addr,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            subnets: vec![
                Ipv4Addr::new(192, 168, 1, 0),
                Ipv4Addr::new(192, 168, 2, 0),
                Ipv4Addr::new(192, 168, 3, 0),
                Ipv4Addr::new(192, 168, 4, 0),
            ],
            hosts: HostRange {
                first: 10,
                last: 254,
            },
            ports: PortRange {
                first: 8080,
                last: 9999,
            },
            reserved: Ipv4Addr::new(10, 254, 0, 0),
        }
    }
}

impl AllocationPolicy {
    fn validate(&self) -> Result<()> {
        if self.subnets.is_empty() {
            return Err(Error::validation("allocation.subnets must not be empty"));
        }
        if self.hosts.first == 0 || self.hosts.first > self.hosts.last || self.hosts.last == 255 {
            return Err(Error::validation(format!(
                "allocation.hosts must lie in 1..=254, got {}..={}",
                self.hosts.first, self.hosts.last
            )));
        }
        if self.ports.first == 0 || self.ports.first > self.ports.last {
            return Err(Error::validation(format!(
                "allocation.ports must be a non-empty range, got {}..={}",
                self.ports.first, self.ports.last
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRange {
    pub first: u8,
    pub last: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub first: u16,
    pub last: u16,
}
