//!
//! Probabilistic reachability between addressed entities.
//!
//! Every simulated packet is an independent Bernoulli trial. The success
//! probability depends on whether the target is a managed entity, whether
//! it shares the source's /24 and whether both ends are stable.
//!
//! Pings run as sessions of [`PingProbe`] events, one packet per probe,
//! spaced by the configured interval. At most one session per source is
//! in flight.
//!

use fxhash::FxHashMap;
use rand::Rng;
use std::{collections::VecDeque, fmt::Display, net::Ipv4Addr};

use crate::{
    config::PingConfig,
    error::{Error, Result},
    model::{subnet_of, ConsoleId, NetworkFunction, NfId},
    runtime::EventSink,
    store::TopologyStore,
    time::SimTime,
};

/// The reachability class of a source and target pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Path {
    /// No entity owns the target address.
    Unmanaged,
    /// The target lies in another /24.
    CrossSubnet,
    /// Same /24, but one end is not stable.
    NotStable,
    /// Same /24, both ends stable.
    Healthy,
}

impl Path {
    /// The per-packet success probability.
    #[must_use]
    pub const fn probability(self) -> f64 {
        match self {
            Path::Unmanaged => 0.10,
            Path::CrossSubnet => 0.20,
            Path::NotStable => 0.30,
            Path::Healthy => 0.90,
        }
    }

    #[must_use]
    pub fn classify(store: &TopologyStore, source: &NetworkFunction, target: Ipv4Addr) -> Path {
        let Some(target) = store.nf_by_address(target) else {
            return Path::Unmanaged;
        };
        if source.subnet() != target.subnet() {
            Path::CrossSubnet
        } else if !source.is_stable() || !target.is_stable() {
            Path::NotStable
        } else {
            Path::Healthy
        }
    }
}

/// Evaluates a single packet from `source` to `target`.
pub fn is_reachable(
    store: &TopologyStore,
    source: &NetworkFunction,
    target: Ipv4Addr,
    rng: &mut impl Rng,
) -> bool {
    rng.random_bool(Path::classify(store, source, target).probability())
}

/// Samples the round trip time of a successful packet, in milliseconds.
/// The result lies in `[1, 56]`.
pub fn sample_rtt(rng: &mut impl Rng) -> u32 {
    let base: f64 = rng.random_range(1.0..51.0);
    let jitter: f64 = rng.random_range(-5.0..5.0);
    (base + jitter).round().max(1.0) as u32
}

/// How a ping treats targets outside the source's /24.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingMode {
    /// Every target is probed, cross-subnet ones at their own probability.
    Raw,
    /// Cross-subnet targets fail at once, no packet is sent.
    SubnetRestricted,
}

/// The statistics of pinging one target.
#[derive(Debug, Clone, PartialEq)]
pub struct PingStats {
    pub target: Ipv4Addr,
    pub sent: u32,
    pub received: u32,
    /// Round trip times of the received packets, in milliseconds.
    pub rtts: Vec<u32>,
}

impl PingStats {
    #[must_use]
    pub fn new(target: Ipv4Addr) -> Self {
        Self {
            target,
            sent: 0,
            received: 0,
            rtts: Vec::new(),
        }
    }

    /// The result of a ping that could not transmit anything.
    #[must_use]
    pub fn transmit_failed(target: Ipv4Addr, packets: u32) -> Self {
        Self {
            sent: packets,
            ..Self::new(target)
        }
    }

    fn record(&mut self, rtt: Option<u32>) {
        self.sent += 1;
        if let Some(rtt) = rtt {
            self.received += 1;
            self.rtts.push(rtt);
        }
    }

    #[must_use]
    pub fn failed(&self) -> u32 {
        self.sent - self.received
    }

    /// `round(100 * failed / sent)`, 0 if nothing was sent.
    #[must_use]
    pub fn loss_percent(&self) -> u32 {
        if self.sent == 0 {
            return 0;
        }
        (100.0 * f64::from(self.failed()) / f64::from(self.sent)).round() as u32
    }

    #[must_use]
    pub fn min_rtt(&self) -> Option<u32> {
        self.rtts.iter().copied().min()
    }

    #[must_use]
    pub fn max_rtt(&self) -> Option<u32> {
        self.rtts.iter().copied().max()
    }

    #[must_use]
    pub fn avg_rtt(&self) -> Option<f64> {
        if self.rtts.is_empty() {
            return None;
        }
        Some(self.rtts.iter().map(|&rtt| f64::from(rtt)).sum::<f64>() / self.rtts.len() as f64)
    }

    /// The closing lines of a ping report.
    #[must_use]
    pub fn summary(&self) -> Vec<String> {
        let mut lines = vec![
            format!("--- {} ping statistics ---", self.target),
            format!(
                "{} packets transmitted, {} received, {}% packet loss",
                self.sent,
                self.received,
                self.loss_percent()
            ),
        ];
        if let (Some(min), Some(avg), Some(max)) = (self.min_rtt(), self.avg_rtt(), self.max_rtt())
        {
            lines.push(format!("rtt min/avg/max = {min}/{avg:.3}/{max} ms"));
        }
        lines
    }
}

impl Display for PingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}/{} received, {}% loss",
            self.target,
            self.received,
            self.sent,
            self.loss_percent()
        )
    }
}

/// The next packet of a ping session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingProbe {
    pub source: NfId,
    pub session: u64,
}

/// Output produced by a ping session.
#[derive(Debug, Default)]
pub struct PingReport {
    pub console: ConsoleId,
    pub lines: Vec<String>,
    /// Targets that completed.
    pub finished: Vec<PingStats>,
    /// Whether the session is over.
    pub done: bool,
    /// The probe to schedule next, if the session continues.
    pub next: Option<(PingProbe, SimTime)>,
}

#[derive(Debug)]
struct Session {
    id: u64,
    console: ConsoleId,
    targets: VecDeque<Ipv4Addr>,
    current: PingStats,
}

/// Runs ping sessions.
#[derive(Debug)]
pub struct Reachability {
    config: PingConfig,
    sessions: FxHashMap<NfId, Session>,
    next_session: u64,
}

impl Reachability {
    #[must_use]
    pub fn new(config: PingConfig) -> Self {
        Self {
            config,
            sessions: FxHashMap::default(),
            next_session: 0,
        }
    }

    /// Whether any session is in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.sessions.is_empty()
    }

    #[must_use]
    pub fn in_flight(&self, source: NfId) -> bool {
        self.sessions.contains_key(&source)
    }

    ///
    /// Starts pinging `targets` from `source`, one target after another.
    ///
    /// In [`PingMode::SubnetRestricted`], targets outside the source's
    /// /24 are reported as failed at once. The returned report holds
    /// those results and the header of the first probed target.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error if the source does not exist and a
    /// `State` error if the source is still pinging.
    ///
    #[allow(clippy::too_many_arguments)]
    pub fn begin<E>(
        &mut self,
        store: &TopologyStore,
        source: NfId,
        console: ConsoleId,
        targets: Vec<Ipv4Addr>,
        mode: PingMode,
        now: SimTime,
        sink: &mut impl EventSink<E>,
    ) -> Result<PingReport>
    where
        E: From<PingProbe>,
    {
        let source_nf = store
            .get(source)
            .ok_or_else(|| Error::not_found(format!("ping source {source} does not exist")))?;
        if self.in_flight(source) {
            return Err(Error::state(format!(
                "{} is still pinging, wait for the running ping to finish",
                source_nf.name
            )));
        }

        let mut report = PingReport {
            console,
            ..PingReport::default()
        };
        let mut probed = VecDeque::new();
        for target in targets {
            if mode == PingMode::SubnetRestricted && !source_nf.shares_subnet(target) {
                let stats = PingStats::transmit_failed(target, self.config.packets);
                let [a, b, c] = source_nf.subnet();
                report.lines.push(header(store, target, self.config.packets));
                report.lines.push(format!(
                    "ping: transmit failed, {target} is outside of {a}.{b}.{c}.0/24"
                ));
                report.lines.extend(stats.summary());
                report.finished.push(stats);
            } else {
                probed.push_back(target);
            }
        }

        let Some(first) = probed.pop_front() else {
            report.done = true;
            return Ok(report);
        };

        self.next_session += 1;
        let id = self.next_session;
        report.lines.push(header(store, first, self.config.packets));
        self.sessions.insert(
            source,
            Session {
                id,
                console,
                targets: probed,
                current: PingStats::new(first),
            },
        );
        sink.add(PingProbe { source, session: id }.into(), now);
        tracing::debug!("{} pings {first} (session {id})", source_nf.name);
        Ok(report)
    }

    ///
    /// Sends the next packet of a session. Returns `None` for probes of
    /// sessions that no longer exist.
    ///
    pub fn probe(
        &mut self,
        store: &TopologyStore,
        probe: PingProbe,
        now: SimTime,
        rng: &mut impl Rng,
    ) -> Option<PingReport> {
        let session = self.sessions.get_mut(&probe.source)?;
        if session.id != probe.session {
            return None;
        }

        let mut report = PingReport {
            console: session.console,
            ..PingReport::default()
        };

        let Some(source) = store.get(probe.source) else {
            report
                .lines
                .push(format!("ping: source {} was removed", probe.source));
            report.done = true;
            self.sessions.remove(&probe.source);
            return Some(report);
        };

        let target = session.current.target;
        let seq = session.current.sent + 1;
        let rtt = is_reachable(store, source, target, rng).then(|| sample_rtt(rng));
        session.current.record(rtt);
        report.lines.push(match rtt {
            Some(rtt) => format!("64 bytes from {target}: icmp_seq={seq} time={rtt} ms"),
            None => format!("Request timeout for icmp_seq {seq}"),
        });

        if session.current.sent >= self.config.packets {
            report.lines.extend(session.current.summary());
            match session.targets.pop_front() {
                Some(next) => {
                    report.lines.push(header(store, next, self.config.packets));
                    let stats = std::mem::replace(&mut session.current, PingStats::new(next));
                    report.finished.push(stats);
                }
                None => {
                    let session = self.sessions.remove(&probe.source)?;
                    report.finished.push(session.current);
                    report.done = true;
                    return Some(report);
                }
            }
        }

        report.next = Some((probe, now + self.config.interval()));
        Some(report)
    }
}

fn header(store: &TopologyStore, target: Ipv4Addr, packets: u32) -> String {
    match store.nf_by_address(target) {
        Some(nf) => format!("PING {target} ({}): {packets} packets", nf.name),
        None => format!("PING {target}: {packets} packets"),
    }
}

/// Every other entity in the /24 of `source`.
#[must_use]
pub fn subnet_peers(store: &TopologyStore, source: &NetworkFunction) -> Vec<Ipv4Addr> {
    store
        .nfs()
        .filter(|nf| nf.id != source.id && subnet_of(nf.config.ip_address) == source.subnet())
        .map(|nf| nf.config.ip_address)
        .collect()
}
