//!
//! Address and port allocation.
//!
//! The allocator holds no state of its own. Every call is a function of
//! the in-use sets passed in and the [`AllocationPolicy`], so calling it
//! without committing the result reserves nothing.
//!

use fxhash::FxHashSet;
use rand::Rng;
use std::net::Ipv4Addr;

use crate::config::AllocationPolicy;

/// Picks unused addresses and ports from the pools of a policy.
#[derive(Debug, Clone, Copy)]
pub struct Allocator<'a> {
    policy: &'a AllocationPolicy,
}

impl<'a> Allocator<'a> {
    #[must_use]
    pub fn new(policy: &'a AllocationPolicy) -> Self {
        Self { policy }
    }

    ///
    /// The first unused address of the subnet pools, in priority order.
    ///
    /// If every pool is exhausted, a pseudo-random unused address of the
    /// reserved /16 is returned instead. This never fails.
    ///
    pub fn next_address(&self, in_use: &FxHashSet<Ipv4Addr>, rng: &mut impl Rng) -> Ipv4Addr {
        let hosts = self.policy.hosts.first..=self.policy.hosts.last;
        for subnet in &self.policy.subnets {
            let [a, b, c, _] = subnet.octets();
            if let Some(addr) = hosts
                .clone()
                .map(|host| Ipv4Addr::new(a, b, c, host))
                .find(|addr| !in_use.contains(addr))
            {
                return addr;
            }
        }

        let [a, b, ..] = self.policy.reserved.octets();
        // host parts 1..=0xfffe, skipping the network and broadcast address
        let start = rng.random_range(1..=0xfffe_u16);
        let addr = (0..0xfffe_u16)
            .map(|offset| {
                let host = (u32::from(start) - 1 + u32::from(offset)) % 0xfffe + 1;
                Ipv4Addr::new(a, b, (host >> 8) as u8, host as u8)
            })
            .find(|addr| !in_use.contains(addr))
            .unwrap_or_else(|| Ipv4Addr::new(a, b, (start >> 8) as u8, start as u8));

        tracing::warn!(
            "address pools exhausted ({} subnets), falling back to reserved address {addr}",
            self.policy.subnets.len()
        );
        addr
    }

    ///
    /// The lowest unused port of the port range.
    ///
    /// If the range is exhausted, a pseudo-random unused port outside of
    /// the range is returned instead. This never fails.
    ///
    pub fn next_port(&self, in_use: &FxHashSet<u16>, rng: &mut impl Rng) -> u16 {
        let range = self.policy.ports.first..=self.policy.ports.last;
        if let Some(port) = range.clone().find(|port| !in_use.contains(port)) {
            return port;
        }

        let start = rng.random_range(1..=u16::MAX);
        let port = (0..u16::MAX)
            .map(|offset| ((u32::from(start) - 1 + u32::from(offset)) % 0xffff + 1) as u16)
            .find(|port| !range.contains(port) && !in_use.contains(port))
            .unwrap_or(start);

        tracing::warn!(
            "port range {}-{} exhausted, falling back to port {port}",
            range.start(),
            range.end()
        );
        port
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HostRange, PortRange};
    use rand::{rngs::StdRng, SeedableRng};

    fn small_policy() -> AllocationPolicy {
        AllocationPolicy {
            subnets: vec![Ipv4Addr::new(192, 168, 1, 0), Ipv4Addr::new(192, 168, 2, 0)],
            hosts: HostRange {
                first: 10,
                last: 12,
            },
            ports: PortRange {
                first: 8080,
                last: 8082,
            },
            reserved: Ipv4Addr::new(10, 254, 0, 0),
        }
    }

    #[test]
    fn addresses_in_priority_order() {
        let policy = small_policy();
        let alloc = Allocator::new(&policy);
        let mut rng = StdRng::seed_from_u64(1);
        let mut in_use = FxHashSet::default();

        let mut seen = Vec::new();
        for _ in 0..6 {
            let addr = alloc.next_address(&in_use, &mut rng);
            assert!(!in_use.contains(&addr));
            in_use.insert(addr);
            seen.push(addr.octets());
        }
        assert_eq!(seen[0], [192, 168, 1, 10]);
        assert_eq!(seen[2], [192, 168, 1, 12]);
        assert_eq!(seen[3], [192, 168, 2, 10]);
        assert_eq!(seen[5], [192, 168, 2, 12]);
    }

    #[test]
    fn uncommitted_calls_do_not_reserve() {
        let policy = AllocationPolicy::default();
        let alloc = Allocator::new(&policy);
        let mut rng = StdRng::seed_from_u64(1);
        let in_use = FxHashSet::default();

        let a = alloc.next_address(&in_use, &mut rng);
        let b = alloc.next_address(&in_use, &mut rng);
        assert_eq!(a, b);
        assert_eq!(alloc.next_port(&FxHashSet::default(), &mut rng), 8080);
        assert_eq!(alloc.next_port(&FxHashSet::default(), &mut rng), 8080);
    }

    #[test]
    fn gaps_are_reused() {
        let policy = AllocationPolicy::default();
        let alloc = Allocator::new(&policy);
        let mut rng = StdRng::seed_from_u64(1);
        let in_use: FxHashSet<u16> = [8080, 8081, 8083].into_iter().collect();
        assert_eq!(alloc.next_port(&in_use, &mut rng), 8082);
    }

    #[test]
    fn exhausted_pools_fall_back() {
        let policy = small_policy();
        let alloc = Allocator::new(&policy);
        let mut rng = StdRng::seed_from_u64(9);

        let mut addrs = FxHashSet::default();
        for c in 1..=2 {
            for host in 10..=12 {
                addrs.insert(Ipv4Addr::new(192, 168, c, host));
            }
        }
        for _ in 0..50 {
            let addr = alloc.next_address(&addrs, &mut rng);
            assert_eq!(addr.octets()[..2], [10, 254]);
            assert!(addrs.insert(addr), "{addr} allocated twice");
        }

        let mut ports: FxHashSet<u16> = (8080..=8082).collect();
        for _ in 0..50 {
            let port = alloc.next_port(&ports, &mut rng);
            assert!(!(8080..=8082).contains(&port));
            assert_ne!(port, 0);
            assert!(ports.insert(port), "{port} allocated twice");
        }
    }
}
