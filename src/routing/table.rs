//! Parsed view of the IPv4 routing table and the mode-detection rules that
//! read it. The table is a snapshot: route add/delete commands do not update
//! it, callers re-read to observe their effect.

use crate::routing::command::{self, CommandExecutor};
use crate::routing::types::{Mode, RoutePolicy};
use std::net::Ipv4Addr;

pub const UNSPECIFIED: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);
/// Netmask shared by both halves of the split-default pair.
pub const SPLIT_MASK: Ipv4Addr = Ipv4Addr::new(128, 0, 0, 0);
/// Destination of the upper split half.
pub const SPLIT_HIGH: Ipv4Addr = Ipv4Addr::new(128, 0, 0, 0);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RouteEntry {
    pub destination: Ipv4Addr,
    pub netmask: Ipv4Addr,
    /// None for on-link routes.
    pub gateway: Option<Ipv4Addr>,
    pub interface: Ipv4Addr,
    pub metric: u32,
}

#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Parse `route print -4` output. A row counts only if destination,
    /// netmask and interface are IPv4 literals, the gateway is an IPv4
    /// literal or `On-link`, and the metric is numeric; headers, separators
    /// and the persistent-routes section fall through. Matching gateways as
    /// parsed addresses rather than substrings means `10.0.0.9` never
    /// matches inside `110.0.0.99`.
    pub fn parse(output: &str) -> Self {
        let mut entries = Vec::new();

        for line in output.lines() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 5 {
                continue;
            }

            let Ok(destination) = tokens[0].parse::<Ipv4Addr>() else {
                continue;
            };
            let Ok(netmask) = tokens[1].parse::<Ipv4Addr>() else {
                continue;
            };
            let gateway = if tokens[2].eq_ignore_ascii_case("On-link") {
                None
            } else {
                match tokens[2].parse::<Ipv4Addr>() {
                    Ok(addr) => Some(addr),
                    Err(_) => continue,
                }
            };
            let Ok(interface) = tokens[3].parse::<Ipv4Addr>() else {
                continue;
            };
            let Ok(metric) = tokens[4].parse::<u32>() else {
                continue;
            };

            entries.push(RouteEntry {
                destination,
                netmask,
                gateway,
                interface,
                metric,
            });
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn contains(&self, destination: Ipv4Addr, netmask: Ipv4Addr, gateway: Ipv4Addr) -> bool {
        self.entries.iter().any(|e| {
            e.destination == destination && e.netmask == netmask && e.gateway == Some(gateway)
        })
    }

    /// Next-hop of the lowest-metric `0.0.0.0/0` route, if any.
    pub fn default_gateway(&self) -> Option<Ipv4Addr> {
        self.entries
            .iter()
            .filter(|e| e.destination == UNSPECIFIED && e.netmask == UNSPECIFIED)
            .min_by_key(|e| e.metric)
            .and_then(|e| e.gateway)
    }

    /// Classify the current mode. A partial split pair (one half present) is
    /// Normal: a transitional state is never reported as VPN.
    pub fn detect_mode(&self, policy: RoutePolicy, vpn_gateway: Ipv4Addr) -> Mode {
        match policy {
            RoutePolicy::SplitRoute => {
                let low = self.contains(UNSPECIFIED, SPLIT_MASK, vpn_gateway);
                let high = self.contains(SPLIT_HIGH, SPLIT_MASK, vpn_gateway);
                if low && high { Mode::Vpn } else { Mode::Normal }
            }
            RoutePolicy::FullDefault => {
                if self.default_gateway() == Some(vpn_gateway) {
                    Mode::Vpn
                } else {
                    Mode::Normal
                }
            }
        }
    }
}

/// Read the live IPv4 routing table. "Nothing matched" is a valid result;
/// only a failing `route print` invocation is an error.
pub async fn read_table<E: CommandExecutor>(executor: &E) -> command::Result<RouteTable> {
    let output = command::run_checked(executor, "route", &["print", "-4"]).await?;
    Ok(RouteTable::parse(&output))
}
