use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    Normal,
    Vpn,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Normal => "Normal",
            Mode::Vpn => "VPN",
        }
    }

    pub fn opposite(&self) -> Mode {
        match self {
            Mode::Normal => Mode::Vpn,
            Mode::Vpn => Mode::Normal,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How VPN mode is expressed in the routing table. Split-route installs a
/// `0.0.0.0/1` + `128.0.0.0/1` pair that outranks the existing default;
/// full-default replaces the `0.0.0.0/0` route outright.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub enum RoutePolicy {
    #[default]
    SplitRoute,
    FullDefault,
}

impl RoutePolicy {
    #[allow(dead_code)]
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutePolicy::SplitRoute => "splitRoute",
            RoutePolicy::FullDefault => "fullDefault",
        }
    }
}

/// Snapshot of the adapter routing mutations are aimed at. Re-resolved on
/// every operation; the physical network can change between calls.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PrimaryInterface {
    pub alias: String,
    pub index: u32,
    pub gateway: Option<Ipv4Addr>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Status {
    pub interface_alias: String,
    pub mode: Mode,
}

/// Outcome of a completed transition. `dns_warning` carries a DNS failure
/// that did not abort the route change.
#[derive(Debug)]
pub struct Transition {
    pub mode: Mode,
    pub interface_alias: String,
    pub dns_warning: Option<crate::routing::dns::DnsError>,
}
