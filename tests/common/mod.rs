//! Scripted stand-ins for the OS: a command executor that renders and
//! mutates a fake IPv4 route table, and a fixed adapter source.

#![allow(dead_code)]

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use vpnswitch::routing::command::{CommandError, CommandExecutor, CommandOutput};
use vpnswitch::routing::network::{InterfaceError, InterfaceSource};
use vpnswitch::routing::{AppConfig, PrimaryInterface, RouteSwitcher};

pub const LAN_GATEWAY: &str = "192.168.1.1";
pub const VPN_GATEWAY: &str = "10.0.0.9";
pub const LOCAL_ADDRESS: &str = "192.168.1.50";

#[derive(Clone, Debug)]
pub struct FakeRoute {
    pub destination: String,
    pub netmask: String,
    pub gateway: String,
    pub metric: u32,
}

pub struct FakeHost {
    pub routes: Vec<FakeRoute>,
    pub reachable: bool,
    /// Last DNS server applied via netsh; None until a change happens.
    pub dns: Option<String>,
    /// When set, `route ADD` reports success without changing the table.
    pub drop_adds: bool,
    pub fail_dns: bool,
}

impl FakeHost {
    fn normal() -> Self {
        Self {
            routes: vec![FakeRoute {
                destination: "0.0.0.0".to_string(),
                netmask: "0.0.0.0".to_string(),
                gateway: LAN_GATEWAY.to_string(),
                metric: 25,
            }],
            reachable: true,
            dns: None,
            drop_adds: false,
            fail_dns: false,
        }
    }
}

/// Interprets the same route/netsh/ping/ipconfig invocations the production
/// code issues, against an in-memory route table.
#[derive(Clone)]
pub struct FakeExecutor {
    pub host: Arc<Mutex<FakeHost>>,
    pub commands: Arc<Mutex<Vec<String>>>,
}

impl FakeExecutor {
    pub fn normal_host() -> Self {
        Self {
            host: Arc::new(Mutex::new(FakeHost::normal())),
            commands: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn routes_via(&self, gateway: &str) -> Vec<FakeRoute> {
        self.host
            .lock()
            .unwrap()
            .routes
            .iter()
            .filter(|r| r.gateway == gateway)
            .cloned()
            .collect()
    }

    pub fn mutation_commands(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| {
                c.starts_with("route ADD")
                    || c.starts_with("route DELETE")
                    || c.starts_with("netsh")
            })
            .collect()
    }

    fn render_table(routes: &[FakeRoute]) -> String {
        let mut output = String::from(
            "IPv4 Route Table\n\
             ===========================================================================\n\
             Active Routes:\n\
             Network Destination        Netmask          Gateway       Interface  Metric\n",
        );
        for route in routes {
            output.push_str(&format!(
                "{:>17} {:>16} {:>16} {:>16} {:>7}\n",
                route.destination, route.netmask, route.gateway, LOCAL_ADDRESS, route.metric
            ));
        }
        output
    }
}

fn ok(code: i32, output: impl Into<String>) -> Result<CommandOutput, CommandError> {
    Ok(CommandOutput {
        code,
        output: output.into(),
    })
}

impl CommandExecutor for FakeExecutor {
    async fn output(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
        self.commands
            .lock()
            .unwrap()
            .push(format!("{} {}", program, args.join(" ")));

        let mut host = self.host.lock().unwrap();

        match (program, args) {
            ("route", ["print", "-4"]) => ok(0, Self::render_table(&host.routes)),
            ("route", ["ADD", destination, "MASK", netmask, gateway, "METRIC", metric, "IF", _]) => {
                if !host.drop_adds {
                    let metric = metric.parse().unwrap();
                    host.routes.push(FakeRoute {
                        destination: destination.to_string(),
                        netmask: netmask.to_string(),
                        gateway: gateway.to_string(),
                        metric,
                    });
                }
                ok(0, " OK!\n")
            }
            ("route", ["DELETE", destination, "MASK", netmask, rest @ ..]) => {
                let gateway = rest.first();
                let before = host.routes.len();
                host.routes.retain(|r| {
                    !(r.destination == *destination
                        && r.netmask == *netmask
                        && gateway.is_none_or(|g| r.gateway == *g))
                });
                if host.routes.len() == before {
                    ok(1, "The route deletion failed: Element not found.\n")
                } else {
                    ok(0, " OK!\n")
                }
            }
            ("ping", _) => {
                if host.reachable {
                    ok(0, "Reply from 10.0.0.9: bytes=32 time=1ms TTL=64\n")
                } else {
                    ok(1, "Request timed out.\n")
                }
            }
            ("netsh", rest) => {
                if host.fail_dns {
                    return ok(1, "The interface name is invalid.\n");
                }
                if let Some(static_pos) = rest.iter().position(|a| *a == "static") {
                    host.dns = Some(rest[static_pos + 1].to_string());
                } else {
                    host.dns = None;
                }
                ok(0, "Ok.\n")
            }
            ("ipconfig", _) => ok(0, "Successfully flushed the DNS Resolver Cache.\n"),
            _ => ok(1, format!("unexpected command: {} {:?}", program, args)),
        }
    }
}

pub struct FixedInterfaces;

impl InterfaceSource for FixedInterfaces {
    fn find_primary(&self) -> Result<PrimaryInterface, InterfaceError> {
        Ok(PrimaryInterface {
            alias: "Ethernet".to_string(),
            index: 12,
            gateway: Some(LAN_GATEWAY.parse::<Ipv4Addr>().unwrap()),
        })
    }

    fn find_by_alias(&self, alias: &str) -> Result<PrimaryInterface, InterfaceError> {
        if alias.eq_ignore_ascii_case("Ethernet") {
            self.find_primary()
        } else {
            Err(InterfaceError::InterfaceNotPresent(alias.to_string()))
        }
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        vpn_gateway: VPN_GATEWAY.to_string(),
        normal_dns: "10.0.0.1".to_string(),
        vpn_dns: "10.64.0.1".to_string(),
        ..AppConfig::default()
    }
}

pub fn test_switcher(
    executor: &FakeExecutor,
    config: AppConfig,
    dir: &TempDir,
) -> RouteSwitcher<FakeExecutor, FixedInterfaces> {
    RouteSwitcher::new(
        executor.clone(),
        FixedInterfaces,
        config,
        dir.path().join("config.json"),
    )
}
