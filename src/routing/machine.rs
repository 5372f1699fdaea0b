//! Mode orchestration: reads the table, gates on reachability, applies the
//! route and DNS changes, verifies the result, and persists the intent.
//! The OS routing table is shared mutable state other software also writes
//! to, so every decision starts from a fresh read, never from memory.

use crate::routing::command::{CommandError, CommandExecutor};
use crate::routing::config::{self, AppConfig};
use crate::routing::dns::{self, DnsError};
use crate::routing::network::{InterfaceError, InterfaceSource};
use crate::routing::probe;
use crate::routing::routes::{self, RouteError};
use crate::routing::table;
use crate::routing::types::{Mode, PrimaryInterface, RoutePolicy, Status, Transition};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Interface(#[from] InterfaceError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error("VPN gateway {0} is not reachable, staying on current routing")]
    VpnGatewayUnreachable(Ipv4Addr),
    #[error("route table reports {observed} mode after switching to {expected}")]
    VerificationFailed { expected: Mode, observed: Mode },
}

pub type Result<T> = std::result::Result<T, RoutingError>;

pub struct RouteSwitcher<E, I> {
    executor: E,
    interfaces: I,
    config_path: PathBuf,
    /// Doubles as the transition lock: every public operation holds it for
    /// its full duration, so toggles, reconciliation and status reads never
    /// interleave.
    config: Mutex<AppConfig>,
}

impl<E: CommandExecutor, I: InterfaceSource> RouteSwitcher<E, I> {
    pub fn new(executor: E, interfaces: I, config: AppConfig, config_path: PathBuf) -> Self {
        Self {
            executor,
            interfaces,
            config_path,
            config: Mutex::new(config),
        }
    }

    /// Flip to the opposite of the currently detected mode. Transitions
    /// toward the VPN are refused outright while its gateway is unreachable;
    /// no OS state is touched in that case.
    pub async fn toggle(&self) -> Result<Transition> {
        let mut config = self.config.lock().await;
        config.validate().map_err(RoutingError::Config)?;
        let vpn_gateway = config.vpn_gateway_addr().map_err(RoutingError::Config)?;

        let interface = self.resolve_interface(&config)?;
        let current = table::read_table(&self.executor)
            .await?
            .detect_mode(config.route_policy, vpn_gateway);
        let target = current.opposite();

        if target == Mode::Vpn && !probe::is_reachable(&self.executor, vpn_gateway).await {
            return Err(RoutingError::VpnGatewayUnreachable(vpn_gateway));
        }

        log::info!(
            "switching {} -> {} on \"{}\"",
            current,
            target,
            interface.alias
        );

        self.apply_routes(&config, target, &interface, vpn_gateway)
            .await?;
        let dns_warning = self.apply_dns(&config, target, &interface).await;

        let observed = table::read_table(&self.executor)
            .await?
            .detect_mode(config.route_policy, vpn_gateway);
        if observed != target {
            return Err(RoutingError::VerificationFailed {
                expected: target,
                observed,
            });
        }

        config.last_known_vpn_state = target == Mode::Vpn;
        if let Err(e) = config::save_config_to(&self.config_path, &config) {
            log::warn!("failed to save config: {}", e);
        }

        Ok(Transition {
            mode: target,
            interface_alias: interface.alias,
            dns_warning,
        })
    }

    /// Bring the OS back to the persisted intent after a restart. A reboot
    /// clears routes and DNS but not the saved preference. Staying put
    /// because the VPN gateway is unreachable is a valid outcome, not an
    /// error; the caller decides whether command failures matter.
    pub async fn reconcile_on_startup(&self) -> Result<Mode> {
        let config = self.config.lock().await;
        config.validate().map_err(RoutingError::Config)?;
        let vpn_gateway = config.vpn_gateway_addr().map_err(RoutingError::Config)?;

        let current = table::read_table(&self.executor)
            .await?
            .detect_mode(config.route_policy, vpn_gateway);
        let intended = if config.last_known_vpn_state {
            Mode::Vpn
        } else {
            Mode::Normal
        };

        if current == intended {
            log::info!("routing already in {} mode", current);
            return Ok(current);
        }

        if intended == Mode::Vpn && !probe::is_reachable(&self.executor, vpn_gateway).await {
            log::info!(
                "VPN gateway {} not reachable, staying on normal routing",
                vpn_gateway
            );
            return Ok(current);
        }

        let interface = self.resolve_interface(&config)?;
        log::info!(
            "restoring {} mode from previous session on \"{}\"",
            intended,
            interface.alias
        );

        self.apply_routes(&config, intended, &interface, vpn_gateway)
            .await?;
        self.apply_dns(&config, intended, &interface).await;

        let observed = table::read_table(&self.executor)
            .await?
            .detect_mode(config.route_policy, vpn_gateway);
        if observed != intended {
            return Err(RoutingError::VerificationFailed {
                expected: intended,
                observed,
            });
        }

        Ok(intended)
    }

    /// Read-only snapshot for display.
    pub async fn status(&self) -> Result<Status> {
        let config = self.config.lock().await;
        let vpn_gateway = config.vpn_gateway_addr().map_err(RoutingError::Config)?;
        let interface = self.resolve_interface(&config)?;
        let mode = table::read_table(&self.executor)
            .await?
            .detect_mode(config.route_policy, vpn_gateway);
        Ok(Status {
            interface_alias: interface.alias,
            mode,
        })
    }

    pub async fn config(&self) -> AppConfig {
        self.config.lock().await.clone()
    }

    fn resolve_interface(
        &self,
        config: &AppConfig,
    ) -> std::result::Result<PrimaryInterface, InterfaceError> {
        if config.uses_auto_interface() {
            self.interfaces.find_primary()
        } else {
            self.interfaces.find_by_alias(config.interface_name.trim())
        }
    }

    async fn apply_routes(
        &self,
        config: &AppConfig,
        target: Mode,
        interface: &PrimaryInterface,
        vpn_gateway: Ipv4Addr,
    ) -> Result<()> {
        match config.route_policy {
            RoutePolicy::SplitRoute => match target {
                Mode::Vpn => {
                    routes::apply_vpn_split(
                        &self.executor,
                        vpn_gateway,
                        config.vpn_metric,
                        interface.index,
                    )
                    .await?
                }
                Mode::Normal => routes::apply_normal_split(&self.executor, vpn_gateway).await?,
            },
            RoutePolicy::FullDefault => {
                let gateway = match target {
                    Mode::Vpn => vpn_gateway,
                    Mode::Normal => config
                        .normal_gateway_addr()
                        .map_err(RoutingError::Config)?
                        .ok_or_else(|| {
                            RoutingError::Config(
                                "the fullDefault route policy requires a normal gateway address"
                                    .to_string(),
                            )
                        })?,
                };
                routes::apply_full_default(
                    &self.executor,
                    gateway,
                    config.vpn_metric,
                    interface.index,
                )
                .await?;
            }
        }
        Ok(())
    }

    /// DNS is best-effort: a failure is logged and reported upward but never
    /// rolls back the route change.
    async fn apply_dns(
        &self,
        config: &AppConfig,
        target: Mode,
        interface: &PrimaryInterface,
    ) -> Option<DnsError> {
        let dns = match target {
            Mode::Vpn => &config.vpn_dns,
            Mode::Normal => &config.normal_dns,
        };

        match dns::set_static_dns(&self.executor, &interface.alias, dns).await {
            Ok(()) => {
                dns::flush_cache(&self.executor).await;
                None
            }
            Err(e) => {
                log::warn!("DNS change on \"{}\" failed: {}", interface.alias, e);
                Some(e)
            }
        }
    }
}
