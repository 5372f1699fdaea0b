//! Route-table mutations behind a mode transition. Deletes tolerate "element
//! not found" so a repeated apply is equivalent to a single one; adds are
//! strict and abort the transition, leaving a partial state the caller must
//! re-inspect rather than assume.

use crate::routing::command::{self, CommandError, CommandExecutor};
use crate::routing::table::{self, SPLIT_HIGH, SPLIT_MASK, UNSPECIFIED};
use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouteError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("default route points at {observed} after switching, expected {expected}")]
    VerificationFailed { expected: Ipv4Addr, observed: String },
}

pub type Result<T> = std::result::Result<T, RouteError>;

/// Install the split-default pair via the VPN gateway. Stale halves are
/// cleared first; both adds must succeed.
pub async fn apply_vpn_split<E: CommandExecutor>(
    executor: &E,
    vpn_gateway: Ipv4Addr,
    metric: u32,
    if_index: u32,
) -> Result<()> {
    let gateway = vpn_gateway.to_string();

    delete_route(executor, UNSPECIFIED, SPLIT_MASK, Some(gateway.as_str())).await?;
    delete_route(executor, SPLIT_HIGH, SPLIT_MASK, Some(gateway.as_str())).await?;

    add_route(executor, UNSPECIFIED, SPLIT_MASK, &gateway, metric, if_index).await?;
    add_route(executor, SPLIT_HIGH, SPLIT_MASK, &gateway, metric, if_index).await?;

    Ok(())
}

/// Remove the split-default pair, plus any stray full default pinned to the
/// VPN gateway, so the pre-existing LAN default takes over again.
pub async fn apply_normal_split<E: CommandExecutor>(
    executor: &E,
    vpn_gateway: Ipv4Addr,
) -> Result<()> {
    let gateway = vpn_gateway.to_string();

    delete_route(executor, UNSPECIFIED, SPLIT_MASK, Some(gateway.as_str())).await?;
    delete_route(executor, SPLIT_HIGH, SPLIT_MASK, Some(gateway.as_str())).await?;
    delete_route(executor, UNSPECIFIED, UNSPECIFIED, Some(gateway.as_str())).await?;

    Ok(())
}

/// Replace the default route outright: drop whatever `0.0.0.0/0` exists, add
/// exactly one via `target_gateway`, then re-read the table and confirm the
/// next-hop took. `route ADD` can exit zero while another mutator (DHCP, the
/// VPN client) wins the race; the re-read table is authoritative.
pub async fn apply_full_default<E: CommandExecutor>(
    executor: &E,
    target_gateway: Ipv4Addr,
    metric: u32,
    if_index: u32,
) -> Result<()> {
    let gateway = target_gateway.to_string();

    delete_route(executor, UNSPECIFIED, UNSPECIFIED, None).await?;
    add_route(executor, UNSPECIFIED, UNSPECIFIED, &gateway, metric, if_index).await?;

    let observed = table::read_table(executor).await?.default_gateway();
    match observed {
        Some(gw) if gw == target_gateway => Ok(()),
        Some(gw) => Err(RouteError::VerificationFailed {
            expected: target_gateway,
            observed: gw.to_string(),
        }),
        None => Err(RouteError::VerificationFailed {
            expected: target_gateway,
            observed: "no default route".to_string(),
        }),
    }
}

async fn add_route<E: CommandExecutor>(
    executor: &E,
    destination: Ipv4Addr,
    netmask: Ipv4Addr,
    gateway: &str,
    metric: u32,
    if_index: u32,
) -> Result<()> {
    let destination = destination.to_string();
    let netmask = netmask.to_string();
    let metric = metric.to_string();
    let if_index = if_index.to_string();

    command::run_checked(
        executor,
        "route",
        &[
            "ADD",
            &destination,
            "MASK",
            &netmask,
            gateway,
            "METRIC",
            &metric,
            "IF",
            &if_index,
        ],
    )
    .await?;
    Ok(())
}

/// Tolerant delete: a route that is already absent counts as removed.
async fn delete_route<E: CommandExecutor>(
    executor: &E,
    destination: Ipv4Addr,
    netmask: Ipv4Addr,
    gateway: Option<&str>,
) -> Result<()> {
    let destination = destination.to_string();
    let netmask = netmask.to_string();

    let mut args = vec!["DELETE", destination.as_str(), "MASK", netmask.as_str()];
    if let Some(gateway) = gateway {
        args.push(gateway);
    }

    command::run_tolerant(executor, "route", &args).await?;
    Ok(())
}
