use crate::routing::command::CommandExecutor;
use std::net::Ipv4Addr;

pub const PROBE_TIMEOUT_MS: u32 = 600;

/// Single-echo reachability check used to gate transitions toward the VPN
/// gateway. Never errors: any probe failure counts as unreachable. Windows
/// ping exits 0 when a router answers "destination host unreachable", so a
/// reply must also carry a TTL to count.
pub async fn is_reachable<E: CommandExecutor>(executor: &E, address: Ipv4Addr) -> bool {
    let timeout = PROBE_TIMEOUT_MS.to_string();
    let address = address.to_string();

    match executor
        .output("ping", &["-n", "1", "-w", &timeout, &address])
        .await
    {
        Ok(result) => result.success() && result.output.contains("TTL="),
        Err(_) => false,
    }
}
