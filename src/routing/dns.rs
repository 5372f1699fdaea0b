use crate::routing::command::{self, CommandError, CommandExecutor};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DnsError {
    #[error("failed to apply DNS on \"{interface}\" (exit {code}): {output}")]
    Apply {
        interface: String,
        code: i32,
        output: String,
    },
    #[error(transparent)]
    Command(#[from] CommandError),
}

pub type Result<T> = std::result::Result<T, DnsError>;

/// Point the interface's resolver at `dns`. An empty address is an explicit
/// request to fall back to DHCP-assigned DNS, not a no-op.
pub async fn set_static_dns<E: CommandExecutor>(
    executor: &E,
    interface_alias: &str,
    dns: &str,
) -> Result<()> {
    let name = format!("name={}", interface_alias);

    let args: Vec<&str> = if dns.trim().is_empty() {
        vec!["interface", "ip", "set", "dnsservers", &name, "source=dhcp"]
    } else {
        vec![
            "interface",
            "ip",
            "set",
            "dnsservers",
            &name,
            "static",
            dns,
            "primary",
        ]
    };

    let result = executor.output("netsh", &args).await?;
    if !result.success() {
        return Err(DnsError::Apply {
            interface: interface_alias.to_string(),
            code: result.code,
            output: result.output.trim().to_string(),
        });
    }

    Ok(())
}

/// Drop cached lookups after a resolver change. Best-effort.
pub async fn flush_cache<E: CommandExecutor>(executor: &E) {
    if let Err(e) = command::run_tolerant(executor, "ipconfig", &["/flushdns"]).await {
        log::warn!("failed to flush DNS cache: {}", e);
    }
}
