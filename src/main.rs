//! CLI front-end: argument dispatch, logging and error presentation only.
//! All routing decisions live in the library.

use log::{error, info, warn};
use simplelog::{ConfigBuilder, LevelFilter, SimpleLogger};
use std::time::Duration;
use vpnswitch::routing::{AppConfig, RouteSwitcher, SystemExecutor, SystemInterfaces, config};

const USAGE: &str = "\
Usage: vpnswitch <command>

Commands:
  toggle      Switch between normal and VPN routing
  status      Print the active interface and routing mode
  reconcile   Re-apply the mode saved from the previous session
  watch       Reconcile, then refresh status every few seconds until Ctrl+C
  config      Print the configuration file path and contents
";

/// Original tray refresh period; routes and DNS can change outside the app.
const WATCH_INTERVAL: Duration = Duration::from_secs(3);

fn init_logging() {
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Debug)
        .build();
    let _ = SimpleLogger::init(LevelFilter::Info, config);
}

fn load_config_or_defaults() -> AppConfig {
    match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            warn!("failed to load config, using defaults: {}", e);
            AppConfig::default()
        }
    }
}

async fn run(command: &str) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_config_or_defaults();
    let config_path = config::ensure_config_dir()?;
    let switcher = RouteSwitcher::new(SystemExecutor, SystemInterfaces, loaded, config_path);

    match command {
        "toggle" => {
            let transition = switcher.toggle().await?;
            info!(
                "switched to {} routing on \"{}\"",
                transition.mode, transition.interface_alias
            );
            if let Some(dns_warning) = transition.dns_warning {
                warn!("{}", dns_warning);
            }
        }
        "status" => {
            let status = switcher.status().await?;
            println!("Interface: {}", status.interface_alias);
            println!("Mode: {}", status.mode);
        }
        "reconcile" => match switcher.reconcile_on_startup().await {
            Ok(mode) => info!("routing is in {} mode", mode),
            Err(e) => error!("reconciliation failed: {}", e),
        },
        "watch" => {
            if let Err(e) = switcher.reconcile_on_startup().await {
                error!("reconciliation failed: {}", e);
            }

            let mut ticker = tokio::time::interval(WATCH_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => match switcher.status().await {
                        Ok(status) => info!(
                            "{} routing on \"{}\"",
                            status.mode, status.interface_alias
                        ),
                        Err(e) => warn!("status refresh failed: {}", e),
                    },
                    _ = tokio::signal::ctrl_c() => {
                        info!("stopping");
                        break;
                    }
                }
            }
        }
        "config" => {
            println!("Config path: {}", config::get_config_path()?.display());
            let config = switcher.config().await;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        _ => {
            eprint!("{}", USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("status");

    if let Err(e) = run(command).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
