pub mod command;
pub mod config;
pub mod dns;
pub mod machine;
pub mod network;
pub mod probe;
pub mod routes;
pub mod table;
pub mod types;
pub mod validation;

pub use command::{CommandError, CommandExecutor, CommandOutput, SystemExecutor};
pub use config::{AppConfig, load_config, save_config};
pub use machine::{RouteSwitcher, RoutingError};
pub use network::{InterfaceError, InterfaceSource, SystemInterfaces};
pub use table::{RouteEntry, RouteTable};
pub use types::{Mode, PrimaryInterface, RoutePolicy, Status, Transition};
