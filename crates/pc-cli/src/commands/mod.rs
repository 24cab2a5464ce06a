//! CLI command implementations

mod commentary;
mod config;
mod demo;
mod devices;
mod status;
mod watch;

pub use commentary::commentary_command;
pub use config::{config_edit, config_get, config_init, config_path, config_set, config_show, ConfigTarget};
pub use demo::{conclude_command, start_command, stop_command};
pub use devices::{devices_command, scenarios_command};
pub use status::status_command;
pub use watch::watch_command;
