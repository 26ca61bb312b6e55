//! Domain layer for uicast-server.
//!
//! Plain types with no I/O: configuration, panel geometry and the draw list
//! format.  Reading the config file is the one exception and is kept to a
//! single function.

pub mod config;
pub mod draw;
pub mod layout;

pub use config::{load_config, parse_config, ConfigError, ServerConfig};
pub use draw::{DrawCommand, DrawList};
pub use layout::{hit_test, Region, Widget};
