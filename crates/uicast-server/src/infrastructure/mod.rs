//! Infrastructure layer for uicast-server.
//!
//! Everything that touches the outside world lives here: the WebSocket
//! listener and per-viewer sessions, and the SNMP command-line tools used
//! to read and write the device's port.
//!
//! # What does NOT belong here?
//!
//! - The panel's behaviour and drawing (that is the application layer)
//! - Configuration parsing (that is the domain layer and `main.rs`)

pub mod device;
pub mod snmp;
pub mod ws_server;

pub use device::PolledDevice;
pub use snmp::{DeviceTarget, SnmpPortController, SnmpSettings};
pub use ws_server::{run_server, ViewerHub};
