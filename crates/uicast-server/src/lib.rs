//! uicast-server library crate.
//!
//! Streams a small device control panel to browser viewers.  The tick loop,
//! control arbitration and frame fan-out come from `uicast-core`; this
//! crate supplies the pieces around them.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Browser (JSON in / binary frames out over WebSocket)
//!         ↕
//! [uicast-server]
//!   ├── domain/           Config, panel geometry, draw-list format
//!   ├── application/      PanelState (UiState) + PanelRenderer (RenderDriver)
//!   └── infrastructure/
//!         ├── ws_server/  Accept loop and per-viewer reader/writer tasks
//!         ├── snmp/       snmpget / snmpset port controller
//!         └── device/     Panel ↔ port poller glue
//!         ↕
//! [uicast-core] tick thread
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O apart from reading the config file.
//! - `application` depends on `domain` and `uicast-core` only.
//! - `infrastructure` depends on all other layers plus `tokio` and
//!   `tungstenite`.

/// Domain layer: configuration and plain data types.
pub mod domain;

/// Application layer: the control panel.
pub mod application;

/// Infrastructure layer: WebSocket transport and SNMP.
pub mod infrastructure;
