//! Application layer: the concrete UI the server streams.
//!
//! - **`panel`** – UI state driven by the lease holder's input, plus the
//!   `DeviceLink` seam to the port poller.
//! - **`renderer`** – turns the panel into a draw list each tick.

pub mod panel;
pub mod renderer;

pub use panel::{DeviceLink, PanelState};
pub use renderer::PanelRenderer;
