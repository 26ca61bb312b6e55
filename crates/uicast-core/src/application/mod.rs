//! Application layer: the tick thread's components and the port poller.
//!
//! # Sub-modules
//!
//! - **`registry`** – who is connected, in connection order.
//! - **`arbiter`** – who may drive input right now, and for how long.
//! - **`broadcaster`** – encodes each frame once and publishes it to every
//!   viewer's outbound slot.
//! - **`tick`** – the fixed-rate loop that ties the above together, plus the
//!   `UiState` / `RenderDriver` seams the server crate implements.
//! - **`poller`** – samples the device's pins off the tick thread.
//!
//! Nothing here opens a socket.  Transport lives in the server crate and
//! talks to this layer only through the channels in [`crate::channel`].

pub mod arbiter;
pub mod broadcaster;
pub mod poller;
pub mod registry;
pub mod tick;

pub use arbiter::{
    ControlArbiter, ControlLease, ControlState, RotationPolicy, DEFAULT_LEASE, MAX_LEASE,
};
pub use broadcaster::{BroadcastReport, FrameBroadcaster};
pub use poller::{
    poll_once, spawn_port_poller, PinReading, PinSnapshot, PollerHandle, PortController,
    PortError, DEFAULT_POLL_INTERVAL,
};
pub use registry::{ConnectionRegistry, RegistryError, ViewerCount};
pub use tick::{
    RenderDriver, RenderView, TickConfig, TickContext, TickError, TickLoop, TickOutcome, UiState,
};
