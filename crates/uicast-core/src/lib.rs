//! # uicast-core
//!
//! Server-side engine for streaming one shared, server-authoritative user
//! interface to any number of remote viewers.
//!
//! The UI is rendered once per tick on a single thread.  The resulting draw
//! commands are encoded once and pushed to every connected viewer.  Every
//! viewer watches; exactly one at a time (the *lease holder*) may drive
//! input.
//!
//! This crate has no sockets and no UI toolkit.  The server crate plugs in a
//! transport, a concrete UI state and a render driver.
//!
//! # Architecture overview
//!
//! ```text
//!   I/O workers (tokio)                      tick thread
//!  ┌──────────────────┐   IntakeSender   ┌──────────────────────────────┐
//!  │ viewer 1 reader  │ ───────────────► │ EventIntake::drain           │
//!  │ viewer 2 reader  │ ───────────────► │   → ControlArbiter / UiState │
//!  └──────────────────┘                  │ RenderDriver::render         │
//!  ┌──────────────────┐   SlotReader     │ FrameBroadcaster::broadcast  │
//!  │ viewer 1 writer  │ ◄─────────────── │   (one SlotWriter / viewer)  │
//!  │ viewer 2 writer  │ ◄─────────────── │ Pacer::wait                  │
//!  └──────────────────┘                  └──────────────────────────────┘
//! ```
//!
//! - **`domain`** – viewers, events, frames, pins.  Plain data.
//! - **`channel`** – the inbound intake queue and the outbound single-frame
//!   slot: the only two places the I/O side and the tick thread meet.
//! - **`timing`** – the fixed-rate `Pacer`.
//! - **`protocol`** – binary framing for server → viewer messages and JSON
//!   parsing for viewer → server messages.
//! - **`application`** – registry, control arbiter, broadcaster, the tick
//!   loop itself, and the device port poller.

pub mod application;
pub mod channel;
pub mod domain;
pub mod protocol;
pub mod timing;

pub use application::{
    ConnectionRegistry, ControlArbiter, ControlLease, ControlState, FrameBroadcaster,
    PortController, PortError, RenderDriver, RenderView, RotationPolicy, TickConfig,
    TickContext, TickLoop, TickOutcome, UiState,
};
pub use channel::{frame_slot, EventIntake, IntakeSender, Outbound, SlotReader, SlotWriter};
pub use domain::{
    BootstrapAsset, Frame, InboundEvent, InputPayload, PinState, PointerButton, PortId,
    TextureFormat, Viewer, ViewerId, ViewerIdAllocator,
};
pub use protocol::{decode_message, encode_message, CodecError, OutboundMessage, ViewerMessage};
pub use timing::{Pacer, PacerError};
