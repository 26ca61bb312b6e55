//! Domain types shared by every layer.
//!
//! Nothing in here performs I/O or spawns tasks.

pub mod event;
pub mod frame;
pub mod pins;
pub mod viewer;

pub use event::{InboundEvent, InputPayload, PointerButton};
pub use frame::{BootstrapAsset, Frame, TextureFormat};
pub use pins::{PinState, PortId};
pub use viewer::{Viewer, ViewerId, ViewerIdAllocator};
