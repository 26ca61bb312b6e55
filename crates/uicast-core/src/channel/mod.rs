//! The two hand-off points between the viewer-facing I/O workers and the
//! single-threaded tick loop.
//!
//! - **`intake`** – inbound: many workers push, the tick thread drains the
//!   whole queue once per tick.
//! - **`slot`** – outbound: the tick thread overwrites, one writer task per
//!   viewer takes.

pub mod intake;
pub mod slot;

pub use intake::{EventIntake, IntakeSender};
pub use slot::{frame_slot, Outbound, SlotClosed, SlotReader, SlotWriter, WireBytes};
