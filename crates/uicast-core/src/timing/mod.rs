//! Tick scheduling.

pub mod pacer;

pub use pacer::{Pacer, PacerError, DEFAULT_FPS};
