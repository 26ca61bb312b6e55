//! Viewer identity and metadata.
//!
//! A *viewer* is one remote client with an open connection to the frame
//! stream.  Every viewer sees every frame; at most one of them (the control
//! lease holder) may also drive input.
//!
//! # Id allocation
//!
//! Viewer ids are allocated by the I/O worker that accepts the connection,
//! *before* the tick thread has seen the viewer, so that every event the
//! worker forwards can already be tagged with the id.  The allocator is an
//! atomic counter shared by all workers and by the registry.  Ids start at 1
//! and are never handed out twice during the lifetime of the process.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Unique identifier of a connected viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewerId(pub u64);

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata for a registered viewer.
///
/// Owned exclusively by the [`ConnectionRegistry`]; every other component
/// refers to viewers by [`ViewerId`] only.
///
/// [`ConnectionRegistry`]: crate::application::registry::ConnectionRegistry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub id: ViewerId,
    /// Remote address as reported by the transport (e.g. `"10.0.0.7:51234"`).
    pub address: String,
    pub connected_at: Instant,
    /// `true` only for the current control lease holder.
    pub has_control: bool,
}

impl Viewer {
    pub fn new(id: ViewerId, address: impl Into<String>, connected_at: Instant) -> Self {
        Self {
            id,
            address: address.into(),
            connected_at,
            has_control: false,
        }
    }
}

/// Thread-safe allocator of fresh [`ViewerId`]s.
///
/// # Examples
///
/// ```rust
/// use uicast_core::domain::viewer::{ViewerId, ViewerIdAllocator};
///
/// let ids = ViewerIdAllocator::new();
/// assert_eq!(ids.allocate(), ViewerId(1));
/// assert_eq!(ids.allocate(), ViewerId(2));
/// ```
#[derive(Debug)]
pub struct ViewerIdAllocator {
    next: AtomicU64,
}

impl ViewerIdAllocator {
    /// Creates an allocator whose first id is 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns a fresh id.
    ///
    /// `Relaxed` is enough: the counter only has to hand out distinct values,
    /// it does not publish any other memory.
    pub fn allocate(&self) -> ViewerId {
        ViewerId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the id the next call to [`allocate`](Self::allocate) will
    /// produce, without consuming it.
    pub fn peek(&self) -> ViewerId {
        ViewerId(self.next.load(Ordering::Relaxed))
    }
}

impl Default for ViewerIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
