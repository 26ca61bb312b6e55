//! Event intake: the many-producer, single-consumer hand-off from the
//! viewer-facing workers to the tick thread.
//!
//! Producers append under a mutex; the tick thread swaps the whole vector out
//! once per tick.  The swap is the only point where events from different
//! viewers are put into one order, and that order is the order in which the
//! producers acquired the lock.  Because the swap takes everything present
//! at that instant, no event is lost and none is seen twice.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::domain::event::InboundEvent;

type Queue = Arc<Mutex<Vec<InboundEvent>>>;

fn lock(queue: &Queue) -> MutexGuard<'_, Vec<InboundEvent>> {
    // Pushing and swapping cannot leave the vector in a torn state.
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Consumer end, owned by the tick loop.
#[derive(Debug, Default)]
pub struct EventIntake {
    queue: Queue,
}

impl EventIntake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a producer handle.  Clone it freely, one per worker.
    pub fn sender(&self) -> IntakeSender {
        IntakeSender {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Takes every event that arrived since the previous drain, oldest first.
    pub fn drain(&self) -> Vec<InboundEvent> {
        let batch = std::mem::take(&mut *lock(&self.queue));
        if !batch.is_empty() {
            trace!(count = batch.len(), "drained inbound events");
        }
        batch
    }

    /// Number of events waiting for the next drain.
    pub fn pending(&self) -> usize {
        lock(&self.queue).len()
    }
}

/// Producer end, held by the viewer-facing I/O workers.
#[derive(Debug, Clone)]
pub struct IntakeSender {
    queue: Queue,
}

impl IntakeSender {
    /// Appends an event for the next tick.  Never waits on the tick thread
    /// beyond the length of a `Vec::push`.
    pub fn push(&self, event: InboundEvent) {
        lock(&self.queue).push(event);
    }
}
