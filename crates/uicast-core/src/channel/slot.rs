//! Single-slot outbound mailbox between the tick thread and one viewer's
//! writer task.
//!
//! The tick thread produces a frame every tick; a viewer on a slow link may
//! take longer than a tick to write one.  A queue would grow without bound
//! and deliver frames that are already stale, so each viewer gets exactly
//! one slot instead:
//!
//! ```text
//! tick thread ── publish_frame(n)   ──► [ bootstrap? | frame n   ] ──► writer task
//!             ── publish_frame(n+1) ──► [ bootstrap? | frame n+1 ] ──►   next().await
//! ```
//!
//! Publishing overwrites any frame the writer task has not picked up yet
//! (latest-frame-wins).  The bootstrap cell is separate so that an early
//! frame can never displace the one-time texture upload, and the reader
//! always yields a pending bootstrap before a pending frame.
//!
//! Neither side ever blocks on the other: the writer only takes a short
//! mutex to swap a pointer, and the reader awaits a [`Notify`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::Notify;

/// Encoded wire bytes shared between every viewer that receives them.
pub type WireBytes = Arc<[u8]>;

/// The reader end of the slot has gone away (the viewer's writer task ended).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("viewer outbound slot is closed")]
pub struct SlotClosed;

/// One message taken out of the slot by the writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Bootstrap(WireBytes),
    Frame { sequence: u64, bytes: WireBytes },
}

impl Outbound {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Outbound::Bootstrap(bytes) | Outbound::Frame { bytes, .. } => bytes,
        }
    }
}

#[derive(Debug, Default)]
struct SlotState {
    bootstrap: Option<WireBytes>,
    frame: Option<(u64, WireBytes)>,
    writer_closed: bool,
    reader_closed: bool,
    /// Frames overwritten before the reader picked them up.
    superseded: u64,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<SlotState>,
    notify: Notify,
}

impl Shared {
    // A panic while holding this lock cannot leave the state half-written
    // (every critical section is a handful of assignments), so a poisoned
    // lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Creates a connected writer/reader pair.
pub fn frame_slot() -> (SlotWriter, SlotReader) {
    let shared = Arc::new(Shared::default());
    (
        SlotWriter {
            shared: Arc::clone(&shared),
        },
        SlotReader { shared },
    )
}

/// Tick-thread end of a viewer's slot.
///
/// Dropping the writer tells the reader no more messages will arrive; the
/// reader still drains whatever is pending first.
#[derive(Debug)]
pub struct SlotWriter {
    shared: Arc<Shared>,
}

impl SlotWriter {
    /// Stores `bytes` as the viewer's next frame, replacing any frame the
    /// writer task has not taken yet.
    ///
    /// # Errors
    ///
    /// Returns [`SlotClosed`] if the reader end has been dropped.
    pub fn publish_frame(&self, sequence: u64, bytes: WireBytes) -> Result<(), SlotClosed> {
        {
            let mut state = self.shared.lock();
            if state.reader_closed {
                return Err(SlotClosed);
            }
            if state.frame.replace((sequence, bytes)).is_some() {
                state.superseded += 1;
            }
        }
        self.shared.notify.notify_one();
        Ok(())
    }

    /// Stores the bootstrap asset; it is delivered before any pending frame.
    ///
    /// # Errors
    ///
    /// Returns [`SlotClosed`] if the reader end has been dropped.
    pub fn publish_bootstrap(&self, bytes: WireBytes) -> Result<(), SlotClosed> {
        {
            let mut state = self.shared.lock();
            if state.reader_closed {
                return Err(SlotClosed);
            }
            state.bootstrap = Some(bytes);
        }
        self.shared.notify.notify_one();
        Ok(())
    }

    /// `true` once the reader end has been dropped.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().reader_closed
    }

    /// Number of frames that were overwritten before delivery.
    pub fn superseded(&self) -> u64 {
        self.shared.lock().superseded
    }
}

impl Drop for SlotWriter {
    fn drop(&mut self) {
        self.shared.lock().writer_closed = true;
        self.shared.notify.notify_one();
    }
}

/// Writer-task end of a viewer's slot.
#[derive(Debug)]
pub struct SlotReader {
    shared: Arc<Shared>,
}

impl SlotReader {
    /// Takes the pending message without waiting.
    ///
    /// A pending bootstrap asset always comes out before a pending frame.
    pub fn try_next(&mut self) -> Option<Outbound> {
        let mut state = self.shared.lock();
        take_pending(&mut state)
    }

    /// Waits for the next message.
    ///
    /// Returns `None` once the writer end is gone and nothing is pending.
    pub async fn next(&mut self) -> Option<Outbound> {
        loop {
            {
                let mut state = self.shared.lock();
                if let Some(message) = take_pending(&mut state) {
                    return Some(message);
                }
                if state.writer_closed {
                    return None;
                }
            }
            // `notify_one` stores a permit when nobody is waiting, so a
            // publish that lands between the check above and this await is
            // not lost.
            self.shared.notify.notified().await;
        }
    }
}

impl Drop for SlotReader {
    fn drop(&mut self) {
        self.shared.lock().reader_closed = true;
    }
}

fn take_pending(state: &mut SlotState) -> Option<Outbound> {
    if let Some(bytes) = state.bootstrap.take() {
        return Some(Outbound::Bootstrap(bytes));
    }
    state
        .frame
        .take()
        .map(|(sequence, bytes)| Outbound::Frame { sequence, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    fn bytes(data: &[u8]) -> WireBytes {
        Arc::from(data)
    }

    #[test]
    fn test_try_next_on_empty_slot_returns_none() {
        let (_writer, mut reader) = frame_slot();
        assert_eq!(reader.try_next(), None);
    }

    #[test]
    fn test_newer_frame_replaces_undelivered_frame() {
        // Arrange
        let (writer, mut reader) = frame_slot();

        // Act: two frames before the reader drains either
        writer.publish_frame(1, bytes(b"one")).unwrap();
        writer.publish_frame(2, bytes(b"two")).unwrap();

        // Assert: only the second is ever delivered
        assert_eq!(
            reader.try_next(),
            Some(Outbound::Frame {
                sequence: 2,
                bytes: bytes(b"two")
            })
        );
        assert_eq!(reader.try_next(), None);
        assert_eq!(writer.superseded(), 1);
    }

    #[test]
    fn test_bootstrap_is_delivered_before_frame() {
        let (writer, mut reader) = frame_slot();

        writer.publish_frame(5, bytes(b"frame")).unwrap();
        writer.publish_bootstrap(bytes(b"texture")).unwrap();

        assert_eq!(reader.try_next(), Some(Outbound::Bootstrap(bytes(b"texture"))));
        assert_eq!(
            reader.try_next(),
            Some(Outbound::Frame {
                sequence: 5,
                bytes: bytes(b"frame")
            })
        );
    }

    #[test]
    fn test_frame_does_not_displace_bootstrap() {
        let (writer, mut reader) = frame_slot();

        writer.publish_bootstrap(bytes(b"texture")).unwrap();
        writer.publish_frame(1, bytes(b"a")).unwrap();
        writer.publish_frame(2, bytes(b"b")).unwrap();

        assert!(matches!(reader.try_next(), Some(Outbound::Bootstrap(_))));
        assert!(matches!(
            reader.try_next(),
            Some(Outbound::Frame { sequence: 2, .. })
        ));
    }

    #[test]
    fn test_publish_after_reader_dropped_fails() {
        let (writer, reader) = frame_slot();
        drop(reader);

        assert!(writer.is_closed());
        assert_eq!(writer.publish_frame(1, bytes(b"x")), Err(SlotClosed));
        assert_eq!(writer.publish_bootstrap(bytes(b"x")), Err(SlotClosed));
    }

    #[test]
    fn test_next_waits_until_publish() {
        // Arrange
        let (writer, mut reader) = frame_slot();
        let mut next = task::spawn(reader.next());

        // Act / Assert: nothing pending yet
        assert_pending!(next.poll());

        writer.publish_frame(9, bytes(b"late")).unwrap();

        // The publish must wake the waiting reader.
        assert!(next.is_woken());
        assert_ready_eq!(
            next.poll(),
            Some(Outbound::Frame {
                sequence: 9,
                bytes: bytes(b"late")
            })
        );
    }

    #[test]
    fn test_next_returns_none_after_writer_dropped() {
        let (writer, mut reader) = frame_slot();
        let mut next = task::spawn(reader.next());
        assert_pending!(next.poll());

        drop(writer);

        assert!(next.is_woken());
        assert_ready_eq!(next.poll(), None);
    }

    #[tokio::test]
    async fn test_pending_frame_is_drained_before_close() {
        let (writer, mut reader) = frame_slot();
        writer.publish_frame(3, bytes(b"last")).unwrap();
        drop(writer);

        assert!(matches!(
            reader.next().await,
            Some(Outbound::Frame { sequence: 3, .. })
        ));
        assert_eq!(reader.next().await, None);
    }
}
