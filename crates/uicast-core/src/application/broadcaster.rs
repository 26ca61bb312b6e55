//! Frame broadcaster: encode once, fan out to every viewer's slot.
//!
//! The broadcaster holds the writer end of every registered viewer's
//! outbound slot.  Each tick it encodes the frame into a single shared
//! buffer and publishes a reference-counted handle to every slot; no viewer
//! gets its own copy of the bytes.
//!
//! A slot whose reader has gone away is reported back in
//! [`BroadcastReport::failed`] and dropped from the fan-out.  The tick loop
//! treats those viewers as disconnected.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::channel::slot::{SlotClosed, SlotWriter, WireBytes};
use crate::domain::frame::{BootstrapAsset, Frame};
use crate::domain::viewer::ViewerId;
use crate::protocol::codec::{encode_bootstrap, encode_frame, CodecError};

/// Outcome of one [`FrameBroadcaster::broadcast`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Slots the frame was published to.
    pub delivered: usize,
    /// Viewers whose slot was closed; already detached.
    pub failed: Vec<ViewerId>,
}

/// Owns the outbound side of every viewer connection.
#[derive(Debug, Default)]
pub struct FrameBroadcaster {
    sinks: BTreeMap<ViewerId, SlotWriter>,
    /// Pre-encoded bootstrap message, sent on attach and on request.
    bootstrap: Option<WireBytes>,
}

impl FrameBroadcaster {
    /// Creates a broadcaster, encoding `bootstrap` once up front.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if the asset's pixel buffer does not match
    /// its declared size.
    pub fn new(bootstrap: Option<BootstrapAsset>) -> Result<Self, CodecError> {
        let bootstrap = bootstrap
            .as_ref()
            .map(encode_bootstrap)
            .transpose()?
            .map(WireBytes::from);
        Ok(Self {
            sinks: BTreeMap::new(),
            bootstrap,
        })
    }

    /// Adds a viewer to the fan-out and queues the bootstrap asset for it.
    ///
    /// # Errors
    ///
    /// Returns [`SlotClosed`] if the viewer's writer task is already gone;
    /// the viewer is not attached in that case.
    pub fn attach(&mut self, viewer: ViewerId, writer: SlotWriter) -> Result<(), SlotClosed> {
        if let Some(bytes) = &self.bootstrap {
            writer.publish_bootstrap(Arc::clone(bytes))?;
        }
        self.sinks.insert(viewer, writer);
        debug!(viewer = %viewer, viewers = self.sinks.len(), "viewer attached to broadcast");
        Ok(())
    }

    /// Removes a viewer from the fan-out.  Dropping its writer lets the
    /// viewer's writer task drain and exit.
    pub fn detach(&mut self, viewer: ViewerId) -> bool {
        self.sinks.remove(&viewer).is_some()
    }

    /// Queues the bootstrap asset for one viewer again.
    ///
    /// Returns `Ok(false)` if the viewer is unknown or there is no bootstrap
    /// asset.
    ///
    /// # Errors
    ///
    /// Returns [`SlotClosed`] if the viewer's slot is closed.
    pub fn resend_bootstrap(&self, viewer: ViewerId) -> Result<bool, SlotClosed> {
        match (self.sinks.get(&viewer), &self.bootstrap) {
            (Some(writer), Some(bytes)) => {
                writer.publish_bootstrap(Arc::clone(bytes))?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn is_attached(&self, viewer: ViewerId) -> bool {
        self.sinks.contains_key(&viewer)
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Encodes `frame` once and publishes it to every attached viewer,
    /// overwriting any frame they have not taken yet.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if the frame cannot be encoded; nothing is
    /// published in that case.
    pub fn broadcast(&mut self, frame: &Frame) -> Result<BroadcastReport, CodecError> {
        let bytes: WireBytes = encode_frame(frame)?.into();
        let mut report = BroadcastReport::default();

        for (&viewer, writer) in &self.sinks {
            match writer.publish_frame(frame.sequence, Arc::clone(&bytes)) {
                Ok(()) => report.delivered += 1,
                Err(SlotClosed) => report.failed.push(viewer),
            }
        }
        for viewer in &report.failed {
            self.sinks.remove(viewer);
        }

        trace!(
            sequence = frame.sequence,
            bytes = bytes.len(),
            delivered = report.delivered,
            "frame broadcast"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::slot::{frame_slot, Outbound};
    use crate::domain::frame::TextureFormat;
    use crate::protocol::codec::{decode_message, OutboundMessage};

    fn white_pixel() -> BootstrapAsset {
        BootstrapAsset {
            texture_id: 1,
            format: TextureFormat::Alpha8,
            width: 1,
            height: 1,
            pixels: vec![0xFF],
        }
    }

    fn frame(sequence: u64, data: &[u8]) -> Frame {
        Frame {
            sequence,
            draw_data: data.to_vec(),
        }
    }

    #[test]
    fn test_new_rejects_inconsistent_bootstrap() {
        let mut asset = white_pixel();
        asset.pixels.clear();
        assert!(FrameBroadcaster::new(Some(asset)).is_err());
    }

    #[test]
    fn test_attach_queues_bootstrap_first() {
        // Arrange
        let mut broadcaster = FrameBroadcaster::new(Some(white_pixel())).unwrap();
        let (writer, mut reader) = frame_slot();

        // Act
        broadcaster.attach(ViewerId(1), writer).unwrap();
        broadcaster.broadcast(&frame(1, b"draw")).unwrap();

        // Assert
        let first = reader.try_next().unwrap();
        assert!(matches!(first, Outbound::Bootstrap(_)));
        let (decoded, _) = decode_message(first.bytes()).unwrap();
        assert_eq!(decoded, OutboundMessage::Bootstrap(white_pixel()));
        assert!(matches!(
            reader.try_next(),
            Some(Outbound::Frame { sequence: 1, .. })
        ));
    }

    #[test]
    fn test_attach_without_bootstrap_sends_nothing() {
        let mut broadcaster = FrameBroadcaster::new(None).unwrap();
        let (writer, mut reader) = frame_slot();

        broadcaster.attach(ViewerId(1), writer).unwrap();

        assert!(reader.try_next().is_none());
    }

    #[test]
    fn test_attach_closed_slot_fails() {
        let mut broadcaster = FrameBroadcaster::new(Some(white_pixel())).unwrap();
        let (writer, reader) = frame_slot();
        drop(reader);

        assert_eq!(broadcaster.attach(ViewerId(1), writer), Err(SlotClosed));
        assert!(!broadcaster.is_attached(ViewerId(1)));
    }

    #[test]
    fn test_broadcast_shares_one_encoding() {
        // Arrange
        let mut broadcaster = FrameBroadcaster::new(None).unwrap();
        let (w1, mut r1) = frame_slot();
        let (w2, mut r2) = frame_slot();
        broadcaster.attach(ViewerId(1), w1).unwrap();
        broadcaster.attach(ViewerId(2), w2).unwrap();

        // Act
        let report = broadcaster.broadcast(&frame(7, b"abc")).unwrap();

        // Assert
        assert_eq!(report.delivered, 2);
        let (Some(Outbound::Frame { bytes: b1, .. }), Some(Outbound::Frame { bytes: b2, .. })) =
            (r1.try_next(), r2.try_next())
        else {
            panic!("both viewers should have a frame");
        };
        assert!(Arc::ptr_eq(&b1, &b2));
        let (decoded, _) = decode_message(&b1).unwrap();
        assert_eq!(decoded, OutboundMessage::Frame(frame(7, b"abc")));
    }

    #[test]
    fn test_broadcast_reports_and_detaches_closed_slots() {
        let mut broadcaster = FrameBroadcaster::new(None).unwrap();
        let (w1, _r1) = frame_slot();
        let (w2, r2) = frame_slot();
        broadcaster.attach(ViewerId(1), w1).unwrap();
        broadcaster.attach(ViewerId(2), w2).unwrap();
        drop(r2);

        let report = broadcaster.broadcast(&frame(1, b"x")).unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, vec![ViewerId(2)]);
        assert!(!broadcaster.is_attached(ViewerId(2)));
        assert_eq!(broadcaster.len(), 1);
    }

    #[test]
    fn test_latest_frame_wins_per_viewer() {
        let mut broadcaster = FrameBroadcaster::new(None).unwrap();
        let (writer, mut reader) = frame_slot();
        broadcaster.attach(ViewerId(1), writer).unwrap();

        broadcaster.broadcast(&frame(1, b"old")).unwrap();
        broadcaster.broadcast(&frame(2, b"new")).unwrap();

        assert!(matches!(
            reader.try_next(),
            Some(Outbound::Frame { sequence: 2, .. })
        ));
        assert!(reader.try_next().is_none());
    }

    #[test]
    fn test_resend_bootstrap() {
        let mut broadcaster = FrameBroadcaster::new(Some(white_pixel())).unwrap();
        let (writer, mut reader) = frame_slot();
        broadcaster.attach(ViewerId(1), writer).unwrap();
        reader.try_next();

        assert_eq!(broadcaster.resend_bootstrap(ViewerId(1)), Ok(true));
        assert_eq!(broadcaster.resend_bootstrap(ViewerId(9)), Ok(false));
        assert!(matches!(reader.try_next(), Some(Outbound::Bootstrap(_))));
    }

    #[test]
    fn test_detach_removes_viewer() {
        let mut broadcaster = FrameBroadcaster::new(None).unwrap();
        let (writer, _reader) = frame_slot();
        broadcaster.attach(ViewerId(3), writer).unwrap();

        assert!(broadcaster.detach(ViewerId(3)));
        assert!(!broadcaster.detach(ViewerId(3)));
        assert!(broadcaster.is_empty());
    }
}
