//! Events handed from the I/O workers to the tick thread.
//!
//! Every event is consumed exactly once, in the tick that drains it, and is
//! never retained afterwards.

use serde::{Deserialize, Serialize};

use crate::channel::slot::SlotWriter;
use crate::domain::viewer::ViewerId;

/// Pointer button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

/// One unit of viewer input.
///
/// These mirror the raw DOM events a browser viewer produces.  Key codes are
/// the browser's legacy `keyCode` values (8 = Backspace, 13 = Enter, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum InputPayload {
    PointerMove { x: f32, y: f32 },
    PointerButton { button: PointerButton, pressed: bool },
    Wheel { dx: f32, dy: f32 },
    Key { code: u32, pressed: bool },
    Text { text: String },
}

/// Everything a viewer-facing worker can tell the tick thread.
#[derive(Debug)]
pub enum InboundEvent {
    /// A viewer finished its transport handshake.
    ///
    /// `outbound` is the writer end of the viewer's single-frame slot; the
    /// broadcaster keeps it for as long as the viewer stays registered.
    Connect {
        viewer: ViewerId,
        address: String,
        outbound: SlotWriter,
    },
    /// The viewer's connection closed.  Idempotent.
    Disconnect { viewer: ViewerId },
    /// Input to apply to the UI state if `viewer` holds the control lease.
    Input {
        viewer: ViewerId,
        payload: InputPayload,
    },
    /// The viewer asks for (or queues for) the control lease.
    RequestControl { viewer: ViewerId },
    /// The viewer gives up the lease, or withdraws its pending claim.
    ReleaseControl { viewer: ViewerId },
    /// The viewer asks for the bootstrap asset to be sent again.
    BootstrapRequest { viewer: ViewerId },
}

impl InboundEvent {
    /// The viewer this event originated from.
    pub fn viewer(&self) -> ViewerId {
        match self {
            InboundEvent::Connect { viewer, .. }
            | InboundEvent::Disconnect { viewer }
            | InboundEvent::Input { viewer, .. }
            | InboundEvent::RequestControl { viewer }
            | InboundEvent::ReleaseControl { viewer }
            | InboundEvent::BootstrapRequest { viewer } => *viewer,
        }
    }

    /// Short variant name for log lines; never includes payload contents.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Connect { .. } => "Connect",
            InboundEvent::Disconnect { .. } => "Disconnect",
            InboundEvent::Input { .. } => "Input",
            InboundEvent::RequestControl { .. } => "RequestControl",
            InboundEvent::ReleaseControl { .. } => "ReleaseControl",
            InboundEvent::BootstrapRequest { .. } => "BootstrapRequest",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::slot::frame_slot;

    #[test]
    fn test_viewer_returns_originating_id_for_every_variant() {
        let (writer, _reader) = frame_slot();
        let id = ViewerId(7);
        let events = vec![
            InboundEvent::Connect {
                viewer: id,
                address: "a".to_string(),
                outbound: writer,
            },
            InboundEvent::Disconnect { viewer: id },
            InboundEvent::Input {
                viewer: id,
                payload: InputPayload::Text {
                    text: "x".to_string(),
                },
            },
            InboundEvent::RequestControl { viewer: id },
            InboundEvent::ReleaseControl { viewer: id },
            InboundEvent::BootstrapRequest { viewer: id },
        ];

        for event in &events {
            assert_eq!(event.viewer(), id, "{} carries the wrong id", event.kind());
        }
    }

    #[test]
    fn test_kind_does_not_expose_text() {
        let event = InboundEvent::Input {
            viewer: ViewerId(1),
            payload: InputPayload::Text {
                text: "secret".to_string(),
            },
        };
        assert_eq!(event.kind(), "Input");
    }
}
