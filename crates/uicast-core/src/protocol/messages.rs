//! JSON messages sent by viewers.
//!
//! Browsers speak JSON naturally, so the inbound direction is a JSON text
//! message per event.  Every message is an object with a `"type"` field that
//! selects the variant; the remaining fields sit next to it:
//!
//! ```json
//! {"type":"PointerMove","x":120.0,"y":48.5}
//! {"type":"PointerButton","button":"left","pressed":true}
//! {"type":"Key","code":13,"pressed":true}
//! {"type":"RequestControl"}
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::event::{InboundEvent, InputPayload, PointerButton};
use crate::domain::viewer::ViewerId;

/// Everything a viewer can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ViewerMessage {
    PointerMove { x: f32, y: f32 },
    PointerButton { button: PointerButton, pressed: bool },
    Wheel { dx: f32, dy: f32 },
    /// Browser `keyCode` plus press/release.
    Key { code: u32, pressed: bool },
    /// Committed text input (one or more characters).
    Text { text: String },
    RequestControl,
    ReleaseControl,
    /// Ask for the bootstrap texture again, e.g. after a client-side reload
    /// of the GPU context.
    RequestBootstrap,
}

impl ViewerMessage {
    /// Tags the message with the sending viewer's id.
    pub fn into_event(self, viewer: ViewerId) -> InboundEvent {
        let payload = match self {
            ViewerMessage::RequestControl => return InboundEvent::RequestControl { viewer },
            ViewerMessage::ReleaseControl => return InboundEvent::ReleaseControl { viewer },
            ViewerMessage::RequestBootstrap => return InboundEvent::BootstrapRequest { viewer },
            ViewerMessage::PointerMove { x, y } => InputPayload::PointerMove { x, y },
            ViewerMessage::PointerButton { button, pressed } => {
                InputPayload::PointerButton { button, pressed }
            }
            ViewerMessage::Wheel { dx, dy } => InputPayload::Wheel { dx, dy },
            ViewerMessage::Key { code, pressed } => InputPayload::Key { code, pressed },
            ViewerMessage::Text { text } => InputPayload::Text { text },
        };
        InboundEvent::Input { viewer, payload }
    }

    /// Variant name for log lines.
    pub fn type_name(&self) -> &'static str {
        match self {
            ViewerMessage::PointerMove { .. } => "PointerMove",
            ViewerMessage::PointerButton { .. } => "PointerButton",
            ViewerMessage::Wheel { .. } => "Wheel",
            ViewerMessage::Key { .. } => "Key",
            ViewerMessage::Text { .. } => "Text",
            ViewerMessage::RequestControl => "RequestControl",
            ViewerMessage::ReleaseControl => "ReleaseControl",
            ViewerMessage::RequestBootstrap => "RequestBootstrap",
        }
    }
}

/// Parses one viewer text message.
///
/// # Errors
///
/// Returns the `serde_json` error for malformed JSON, an unknown `"type"`,
/// or missing/mistyped fields.  Callers drop the message and keep the
/// connection open.
pub fn parse_viewer_message(text: &str) -> Result<ViewerMessage, serde_json::Error> {
    serde_json::from_str(text)
}
