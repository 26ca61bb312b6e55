//! Wire formats: binary server → viewer framing and JSON viewer → server
//! messages.

pub mod codec;
pub mod messages;

pub use codec::{
    decode_message, encode_bootstrap, encode_frame, encode_message, CodecError, OutboundMessage,
};
pub use messages::{parse_viewer_message, ViewerMessage};
