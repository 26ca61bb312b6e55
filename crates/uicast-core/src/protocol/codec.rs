//! Binary framing for server → viewer messages.
//!
//! Wire format:
//! ```text
//! [version:1][kind:1][reserved:2][payload_len:4][sequence:8][payload:N]
//! ```
//! Total header size: 16 bytes.  All multi-byte integers are big-endian.
//!
//! Payloads by kind:
//!
//! | Kind   | Name      | Payload                                                   |
//! |--------|-----------|-----------------------------------------------------------|
//! | `0x01` | Bootstrap | `texture_id:4 format:1 width:4 height:4 pixels:N`         |
//! | `0x02` | Frame     | opaque draw-command blob                                  |
//!
//! Bootstrap messages carry sequence 0; frames carry their frame sequence.
//! A frame is encoded exactly once per tick and the resulting bytes are
//! shared by every viewer.

use thiserror::Error;

use crate::domain::frame::{BootstrapAsset, Frame, TextureFormat};

pub const PROTOCOL_VERSION: u8 = 0x01;
pub const HEADER_SIZE: usize = 16;

const BOOTSTRAP_FIXED_SIZE: usize = 13;

/// Message kind byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    Bootstrap = 0x01,
    Frame = 0x02,
}

impl MessageKind {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(MessageKind::Bootstrap),
            0x02 => Some(MessageKind::Frame),
            _ => None,
        }
    }
}

/// A decoded server → viewer message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Bootstrap(BootstrapAsset),
    Frame(Frame),
}

/// Errors that can occur while encoding or decoding a message.
#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    #[error("unknown message kind: 0x{0:02X}")]
    UnknownKind(u8),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("payload of {0} bytes does not fit the 32-bit length field")]
    PayloadTooLarge(usize),
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encodes a rendered frame.
///
/// # Errors
///
/// Returns [`CodecError::PayloadTooLarge`] if the draw data exceeds 4 GiB.
pub fn encode_frame(frame: &Frame) -> Result<Vec<u8>, CodecError> {
    encode_with_header(MessageKind::Frame, frame.sequence, &frame.draw_data)
}

/// Encodes a bootstrap texture upload.
///
/// # Errors
///
/// Returns [`CodecError::MalformedPayload`] if the pixel buffer length does
/// not match `width * height * bytes_per_pixel`.
pub fn encode_bootstrap(asset: &BootstrapAsset) -> Result<Vec<u8>, CodecError> {
    if asset.pixels.len() != asset.expected_len() {
        return Err(CodecError::MalformedPayload(format!(
            "texture {} is {}x{} but has {} pixel bytes, expected {}",
            asset.texture_id,
            asset.width,
            asset.height,
            asset.pixels.len(),
            asset.expected_len()
        )));
    }

    let mut payload = Vec::with_capacity(BOOTSTRAP_FIXED_SIZE + asset.pixels.len());
    payload.extend_from_slice(&asset.texture_id.to_be_bytes());
    payload.push(asset.format as u8);
    payload.extend_from_slice(&asset.width.to_be_bytes());
    payload.extend_from_slice(&asset.height.to_be_bytes());
    payload.extend_from_slice(&asset.pixels);

    encode_with_header(MessageKind::Bootstrap, 0, &payload)
}

/// Encodes any [`OutboundMessage`].
///
/// # Errors
///
/// See [`encode_frame`] and [`encode_bootstrap`].
pub fn encode_message(message: &OutboundMessage) -> Result<Vec<u8>, CodecError> {
    match message {
        OutboundMessage::Bootstrap(asset) => encode_bootstrap(asset),
        OutboundMessage::Frame(frame) => encode_frame(frame),
    }
}

fn encode_with_header(
    kind: MessageKind,
    sequence: u64,
    payload: &[u8],
) -> Result<Vec<u8>, CodecError> {
    let payload_len =
        u32::try_from(payload.len()).map_err(|_| CodecError::PayloadTooLarge(payload.len()))?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.push(PROTOCOL_VERSION);
    buf.push(kind as u8);
    buf.push(0x00); // reserved
    buf.push(0x00); // reserved
    buf.extend_from_slice(&payload_len.to_be_bytes());
    buf.extend_from_slice(&sequence.to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decodes one message from the start of `bytes`.
///
/// Returns the message and the number of bytes consumed.
///
/// # Errors
///
/// Returns [`CodecError`] if the header or payload is malformed or
/// truncated.
///
/// # Examples
///
/// ```rust
/// use uicast_core::domain::Frame;
/// use uicast_core::protocol::codec::{decode_message, encode_frame, OutboundMessage};
///
/// let frame = Frame { sequence: 7, draw_data: vec![1, 2, 3] };
/// let bytes = encode_frame(&frame).unwrap();
/// let (decoded, consumed) = decode_message(&bytes).unwrap();
/// assert_eq!(decoded, OutboundMessage::Frame(frame));
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn decode_message(bytes: &[u8]) -> Result<(OutboundMessage, usize), CodecError> {
    if bytes.len() < HEADER_SIZE {
        return Err(CodecError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let version = bytes[0];
    if version != PROTOCOL_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let kind = MessageKind::from_u8(bytes[1]).ok_or(CodecError::UnknownKind(bytes[1]))?;
    let payload_len = read_u32(&bytes[4..8]) as usize;
    let sequence = read_u64(&bytes[8..16]);

    let total = HEADER_SIZE + payload_len;
    if bytes.len() < total {
        return Err(CodecError::InsufficientData {
            needed: total,
            available: bytes.len(),
        });
    }
    let payload = &bytes[HEADER_SIZE..total];

    let message = match kind {
        MessageKind::Frame => OutboundMessage::Frame(Frame {
            sequence,
            draw_data: payload.to_vec(),
        }),
        MessageKind::Bootstrap => OutboundMessage::Bootstrap(decode_bootstrap(payload)?),
    };
    Ok((message, total))
}

fn decode_bootstrap(payload: &[u8]) -> Result<BootstrapAsset, CodecError> {
    if payload.len() < BOOTSTRAP_FIXED_SIZE {
        return Err(CodecError::InsufficientData {
            needed: BOOTSTRAP_FIXED_SIZE,
            available: payload.len(),
        });
    }
    let format = TextureFormat::from_u8(payload[4]).ok_or_else(|| {
        CodecError::MalformedPayload(format!("texture format 0x{:02X}", payload[4]))
    })?;
    let asset = BootstrapAsset {
        texture_id: read_u32(&payload[0..4]),
        format,
        width: read_u32(&payload[5..9]),
        height: read_u32(&payload[9..13]),
        pixels: payload[BOOTSTRAP_FIXED_SIZE..].to_vec(),
    };
    if asset.pixels.len() != asset.expected_len() {
        return Err(CodecError::MalformedPayload(format!(
            "texture {}x{} with {} pixel bytes",
            asset.width,
            asset.height,
            asset.pixels.len()
        )));
    }
    Ok(asset)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_be_bytes(buf)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_be_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font_texture() -> BootstrapAsset {
        BootstrapAsset {
            texture_id: 0,
            format: TextureFormat::Alpha8,
            width: 3,
            height: 2,
            pixels: vec![0, 64, 128, 192, 255, 1],
        }
    }

    #[test]
    fn test_frame_header_layout() {
        // Arrange
        let frame = Frame {
            sequence: 0x0102,
            draw_data: vec![0xAA, 0xBB],
        };

        // Act
        let bytes = encode_frame(&frame).unwrap();

        // Assert
        assert_eq!(bytes.len(), HEADER_SIZE + 2);
        assert_eq!(bytes[0], PROTOCOL_VERSION);
        assert_eq!(bytes[1], MessageKind::Frame as u8);
        assert_eq!(&bytes[2..4], &[0, 0]);
        assert_eq!(&bytes[4..8], &2u32.to_be_bytes());
        assert_eq!(&bytes[8..16], &0x0102u64.to_be_bytes());
        assert_eq!(&bytes[16..], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_bootstrap_decodes_to_same_asset() {
        let asset = font_texture();
        let bytes = encode_bootstrap(&asset).unwrap();

        let (decoded, consumed) = decode_message(&bytes).unwrap();

        assert_eq!(decoded, OutboundMessage::Bootstrap(asset));
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn test_bootstrap_carries_sequence_zero() {
        let bytes = encode_bootstrap(&font_texture()).unwrap();
        assert_eq!(&bytes[8..16], &0u64.to_be_bytes());
    }

    #[test]
    fn test_encode_bootstrap_rejects_wrong_pixel_count() {
        let mut asset = font_texture();
        asset.pixels.pop();

        let result = encode_bootstrap(&asset);

        assert!(matches!(result, Err(CodecError::MalformedPayload(_))));
    }

    #[test]
    fn test_decode_short_header_is_insufficient_data() {
        let result = decode_message(&[PROTOCOL_VERSION, 0x02, 0]);
        assert_eq!(
            result.unwrap_err(),
            CodecError::InsufficientData {
                needed: HEADER_SIZE,
                available: 3
            }
        );
    }

    #[test]
    fn test_decode_truncated_payload_is_insufficient_data() {
        let mut bytes = encode_frame(&Frame {
            sequence: 1,
            draw_data: vec![1, 2, 3, 4],
        })
        .unwrap();
        bytes.truncate(HEADER_SIZE + 2);

        let result = decode_message(&bytes);

        assert!(matches!(result, Err(CodecError::InsufficientData { .. })));
    }

    #[test]
    fn test_decode_rejects_unknown_version_and_kind() {
        let mut bytes = encode_frame(&Frame {
            sequence: 1,
            draw_data: vec![],
        })
        .unwrap();

        bytes[0] = 0x09;
        assert_eq!(decode_message(&bytes).unwrap_err(), CodecError::UnsupportedVersion(0x09));

        bytes[0] = PROTOCOL_VERSION;
        bytes[1] = 0x7E;
        assert_eq!(decode_message(&bytes).unwrap_err(), CodecError::UnknownKind(0x7E));
    }

    #[test]
    fn test_decode_consumes_only_first_message() {
        let mut bytes = encode_frame(&Frame {
            sequence: 1,
            draw_data: vec![9],
        })
        .unwrap();
        let first_len = bytes.len();
        bytes.extend(
            encode_frame(&Frame {
                sequence: 2,
                draw_data: vec![8],
            })
            .unwrap(),
        );

        let (first, consumed) = decode_message(&bytes).unwrap();
        let (second, _) = decode_message(&bytes[consumed..]).unwrap();

        assert_eq!(consumed, first_len);
        assert!(matches!(first, OutboundMessage::Frame(Frame { sequence: 1, .. })));
        assert!(matches!(second, OutboundMessage::Frame(Frame { sequence: 2, .. })));
    }
}
