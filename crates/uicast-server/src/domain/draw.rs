//! Draw list: the frame payload the panel renderer produces.
//!
//! A frame is a flat list of primitive commands in painter's order, encoded
//! with `bincode`.  The viewer decodes it and replays the commands; solid
//! fills sample the white texel of the bootstrap texture.

use serde::{Deserialize, Serialize};

/// RGBA colour packed as `0xRRGGBBAA`.
pub type Color = u32;

pub const COLOR_WINDOW_BG: Color = 0x1E1E_1EF0;
pub const COLOR_TITLE_BG: Color = 0x2D4A_7BFF;
pub const COLOR_FRAME_BG: Color = 0x2A2A_2AFF;
pub const COLOR_FRAME_FOCUSED: Color = 0x3D5A_8BFF;
pub const COLOR_BUTTON: Color = 0x4272_B5FF;
pub const COLOR_TEXT: Color = 0xFFFF_FFFF;
pub const COLOR_TEXT_DISABLED: Color = 0x8080_80FF;
pub const COLOR_PIN_ON: Color = 0x3CC8_50FF;
pub const COLOR_PIN_OFF: Color = 0x5050_50FF;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    /// Filled or outlined rectangle.
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
        filled: bool,
    },
    /// A run of text with its top-left corner at `(x, y)`.
    Text {
        x: f32,
        y: f32,
        color: Color,
        text: String,
    },
    /// Text caret.
    Caret { x: f32, y: f32, height: f32 },
    /// Software mouse cursor of the lease holder.
    Cursor { x: f32, y: f32 },
}

/// One rendered frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawList {
    pub display_width: f32,
    pub display_height: f32,
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new(display_width: f32, display_height: f32) -> Self {
        Self {
            display_width,
            display_height,
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn fill(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.push(DrawCommand::Rect {
            x,
            y,
            width,
            height,
            color,
            filled: true,
        });
    }

    pub fn text(&mut self, x: f32, y: f32, color: Color, text: impl Into<String>) {
        self.push(DrawCommand::Text {
            x,
            y,
            color,
            text: text.into(),
        });
    }

    /// Serializes the list for the wire.
    ///
    /// # Errors
    ///
    /// Returns the `bincode` error if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Inverse of [`encode`](Self::encode); used by tests and Rust viewers.
    ///
    /// # Errors
    ///
    /// Returns the `bincode` error if `bytes` is not a valid draw list.
    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// All text runs, in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}
