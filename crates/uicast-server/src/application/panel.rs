//! The control panel's UI state.
//!
//! The panel edits one thing, the address of the I/O device, and shows
//! that device's eight pins.  Clicking a pin writes the port with that pin
//! flipped.  "Update" (or Enter in the address field) points the poller at
//! the edited address and asks for an immediate read.
//!
//! Only the lease holder's input reaches [`PanelState::apply_input`]; the
//! tick loop filters everyone else out.

use std::time::Instant;

use tracing::{debug, info, warn};
use uicast_core::application::PinReading;
use uicast_core::{InputPayload, PointerButton, UiState, ViewerId};

use crate::domain::layout::{hit_test, Widget};

/// Longest address the field accepts, in bytes.
pub const ADDRESS_CAPACITY: usize = 255;

/// Browser `keyCode` values the address field reacts to.
pub mod keys {
    pub const BACKSPACE: u32 = 8;
    pub const ENTER: u32 = 13;
    pub const ESCAPE: u32 = 27;
    pub const END: u32 = 35;
    pub const HOME: u32 = 36;
    pub const LEFT: u32 = 37;
    pub const RIGHT: u32 = 39;
    pub const DELETE: u32 = 46;
}

/// The panel's view of the device: where to poll, what was read, and how
/// to actuate.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceLink: Send {
    /// Points subsequent polls and writes at `host`.
    fn set_host(&self, host: &str);

    /// Asks for a read as soon as possible.
    fn request_refresh(&self);

    /// Writes the whole port.  Fire-and-forget.
    fn write_pins(&self, value: u8);

    /// The latest successful read.
    fn reading(&self) -> PinReading;
}

pub struct PanelState {
    /// Text currently in the field, possibly uncommitted.
    address: String,
    /// The address the device link is using.
    committed: String,
    /// Byte offset of the caret, always on a char boundary.
    caret: usize,
    focused: bool,
    pointer: Option<(f32, f32)>,
    pins: PinReading,
    device: Box<dyn DeviceLink>,
}

impl PanelState {
    /// Creates the panel with `address` already committed.
    pub fn new(address: impl Into<String>, device: Box<dyn DeviceLink>) -> Self {
        let address = address.into();
        Self {
            caret: address.len(),
            committed: address.clone(),
            address,
            focused: false,
            pointer: None,
            pins: PinReading::default(),
            device,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn committed_address(&self) -> &str {
        &self.committed
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Number of characters before the caret.
    pub fn caret_column(&self) -> usize {
        self.address[..self.caret].chars().count()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn pointer(&self) -> Option<(f32, f32)> {
        self.pointer
    }

    pub fn pins(&self) -> PinReading {
        self.pins
    }

    fn click(&mut self, x: f32, y: f32) {
        match hit_test(x, y) {
            Some(Widget::AddressField) => {
                self.focused = true;
                self.caret = self.address.len();
            }
            Some(Widget::UpdateButton) => {
                self.focused = false;
                self.commit();
            }
            Some(Widget::Pin(pin)) => {
                let value = self.pins.pins.toggled(pin);
                debug!(pin, value, "pin toggled from panel");
                self.device.write_pins(value);
            }
            None => {
                if self.focused {
                    self.focused = false;
                    self.commit();
                }
            }
        }
    }

    /// Hands the edited address to the device link and requests a read.
    /// An empty field reverts to the committed address.
    fn commit(&mut self) {
        let trimmed = self.address.trim();
        if trimmed.is_empty() {
            warn!("empty device address ignored");
            self.revert();
            return;
        }
        if trimmed != self.committed {
            info!(host = %trimmed, "device address changed");
            self.committed = trimmed.to_string();
            self.device.set_host(&self.committed);
        }
        self.address = self.committed.clone();
        self.caret = self.caret.min(self.address.len());
        while !self.address.is_char_boundary(self.caret) {
            self.caret -= 1;
        }
        self.device.request_refresh();
    }

    fn revert(&mut self) {
        self.address = self.committed.clone();
        self.caret = self.address.len();
    }

    fn key(&mut self, code: u32) {
        match code {
            keys::BACKSPACE => {
                if let Some((index, _)) = self.address[..self.caret].char_indices().next_back() {
                    self.address.remove(index);
                    self.caret = index;
                }
            }
            keys::DELETE => {
                if self.caret < self.address.len() {
                    self.address.remove(self.caret);
                }
            }
            keys::LEFT => {
                if let Some((index, _)) = self.address[..self.caret].char_indices().next_back() {
                    self.caret = index;
                }
            }
            keys::RIGHT => {
                if let Some(c) = self.address[self.caret..].chars().next() {
                    self.caret += c.len_utf8();
                }
            }
            keys::HOME => self.caret = 0,
            keys::END => self.caret = self.address.len(),
            keys::ENTER => {
                self.focused = false;
                self.commit();
            }
            keys::ESCAPE => {
                self.focused = false;
                self.revert();
            }
            _ => {}
        }
    }

    fn insert(&mut self, text: &str) {
        for c in text.chars().filter(|c| !c.is_control()) {
            if self.address.len() + c.len_utf8() > ADDRESS_CAPACITY {
                break;
            }
            self.address.insert(self.caret, c);
            self.caret += c.len_utf8();
        }
    }
}

impl UiState for PanelState {
    fn apply_input(&mut self, _viewer: ViewerId, input: &InputPayload) {
        match input {
            InputPayload::PointerMove { x, y } => self.pointer = Some((*x, *y)),
            InputPayload::PointerButton {
                button: PointerButton::Left,
                pressed: true,
            } => {
                if let Some((x, y)) = self.pointer {
                    self.click(x, y);
                }
            }
            InputPayload::Key {
                code,
                pressed: true,
            } if self.focused => self.key(*code),
            InputPayload::Text { text } if self.focused => self.insert(text),
            _ => {}
        }
    }

    fn update(&mut self, _now: Instant) {
        self.pins = self.device.reading();
    }
}

impl std::fmt::Debug for PanelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelState")
            .field("address", &self.address)
            .field("committed", &self.committed)
            .field("caret", &self.caret)
            .field("focused", &self.focused)
            .field("pointer", &self.pointer)
            .field("pins", &self.pins)
            .finish_non_exhaustive()
    }
}
