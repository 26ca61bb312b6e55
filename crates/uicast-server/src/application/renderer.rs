//! Turns [`PanelState`] into a [`DrawList`] once per tick.

use tracing::warn;
use uicast_core::{BootstrapAsset, RenderDriver, RenderView, TextureFormat};

use crate::application::panel::PanelState;
use crate::domain::draw::{
    DrawCommand, DrawList, COLOR_BUTTON, COLOR_FRAME_BG, COLOR_FRAME_FOCUSED, COLOR_PIN_OFF,
    COLOR_PIN_ON, COLOR_TEXT, COLOR_TEXT_DISABLED, COLOR_TITLE_BG, COLOR_WINDOW_BG,
};
use crate::domain::layout::{
    pin_region, Region, ADDRESS_FIELD, DISPLAY_HEIGHT, DISPLAY_WIDTH, LINE_HEIGHT, MAIN_WINDOW,
    PIN_COUNT, TITLE_BAR_HEIGHT, UPDATE_BUTTON, VIEWER_WINDOW,
};

/// Advance of one glyph in the viewer's monospace font.
pub const GLYPH_WIDTH: f32 = 7.0;

/// Inner padding between a frame's edge and its text.
const PADDING: f32 = 4.0;

/// Texture id of the bootstrap texture.
pub const WHITE_TEXTURE_ID: u32 = 0;

/// Renders the control panel.
#[derive(Debug, Default)]
pub struct PanelRenderer;

impl PanelRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Builds the draw list without encoding it.
    pub fn draw(&self, panel: &PanelState, view: &RenderView<'_>) -> DrawList {
        let mut list = DrawList::new(DISPLAY_WIDTH, DISPLAY_HEIGHT);
        draw_main_window(&mut list, panel);
        draw_viewer_window(&mut list, view);
        if view.lease.holder.is_some() {
            if let Some((x, y)) = panel.pointer() {
                list.push(DrawCommand::Cursor { x, y });
            }
        }
        list
    }
}

impl RenderDriver<PanelState> for PanelRenderer {
    /// A single white texel that solid fills sample from.
    fn bootstrap_asset(&self) -> Option<BootstrapAsset> {
        Some(BootstrapAsset {
            texture_id: WHITE_TEXTURE_ID,
            format: TextureFormat::Alpha8,
            width: 1,
            height: 1,
            pixels: vec![0xFF],
        })
    }

    fn render(&mut self, state: &PanelState, view: &RenderView<'_>) -> Option<Vec<u8>> {
        match self.draw(state, view).encode() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(sequence = view.sequence, error = %e, "draw list encoding failed");
                None
            }
        }
    }
}

fn window(list: &mut DrawList, region: Region, title: &str) {
    list.fill(region.x, region.y, region.width, region.height, COLOR_WINDOW_BG);
    list.fill(region.x, region.y, region.width, TITLE_BAR_HEIGHT, COLOR_TITLE_BG);
    list.text(region.x + PADDING * 2.0, region.y + PADDING, COLOR_TEXT, title);
}

fn frame(list: &mut DrawList, region: Region, color: u32) {
    list.fill(region.x, region.y, region.width, region.height, color);
}

fn draw_main_window(list: &mut DrawList, panel: &PanelState) {
    window(list, MAIN_WINDOW, "Main");

    // Address field
    let field_color = if panel.is_focused() {
        COLOR_FRAME_FOCUSED
    } else {
        COLOR_FRAME_BG
    };
    frame(list, ADDRESS_FIELD, field_color);
    list.text(
        ADDRESS_FIELD.x + PADDING,
        ADDRESS_FIELD.y + PADDING,
        COLOR_TEXT,
        panel.address(),
    );
    list.text(
        ADDRESS_FIELD.right() + PADDING * 2.0,
        ADDRESS_FIELD.y + PADDING,
        COLOR_TEXT,
        "IP address",
    );
    if panel.is_focused() {
        list.push(DrawCommand::Caret {
            x: ADDRESS_FIELD.x + PADDING + GLYPH_WIDTH * panel.caret_column() as f32,
            y: ADDRESS_FIELD.y + PADDING,
            height: ADDRESS_FIELD.height - PADDING * 2.0,
        });
    }

    // Update button
    frame(list, UPDATE_BUTTON, COLOR_BUTTON);
    list.text(
        UPDATE_BUTTON.x + PADDING * 2.0,
        UPDATE_BUTTON.y + PADDING,
        COLOR_TEXT,
        "Update",
    );

    // Pins
    let reading = panel.pins();
    for pin in 0..PIN_COUNT {
        let region = pin_region(pin);
        let color = if reading.pins.get(pin) {
            COLOR_PIN_ON
        } else {
            COLOR_PIN_OFF
        };
        frame(list, region, color);
        list.text(
            region.x + region.width / 2.0 - GLYPH_WIDTH / 2.0,
            region.bottom() + PADDING,
            COLOR_TEXT,
            pin.to_string(),
        );
    }

    let status = if reading.updated_at.is_some() {
        format!("Port value {} (read #{})", reading.pins.bits(), reading.generation)
    } else {
        "No reading yet".to_string()
    };
    let last_pin = pin_region(PIN_COUNT - 1);
    list.text(
        last_pin.right() + PADDING * 4.0,
        last_pin.y + PADDING,
        COLOR_TEXT_DISABLED,
        status,
    );
}

fn draw_viewer_window(list: &mut DrawList, view: &RenderView<'_>) {
    window(
        list,
        VIEWER_WINDOW,
        &format!("Viewers ({})", view.viewers.len()),
    );

    let x = VIEWER_WINDOW.x + PADDING * 2.0;
    let mut y = VIEWER_WINDOW.y + TITLE_BAR_HEIGHT + PADDING;
    list.text(x, y, COLOR_TEXT_DISABLED, " Id   Address");
    y += LINE_HEIGHT;

    for viewer in view.viewers {
        if y + LINE_HEIGHT > VIEWER_WINDOW.bottom() {
            break;
        }
        list.text(
            x,
            y,
            COLOR_TEXT,
            format!("{:3} : {}", viewer.id.0, viewer.address),
        );
        y += LINE_HEIGHT;
        if viewer.has_control {
            let secs = view
                .control_remaining
                .map_or(0.0, |remaining| remaining.as_secs_f32());
            list.text(
                x + GLYPH_WIDTH * 6.0,
                y,
                COLOR_TEXT_DISABLED,
                format!("[has control for {secs:4.2} seconds]"),
            );
            y += LINE_HEIGHT;
        }
    }

    if view.lease.holder.is_none() && !view.viewers.is_empty() {
        list.text(
            x,
            VIEWER_WINDOW.bottom() - LINE_HEIGHT - PADDING,
            COLOR_TEXT_DISABLED,
            "Control is free",
        );
    }
}
