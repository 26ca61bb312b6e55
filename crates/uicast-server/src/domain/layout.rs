//! Fixed geometry of the control panel.
//!
//! The panel is drawn on a 1200 × 800 logical display.  Viewers scale it to
//! their own window and send pointer coordinates back in the same logical
//! space, so hit-testing here needs no per-viewer state.
//!
//! ```text
//! (0,0)
//!   ┌─ Main ──────────────────────────────┐ ┌─ Viewers (n) ─────────┐
//!   │ [ 192.168.1.73            ] IP addr │ │  1 : 10.0.0.5:50312   │
//!   │ [ Update ]                          │ │  2 : 10.0.0.9:50400   │
//!   │ (0)(1)(2)(3)(4)(5)(6)(7)   pins     │ │      [has control...] │
//!   └─────────────────────────────────────┘ └───────────────────────┘
//! ```

/// Logical display size.
pub const DISPLAY_WIDTH: f32 = 1200.0;
pub const DISPLAY_HEIGHT: f32 = 800.0;

/// Height of one line of text, used for list rows.
pub const LINE_HEIGHT: f32 = 18.0;

/// Height of a window's title bar.
pub const TITLE_BAR_HEIGHT: f32 = 22.0;

/// Number of pin indicators on the panel.
pub const PIN_COUNT: usize = 8;

/// An axis-aligned rectangle in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Region {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns the rightmost X coordinate (exclusive).
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Returns the bottommost Y coordinate (exclusive).
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Returns `true` if the point lies inside the region.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// The main window holding the device controls.
pub const MAIN_WINDOW: Region = Region::new(8.0, 4.0, 800.0, 400.0);

/// The address text field inside the main window.
pub const ADDRESS_FIELD: Region = Region::new(20.0, 36.0, 300.0, 22.0);

/// The "Update" button below the address field.
pub const UPDATE_BUTTON: Region = Region::new(20.0, 68.0, 80.0, 22.0);

/// Top-left of the first pin indicator; the rest follow to the right.
const PIN_ORIGIN: (f32, f32) = (20.0, 104.0);
const PIN_SIZE: f32 = 28.0;
const PIN_SPACING: f32 = 36.0;

/// The connected-viewer list.
pub const VIEWER_WINDOW: Region = Region::new(820.0, 4.0, 370.0, 300.0);

/// A clickable element of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    AddressField,
    UpdateButton,
    Pin(usize),
}

/// Bounds of pin indicator `index` (0..8).
pub fn pin_region(index: usize) -> Region {
    Region::new(
        PIN_ORIGIN.0 + PIN_SPACING * index as f32,
        PIN_ORIGIN.1,
        PIN_SIZE,
        PIN_SIZE,
    )
}

/// The widget under the point, if any.
pub fn hit_test(x: f32, y: f32) -> Option<Widget> {
    if ADDRESS_FIELD.contains(x, y) {
        return Some(Widget::AddressField);
    }
    if UPDATE_BUTTON.contains(x, y) {
        return Some(Widget::UpdateButton);
    }
    (0..PIN_COUNT)
        .find(|&i| pin_region(i).contains(x, y))
        .map(Widget::Pin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_contains_is_half_open() {
        let r = Region::new(10.0, 10.0, 5.0, 5.0);
        assert!(r.contains(10.0, 10.0));
        assert!(r.contains(14.9, 14.9));
        assert!(!r.contains(15.0, 12.0));
        assert!(!r.contains(12.0, 15.0));
    }

    #[test]
    fn test_hit_test_finds_each_widget() {
        assert_eq!(hit_test(25.0, 40.0), Some(Widget::AddressField));
        assert_eq!(hit_test(25.0, 70.0), Some(Widget::UpdateButton));
        let third = pin_region(2);
        assert_eq!(hit_test(third.x + 1.0, third.y + 1.0), Some(Widget::Pin(2)));
    }

    #[test]
    fn test_hit_test_gap_between_pins_is_empty() {
        let first = pin_region(0);
        assert_eq!(hit_test(first.right() + 1.0, first.y + 1.0), None);
    }

    #[test]
    fn test_widgets_sit_inside_main_window() {
        for region in [ADDRESS_FIELD, UPDATE_BUTTON, pin_region(PIN_COUNT - 1)] {
            assert!(region.x >= MAIN_WINDOW.x && region.right() <= MAIN_WINDOW.right());
            assert!(region.y >= MAIN_WINDOW.y && region.bottom() <= MAIN_WINDOW.bottom());
        }
    }

    #[test]
    fn test_windows_fit_on_display() {
        for window in [MAIN_WINDOW, VIEWER_WINDOW] {
            assert!(window.right() <= DISPLAY_WIDTH);
            assert!(window.bottom() <= DISPLAY_HEIGHT);
        }
        assert!(MAIN_WINDOW.right() <= VIEWER_WINDOW.x);
    }
}
