//! Cursor state and pointer devices.

use crate::core::backend::{CursorImage, DeviceId, OutputId, DEFAULT_XCURSOR};
use crate::core::output::OutputLayout;
use crate::util::geometry::Rect;

/// Cursor state for the seat.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerState {
    /// Position in layout coordinates.
    pub x: f64,
    pub y: f64,
    /// Buttons currently held.
    pub button_count: u32,
    pub image: CursorImage,
}

impl Default for PointerState {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, button_count: 0, image: CursorImage::Hidden }
    }
}

impl PointerState {
    /// Track button press/release.
    pub fn update_button(&mut self, pressed: bool) {
        if pressed {
            self.button_count = self.button_count.saturating_add(1);
        } else {
            self.button_count = self.button_count.saturating_sub(1);
        }
    }

    pub fn default_image() -> CursorImage {
        CursorImage::Named(DEFAULT_XCURSOR)
    }
}

/// A pointer or touch device attached to the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerDevice {
    pub id: DeviceId,
    pub name: String,
    /// Output the device is pinned to.
    pub output: Option<OutputId>,
}

impl PointerDevice {
    /// Area the device moves in: its pinned output while that is laid out,
    /// else the whole layout.
    pub fn bounds(&self, layout: &OutputLayout) -> Option<Rect> {
        let rect = self
            .output
            .and_then(|output| layout.get_box(output))
            .unwrap_or_else(|| layout.bounding_box());
        (!rect.is_empty()).then_some(rect)
    }

    /// Clamp a layout point into the device's area.
    pub fn clamp(&self, layout: &OutputLayout, x: f64, y: f64) -> (f64, f64) {
        match self.output.and_then(|output| layout.get_box(output)) {
            Some(rect) => rect.closest_point(x, y),
            None => layout.closest_point(x, y),
        }
    }

    /// Map normalized `[0, 1]` device coordinates into the layout.
    pub fn absolute(&self, layout: &OutputLayout, x: f64, y: f64) -> Option<(f64, f64)> {
        let rect = self.bounds(layout)?;
        Some((
            rect.x as f64 + x.clamp(0.0, 1.0) * rect.width as f64,
            rect.y as f64 + y.clamp(0.0, 1.0) * rect.height as f64,
        ))
    }
}
