//! Drag-and-drop icons.

use crate::core::backend::{Backend, SceneNodeId};
use crate::core::protocol::ObjectId;

/// A surface following the cursor during a drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragIcon {
    pub handle: ObjectId,
    pub scene_node: SceneNodeId,
    /// Offset of the icon from the cursor hotspot.
    pub offset: (f64, f64),
}

impl DragIcon {
    pub fn move_to(&self, cursor_x: f64, cursor_y: f64, backend: &mut dyn Backend) {
        let x = (cursor_x + self.offset.0).round() as i32;
        let y = (cursor_y + self.offset.1).round() as i32;
        backend.set_node_position(self.scene_node, x, y);
    }
}
