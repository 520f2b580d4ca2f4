//! Popups anchored to a view or another popup.

use crate::core::backend::SceneNodeId;
use crate::core::event::PopupParent;
use crate::core::output::OutputLayout;
use crate::core::protocol::ObjectId;
use crate::util::geometry::Rect;

use super::view::ViewId;

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub handle: ObjectId,
    pub parent: PopupParent,
    /// The toplevel this popup ultimately belongs to.
    pub view: ViewId,
    /// Box relative to the parent surface.
    pub geometry: Rect,
    pub scene_tree: SceneNodeId,
}

/// Clamp a popup box into the output under its anchor.
///
/// `geometry` is relative to the popup's parent, which sits at `parent_origin`
/// in layout coordinates. The output is picked by the popup's top-left
/// corner; when no output is there the whole layout is used. The result is
/// again parent-relative. `None` when the box cannot be expressed in layout
/// coordinates.
pub fn unconstrain(geometry: Rect, parent_origin: (i32, i32), layout: &OutputLayout) -> Option<Rect> {
    let (px, py) = parent_origin;
    let anchor = geometry.checked_translate(px, py)?;

    let bounds = layout
        .output_at(anchor.x as f64, anchor.y as f64)
        .and_then(|output| layout.get_box(output))
        .unwrap_or_else(|| layout.bounding_box());

    let local = bounds.checked_translate(px.checked_neg()?, py.checked_neg()?)?;
    Some(geometry.constrain_to(&local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::OutputId;

    #[test]
    fn test_popup_near_right_edge_slides_left() {
        let mut layout = OutputLayout::new();
        layout.add_auto(OutputId(1), 1920, 1080);

        // Parent at (100, 100), popup 300 wide starting 1700 to its right.
        let clamped = unconstrain(Rect::new(1700, 20, 300, 200), (100, 100), &layout).unwrap();
        assert_eq!(clamped, Rect::new(1520, 20, 300, 200));

        let absolute = clamped.translate(100, 100);
        assert!(absolute.right() <= 1920);
    }

    #[test]
    fn test_popup_uses_output_under_anchor() {
        let mut layout = OutputLayout::new();
        layout.add_auto(OutputId(1), 1920, 1080);
        layout.add_auto(OutputId(2), 1280, 720);

        // Anchored on the second output, hanging below its bottom edge.
        let clamped = unconstrain(Rect::new(2000, 700, 200, 100), (0, 0), &layout).unwrap();
        assert_eq!(clamped, Rect::new(2000, 620, 200, 100));
    }

    #[test]
    fn test_popup_past_integer_range_is_refused() {
        let mut layout = OutputLayout::new();
        layout.add_auto(OutputId(1), 1920, 1080);

        assert_eq!(unconstrain(Rect::new(i32::MAX - 10, 0, 50, 50), (100, 0), &layout), None);
        assert_eq!(unconstrain(Rect::new(0, 0, 50, 50), (i32::MIN, 0), &layout), None);
    }
}
