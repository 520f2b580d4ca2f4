//! The global output coordinate space.
//!
//! Outputs are either placed at explicit coordinates or auto-placed; auto
//! outputs sit in a row to the right of every explicitly placed one, in
//! insertion order. An output is in the layout exactly while it is enabled.

use crate::core::backend::OutputId;
use crate::util::geometry::Rect;

#[derive(Debug, Clone, PartialEq, Eq)]
struct LayoutEntry {
    output: OutputId,
    rect: Rect,
    auto: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputLayout {
    entries: Vec<LayoutEntry>,
}

impl OutputLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, output: OutputId) -> bool {
        self.entries.iter().any(|e| e.output == output)
    }

    /// Place an output automatically. Re-adding an existing output makes it auto-placed.
    pub fn add_auto(&mut self, output: OutputId, width: i32, height: i32) -> Rect {
        self.upsert(output, Rect::new(0, 0, width, height), true);
        self.arrange();
        self.get_box(output).unwrap_or_default()
    }

    /// Place an output at fixed coordinates.
    pub fn add(&mut self, output: OutputId, x: i32, y: i32, width: i32, height: i32) -> Rect {
        self.upsert(output, Rect::new(x, y, width, height), false);
        self.arrange();
        self.get_box(output).unwrap_or_default()
    }

    pub fn remove(&mut self, output: OutputId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.output != output);
        let removed = self.entries.len() != before;
        if removed {
            self.arrange();
        }
        removed
    }

    /// Update an output's size after a mode change, keeping its placement policy.
    pub fn set_size(&mut self, output: OutputId, width: i32, height: i32) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.output == output) {
            entry.rect.width = width;
            entry.rect.height = height;
            self.arrange();
        }
    }

    pub fn get_box(&self, output: OutputId) -> Option<Rect> {
        self.entries.iter().find(|e| e.output == output).map(|e| e.rect)
    }

    /// Bounding box of every output; empty when the layout is empty.
    pub fn bounding_box(&self) -> Rect {
        self.entries.iter().fold(Rect::default(), |acc, e| acc.union(&e.rect))
    }

    pub fn output_at(&self, x: f64, y: f64) -> Option<OutputId> {
        self.entries.iter().find(|e| e.rect.contains(x, y)).map(|e| e.output)
    }

    /// Outputs in insertion order with their boxes.
    pub fn outputs(&self) -> impl Iterator<Item = (OutputId, Rect)> + '_ {
        self.entries.iter().map(|e| (e.output, e.rect))
    }

    /// The closest point of any output to (x, y). Returns the point itself
    /// when the layout is empty.
    pub fn closest_point(&self, x: f64, y: f64) -> (f64, f64) {
        let mut best: Option<((f64, f64), f64)> = None;
        for entry in &self.entries {
            let (cx, cy) = entry.rect.closest_point(x, y);
            let dist = (cx - x).powi(2) + (cy - y).powi(2);
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some(((cx, cy), dist));
            }
        }
        best.map(|(p, _)| p).unwrap_or((x, y))
    }

    fn upsert(&mut self, output: OutputId, rect: Rect, auto: bool) {
        match self.entries.iter_mut().find(|e| e.output == output) {
            Some(entry) => {
                entry.rect = rect;
                entry.auto = auto;
            }
            None => self.entries.push(LayoutEntry { output, rect, auto }),
        }
    }

    fn arrange(&mut self) {
        let mut next_x = self
            .entries
            .iter()
            .filter(|e| !e.auto)
            .map(|e| e.rect.right())
            .max()
            .unwrap_or(0);

        for entry in self.entries.iter_mut().filter(|e| e.auto) {
            entry.rect.x = next_x;
            entry.rect.y = 0;
            next_x += entry.rect.width;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_outputs_are_placed_left_to_right() {
        let mut layout = OutputLayout::new();
        layout.add_auto(OutputId(1), 1920, 1080);
        layout.add_auto(OutputId(2), 1280, 1024);

        assert_eq!(layout.get_box(OutputId(1)), Some(Rect::new(0, 0, 1920, 1080)));
        assert_eq!(layout.get_box(OutputId(2)), Some(Rect::new(1920, 0, 1280, 1024)));
        assert_eq!(layout.bounding_box(), Rect::new(0, 0, 3200, 1080));
    }

    #[test]
    fn test_removal_closes_the_gap() {
        let mut layout = OutputLayout::new();
        layout.add_auto(OutputId(1), 1920, 1080);
        layout.add_auto(OutputId(2), 1280, 720);
        layout.remove(OutputId(1));

        assert_eq!(layout.get_box(OutputId(2)), Some(Rect::new(0, 0, 1280, 720)));
        assert_eq!(layout.output_at(100.0, 100.0), Some(OutputId(2)));
    }

    #[test]
    fn test_auto_outputs_follow_manual_ones() {
        let mut layout = OutputLayout::new();
        layout.add(OutputId(1), 0, 0, 1920, 1080);
        layout.add_auto(OutputId(2), 800, 600);
        assert_eq!(layout.get_box(OutputId(2)).map(|r| r.x), Some(1920));
    }

    #[test]
    fn test_closest_point_clamps_into_nearest_output() {
        let mut layout = OutputLayout::new();
        layout.add_auto(OutputId(1), 100, 100);
        assert_eq!(layout.closest_point(150.0, -20.0), (99.0, 0.0));
        assert_eq!(layout.closest_point(50.0, 50.0), (50.0, 50.0));
    }
}
