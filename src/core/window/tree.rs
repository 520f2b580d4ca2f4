//! Stacking order.

use std::collections::HashMap;

use super::view::{View, ViewId};

/// Views in stacking order (back to front). The last element is topmost.
#[derive(Debug, Default)]
pub struct ViewTree {
    pub stacking_order: Vec<ViewId>,
}

impl ViewTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a view at the top of the stack.
    pub fn insert(&mut self, view: ViewId) {
        if !self.stacking_order.contains(&view) {
            self.stacking_order.push(view);
        }
    }

    pub fn remove(&mut self, view: ViewId) {
        self.stacking_order.retain(|&id| id != view);
    }

    pub fn bring_to_front(&mut self, view: ViewId) {
        if let Some(pos) = self.stacking_order.iter().position(|&id| id == view) {
            let id = self.stacking_order.remove(pos);
            self.stacking_order.push(id);
        }
    }

    /// The topmost mapped view under the given point.
    pub fn view_under(&self, x: f64, y: f64, views: &HashMap<ViewId, View>) -> Option<ViewId> {
        self.stacking_order
            .iter()
            .rev()
            .filter_map(|id| views.get(id))
            .find(|view| view.mapped && view.geometry().contains(x, y))
            .map(|view| view.id)
    }
}
