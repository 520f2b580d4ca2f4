//! Focus management.

use super::view::ViewId;

/// The seat's single focus pointer.
#[derive(Debug, Default)]
pub struct FocusManager {
    /// The view that currently has keyboard focus.
    pub keyboard_focus: Option<ViewId>,
    /// The view under the cursor.
    pub pointer_focus: Option<ViewId>,
}

impl FocusManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_keyboard_focus(&mut self, view: Option<ViewId>) {
        self.keyboard_focus = view;
    }

    pub fn set_pointer_focus(&mut self, view: Option<ViewId>) {
        self.pointer_focus = view;
    }

    pub fn has_keyboard_focus(&self, view: ViewId) -> bool {
        self.keyboard_focus == Some(view)
    }

    /// Forget a view that is going away. Returns true if it had keyboard focus.
    pub fn forget(&mut self, view: ViewId) -> bool {
        if self.pointer_focus == Some(view) {
            self.pointer_focus = None;
        }
        if self.keyboard_focus == Some(view) {
            self.keyboard_focus = None;
            return true;
        }
        false
    }
}
