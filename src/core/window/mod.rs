//! View registry and focus.
//!
//! Owns every toplevel, popup and decoration object, the stacking order of
//! mapped views and the seat's focus pointer. Toplevels of both window
//! protocols share one handle space.

pub mod decoration;
pub mod focus;
pub mod popup;
pub mod tree;
pub mod view;

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use crate::config::Config;
use crate::core::backend::Backend;
use crate::core::errors::{CoreError, Result};
use crate::core::event::PopupParent;
use crate::core::listener::{Listeners, Signal, Source};
use crate::core::output::OutputLayout;
use crate::core::protocol::{DecorationMode, ObjectId, Protocol, SurfaceId};
use crate::util::geometry::Rect;
use crate::util::logging;
use crate::wlog;

pub use decoration::Decoration;
pub use focus::FocusManager;
pub use popup::Popup;
pub use tree::ViewTree;
pub use view::{ToplevelInfo, ToplevelKind, View, ViewId, ViewKind};

const TOPLEVEL_SIGNALS: &[Signal] = &[
    Signal::Destroy,
    Signal::Commit,
    Signal::Map,
    Signal::Unmap,
    Signal::SetTitle,
    Signal::SetAppId,
    Signal::SetParent,
    Signal::RequestFullscreen,
];

#[derive(Debug, Default)]
pub struct ViewRegistry {
    views: HashMap<ViewId, View>,
    by_handle: HashMap<ObjectId, ViewId>,
    /// Mapped views, back to front.
    tree: ViewTree,
    focus: FocusManager,
    popups: HashMap<ObjectId, Popup>,
    decorations: HashMap<ObjectId, Decoration>,
    listeners: Listeners,
    next_id: u32,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn get(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    pub fn get_by_handle(&self, handle: ObjectId) -> Option<&View> {
        self.by_handle.get(&handle).and_then(|id| self.views.get(id))
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Mapped views, back to front.
    pub fn stacking_order(&self) -> &[ViewId] {
        &self.tree.stacking_order
    }

    pub fn focused(&self) -> Option<ViewId> {
        self.focus.keyboard_focus
    }

    pub fn focused_surface(&self) -> Option<SurfaceId> {
        self.focused().and_then(|id| self.views.get(&id)).map(|v| v.surface)
    }

    pub fn popup(&self, handle: ObjectId) -> Option<&Popup> {
        self.popups.get(&handle)
    }

    pub fn popup_count(&self) -> usize {
        self.popups.len()
    }

    pub fn decoration(&self, handle: ObjectId) -> Option<&Decoration> {
        self.decorations.get(&handle)
    }

    pub fn is_listening(&self, source: Source, signal: Signal) -> bool {
        self.listeners.is_subscribed(source, signal)
    }

    fn require(&self, source: Source, signal: Signal) -> Result<()> {
        if self.listeners.is_subscribed(source, signal) {
            Ok(())
        } else {
            Err(CoreError::protocol(format!("{signal:?} on unknown {source:?}")))
        }
    }

    fn view_id(&self, handle: ObjectId, signal: Signal) -> Result<ViewId> {
        self.require(Source::Toplevel(handle), signal)?;
        self.by_handle
            .get(&handle)
            .copied()
            .ok_or_else(|| CoreError::protocol(format!("no view for toplevel {}", handle.0)))
    }

    fn view_mut(&mut self, id: ViewId) -> Result<&mut View> {
        self.views.get_mut(&id).ok_or(CoreError::UnknownView(id.0))
    }

    // ========================================================================
    // Toplevel lifecycle
    // ========================================================================

    /// Track a new toplevel. It stays invisible until mapped.
    ///
    /// Parent links only ever name tracked views, so a parent that is not
    /// tracked yet is dropped and the new view cannot close a cycle.
    pub fn add(&mut self, mut info: ToplevelInfo, backend: &mut dyn Backend) -> Result<ViewId> {
        let handle = info.handle;
        if self.by_handle.contains_key(&handle) {
            return Err(CoreError::protocol(format!("toplevel {} announced twice", handle.0)));
        }
        if let Some(parent) = info.parent.filter(|p| !self.by_handle.contains_key(p)) {
            tracing::debug!(target: logging::VIEW, "Dropping unknown parent {} of toplevel {}", parent.0, handle.0);
            info.parent = None;
        }
        let scene_tree = backend
            .create_view_tree(info.surface)
            .ok_or_else(|| CoreError::allocation("failed to create view scene tree"))?;
        backend.set_node_enabled(scene_tree, false);

        self.next_id += 1;
        let id = ViewId(self.next_id);
        let kind = info.kind;
        let view = View::new(id, info, scene_tree);

        self.listeners.subscribe(Source::Toplevel(handle), TOPLEVEL_SIGNALS);
        if kind == ToplevelKind::Xwayland {
            self.listeners.subscribe(Source::Toplevel(handle), &[Signal::RequestConfigure]);
        }
        self.by_handle.insert(handle, id);
        self.views.insert(id, view);
        tracing::debug!(target: logging::VIEW, "New {:?} toplevel {} as view {}", kind, handle.0, id.0);
        Ok(id)
    }

    /// A toplevel committed. The first commit of a native toplevel is
    /// answered with capabilities, placement and the decoration mode.
    pub fn commit(
        &mut self,
        handle: ObjectId,
        initial: bool,
        width: i32,
        height: i32,
        config: &Config,
        layout: &OutputLayout,
        protocol: &mut dyn Protocol,
        backend: &mut dyn Backend,
    ) -> Result<()> {
        let id = self.view_id(handle, Signal::Commit)?;
        let view = self.view_mut(id)?;
        if width > 0 && height > 0 {
            view.set_size(width, height);
        }

        let ViewKind::Xdg(toplevel) = &mut view.kind else {
            return Ok(());
        };
        if !initial || toplevel.initialized {
            return Ok(());
        }
        toplevel.initialized = true;
        protocol.set_fullscreen_capability(handle);
        self.position(id, config, layout, protocol, backend);

        let mode = decoration::configured_mode(config.server_side_decorations);
        for deco in self.decorations.values().filter(|d| d.toplevel == handle) {
            protocol.set_decoration_mode(deco.handle, mode);
        }
        Ok(())
    }

    /// Show a view. Managed views are placed on an output and sized to the
    /// game resolution.
    pub fn map(
        &mut self,
        handle: ObjectId,
        surface: SurfaceId,
        config: &Config,
        layout: &OutputLayout,
        protocol: &mut dyn Protocol,
        backend: &mut dyn Backend,
    ) -> Result<ViewId> {
        let id = self.view_id(handle, Signal::Map)?;
        let view = self.view_mut(id)?;
        if view.mapped {
            return Err(CoreError::protocol(format!("view {} mapped twice", id.0)));
        }
        view.surface = surface;
        view.mapped = true;
        backend.set_node_enabled(view.scene_tree, true);

        if let Some(foreign) = protocol.create_foreign_toplevel(id) {
            if let Some(title) = view.title() {
                protocol.foreign_toplevel_set_title(foreign, title);
            }
            if let Some(app_id) = view.app_id() {
                protocol.foreign_toplevel_set_app_id(foreign, app_id);
            }
            view.foreign_toplevel = Some(foreign);
        } else {
            tracing::warn!(target: logging::VIEW, "No foreign toplevel handle for view {}", id.0);
        }

        self.tree.insert(id);
        self.position(id, config, layout, protocol, backend);
        if let Some(view) = self.views.get_mut(&id) {
            if view.is_managed() {
                view.fullscreen = true;
                protocol.set_fullscreen(view.toplevel_ref(), true);
            }
        }
        wlog!(logging::VIEW, "Mapped view {}", id.0);
        Ok(id)
    }

    /// Hide a view. It stays known for a later map.
    ///
    /// Returns true when the view had keyboard focus.
    pub fn unmap(
        &mut self,
        handle: ObjectId,
        protocol: &mut dyn Protocol,
        backend: &mut dyn Backend,
    ) -> Result<bool> {
        let id = self.view_id(handle, Signal::Unmap)?;
        let view = self.view_mut(id)?;
        if !view.mapped {
            return Err(CoreError::protocol(format!("view {} unmapped while hidden", id.0)));
        }
        view.mapped = false;
        backend.set_node_enabled(view.scene_tree, false);
        if let Some(foreign) = view.foreign_toplevel.take() {
            protocol.destroy_foreign_toplevel(foreign);
        }

        self.tree.remove(id);
        let lost_focus = self.focus.forget(id);
        wlog!(logging::VIEW, "Unmapped view {}", id.0);
        Ok(lost_focus)
    }

    /// Drop a view for good, along with its popups and decorations. Its
    /// dialogs become parentless.
    ///
    /// Returns true when the view had keyboard focus.
    pub fn destroy(
        &mut self,
        handle: ObjectId,
        protocol: &mut dyn Protocol,
        backend: &mut dyn Backend,
    ) -> Result<bool> {
        let id = self.view_id(handle, Signal::Destroy)?;
        self.listeners.unsubscribe_all(Source::Toplevel(handle));

        let popups: Vec<ObjectId> =
            self.popups.values().filter(|p| p.view == id).map(|p| p.handle).collect();
        for popup in popups {
            self.remove_popup(popup, backend);
        }

        let decorations: Vec<ObjectId> =
            self.decorations.values().filter(|d| d.toplevel == handle).map(|d| d.handle).collect();
        for deco in decorations {
            self.listeners.unsubscribe_all(Source::Decoration(deco));
            self.decorations.remove(&deco);
        }

        for child in self.views.values_mut().filter(|v| v.parent() == Some(handle)) {
            child.set_parent(None);
        }

        self.by_handle.remove(&handle);
        self.tree.remove(id);
        let lost_focus = self.focus.forget(id);
        let view = self.views.remove(&id).ok_or(CoreError::UnknownView(id.0))?;
        view.destroy(backend, protocol);
        wlog!(logging::VIEW, "Destroyed view {}", id.0);
        Ok(lost_focus)
    }

    // ========================================================================
    // Placement
    // ========================================================================

    /// Place a view on its output. Unmanaged views only get their scene
    /// node moved.
    fn position(
        &mut self,
        id: ViewId,
        config: &Config,
        layout: &OutputLayout,
        protocol: &mut dyn Protocol,
        backend: &mut dyn Backend,
    ) {
        let Some(view) = self.views.get_mut(&id) else {
            return;
        };
        if view.is_managed() {
            let target = view
                .output
                .and_then(|output| layout.get_box(output).map(|rect| (output, rect)))
                .or_else(|| layout.outputs().next());
            let bounds = target.map(|(_, rect)| rect).unwrap_or_default();
            view.output = target.map(|(output, _)| output);
            view.x = bounds.x;
            view.y = bounds.y;

            let (width, height) = config.window_size(bounds.width, bounds.height);
            view.set_size(width, height);
            view.maximize(width, height, protocol);
        }
        backend.set_node_position(view.scene_tree, view.x, view.y);
    }

    /// Re-place every mapped view after the layout changed.
    pub fn reposition_all(
        &mut self,
        config: &Config,
        layout: &OutputLayout,
        protocol: &mut dyn Protocol,
        backend: &mut dyn Backend,
    ) {
        let ids = self.tree.stacking_order.clone();
        for id in ids {
            self.position(id, config, layout, protocol, backend);
        }
        tracing::debug!(target: logging::VIEW, "Repositioned {} view(s)", self.tree.stacking_order.len());
    }

    /// The topmost mapped view under a layout point, with the point in
    /// surface-local coordinates.
    pub fn view_at(&self, x: f64, y: f64) -> Option<(ViewId, SurfaceId, f64, f64)> {
        let id = self.tree.view_under(x, y, &self.views)?;
        let view = self.views.get(&id)?;
        Some((id, view.surface, x - view.x as f64, y - view.y as f64))
    }

    // ========================================================================
    // Focus
    // ========================================================================

    /// Whether `child` descends from `parent` through transient links.
    pub fn is_transient_for(&self, child: ViewId, parent: ViewId) -> bool {
        match (self.views.get(&child), self.views.get(&parent)) {
            (Some(child), Some(parent)) => {
                child.is_transient_for(parent, |handle| self.get_by_handle(handle))
            }
            _ => false,
        }
    }

    /// Whether a click on `hit` should move focus there.
    ///
    /// Clicking the focused view, or a dialog of it, keeps focus where it is.
    pub fn should_focus(&self, hit: ViewId) -> bool {
        match self.focus.keyboard_focus {
            None => true,
            Some(focused) => hit != focused && !self.is_transient_for(hit, focused),
        }
    }

    /// Give a view keyboard focus and raise it. Returns the surface to send
    /// keyboard enter to.
    pub fn focus(&mut self, id: ViewId, protocol: &mut dyn Protocol) -> Option<SurfaceId> {
        let view = self.views.get(&id)?;
        if !view.mapped {
            return None;
        }
        if self.focus.has_keyboard_focus(id) {
            return Some(view.surface);
        }
        if let Some(previous) = self.focus.keyboard_focus.and_then(|prev| self.views.get(&prev)) {
            previous.activate(false, protocol);
        }
        view.activate(true, protocol);
        let surface = view.surface;
        self.tree.bring_to_front(id);
        self.focus.set_keyboard_focus(Some(id));
        tracing::debug!(target: logging::VIEW, "Focused view {}", id.0);
        Some(surface)
    }

    pub fn set_pointer_focus(&mut self, view: Option<ViewId>) {
        self.focus.set_pointer_focus(view);
    }

    pub fn pointer_focus(&self) -> Option<ViewId> {
        self.focus.pointer_focus
    }

    // ========================================================================
    // Toplevel requests
    // ========================================================================

    pub fn set_title(
        &mut self,
        handle: ObjectId,
        title: String,
        protocol: &mut dyn Protocol,
    ) -> Result<ViewId> {
        let id = self.view_id(handle, Signal::SetTitle)?;
        let view = self.view_mut(id)?;
        if let Some(foreign) = view.foreign_toplevel {
            protocol.foreign_toplevel_set_title(foreign, &title);
        }
        view.set_title(title);
        Ok(id)
    }

    pub fn set_app_id(
        &mut self,
        handle: ObjectId,
        app_id: String,
        protocol: &mut dyn Protocol,
    ) -> Result<ViewId> {
        let id = self.view_id(handle, Signal::SetAppId)?;
        let view = self.view_mut(id)?;
        if let Some(foreign) = view.foreign_toplevel {
            protocol.foreign_toplevel_set_app_id(foreign, &app_id);
        }
        view.set_app_id(app_id);
        Ok(id)
    }

    /// Change a view's transient parent. An unknown parent, or one that
    /// would close a cycle, is rejected.
    pub fn set_parent(&mut self, handle: ObjectId, parent: Option<ObjectId>) -> Result<()> {
        let id = self.view_id(handle, Signal::SetParent)?;
        if let Some(parent_handle) = parent {
            if parent_handle == handle {
                return Err(CoreError::protocol(format!("view {} set as its own parent", id.0)));
            }
            let parent_id = self.by_handle.get(&parent_handle).copied().ok_or_else(|| {
                CoreError::protocol(format!("parent {} of view {} is unknown", parent_handle.0, id.0))
            })?;
            if self.is_transient_for(parent_id, id) {
                return Err(CoreError::protocol(format!(
                    "parent {} of view {} would form a cycle",
                    parent_handle.0, id.0
                )));
            }
        }
        self.view_mut(id)?.set_parent(parent);
        Ok(())
    }

    /// Resize a mapped view to the whole layout and flag it fullscreen.
    pub fn request_fullscreen(
        &mut self,
        handle: ObjectId,
        fullscreen: bool,
        layout: &OutputLayout,
        protocol: &mut dyn Protocol,
    ) -> Result<()> {
        let id = self.view_id(handle, Signal::RequestFullscreen)?;
        let view = self.view_mut(id)?;
        if !view.mapped {
            tracing::debug!(target: logging::VIEW, "Ignoring fullscreen request of unmapped view {}", id.0);
            return Ok(());
        }
        let bounds = layout.bounding_box();
        let toplevel = view.toplevel_ref();
        protocol.set_size(toplevel, bounds.width, bounds.height);
        protocol.set_fullscreen(toplevel, fullscreen);
        if let Some(foreign) = view.foreign_toplevel {
            protocol.foreign_toplevel_set_fullscreen(foreign, fullscreen);
        }
        view.fullscreen = fullscreen;
        Ok(())
    }

    /// An X11 window asked for a geometry. Unmanaged windows get it;
    /// managed ones are told their current one.
    pub fn request_configure(
        &mut self,
        handle: ObjectId,
        geometry: Rect,
        protocol: &mut dyn Protocol,
        backend: &mut dyn Backend,
    ) -> Result<()> {
        let id = self.view_id(handle, Signal::RequestConfigure)?;
        let view = self.view_mut(id)?;
        if !view.is_managed() {
            view.x = geometry.x;
            view.y = geometry.y;
            view.set_size(geometry.width, geometry.height);
            backend.set_node_position(view.scene_tree, view.x, view.y);
        }
        let current = view.geometry();
        let toplevel = view.toplevel_ref();
        protocol.set_position(toplevel, current.x, current.y);
        protocol.set_size(toplevel, current.width, current.height);
        Ok(())
    }

    // ========================================================================
    // Popups
    // ========================================================================

    pub fn add_popup(
        &mut self,
        handle: ObjectId,
        parent: PopupParent,
        geometry: Rect,
        backend: &mut dyn Backend,
    ) -> Result<()> {
        if self.popups.contains_key(&handle) {
            return Err(CoreError::protocol(format!("popup {} announced twice", handle.0)));
        }
        let (view, parent_node) = match parent {
            PopupParent::Toplevel(toplevel) => {
                let view = self
                    .get_by_handle(toplevel)
                    .ok_or_else(|| CoreError::protocol(format!("popup parent {} unknown", toplevel.0)))?;
                (view.id, view.scene_tree)
            }
            PopupParent::Popup(parent) => {
                let popup = self
                    .popups
                    .get(&parent)
                    .ok_or_else(|| CoreError::protocol(format!("popup parent {} unknown", parent.0)))?;
                (popup.view, popup.scene_tree)
            }
            PopupParent::Unknown => {
                return Err(CoreError::protocol(format!("popup {} has no shell parent", handle.0)));
            }
        };

        let scene_tree = backend
            .create_popup_tree(parent_node, handle)
            .ok_or_else(|| CoreError::allocation("failed to create popup scene tree"))?;
        self.listeners.subscribe(
            Source::Popup(handle),
            &[Signal::Destroy, Signal::Commit, Signal::Reposition],
        );
        self.popups.insert(handle, Popup { handle, parent, view, geometry, scene_tree });
        Ok(())
    }

    /// Layout position of the surface a popup is relative to.
    fn popup_parent_origin(&self, popup: &Popup) -> Result<(i32, i32)> {
        let lost = || CoreError::protocol(format!("popup {} lost its parent", popup.handle.0));
        let out_of_range = || CoreError::protocol(format!("popup {} placed out of range", popup.handle.0));

        let view = self.views.get(&popup.view).ok_or_else(lost)?;
        let (mut x, mut y) = (view.x, view.y);
        let mut parent = popup.parent;
        let mut depth = 0;
        while let PopupParent::Popup(handle) = parent {
            let ancestor = self.popups.get(&handle).ok_or_else(lost)?;
            x = x.checked_add(ancestor.geometry.x).ok_or_else(out_of_range)?;
            y = y.checked_add(ancestor.geometry.y).ok_or_else(out_of_range)?;
            parent = ancestor.parent;
            depth += 1;
            if depth > self.popups.len() {
                return Err(lost());
            }
        }
        Ok((x, y))
    }

    /// Clamp a popup into its output and configure it. A box that does not
    /// fit in layout coordinates is a protocol error and leaves the popup
    /// untouched.
    fn unconstrain_popup(
        &mut self,
        handle: ObjectId,
        geometry: Rect,
        layout: &OutputLayout,
        protocol: &mut dyn Protocol,
    ) -> Result<()> {
        let entry = self
            .popups
            .get(&handle)
            .ok_or_else(|| CoreError::protocol(format!("unknown popup {}", handle.0)))?;
        let origin = self.popup_parent_origin(entry)?;

        let clamped = popup::unconstrain(geometry, origin, layout)
            .ok_or_else(|| CoreError::protocol(format!("popup {} placed out of range", handle.0)))?;
        protocol.configure_popup(handle, clamped);
        if let Some(entry) = self.popups.get_mut(&handle) {
            entry.geometry = clamped;
        }
        Ok(())
    }

    pub fn popup_commit(
        &mut self,
        handle: ObjectId,
        initial: bool,
        layout: &OutputLayout,
        protocol: &mut dyn Protocol,
    ) -> Result<()> {
        self.require(Source::Popup(handle), Signal::Commit)?;
        if !initial {
            return Ok(());
        }
        let geometry = self.popups.get(&handle).map(|p| p.geometry).unwrap_or_default();
        self.unconstrain_popup(handle, geometry, layout, protocol)
    }

    pub fn popup_reposition(
        &mut self,
        handle: ObjectId,
        geometry: Rect,
        layout: &OutputLayout,
        protocol: &mut dyn Protocol,
    ) -> Result<()> {
        self.require(Source::Popup(handle), Signal::Reposition)?;
        self.unconstrain_popup(handle, geometry, layout, protocol)
    }

    pub fn destroy_popup(&mut self, handle: ObjectId, backend: &mut dyn Backend) -> Result<()> {
        self.require(Source::Popup(handle), Signal::Destroy)?;
        self.remove_popup(handle, backend);
        Ok(())
    }

    /// Remove a popup and every popup stacked on it.
    fn remove_popup(&mut self, handle: ObjectId, backend: &mut dyn Backend) {
        let children: Vec<ObjectId> = self
            .popups
            .values()
            .filter(|p| p.parent == PopupParent::Popup(handle))
            .map(|p| p.handle)
            .collect();
        for child in children {
            self.remove_popup(child, backend);
        }
        self.listeners.unsubscribe_all(Source::Popup(handle));
        if let Some(popup) = self.popups.remove(&handle) {
            backend.destroy_node(popup.scene_tree);
        }
    }

    // ========================================================================
    // Decorations
    // ========================================================================

    pub fn add_decoration(
        &mut self,
        handle: ObjectId,
        toplevel: ObjectId,
        config: &Config,
        protocol: &mut dyn Protocol,
    ) -> Result<()> {
        let view = self
            .get_by_handle(toplevel)
            .ok_or_else(|| CoreError::protocol(format!("decoration for unknown toplevel {}", toplevel.0)))?;
        let initialized = matches!(&view.kind, ViewKind::Xdg(t) if t.initialized);

        self.listeners.subscribe(Source::Decoration(handle), &[Signal::Destroy, Signal::RequestMode]);
        self.decorations.insert(handle, Decoration { handle, toplevel, requested: None });
        if initialized {
            protocol.set_decoration_mode(handle, decoration::configured_mode(config.server_side_decorations));
        }
        Ok(())
    }

    /// The client asked for a mode. The configured one is sent again once
    /// the toplevel has been initialized.
    pub fn decoration_request_mode(
        &mut self,
        handle: ObjectId,
        mode: Option<DecorationMode>,
        config: &Config,
        protocol: &mut dyn Protocol,
    ) -> Result<()> {
        self.require(Source::Decoration(handle), Signal::RequestMode)?;
        let Some(deco) = self.decorations.get_mut(&handle) else {
            return Err(CoreError::protocol(format!("unknown decoration {}", handle.0)));
        };
        deco.requested = mode;
        let toplevel = deco.toplevel;

        let initialized = matches!(
            self.get_by_handle(toplevel).map(|v| &v.kind),
            Some(ViewKind::Xdg(t)) if t.initialized
        );
        if initialized {
            protocol.set_decoration_mode(handle, decoration::configured_mode(config.server_side_decorations));
        }
        Ok(())
    }

    pub fn destroy_decoration(&mut self, handle: ObjectId) -> Result<()> {
        self.require(Source::Decoration(handle), Signal::Destroy)?;
        self.listeners.unsubscribe_all(Source::Decoration(handle));
        self.decorations.remove(&handle);
        Ok(())
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Ask every view's client to close.
    pub fn close_all(&self, protocol: &mut dyn Protocol) {
        for view in self.views.values() {
            view.close(protocol);
        }
    }

    /// Release everything at shutdown.
    pub fn clear(&mut self, protocol: &mut dyn Protocol, backend: &mut dyn Backend) {
        let handles: Vec<ObjectId> = self.popups.keys().copied().collect();
        for handle in handles {
            self.remove_popup(handle, backend);
        }
        for handle in self.decorations.keys() {
            self.listeners.unsubscribe_all(Source::Decoration(*handle));
        }
        self.decorations.clear();

        for (handle, _) in self.by_handle.drain() {
            self.listeners.unsubscribe_all(Source::Toplevel(handle));
        }
        self.tree = ViewTree::new();
        self.focus = FocusManager::new();
        for (_, view) in self.views.drain() {
            view.destroy(backend, protocol);
        }
    }
}
