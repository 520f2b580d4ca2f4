//! Views: toplevel windows from either window protocol.
//!
//! A view is one of two variants. Everything the registry needs from a
//! view goes through the methods on [`View`], which dispatch on the variant.

use crate::core::backend::{Backend, OutputId, SceneNodeId};
use crate::core::protocol::{ObjectId, Protocol, SurfaceId, ToplevelRef};
use crate::util::geometry::Rect;

/// Registry-assigned view identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToplevelKind {
    /// Native Wayland shell toplevel.
    Xdg,
    /// Legacy X11 window.
    Xwayland,
}

/// Announcement of a new toplevel.
#[derive(Debug, Clone, PartialEq)]
pub struct ToplevelInfo {
    pub handle: ObjectId,
    pub kind: ToplevelKind,
    pub surface: SurfaceId,
    pub title: Option<String>,
    pub app_id: Option<String>,
    pub parent: Option<ObjectId>,
    /// X11 override-redirect windows place themselves.
    pub override_redirect: bool,
    /// Geometry the client asked for (X11 only).
    pub geometry: Rect,
}

impl ToplevelInfo {
    pub fn xdg(handle: ObjectId, surface: SurfaceId) -> Self {
        Self {
            handle,
            kind: ToplevelKind::Xdg,
            surface,
            title: None,
            app_id: None,
            parent: None,
            override_redirect: false,
            geometry: Rect::default(),
        }
    }

    pub fn xwayland(handle: ObjectId, surface: SurfaceId, geometry: Rect) -> Self {
        Self { kind: ToplevelKind::Xwayland, geometry, ..Self::xdg(handle, surface) }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn with_parent(mut self, parent: ObjectId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_override_redirect(mut self) -> Self {
        self.override_redirect = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct XdgToplevel {
    pub handle: ObjectId,
    pub title: Option<String>,
    pub app_id: Option<String>,
    pub parent: Option<ObjectId>,
    /// Size from the last commit.
    pub width: i32,
    pub height: i32,
    /// Set once the initial commit was answered.
    pub initialized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XwaylandToplevel {
    pub handle: ObjectId,
    pub title: Option<String>,
    pub app_id: Option<String>,
    pub parent: Option<ObjectId>,
    pub width: i32,
    pub height: i32,
    pub override_redirect: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewKind {
    Xdg(XdgToplevel),
    Xwayland(XwaylandToplevel),
}

#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub id: ViewId,
    pub kind: ViewKind,
    pub surface: SurfaceId,
    /// Position in layout coordinates.
    pub x: i32,
    pub y: i32,
    pub scene_tree: SceneNodeId,
    pub mapped: bool,
    pub fullscreen: bool,
    /// Output the view was placed on.
    pub output: Option<OutputId>,
    pub foreign_toplevel: Option<ObjectId>,
}

impl View {
    pub(crate) fn new(id: ViewId, info: ToplevelInfo, scene_tree: SceneNodeId) -> Self {
        let kind = match info.kind {
            ToplevelKind::Xdg => ViewKind::Xdg(XdgToplevel {
                handle: info.handle,
                title: info.title,
                app_id: info.app_id,
                parent: info.parent,
                width: 0,
                height: 0,
                initialized: false,
            }),
            ToplevelKind::Xwayland => ViewKind::Xwayland(XwaylandToplevel {
                handle: info.handle,
                title: info.title,
                app_id: info.app_id,
                parent: info.parent,
                width: info.geometry.width,
                height: info.geometry.height,
                override_redirect: info.override_redirect,
            }),
        };
        Self {
            id,
            kind,
            surface: info.surface,
            x: info.geometry.x,
            y: info.geometry.y,
            scene_tree,
            mapped: false,
            fullscreen: false,
            output: None,
            foreign_toplevel: None,
        }
    }

    pub fn toplevel_ref(&self) -> ToplevelRef {
        match &self.kind {
            ViewKind::Xdg(t) => ToplevelRef::Xdg(t.handle),
            ViewKind::Xwayland(t) => ToplevelRef::Xwayland(t.handle),
        }
    }

    pub fn kind(&self) -> ToplevelKind {
        match self.kind {
            ViewKind::Xdg(_) => ToplevelKind::Xdg,
            ViewKind::Xwayland(_) => ToplevelKind::Xwayland,
        }
    }

    // ------------------------------------------------------------------------
    // Capability operations
    // ------------------------------------------------------------------------

    pub fn title(&self) -> Option<&str> {
        match &self.kind {
            ViewKind::Xdg(t) => t.title.as_deref(),
            ViewKind::Xwayland(t) => t.title.as_deref(),
        }
    }

    pub fn app_id(&self) -> Option<&str> {
        match &self.kind {
            ViewKind::Xdg(t) => t.app_id.as_deref(),
            ViewKind::Xwayland(t) => t.app_id.as_deref(),
        }
    }

    /// Box in layout coordinates.
    pub fn geometry(&self) -> Rect {
        let (width, height) = match &self.kind {
            ViewKind::Xdg(t) => (t.width, t.height),
            ViewKind::Xwayland(t) => (t.width, t.height),
        };
        Rect::new(self.x, self.y, width, height)
    }

    /// A view without a parent.
    pub fn is_primary(&self) -> bool {
        self.parent().is_none()
    }

    pub fn parent(&self) -> Option<ObjectId> {
        match &self.kind {
            ViewKind::Xdg(t) => t.parent,
            ViewKind::Xwayland(t) => t.parent,
        }
    }

    /// Whether this view descends from `ancestor` through parent links.
    ///
    /// `lookup` resolves a parent handle. Parents of the other protocol do
    /// not count, and a broken chain or a cycle ends the walk.
    pub fn is_transient_for<'a>(
        &'a self,
        ancestor: &View,
        lookup: impl Fn(ObjectId) -> Option<&'a View>,
    ) -> bool {
        if ancestor.kind() != self.kind() {
            return false;
        }
        let mut current = self;
        let mut seen = vec![self.id];
        while let Some(parent_handle) = current.parent() {
            let Some(parent) = lookup(parent_handle) else {
                return false;
            };
            if parent.kind() != self.kind() || seen.contains(&parent.id) {
                return false;
            }
            if parent.id == ancestor.id {
                return true;
            }
            seen.push(parent.id);
            current = parent;
        }
        false
    }

    pub fn activate(&self, activated: bool, protocol: &mut dyn Protocol) {
        protocol.set_activated(self.toplevel_ref(), activated);
        if let Some(handle) = self.foreign_toplevel {
            protocol.foreign_toplevel_set_activated(handle, activated);
        }
    }

    pub fn maximize(&mut self, width: i32, height: i32, protocol: &mut dyn Protocol) {
        let toplevel = self.toplevel_ref();
        match &mut self.kind {
            ViewKind::Xdg(_) => {
                protocol.set_size(toplevel, width, height);
                protocol.set_maximized(toplevel, true);
            }
            ViewKind::Xwayland(t) => {
                t.width = width;
                t.height = height;
                protocol.set_position(toplevel, self.x, self.y);
                protocol.set_size(toplevel, width, height);
                protocol.set_maximized(toplevel, true);
            }
        }
    }

    /// Release what the view holds outside the registry.
    pub fn destroy(self, backend: &mut dyn Backend, protocol: &mut dyn Protocol) {
        if let Some(handle) = self.foreign_toplevel {
            protocol.destroy_foreign_toplevel(handle);
        }
        backend.destroy_node(self.scene_tree);
    }

    /// Ask the client to close the window.
    pub fn close(&self, protocol: &mut dyn Protocol) {
        protocol.send_close(self.toplevel_ref());
    }

    // ------------------------------------------------------------------------
    // Metadata updates
    // ------------------------------------------------------------------------

    pub(crate) fn set_title(&mut self, title: String) {
        match &mut self.kind {
            ViewKind::Xdg(t) => t.title = Some(title),
            ViewKind::Xwayland(t) => t.title = Some(title),
        }
    }

    pub(crate) fn set_app_id(&mut self, app_id: String) {
        match &mut self.kind {
            ViewKind::Xdg(t) => t.app_id = Some(app_id),
            ViewKind::Xwayland(t) => t.app_id = Some(app_id),
        }
    }

    pub(crate) fn set_parent(&mut self, parent: Option<ObjectId>) {
        match &mut self.kind {
            ViewKind::Xdg(t) => t.parent = parent,
            ViewKind::Xwayland(t) => t.parent = parent,
        }
    }

    pub(crate) fn set_size(&mut self, width: i32, height: i32) {
        match &mut self.kind {
            ViewKind::Xdg(t) => {
                t.width = width;
                t.height = height;
            }
            ViewKind::Xwayland(t) => {
                t.width = width;
                t.height = height;
            }
        }
    }

    /// Whether the compositor decides this view's geometry.
    pub fn is_managed(&self) -> bool {
        match &self.kind {
            ViewKind::Xdg(_) => true,
            ViewKind::Xwayland(t) => !t.override_redirect,
        }
    }
}
