//! Rendering/backend and session collaborator.
//!
//! The backend owns buffers, swapchains, the scene graph and the cursor
//! plane. The core only holds opaque handles into it and drives it through
//! the [`Backend`] trait; nothing here allocates GPU resources itself.

use std::collections::VecDeque;

use crate::core::event::Event;
use crate::core::protocol::{ObjectId, SurfaceId};

/// Backend-assigned output identifier, stable for the device's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(pub u32);

/// Backend-assigned input device identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

/// Handle to a node (view tree, popup tree, drag icon, scene output) in the
/// backend's scene graph. Non-owning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneNodeId(pub u32);

/// Name of the default cursor image.
pub const DEFAULT_XCURSOR: &str = "left_ptr";

/// A mode advertised by an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    pub width: i32,
    pub height: i32,
    /// Refresh rate in mHz
    pub refresh: i32,
    pub preferred: bool,
}

impl Mode {
    pub fn new(width: i32, height: i32, refresh: i32) -> Self {
        Self { width, height, refresh, preferred: false }
    }

    pub fn preferred(mut self) -> Self {
        self.preferred = true;
        self
    }
}

/// The mode half of an output state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSetting {
    /// One of the output's advertised modes.
    Fixed(Mode),
    /// A resolution the output does not advertise (nested windows).
    Custom { width: i32, height: i32, refresh: i32 },
}

impl ModeSetting {
    pub fn size(&self) -> (i32, i32) {
        match *self {
            ModeSetting::Fixed(mode) => (mode.width, mode.height),
            ModeSetting::Custom { width, height, .. } => (width, height),
        }
    }
}

/// A state to test or commit on one output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputState {
    pub enabled: bool,
    pub mode: Option<ModeSetting>,
}

impl OutputState {
    pub fn enabled(mode: Option<ModeSetting>) -> Self {
        Self { enabled: true, mode }
    }

    pub fn disabled() -> Self {
        Self { enabled: false, mode: None }
    }
}

/// Where an output's pixels end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// A physical connector.
    Drm,
    /// A window on a host Wayland compositor.
    Wayland,
    /// A window on a host X11 server.
    X11,
    /// Offscreen.
    Headless,
}

impl OutputKind {
    /// Outputs that live inside a host window. Losing the last one ends the session.
    pub fn is_nested(&self) -> bool {
        matches!(self, OutputKind::Wayland | OutputKind::X11)
    }
}

/// Hotplug payload for a new output.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputInfo {
    pub id: OutputId,
    pub name: String,
    pub kind: OutputKind,
    /// Supported modes in the device's native order.
    pub modes: Vec<Mode>,
    pub scale: f32,
}

impl OutputInfo {
    pub fn new(id: OutputId, name: impl Into<String>, kind: OutputKind, modes: Vec<Mode>) -> Self {
        Self { id, name: name.into(), kind, modes, scale: 1.0 }
    }

    /// The preferred mode, or the first advertised one.
    pub fn preferred_mode(&self) -> Option<Mode> {
        self.modes
            .iter()
            .find(|m| m.preferred)
            .or_else(|| self.modes.first())
            .copied()
    }
}

/// What the cursor plane shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorImage {
    Hidden,
    Named(&'static str),
    Surface { surface: SurfaceId, hotspot_x: i32, hotspot_y: i32 },
}

/// Rendering, scene graph, cursor and session primitives.
pub trait Backend {
    // --- outputs ---

    /// Attach the output to the renderer and allocator.
    fn init_render(&mut self, output: OutputId) -> bool;
    /// Dry-run a state. Never changes the output.
    fn test_state(&mut self, output: OutputId, state: &OutputState) -> bool;
    fn commit_state(&mut self, output: OutputId, state: &OutputState) -> bool;
    /// Negotiate buffers and swapchains for several outputs at once.
    /// Never changes any output, whatever the result.
    fn prepare(&mut self, states: &[(OutputId, OutputState)]) -> bool;
    /// Commit several output states atomically.
    fn commit(&mut self, states: &[(OutputId, OutputState)]) -> bool;
    /// Render and present the scene for one output.
    fn render_frame(&mut self, scene_output: SceneNodeId) -> bool;
    /// Ask the host compositor for a fullscreen window (nested outputs only).
    fn set_nested_fullscreen(&mut self, _output: OutputId, _fullscreen: bool) {}
    /// Set the host window title (nested outputs only).
    fn set_window_title(&mut self, _output: OutputId, _title: &str) {}

    // --- scene graph ---

    fn create_scene_output(&mut self, output: OutputId) -> Option<SceneNodeId>;
    fn create_view_tree(&mut self, surface: SurfaceId) -> Option<SceneNodeId>;
    fn create_popup_tree(&mut self, parent: SceneNodeId, popup: ObjectId) -> Option<SceneNodeId>;
    fn create_drag_icon(&mut self, icon: ObjectId) -> Option<SceneNodeId>;
    fn set_node_position(&mut self, node: SceneNodeId, x: i32, y: i32);
    fn set_node_enabled(&mut self, node: SceneNodeId, enabled: bool);
    fn destroy_node(&mut self, node: SceneNodeId);

    // --- cursor ---

    fn load_cursor_theme(&mut self, scale: f32) -> bool;
    fn set_cursor_image(&mut self, image: CursorImage);
    fn move_cursor(&mut self, x: f64, y: f64);
    /// Confine an absolute device to one output, or release it with `None`.
    fn map_input_to_output(&mut self, device: DeviceId, output: Option<OutputId>);

    // --- session ---

    /// Whether the backend runs on a session that can switch VTs.
    fn supports_vt_switch(&self) -> bool;
    fn change_vt(&mut self, vt: u32) -> bool;

    // --- events ---

    /// Move pending hotplug, input and frame events into `events`.
    fn dispatch(&mut self, events: &mut VecDeque<Event>) -> usize;
}
