//! Events delivered to the loop, one at a time.
//!
//! Backend events (hotplug, input, frames) and protocol events (client
//! requests) share one enum so the server has a single dispatch point.

use crate::core::backend::{DeviceId, OutputId, OutputInfo, OutputState};
use crate::core::input::InputDeviceInfo;
use crate::core::protocol::{
    AxisEvent, ButtonState, DecorationMode, KeyState, KeyboardModifiers, ObjectId, SurfaceId,
};
use crate::core::window::ToplevelInfo;
use crate::util::geometry::Rect;

#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    pub device: DeviceId,
    pub time: u32,
    /// Evdev keycode (xkb keycode minus 8).
    pub keycode: u32,
    pub state: KeyState,
}

/// What a popup is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupParent {
    Toplevel(ObjectId),
    Popup(ObjectId),
    /// A surface without a shell role; such popups are not managed.
    Unknown,
}

/// Requested state for one output in a configuration transaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadRequest {
    pub output: OutputId,
    pub state: OutputState,
    pub position: Option<(i32, i32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // --- backend: outputs ---
    NewOutput(OutputInfo),
    OutputDestroyed(OutputId),
    OutputFrame(OutputId),
    /// An output committed a state; `config_changed` when mode or enablement changed.
    OutputCommitted { output: OutputId, config_changed: bool },
    /// The backend asks for a new state (host window resized).
    OutputRequestState { output: OutputId, state: OutputState },

    // --- backend: input ---
    NewInput(InputDeviceInfo),
    InputDestroyed(DeviceId),
    Key(KeyEvent),
    Modifiers { device: DeviceId, modifiers: KeyboardModifiers },
    PointerMotion { device: DeviceId, time: u32, dx: f64, dy: f64 },
    /// Absolute motion in normalized `[0, 1]` device coordinates.
    PointerMotionAbsolute { device: DeviceId, time: u32, x: f64, y: f64 },
    PointerButton { device: DeviceId, time: u32, button: u32, state: ButtonState },
    PointerAxis { device: DeviceId, time: u32, axis: AxisEvent },
    PointerFrame,
    TouchDown { device: DeviceId, time: u32, touch_id: i32, x: f64, y: f64 },
    TouchUp { device: DeviceId, time: u32, touch_id: i32 },
    TouchMotion { device: DeviceId, time: u32, touch_id: i32, x: f64, y: f64 },
    TouchFrame,

    // --- protocol: toplevels ---
    NewToplevel(ToplevelInfo),
    ToplevelCommit { toplevel: ObjectId, initial: bool, width: i32, height: i32 },
    ToplevelMap { toplevel: ObjectId, surface: SurfaceId },
    ToplevelUnmap(ObjectId),
    ToplevelDestroy(ObjectId),
    ToplevelSetTitle { toplevel: ObjectId, title: String },
    ToplevelSetAppId { toplevel: ObjectId, app_id: String },
    ToplevelSetParent { toplevel: ObjectId, parent: Option<ObjectId> },
    ToplevelRequestFullscreen { toplevel: ObjectId, fullscreen: bool },
    /// A legacy X11 window asking for a geometry.
    XwaylandRequestConfigure { toplevel: ObjectId, geometry: Rect },

    // --- protocol: popups ---
    NewPopup { popup: ObjectId, parent: PopupParent, geometry: Rect },
    PopupCommit { popup: ObjectId, initial: bool },
    PopupReposition { popup: ObjectId, geometry: Rect },
    PopupDestroy(ObjectId),

    // --- protocol: decorations ---
    NewDecoration { decoration: ObjectId, toplevel: ObjectId },
    DecorationRequestMode { decoration: ObjectId, mode: Option<DecorationMode> },
    DecorationDestroy(ObjectId),

    // --- protocol: idle inhibitors ---
    NewInhibitor(ObjectId),
    InhibitorDestroy(ObjectId),

    // --- protocol: seat requests ---
    NewVirtualPointer { info: InputDeviceInfo, suggested_output: Option<String> },
    RequestStartDrag { drag: ObjectId, serial: u32 },
    StartDrag { drag: ObjectId, icon: Option<ObjectId>, offset: (f64, f64) },
    DragIconDestroy(ObjectId),
    RequestSetCursor { from_pointer_focus: bool, surface: Option<SurfaceId>, hotspot: (i32, i32) },
    RequestSetSelection { source: Option<ObjectId>, serial: u32, primary: bool },

    // --- protocol: output management ---
    OutputManagerApply { config: ObjectId, heads: Vec<HeadRequest> },
    OutputManagerTest { config: ObjectId, heads: Vec<HeadRequest> },

    // --- process ---
    /// SIGINT/SIGTERM.
    Terminate,
    /// The primary client's hangup pipe closed.
    ClientExited,
}
