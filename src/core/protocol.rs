//! Window-protocol collaborator.
//!
//! The protocol library turns client requests into [`Event`]s and exposes the
//! setters below. Object identifiers are the protocol's, never the core's.

use std::collections::VecDeque;

use crate::core::backend::{ModeSetting, OutputId};
use crate::core::event::Event;
use crate::core::input::{GroupId, SeatCapabilities};
use crate::core::window::ViewId;
use crate::util::geometry::Rect;

/// A protocol object (toplevel, popup, decoration, inhibitor, drag, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// A client surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u32);

/// Which window protocol a toplevel request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToplevelRef {
    Xdg(ObjectId),
    Xwayland(ObjectId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationMode {
    ClientSide,
    ServerSide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Released,
    Pressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Released,
    Pressed,
}

/// Serialized xkb modifier state, as sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardModifiers {
    pub depressed: u32,
    pub latched: u32,
    pub locked: u32,
    pub group: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrientation {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSource {
    Wheel,
    Finger,
    Continuous,
    WheelTilt,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisEvent {
    pub orientation: AxisOrientation,
    pub delta: f64,
    pub delta_discrete: i32,
    pub source: AxisSource,
}

/// One output as published to configuration observers.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationHead {
    pub output: OutputId,
    pub name: String,
    pub enabled: bool,
    pub mode: Option<ModeSetting>,
    /// Layout position; `None` when the output is not in the layout.
    pub position: Option<(i32, i32)>,
}

/// Setters the core calls on the protocol library.
pub trait Protocol {
    // --- seat ---

    fn set_capabilities(&mut self, caps: SeatCapabilities);
    fn keyboard_enter(&mut self, surface: SurfaceId, keyboard: Option<GroupId>);
    fn keyboard_clear_focus(&mut self);
    fn keyboard_notify_key(&mut self, keyboard: GroupId, time: u32, keycode: u32, state: KeyState);
    fn keyboard_notify_modifiers(&mut self, keyboard: GroupId, modifiers: KeyboardModifiers);
    /// Pointer motion; `target` is the surface under the cursor in surface-local coordinates.
    fn pointer_notify_motion(&mut self, time: u32, target: Option<(SurfaceId, f64, f64)>);
    fn pointer_notify_button(&mut self, time: u32, button: u32, state: ButtonState);
    fn pointer_notify_axis(&mut self, time: u32, axis: AxisEvent);
    fn pointer_notify_frame(&mut self);
    fn touch_notify_frame(&mut self);
    fn start_drag(&mut self, drag: ObjectId, serial: u32);
    fn set_selection(&mut self, source: Option<ObjectId>, serial: u32, primary: bool);

    // --- toplevels ---

    fn set_activated(&mut self, toplevel: ToplevelRef, activated: bool);
    fn set_size(&mut self, toplevel: ToplevelRef, width: i32, height: i32);
    /// Root position; only meaningful for legacy X11 windows.
    fn set_position(&mut self, _toplevel: ToplevelRef, _x: i32, _y: i32) {}
    fn set_maximized(&mut self, toplevel: ToplevelRef, maximized: bool);
    fn set_fullscreen(&mut self, toplevel: ToplevelRef, fullscreen: bool);
    /// Tell a native toplevel that fullscreen is the only window-management capability.
    fn set_fullscreen_capability(&mut self, toplevel: ObjectId);
    fn send_close(&mut self, toplevel: ToplevelRef);
    fn set_decoration_mode(&mut self, decoration: ObjectId, mode: DecorationMode);
    /// Send a popup its final geometry, relative to its parent.
    fn configure_popup(&mut self, popup: ObjectId, geometry: Rect);

    // --- foreign toplevel advertisement ---

    fn create_foreign_toplevel(&mut self, view: ViewId) -> Option<ObjectId>;
    fn foreign_toplevel_set_title(&mut self, handle: ObjectId, title: &str);
    fn foreign_toplevel_set_app_id(&mut self, handle: ObjectId, app_id: &str);
    fn foreign_toplevel_set_fullscreen(&mut self, handle: ObjectId, fullscreen: bool);
    fn foreign_toplevel_set_activated(&mut self, handle: ObjectId, activated: bool);
    fn destroy_foreign_toplevel(&mut self, handle: ObjectId);

    // --- output management ---

    fn set_output_configuration(&mut self, heads: &[ConfigurationHead]);
    fn configuration_result(&mut self, config: ObjectId, succeeded: bool);

    // --- idle ---

    fn set_idle_inhibited(&mut self, inhibited: bool);
    fn notify_activity(&mut self);

    // --- events ---

    /// Move pending client requests into `events`.
    fn dispatch(&mut self, events: &mut VecDeque<Event>) -> usize;
}
