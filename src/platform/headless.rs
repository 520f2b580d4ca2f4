//! Offscreen platform.
//!
//! `HeadlessBackend` keeps every output and scene node in memory and can be
//! told to reject modes or fail preparation, which makes it the backend of
//! choice for tests and for running without a display. `HeadlessProtocol`
//! keeps the last published seat, focus and output state and can record
//! every call in order.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::core::backend::{
    Backend, CursorImage, DeviceId, OutputId, OutputState, SceneNodeId,
};
use crate::core::event::Event;
use crate::core::input::{GroupId, SeatCapabilities};
use crate::core::protocol::{
    AxisEvent, ButtonState, ConfigurationHead, DecorationMode, KeyState, KeyboardModifiers,
    ObjectId, Protocol, SurfaceId, ToplevelRef,
};
use crate::core::window::ViewId;
use crate::util::geometry::Rect;

// ============================================================================
// Backend
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeState {
    pub x: i32,
    pub y: i32,
    pub enabled: bool,
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    // --- failure knobs ---
    /// Sizes `test_state` rejects, per output.
    pub rejected_modes: HashMap<OutputId, Vec<(i32, i32)>>,
    /// Outputs whose preparation fails.
    pub failing_prepare: HashSet<OutputId>,
    /// Outputs `init_render` fails for.
    pub failing_render: HashSet<OutputId>,
    pub fail_commits: bool,
    pub fail_allocations: bool,
    pub session: bool,

    // --- recorded state ---
    pub committed: HashMap<OutputId, OutputState>,
    pub tested: Vec<(OutputId, OutputState)>,
    pub nodes: HashMap<SceneNodeId, NodeState>,
    pub cursor: (f64, f64),
    pub cursor_image: Option<CursorImage>,
    pub cursor_theme_scales: Vec<f32>,
    pub input_mapping: HashMap<DeviceId, Option<OutputId>>,
    pub frames: usize,
    pub window_titles: HashMap<OutputId, String>,
    pub nested_fullscreen: HashSet<OutputId>,
    pub vt_switches: Vec<u32>,

    pending: VecDeque<Event>,
    next_node: u32,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend running on a seat session, able to switch VTs.
    pub fn with_session() -> Self {
        Self { session: true, ..Self::default() }
    }

    pub fn reject_mode(&mut self, output: OutputId, width: i32, height: i32) {
        self.rejected_modes.entry(output).or_default().push((width, height));
    }

    pub fn fail_prepare_for(&mut self, output: OutputId) {
        self.failing_prepare.insert(output);
    }

    /// Queue an event for the next dispatch.
    pub fn push_event(&mut self, event: Event) {
        self.pending.push_back(event);
    }

    pub fn node(&self, node: SceneNodeId) -> Option<NodeState> {
        self.nodes.get(&node).copied()
    }

    fn accepts(&self, output: OutputId, state: &OutputState) -> bool {
        let Some(mode) = state.mode.filter(|_| state.enabled) else {
            return true;
        };
        let size = mode.size();
        !self
            .rejected_modes
            .get(&output)
            .is_some_and(|rejected| rejected.contains(&size))
    }

    fn new_node(&mut self) -> Option<SceneNodeId> {
        if self.fail_allocations {
            return None;
        }
        self.next_node += 1;
        let id = SceneNodeId(self.next_node);
        self.nodes.insert(id, NodeState::default());
        Some(id)
    }
}

impl Backend for HeadlessBackend {
    fn init_render(&mut self, output: OutputId) -> bool {
        !self.failing_render.contains(&output)
    }

    fn test_state(&mut self, output: OutputId, state: &OutputState) -> bool {
        self.tested.push((output, *state));
        self.accepts(output, state)
    }

    fn commit_state(&mut self, output: OutputId, state: &OutputState) -> bool {
        if self.fail_commits || !self.accepts(output, state) {
            return false;
        }
        self.committed.insert(output, *state);
        true
    }

    fn prepare(&mut self, states: &[(OutputId, OutputState)]) -> bool {
        states
            .iter()
            .all(|(output, state)| !self.failing_prepare.contains(output) && self.accepts(*output, state))
    }

    fn commit(&mut self, states: &[(OutputId, OutputState)]) -> bool {
        if self.fail_commits {
            return false;
        }
        for (output, state) in states {
            self.committed.insert(*output, *state);
        }
        true
    }

    fn render_frame(&mut self, scene_output: SceneNodeId) -> bool {
        if !self.nodes.contains_key(&scene_output) {
            return false;
        }
        self.frames += 1;
        true
    }

    fn set_nested_fullscreen(&mut self, output: OutputId, fullscreen: bool) {
        if fullscreen {
            self.nested_fullscreen.insert(output);
        } else {
            self.nested_fullscreen.remove(&output);
        }
    }

    fn set_window_title(&mut self, output: OutputId, title: &str) {
        self.window_titles.insert(output, title.to_string());
    }

    fn create_scene_output(&mut self, _output: OutputId) -> Option<SceneNodeId> {
        self.new_node()
    }

    fn create_view_tree(&mut self, _surface: SurfaceId) -> Option<SceneNodeId> {
        self.new_node()
    }

    fn create_popup_tree(&mut self, parent: SceneNodeId, _popup: ObjectId) -> Option<SceneNodeId> {
        if !self.nodes.contains_key(&parent) {
            return None;
        }
        self.new_node()
    }

    fn create_drag_icon(&mut self, _icon: ObjectId) -> Option<SceneNodeId> {
        self.new_node()
    }

    fn set_node_position(&mut self, node: SceneNodeId, x: i32, y: i32) {
        if let Some(state) = self.nodes.get_mut(&node) {
            state.x = x;
            state.y = y;
        }
    }

    fn set_node_enabled(&mut self, node: SceneNodeId, enabled: bool) {
        if let Some(state) = self.nodes.get_mut(&node) {
            state.enabled = enabled;
        }
    }

    fn destroy_node(&mut self, node: SceneNodeId) {
        self.nodes.remove(&node);
    }

    fn load_cursor_theme(&mut self, scale: f32) -> bool {
        self.cursor_theme_scales.push(scale);
        true
    }

    fn set_cursor_image(&mut self, image: CursorImage) {
        self.cursor_image = Some(image);
    }

    fn move_cursor(&mut self, x: f64, y: f64) {
        self.cursor = (x, y);
    }

    fn map_input_to_output(&mut self, device: DeviceId, output: Option<OutputId>) {
        self.input_mapping.insert(device, output);
    }

    fn supports_vt_switch(&self) -> bool {
        self.session
    }

    fn change_vt(&mut self, vt: u32) -> bool {
        if !self.session {
            return false;
        }
        self.vt_switches.push(vt);
        true
    }

    fn dispatch(&mut self, events: &mut VecDeque<Event>) -> usize {
        let count = self.pending.len();
        events.extend(self.pending.drain(..));
        count
    }
}

// ============================================================================
// Protocol
// ============================================================================

/// One call into the protocol, as recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolCall {
    SetCapabilities(SeatCapabilities),
    KeyboardEnter(SurfaceId, Option<GroupId>),
    KeyboardClearFocus,
    Key { keyboard: GroupId, keycode: u32, state: KeyState },
    Modifiers { keyboard: GroupId, modifiers: KeyboardModifiers },
    PointerMotion(Option<(SurfaceId, f64, f64)>),
    PointerButton { button: u32, state: ButtonState },
    PointerAxis(AxisEvent),
    PointerFrame,
    TouchFrame,
    StartDrag(ObjectId),
    SetSelection { source: Option<ObjectId>, primary: bool },
    SetActivated(ToplevelRef, bool),
    SetSize(ToplevelRef, i32, i32),
    SetPosition(ToplevelRef, i32, i32),
    SetMaximized(ToplevelRef, bool),
    SetFullscreen(ToplevelRef, bool),
    SetFullscreenCapability(ObjectId),
    SendClose(ToplevelRef),
    SetDecorationMode(ObjectId, DecorationMode),
    ConfigurePopup(ObjectId, Rect),
    ForeignCreate(ViewId, ObjectId),
    ForeignTitle(ObjectId, String),
    ForeignAppId(ObjectId, String),
    ForeignFullscreen(ObjectId, bool),
    ForeignActivated(ObjectId, bool),
    ForeignDestroy(ObjectId),
    OutputConfiguration(Vec<ConfigurationHead>),
    ConfigurationResult(ObjectId, bool),
    IdleInhibited(bool),
    Activity,
}

#[derive(Debug, Default)]
pub struct HeadlessProtocol {
    /// Record every call into `calls`.
    pub recording: bool,
    pub calls: Vec<ProtocolCall>,

    pub capabilities: SeatCapabilities,
    pub keyboard_focus: Option<SurfaceId>,
    pub configuration: Vec<ConfigurationHead>,
    pub idle_inhibited: Option<bool>,
    pub activity: usize,
    pub foreign_toplevels: HashMap<ObjectId, ViewId>,

    pending: VecDeque<Event>,
    next_handle: u32,
}

impl HeadlessProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recording() -> Self {
        Self { recording: true, ..Self::default() }
    }

    pub fn push_event(&mut self, event: Event) {
        self.pending.push_back(event);
    }

    fn record(&mut self, call: ProtocolCall) {
        if self.recording {
            self.calls.push(call);
        }
    }

    /// Recorded calls matching a predicate.
    pub fn calls_matching(&self, pred: impl Fn(&ProtocolCall) -> bool) -> Vec<&ProtocolCall> {
        self.calls.iter().filter(|call| pred(call)).collect()
    }
}

impl Protocol for HeadlessProtocol {
    fn set_capabilities(&mut self, caps: SeatCapabilities) {
        self.capabilities = caps;
        self.record(ProtocolCall::SetCapabilities(caps));
    }

    fn keyboard_enter(&mut self, surface: SurfaceId, keyboard: Option<GroupId>) {
        self.keyboard_focus = Some(surface);
        self.record(ProtocolCall::KeyboardEnter(surface, keyboard));
    }

    fn keyboard_clear_focus(&mut self) {
        self.keyboard_focus = None;
        self.record(ProtocolCall::KeyboardClearFocus);
    }

    fn keyboard_notify_key(&mut self, keyboard: GroupId, _time: u32, keycode: u32, state: KeyState) {
        self.record(ProtocolCall::Key { keyboard, keycode, state });
    }

    fn keyboard_notify_modifiers(&mut self, keyboard: GroupId, modifiers: KeyboardModifiers) {
        self.record(ProtocolCall::Modifiers { keyboard, modifiers });
    }

    fn pointer_notify_motion(&mut self, _time: u32, target: Option<(SurfaceId, f64, f64)>) {
        self.record(ProtocolCall::PointerMotion(target));
    }

    fn pointer_notify_button(&mut self, _time: u32, button: u32, state: ButtonState) {
        self.record(ProtocolCall::PointerButton { button, state });
    }

    fn pointer_notify_axis(&mut self, _time: u32, axis: AxisEvent) {
        self.record(ProtocolCall::PointerAxis(axis));
    }

    fn pointer_notify_frame(&mut self) {
        self.record(ProtocolCall::PointerFrame);
    }

    fn touch_notify_frame(&mut self) {
        self.record(ProtocolCall::TouchFrame);
    }

    fn start_drag(&mut self, drag: ObjectId, _serial: u32) {
        self.record(ProtocolCall::StartDrag(drag));
    }

    fn set_selection(&mut self, source: Option<ObjectId>, _serial: u32, primary: bool) {
        self.record(ProtocolCall::SetSelection { source, primary });
    }

    fn set_activated(&mut self, toplevel: ToplevelRef, activated: bool) {
        self.record(ProtocolCall::SetActivated(toplevel, activated));
    }

    fn set_size(&mut self, toplevel: ToplevelRef, width: i32, height: i32) {
        self.record(ProtocolCall::SetSize(toplevel, width, height));
    }

    fn set_position(&mut self, toplevel: ToplevelRef, x: i32, y: i32) {
        self.record(ProtocolCall::SetPosition(toplevel, x, y));
    }

    fn set_maximized(&mut self, toplevel: ToplevelRef, maximized: bool) {
        self.record(ProtocolCall::SetMaximized(toplevel, maximized));
    }

    fn set_fullscreen(&mut self, toplevel: ToplevelRef, fullscreen: bool) {
        self.record(ProtocolCall::SetFullscreen(toplevel, fullscreen));
    }

    fn set_fullscreen_capability(&mut self, toplevel: ObjectId) {
        self.record(ProtocolCall::SetFullscreenCapability(toplevel));
    }

    fn send_close(&mut self, toplevel: ToplevelRef) {
        self.record(ProtocolCall::SendClose(toplevel));
    }

    fn set_decoration_mode(&mut self, decoration: ObjectId, mode: DecorationMode) {
        self.record(ProtocolCall::SetDecorationMode(decoration, mode));
    }

    fn configure_popup(&mut self, popup: ObjectId, geometry: Rect) {
        self.record(ProtocolCall::ConfigurePopup(popup, geometry));
    }

    fn create_foreign_toplevel(&mut self, view: ViewId) -> Option<ObjectId> {
        self.next_handle += 1;
        let handle = ObjectId(0x1000 + self.next_handle);
        self.foreign_toplevels.insert(handle, view);
        self.record(ProtocolCall::ForeignCreate(view, handle));
        Some(handle)
    }

    fn foreign_toplevel_set_title(&mut self, handle: ObjectId, title: &str) {
        self.record(ProtocolCall::ForeignTitle(handle, title.to_string()));
    }

    fn foreign_toplevel_set_app_id(&mut self, handle: ObjectId, app_id: &str) {
        self.record(ProtocolCall::ForeignAppId(handle, app_id.to_string()));
    }

    fn foreign_toplevel_set_fullscreen(&mut self, handle: ObjectId, fullscreen: bool) {
        self.record(ProtocolCall::ForeignFullscreen(handle, fullscreen));
    }

    fn foreign_toplevel_set_activated(&mut self, handle: ObjectId, activated: bool) {
        self.record(ProtocolCall::ForeignActivated(handle, activated));
    }

    fn destroy_foreign_toplevel(&mut self, handle: ObjectId) {
        self.foreign_toplevels.remove(&handle);
        self.record(ProtocolCall::ForeignDestroy(handle));
    }

    fn set_output_configuration(&mut self, heads: &[ConfigurationHead]) {
        self.configuration = heads.to_vec();
        self.record(ProtocolCall::OutputConfiguration(heads.to_vec()));
    }

    fn configuration_result(&mut self, config: ObjectId, succeeded: bool) {
        self.record(ProtocolCall::ConfigurationResult(config, succeeded));
    }

    fn set_idle_inhibited(&mut self, inhibited: bool) {
        self.idle_inhibited = Some(inhibited);
        self.record(ProtocolCall::IdleInhibited(inhibited));
    }

    fn notify_activity(&mut self) {
        self.activity += 1;
        self.record(ProtocolCall::Activity);
    }

    fn dispatch(&mut self, events: &mut VecDeque<Event>) -> usize {
        let count = self.pending.len();
        events.extend(self.pending.drain(..));
        count
    }
}
