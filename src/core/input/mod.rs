//! Input routing for the single seat.
//!
//! Physical keyboards are merged into groups, pointer and touch devices
//! drive one cursor, and every input event is reported as user activity.
//! Clicks move focus through the view registry.

pub mod drag;
pub mod keyboard;
pub mod pointer;


use bitflags::bitflags;

use crate::core::backend::{Backend, CursorImage, DeviceId};
use crate::core::errors::{CoreError, Result};
use crate::core::event::KeyEvent;
use crate::core::listener::{Listeners, Signal, Source};
use crate::core::output::{OutputLayout, OutputManager};
use crate::core::protocol::{
    AxisEvent, ButtonState, KeyState, KeyboardModifiers, ObjectId, Protocol, SurfaceId,
};
use crate::core::window::ViewRegistry;
use crate::util::logging;
use crate::wlog;

pub use drag::DragIcon;
pub use keyboard::{Binding, GroupId, KeyboardGroup, Keymap, RepeatInfo};
pub use pointer::{PointerDevice, PointerState};

bitflags! {
    /// Device classes present on the seat.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SeatCapabilities: u32 {
        const POINTER = 1 << 0;
        const KEYBOARD = 1 << 1;
        const TOUCH = 1 << 2;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceKind {
    Keyboard { keymap: Keymap, repeat: RepeatInfo, is_virtual: bool },
    Pointer,
    Touch,
    /// Tablets, switches and the like; not handled.
    Other,
}

/// Hotplug payload for a new input device.
#[derive(Debug, Clone, PartialEq)]
pub struct InputDeviceInfo {
    pub id: DeviceId,
    pub name: String,
    pub kind: DeviceKind,
    /// Output the device wants to be pinned to.
    pub output_name: Option<String>,
}

impl InputDeviceInfo {
    pub fn keyboard(id: DeviceId, name: impl Into<String>, keymap: Keymap) -> Self {
        Self {
            id,
            name: name.into(),
            kind: DeviceKind::Keyboard { keymap, repeat: RepeatInfo::default(), is_virtual: false },
            output_name: None,
        }
    }

    pub fn virtual_keyboard(id: DeviceId, name: impl Into<String>, keymap: Keymap) -> Self {
        Self {
            id,
            name: name.into(),
            kind: DeviceKind::Keyboard { keymap, repeat: RepeatInfo::default(), is_virtual: true },
            output_name: None,
        }
    }

    pub fn pointer(id: DeviceId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), kind: DeviceKind::Pointer, output_name: None }
    }

    pub fn touch(id: DeviceId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), kind: DeviceKind::Touch, output_name: None }
    }

    pub fn on_output(mut self, output_name: impl Into<String>) -> Self {
        self.output_name = Some(output_name.into());
        self
    }
}

/// What became of a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Sent to the focused client.
    Forwarded,
    /// Swallowed by a compositor binding.
    Consumed,
    /// The terminate binding fired.
    Terminate,
}

#[derive(Debug, Default)]
pub struct Seat {
    groups: Vec<KeyboardGroup>,
    pointers: Vec<PointerDevice>,
    touch: Vec<PointerDevice>,
    capabilities: SeatCapabilities,
    pub cursor: PointerState,
    drag_icons: Vec<DragIcon>,
    active_group: Option<GroupId>,
    /// Touch point driving the cursor.
    primary_touch: Option<i32>,
    listeners: Listeners,
    next_group: u32,
}

impl Seat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capabilities(&self) -> SeatCapabilities {
        self.capabilities
    }

    pub fn groups(&self) -> &[KeyboardGroup] {
        &self.groups
    }

    pub fn group_of(&self, device: DeviceId) -> Option<GroupId> {
        self.groups.iter().find(|g| g.devices.contains(&device)).map(|g| g.id)
    }

    pub fn active_group(&self) -> Option<GroupId> {
        self.active_group
    }

    pub fn pointer(&self, device: DeviceId) -> Option<&PointerDevice> {
        self.pointers.iter().chain(self.touch.iter()).find(|p| p.id == device)
    }

    pub fn drag_icons(&self) -> &[DragIcon] {
        &self.drag_icons
    }

    pub fn cursor_position(&self) -> (f64, f64) {
        (self.cursor.x, self.cursor.y)
    }

    pub fn is_listening(&self, source: Source, signal: Signal) -> bool {
        self.listeners.is_subscribed(source, signal)
    }

    fn require(&self, device: DeviceId, signal: Signal) -> Result<()> {
        if self.listeners.is_subscribed(Source::Device(device), signal) {
            Ok(())
        } else {
            Err(CoreError::UnknownDevice(device.0))
        }
    }

    // ========================================================================
    // Devices
    // ========================================================================

    pub fn attach_device(
        &mut self,
        info: InputDeviceInfo,
        outputs: &OutputManager,
        protocol: &mut dyn Protocol,
        backend: &mut dyn Backend,
    ) -> Result<()> {
        let id = info.id;
        if self.listeners.has_source(Source::Device(id)) {
            return Err(CoreError::protocol(format!("input device {} announced twice", info.name)));
        }

        match info.kind {
            DeviceKind::Keyboard { keymap, repeat, is_virtual } => {
                let index = match self.groups.iter().position(|g| g.accepts(&keymap, &repeat, is_virtual)) {
                    Some(index) => index,
                    None => {
                        self.next_group += 1;
                        let group = KeyboardGroup::new(GroupId(self.next_group), keymap, repeat, is_virtual);
                        tracing::debug!(target: logging::SEAT, "New keyboard group {}", group.id.0);
                        self.groups.push(group);
                        self.groups.len() - 1
                    }
                };
                let group = &mut self.groups[index];
                group.devices.push(id);
                let group_id = group.id;
                self.active_group.get_or_insert(group_id);
                self.listeners.subscribe(Source::Device(id), &[Signal::Destroy, Signal::Key, Signal::Modifiers]);
                wlog!(logging::SEAT, "Keyboard {} joined group {}", info.name, group_id.0);
            }
            DeviceKind::Pointer | DeviceKind::Touch => {
                let output = match info.output_name.as_deref() {
                    Some(name) => {
                        let found = outputs.find_by_name(name);
                        if found.is_none() {
                            tracing::warn!(target: logging::SEAT, "No output {} for input {}, leaving it unpinned", name, info.name);
                        }
                        found
                    }
                    None => None,
                };
                backend.map_input_to_output(id, output);

                let device = PointerDevice { id, name: info.name.clone(), output };
                if info.kind == DeviceKind::Touch {
                    self.touch.push(device);
                    self.listeners.subscribe(Source::Device(id), &[Signal::Destroy, Signal::Touch]);
                } else {
                    self.pointers.push(device);
                    self.listeners.subscribe(
                        Source::Device(id),
                        &[Signal::Destroy, Signal::Motion, Signal::Button, Signal::Axis],
                    );
                }
                wlog!(logging::SEAT, "Attached {:?} device {}", info.kind, info.name);
            }
            DeviceKind::Other => {
                tracing::debug!(target: logging::SEAT, "Ignoring unsupported input device {}", info.name);
                return Ok(());
            }
        }

        self.update_capabilities(protocol, backend);
        Ok(())
    }

    pub fn detach_device(
        &mut self,
        device: DeviceId,
        protocol: &mut dyn Protocol,
        backend: &mut dyn Backend,
    ) -> Result<()> {
        if self.listeners.unsubscribe_all(Source::Device(device)) == 0 {
            return Err(CoreError::UnknownDevice(device.0));
        }

        for group in &mut self.groups {
            group.remove(device);
        }
        let emptied: Vec<GroupId> =
            self.groups.iter().filter(|g| g.devices.is_empty()).map(|g| g.id).collect();
        self.groups.retain(|g| !g.devices.is_empty());
        for group in emptied {
            tracing::debug!(target: logging::SEAT, "Keyboard group {} destroyed", group.0);
            if self.active_group == Some(group) {
                self.active_group = self.groups.first().map(|g| g.id);
            }
        }

        self.pointers.retain(|p| p.id != device);
        self.touch.retain(|p| p.id != device);
        wlog!(logging::SEAT, "Detached input device {}", device.0);
        self.update_capabilities(protocol, backend);
        Ok(())
    }

    /// Recompute capabilities from the attached devices and publish them.
    fn update_capabilities(&mut self, protocol: &mut dyn Protocol, backend: &mut dyn Backend) {
        let mut caps = SeatCapabilities::empty();
        caps.set(SeatCapabilities::KEYBOARD, !self.groups.is_empty());
        caps.set(SeatCapabilities::POINTER, !self.pointers.is_empty());
        caps.set(SeatCapabilities::TOUCH, !self.touch.is_empty());
        self.capabilities = caps;
        protocol.set_capabilities(caps);

        let image = if caps.contains(SeatCapabilities::POINTER) {
            PointerState::default_image()
        } else {
            CursorImage::Hidden
        };
        self.cursor.image = image;
        backend.set_cursor_image(image);
    }

    // ========================================================================
    // Keyboard
    // ========================================================================

    /// Resolve a key through its group's xkb state, run the compositor
    /// bindings on presses and forward everything else.
    pub fn handle_key(
        &mut self,
        event: &KeyEvent,
        allow_vt_switch: bool,
        protocol: &mut dyn Protocol,
        backend: &mut dyn Backend,
    ) -> Result<KeyAction> {
        self.require(event.device, Signal::Key)?;
        protocol.notify_activity();
        let group = self
            .groups
            .iter_mut()
            .find(|g| g.devices.contains(&event.device))
            .ok_or(CoreError::UnknownDevice(event.device.0))?;
        let group_id = group.id;
        let (syms, modifiers_changed) = group.process_key(event.keycode, event.state);
        let alt = group.alt_active();
        let modifiers = group.modifiers();
        self.active_group = Some(group_id);
        if modifiers_changed {
            protocol.keyboard_notify_modifiers(group_id, modifiers);
        }

        if event.state == KeyState::Pressed {
            match keyboard::match_binding(&syms, alt) {
                Some(Binding::Terminate) => {
                    wlog!(logging::SEAT, "Terminate binding pressed");
                    return Ok(KeyAction::Terminate);
                }
                Some(Binding::SwitchVt(vt)) if allow_vt_switch && backend.supports_vt_switch() => {
                    if !backend.change_vt(vt) {
                        tracing::error!(target: logging::SEAT, "Failed to switch to VT {}", vt);
                    }
                    return Ok(KeyAction::Consumed);
                }
                _ => {}
            }
        }

        protocol.keyboard_notify_key(group_id, event.time, event.keycode, event.state);
        Ok(KeyAction::Forwarded)
    }

    /// Apply a modifier state set directly on the device, as virtual
    /// keyboards do.
    pub fn handle_modifiers(
        &mut self,
        device: DeviceId,
        modifiers: KeyboardModifiers,
        protocol: &mut dyn Protocol,
    ) -> Result<()> {
        self.require(device, Signal::Modifiers)?;
        protocol.notify_activity();
        let group = self
            .groups
            .iter_mut()
            .find(|g| g.devices.contains(&device))
            .ok_or(CoreError::UnknownDevice(device.0))?;
        group.set_modifiers(modifiers);
        let group_id = group.id;
        let modifiers = group.modifiers();
        self.active_group = Some(group_id);
        protocol.keyboard_notify_modifiers(group_id, modifiers);
        Ok(())
    }

    /// Send keyboard enter for a newly focused surface.
    pub fn keyboard_enter(&self, surface: SurfaceId, protocol: &mut dyn Protocol) {
        protocol.keyboard_enter(surface, self.active_group);
    }

    // ========================================================================
    // Pointer
    // ========================================================================

    #[allow(clippy::too_many_arguments)]
    pub fn handle_motion(
        &mut self,
        device: DeviceId,
        time: u32,
        dx: f64,
        dy: f64,
        layout: &OutputLayout,
        views: &mut ViewRegistry,
        protocol: &mut dyn Protocol,
        backend: &mut dyn Backend,
    ) -> Result<()> {
        self.require(device, Signal::Motion)?;
        protocol.notify_activity();
        let pointer = self.pointer(device).ok_or(CoreError::UnknownDevice(device.0))?;
        let (x, y) = pointer.clamp(layout, self.cursor.x + dx, self.cursor.y + dy);
        self.warp(x, y, time, views, protocol, backend);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_motion_absolute(
        &mut self,
        device: DeviceId,
        time: u32,
        x: f64,
        y: f64,
        layout: &OutputLayout,
        views: &mut ViewRegistry,
        protocol: &mut dyn Protocol,
        backend: &mut dyn Backend,
    ) -> Result<()> {
        self.require(device, Signal::Motion)?;
        protocol.notify_activity();
        let pointer = self.pointer(device).ok_or(CoreError::UnknownDevice(device.0))?;
        if let Some((lx, ly)) = pointer.absolute(layout, x, y) {
            self.warp(lx, ly, time, views, protocol, backend);
        }
        Ok(())
    }

    /// Move the cursor and report it to whatever is under it.
    fn warp(
        &mut self,
        x: f64,
        y: f64,
        time: u32,
        views: &mut ViewRegistry,
        protocol: &mut dyn Protocol,
        backend: &mut dyn Backend,
    ) {
        self.cursor.x = x;
        self.cursor.y = y;
        backend.move_cursor(x, y);
        for icon in &self.drag_icons {
            icon.move_to(x, y, backend);
        }

        match views.view_at(x, y) {
            Some((view, surface, sx, sy)) => {
                views.set_pointer_focus(Some(view));
                protocol.pointer_notify_motion(time, Some((surface, sx, sy)));
            }
            None => {
                views.set_pointer_focus(None);
                if self.capabilities.contains(SeatCapabilities::POINTER) {
                    self.cursor.image = PointerState::default_image();
                    backend.set_cursor_image(self.cursor.image);
                }
                protocol.pointer_notify_motion(time, None);
            }
        }
    }

    /// Forward a button and, on press, move focus to the view under the
    /// cursor unless that view is the focused one or one of its dialogs.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_button(
        &mut self,
        device: DeviceId,
        time: u32,
        button: u32,
        state: ButtonState,
        views: &mut ViewRegistry,
        protocol: &mut dyn Protocol,
    ) -> Result<()> {
        self.require(device, Signal::Button)?;
        protocol.notify_activity();
        let pressed = state == ButtonState::Pressed;
        self.cursor.update_button(pressed);
        protocol.pointer_notify_button(time, button, state);

        if pressed {
            self.focus_under_cursor(views, protocol);
        }
        Ok(())
    }

    fn focus_under_cursor(&self, views: &mut ViewRegistry, protocol: &mut dyn Protocol) {
        let Some((hit, _, _, _)) = views.view_at(self.cursor.x, self.cursor.y) else {
            return;
        };
        if !views.should_focus(hit) {
            return;
        }
        if let Some(surface) = views.focus(hit, protocol) {
            self.keyboard_enter(surface, protocol);
        }
    }

    pub fn handle_axis(
        &mut self,
        device: DeviceId,
        time: u32,
        axis: AxisEvent,
        protocol: &mut dyn Protocol,
    ) -> Result<()> {
        self.require(device, Signal::Axis)?;
        protocol.notify_activity();
        protocol.pointer_notify_axis(time, axis);
        Ok(())
    }

    pub fn handle_frame(&self, protocol: &mut dyn Protocol) {
        protocol.pointer_notify_frame();
    }

    // ========================================================================
    // Touch
    // ========================================================================

    #[allow(clippy::too_many_arguments)]
    pub fn handle_touch_down(
        &mut self,
        device: DeviceId,
        time: u32,
        touch_id: i32,
        x: f64,
        y: f64,
        layout: &OutputLayout,
        views: &mut ViewRegistry,
        protocol: &mut dyn Protocol,
        backend: &mut dyn Backend,
    ) -> Result<()> {
        self.require(device, Signal::Touch)?;
        protocol.notify_activity();
        if self.primary_touch.is_some() {
            return Ok(());
        }
        self.primary_touch = Some(touch_id);
        let touch = self.pointer(device).ok_or(CoreError::UnknownDevice(device.0))?;
        if let Some((lx, ly)) = touch.absolute(layout, x, y) {
            self.warp(lx, ly, time, views, protocol, backend);
            self.focus_under_cursor(views, protocol);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_touch_motion(
        &mut self,
        device: DeviceId,
        time: u32,
        touch_id: i32,
        x: f64,
        y: f64,
        layout: &OutputLayout,
        views: &mut ViewRegistry,
        protocol: &mut dyn Protocol,
        backend: &mut dyn Backend,
    ) -> Result<()> {
        self.require(device, Signal::Touch)?;
        protocol.notify_activity();
        if self.primary_touch != Some(touch_id) {
            return Ok(());
        }
        let touch = self.pointer(device).ok_or(CoreError::UnknownDevice(device.0))?;
        if let Some((lx, ly)) = touch.absolute(layout, x, y) {
            self.warp(lx, ly, time, views, protocol, backend);
        }
        Ok(())
    }

    pub fn handle_touch_up(
        &mut self,
        device: DeviceId,
        touch_id: i32,
        protocol: &mut dyn Protocol,
    ) -> Result<()> {
        self.require(device, Signal::Touch)?;
        protocol.notify_activity();
        if self.primary_touch == Some(touch_id) {
            self.primary_touch = None;
        }
        Ok(())
    }

    pub fn handle_touch_frame(&self, protocol: &mut dyn Protocol) {
        protocol.touch_notify_frame();
    }

    // ========================================================================
    // Drag and drop, cursor and selection requests
    // ========================================================================

    /// Show a drag icon at the cursor plus the drag's offset.
    pub fn start_drag(
        &mut self,
        icon: Option<ObjectId>,
        offset: (f64, f64),
        backend: &mut dyn Backend,
    ) -> Result<()> {
        let Some(handle) = icon else {
            return Ok(());
        };
        let scene_node = backend
            .create_drag_icon(handle)
            .ok_or_else(|| CoreError::allocation("failed to create drag icon"))?;
        let icon = DragIcon { handle, scene_node, offset };
        icon.move_to(self.cursor.x, self.cursor.y, backend);
        self.listeners.subscribe(Source::DragIcon(handle), &[Signal::Destroy]);
        self.drag_icons.push(icon);
        tracing::debug!(target: logging::SEAT, "Drag icon {} created", handle.0);
        Ok(())
    }

    pub fn destroy_drag_icon(&mut self, handle: ObjectId, backend: &mut dyn Backend) -> Result<()> {
        if self.listeners.unsubscribe_all(Source::DragIcon(handle)) == 0 {
            return Err(CoreError::protocol(format!("unknown drag icon {}", handle.0)));
        }
        if let Some(pos) = self.drag_icons.iter().position(|i| i.handle == handle) {
            let icon = self.drag_icons.remove(pos);
            backend.destroy_node(icon.scene_node);
        }
        Ok(())
    }

    /// Only the client with pointer focus may set the cursor image.
    pub fn request_set_cursor(
        &mut self,
        from_pointer_focus: bool,
        surface: Option<SurfaceId>,
        hotspot: (i32, i32),
        backend: &mut dyn Backend,
    ) -> Result<()> {
        if !from_pointer_focus {
            return Err(CoreError::protocol("cursor request from unfocused client"));
        }
        let image = match surface {
            Some(surface) => CursorImage::Surface { surface, hotspot_x: hotspot.0, hotspot_y: hotspot.1 },
            None => CursorImage::Hidden,
        };
        self.cursor.image = image;
        backend.set_cursor_image(image);
        Ok(())
    }

    /// Put the cursor in the middle of the layout.
    pub fn center_cursor(&mut self, layout: &OutputLayout, backend: &mut dyn Backend) {
        let bounds = layout.bounding_box();
        self.cursor.x = bounds.x as f64 + bounds.width as f64 / 2.0;
        self.cursor.y = bounds.y as f64 + bounds.height as f64 / 2.0;
        backend.move_cursor(self.cursor.x, self.cursor.y);
    }

    /// Release everything at shutdown.
    pub fn clear(&mut self, backend: &mut dyn Backend) {
        for icon in self.drag_icons.drain(..) {
            self.listeners.unsubscribe_all(Source::DragIcon(icon.handle));
            backend.destroy_node(icon.scene_node);
        }
        let devices: Vec<DeviceId> = self
            .groups
            .iter()
            .flat_map(|g| g.devices.iter().copied())
            .chain(self.pointers.iter().chain(self.touch.iter()).map(|p| p.id))
            .collect();
        for device in devices {
            self.listeners.unsubscribe_all(Source::Device(device));
        }
        self.groups.clear();
        self.pointers.clear();
        self.touch.clear();
        self.active_group = None;
        self.capabilities = SeatCapabilities::empty();
    }
}
