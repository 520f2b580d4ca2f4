//! The server context.
//!
//! `Server` is created once at startup and owns every component, the
//! configuration and the two external collaborators. Each event is routed
//! to exactly one component; cross-component follow-ups (repositioning
//! views after a layout change, broadcasting output configuration) are
//! sequenced here.

use std::collections::VecDeque;

use crate::config::Config;
use crate::core::backend::{Backend, OutputId};
use crate::core::errors::{CoreError, Result};
use crate::core::event::Event;
use crate::core::idle::IdleInhibitors;
use crate::core::input::{KeyAction, Seat};
use crate::core::listener::Signal;
use crate::core::output::{OutputManager, Removal};
use crate::core::protocol::{ObjectId, Protocol};
use crate::core::window::{ViewId, ViewRegistry};
use crate::util::logging;
use crate::wlog;

pub struct Server<B: Backend, P: Protocol> {
    pub config: Config,
    pub backend: B,
    pub protocol: P,

    pub outputs: OutputManager,
    pub seat: Seat,
    pub views: ViewRegistry,
    pub idle: IdleInhibitors,

    /// Events waiting for the current loop turn.
    pending: VecDeque<Event>,
    running: bool,
    terminating: bool,
    client_exited: bool,
}

impl<B: Backend, P: Protocol> Server<B, P> {
    pub fn new(config: Config, backend: B, protocol: P) -> Self {
        Self {
            config,
            backend,
            protocol,
            outputs: OutputManager::new(),
            seat: Seat::new(),
            views: ViewRegistry::new(),
            idle: IdleInhibitors::new(),
            pending: VecDeque::new(),
            running: false,
            terminating: false,
            client_exited: false,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn start(&mut self) -> Result<()> {
        if self.running {
            return Err(CoreError::protocol("server already running"));
        }
        wlog!(logging::SERVER, "Starting server");
        self.running = true;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ask the loop to stop. Repeated calls are no-ops; returns true for
    /// the call that initiated termination.
    pub fn terminate(&mut self) -> bool {
        if self.terminating {
            tracing::debug!(target: logging::SERVER, "Termination already pending");
            return false;
        }
        wlog!(logging::SERVER, "Terminating");
        self.terminating = true;
        true
    }

    pub fn is_terminating(&self) -> bool {
        self.terminating
    }

    /// Whether the primary client exited before the server stopped.
    pub fn client_exited(&self) -> bool {
        self.client_exited
    }

    /// Tear everything down, dependents before their dependencies.
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        wlog!(logging::SERVER, "Shutting down");
        self.views.close_all(&mut self.protocol);
        self.seat.clear(&mut self.backend);
        self.outputs.clear(&mut self.backend);
        self.idle.clear();
        self.views.clear(&mut self.protocol, &mut self.backend);
        self.pending.clear();
        self.running = false;
    }

    // =========================================================================
    // Event Processing
    // =========================================================================

    /// Queue an event for the next [`Server::dispatch`].
    pub fn push_event(&mut self, event: Event) {
        self.pending.push_back(event);
    }

    /// Pull events from both collaborators and handle everything queued.
    /// Returns how many events were handled.
    pub fn dispatch(&mut self) -> usize {
        self.backend.dispatch(&mut self.pending);
        self.protocol.dispatch(&mut self.pending);

        let mut handled = 0;
        while let Some(event) = self.pending.pop_front() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Handle one event. Failures are logged; a terminal one stops the loop.
    pub fn handle_event(&mut self, event: Event) {
        if let Err(err) = self.route(event) {
            self.report(err);
        }
    }

    fn report(&mut self, err: CoreError) {
        match &err {
            CoreError::Terminal(_) => {
                tracing::error!(target: logging::SERVER, "{}", err);
                self.terminate();
            }
            CoreError::ProtocolViolation(_)
            | CoreError::UnknownDevice(_)
            | CoreError::UnknownOutput(_)
            | CoreError::UnknownView(_) => {
                tracing::warn!(target: logging::SERVER, "Ignoring event: {}", err);
            }
            _ => tracing::error!(target: logging::SERVER, "{}", err),
        }
    }

    fn route(&mut self, event: Event) -> Result<()> {
        match event {
            // --- outputs ---
            Event::NewOutput(info) => {
                let had_output = self.outputs.enabled_count() > 0;
                self.outputs.register(info, &self.config, &mut self.backend)?;
                if !had_output && self.outputs.enabled_count() > 0 {
                    self.seat.center_cursor(self.outputs.layout(), &mut self.backend);
                }
                self.relayout();
            }
            Event::OutputDestroyed(output) => {
                self.require_output(output, Signal::Destroy)?;
                match self.outputs.unregister(output, &self.config, &mut self.backend)? {
                    Removal::Terminate => {
                        return Err(CoreError::terminal("last nested output closed"));
                    }
                    Removal::Reposition | Removal::Relayout => self.relayout(),
                }
            }
            Event::OutputFrame(output) => {
                self.require_output(output, Signal::Frame)?;
                self.outputs.frame(output, &mut self.backend);
            }
            Event::OutputCommitted { output, config_changed } => {
                self.require_output(output, Signal::Commit)?;
                if config_changed {
                    self.broadcast_configuration();
                }
            }
            Event::OutputRequestState { output, state } => {
                self.require_output(output, Signal::RequestState)?;
                self.outputs.request_state(output, state, &mut self.backend)?;
                self.relayout();
            }

            // --- input ---
            Event::NewInput(info) => {
                self.seat.attach_device(info, &self.outputs, &mut self.protocol, &mut self.backend)?;
            }
            Event::InputDestroyed(device) => {
                self.seat.detach_device(device, &mut self.protocol, &mut self.backend)?;
            }
            Event::Key(key) => {
                let action = self.seat.handle_key(
                    &key,
                    self.config.allow_vt_switch,
                    &mut self.protocol,
                    &mut self.backend,
                )?;
                if action == KeyAction::Terminate {
                    self.terminate();
                }
            }
            Event::Modifiers { device, modifiers } => {
                self.seat.handle_modifiers(device, modifiers, &mut self.protocol)?;
            }
            Event::PointerMotion { device, time, dx, dy } => {
                self.seat.handle_motion(
                    device,
                    time,
                    dx,
                    dy,
                    self.outputs.layout(),
                    &mut self.views,
                    &mut self.protocol,
                    &mut self.backend,
                )?;
            }
            Event::PointerMotionAbsolute { device, time, x, y } => {
                self.seat.handle_motion_absolute(
                    device,
                    time,
                    x,
                    y,
                    self.outputs.layout(),
                    &mut self.views,
                    &mut self.protocol,
                    &mut self.backend,
                )?;
            }
            Event::PointerButton { device, time, button, state } => {
                self.seat.handle_button(device, time, button, state, &mut self.views, &mut self.protocol)?;
            }
            Event::PointerAxis { device, time, axis } => {
                self.seat.handle_axis(device, time, axis, &mut self.protocol)?;
            }
            Event::PointerFrame => self.seat.handle_frame(&mut self.protocol),
            Event::TouchDown { device, time, touch_id, x, y } => {
                self.seat.handle_touch_down(
                    device,
                    time,
                    touch_id,
                    x,
                    y,
                    self.outputs.layout(),
                    &mut self.views,
                    &mut self.protocol,
                    &mut self.backend,
                )?;
            }
            Event::TouchMotion { device, time, touch_id, x, y } => {
                self.seat.handle_touch_motion(
                    device,
                    time,
                    touch_id,
                    x,
                    y,
                    self.outputs.layout(),
                    &mut self.views,
                    &mut self.protocol,
                    &mut self.backend,
                )?;
            }
            Event::TouchUp { device, time: _, touch_id } => {
                self.seat.handle_touch_up(device, touch_id, &mut self.protocol)?;
            }
            Event::TouchFrame => self.seat.handle_touch_frame(&mut self.protocol),

            // --- toplevels ---
            Event::NewToplevel(info) => {
                self.views.add(info, &mut self.backend)?;
            }
            Event::ToplevelCommit { toplevel, initial, width, height } => {
                self.views.commit(
                    toplevel,
                    initial,
                    width,
                    height,
                    &self.config,
                    self.outputs.layout(),
                    &mut self.protocol,
                    &mut self.backend,
                )?;
            }
            Event::ToplevelMap { toplevel, surface } => {
                let view = self.views.map(
                    toplevel,
                    surface,
                    &self.config,
                    self.outputs.layout(),
                    &mut self.protocol,
                    &mut self.backend,
                )?;
                self.focus_view(view);
                self.update_window_title(view);
            }
            Event::ToplevelUnmap(toplevel) => {
                if self.views.unmap(toplevel, &mut self.protocol, &mut self.backend)? {
                    self.protocol.keyboard_clear_focus();
                }
            }
            Event::ToplevelDestroy(toplevel) => {
                if self.views.destroy(toplevel, &mut self.protocol, &mut self.backend)? {
                    self.protocol.keyboard_clear_focus();
                }
            }
            Event::ToplevelSetTitle { toplevel, title } => {
                let view = self.views.set_title(toplevel, title, &mut self.protocol)?;
                self.update_window_title(view);
            }
            Event::ToplevelSetAppId { toplevel, app_id } => {
                self.views.set_app_id(toplevel, app_id, &mut self.protocol)?;
            }
            Event::ToplevelSetParent { toplevel, parent } => {
                self.views.set_parent(toplevel, parent)?;
            }
            Event::ToplevelRequestFullscreen { toplevel, fullscreen } => {
                self.views.request_fullscreen(toplevel, fullscreen, self.outputs.layout(), &mut self.protocol)?;
            }
            Event::XwaylandRequestConfigure { toplevel, geometry } => {
                self.views.request_configure(toplevel, geometry, &mut self.protocol, &mut self.backend)?;
            }

            // --- popups ---
            Event::NewPopup { popup, parent, geometry } => {
                self.views.add_popup(popup, parent, geometry, &mut self.backend)?;
            }
            Event::PopupCommit { popup, initial } => {
                self.views.popup_commit(popup, initial, self.outputs.layout(), &mut self.protocol)?;
            }
            Event::PopupReposition { popup, geometry } => {
                self.views.popup_reposition(popup, geometry, self.outputs.layout(), &mut self.protocol)?;
            }
            Event::PopupDestroy(popup) => self.views.destroy_popup(popup, &mut self.backend)?,

            // --- decorations ---
            Event::NewDecoration { decoration, toplevel } => {
                self.views.add_decoration(decoration, toplevel, &self.config, &mut self.protocol)?;
            }
            Event::DecorationRequestMode { decoration, mode } => {
                self.views.decoration_request_mode(decoration, mode, &self.config, &mut self.protocol)?;
            }
            Event::DecorationDestroy(decoration) => self.views.destroy_decoration(decoration)?,

            // --- idle inhibitors ---
            Event::NewInhibitor(handle) => self.idle.add(handle, &mut self.protocol)?,
            Event::InhibitorDestroy(handle) => self.idle.remove(handle, &mut self.protocol)?,

            // --- seat requests ---
            Event::NewVirtualPointer { mut info, suggested_output } => {
                if info.output_name.is_none() {
                    info.output_name = suggested_output;
                }
                self.seat.attach_device(info, &self.outputs, &mut self.protocol, &mut self.backend)?;
            }
            Event::RequestStartDrag { drag, serial } => self.protocol.start_drag(drag, serial),
            Event::StartDrag { drag, icon, offset } => {
                tracing::debug!(target: logging::SEAT, "Drag {} started", drag.0);
                self.seat.start_drag(icon, offset, &mut self.backend)?;
            }
            Event::DragIconDestroy(icon) => self.seat.destroy_drag_icon(icon, &mut self.backend)?,
            Event::RequestSetCursor { from_pointer_focus, surface, hotspot } => {
                self.seat.request_set_cursor(from_pointer_focus, surface, hotspot, &mut self.backend)?;
            }
            Event::RequestSetSelection { source, serial, primary } => {
                self.protocol.set_selection(source, serial, primary);
            }

            // --- output management ---
            Event::OutputManagerApply { config, heads } => {
                let result = self.outputs.apply_configuration(&heads, false, &mut self.backend);
                if result.is_ok() {
                    self.views.reposition_all(
                        &self.config,
                        self.outputs.layout(),
                        &mut self.protocol,
                        &mut self.backend,
                    );
                    self.broadcast_configuration();
                }
                self.reply_configuration(config, result)?;
            }
            Event::OutputManagerTest { config, heads } => {
                let result = self.outputs.apply_configuration(&heads, true, &mut self.backend);
                self.reply_configuration(config, result)?;
            }

            // --- process ---
            Event::Terminate => {
                self.terminate();
            }
            Event::ClientExited => {
                wlog!(logging::CLIENT, "Primary client exited");
                self.client_exited = true;
                self.terminate();
            }
        }
        Ok(())
    }

    fn require_output(&self, output: OutputId, signal: Signal) -> Result<()> {
        if self.outputs.is_listening(output, signal) {
            Ok(())
        } else {
            Err(CoreError::protocol(format!("{signal:?} on unknown output {}", output.0)))
        }
    }

    // =========================================================================
    // Cross-component Sequencing
    // =========================================================================

    /// Follow-up to any layout change: views first, then observers.
    fn relayout(&mut self) {
        self.views.reposition_all(
            &self.config,
            self.outputs.layout(),
            &mut self.protocol,
            &mut self.backend,
        );
        self.broadcast_configuration();
    }

    /// Publish every output's state and position to configuration observers.
    pub fn broadcast_configuration(&mut self) {
        let heads = self.outputs.configuration();
        self.protocol.set_output_configuration(&heads);
    }

    fn reply_configuration(&mut self, config: ObjectId, result: Result<()>) -> Result<()> {
        self.protocol.configuration_result(config, result.is_ok());
        result
    }

    /// Focus a view and point the keyboard at it.
    pub fn focus_view(&mut self, view: ViewId) {
        if let Some(surface) = self.views.focus(view, &mut self.protocol) {
            self.seat.keyboard_enter(surface, &mut self.protocol);
        }
    }

    /// Title nested output windows after the primary view.
    fn update_window_title(&mut self, view: ViewId) {
        let Some(view) = self.views.get(view) else {
            return;
        };
        if !view.mapped || !view.is_primary() {
            return;
        }
        if let Some(title) = view.title() {
            self.outputs.set_window_title(title, &mut self.backend);
        }
    }
}
