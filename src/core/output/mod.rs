//! Output management.
//!
//! Owns every output the backend announced, their enable/mode state and the
//! global layout. Mode negotiation, the "last connected wins" policy and
//! all-or-nothing multi-output configuration live here.

pub mod layout;


use std::collections::HashMap;

use crate::config::{Config, OutputMode};
use crate::core::backend::{
    Backend, ModeSetting, OutputId, OutputInfo, OutputKind, OutputState, SceneNodeId,
};
use crate::core::errors::{CoreError, Result};
use crate::core::event::HeadRequest;
use crate::core::listener::{Listeners, Signal, Source};
use crate::core::protocol::ConfigurationHead;
use crate::util::logging;
use crate::wlog;

pub use layout::OutputLayout;

// ============================================================================
// Output
// ============================================================================

/// Enable state of an output.
///
/// `Enabling` only exists while a commit is in flight and is never left
/// behind once an operation returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStatus {
    Disabled,
    Enabling,
    Enabled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub id: OutputId,
    pub name: String,
    pub kind: OutputKind,
    pub scale: f32,
    pub status: OutputStatus,
    /// Last committed mode. Kept while disabled so re-enabling restores it.
    pub mode: Option<ModeSetting>,
    pub scene_output: SceneNodeId,
    /// Connection order, used by the "last" policy.
    seq: u64,
}

impl Output {
    pub fn is_enabled(&self) -> bool {
        self.status == OutputStatus::Enabled
    }

    /// Size in layout pixels, zero while no mode is known.
    pub fn size(&self) -> (i32, i32) {
        self.mode.map(|m| m.size()).unwrap_or((0, 0))
    }

    fn state(&self) -> OutputState {
        OutputState { enabled: self.is_enabled(), mode: self.mode }
    }
}

/// What the caller has to do after an output went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The last nested output closed; the session is over.
    Terminate,
    /// Another output took over; views must be repositioned.
    Reposition,
    /// The remaining outputs keep their places.
    Relayout,
}

// ============================================================================
// OutputManager
// ============================================================================

#[derive(Debug, Default)]
pub struct OutputManager {
    outputs: Vec<Output>,
    layout: OutputLayout,
    /// Positions from committed configurations, by output name.
    manual_positions: HashMap<String, (i32, i32)>,
    listeners: Listeners,
    next_seq: u64,
}

impl OutputManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn get(&self, id: OutputId) -> Option<&Output> {
        self.outputs.iter().find(|o| o.id == id)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Output> {
        self.outputs.iter()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn enabled_count(&self) -> usize {
        self.outputs.iter().filter(|o| o.is_enabled()).count()
    }

    pub fn find_by_name(&self, name: &str) -> Option<OutputId> {
        self.outputs.iter().find(|o| o.name == name).map(|o| o.id)
    }

    pub fn is_listening(&self, id: OutputId, signal: Signal) -> bool {
        self.listeners.is_subscribed(Source::Output(id), signal)
    }

    /// Take ownership of a hotplugged output and try to light it up.
    ///
    /// Failing to find a working mode is not an error: the output stays
    /// registered but disabled.
    pub fn register(
        &mut self,
        info: OutputInfo,
        config: &Config,
        backend: &mut dyn Backend,
    ) -> Result<OutputId> {
        let id = info.id;
        if self.get(id).is_some() {
            return Err(CoreError::protocol(format!("output {} announced twice", info.name)));
        }

        if !backend.init_render(id) {
            return Err(CoreError::allocation(format!(
                "failed to initialize rendering for output {}",
                info.name
            )));
        }
        let scene_output = backend.create_scene_output(id).ok_or_else(|| {
            CoreError::allocation(format!("failed to create scene output for {}", info.name))
        })?;

        if info.kind.is_nested() {
            if config.fullscreen {
                backend.set_nested_fullscreen(id, true);
            }
            if config.borderless {
                wlog!(logging::OUTPUT, "Borderless window requested for {}", info.name);
            }
        }
        if !backend.load_cursor_theme(info.scale) {
            tracing::error!(target: logging::OUTPUT, "Failed to load cursor theme at scale {}", info.scale);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.listeners.subscribe(
            Source::Output(id),
            &[Signal::Destroy, Signal::Commit, Signal::RequestState, Signal::Frame],
        );

        let negotiated = negotiate_state(&info, config, backend);
        self.outputs.push(Output {
            id,
            name: info.name.clone(),
            kind: info.kind,
            scale: info.scale,
            status: OutputStatus::Disabled,
            mode: None,
            scene_output,
            seq,
        });

        match negotiated {
            Some(state) => {
                if self.commit_enable(id, state, backend) && config.output_mode == OutputMode::Last {
                    let others: Vec<OutputId> = self
                        .outputs
                        .iter()
                        .filter(|o| o.id != id && o.is_enabled())
                        .map(|o| o.id)
                        .collect();
                    for other in others {
                        self.disable(other, backend);
                    }
                }
            }
            None => {
                tracing::warn!(target: logging::OUTPUT, "No usable mode for output {}, leaving it disabled", info.name);
            }
        }

        self.sync_scene(backend);
        wlog!(logging::OUTPUT, "Registered output {} ({:?})", info.name, info.kind);
        Ok(id)
    }

    /// Drop an output the backend removed.
    pub fn unregister(
        &mut self,
        id: OutputId,
        config: &Config,
        backend: &mut dyn Backend,
    ) -> Result<Removal> {
        let idx = self
            .outputs
            .iter()
            .position(|o| o.id == id)
            .ok_or(CoreError::UnknownOutput(id.0))?;

        self.listeners.unsubscribe_all(Source::Output(id));
        let output = self.outputs.remove(idx);
        self.layout.remove(id);
        backend.destroy_node(output.scene_output);
        wlog!(logging::OUTPUT, "Output {} removed", output.name);

        if self.outputs.is_empty() {
            if output.kind.is_nested() {
                return Ok(Removal::Terminate);
            }
            return Ok(Removal::Relayout);
        }

        if config.output_mode == OutputMode::Last && self.enabled_count() == 0 {
            if let Some(next) = self.outputs.iter().max_by_key(|o| o.seq).map(|o| o.id) {
                self.enable(next, backend);
            }
            self.sync_scene(backend);
            return Ok(Removal::Reposition);
        }

        self.sync_scene(backend);
        Ok(Removal::Relayout)
    }

    /// Turn a known output back on with its last mode.
    pub fn enable(&mut self, id: OutputId, backend: &mut dyn Backend) -> bool {
        let Some(output) = self.get(id) else {
            return false;
        };
        if output.is_enabled() {
            return true;
        }
        let state = OutputState::enabled(output.mode);
        self.commit_enable(id, state, backend)
    }

    /// Turn an output off and take it out of the layout.
    pub fn disable(&mut self, id: OutputId, backend: &mut dyn Backend) {
        let Some(output) = self.outputs.iter_mut().find(|o| o.id == id) else {
            return;
        };
        if !output.is_enabled() {
            tracing::debug!(target: logging::OUTPUT, "Output {} already disabled", output.name);
            return;
        }
        if !backend.commit_state(id, &OutputState::disabled()) {
            tracing::warn!(target: logging::OUTPUT, "Backend refused to disable {}", output.name);
        }
        output.status = OutputStatus::Disabled;
        self.layout.remove(id);
        wlog!(logging::OUTPUT, "Disabled output {}", output.name);
    }

    /// Apply a multi-output configuration as one transaction.
    ///
    /// Nothing is touched unless every head passes preparation and the
    /// combined commit succeeds; `test_only` never touches anything.
    pub fn apply_configuration(
        &mut self,
        heads: &[HeadRequest],
        test_only: bool,
        backend: &mut dyn Backend,
    ) -> Result<()> {
        if heads.is_empty() {
            return Err(CoreError::transaction("configuration names no outputs"));
        }

        let mut states = Vec::with_capacity(heads.len());
        for head in heads {
            let output = self.get(head.output).ok_or(CoreError::UnknownOutput(head.output.0))?;
            if states.iter().any(|(id, _)| *id == head.output) {
                return Err(CoreError::protocol(format!(
                    "output {} configured twice",
                    output.name
                )));
            }
            let mut state = head.state;
            if state.enabled && state.mode.is_none() {
                state.mode = output.mode;
            }
            states.push((head.output, state));
        }

        if !backend.prepare(&states) {
            return Err(CoreError::transaction("output preparation failed"));
        }
        if test_only {
            return Ok(());
        }
        if !backend.commit(&states) {
            return Err(CoreError::transaction("output commit failed"));
        }

        for (head, (id, state)) in heads.iter().zip(states) {
            let Some(output) = self.outputs.iter_mut().find(|o| o.id == id) else {
                continue;
            };
            if state.enabled {
                output.status = OutputStatus::Enabling;
                if state.mode.is_some() {
                    output.mode = state.mode;
                }
                let (width, height) = output.size();
                match head.position {
                    Some((x, y)) => {
                        self.manual_positions.insert(output.name.clone(), (x, y));
                        self.layout.add(id, x, y, width, height);
                    }
                    None if self.layout.contains(id) => self.layout.set_size(id, width, height),
                    None => place(&mut self.layout, &self.manual_positions, output),
                }
                output.status = OutputStatus::Enabled;
            } else {
                output.status = OutputStatus::Disabled;
                self.layout.remove(id);
            }
        }

        self.sync_scene(backend);
        wlog!(logging::OUTPUT, "Applied configuration for {} output(s)", heads.len());
        Ok(())
    }

    /// Heads for configuration observers, in registration order.
    pub fn configuration(&self) -> Vec<ConfigurationHead> {
        self.outputs
            .iter()
            .map(|o| {
                let position = if o.is_enabled() {
                    self.layout.get_box(o.id).map(|b| (b.x, b.y))
                } else {
                    None
                };
                ConfigurationHead {
                    output: o.id,
                    name: o.name.clone(),
                    enabled: o.is_enabled(),
                    mode: o.mode,
                    position,
                }
            })
            .collect()
    }

    /// A nested output asked for a new state, e.g. its host window resized.
    pub fn request_state(
        &mut self,
        id: OutputId,
        state: OutputState,
        backend: &mut dyn Backend,
    ) -> Result<()> {
        let output = self
            .outputs
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(CoreError::UnknownOutput(id.0))?;
        if !backend.commit_state(id, &state) {
            return Err(CoreError::negotiation(format!(
                "output {} rejected requested state",
                output.name
            )));
        }

        if state.mode.is_some() {
            output.mode = state.mode;
        }
        if state.enabled {
            let (width, height) = output.size();
            if self.layout.contains(id) {
                self.layout.set_size(id, width, height);
            } else {
                place(&mut self.layout, &self.manual_positions, output);
            }
            output.status = OutputStatus::Enabled;
        } else {
            output.status = OutputStatus::Disabled;
            self.layout.remove(id);
        }
        self.sync_scene(backend);
        Ok(())
    }

    /// Render a frame if the output is on.
    pub fn frame(&self, id: OutputId, backend: &mut dyn Backend) -> bool {
        match self.get(id) {
            Some(output) if output.is_enabled() => backend.render_frame(output.scene_output),
            _ => false,
        }
    }

    /// Title every nested output's host window.
    pub fn set_window_title(&self, title: &str, backend: &mut dyn Backend) {
        for output in self.outputs.iter().filter(|o| o.kind.is_nested()) {
            backend.set_window_title(output.id, title);
        }
    }

    /// Release every output at shutdown.
    pub fn clear(&mut self, backend: &mut dyn Backend) {
        for output in self.outputs.drain(..) {
            self.listeners.unsubscribe_all(Source::Output(output.id));
            backend.destroy_node(output.scene_output);
        }
        self.layout = OutputLayout::new();
    }

    fn commit_enable(&mut self, id: OutputId, state: OutputState, backend: &mut dyn Backend) -> bool {
        let Some(output) = self.outputs.iter_mut().find(|o| o.id == id) else {
            return false;
        };
        output.status = OutputStatus::Enabling;
        if !backend.commit_state(id, &state) {
            output.status = OutputStatus::Disabled;
            tracing::error!(target: logging::OUTPUT, "Failed to commit output {}", output.name);
            return false;
        }
        if state.mode.is_some() {
            output.mode = state.mode;
        }
        place(&mut self.layout, &self.manual_positions, output);
        output.status = OutputStatus::Enabled;
        if let Some(mode) = output.mode {
            let (w, h) = mode.size();
            wlog!(logging::OUTPUT, "Enabled output {} at {}x{}", output.name, w, h);
        }
        true
    }

    fn sync_scene(&self, backend: &mut dyn Backend) {
        for output in &self.outputs {
            match self.layout.get_box(output.id) {
                Some(rect) if output.is_enabled() => {
                    backend.set_node_position(output.scene_output, rect.x, rect.y);
                    backend.set_node_enabled(output.scene_output, true);
                }
                _ => backend.set_node_enabled(output.scene_output, false),
            }
        }
    }
}

/// Put an output into the layout, at its remembered position if it has one.
fn place(layout: &mut OutputLayout, manual: &HashMap<String, (i32, i32)>, output: &Output) {
    let (width, height) = output.size();
    match manual.get(&output.name) {
        Some(&(x, y)) => layout.add(output.id, x, y, width, height),
        None => layout.add_auto(output.id, width, height),
    };
}

/// Pick the state to enable a new output with.
///
/// A forced size is taken as a custom mode without testing. Otherwise the
/// preferred mode is tried first, then every other mode in the order the
/// device lists them.
fn negotiate_state(info: &OutputInfo, config: &Config, backend: &mut dyn Backend) -> Option<OutputState> {
    if let Some((width, height)) = config.forced_output_size() {
        let refresh = config.custom_refresh_mhz();
        if refresh == 0 && config.output_refresh != 0 {
            tracing::warn!(target: logging::OUTPUT, "Ignoring refresh rate {} Hz", config.output_refresh);
        }
        return Some(OutputState::enabled(Some(ModeSetting::Custom { width, height, refresh })));
    }

    let Some(preferred) = info.preferred_mode() else {
        let state = OutputState::enabled(None);
        return backend.test_state(info.id, &state).then_some(state);
    };

    let candidates = std::iter::once(preferred).chain(info.modes.iter().copied().filter(|m| *m != preferred));
    for mode in candidates {
        let state = OutputState::enabled(Some(ModeSetting::Fixed(mode)));
        if backend.test_state(info.id, &state) {
            return Some(state);
        }
        tracing::debug!(
            target: logging::OUTPUT,
            "Mode {}x{}@{} rejected on {}",
            mode.width,
            mode.height,
            mode.refresh,
            info.name
        );
    }
    None
}
