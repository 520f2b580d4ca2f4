//! Startup configuration.
//!
//! Filled from the command line by the binary; the core only reads it.

/// How several connected outputs are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Every output is enabled and laid out left to right.
    #[default]
    Extend,
    /// Only the most recently connected output is enabled.
    Last,
}

/// Upscaling filter. Accepted for compatibility; has no effect in the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpscaleMethod {
    Fsr,
    Nis,
}

/// Scaling policy. Accepted for compatibility; has no effect in the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingMethod {
    Integer,
    Stretch,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Forced output resolution, applied as a custom mode when both are set.
    pub output_width: Option<i32>,
    pub output_height: Option<i32>,
    /// Refresh rate for the forced custom mode, in Hz (0 lets the backend pick).
    pub output_refresh: i32,
    /// Size requested from every managed toplevel.
    pub game_width: i32,
    pub game_height: i32,
    /// Frame-rate caps, parsed only.
    pub fps_focused: u32,
    pub fps_unfocused: u32,
    pub upscale: Option<UpscaleMethod>,
    pub scaling: Option<ScalingMethod>,
    pub reshade_effect: Option<String>,
    pub reshade_technique: Option<i32>,
    /// Nested output window flags.
    pub borderless: bool,
    pub fullscreen: bool,
    /// Ask clients to let the compositor draw decorations.
    pub server_side_decorations: bool,
    pub output_mode: OutputMode,
    pub allow_vt_switch: bool,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_width: None,
            output_height: None,
            output_refresh: 0,
            game_width: 1280,
            game_height: 720,
            fps_focused: 0,
            fps_unfocused: 0,
            upscale: None,
            scaling: None,
            reshade_effect: None,
            reshade_technique: None,
            borderless: false,
            fullscreen: false,
            server_side_decorations: false,
            output_mode: OutputMode::Extend,
            allow_vt_switch: false,
            debug: false,
        }
    }
}

impl Config {
    /// The forced custom output size, if both dimensions are positive.
    pub fn forced_output_size(&self) -> Option<(i32, i32)> {
        match (self.output_width, self.output_height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }

    /// Refresh of the forced custom mode in mHz. A rate that does not fit
    /// gives 0, which lets the backend pick.
    pub fn custom_refresh_mhz(&self) -> i32 {
        self.output_refresh.checked_mul(1000).filter(|mhz| *mhz >= 0).unwrap_or(0)
    }

    /// Size to request from a toplevel on an output of the given size.
    pub fn window_size(&self, output_width: i32, output_height: i32) -> (i32, i32) {
        let width = if self.game_width > 0 { self.game_width } else { output_width };
        let height = if self.game_height > 0 { self.game_height } else { output_height };
        (width, height)
    }
}
