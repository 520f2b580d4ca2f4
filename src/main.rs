use std::env;

use anyhow::{bail, Result};
use clap::{ArgAction, Parser, ValueEnum};

use wayframe::config::{Config, OutputMode, ScalingMethod, UpscaleMethod};
use wayframe::core::backend::{Mode, OutputId, OutputInfo, OutputKind};
use wayframe::core::supervise::ClientProcess;
use wayframe::core::{Event, Runtime, Server};
use wayframe::platform::{HeadlessBackend, HeadlessProtocol};
use wayframe::util::logging;
use wayframe::wlog;

/// Command line arguments.
#[derive(Parser, Debug)]
#[clap(about, version, max_term_width = 80, disable_help_flag = true, disable_version_flag = true)]
struct Options {
    /// Ask clients for server-side decorations
    #[clap(short = 'd')]
    server_side_decorations: bool,

    /// Enable debug logging
    #[clap(short = 'D')]
    debug: bool,

    /// Use all outputs side by side, or only the last connected one
    #[clap(short = 'm', value_enum, default_value = "extend")]
    output_mode: OutputModeArg,

    /// Allow VT switching with Alt+F<n>
    #[clap(short = 's')]
    allow_vt_switch: bool,

    /// Nested output width
    #[clap(short = 'W')]
    output_width: Option<i32>,

    /// Nested output height
    #[clap(short = 'H')]
    output_height: Option<i32>,

    /// Nested output refresh rate in Hz
    #[clap(
        long = "output-refresh",
        default_value_t = 0,
        value_parser = clap::value_parser!(i32).range(0..=1_000_000)
    )]
    output_refresh: i32,

    /// Game width
    #[clap(short = 'w', default_value_t = 1280)]
    game_width: i32,

    /// Game height
    #[clap(short = 'h', default_value_t = 720)]
    game_height: i32,

    /// Frame-rate limit while focused
    #[clap(short = 'r', default_value_t = 0)]
    fps_focused: u32,

    /// Frame-rate limit while unfocused
    #[clap(short = 'o', default_value_t = 0)]
    fps_unfocused: u32,

    /// Upscaler
    #[clap(short = 'F', value_enum)]
    upscale: Option<UpscaleArg>,

    /// Scaling policy
    #[clap(short = 'S', value_enum)]
    scaling: Option<ScalingArg>,

    /// Borderless nested window
    #[clap(short = 'b')]
    borderless: bool,

    /// Fullscreen nested window
    #[clap(short = 'f')]
    fullscreen: bool,

    #[clap(long = "reshade-effect")]
    reshade_effect: Option<String>,

    #[clap(long = "reshade-technique-idx")]
    reshade_technique: Option<i32>,

    /// Print version
    #[clap(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    /// Print help
    #[clap(long = "help", action = ArgAction::Help)]
    help: Option<bool>,

    /// Primary client command line
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputModeArg {
    Extend,
    Last,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum UpscaleArg {
    Fsr,
    Nis,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ScalingArg {
    Integer,
    Stretch,
}

impl Options {
    fn config(&self) -> Config {
        Config {
            output_width: self.output_width,
            output_height: self.output_height,
            output_refresh: self.output_refresh,
            game_width: self.game_width,
            game_height: self.game_height,
            fps_focused: self.fps_focused,
            fps_unfocused: self.fps_unfocused,
            upscale: self.upscale.map(|u| match u {
                UpscaleArg::Fsr => UpscaleMethod::Fsr,
                UpscaleArg::Nis => UpscaleMethod::Nis,
            }),
            scaling: self.scaling.map(|s| match s {
                ScalingArg::Integer => ScalingMethod::Integer,
                ScalingArg::Stretch => ScalingMethod::Stretch,
            }),
            reshade_effect: self.reshade_effect.clone(),
            reshade_technique: self.reshade_technique,
            borderless: self.borderless,
            fullscreen: self.fullscreen,
            server_side_decorations: self.server_side_decorations,
            output_mode: match self.output_mode {
                OutputModeArg::Extend => OutputMode::Extend,
                OutputModeArg::Last => OutputMode::Last,
            },
            allow_vt_switch: self.allow_vt_switch,
            debug: self.debug,
        }
    }
}

fn main() {
    let options = Options::parse();
    let config = options.config();
    logging::init(config.debug);

    let code = match run(config, &options.command) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(target: logging::MAIN, "{:#}", err);
            1
        }
    };
    std::process::exit(code);
}

fn run(config: Config, command: &[String]) -> Result<i32> {
    if env::var_os("XDG_RUNTIME_DIR").is_none() {
        bail!("XDG_RUNTIME_DIR is not set in the environment");
    }

    let (width, height) = config
        .forced_output_size()
        .unwrap_or((config.game_width, config.game_height));
    let mut backend = HeadlessBackend::new();
    backend.push_event(Event::NewOutput(OutputInfo::new(
        OutputId(1),
        "HEADLESS-1",
        OutputKind::Headless,
        vec![Mode::new(width, height, 60_000).preferred()],
    )));

    let mut server = Server::new(config, backend, HeadlessProtocol::new());
    server.start()?;

    let mut runtime = Runtime::default();
    runtime.register_signals()?;

    let client = if command.is_empty() {
        wlog!(logging::MAIN, "No client command given, running until terminated");
        None
    } else {
        Some(ClientProcess::spawn(command)?)
    };

    let result = runtime.run(&mut server, client.as_ref());
    let client_exited = server.client_exited();
    server.shutdown();
    result?;

    let code = match client {
        Some(client) => {
            let status = client.finish()?;
            if client_exited {
                status
            } else {
                0
            }
        }
        None => 0,
    };
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_refresh_is_bounded() {
        let options = Options::try_parse_from(["wayframe", "--output-refresh", "144"]).unwrap();
        assert_eq!(options.config().custom_refresh_mhz(), 144_000);
        assert!(Options::try_parse_from(["wayframe", "--output-refresh", "2147483647"]).is_err());
        assert!(Options::try_parse_from(["wayframe", "--output-refresh=-1"]).is_err());
    }
}
