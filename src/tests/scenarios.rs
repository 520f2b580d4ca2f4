//! End-to-end event sequences against the headless platform.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::config::{Config, OutputMode};
use crate::core::backend::{Mode, OutputId, OutputInfo, OutputKind, OutputState};
use crate::core::event::{Event, HeadRequest, KeyEvent};
use crate::core::input::keyboard::test_keymaps::{self, KEY_ESC, KEY_LEFTALT};
use crate::core::input::{InputDeviceInfo, SeatCapabilities};
use crate::core::output::OutputStatus;
use crate::core::protocol::{ButtonState, KeyState, ObjectId, SurfaceId, ToplevelRef};
use crate::core::window::ToplevelInfo;
use crate::core::{Runtime, RuntimeConfig, Server};
use crate::platform::{HeadlessBackend, HeadlessProtocol, ProtocolCall};
use crate::util::geometry::Rect;

type TestServer = Server<HeadlessBackend, HeadlessProtocol>;

fn server_with(config: Config) -> TestServer {
    let mut server = Server::new(config, HeadlessBackend::new(), HeadlessProtocol::recording());
    server.start().unwrap();
    server
}

fn server() -> TestServer {
    server_with(Config::default())
}

fn output(id: u32, kind: OutputKind) -> Event {
    Event::NewOutput(OutputInfo::new(
        OutputId(id),
        format!("OUT-{id}"),
        kind,
        vec![Mode::new(1920, 1080, 60_000).preferred()],
    ))
}

fn button(device: u32) -> Event {
    Event::PointerButton {
        device: crate::core::backend::DeviceId(device),
        time: 0,
        button: 0x110,
        state: ButtonState::Pressed,
    }
}

fn motion(device: u32, dx: f64, dy: f64) -> Event {
    Event::PointerMotion { device: crate::core::backend::DeviceId(device), time: 0, dx, dy }
}

fn run(server: &mut TestServer, events: impl IntoIterator<Item = Event>) {
    for event in events {
        server.protocol.push_event(event);
    }
    server.dispatch();
}

/// Map a native toplevel through its whole handshake.
fn map_xdg(server: &mut TestServer, handle: u32, title: &str) {
    run(
        server,
        [
            Event::NewToplevel(ToplevelInfo::xdg(ObjectId(handle), SurfaceId(handle + 100)).with_title(title)),
            Event::ToplevelCommit { toplevel: ObjectId(handle), initial: true, width: 0, height: 0 },
            Event::ToplevelMap { toplevel: ObjectId(handle), surface: SurfaceId(handle + 100) },
        ],
    );
}

#[test]
fn test_two_outputs_extend() {
    let mut server = server();
    server.backend.push_event(output(1, OutputKind::Drm));
    server.backend.push_event(output(2, OutputKind::Drm));
    assert_eq!(server.dispatch(), 2);

    let layout = server.outputs.layout();
    assert_eq!(layout.get_box(OutputId(1)), Some(Rect::new(0, 0, 1920, 1080)));
    assert_eq!(layout.get_box(OutputId(2)), Some(Rect::new(1920, 0, 1920, 1080)));

    let heads = &server.protocol.configuration;
    assert_eq!(heads.len(), 2);
    assert!(heads.iter().all(|h| h.enabled));
    assert_eq!(heads[1].position, Some((1920, 0)));

    // Centered once, when the first output came up.
    assert_eq!(server.seat.cursor_position(), (960.0, 540.0));
}

#[test]
fn test_losing_nested_output_terminates_once() {
    let mut server = server();
    server.backend.push_event(output(1, OutputKind::Wayland));
    server.dispatch();

    server.backend.push_event(Event::OutputDestroyed(OutputId(1)));
    server.dispatch();
    assert!(server.is_terminating());
    assert!(!server.client_exited());
    assert!(server.outputs.is_empty());

    // A later request to stop is a no-op.
    assert!(!server.terminate());
    run(&mut server, [Event::Terminate]);
    assert!(server.is_terminating());
}

#[test]
fn test_client_exit_terminates() {
    let mut server = server();
    server.push_event(Event::ClientExited);
    server.dispatch();
    assert!(server.is_terminating());
    assert!(server.client_exited());
}

#[test]
fn test_click_on_dialog_keeps_focus() {
    let mut server = server();
    server.backend.push_event(output(1, OutputKind::Drm));
    server.backend.push_event(Event::NewInput(InputDeviceInfo::pointer(crate::core::backend::DeviceId(1), "mouse")));
    server.dispatch();

    let main = ToplevelInfo::xwayland(ObjectId(1), SurfaceId(101), Rect::new(0, 0, 800, 600));
    let dialog = ToplevelInfo::xwayland(ObjectId(2), SurfaceId(102), Rect::new(1400, 100, 200, 100))
        .with_parent(ObjectId(1))
        .with_override_redirect();
    run(
        &mut server,
        [
            Event::NewToplevel(main),
            Event::ToplevelMap { toplevel: ObjectId(1), surface: SurfaceId(101) },
            Event::NewToplevel(dialog),
            Event::ToplevelMap { toplevel: ObjectId(2), surface: SurfaceId(102) },
        ],
    );
    assert_eq!(server.protocol.keyboard_focus, Some(SurfaceId(102)));

    // The cursor starts centered over the game window.
    run(&mut server, [button(1)]);
    assert_eq!(server.protocol.keyboard_focus, Some(SurfaceId(101)));
    let main_id = server.views.get_by_handle(ObjectId(1)).unwrap().id;
    assert_eq!(server.views.focused(), Some(main_id));

    run(&mut server, [motion(1, 500.0, -400.0)]);
    server.protocol.calls.clear();
    run(&mut server, [button(1)]);

    assert_eq!(server.views.focused(), Some(main_id));
    assert_eq!(server.protocol.keyboard_focus, Some(SurfaceId(101)));
    assert_eq!(
        server.protocol.calls,
        vec![ProtocolCall::Activity, ProtocolCall::PointerButton { button: 0x110, state: ButtonState::Pressed }]
    );
}

#[test]
fn test_inhibitor_lifecycle() {
    let mut server = server();
    run(&mut server, [Event::NewInhibitor(ObjectId(7))]);
    assert_eq!(server.protocol.idle_inhibited, Some(true));

    run(&mut server, [Event::InhibitorDestroy(ObjectId(7))]);
    assert_eq!(server.protocol.idle_inhibited, Some(false));

    let notifications = server.protocol.calls_matching(|c| matches!(c, ProtocolCall::IdleInhibited(_)));
    assert_eq!(notifications, vec![&ProtocolCall::IdleInhibited(true), &ProtocolCall::IdleInhibited(false)]);

    // Destroying it again is ignored.
    run(&mut server, [Event::InhibitorDestroy(ObjectId(7))]);
    assert_eq!(server.idle.len(), 0);
}

#[test]
fn test_idle_state_tracks_inhibitor_count() {
    let mut server = server();
    let steps = [
        Event::NewInhibitor(ObjectId(1)),
        Event::NewInhibitor(ObjectId(2)),
        Event::InhibitorDestroy(ObjectId(1)),
        Event::NewInhibitor(ObjectId(3)),
        Event::InhibitorDestroy(ObjectId(3)),
        Event::InhibitorDestroy(ObjectId(2)),
    ];
    for step in steps {
        run(&mut server, [step]);
        assert_eq!(server.protocol.idle_inhibited, Some(!server.idle.is_empty()));
    }
    assert_eq!(server.protocol.idle_inhibited, Some(false));
}

#[test]
fn test_failed_test_only_configuration() {
    let mut server = server();
    server.backend.push_event(output(1, OutputKind::Drm));
    server.backend.push_event(output(2, OutputKind::Drm));
    server.dispatch();
    server.backend.fail_prepare_for(OutputId(2));

    let before = server.outputs.configuration();
    let committed = server.backend.committed.clone();
    let heads = vec![
        HeadRequest { output: OutputId(1), state: OutputState::enabled(None), position: Some((1920, 0)) },
        HeadRequest { output: OutputId(2), state: OutputState::enabled(None), position: Some((0, 0)) },
    ];
    run(&mut server, [Event::OutputManagerTest { config: ObjectId(77), heads }]);

    assert!(server.protocol.calls.contains(&ProtocolCall::ConfigurationResult(ObjectId(77), false)));
    assert_eq!(server.outputs.configuration(), before);
    assert_eq!(server.backend.committed, committed);
}

#[test]
fn test_applied_configuration_is_broadcast() {
    let mut server = server();
    server.backend.push_event(output(1, OutputKind::Drm));
    server.backend.push_event(output(2, OutputKind::Drm));
    server.dispatch();

    let heads = vec![HeadRequest { output: OutputId(2), state: OutputState::disabled(), position: None }];
    run(&mut server, [Event::OutputManagerApply { config: ObjectId(5), heads }]);

    assert!(server.protocol.calls.contains(&ProtocolCall::ConfigurationResult(ObjectId(5), true)));
    let published = &server.protocol.configuration;
    assert!(published[0].enabled);
    assert!(!published[1].enabled);
    assert_eq!(published[1].position, None);
}

#[test]
fn test_last_mode_follows_newest_output() {
    let mut config = Config::default();
    config.output_mode = OutputMode::Last;
    let mut server = server_with(config);
    server.backend.push_event(output(1, OutputKind::Drm));
    server.backend.push_event(output(2, OutputKind::Drm));
    server.dispatch();
    assert_eq!(server.outputs.get(OutputId(1)).unwrap().status, OutputStatus::Disabled);
    assert_eq!(server.outputs.enabled_count(), 1);

    map_xdg(&mut server, 1, "game");
    let view = server.views.get_by_handle(ObjectId(1)).unwrap();
    assert_eq!(view.output, Some(OutputId(2)));

    run(&mut server, [Event::OutputDestroyed(OutputId(2))]);
    assert!(!server.is_terminating());
    assert!(server.outputs.get(OutputId(1)).unwrap().is_enabled());
    let view = server.views.get_by_handle(ObjectId(1)).unwrap();
    assert_eq!(view.output, Some(OutputId(1)));
    assert_eq!((view.x, view.y), (0, 0));
}

#[test]
fn test_keyboards_merge_through_events() {
    let mut server = server();
    let keymap = test_keymaps::basic();
    server.backend.push_event(Event::NewInput(InputDeviceInfo::keyboard(
        crate::core::backend::DeviceId(1),
        "kbd-a",
        keymap.clone(),
    )));
    server.backend.push_event(Event::NewInput(InputDeviceInfo::keyboard(
        crate::core::backend::DeviceId(2),
        "kbd-b",
        keymap,
    )));
    server.dispatch();

    assert_eq!(server.seat.groups().len(), 1);
    assert_eq!(server.protocol.capabilities, SeatCapabilities::KEYBOARD);
}

#[test]
fn test_alt_escape_keycodes_terminate() {
    let mut server = server();
    let keyboard = crate::core::backend::DeviceId(1);
    let key = |keycode| {
        Event::Key(KeyEvent { device: keyboard, time: 0, keycode, state: KeyState::Pressed })
    };
    run(
        &mut server,
        [Event::NewInput(InputDeviceInfo::keyboard(keyboard, "kbd", test_keymaps::basic())), key(KEY_ESC)],
    );
    assert!(!server.is_terminating());

    run(&mut server, [key(KEY_LEFTALT), key(KEY_ESC)]);
    assert!(server.is_terminating());
}

#[test]
fn test_map_focuses_and_unmap_clears() {
    let mut server = server();
    server.backend.push_event(output(1, OutputKind::Wayland));
    server.dispatch();

    map_xdg(&mut server, 1, "game");
    assert_eq!(server.protocol.keyboard_focus, Some(SurfaceId(101)));
    assert_eq!(server.backend.window_titles.get(&OutputId(1)).map(String::as_str), Some("game"));
    assert!(server
        .protocol
        .calls
        .contains(&ProtocolCall::SetSize(ToplevelRef::Xdg(ObjectId(1)), 1280, 720)));

    run(&mut server, [Event::ToplevelUnmap(ObjectId(1))]);
    assert_eq!(server.protocol.keyboard_focus, None);
    assert_eq!(server.views.len(), 1);

    run(&mut server, [Event::ToplevelDestroy(ObjectId(1))]);
    assert!(server.views.is_empty());
}

#[test]
fn test_bad_events_are_dropped() {
    let mut server = server();
    run(
        &mut server,
        [
            Event::OutputFrame(OutputId(9)),
            Event::ToplevelMap { toplevel: ObjectId(3), surface: SurfaceId(3) },
            Event::InputDestroyed(crate::core::backend::DeviceId(4)),
            Event::DecorationDestroy(ObjectId(8)),
        ],
    );
    assert!(!server.is_terminating());
    assert!(server.views.is_empty());
}

#[test]
fn test_shutdown_closes_views_and_releases_state() {
    let mut server = server();
    server.backend.push_event(output(1, OutputKind::Drm));
    server.dispatch();
    map_xdg(&mut server, 1, "game");
    run(&mut server, [Event::NewInhibitor(ObjectId(9))]);

    server.shutdown();
    assert!(!server.is_running());
    assert!(server.protocol.calls.contains(&ProtocolCall::SendClose(ToplevelRef::Xdg(ObjectId(1)))));
    assert!(server.views.is_empty());
    assert!(server.outputs.is_empty());
    assert!(server.idle.is_empty());
    assert!(server.backend.nodes.is_empty());
}

#[test]
fn test_runtime_stops_on_signal() {
    let mut server = server();
    let mut runtime = Runtime::new(RuntimeConfig { tick: Duration::from_millis(0) });

    assert!(runtime.turn(&mut server, None).unwrap());
    runtime.terminate_handle().store(true, Ordering::SeqCst);
    assert!(!runtime.turn(&mut server, None).unwrap());
    assert_eq!(runtime.turns(), 2);
    assert!(server.is_terminating());
}
