use super::*;
use crate::core::backend::OutputId;
use crate::core::protocol::ToplevelRef;
use crate::platform::{HeadlessBackend, HeadlessProtocol, ProtocolCall};

struct Fixture {
    config: Config,
    layout: OutputLayout,
    backend: HeadlessBackend,
    protocol: HeadlessProtocol,
    views: ViewRegistry,
}

fn fixture() -> Fixture {
    let mut layout = OutputLayout::new();
    layout.add_auto(OutputId(1), 1920, 1080);
    Fixture {
        config: Config::default(),
        layout,
        backend: HeadlessBackend::new(),
        protocol: HeadlessProtocol::recording(),
        views: ViewRegistry::new(),
    }
}

impl Fixture {
    fn add(&mut self, info: ToplevelInfo) -> ViewId {
        self.views.add(info, &mut self.backend).unwrap()
    }

    fn map(&mut self, handle: u32) -> ViewId {
        let surface = SurfaceId(handle + 100);
        self.views
            .map(ObjectId(handle), surface, &self.config, &self.layout, &mut self.protocol, &mut self.backend)
            .unwrap()
    }

    fn add_mapped(&mut self, handle: u32, parent: Option<u32>) -> ViewId {
        let mut info = ToplevelInfo::xdg(ObjectId(handle), SurfaceId(handle + 100));
        if let Some(parent) = parent {
            info = info.with_parent(ObjectId(parent));
        }
        self.add(info);
        self.map(handle)
    }
}

#[test]
fn test_map_forces_game_geometry() {
    let mut f = fixture();
    f.add(ToplevelInfo::xdg(ObjectId(1), SurfaceId(101)).with_title("game").with_app_id("org.game"));
    let id = f.map(1);

    let view = f.views.get(id).unwrap();
    assert!(view.mapped);
    assert_eq!(view.geometry(), Rect::new(0, 0, 1280, 720));
    assert_eq!(view.output, Some(OutputId(1)));
    assert_eq!(f.views.stacking_order(), &[id]);

    let toplevel = ToplevelRef::Xdg(ObjectId(1));
    assert!(f.protocol.calls.contains(&ProtocolCall::SetSize(toplevel, 1280, 720)));
    assert!(f.protocol.calls.contains(&ProtocolCall::SetMaximized(toplevel, true)));
    assert!(f.protocol.calls.contains(&ProtocolCall::SetFullscreen(toplevel, true)));

    let foreign = view.foreign_toplevel.unwrap();
    assert!(f.protocol.calls.contains(&ProtocolCall::ForeignTitle(foreign, "game".into())));
    assert!(f.protocol.calls.contains(&ProtocolCall::ForeignAppId(foreign, "org.game".into())));
    assert!(f.backend.node(view.scene_tree).unwrap().enabled);
}

#[test]
fn test_dialogs_get_the_same_geometry() {
    let mut f = fixture();
    f.add_mapped(1, None);
    let dialog = f.add_mapped(2, Some(1));
    assert_eq!(f.views.get(dialog).unwrap().geometry(), Rect::new(0, 0, 1280, 720));
}

#[test]
fn test_unmap_keeps_view_for_remap() {
    let mut f = fixture();
    let id = f.add_mapped(1, None);
    f.views.focus(id, &mut f.protocol);

    let lost = f.views.unmap(ObjectId(1), &mut f.protocol, &mut f.backend).unwrap();
    assert!(lost);
    assert_eq!(f.views.focused(), None);
    assert!(f.views.stacking_order().is_empty());
    let view = f.views.get(id).unwrap();
    assert!(!view.mapped);
    assert!(view.foreign_toplevel.is_none());
    assert!(!f.backend.node(view.scene_tree).unwrap().enabled);

    assert_eq!(f.map(1), id);
    assert!(f.views.get(id).unwrap().mapped);
}

#[test]
fn test_destroy_releases_view_and_popups() {
    let mut f = fixture();
    let id = f.add_mapped(1, None);
    f.views.focus(id, &mut f.protocol);
    f.views
        .add_popup(ObjectId(50), PopupParent::Toplevel(ObjectId(1)), Rect::new(10, 10, 100, 100), &mut f.backend)
        .unwrap();
    f.views
        .add_popup(ObjectId(51), PopupParent::Popup(ObjectId(50)), Rect::new(5, 5, 50, 50), &mut f.backend)
        .unwrap();
    let scene = f.views.get(id).unwrap().scene_tree;

    let lost = f.views.destroy(ObjectId(1), &mut f.protocol, &mut f.backend).unwrap();
    assert!(lost);
    assert!(f.views.is_empty());
    assert_eq!(f.views.popup_count(), 0);
    assert!(f.backend.node(scene).is_none());
    assert!(!f.views.is_listening(Source::Popup(ObjectId(51)), Signal::Commit));

    // Late requests for the destroyed toplevel are dropped.
    let err = f.views.unmap(ObjectId(1), &mut f.protocol, &mut f.backend).unwrap_err();
    assert!(matches!(err, CoreError::ProtocolViolation(_)));
}

#[test]
fn test_transient_chain() {
    let mut f = fixture();
    let a = f.add_mapped(1, None);
    let b = f.add_mapped(2, Some(1));
    let c = f.add_mapped(3, Some(2));

    assert!(f.views.is_transient_for(b, a));
    assert!(f.views.is_transient_for(c, a));
    assert!(!f.views.is_transient_for(a, c));
    assert!(!f.views.is_transient_for(a, a));
    assert!(f.views.get(a).unwrap().is_primary());
    assert!(!f.views.get(c).unwrap().is_primary());
}

#[test]
fn test_parents_of_the_other_protocol_do_not_count() {
    let mut f = fixture();
    let x11 = f.add(ToplevelInfo::xwayland(ObjectId(1), SurfaceId(101), Rect::new(0, 0, 640, 480)));
    let xdg = f.add(ToplevelInfo::xdg(ObjectId(2), SurfaceId(102)).with_parent(ObjectId(1)));
    assert!(!f.views.is_transient_for(xdg, x11));
}

#[test]
fn test_click_focus_rule() {
    let mut f = fixture();
    let main = f.add_mapped(1, None);
    let dialog = f.add_mapped(2, Some(1));
    let other = f.add_mapped(3, None);

    assert!(f.views.should_focus(main));
    f.views.focus(main, &mut f.protocol);

    assert!(!f.views.should_focus(main));
    assert!(!f.views.should_focus(dialog));
    assert!(f.views.should_focus(other));

    f.views.focus(dialog, &mut f.protocol);
    // The owner of the focused dialog is not its descendant.
    assert!(f.views.should_focus(main));
}

#[test]
fn test_focus_activates_and_raises() {
    let mut f = fixture();
    let a = f.add_mapped(1, None);
    let b = f.add_mapped(2, None);

    assert_eq!(f.views.focus(a, &mut f.protocol), Some(SurfaceId(101)));
    assert_eq!(f.views.stacking_order(), &[b, a]);
    f.views.focus(b, &mut f.protocol);

    assert!(f.protocol.calls.contains(&ProtocolCall::SetActivated(ToplevelRef::Xdg(ObjectId(1)), false)));
    assert!(f.protocol.calls.contains(&ProtocolCall::SetActivated(ToplevelRef::Xdg(ObjectId(2)), true)));
    assert_eq!(f.views.focused_surface(), Some(SurfaceId(102)));
}

#[test]
fn test_parent_cycles_are_rejected() {
    let mut f = fixture();
    f.add_mapped(1, None);
    f.add_mapped(2, Some(1));

    let err = f.views.set_parent(ObjectId(1), Some(ObjectId(2))).unwrap_err();
    assert!(matches!(err, CoreError::ProtocolViolation(_)));
    assert!(f.views.set_parent(ObjectId(1), Some(ObjectId(1))).is_err());
    assert!(f.views.get_by_handle(ObjectId(1)).unwrap().is_primary());

    f.views.set_parent(ObjectId(2), None).unwrap();
    assert!(f.views.get_by_handle(ObjectId(2)).unwrap().is_primary());
}

#[test]
fn test_unknown_parents_never_become_links() {
    let mut f = fixture();
    let a = f.add(ToplevelInfo::xdg(ObjectId(1), SurfaceId(101)));

    // Naming a handle that is not tracked yet cannot set up a later cycle.
    let err = f.views.set_parent(ObjectId(1), Some(ObjectId(2))).unwrap_err();
    assert!(matches!(err, CoreError::ProtocolViolation(_)));
    assert_eq!(f.views.get(a).unwrap().parent(), None);

    let b = f.add(ToplevelInfo::xdg(ObjectId(2), SurfaceId(102)).with_parent(ObjectId(1)));
    assert!(f.views.is_transient_for(b, a));
    assert!(!f.views.is_transient_for(a, b));

    // A new view announced with an untracked parent starts parentless.
    let c = f.add(ToplevelInfo::xdg(ObjectId(3), SurfaceId(103)).with_parent(ObjectId(9)));
    assert!(f.views.get(c).unwrap().is_primary());
}

#[test]
fn test_destroyed_parent_releases_its_dialogs() {
    let mut f = fixture();
    f.add_mapped(1, None);
    let dialog = f.add_mapped(2, Some(1));

    f.views.destroy(ObjectId(1), &mut f.protocol, &mut f.backend).unwrap();
    assert!(f.views.get(dialog).unwrap().is_primary());

    // The handle comes back as a new view that names the dialog.
    let reused = f.add(ToplevelInfo::xdg(ObjectId(1), SurfaceId(111)).with_parent(ObjectId(2)));
    assert!(f.views.is_transient_for(reused, dialog));
    assert!(!f.views.is_transient_for(dialog, reused));
}

#[test]
fn test_override_redirect_windows_place_themselves() {
    let mut f = fixture();
    let menu = Rect::new(300, 200, 150, 400);
    f.add(ToplevelInfo::xwayland(ObjectId(1), SurfaceId(101), menu).with_override_redirect());
    let id = f.map(1);
    assert_eq!(f.views.get(id).unwrap().geometry(), menu);
    assert!(!f.protocol.calls.iter().any(|c| matches!(c, ProtocolCall::SetSize(..))));

    let moved = Rect::new(320, 240, 150, 400);
    f.views.request_configure(ObjectId(1), moved, &mut f.protocol, &mut f.backend).unwrap();
    assert_eq!(f.views.get(id).unwrap().geometry(), moved);
}

#[test]
fn test_managed_x11_configure_gets_forced_geometry() {
    let mut f = fixture();
    f.add(ToplevelInfo::xwayland(ObjectId(1), SurfaceId(101), Rect::new(50, 50, 640, 480)));
    let id = f.map(1);
    assert_eq!(f.views.get(id).unwrap().geometry(), Rect::new(0, 0, 1280, 720));

    f.protocol.calls.clear();
    f.views
        .request_configure(ObjectId(1), Rect::new(10, 10, 800, 600), &mut f.protocol, &mut f.backend)
        .unwrap();
    let toplevel = ToplevelRef::Xwayland(ObjectId(1));
    assert_eq!(
        f.protocol.calls,
        vec![ProtocolCall::SetPosition(toplevel, 0, 0), ProtocolCall::SetSize(toplevel, 1280, 720)]
    );
}

#[test]
fn test_fullscreen_request_uses_layout_bounds() {
    let mut f = fixture();
    f.layout.add_auto(OutputId(2), 1280, 1024);
    f.add(ToplevelInfo::xdg(ObjectId(1), SurfaceId(101)));

    // Unmapped views are ignored.
    f.protocol.calls.clear();
    f.views.request_fullscreen(ObjectId(1), true, &f.layout, &mut f.protocol).unwrap();
    assert!(f.protocol.calls.is_empty());

    let id = f.map(1);
    f.views.request_fullscreen(ObjectId(1), true, &f.layout, &mut f.protocol).unwrap();
    let toplevel = ToplevelRef::Xdg(ObjectId(1));
    let foreign = f.views.get(id).unwrap().foreign_toplevel.unwrap();
    assert!(f.protocol.calls.contains(&ProtocolCall::SetSize(toplevel, 3200, 1080)));
    assert!(f.protocol.calls.contains(&ProtocolCall::ForeignFullscreen(foreign, true)));
}

#[test]
fn test_decoration_mode_follows_configuration() {
    let mut f = fixture();
    f.config.server_side_decorations = true;
    f.add(ToplevelInfo::xdg(ObjectId(1), SurfaceId(101)));
    f.views.add_decoration(ObjectId(10), ObjectId(1), &f.config, &mut f.protocol).unwrap();

    let sent = |p: &HeadlessProtocol| {
        p.calls.iter().filter(|c| matches!(c, ProtocolCall::SetDecorationMode(..))).count()
    };
    assert_eq!(sent(&f.protocol), 0);

    f.views
        .commit(ObjectId(1), true, 0, 0, &f.config, &f.layout, &mut f.protocol, &mut f.backend)
        .unwrap();
    assert!(f.protocol.calls.contains(&ProtocolCall::SetFullscreenCapability(ObjectId(1))));
    assert!(f.protocol.calls.contains(&ProtocolCall::SetDecorationMode(ObjectId(10), DecorationMode::ServerSide)));

    f.views
        .decoration_request_mode(ObjectId(10), Some(DecorationMode::ClientSide), &f.config, &mut f.protocol)
        .unwrap();
    assert_eq!(sent(&f.protocol), 2);
    assert_eq!(f.views.decoration(ObjectId(10)).unwrap().requested, Some(DecorationMode::ClientSide));

    f.views.destroy_decoration(ObjectId(10)).unwrap();
    assert!(f.views.destroy_decoration(ObjectId(10)).is_err());
}

#[test]
fn test_destroying_toplevel_drops_its_decorations() {
    let mut f = fixture();
    f.add(ToplevelInfo::xdg(ObjectId(1), SurfaceId(101)));
    f.add(ToplevelInfo::xdg(ObjectId(2), SurfaceId(102)));
    f.views.add_decoration(ObjectId(10), ObjectId(1), &f.config, &mut f.protocol).unwrap();
    f.views.add_decoration(ObjectId(20), ObjectId(2), &f.config, &mut f.protocol).unwrap();

    f.views.destroy(ObjectId(1), &mut f.protocol, &mut f.backend).unwrap();
    assert!(f.views.decoration(ObjectId(10)).is_none());
    assert!(!f.views.is_listening(Source::Decoration(ObjectId(10)), Signal::Destroy));
    assert!(f.views.destroy_decoration(ObjectId(10)).is_err());
    let err = f.views
        .decoration_request_mode(ObjectId(10), None, &f.config, &mut f.protocol)
        .unwrap_err();
    assert!(matches!(err, CoreError::ProtocolViolation(_)));

    // Decorations of other toplevels are untouched.
    assert!(f.views.decoration(ObjectId(20)).is_some());
    f.views.destroy_decoration(ObjectId(20)).unwrap();
}

#[test]
fn test_popup_outside_integer_range_is_rejected() {
    let mut f = fixture();
    let parent = Rect::new(100, 0, 640, 480);
    f.add(ToplevelInfo::xwayland(ObjectId(1), SurfaceId(101), parent).with_override_redirect());
    f.map(1);

    let far = Rect::new(i32::MAX - 10, 0, 300, 200);
    f.views.add_popup(ObjectId(50), PopupParent::Toplevel(ObjectId(1)), far, &mut f.backend).unwrap();
    let err = f.views.popup_commit(ObjectId(50), true, &f.layout, &mut f.protocol).unwrap_err();
    assert!(matches!(err, CoreError::ProtocolViolation(_)));
    assert_eq!(f.views.popup(ObjectId(50)).unwrap().geometry, far);
    assert!(!f.protocol.calls.iter().any(|c| matches!(c, ProtocolCall::ConfigurePopup(..))));

    // A sane reposition afterwards still works.
    f.views
        .popup_reposition(ObjectId(50), Rect::new(10, 10, 100, 100), &f.layout, &mut f.protocol)
        .unwrap();
    assert_eq!(f.views.popup(ObjectId(50)).unwrap().geometry, Rect::new(10, 10, 100, 100));
}

#[test]
fn test_popup_is_clamped_into_its_output() {
    let mut f = fixture();
    f.add_mapped(1, None);
    f.views
        .add_popup(ObjectId(50), PopupParent::Toplevel(ObjectId(1)), Rect::new(1800, 1000, 300, 200), &mut f.backend)
        .unwrap();
    f.views.popup_commit(ObjectId(50), true, &f.layout, &mut f.protocol).unwrap();

    let clamped = Rect::new(1620, 880, 300, 200);
    assert_eq!(f.views.popup(ObjectId(50)).unwrap().geometry, clamped);
    assert!(f.protocol.calls.contains(&ProtocolCall::ConfigurePopup(ObjectId(50), clamped)));

    // Nested popups are clamped relative to their parent popup.
    f.views
        .add_popup(ObjectId(51), PopupParent::Popup(ObjectId(50)), Rect::new(250, 0, 100, 50), &mut f.backend)
        .unwrap();
    f.views.popup_commit(ObjectId(51), true, &f.layout, &mut f.protocol).unwrap();
    assert_eq!(f.views.popup(ObjectId(51)).unwrap().geometry, Rect::new(200, 0, 100, 50));
}

#[test]
fn test_popups_without_shell_parent_are_rejected() {
    let mut f = fixture();
    let err = f.views
        .add_popup(ObjectId(50), PopupParent::Unknown, Rect::new(0, 0, 10, 10), &mut f.backend)
        .unwrap_err();
    assert!(matches!(err, CoreError::ProtocolViolation(_)));
    assert_eq!(f.views.popup_count(), 0);
}

#[test]
fn test_reposition_moves_views_off_removed_outputs() {
    let mut f = fixture();
    f.layout.add_auto(OutputId(2), 1280, 1024);
    let id = f.add_mapped(1, None);

    f.layout.remove(OutputId(1));
    f.views.reposition_all(&f.config, &f.layout, &mut f.protocol, &mut f.backend);
    let view = f.views.get(id).unwrap();
    assert_eq!(view.output, Some(OutputId(2)));
    assert_eq!((view.x, view.y), (0, 0));
}

#[test]
fn test_view_at_reports_surface_coordinates() {
    let mut f = fixture();
    let id = f.add_mapped(1, None);
    assert_eq!(f.views.view_at(100.5, 50.0), Some((id, SurfaceId(101), 100.5, 50.0)));
    assert_eq!(f.views.view_at(1500.0, 50.0), None);
}
