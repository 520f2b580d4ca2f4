//! Keyboard groups and compositor key bindings.

use std::fmt;

use xkbcommon::xkb;

use crate::core::backend::DeviceId;
use crate::core::errors::{CoreError, Result};
use crate::core::protocol::{KeyState, KeyboardModifiers};

/// Offset between evdev keycodes and xkb keycodes.
const EVDEV_OFFSET: u32 = 8;

/// Handle of a logical keyboard as seen by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u32);

/// A compiled keymap.
///
/// Two keymaps are equal when they serialize to the same text, which is
/// what decides whether keyboards can share a group.
#[derive(Clone)]
pub struct Keymap {
    keymap: xkb::Keymap,
    text: String,
}

impl Keymap {
    /// Compile a keymap from its XKB text form.
    pub fn from_string(source: &str) -> Result<Self> {
        let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
        let keymap = xkb::Keymap::new_from_string(
            &context,
            source.to_owned(),
            xkb::KEYMAP_FORMAT_TEXT_V1,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        )
        .ok_or_else(|| CoreError::allocation("failed to compile keymap"))?;
        Ok(Self::from(keymap))
    }
}

impl From<xkb::Keymap> for Keymap {
    fn from(keymap: xkb::Keymap) -> Self {
        let text = keymap.get_as_string(xkb::KEYMAP_FORMAT_TEXT_V1);
        Self { keymap, text }
    }
}

impl PartialEq for Keymap {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl fmt::Debug for Keymap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keymap").field("layouts", &self.keymap.num_layouts()).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatInfo {
    /// Keys per second.
    pub rate: i32,
    /// Milliseconds before repeating starts.
    pub delay: i32,
}

impl Default for RepeatInfo {
    fn default() -> Self {
        Self { rate: 25, delay: 600 }
    }
}

/// One or more keyboards sharing a keymap and repeat settings.
///
/// The group owns the xkb state every member feeds, so modifiers held on
/// one keyboard apply to keys pressed on another.
pub struct KeyboardGroup {
    pub id: GroupId,
    pub keymap: Keymap,
    pub repeat: RepeatInfo,
    pub is_virtual: bool,
    pub devices: Vec<DeviceId>,
    state: xkb::State,
}

impl fmt::Debug for KeyboardGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyboardGroup")
            .field("id", &self.id)
            .field("repeat", &self.repeat)
            .field("is_virtual", &self.is_virtual)
            .field("devices", &self.devices)
            .field("modifiers", &self.modifiers())
            .finish()
    }
}

impl KeyboardGroup {
    pub fn new(id: GroupId, keymap: Keymap, repeat: RepeatInfo, is_virtual: bool) -> Self {
        let state = xkb::State::new(&keymap.keymap);
        Self { id, keymap, repeat, is_virtual, devices: Vec::new(), state }
    }

    /// Physical keyboards join a physical group with the same keymap and
    /// repeat settings. Virtual keyboards never join an existing group.
    pub fn accepts(&self, keymap: &Keymap, repeat: &RepeatInfo, is_virtual: bool) -> bool {
        !is_virtual && !self.is_virtual && self.keymap == *keymap && self.repeat == *repeat
    }

    pub fn remove(&mut self, device: DeviceId) -> bool {
        let before = self.devices.len();
        self.devices.retain(|d| *d != device);
        before != self.devices.len()
    }

    /// Feed an evdev key through the group's xkb state.
    ///
    /// Returns the symbols the key produces and whether the modifier state
    /// changed.
    pub fn process_key(&mut self, keycode: u32, state: KeyState) -> (Vec<xkb::Keysym>, bool) {
        let keycode = xkb::Keycode::from(keycode + EVDEV_OFFSET);
        let direction = match state {
            KeyState::Pressed => xkb::KeyDirection::Down,
            KeyState::Released => xkb::KeyDirection::Up,
        };
        let before = self.modifiers();
        self.state.update_key(keycode, direction);
        let syms = self.state.key_get_syms(keycode).to_vec();
        (syms, self.modifiers() != before)
    }

    /// Overwrite the modifier state, as a virtual keyboard does.
    pub fn set_modifiers(&mut self, modifiers: KeyboardModifiers) {
        self.state.update_mask(modifiers.depressed, modifiers.latched, modifiers.locked, 0, 0, modifiers.group);
    }

    pub fn modifiers(&self) -> KeyboardModifiers {
        KeyboardModifiers {
            depressed: self.state.serialize_mods(xkb::STATE_MODS_DEPRESSED),
            latched: self.state.serialize_mods(xkb::STATE_MODS_LATCHED),
            locked: self.state.serialize_mods(xkb::STATE_MODS_LOCKED),
            group: self.state.serialize_layout(xkb::STATE_LAYOUT_EFFECTIVE),
        }
    }

    pub fn alt_active(&self) -> bool {
        self.state.mod_name_is_active(xkb::MOD_NAME_ALT, xkb::STATE_MODS_EFFECTIVE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Alt+Escape.
    Terminate,
    /// Alt+XF86Switch_VT_n.
    SwitchVt(u32),
}

/// Match a key press against the compositor bindings.
pub fn match_binding(syms: &[xkb::Keysym], alt: bool) -> Option<Binding> {
    if !alt {
        return None;
    }
    syms.iter().map(|&sym| u32::from(sym)).find_map(|sym| match sym {
        xkb::keysyms::KEY_Escape => Some(Binding::Terminate),
        xkb::keysyms::KEY_XF86Switch_VT_1..=xkb::keysyms::KEY_XF86Switch_VT_12 => {
            Some(Binding::SwitchVt(sym - xkb::keysyms::KEY_XF86Switch_VT_1 + 1))
        }
        _ => None,
    })
}

/// Self-contained keymaps for tests, so they do not depend on the
/// xkeyboard-config data installed on the machine.
#[cfg(test)]
pub(crate) mod test_keymaps {
    use super::Keymap;

    /// Evdev keycodes bound by [`BASIC`].
    pub const KEY_ESC: u32 = 1;
    pub const KEY_A: u32 = 30;
    pub const KEY_LEFTALT: u32 = 56;
    pub const KEY_F3: u32 = 61;

    const BASIC: &str = r#"xkb_keymap {
    xkb_keycodes "basic" {
        minimum = 8;
        maximum = 255;
        <ESC> = 9;
        <AC01> = 38;
        <LALT> = 64;
        <FK01> = 67;
        <FK03> = 69;
    };
    xkb_types "basic" {
        type "ONE_LEVEL" {
            modifiers = none;
            level_name[Level1] = "Any";
        };
    };
    xkb_compatibility "basic" {
        interpret Alt_L {
            action = SetMods(modifiers = modMapMods);
        };
    };
    xkb_symbols "basic" {
        key <ESC> { [ Escape ] };
        key <AC01> { [ a ] };
        key <LALT> { [ Alt_L ] };
        key <FK01> { [ XF86Switch_VT_1 ] };
        key <FK03> { [ XF86Switch_VT_3 ] };
        modifier_map Mod1 { <LALT> };
    };
};
"#;

    pub fn basic() -> Keymap {
        Keymap::from_string(BASIC).expect("basic keymap compiles")
    }

    /// Same keys with `a` swapped for `b`, so it never matches [`basic`].
    pub fn other() -> Keymap {
        Keymap::from_string(&BASIC.replace("[ a ]", "[ b ]")).expect("other keymap compiles")
    }
}
