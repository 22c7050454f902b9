use x11rb::protocol::xproto::{ConnectionExt as _, Setup};
use x11rb::rust_connection::RustConnection;

use crate::error::{InputError, Result};

// Standard X11 keysym values (X11/keysymdef.h) for the modifier family this server
// needs to resolve by hand, since the user's X keymap is authoritative over whatever
// table a generic scancode mapping would produce.
pub const XK_SHIFT_L: u32 = 0xffe1;
pub const XK_SHIFT_R: u32 = 0xffe2;
pub const XK_CONTROL_L: u32 = 0xffe3;
pub const XK_CONTROL_R: u32 = 0xffe4;
pub const XK_ALT_L: u32 = 0xffe9;
pub const XK_ALT_R: u32 = 0xffea;
pub const XK_SUPER_L: u32 = 0xffeb;
pub const XK_SUPER_R: u32 = 0xffec;

/// RDP scancode for each modifier key this server resolves via KeySym lookup instead of
/// the generic scancode table, since the generic table can't distinguish left/right
/// modifiers the way the user's X keymap does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierScancode {
    LeftAlt,
    LeftControl,
    LeftShift,
    LeftWin,
}

impl ModifierScancode {
    #[must_use]
    pub fn from_scancode(code: u8) -> Option<Self> {
        match code {
            0x38 => Some(Self::LeftAlt),
            0x1d => Some(Self::LeftControl),
            0x2a => Some(Self::LeftShift),
            0x5b => Some(Self::LeftWin),
            _ => None,
        }
    }

    #[must_use]
    pub fn keysym(self, extended: bool) -> u32 {
        match (self, extended) {
            (Self::LeftAlt, false) => XK_ALT_L,
            (Self::LeftAlt, true) => XK_ALT_R,
            (Self::LeftControl, false) => XK_CONTROL_L,
            (Self::LeftControl, true) => XK_CONTROL_R,
            (Self::LeftShift, false) => XK_SHIFT_L,
            (Self::LeftShift, true) => XK_SHIFT_R,
            (Self::LeftWin, false) => XK_SUPER_L,
            (Self::LeftWin, true) => XK_SUPER_R,
        }
    }
}

/// A keycode -> keysym table queried once at startup via `GetKeyboardMapping`, used both
/// to resolve modifier KeySyms to KeyCodes and for Unicode-to-KeyCode translation.
pub struct Keymap {
    min_keycode: u8,
    keysyms_per_keycode: u8,
    syms: Vec<u32>,
}

impl Keymap {
    pub fn query(conn: &RustConnection, setup: &Setup) -> Result<Self> {
        let min_keycode = setup.min_keycode;
        let max_keycode = setup.max_keycode;
        let count = max_keycode.saturating_sub(min_keycode).saturating_add(1);

        let reply = conn
            .get_keyboard_mapping(min_keycode, count)
            .map_err(|e| InputError::Failed(e.to_string()))?
            .reply()
            .map_err(|e| InputError::Failed(e.to_string()))?;

        Ok(Self {
            min_keycode,
            keysyms_per_keycode: reply.keysyms_per_keycode,
            syms: reply.keysyms,
        })
    }

    /// Finds the first keycode whose keysym table contains `keysym`.
    #[must_use]
    pub fn keysym_to_keycode(&self, keysym: u32) -> Option<u8> {
        let per = self.keysyms_per_keycode as usize;
        if per == 0 {
            return None;
        }
        self.syms
            .chunks(per)
            .position(|syms| syms.contains(&keysym))
            .map(|idx| self.min_keycode.wrapping_add(idx as u8))
    }
}

/// Translates a Unicode codepoint to an X11 KeySym, following the convention X11 uses
/// for representing Unicode outside Latin-1: ASCII passes through unchanged, everything
/// else is tagged with the `0x01000000` Unicode KeySym flag.
#[must_use]
pub fn unicode_to_keysym(codepoint: u32) -> u32 {
    if codepoint < 0x80 {
        codepoint
    } else {
        0x0100_0000 | codepoint
    }
}

/// Approximates the RDP library's generic scancode -> X11 keycode table. On a typical
/// Linux/evdev X server, keycodes are the PC/XT scancode offset by 8; a handful of
/// extended keys (arrows, navigation cluster, numpad enter, right Ctrl/Alt) don't follow
/// that rule and are special-cased.
#[must_use]
pub fn generic_scancode_to_keycode(scancode: u8, extended: bool) -> Option<u8> {
    if extended {
        let keycode = match scancode {
            0x1c => 104, // KP_Enter
            0x1d => 105, // Right Ctrl
            0x38 => 108, // Right Alt
            0x47 => 110, // Home
            0x48 => 111, // Up
            0x49 => 112, // Page_Up
            0x4b => 113, // Left
            0x4d => 114, // Right
            0x4f => 115, // End
            0x50 => 116, // Down
            0x51 => 117, // Page_Down
            0x52 => 118, // Insert
            0x53 => 119, // Delete
            _ => return None,
        };
        Some(keycode)
    } else {
        u8::try_from(u16::from(scancode) + 8).ok()
    }
}
