use std::sync::Mutex;

use ironrdp_server::{KeyboardEvent, MouseEvent, RdpServerInputHandler};
use tracing::debug;
use x11rb::connection::Connection as _;
use x11rb::protocol::xproto::ConnectionExt as _;
use x11rb::protocol::xtest::{self, ConnectionExt as _};
use x11rb::rust_connection::RustConnection;

use crate::error::{InputError, Result};
use crate::keymap::{generic_scancode_to_keycode, unicode_to_keysym, Keymap, ModifierScancode};
use crate::pointer::PointerScale;
use crate::scancode_cache::ScancodeCache;

const XTEST_EXTENSION_NAME: &[u8] = b"XTEST";

#[derive(Debug, Clone, Copy)]
pub struct DesktopSize {
    pub width: u32,
    pub height: u32,
}

struct State {
    cache: ScancodeCache,
    scale: PointerScale,
}

/// Translates RDP keyboard/pointer events into X11 input via XTest.
///
/// Implements [`RdpServerInputHandler`] directly so it can be handed to
/// `RdpServerBuilder::with_input_handler` as-is.
pub struct InputInjector {
    conn: RustConnection,
    root: u32,
    keymap: Keymap,
    desktop_size: DesktopSize,
    state: Mutex<State>,
}

impl InputInjector {
    /// Opens the default X display, verifies the XTEST extension, and captures the
    /// current screen geometry as the desktop size. The stream size initially equals
    /// the desktop size.
    pub fn open(display_name: Option<&str>) -> Result<Self> {
        let (conn, screen_num) =
            RustConnection::connect(display_name).map_err(|e| InputError::Failed(e.to_string()))?;

        conn.extension_information(XTEST_EXTENSION_NAME)
            .map_err(|e| InputError::Failed(e.to_string()))?
            .ok_or_else(|| InputError::NotSupported("XTEST extension not available".to_owned()))?;

        let setup = conn.setup().clone();
        let screen = setup
            .roots
            .get(screen_num)
            .ok_or_else(|| InputError::Failed("no such X screen".to_owned()))?
            .clone();

        let keymap = Keymap::query(&conn, &setup)?;
        let desktop_size = DesktopSize {
            width: u32::from(screen.width_in_pixels),
            height: u32::from(screen.height_in_pixels),
        };

        Ok(Self {
            conn,
            root: screen.root,
            keymap,
            desktop_size,
            state: Mutex::new(State {
                cache: ScancodeCache::new(),
                scale: PointerScale::new(desktop_size.width, desktop_size.height, desktop_size.width, desktop_size.height),
            }),
        })
    }

    #[must_use]
    pub fn desktop_size(&self) -> DesktopSize {
        self.desktop_size
    }

    /// Recomputes the stream->desktop scale factors under lock after a resolution
    /// change so subsequent pointer events map correctly.
    pub fn set_stream_size(&self, width: u32, height: u32) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.scale = PointerScale::new(width, height, self.desktop_size.width, self.desktop_size.height);
    }

    fn resolve_keycode(&self, code: u8, extended: bool) -> u8 {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = state.cache.get(code, extended) {
            return cached;
        }

        let keycode = if let Some(modifier) = ModifierScancode::from_scancode(code) {
            self.keymap
                .keysym_to_keycode(modifier.keysym(extended))
                .unwrap_or(0)
        } else {
            let generic = generic_scancode_to_keycode(code, extended).unwrap_or(0);
            if generic == 0 {
                ModifierScancode::from_scancode(code)
                    .and_then(|m| self.keymap.keysym_to_keycode(m.keysym(extended)))
                    .unwrap_or(0)
            } else {
                generic
            }
        };

        state.cache.set(code, extended, keycode);
        keycode
    }

    fn fake_key(&self, keycode: u8, press: bool) {
        let kind = if press {
            xtest::FAKE_INPUT_KEY_PRESS_EVENT
        } else {
            xtest::FAKE_INPUT_KEY_RELEASE_EVENT
        };
        let _ = self
            .conn
            .xtest_fake_input(kind, keycode, 0, self.root, 0, 0, 0)
            .and_then(|c| c.check());
        let _ = self.conn.flush();
    }

    fn inject_keyboard(&self, code: u8, extended: bool, press: bool) {
        let keycode = self.resolve_keycode(code, extended);
        if keycode == 0 {
            debug!(code, extended, "no X11 keycode for scancode, dropping");
            return;
        }
        self.fake_key(keycode, press);
    }

    fn inject_unicode(&self, codepoint: u32, press: bool) {
        let keysym = unicode_to_keysym(codepoint);
        let Some(keycode) = self.keymap.keysym_to_keycode(keysym) else {
            debug!(codepoint, "unmappable unicode input, dropping");
            return;
        };
        self.fake_key(keycode, press);
    }

    fn inject_button(&self, button: u8, press: bool) {
        let kind = if press {
            xtest::FAKE_INPUT_BUTTON_PRESS_EVENT
        } else {
            xtest::FAKE_INPUT_BUTTON_RELEASE_EVENT
        };
        let _ = self
            .conn
            .xtest_fake_input(kind, button, 0, self.root, 0, 0, 0)
            .and_then(|c| c.check());
        let _ = self.conn.flush();
    }

    fn inject_click(&self, button: u8) {
        self.inject_button(button, true);
        self.inject_button(button, false);
    }

    fn inject_motion(&self, x: u16, y: u16) {
        let (dx, dy) = {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.scale.to_desktop(x, y)
        };
        let _ = self
            .conn
            .xtest_fake_input(
                xtest::FAKE_INPUT_MOTION_NOTIFY_EVENT,
                0,
                0,
                self.root,
                i16::try_from(dx).unwrap_or(i16::MAX),
                i16::try_from(dy).unwrap_or(i16::MAX),
                0,
            )
            .and_then(|c| c.check());
        let _ = self.conn.flush();
    }
}

impl RdpServerInputHandler for InputInjector {
    fn keyboard(&mut self, event: KeyboardEvent) {
        match event {
            KeyboardEvent::Pressed { code, extended } => self.inject_keyboard(code, extended, true),
            KeyboardEvent::Released { code, extended } => self.inject_keyboard(code, extended, false),
            KeyboardEvent::UnicodePressed(codepoint) => self.inject_unicode(u32::from(codepoint), true),
            KeyboardEvent::UnicodeReleased(codepoint) => self.inject_unicode(u32::from(codepoint), false),
            KeyboardEvent::Synchronize(_) => {}
        }
    }

    fn mouse(&mut self, event: MouseEvent) {
        match event {
            MouseEvent::Move { x, y } => self.inject_motion(x, y),
            MouseEvent::RelMove { .. } => {}
            MouseEvent::LeftPressed => self.inject_button(1, true),
            MouseEvent::LeftReleased => self.inject_button(1, false),
            MouseEvent::RightPressed => self.inject_button(3, true),
            MouseEvent::RightReleased => self.inject_button(3, false),
            MouseEvent::MiddlePressed => self.inject_button(2, true),
            MouseEvent::MiddleReleased => self.inject_button(2, false),
            MouseEvent::Button4Pressed => self.inject_button(8, true),
            MouseEvent::Button4Released => self.inject_button(8, false),
            MouseEvent::Button5Pressed => self.inject_button(9, true),
            MouseEvent::Button5Released => self.inject_button(9, false),
            MouseEvent::VerticalScroll { value } => self.inject_click(if value > 0 { 4 } else { 5 }),
            MouseEvent::Scroll { x, y } => {
                if y != 0 {
                    self.inject_click(if y > 0 { 4 } else { 5 });
                }
                if x != 0 {
                    self.inject_click(if x > 0 { 7 } else { 6 });
                }
            }
        }
    }
}
