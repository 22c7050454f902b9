//! RDP input event translation into local X11 input via XTest.

mod error;
mod injector;
mod keymap;
mod pointer;
mod scancode_cache;

pub use error::{InputError, Result};
pub use injector::{DesktopSize, InputInjector};
pub use pointer::PointerScale;
pub use scancode_cache::ScancodeCache;
