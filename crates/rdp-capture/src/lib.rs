//! Screen capture for the remote desktop server: a single-slot frame queue and an
//! XShm/XDamage capture thread that feeds it.

mod error;
mod frame;
mod queue;
mod x11;

pub use error::{CaptureError, Result};
pub use frame::Frame;
pub use queue::FrameQueue;
pub use x11::{display_size, DisplaySize, X11Capture, DEFAULT_TARGET_FPS};
