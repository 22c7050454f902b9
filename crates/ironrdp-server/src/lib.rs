#![allow(clippy::arithmetic_side_effects)] // TODO: should we enable this lint back?

#[macro_use]
extern crate tracing;

mod builder;
mod capabilities;
mod display;
mod encoder;
#[cfg(feature = "egfx")]
mod gfx;
mod handler;
#[cfg(feature = "helper")]
mod helper;
mod server;

pub use display::*;
#[cfg(feature = "egfx")]
pub use gfx::*;
pub use handler::*;
#[cfg(feature = "helper")]
pub use helper::*;
pub use server::*;
