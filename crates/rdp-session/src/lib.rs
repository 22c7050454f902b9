//! Session orchestration: binds one peer connection to the capture/encode runtime,
//! owns the Graphics Pipeline's admission-control contract, and drives activation,
//! render, and shutdown.

mod config;
mod error;
mod graphics_pipeline;
mod orchestrator;
mod runtime;

pub use config::{Cli, ConfigCodecMode, RdpServerConfig};
pub use error::{Result, SessionError};
pub use graphics_pipeline::{GraphicsPipeline, SUSPEND_FRAME_ACK_QUEUE_DEPTH};
pub use orchestrator::{ActivationState, RedirectionTarget, SessionOrchestrator};
pub use runtime::{build as build_runtime, RuntimeOptions, SessionDisplay, SessionGfxFactory};
