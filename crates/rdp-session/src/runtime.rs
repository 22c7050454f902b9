//! Wires a [`crate::SessionOrchestrator`] into `ironrdp-server`'s connection lifecycle.
//!
//! `ironrdp-server` calls into three independent seams per connection: a
//! [`GfxServerFactory`] builds the Rdpgfx DVC bridge, a [`GraphicsPipelineHandler`]
//! receives its callbacks, and an [`RdpServerDisplay`] reports desktop size and (for
//! the proactive-send pattern used here) otherwise stays quiet. None of them see each
//! other directly, so this module shares an orchestrator slot between them: the
//! factory creates the pipeline and stashes it, the display picks it up once the
//! client's negotiated size is known and starts the capture/encode runtime, and the
//! handler tears it down again on channel close.
use std::sync::{Arc, Mutex};

use ironrdp_egfx::pdu::{CapabilitiesAdvertisePdu, CapabilitySet};
use ironrdp_egfx::server::{GraphicsPipelineHandler, GraphicsPipelineServer};
use ironrdp_server::{
    DesktopSize, GfxDvcBridge, GfxServerFactory, GfxServerHandle, RdpServerDisplay, RdpServerDisplayUpdates,
    ServerEvent, ServerEventSender,
};
use rdp_encode::{EncodingEngine, EncodingOptions};
use tokio::sync::mpsc;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::graphics_pipeline::GraphicsPipeline;
use crate::orchestrator::SessionOrchestrator;

type PipelineSlot = Arc<Mutex<Option<Arc<GraphicsPipeline>>>>;
type OrchestratorSlot = Arc<Mutex<Option<Arc<SessionOrchestrator>>>>;
/// Negotiated client geometry, published by [`SessionDisplay::request_initial_size`] and
/// read by [`SessionGfxHandler::on_ready`] so the caps-confirm callback can drive the
/// pipeline all the way to `SurfaceReady` in one step regardless of which of the two
/// arrives first.
type GeometrySlot = Arc<Mutex<Option<(u16, u16)>>>;

/// Per-process configuration the runtime needs to activate a session once a client
/// connects; everything client-specific (negotiated size, codec support) arrives later
/// through the display/handler callbacks.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub x11_display: Option<String>,
    pub target_fps: u32,
    pub max_outstanding_frames: u32,
    pub encoding: EncodingOptions,
}

/// Builds a matched `(GfxServerFactory, RdpServerDisplay)` pair sharing state, so the
/// caller can hand both to `RdpServerBuilder` without touching their internals.
pub fn build(options: RuntimeOptions, encoder_factory: impl Fn() -> EncodingEngine + Send + Sync + 'static) -> (SessionGfxFactory, SessionDisplay) {
    let pipeline_slot: PipelineSlot = Arc::new(Mutex::new(None));
    let orchestrator_slot: OrchestratorSlot = Arc::new(Mutex::new(None));
    let drdynvc_ready = Arc::new(Notify::new());
    let geometry_slot: GeometrySlot = Arc::new(Mutex::new(None));

    let factory = SessionGfxFactory {
        pipeline_slot: Arc::clone(&pipeline_slot),
        orchestrator_slot: Arc::clone(&orchestrator_slot),
        drdynvc_ready: Arc::clone(&drdynvc_ready),
        geometry_slot: Arc::clone(&geometry_slot),
        sender: Mutex::new(None),
    };
    let display = SessionDisplay {
        options,
        encoder_factory: Arc::new(encoder_factory),
        pipeline_slot,
        orchestrator_slot,
        drdynvc_ready,
        geometry_slot,
    };
    (factory, display)
}

/// Creates a fresh [`GraphicsPipelineServer`] per connection and stashes the resulting
/// [`GraphicsPipeline`] where [`SessionDisplay::request_initial_size`] can find it.
///
/// Grounded on the "hybrid" `GfxServerFactory` pattern: `build_server_with_handle`
/// returns a bridge for `DrdynvcServer` plus a shared handle the session runtime uses
/// to submit frames directly, instead of routing them through `build_gfx_handler`'s
/// handler-only path.
pub struct SessionGfxFactory {
    pipeline_slot: PipelineSlot,
    orchestrator_slot: OrchestratorSlot,
    drdynvc_ready: Arc<Notify>,
    geometry_slot: GeometrySlot,
    sender: Mutex<Option<mpsc::UnboundedSender<ServerEvent>>>,
}

impl GfxServerFactory for SessionGfxFactory {
    fn build_gfx_handler(&self) -> Box<dyn GraphicsPipelineHandler> {
        Box::new(SessionGfxHandler {
            pipeline_slot: Arc::clone(&self.pipeline_slot),
            orchestrator_slot: Arc::clone(&self.orchestrator_slot),
            drdynvc_ready: Arc::clone(&self.drdynvc_ready),
            geometry_slot: Arc::clone(&self.geometry_slot),
        })
    }

    fn build_server_with_handle(&self) -> Option<(GfxDvcBridge, GfxServerHandle)> {
        // `RdpServer::new` always calls `set_sender` before `attach_channels` runs this,
        // so the sender is populated by the time a real connection reaches here.
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner()).clone()?;
        let handler = self.build_gfx_handler();
        let server: GfxServerHandle = Arc::new(std::sync::Mutex::new(GraphicsPipelineServer::new(handler)));
        *self.pipeline_slot.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(Arc::new(GraphicsPipeline::new(Arc::clone(&server), sender)));
        let bridge = GfxDvcBridge::new(Arc::clone(&server));
        Some((bridge, server))
    }
}

impl ServerEventSender for SessionGfxFactory {
    fn set_sender(&mut self, sender: mpsc::UnboundedSender<ServerEvent>) {
        *self.sender.lock().unwrap_or_else(|e| e.into_inner()) = Some(sender);
    }
}

/// Receives Rdpgfx callbacks and forwards them to the [`GraphicsPipeline`]'s admission
/// state machine; promotes caps-confirmed to a drdynvc-ready notification the
/// orchestrator's VCM task waits on, and tears the session down on channel close.
struct SessionGfxHandler {
    pipeline_slot: PipelineSlot,
    orchestrator_slot: OrchestratorSlot,
    drdynvc_ready: Arc<Notify>,
    geometry_slot: GeometrySlot,
}

impl GraphicsPipelineHandler for SessionGfxHandler {
    fn capabilities_advertise(&mut self, _pdu: &CapabilitiesAdvertisePdu) {}

    /// Drives the pipeline's whole `Created -> ChannelOpened -> CapsConfirmed ->
    /// SurfaceReady` chain in one go whenever the client's negotiated size is already
    /// known, instead of relying on `maybe_init` getting called a second time later:
    /// this callback fires exactly once per connection, so a transition it doesn't
    /// complete here never gets another chance.
    fn on_ready(&mut self, _negotiated: &CapabilitySet) {
        if let Some(pipeline) = self.pipeline_slot.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            let geometry = *self.geometry_slot.lock().unwrap_or_else(|e| e.into_inner());
            if let Some((width, height)) = geometry {
                let _ = pipeline.maybe_init(width, height);
                pipeline.on_caps_advertise();
                let _ = pipeline.maybe_init(width, height);
            } else {
                pipeline.on_caps_advertise();
            }
        }
        // Buffers a permit if the VCM task isn't waiting yet, so the signal survives
        // regardless of which side reaches its rendezvous point first.
        self.drdynvc_ready.notify_one();
    }

    fn on_frame_ack(&mut self, _frame_id: u32, queue_depth: u32) {
        if let Some(pipeline) = self.pipeline_slot.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            pipeline.on_frame_acknowledge(queue_depth);
        }
    }

    fn on_close(&mut self) {
        let orchestrator = self.orchestrator_slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(orchestrator) = orchestrator {
            tokio::spawn(async move { orchestrator.shutdown(|| {}).await });
        }
    }
}

/// Reports the X11 desktop size and starts the session's capture/encode runtime once
/// the client's initial size is negotiated. Emits no [`DisplayUpdate`][ironrdp_server::DisplayUpdate]s of
/// its own: frames are pushed proactively by the orchestrator's render task through the
/// Rdpgfx handle instead of pulled through this trait's update stream.
pub struct SessionDisplay {
    options: RuntimeOptions,
    encoder_factory: Arc<dyn Fn() -> EncodingEngine + Send + Sync>,
    pipeline_slot: PipelineSlot,
    orchestrator_slot: OrchestratorSlot,
    drdynvc_ready: Arc<Notify>,
    geometry_slot: GeometrySlot,
}

struct PendingUpdates;

#[async_trait::async_trait]
impl RdpServerDisplayUpdates for PendingUpdates {
    async fn next_update(&mut self) -> anyhow::Result<Option<ironrdp_server::DisplayUpdate>> {
        let () = core::future::pending().await;
        unreachable!()
    }
}

#[async_trait::async_trait]
impl RdpServerDisplay for SessionDisplay {
    async fn size(&mut self) -> DesktopSize {
        match rdp_capture::display_size(self.options.x11_display.as_deref()) {
            Ok(size) => DesktopSize {
                width: size.width.min(u32::from(u16::MAX)) as u16,
                height: size.height.min(u32::from(u16::MAX)) as u16,
            },
            Err(e) => {
                warn!("failed to query X11 display size: {e}");
                DesktopSize { width: 0, height: 0 }
            }
        }
    }

    async fn updates(&mut self) -> anyhow::Result<Box<dyn RdpServerDisplayUpdates>> {
        Ok(Box::new(PendingUpdates))
    }

    async fn request_initial_size(&mut self, client_size: DesktopSize) -> DesktopSize {
        let pipeline = self.pipeline_slot.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let Some(pipeline) = pipeline else {
            return client_size;
        };

        *self.geometry_slot.lock().unwrap_or_else(|e| e.into_inner()) = Some((client_size.width, client_size.height));
        pipeline.set_max_outstanding_frames(self.options.max_outstanding_frames);

        let encoder = (self.encoder_factory)();
        let orchestrator = Arc::new(SessionOrchestrator::new(encoder, Some(pipeline)));

        let mut options = self.options.encoding.clone();
        options.width = u32::from(client_size.width);
        options.height = u32::from(client_size.height);

        if let Err(e) = orchestrator.activate(
            self.options.x11_display.as_deref(),
            u32::from(client_size.width),
            u32::from(client_size.height),
            self.options.target_fps,
            options,
            false,
        ) {
            warn!("failed to activate session: {e}");
            return client_size;
        }

        orchestrator.spawn_vcm_task(client_size.width, client_size.height, Arc::clone(&self.drdynvc_ready));
        orchestrator.spawn_render_task();
        debug!(width = client_size.width, height = client_size.height, "session activated");

        *self.orchestrator_slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(orchestrator);
        client_size
    }
}
