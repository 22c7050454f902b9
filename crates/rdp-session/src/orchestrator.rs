use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rdp_capture::{FrameQueue, X11Capture};
use rdp_encode::{ClientCodecSupport, CodecMode, EncodingEngine, EncodingOptions};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Result, SessionError};
use crate::graphics_pipeline::GraphicsPipeline;

/// Advances a frame sequence counter, skipping zero so it stays usable as a sentinel
/// after wraparound.
fn next_frame_sequence(seq: u32) -> u32 {
    let next = seq.wrapping_add(1);
    if next == 0 {
        1
    } else {
        next
    }
}

/// RDP redirection parameters sent to hand a connected client off to another server.
#[derive(Debug, Clone)]
pub struct RedirectionTarget {
    pub routing_token: String,
    pub username: String,
    pub password: String,
    pub tls_certificate_pem: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Idle,
    Activated,
    ActivatedPassive,
}

struct Tasks {
    event: Option<JoinHandle<()>>,
    vcm: Option<JoinHandle<()>>,
    render: Option<JoinHandle<()>>,
}

/// Binds one peer connection to the capture/encode/graphics-pipeline runtime and drives
/// it through activation, the render loop, and a clean, idempotent shutdown.
///
/// The three cooperating OS threads of the original capture pipeline (event, VCM,
/// renderer) become three cooperating tokio tasks here, coordinated the same way: a
/// shared `connection_alive`/`render_running` pair of atomics plus a stop notification,
/// since a one-shot tokio channel doesn't naturally support the "signal N waiters"
/// semantics a condition variable gives the original for free.
pub struct SessionOrchestrator {
    queue: Arc<FrameQueue>,
    capture: Mutex<X11Capture>,
    encoder: Arc<Mutex<EncodingEngine>>,
    pipeline: Option<Arc<GraphicsPipeline>>,
    connection_alive: Arc<AtomicBool>,
    render_running: Arc<AtomicBool>,
    stop: Arc<Notify>,
    tasks: Mutex<Tasks>,
    closed_once: Arc<AtomicBool>,
    frame_sequence: Arc<Mutex<u32>>,
    state: Mutex<ActivationState>,
    last_error: Mutex<Option<SessionError>>,
}

impl SessionOrchestrator {
    #[must_use]
    pub fn new(encoder: EncodingEngine, pipeline: Option<Arc<GraphicsPipeline>>) -> Self {
        Self {
            queue: Arc::new(FrameQueue::new()),
            capture: Mutex::new(X11Capture::new()),
            encoder: Arc::new(Mutex::new(encoder)),
            pipeline,
            connection_alive: Arc::new(AtomicBool::new(true)),
            render_running: Arc::new(AtomicBool::new(false)),
            stop: Arc::new(Notify::new()),
            tasks: Mutex::new(Tasks {
                event: None,
                vcm: None,
                render: None,
            }),
            closed_once: Arc::new(AtomicBool::new(false)),
            frame_sequence: Arc::new(Mutex::new(0)),
            state: Mutex::new(ActivationState::Idle),
            last_error: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> ActivationState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[must_use]
    pub fn frame_queue(&self) -> &Arc<FrameQueue> {
        &self.queue
    }

    /// Sequence number of the last frame handed to the render pipeline, skipping zero
    /// on wraparound.
    #[must_use]
    pub fn frame_sequence(&self) -> u32 {
        *self.frame_sequence.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Starts X11 capture, prepares the encoder, and requests a keyframe.
    ///
    /// Under passive mode (a handoff recipient awaiting redirection from the system
    /// dispatcher), short-circuits to `ActivatedPassive` without starting any threads —
    /// the Graphics Pipeline is never touched here; it's initialized by the VCM task
    /// once drdynvc reaches READY.
    pub fn activate(
        &self,
        display_name: Option<&str>,
        width: u32,
        height: u32,
        target_fps: u32,
        options: EncodingOptions,
        passive: bool,
    ) -> Result<()> {
        if passive {
            *self.state.lock().unwrap_or_else(|e| e.into_inner()) = ActivationState::ActivatedPassive;
            return Ok(());
        }

        self.encoder
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .prepare(options)
            .map_err(|e| SessionError::Failed(e.to_string()))?;

        self.capture
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .start(display_name, width, height, target_fps, Arc::clone(&self.queue))
            .map_err(|e| SessionError::Failed(e.to_string()))?;

        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = ActivationState::Activated;
        self.render_running.store(true, Ordering::SeqCst);
        self.spawn_event_task();
        Ok(())
    }

    fn spawn_event_task(&self) {
        let connection_alive = Arc::clone(&self.connection_alive);
        let stop = Arc::clone(&self.stop);
        let handle = tokio::spawn(async move {
            while connection_alive.load(Ordering::SeqCst) {
                stop.notified().await;
                break;
            }
        });
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).event = Some(handle);
    }

    /// Spawns the VCM task: promotes the graphics pipeline to `SurfaceReady` once
    /// `on_drdynvc_ready` is observed. The real drdynvc/peer event pump lives in the
    /// underlying RDP library's connection loop; this task owns only the pipeline-
    /// initialization ordering constraint (initializing before drdynvc is READY
    /// deadlocks the client).
    pub fn spawn_vcm_task(&self, width: u16, height: u16, drdynvc_ready: Arc<Notify>) {
        let Some(pipeline) = self.pipeline.clone() else {
            return;
        };
        let connection_alive = Arc::clone(&self.connection_alive);
        let stop = Arc::clone(&self.stop);

        let handle = tokio::spawn(async move {
            loop {
                if !connection_alive.load(Ordering::SeqCst) {
                    return;
                }
                tokio::select! {
                    () = stop.notified() => return,
                    () = drdynvc_ready.notified() => {
                        if !pipeline.is_ready() {
                            pipeline.maybe_init(width, height);
                        }
                    }
                }
            }
        });
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).vcm = Some(handle);
    }

    /// Spawns the render task: the producer/consumer bridge between the frame queue and
    /// the graphics pipeline's admission control.
    pub fn spawn_render_task(&self) {
        let connection_alive = Arc::clone(&self.connection_alive);
        let render_running = Arc::clone(&self.render_running);
        let stop = Arc::clone(&self.stop);
        let queue = Arc::clone(&self.queue);
        let encoder = Arc::clone(&self.encoder);
        let pipeline = self.pipeline.clone();
        let frame_sequence = Arc::clone(&self.frame_sequence);

        let handle = tokio::spawn(async move {
            let mut fps_window_start = Instant::now();
            let mut fps_count: u32 = 0;
            const FPS_WINDOW: Duration = Duration::from_secs(5);

            loop {
                if !connection_alive.load(Ordering::SeqCst) || !render_running.load(Ordering::SeqCst) {
                    return;
                }

                if let Some(pipeline) = pipeline.as_ref() {
                    while !pipeline.is_ready() {
                        if !render_running.load(Ordering::SeqCst) {
                            return;
                        }
                        tokio::select! {
                            () = stop.notified() => return,
                            () = tokio::time::sleep(Duration::from_millis(10)) => {}
                        }
                    }
                    if !pipeline.wait_for_capacity(-1) {
                        return;
                    }
                }

                let queue_for_wait = Arc::clone(&queue);
                let frame = tokio::task::spawn_blocking(move || queue_for_wait.wait(16_000))
                    .await
                    .ok()
                    .flatten();

                let Some(frame) = frame else {
                    continue;
                };

                if let Some(pipeline) = pipeline.as_ref() {
                    pipeline.on_frame_change(true);
                }

                let encoder = Arc::clone(&encoder);
                let encoded = tokio::task::spawn_blocking(move || {
                    encoder
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .encode(&frame, CodecMode::Auto, ClientCodecSupport::default())
                })
                .await
                .ok();

                match encoded {
                    Some(Ok(encoded)) => {
                        if let Some(pipeline) = pipeline.as_ref() {
                            pipeline.set_last_frame_h264(
                                matches!(encoded.codec.class(), rdp_encode::CodecClass::Avc),
                            );
                            pipeline.send_encoded_frame(&encoded);
                        }
                        fps_count += 1;
                        let mut seq = frame_sequence.lock().unwrap_or_else(|e| e.into_inner());
                        *seq = next_frame_sequence(*seq);
                    }
                    Some(Err(rdp_encode::EncodeError::Pending)) => {
                        if let Some(pipeline) = pipeline.as_ref() {
                            pipeline.on_frame_change(false);
                        }
                    }
                    Some(Err(e)) => {
                        warn!("frame encode failed: {e}");
                        if let Some(pipeline) = pipeline.as_ref() {
                            pipeline.on_frame_change(false);
                        }
                    }
                    None => {
                        if let Some(pipeline) = pipeline.as_ref() {
                            pipeline.on_frame_change(false);
                        }
                    }
                }

                if fps_window_start.elapsed() >= FPS_WINDOW {
                    debug!(fps = fps_count as f64 / FPS_WINDOW.as_secs_f64(), "capture fps");
                    fps_count = 0;
                    fps_window_start = Instant::now();
                }
            }
        });

        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).render = Some(handle);
    }

    /// Clears the running flags, wakes every task, joins them, tears down capture and
    /// the pipeline, and invokes `on_closed` exactly once.
    pub async fn shutdown(&self, on_closed: impl FnOnce()) {
        self.render_running.store(false, Ordering::SeqCst);
        self.connection_alive.store(false, Ordering::SeqCst);
        self.stop.notify_waiters();

        self.capture.lock().unwrap_or_else(|e| e.into_inner()).stop();
        self.queue.stop();

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        for handle in [tasks.render.take(), tasks.vcm.take(), tasks.event.take()].into_iter().flatten() {
            let _ = handle.await;
        }
        drop(tasks);

        if !self.closed_once.swap(true, Ordering::SeqCst) {
            on_closed();
        }
    }

    /// Sends an RDP redirection PDU (by delegating to the caller-supplied `send`
    /// closure, since the PDU encoding itself belongs to the underlying RDP library),
    /// then flags the session with `ServerRedirection` and tears it down.
    pub async fn redirect(&self, target: RedirectionTarget, send: impl FnOnce(&RedirectionTarget) -> Result<()>) -> Result<()> {
        send(&target)?;
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(SessionError::ServerRedirection);
        self.shutdown(|| {}).await;
        Err(SessionError::ServerRedirection)
    }

    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(ToString::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubAvc;
    impl rdp_encode::AvcEncoder for StubAvc {
        fn encode(&mut self, frame: &rdp_capture::Frame, _codec: rdp_encode::Codec) -> rdp_encode::Result<Vec<u8>> {
            Ok(vec![0u8; frame.data.len()])
        }
    }
    struct StubProgressive;
    impl rdp_encode::ProgressiveEncoder for StubProgressive {
        fn encode(&mut self, _frame: &rdp_capture::Frame, _regions: &[rdp_encode::DirtyRect], _keyframe: bool) -> rdp_encode::Result<Vec<u8>> {
            Ok(vec![0u8])
        }
    }
    struct StubRemoteFx;
    impl rdp_encode::RemoteFxEncoder for StubRemoteFx {
        fn encode(&mut self, _frame: &rdp_capture::Frame, _regions: &[rdp_encode::DirtyRect], _keyframe: bool) -> rdp_encode::Result<Vec<u8>> {
            Ok(vec![0u8])
        }
    }

    fn orchestrator() -> SessionOrchestrator {
        let encoder = EncodingEngine::new(Box::new(StubAvc), Box::new(StubProgressive), Box::new(StubRemoteFx));
        SessionOrchestrator::new(encoder, None)
    }

    #[tokio::test]
    async fn passive_activation_short_circuits_without_threads() {
        let orch = orchestrator();
        orch.activate(None, 0, 0, 60, EncodingOptions::default(), true).unwrap();
        assert_eq!(orch.state(), ActivationState::ActivatedPassive);
    }

    #[tokio::test]
    async fn shutdown_invokes_closed_callback_exactly_once() {
        let orch = orchestrator();
        let count = Arc::new(AtomicBool::new(false));
        let count2 = Arc::clone(&count);
        orch.shutdown(move || count2.store(true, Ordering::SeqCst)).await;
        assert!(count.load(Ordering::SeqCst));

        let count3 = Arc::new(AtomicBool::new(false));
        let count4 = Arc::clone(&count3);
        orch.shutdown(move || count4.store(true, Ordering::SeqCst)).await;
        assert!(!count3.load(Ordering::SeqCst), "on_closed must not run twice");
    }

    #[test]
    fn frame_sequence_skips_zero_on_wraparound() {
        assert_eq!(next_frame_sequence(u32::MAX), 1);
        assert_eq!(next_frame_sequence(0), 1);
        assert_eq!(next_frame_sequence(5), 6);
    }

    #[tokio::test]
    async fn frame_sequence_starts_at_zero_before_any_frame_is_rendered() {
        let orch = orchestrator();
        assert_eq!(orch.frame_sequence(), 0);
    }
}
