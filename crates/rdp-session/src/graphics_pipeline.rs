use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use ironrdp_dvc::encode_dvc_messages;
use ironrdp_egfx::pdu::Avc420Region;
use ironrdp_server::{EgfxServerMessage, GfxServerHandle, ServerEvent};
use ironrdp_svc::ChannelFlags;
use rdp_encode::{Codec, EncodedFrame};
use tokio::sync::mpsc;
use tracing::warn;

/// Sentinel `FrameAcknowledge` queue-depth value meaning the client has asked the server
/// to stop counting outstanding frames entirely (it will keep acknowledging, but the
/// depth it reports is meaningless while suspended).
pub const SUSPEND_FRAME_ACK_QUEUE_DEPTH: u32 = u32::MAX;

const DEFAULT_MAX_OUTSTANDING_FRAMES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Created,
    ChannelOpened,
    CapsConfirmed,
    SurfaceReady,
}

struct Inner {
    state: PipelineState,
    outstanding_frames: u32,
    max_outstanding_frames: u32,
    frame_acks_suspended: bool,
    last_frame_was_h264: bool,
    surface_id: Option<u16>,
}

/// Owns the Rdpgfx surface lifecycle and the admission-control contract gating how many
/// encoded frames may be outstanding (sent but not yet acknowledged) at once.
///
/// Wraps an [`ironrdp_server::GfxServerHandle`] (`Arc<Mutex<GraphicsPipelineServer>>`),
/// the wire-level DVC bridge from `ironrdp-server`'s `egfx` module, and adds the
/// condvar-based blocking contract that crate is transport-agnostic about. `sender` is
/// the same `ServerEvent` channel `ironrdp-server` hands every other outbound path, so a
/// submitted frame reaches the wire the same way a cursor or clipboard update would.
pub struct GraphicsPipeline {
    handle: GfxServerHandle,
    sender: mpsc::UnboundedSender<ServerEvent>,
    inner: Mutex<Inner>,
    capacity: Condvar,
}

impl GraphicsPipeline {
    #[must_use]
    pub fn new(handle: GfxServerHandle, sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            handle,
            sender,
            inner: Mutex::new(Inner {
                state: PipelineState::Created,
                outstanding_frames: 0,
                max_outstanding_frames: DEFAULT_MAX_OUTSTANDING_FRAMES,
                frame_acks_suspended: false,
                last_frame_was_h264: false,
                surface_id: None,
            }),
            capacity: Condvar::new(),
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.lock().state == PipelineState::SurfaceReady
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Idempotent. Opens the channel if not opened; if caps aren't confirmed yet
    /// (a peer-driven event), returns `false` without error. Otherwise runs the
    /// surface-reset sequence and transitions to `SurfaceReady`.
    pub fn maybe_init(&self, width: u16, height: u16) -> bool {
        let mut state = self.lock();

        if state.state == PipelineState::Created {
            state.state = PipelineState::ChannelOpened;
        }

        if state.state == PipelineState::ChannelOpened {
            return false;
        }

        if state.state != PipelineState::CapsConfirmed {
            return state.state == PipelineState::SurfaceReady;
        }

        let mut pipeline = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        let Some(surface_id) = pipeline.create_surface(width, height) else {
            warn!("failed to create egfx surface, staying in CapsConfirmed");
            return false;
        };
        if !pipeline.map_surface_to_output(surface_id, 0, 0) {
            warn!("failed to map egfx surface to output, staying in CapsConfirmed");
            return false;
        }
        pipeline.set_max_frames_in_flight(state.max_outstanding_frames);
        drop(pipeline);

        state.surface_id = Some(surface_id);
        state.state = PipelineState::SurfaceReady;
        true
    }

    /// `true` iff the surface is ready and either acks are suspended, there's room
    /// under `max_outstanding_frames`, or the last frame was H264 (self-acknowledging).
    #[must_use]
    pub fn can_submit(&self) -> bool {
        let state = self.lock();
        state.state == PipelineState::SurfaceReady
            && (state.frame_acks_suspended
                || state.outstanding_frames < state.max_outstanding_frames
                || state.last_frame_was_h264)
    }

    /// Blocks until capacity is available, the surface stops being ready, or
    /// `timeout_us` elapses. `timeout_us < 0` blocks indefinitely. Returns immediately
    /// if the last frame submitted was H264.
    pub fn wait_for_capacity(&self, timeout_us: i64) -> bool {
        let mut state = self.lock();
        if state.last_frame_was_h264 {
            return true;
        }

        let ready_with_capacity = |s: &Inner| {
            s.state == PipelineState::SurfaceReady
                && (s.frame_acks_suspended || s.outstanding_frames < s.max_outstanding_frames)
        };

        if timeout_us < 0 {
            while state.state == PipelineState::SurfaceReady && !ready_with_capacity(&state) {
                state = self.capacity.wait(state).unwrap_or_else(|e| e.into_inner());
            }
        } else if timeout_us > 0 {
            let deadline = Instant::now() + Duration::from_micros(timeout_us.unsigned_abs());
            while state.state == PipelineState::SurfaceReady && !ready_with_capacity(&state) {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                let (guard, result) = self
                    .capacity
                    .wait_timeout(state, deadline - now)
                    .unwrap_or_else(|e| e.into_inner());
                state = guard;
                if result.timed_out() {
                    break;
                }
            }
        }

        ready_with_capacity(&state)
    }

    /// Called by the renderer when it submits (`add = true`) or releases (`add =
    /// false`) a reserved admission slot.
    pub fn on_frame_change(&self, add: bool) {
        let mut state = self.lock();
        if add {
            if !state.frame_acks_suspended {
                state.outstanding_frames += 1;
            }
        } else {
            state.outstanding_frames = state.outstanding_frames.saturating_sub(1);
            self.capacity.notify_all();
        }
    }

    pub fn set_last_frame_h264(&self, was_h264: bool) {
        self.lock().last_frame_was_h264 = was_h264;
    }

    /// Hands one encoded frame to the wire: builds the codec-appropriate EGFX PDUs on
    /// the surface, drains them, wraps them as dynamic-channel `SvcMessage`s, and pushes
    /// them out through the `ServerEvent` channel `ironrdp-server`'s connection loop
    /// drains.
    ///
    /// No-op (with a debug log) if the surface isn't mapped yet or the channel id hasn't
    /// been assigned by DRDYNVC yet; both clear up once activation finishes. Progressive
    /// and RemoteFX have no wire-send path in this EGFX implementation, so those frames
    /// are dropped with a warning rather than silently discarded.
    pub fn send_encoded_frame(&self, frame: &EncodedFrame) {
        let Some(surface_id) = self.lock().surface_id else {
            tracing::debug!("no surface yet, dropping frame");
            return;
        };

        let mut pipeline = self.handle.lock().unwrap_or_else(|e| e.into_inner());

        let (width, height) = pipeline.output_dimensions();
        let regions: Vec<Avc420Region> = if frame.regions.is_empty() {
            vec![Avc420Region::full_frame(width, height, 22)]
        } else {
            frame
                .regions
                .iter()
                .map(|r| {
                    Avc420Region::new(
                        r.x as u16,
                        r.y as u16,
                        (r.x + r.width).saturating_sub(1) as u16,
                        (r.y + r.height).saturating_sub(1) as u16,
                        22,
                        100,
                    )
                })
                .collect()
        };

        let queued = match frame.codec {
            Codec::Avc420 => pipeline.send_avc420_frame(surface_id, &frame.payload, &regions, frame.timestamp),
            Codec::Avc444 | Codec::Avc444v2 => {
                pipeline.send_avc444_frame(surface_id, &frame.payload, &regions, None, None, frame.timestamp)
            }
            Codec::Progressive | Codec::RemoteFx => {
                warn!(codec = ?frame.codec, "no EGFX wire-send path for this codec, dropping frame");
                None
            }
        };

        if queued.is_none() {
            return;
        }

        let Some(channel_id) = pipeline.channel_id() else {
            tracing::debug!("EGFX channel id not yet assigned, dropping drained output");
            return;
        };

        let output = pipeline.drain_output();
        drop(pipeline);

        match encode_dvc_messages(channel_id, output, ChannelFlags::SHOW_PROTOCOL) {
            Ok(messages) => {
                let _ = self.sender.send(ServerEvent::Egfx(EgfxServerMessage::SendMessages { messages }));
            }
            Err(e) => warn!("failed to encode EGFX dvc messages: {e}"),
        }
    }

    /// Confirms the first advertised capability set and marks caps as confirmed.
    pub fn on_caps_advertise(&self) {
        let mut state = self.lock();
        if state.state == PipelineState::ChannelOpened {
            state.state = PipelineState::CapsConfirmed;
        }
    }

    /// `queue_depth == SUSPEND_FRAME_ACK_QUEUE_DEPTH` suspends ack accounting and wakes
    /// waiters; otherwise clears suspension and advances `outstanding_frames`.
    pub fn on_frame_acknowledge(&self, queue_depth: u32) {
        let mut state = self.lock();
        if queue_depth == SUSPEND_FRAME_ACK_QUEUE_DEPTH {
            state.frame_acks_suspended = true;
            state.outstanding_frames = 0;
        } else {
            state.frame_acks_suspended = false;
            if state.last_frame_was_h264 {
                state.outstanding_frames = 0;
            } else {
                state.outstanding_frames = state.outstanding_frames.saturating_sub(1);
            }
        }
        self.capacity.notify_all();
    }

    pub fn set_max_outstanding_frames(&self, max: u32) {
        self.lock().max_outstanding_frames = max.max(1);
    }

    #[must_use]
    pub fn handle(&self) -> &GfxServerHandle {
        &self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironrdp_egfx::server::GraphicsPipelineServer;
    use std::sync::Arc;

    struct NoopHandler;
    impl ironrdp_egfx::server::GraphicsPipelineHandler for NoopHandler {
        fn capabilities_advertise(&mut self, _pdu: &ironrdp_egfx::pdu::CapabilitiesAdvertisePdu) {}
        fn on_ready(&mut self, _negotiated: &ironrdp_egfx::pdu::CapabilitySet) {}
    }

    fn pipeline() -> GraphicsPipeline {
        let handle: GfxServerHandle = Arc::new(std::sync::Mutex::new(GraphicsPipelineServer::new(Box::new(NoopHandler))));
        let (tx, _rx) = mpsc::unbounded_channel();
        GraphicsPipeline::new(handle, tx)
    }

    #[test]
    fn cannot_submit_before_surface_ready() {
        let p = pipeline();
        assert!(!p.can_submit());
    }

    #[test]
    fn maybe_init_stalls_until_caps_confirmed() {
        let p = pipeline();
        assert!(!p.maybe_init(800, 600));
        assert!(!p.is_ready());
    }

    #[test]
    fn maybe_init_reaches_surface_ready_after_caps_confirmed() {
        let p = pipeline();
        let _ = p.maybe_init(800, 600);
        p.on_caps_advertise();
        assert!(p.maybe_init(800, 600));
        assert!(p.is_ready());
    }

    #[test]
    fn h264_frame_is_self_acknowledging() {
        let p = pipeline();
        let _ = p.maybe_init(800, 600);
        p.on_caps_advertise();
        p.maybe_init(800, 600);
        p.set_last_frame_h264(true);
        assert!(p.can_submit());
        assert!(p.wait_for_capacity(0));
    }

    #[test]
    fn admission_respects_max_outstanding() {
        let p = pipeline();
        p.on_caps_advertise();
        p.maybe_init(800, 600);
        p.set_max_outstanding_frames(1);
        p.on_frame_change(true);
        assert!(!p.can_submit());
        p.on_frame_change(false);
        assert!(p.can_submit());
    }

    #[test]
    fn suspend_sentinel_resets_outstanding_and_lifts_backpressure() {
        let p = pipeline();
        p.on_caps_advertise();
        p.maybe_init(800, 600);
        p.set_max_outstanding_frames(1);
        p.on_frame_change(true);
        assert!(!p.can_submit());
        p.on_frame_acknowledge(SUSPEND_FRAME_ACK_QUEUE_DEPTH);
        assert!(p.can_submit());
    }

    /// Drives the same handshake a real client would (DVC start, wire-encoded
    /// `CapabilitiesAdvertise`) so `GraphicsPipelineServer` itself reaches `Ready` and
    /// `send_avc420_frame` isn't rejected by its own readiness/support checks, then
    /// confirms a submitted frame comes out the `ServerEvent` channel.
    #[test]
    fn send_encoded_frame_reaches_the_server_event_channel() {
        use ironrdp_dvc::DvcProcessor;
        use ironrdp_egfx::pdu::{CapabilitiesAdvertisePdu, CapabilitySet, GfxPdu};

        let handle: GfxServerHandle = Arc::new(std::sync::Mutex::new(GraphicsPipelineServer::new(Box::new(NoopHandler))));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let p = GraphicsPipeline::new(Arc::clone(&handle), tx);

        {
            let mut server = handle.lock().unwrap_or_else(|e| e.into_inner());
            server.start(7).unwrap();
            let advertise = GfxPdu::CapabilitiesAdvertise(CapabilitiesAdvertisePdu(vec![CapabilitySet::V10_1]));
            let payload = ironrdp_core::encode_vec(&advertise).unwrap();
            server.process(7, &payload).unwrap();
        }

        let _ = p.maybe_init(800, 600);
        p.on_caps_advertise();
        assert!(p.maybe_init(800, 600));
        assert!(p.is_ready());

        let frame = EncodedFrame {
            codec: Codec::Avc420,
            is_keyframe: true,
            payload: vec![0u8; 4],
            regions: Vec::new(),
            timestamp: 0,
        };
        p.send_encoded_frame(&frame);

        match rx.try_recv() {
            Ok(ServerEvent::Egfx(EgfxServerMessage::SendMessages { messages })) => {
                assert!(!messages.is_empty());
            }
            other => panic!("expected a queued SendMessages event, got {other:?}"),
        }
    }

    #[test]
    fn send_encoded_frame_without_a_surface_is_a_no_op() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle: GfxServerHandle = Arc::new(std::sync::Mutex::new(GraphicsPipelineServer::new(Box::new(NoopHandler))));
        let p = GraphicsPipeline::new(handle, tx);

        let frame = EncodedFrame {
            codec: Codec::Avc420,
            is_keyframe: true,
            payload: vec![0u8; 4],
            regions: Vec::new(),
            timestamp: 0,
        };
        p.send_encoded_frame(&frame);
        assert!(rx.try_recv().is_err());
    }
}
