use std::time::{Duration, Instant};

use crate::codec::CodecClass;

/// Tunables governing a [`crate::EncodingEngine`], set via `prepare`.
#[derive(Debug, Clone, Copy)]
pub struct EncodingOptions {
    pub width: u32,
    pub height: u32,
    pub enable_diff: bool,
    pub large_change_threshold: f64,
    pub progressive_refresh_interval: u32,
    pub progressive_refresh_timeout_ms: u64,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            enable_diff: true,
            large_change_threshold: 0.4,
            progressive_refresh_interval: 60,
            progressive_refresh_timeout_ms: 1000,
        }
    }
}

/// Tracks the AVC-to-NonAVC transition and decides when the next NonAVC encode must be
/// a full keyframe so a Progressive/RemoteFX-only viewer eventually sees a complete
/// refresh after an AVC burst.
#[derive(Debug)]
pub struct RefreshTracker {
    last_codec: CodecClass,
    avc_to_non_avc_transition: bool,
    non_avc_switch_at: Option<Instant>,
    progressive_rfx_frames: u32,
}

impl Default for RefreshTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_codec: CodecClass::Unknown,
            avc_to_non_avc_transition: false,
            non_avc_switch_at: None,
            progressive_rfx_frames: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub fn refresh_interval_reached(&self, interval: u32, timeout: Duration) -> bool {
        if !self.avc_to_non_avc_transition {
            return false;
        }
        let by_count = self.progressive_rfx_frames + 1 >= interval;
        let by_timeout = self
            .non_avc_switch_at
            .is_some_and(|at| at.elapsed() >= timeout);
        by_count || by_timeout
    }

    /// Registers the outcome of an encode, per the spec's class-transition rules.
    pub fn register(&mut self, class: CodecClass, was_keyframe: bool, refresh_interval: u32) {
        match class {
            CodecClass::Avc => {
                self.last_codec = CodecClass::Avc;
                self.avc_to_non_avc_transition = false;
                self.progressive_rfx_frames = 0;
                self.non_avc_switch_at = None;
            }
            CodecClass::NonAvc => {
                if self.last_codec == CodecClass::Avc {
                    self.avc_to_non_avc_transition = true;
                    self.non_avc_switch_at = Some(Instant::now());
                    self.progressive_rfx_frames = 0;
                }

                if self.avc_to_non_avc_transition {
                    if was_keyframe || refresh_interval == 0 {
                        self.progressive_rfx_frames = 0;
                    } else {
                        self.progressive_rfx_frames += 1;
                    }

                    if was_keyframe {
                        self.avc_to_non_avc_transition = false;
                    }
                }

                self.last_codec = CodecClass::NonAvc;
            }
            CodecClass::Unknown => {
                self.reset();
            }
        }
    }
}

/// Mutable per-session encoding state, built by `prepare` and mutated by every encode.
pub struct EncodingState {
    pub options: EncodingOptions,
    pub force_keyframe: bool,
    pub refresh: RefreshTracker,
    prepared: bool,
}

impl Default for EncodingState {
    fn default() -> Self {
        Self {
            options: EncodingOptions::default(),
            force_keyframe: true,
            refresh: RefreshTracker::new(),
            prepared: false,
        }
    }
}

impl EncodingState {
    #[must_use]
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Returns `true` if geometry changed from whatever the state previously held.
    pub fn prepare(&mut self, options: EncodingOptions) -> bool {
        let geometry_changed =
            self.prepared && (self.options.width != options.width || self.options.height != options.height);
        self.options = options;
        self.force_keyframe = true;
        self.prepared = true;
        geometry_changed
    }

    pub fn reset(&mut self) {
        self.refresh.reset();
        self.force_keyframe = true;
        self.prepared = false;
    }

    #[must_use]
    pub fn keyframe_encode(&self) -> bool {
        self.force_keyframe
            || !self.options.enable_diff
            || self.refresh.refresh_interval_reached(
                self.options.progressive_refresh_interval,
                Duration::from_millis(self.options.progressive_refresh_timeout_ms),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avc_encode_clears_transition() {
        let mut t = RefreshTracker::new();
        t.register(CodecClass::NonAvc, true, 60);
        t.register(CodecClass::Avc, true, 60);
        assert!(!t.refresh_interval_reached(60, Duration::from_millis(1000)));
    }

    #[test]
    fn transition_starts_on_avc_to_non_avc_switch() {
        let mut t = RefreshTracker::new();
        t.register(CodecClass::Avc, true, 60);
        t.register(CodecClass::NonAvc, false, 60);
        // one non-keyframe NonAVC frame isn't enough to hit a 60-frame interval
        assert!(!t.refresh_interval_reached(60, Duration::from_millis(1000)));
    }

    #[test]
    fn transition_clears_once_a_keyframe_lands() {
        let mut t = RefreshTracker::new();
        t.register(CodecClass::Avc, true, 60);
        t.register(CodecClass::NonAvc, true, 60);
        assert!(!t.refresh_interval_reached(60, Duration::from_millis(1000)));
    }

    #[test]
    fn refresh_interval_reached_by_frame_count() {
        let mut t = RefreshTracker::new();
        t.register(CodecClass::Avc, true, 1);
        t.register(CodecClass::NonAvc, false, 1);
        assert!(t.refresh_interval_reached(1, Duration::from_millis(1000)));
    }

    #[test]
    fn unknown_class_resets_everything() {
        let mut t = RefreshTracker::new();
        t.register(CodecClass::Avc, true, 60);
        t.register(CodecClass::Unknown, false, 60);
        assert!(!t.refresh_interval_reached(60, Duration::from_millis(1000)));
    }
}
