use rdp_capture::Frame;

use crate::codec::{select_codec, Codec, CodecClass, CodecMode, ClientCodecSupport};
use crate::error::{EncodeError, Result};
use crate::state::{EncodingOptions, EncodingState};
use crate::tile::{DirtyRect, TileHashTable};

/// One fully encoded frame, ready to be wrapped in `start_frame`/surface-command/
/// `end_frame` by the caller (the graphics pipeline).
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub codec: Codec,
    pub is_keyframe: bool,
    pub payload: Vec<u8>,
    /// Dirty rectangles the payload covers, in frame pixel coordinates. Empty for a
    /// keyframe or an AVC-class codec, both of which always carry the full frame.
    pub regions: Vec<DirtyRect>,
    /// `(hour<<22) | (minute<<16) | (second<<10) | milliseconds`, per the wire contract
    /// every codec path shares.
    pub timestamp: u32,
}

/// Compresses one raw region of pixels into an AVC444/AVC444v2/AVC420 bitstream.
///
/// AVC paths never consult the dirty map: the codec manages its own intra refresh, so
/// the engine always hands it the full frame.
pub trait AvcEncoder: Send {
    fn encode(&mut self, frame: &Frame, codec: Codec) -> Result<Vec<u8>>;
}

/// Compresses a frame using the RFX Progressive codec, either a dirty-region update or,
/// when `keyframe` is set, the full-frame rectangle.
pub trait ProgressiveEncoder: Send {
    fn encode(&mut self, frame: &Frame, regions: &[DirtyRect], keyframe: bool) -> Result<Vec<u8>>;
}

/// Compresses a frame using legacy RemoteFX tiles, either a dirty-region update or,
/// when `keyframe` is set, the full-frame rectangle.
pub trait RemoteFxEncoder: Send {
    fn encode(&mut self, frame: &Frame, regions: &[DirtyRect], keyframe: bool) -> Result<Vec<u8>>;
}

/// Per-frame differential diffing, codec selection, and compression.
///
/// Single-threaded by convention: the session's render task owns one `EncodingEngine`
/// and drives it via `spawn_blocking`, since compression is CPU-bound.
pub struct EncodingEngine {
    state: EncodingState,
    tile_hashes: Option<TileHashTable>,
    previous_frame: Option<Vec<u8>>,
    avc: Box<dyn AvcEncoder>,
    progressive: Box<dyn ProgressiveEncoder>,
    remotefx: Box<dyn RemoteFxEncoder>,
}

impl EncodingEngine {
    pub fn new(
        avc: Box<dyn AvcEncoder>,
        progressive: Box<dyn ProgressiveEncoder>,
        remotefx: Box<dyn RemoteFxEncoder>,
    ) -> Self {
        Self {
            state: EncodingState::default(),
            tile_hashes: None,
            previous_frame: None,
            avc,
            progressive,
            remotefx,
        }
    }

    /// Validates geometry, records the encoding options, and sets `force_keyframe`. If
    /// geometry changed since a previous `prepare`, codec contexts and caches are reset
    /// first.
    pub fn prepare(&mut self, options: EncodingOptions) -> Result<()> {
        if options.width == 0 || options.height == 0 {
            return Err(EncodeError::InvalidArgument("geometry must be non-zero".to_owned()));
        }
        if !(0.0..=1.0).contains(&options.large_change_threshold) {
            return Err(EncodeError::InvalidArgument(
                "large_change_threshold must be in [0, 1]".to_owned(),
            ));
        }

        let geometry_changed = self.state.prepare(options);
        if geometry_changed || self.tile_hashes.is_none() {
            self.reset_caches();
        }
        Ok(())
    }

    /// Releases codec contexts and clears the previous-frame cache, tile hashes, and
    /// dirty-region scratch. Returns to an unprepared state.
    pub fn reset(&mut self) {
        self.state.reset();
        self.reset_caches();
    }

    fn reset_caches(&mut self) {
        self.previous_frame = None;
        self.tile_hashes = Some(TileHashTable::new(
            self.state.options.width as usize,
            self.state.options.height as usize,
        ));
    }

    /// Encodes `frame` using the codec chosen by [`select_codec`], updating internal
    /// diff state and the refresh-interval tracker.
    pub fn encode(&mut self, frame: &Frame, mode: CodecMode, support: ClientCodecSupport) -> Result<EncodedFrame> {
        if !self.state.is_prepared() {
            return Err(EncodeError::InvalidArgument("encoder not prepared".to_owned()));
        }

        let diff = self.diff_frame(frame);
        let large_change = diff.large_change;
        let keyframe_encode = self.state.keyframe_encode();

        if diff.changed_tiles == 0 && !keyframe_encode {
            return Err(EncodeError::Pending);
        }

        let codec = select_codec(mode, support, large_change);
        let regions = diff.merge_rects();
        let payload = match codec.class() {
            CodecClass::Avc => self.avc.encode(frame, codec)?,
            CodecClass::NonAvc => self.encode_non_avc(codec, frame, &regions, keyframe_encode)?,
            CodecClass::Unknown => unreachable!("select_codec never returns an Unknown-class codec"),
        };

        self.previous_frame = Some(frame.data.clone());
        self.state.force_keyframe = false;
        self.state.refresh.register(codec.class(), keyframe_encode, self.state.options.progressive_refresh_interval);

        let is_keyframe = keyframe_encode || codec.class() == CodecClass::Avc;
        Ok(EncodedFrame {
            codec,
            is_keyframe,
            payload,
            regions: if is_keyframe { Vec::new() } else { regions },
            timestamp: wire_timestamp(),
        })
    }

    fn encode_non_avc(
        &mut self,
        codec: Codec,
        frame: &Frame,
        regions: &[DirtyRect],
        keyframe_encode: bool,
    ) -> Result<Vec<u8>> {
        if keyframe_encode {
            if let Some(hashes) = self.tile_hashes.as_mut() {
                hashes.clear();
            }
        }

        match codec {
            Codec::Progressive => self.progressive.encode(frame, regions, keyframe_encode),
            Codec::RemoteFx => self.remotefx.encode(frame, regions, keyframe_encode),
            Codec::Avc444v2 | Codec::Avc444 | Codec::Avc420 => {
                unreachable!("encode_non_avc only called for NonAvc-class codecs")
            }
        }
    }

    /// Re-encodes the cached previous frame as a forced keyframe, for when the session
    /// needs a full refresh without a newly captured frame (e.g. a transport change).
    /// Fails if no previous-frame cache exists yet.
    pub fn encode_cached(&mut self, mode: CodecMode, support: ClientCodecSupport) -> Result<EncodedFrame> {
        let Some(cached) = self.previous_frame.clone() else {
            return Err(EncodeError::Failed("no previous frame cached".to_owned()));
        };
        let width = self.state.options.width;
        let height = self.state.options.height;
        let stride = width * Frame::bytes_per_pixel();

        self.state.force_keyframe = true;
        let frame = Frame::new(width, height, stride, 0, cached);
        self.encode(&frame, mode, support)
    }

    fn diff_frame(&mut self, frame: &Frame) -> crate::tile::DiffResult {
        let width = frame.width as usize;
        let height = frame.height as usize;
        let hashes = self
            .tile_hashes
            .get_or_insert_with(|| TileHashTable::new(width, height));
        if !hashes.matches_geometry(width, height) {
            *hashes = TileHashTable::new(width, height);
        }

        hashes.diff_and_update(
            &frame.data,
            frame.stride as usize,
            self.previous_frame.as_deref(),
            self.state.options.large_change_threshold,
        )
    }
}

fn wire_timestamp() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    let total_ms = now.as_millis();
    let ms_of_day = (total_ms % 86_400_000) as u32;
    let hour = ms_of_day / 3_600_000;
    let minute = (ms_of_day / 60_000) % 60;
    let second = (ms_of_day / 1000) % 60;
    let millis = ms_of_day % 1000;

    (hour << 22) | (minute << 16) | (second << 10) | millis
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubAvc;
    impl AvcEncoder for StubAvc {
        fn encode(&mut self, frame: &Frame, _codec: Codec) -> Result<Vec<u8>> {
            Ok(vec![0u8; frame.data.len() / 4])
        }
    }

    struct StubProgressive;
    impl ProgressiveEncoder for StubProgressive {
        fn encode(&mut self, _frame: &Frame, regions: &[DirtyRect], keyframe: bool) -> Result<Vec<u8>> {
            Ok(vec![if keyframe { 1 } else { 0 }; regions.len().max(1)])
        }
    }

    struct StubRemoteFx;
    impl RemoteFxEncoder for StubRemoteFx {
        fn encode(&mut self, _frame: &Frame, regions: &[DirtyRect], keyframe: bool) -> Result<Vec<u8>> {
            Ok(vec![if keyframe { 1 } else { 0 }; regions.len().max(1)])
        }
    }

    fn engine() -> EncodingEngine {
        EncodingEngine::new(Box::new(StubAvc), Box::new(StubProgressive), Box::new(StubRemoteFx))
    }

    fn frame(width: u32, height: u32, value: u8) -> Frame {
        let stride = width * Frame::bytes_per_pixel();
        Frame::new(width, height, stride, 0, vec![value; (stride * height) as usize])
    }

    fn rfx_only() -> ClientCodecSupport {
        ClientCodecSupport {
            remotefx: true,
            progressive: true,
            ..Default::default()
        }
    }

    #[test]
    fn prepare_rejects_zero_geometry() {
        let mut e = engine();
        let err = e.prepare(EncodingOptions {
            width: 0,
            height: 100,
            ..Default::default()
        });
        assert!(err.is_err());
    }

    #[test]
    fn first_encode_is_forced_keyframe() {
        let mut e = engine();
        e.prepare(EncodingOptions {
            width: 128,
            height: 128,
            ..Default::default()
        })
        .unwrap();
        let f = frame(128, 128, 0);
        let encoded = e.encode(&f, CodecMode::Rfx, rfx_only()).unwrap();
        assert!(encoded.is_keyframe);
    }

    #[test]
    fn encode_cached_fails_without_prior_frame() {
        let mut e = engine();
        e.prepare(EncodingOptions {
            width: 64,
            height: 64,
            ..Default::default()
        })
        .unwrap();
        assert!(e.encode_cached(CodecMode::Rfx, rfx_only()).is_err());
    }

    #[test]
    fn encode_cached_succeeds_after_a_real_encode() {
        let mut e = engine();
        e.prepare(EncodingOptions {
            width: 64,
            height: 64,
            ..Default::default()
        })
        .unwrap();
        let f = frame(64, 64, 1);
        e.encode(&f, CodecMode::Rfx, rfx_only()).unwrap();
        let encoded = e.encode_cached(CodecMode::Rfx, rfx_only()).unwrap();
        assert!(encoded.is_keyframe);
    }

    #[test]
    fn unprepared_engine_rejects_encode() {
        let mut e = engine();
        let f = frame(64, 64, 0);
        assert!(e.encode(&f, CodecMode::Rfx, rfx_only()).is_err());
    }

    #[test]
    fn unchanged_frame_yields_pending_outside_refresh_window() {
        let mut e = engine();
        e.prepare(EncodingOptions {
            width: 64,
            height: 64,
            progressive_refresh_interval: 0,
            ..Default::default()
        })
        .unwrap();
        let f = frame(64, 64, 3);
        e.encode(&f, CodecMode::Rfx, rfx_only()).unwrap();

        match e.encode(&f, CodecMode::Rfx, rfx_only()) {
            Err(EncodeError::Pending) => {}
            other => panic!("expected Pending, got {other:?}"),
        }
    }
}
