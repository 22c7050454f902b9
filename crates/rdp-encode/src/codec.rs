/// Codec mode requested by the operator, overriding automatic selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodecMode {
    #[default]
    Auto,
    H264,
    Rfx,
}

/// Concrete codec chosen for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Avc444v2,
    Avc444,
    Avc420,
    Progressive,
    RemoteFx,
}

/// Whether an encoded frame was produced by an AVC family codec (full-frame, no
/// dirty-map participation) or a NonAVC codec (Progressive/RemoteFX, dirty-map driven).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecClass {
    Avc,
    NonAvc,
    Unknown,
}

impl Codec {
    #[must_use]
    pub fn class(self) -> CodecClass {
        match self {
            Codec::Avc444v2 | Codec::Avc444 | Codec::Avc420 => CodecClass::Avc,
            Codec::Progressive | Codec::RemoteFx => CodecClass::NonAvc,
        }
    }
}

/// Codec support advertised by the connected client.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientCodecSupport {
    pub avc444v2: bool,
    pub avc444: bool,
    pub avc420: bool,
    pub remotefx: bool,
    pub progressive: bool,
}

/// Selects the codec for one frame per the configured mode, client support, and the
/// frame's change magnitude.
///
/// Always falls through to at least one client-supported codec: `Progressive` is
/// treated as the universal fallback since every RDP client implementing the Graphics
/// Pipeline must support it.
#[must_use]
pub fn select_codec(mode: CodecMode, support: ClientCodecSupport, large_change: bool) -> Codec {
    let candidates: &[Codec] = match (mode, large_change) {
        (CodecMode::Auto, true) => &[
            Codec::Avc444v2,
            Codec::Avc444,
            Codec::Avc420,
            Codec::Progressive,
            Codec::RemoteFx,
        ],
        (CodecMode::Auto, false) => &[
            Codec::Progressive,
            Codec::RemoteFx,
            Codec::Avc444v2,
            Codec::Avc444,
            Codec::Avc420,
        ],
        (CodecMode::H264, _) => &[
            Codec::Avc444v2,
            Codec::Avc444,
            Codec::Avc420,
            Codec::Progressive,
            Codec::RemoteFx,
        ],
        (CodecMode::Rfx, _) => &[Codec::Progressive, Codec::RemoteFx],
    };

    for &codec in candidates {
        if supports(support, codec) {
            return codec;
        }
    }

    // Every Graphics Pipeline client supports Progressive; if the caller's advertised
    // support is empty (e.g. not yet negotiated) fall back to it rather than panic.
    Codec::Progressive
}

fn supports(support: ClientCodecSupport, codec: Codec) -> bool {
    match codec {
        Codec::Avc444v2 => support.avc444v2,
        Codec::Avc444 => support.avc444,
        Codec::Avc420 => support.avc420,
        Codec::Progressive => support.progressive,
        Codec::RemoteFx => support.remotefx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_support() -> ClientCodecSupport {
        ClientCodecSupport {
            avc444v2: true,
            avc444: true,
            avc420: true,
            remotefx: true,
            progressive: true,
        }
    }

    #[test]
    fn auto_large_change_prefers_avc444v2() {
        let codec = select_codec(CodecMode::Auto, full_support(), true);
        assert_eq!(codec, Codec::Avc444v2);
    }

    #[test]
    fn auto_small_change_prefers_progressive() {
        let codec = select_codec(CodecMode::Auto, full_support(), false);
        assert_eq!(codec, Codec::Progressive);
    }

    #[test]
    fn auto_falls_through_to_supported_codec() {
        let support = ClientCodecSupport {
            remotefx: true,
            ..Default::default()
        };
        let codec = select_codec(CodecMode::Auto, support, true);
        assert_eq!(codec, Codec::RemoteFx);
    }

    #[test]
    fn rfx_mode_never_selects_avc() {
        let codec = select_codec(CodecMode::Rfx, full_support(), true);
        assert_eq!(codec.class(), CodecClass::NonAvc);
    }

    #[test]
    fn h264_mode_prefers_avc_when_supported() {
        let codec = select_codec(CodecMode::H264, full_support(), false);
        assert_eq!(codec.class(), CodecClass::Avc);
    }
}
