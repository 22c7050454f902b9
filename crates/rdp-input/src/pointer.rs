/// Stream (client-advertised) to desktop (actual X11 screen) coordinate rescaling.
///
/// Recomputed under lock whenever either size changes, so pointer events map correctly
/// immediately after a resolution change.
#[derive(Debug, Clone, Copy)]
pub struct PointerScale {
    stream_width: u32,
    stream_height: u32,
    desktop_width: u32,
    desktop_height: u32,
}

impl PointerScale {
    #[must_use]
    pub fn new(stream_width: u32, stream_height: u32, desktop_width: u32, desktop_height: u32) -> Self {
        Self {
            stream_width: stream_width.max(1),
            stream_height: stream_height.max(1),
            desktop_width,
            desktop_height,
        }
    }

    /// Clamps `(x, y)` to `stream_size - 1` and rescales linearly to desktop
    /// coordinates, rounding to nearest.
    #[must_use]
    pub fn to_desktop(self, x: u16, y: u16) -> (u16, u16) {
        let x = u32::from(x).min(self.stream_width - 1);
        let y = u32::from(y).min(self.stream_height - 1);

        let dx = rescale(x, self.stream_width, self.desktop_width);
        let dy = rescale(y, self.stream_height, self.desktop_height);
        (dx, dy)
    }
}

fn rescale(value: u32, from: u32, to: u32) -> u16 {
    if from == 0 {
        return 0;
    }
    let scaled = (u64::from(value) * u64::from(to) + u64::from(from) / 2) / u64::from(from);
    u16::try_from(scaled.min(u64::from(u16::MAX))).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 0)]
    #[case(0, 1080)]
    #[case(1920, 0)]
    fn zero_sized_desktop_clamps_to_origin(#[case] desktop_width: u32, #[case] desktop_height: u32) {
        let scale = PointerScale::new(1920, 1080, desktop_width, desktop_height);
        assert_eq!(scale.to_desktop(960, 540), (0, 0));
    }

    #[test]
    fn identity_scale_is_unchanged() {
        let scale = PointerScale::new(1920, 1080, 1920, 1080);
        assert_eq!(scale.to_desktop(100, 200), (100, 200));
    }

    #[test]
    fn coordinates_clamp_to_stream_size_minus_one() {
        let scale = PointerScale::new(100, 100, 100, 100);
        assert_eq!(scale.to_desktop(150, 150), (99, 99));
    }

    #[test]
    fn downscale_rounds_to_nearest() {
        let scale = PointerScale::new(200, 200, 100, 100);
        assert_eq!(scale.to_desktop(1, 1), (1, 1));
        assert_eq!(scale.to_desktop(3, 3), (2, 2));
    }
}
