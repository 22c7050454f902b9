/// A captured desktop frame.
///
/// Pixels are stored top-down, BGRX-8888 (4 bytes per pixel, the `X` byte unused),
/// matching what `x11rb`'s XShm image returns for a 24/32-bit TrueColor visual.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub capture_timestamp_us: i64,
    pub data: Vec<u8>,
}

impl Frame {
    #[must_use]
    pub fn new(width: u32, height: u32, stride: u32, capture_timestamp_us: i64, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride,
            capture_timestamp_us,
            data,
        }
    }

    #[must_use]
    pub fn bytes_per_pixel() -> u32 {
        4
    }
}
