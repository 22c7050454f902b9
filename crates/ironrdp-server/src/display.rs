use anyhow::Result;
pub use ironrdp_acceptor::DesktopSize;
pub use ironrdp_graphics::image_processing::PixelFormat;

/// Display Update
///
/// Contains all types of display updates currently supported by the server implementation
/// and the RDP spec
///
#[derive(Debug, Clone)]
pub enum DisplayUpdate {
    Bitmap(BitmapUpdate),
}

#[derive(Debug, Clone, Copy)]
pub enum PixelOrder {
    TopToBottom,
    BottomToTop,
}

/// Bitmap Display Update
///
/// Bitmap updates are encoded using RDP 6.0 compression, fragmented and sent using
/// Fastpath Server Updates
///
#[derive(Debug, Clone)]
pub struct BitmapUpdate {
    pub top: u32,
    pub left: u32,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub order: PixelOrder,
    pub data: Vec<u8>,
}

/// Display Update stream for an RDP server
///
/// Yielded by [`RdpServerDisplay::updates`]. The session loop polls `next_update`
/// repeatedly and forwards whatever comes back to the encoder.
#[async_trait::async_trait]
pub trait RdpServerDisplayUpdates {
    async fn next_update(&mut self) -> Result<Option<DisplayUpdate>>;
}

/// Display handle for an RDP server
///
/// The RDP server calls `size` once during activation and `updates` to obtain
/// the stream of display updates that will be encoded and sent to the client.
///
/// # Example
///
/// ```
/// use anyhow::Result;
/// use ironrdp_server::{DesktopSize, DisplayUpdate, RdpServerDisplay, RdpServerDisplayUpdates};
///
/// pub struct DisplayHandler {
///     width: u16,
///     height: u16,
///     receiver: tokio::sync::mpsc::Receiver<DisplayUpdate>,
/// }
///
/// pub struct UpdateStream(tokio::sync::mpsc::Receiver<DisplayUpdate>);
///
/// #[async_trait::async_trait]
/// impl RdpServerDisplayUpdates for UpdateStream {
///     async fn next_update(&mut self) -> Result<Option<DisplayUpdate>> {
///         Ok(self.0.recv().await)
///     }
/// }
///
/// #[async_trait::async_trait]
/// impl RdpServerDisplay for DisplayHandler {
///     async fn size(&mut self) -> DesktopSize {
///         DesktopSize { width: self.width, height: self.height }
///     }
///
///     async fn updates(&mut self) -> Result<Box<dyn RdpServerDisplayUpdates>> {
///         let (_tx, rx) = tokio::sync::mpsc::channel(1);
///         Ok(Box::new(UpdateStream(rx)))
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait RdpServerDisplay: Send {
    async fn size(&mut self) -> DesktopSize;
    async fn updates(&mut self) -> Result<Box<dyn RdpServerDisplayUpdates>>;

    /// Called once the client has advertised its preferred desktop size during
    /// capability exchange. Implementations may honor, clamp, or ignore it and
    /// must return the size that will actually be used.
    async fn request_initial_size(&mut self, client_size: DesktopSize) -> DesktopSize {
        client_size
    }
}
