use std::io::{Read as _, Write as _};
use std::os::fd::AsRawFd as _;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use x11rb::connection::Connection as _;
use x11rb::cookie::Cookie;
use x11rb::protocol::damage::{self, ConnectionExt as _};
use x11rb::protocol::shm::{self, ConnectionExt as _};
use x11rb::protocol::xproto::Screen;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use crate::error::{CaptureError, Result};
use crate::frame::Frame;
use crate::queue::FrameQueue;

/// Target capture cadence when nothing in the spec's caller overrides it.
pub const DEFAULT_TARGET_FPS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

/// Opens `display_name`, reads the root window's geometry, and closes the connection.
///
/// Stateless static helper: does not require an active [`X11Capture`] session.
pub fn display_size(display_name: Option<&str>) -> Result<DisplaySize> {
    let (conn, screen_num) =
        RustConnection::connect(display_name).map_err(|e| CaptureError::NotSupported(e.to_string()))?;
    let screen = screen(&conn, screen_num)?;
    Ok(DisplaySize {
        width: u32::from(screen.width_in_pixels),
        height: u32::from(screen.height_in_pixels),
    })
}

fn screen(conn: &RustConnection, screen_num: usize) -> Result<Screen> {
    conn.setup()
        .roots
        .get(screen_num)
        .cloned()
        .ok_or_else(|| CaptureError::Failed("no such X screen".to_owned()))
}

fn require_extension(conn: &RustConnection, name: &[u8], what: &str) -> Result<()> {
    conn.extension_information(name)
        .map_err(|e| CaptureError::NotSupported(e.to_string()))?
        .ok_or_else(|| CaptureError::NotSupported(format!("{what} extension not available")))?;
    Ok(())
}

/// XShm + XDamage driven full-screen capture, pushing frames into a [`FrameQueue`].
///
/// Owns a single capture thread for the lifetime of a `start`/`stop` pair. `stop` is
/// idempotent and joins the thread before returning.
pub struct X11Capture {
    running: Arc<AtomicBool>,
    wakeup_writer: Option<UnixStream>,
    thread: Option<JoinHandle<()>>,
}

impl X11Capture {
    #[must_use]
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            wakeup_writer: None,
            thread: None,
        }
    }

    /// Opens the display, validates the XShm/XDamage extensions are present, and spawns
    /// the capture thread. Frames are pushed into `queue` as they're captured.
    pub fn start(
        &mut self,
        display_name: Option<&str>,
        requested_width: u32,
        requested_height: u32,
        target_fps: u32,
        queue: Arc<FrameQueue>,
    ) -> Result<DisplaySize> {
        let (conn, screen_num) =
            RustConnection::connect(display_name).map_err(|e| CaptureError::NotSupported(e.to_string()))?;

        require_extension(&conn, shm::X11_EXTENSION_NAME, "MIT-SHM")?;
        require_extension(&conn, damage::X11_EXTENSION_NAME, "DAMAGE")?;

        let root = screen(&conn, screen_num)?;
        let width = if requested_width == 0 {
            u32::from(root.width_in_pixels)
        } else {
            requested_width
        };
        let height = if requested_height == 0 {
            u32::from(root.height_in_pixels)
        } else {
            requested_height
        };

        let (wakeup_read, wakeup_write) =
            UnixStream::pair().map_err(|e| CaptureError::Failed(format!("wakeup pipe: {e}")))?;
        wakeup_read
            .set_nonblocking(true)
            .map_err(|e| CaptureError::Failed(e.to_string()))?;

        let running = Arc::new(AtomicBool::new(true));
        let target_interval = Duration::from_secs_f64(1.0 / f64::from(target_fps.max(1)));
        let root_window = root.root;

        let thread_running = Arc::clone(&running);
        let handle = std::thread::Builder::new()
            .name("x11-capture".into())
            .spawn(move || {
                if let Err(e) = capture_loop(
                    conn,
                    root_window,
                    width,
                    height,
                    target_interval,
                    wakeup_read,
                    thread_running,
                    queue,
                ) {
                    warn!("capture thread exiting: {e}");
                }
            })
            .map_err(|e| CaptureError::Failed(e.to_string()))?;

        self.running = running;
        self.wakeup_writer = Some(wakeup_write);
        self.thread = Some(handle);

        Ok(DisplaySize { width, height })
    }

    /// Stops the capture thread and joins it. Safe to call more than once.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(mut writer) = self.wakeup_writer.take() {
            let _ = writer.write_all(&[0u8]);
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Default for X11Capture {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for X11Capture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A SysV shared-memory segment attached to the X server, holding one XShm image.
struct ShmSegment {
    shmid: i32,
    addr: *mut u8,
    size: usize,
    seg: shm::Seg,
}

impl ShmSegment {
    fn create(conn: &RustConnection, size: usize) -> Result<Self> {
        let shmid = unsafe { libc::shmget(libc::IPC_PRIVATE, size, libc::IPC_CREAT | 0o600) };
        if shmid < 0 {
            return Err(CaptureError::Failed("shmget failed".to_owned()));
        }
        let addr = unsafe { libc::shmat(shmid, core::ptr::null(), 0) };
        if addr == usize::MAX as *mut core::ffi::c_void {
            unsafe {
                libc::shmctl(shmid, libc::IPC_RMID, core::ptr::null_mut());
            }
            return Err(CaptureError::Failed("shmat failed".to_owned()));
        }

        let seg = conn
            .generate_id()
            .map_err(|e| CaptureError::Failed(e.to_string()))?;
        conn.shm_attach(seg, shmid.cast_unsigned(), false)
            .and_then(Cookie::check)
            .map_err(|e| CaptureError::Failed(format!("shm_attach: {e}")))?;

        Ok(Self {
            shmid,
            addr: addr.cast(),
            size,
            seg,
        })
    }

    fn get_image(&self, conn: &RustConnection, drawable: u32, width: u32, height: u32) -> Result<Vec<u8>> {
        conn.shm_get_image(
            drawable,
            0,
            0,
            width as u16,
            height as u16,
            !0,
            x11rb::protocol::xproto::ImageFormat::Z_PIXMAP.into(),
            self.seg,
            0,
        )
        .and_then(|cookie| cookie.reply())
        .map_err(|e| CaptureError::Failed(format!("shm_get_image: {e}")))?;

        let slice = unsafe { core::slice::from_raw_parts(self.addr, self.size) };
        Ok(slice.to_vec())
    }
}

impl Drop for ShmSegment {
    fn drop(&mut self) {
        unsafe {
            libc::shmdt(self.addr.cast());
            libc::shmctl(self.shmid, libc::IPC_RMID, core::ptr::null_mut());
        }
    }
}

// SAFETY: the raw pointer only ever points at the process's own SysV shm mapping and is
// read from a single capture thread at a time.
unsafe impl Send for ShmSegment {}

fn capture_loop(
    conn: RustConnection,
    root: u32,
    width: u32,
    height: u32,
    target_interval: Duration,
    mut wakeup_read: UnixStream,
    running: Arc<AtomicBool>,
    queue: Arc<FrameQueue>,
) -> Result<()> {
    let stride = width * Frame::bytes_per_pixel();
    let seg = ShmSegment::create(&conn, (stride * height) as usize)?;

    let damage_id = conn
        .generate_id()
        .map_err(|e| CaptureError::Failed(e.to_string()))?;
    conn.damage_create(damage_id, root, damage::ReportLevel::NON_EMPTY)
        .and_then(Cookie::check)
        .map_err(|e| CaptureError::Failed(format!("damage_create: {e}")))?;

    let mut damage_pending = true;
    let mut last_capture = Instant::now() - target_interval;

    while running.load(Ordering::SeqCst) {
        while let Ok(Some(event)) = conn.poll_for_event() {
            if let Event::DamageNotify(_) = event {
                damage_pending = true;
            }
        }

        let elapsed = last_capture.elapsed();
        if elapsed < target_interval || !damage_pending {
            let wait = target_interval.saturating_sub(elapsed).max(Duration::from_millis(1));
            poll_for_wakeup(&conn, &mut wakeup_read, wait);
            continue;
        }

        match seg.get_image(&conn, root, width, height) {
            Ok(pixels) => {
                let timestamp_us = monotonic_micros();
                queue.push(Frame::new(width, height, stride, timestamp_us, pixels));
                damage_pending = false;
                last_capture = Instant::now();
            }
            Err(e) => {
                debug!("XShmGetImage failed, retrying next interval: {e}");
                last_capture = Instant::now();
            }
        }

        // NON_EMPTY only reports once per accumulated region; without subtracting it
        // the server never sees the area as clean again and stops sending DamageNotify.
        if let Err(e) = conn.damage_subtract(damage_id, x11rb::NONE, x11rb::NONE).and_then(Cookie::check) {
            debug!("damage_subtract failed: {e}");
        }
    }

    let _ = conn.damage_destroy(damage_id);
    Ok(())
}

fn poll_for_wakeup(conn: &RustConnection, wakeup: &mut UnixStream, timeout: Duration) {
    let mut fds = [
        libc::pollfd {
            fd: conn.stream().as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        },
        libc::pollfd {
            fd: wakeup.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        },
    ];
    let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
    unsafe {
        libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, millis);
    }

    let mut buf = [0u8; 64];
    while let Ok(n) = wakeup.read(&mut buf) {
        if n == 0 {
            break;
        }
    }
}

fn monotonic_micros() -> i64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = *EPOCH.get_or_init(Instant::now);
    i64::try_from(epoch.elapsed().as_micros()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    #[test]
    fn default_target_fps_matches_spec() {
        assert_eq!(super::DEFAULT_TARGET_FPS, 60);
    }
}
