use clap::Parser as _;
use ironrdp_server::RdpServer;
use rdp_encode::{AvcEncoder, Codec, DirtyRect, EncodingEngine, EncodingOptions, ProgressiveEncoder, RemoteFxEncoder};
use rdp_input::InputInjector;
use rdp_session::{Cli, RdpServerConfig, RuntimeOptions};
use tracing_subscriber::EnvFilter;

/// Placeholder codec backends until real AVC/Progressive/RemoteFX bitstream encoders
/// are wired in; compression correctness is out of this crate's scope (see
/// `DESIGN.md`). The selection/refresh/admission-control state machines around them
/// run on every connection regardless of what actually produces the bytes.
struct PassthroughAvc;
impl AvcEncoder for PassthroughAvc {
    fn encode(&mut self, frame: &rdp_capture::Frame, _codec: Codec) -> rdp_encode::Result<Vec<u8>> {
        Ok(frame.data.clone())
    }
}

struct PassthroughProgressive;
impl ProgressiveEncoder for PassthroughProgressive {
    fn encode(&mut self, frame: &rdp_capture::Frame, _regions: &[DirtyRect], _keyframe: bool) -> rdp_encode::Result<Vec<u8>> {
        Ok(frame.data.clone())
    }
}

struct PassthroughRemoteFx;
impl RemoteFxEncoder for PassthroughRemoteFx {
    fn encode(&mut self, frame: &rdp_capture::Frame, _regions: &[DirtyRect], _keyframe: bool) -> rdp_encode::Result<Vec<u8>> {
        Ok(frame.data.clone())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => RdpServerConfig::load(path)?,
        None => RdpServerConfig::default(),
    };
    let config = cli.apply(config);

    info_startup(&config);

    let injector = InputInjector::open(config.x11_display.as_deref())?;

    let runtime_options = RuntimeOptions {
        x11_display: config.x11_display.clone(),
        target_fps: config.target_fps,
        max_outstanding_frames: config.max_outstanding_frames,
        encoding: EncodingOptions {
            width: 0,
            height: 0,
            enable_diff: true,
            large_change_threshold: config.large_change_threshold,
            progressive_refresh_interval: config.progressive_refresh_interval,
            progressive_refresh_timeout_ms: config.progressive_refresh_timeout_ms,
        },
    };
    let (gfx_factory, display) = rdp_session::build_runtime(runtime_options, || {
        EncodingEngine::new(
            Box::new(PassthroughAvc),
            Box::new(PassthroughProgressive),
            Box::new(PassthroughRemoteFx),
        )
    });

    let security = RdpServer::builder().with_addr(config.listen_addr);
    let security = match (&config.tls_cert_path, &config.tls_key_path) {
        (Some(cert), Some(key)) => {
            let acceptor = ironrdp_server::TlsIdentityCtx::init_from_paths(cert, key)?.make_acceptor()?;
            security.with_tls(acceptor)
        }
        _ => security.with_no_security(),
    };

    let server = security
        .with_input_handler(injector)
        .with_display_handler(display)
        .with_gfx_factory(gfx_factory)
        .build();
    let handle = server.handle().clone();
    tokio::spawn({
        let mut server = server;
        async move { if let Err(e) = server.run().await { tracing::error!("server loop exited: {e}"); } }
    });

    tokio::signal::ctrl_c().await?;
    let _ = handle.quit("shutting down");
    Ok(())
}

fn info_startup(config: &RdpServerConfig) {
    tracing::info!(
        addr = %config.listen_addr,
        fps = config.target_fps,
        "starting rdp-server"
    );
}
