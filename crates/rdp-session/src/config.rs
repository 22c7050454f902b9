use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use rdp_encode::CodecMode;
use serde::Deserialize;

/// On-disk configuration, loaded with `toml`/`serde`. Every field has a CLI override
/// (see [`Cli`]) so the server is runnable without a config file at all.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RdpServerConfig {
    pub listen_addr: SocketAddr,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
    pub x11_display: Option<String>,
    pub target_fps: u32,
    pub codec_mode: ConfigCodecMode,
    pub max_outstanding_frames: u32,
    pub large_change_threshold: f64,
    pub progressive_refresh_interval: u32,
    pub progressive_refresh_timeout_ms: u64,
}

impl Default for RdpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3389".parse().expect("valid default listen address"),
            tls_cert_path: None,
            tls_key_path: None,
            x11_display: None,
            target_fps: rdp_capture::DEFAULT_TARGET_FPS,
            codec_mode: ConfigCodecMode::Auto,
            max_outstanding_frames: 3,
            large_change_threshold: 0.4,
            progressive_refresh_interval: 60,
            progressive_refresh_timeout_ms: 1000,
        }
    }
}

impl RdpServerConfig {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, clap::ValueEnum, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigCodecMode {
    #[default]
    Auto,
    H264,
    Rfx,
}

impl From<ConfigCodecMode> for CodecMode {
    fn from(mode: ConfigCodecMode) -> Self {
        match mode {
            ConfigCodecMode::Auto => CodecMode::Auto,
            ConfigCodecMode::H264 => CodecMode::H264,
            ConfigCodecMode::Rfx => CodecMode::Rfx,
        }
    }
}

/// CLI flags, layered over a config file's defaults. Does not attempt to replicate the
/// original daemon's full INI/flag surface — that parsing lives outside this crate's
/// scope; these flags cover what the capture/encode/session core actually needs to run.
#[derive(Debug, Parser)]
#[command(name = "rdp-server", version, about = "Server-side RDP streaming engine")]
pub struct Cli {
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub listen_addr: Option<SocketAddr>,

    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    #[arg(long)]
    pub tls_key: Option<PathBuf>,

    #[arg(long)]
    pub x11_display: Option<String>,

    #[arg(long)]
    pub target_fps: Option<u32>,

    #[arg(long, value_enum)]
    pub codec_mode: Option<ConfigCodecMode>,
}

impl Cli {
    pub fn apply(self, mut config: RdpServerConfig) -> RdpServerConfig {
        if let Some(addr) = self.listen_addr {
            config.listen_addr = addr;
        }
        if let Some(cert) = self.tls_cert {
            config.tls_cert_path = Some(cert);
        }
        if let Some(key) = self.tls_key {
            config.tls_key_path = Some(key);
        }
        if let Some(display) = self.x11_display {
            config.x11_display = Some(display);
        }
        if let Some(fps) = self.target_fps {
            config.target_fps = fps;
        }
        if let Some(mode) = self.codec_mode {
            config.codec_mode = mode;
        }
        config
    }
}
