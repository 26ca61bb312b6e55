//! uicast server entry point.
//!
//! Renders one shared control panel at a fixed rate and streams it to every
//! connected browser.  One viewer at a time holds the control lease and
//! drives the panel; everyone else watches.
//!
//! # Usage
//!
//! ```text
//! uicast-server [OPTIONS]
//!
//! Options:
//!   --config      <PATH>  TOML config file
//!   --port        <PORT>  WebSocket listener port [default: 5015]
//!   --bind        <ADDR>  Listener bind address [default: 0.0.0.0]
//!   --http-root   <PATH>  Static asset root [default: ../static/]
//!   --fps         <FPS>   Frame rate
//!   --lease-secs  <SECS>  Control lease length
//!   --rotation    <NAME>  claimants | all_viewers
//!   --device-host <HOST>  SNMP device address
//!   --log-level   <LVL>   Fallback when RUST_LOG is unset
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable             | Description              |
//! |----------------------|--------------------------|
//! | `UICAST_CONFIG`      | Config file path         |
//! | `UICAST_PORT`        | WebSocket listener port  |
//! | `UICAST_BIND`        | Listener bind address    |
//! | `UICAST_HTTP_ROOT`   | Static asset root        |
//! | `UICAST_DEVICE_HOST` | SNMP device address      |
//!
//! Flags win over the config file, which wins over built-in defaults.
//!
//! # Threads
//!
//! ```text
//! tokio runtime ── accept loop ── per-viewer reader/writer tasks
//!              └── port poller (snmpget on the blocking pool)
//! uicast-tick  ── TickLoop::run: arbitrate, apply events, render, broadcast
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use uicast_core::application::spawn_port_poller;
use uicast_core::{PortId, RotationPolicy, TickConfig, TickLoop, ViewerIdAllocator};
use uicast_server::application::{PanelRenderer, PanelState};
use uicast_server::domain::{load_config, ServerConfig};
use uicast_server::infrastructure::{
    run_server, DeviceTarget, PolledDevice, SnmpPortController, SnmpSettings, ViewerHub,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Shared control panel streamed to browsers over WebSocket.
///
/// Every option is optional; an unset option leaves the config file value
/// (or the built-in default) in place.
#[derive(Debug, Parser)]
#[command(
    name = "uicast-server",
    about = "Streams a shared device control panel to browser viewers",
    version
)]
struct Cli {
    /// TOML configuration file.  Must exist if given.
    #[arg(long, env = "UICAST_CONFIG")]
    config: Option<PathBuf>,

    /// TCP port for the WebSocket listener.
    #[arg(long, env = "UICAST_PORT")]
    port: Option<u16>,

    /// IP address to bind the listener to.
    ///
    /// `0.0.0.0` accepts viewers on every interface, `127.0.0.1` only
    /// local ones.
    #[arg(long, env = "UICAST_BIND")]
    bind: Option<String>,

    /// Directory holding the viewer page and its scripts.
    #[arg(long, env = "UICAST_HTTP_ROOT")]
    http_root: Option<PathBuf>,

    /// Frames per second.
    #[arg(long)]
    fps: Option<f64>,

    /// Seconds a viewer keeps control before it rotates.
    #[arg(long)]
    lease_secs: Option<u64>,

    /// Who control rotates to when a lease ends.
    #[arg(long, value_parser = parse_rotation)]
    rotation: Option<RotationPolicy>,

    /// Address of the SNMP device behind the panel.
    #[arg(long, env = "UICAST_DEVICE_HOST")]
    device_host: Option<String>,

    /// Log level used when `RUST_LOG` is unset.
    #[arg(long)]
    log_level: Option<String>,
}

fn parse_rotation(value: &str) -> Result<RotationPolicy, String> {
    match value {
        "claimants" => Ok(RotationPolicy::Claimants),
        "all_viewers" | "all-viewers" => Ok(RotationPolicy::AllViewers),
        other => Err(format!(
            "unknown rotation '{other}' (expected claimants or all_viewers)"
        )),
    }
}

impl Cli {
    /// Loads the config file (if any), applies the flags on top and
    /// validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if
    /// the merged configuration is invalid.
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(http_root) = self.http_root {
            config.server.http_root = http_root;
        }
        if let Some(fps) = self.fps {
            config.schedule.fps = fps;
        }
        if let Some(lease_secs) = self.lease_secs {
            config.control.lease_secs = lease_secs;
        }
        if let Some(rotation) = self.rotation {
            config.control.rotation = rotation;
        }
        if let Some(host) = self.device_host {
            config.device.host = host;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;

    // RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    let listen_addr = config.listen_addr()?;
    info!(
        "uicast server starting: ws={listen_addr}, fps={}, lease={}s, rotation={:?}",
        config.schedule.fps, config.control.lease_secs, config.control.rotation
    );
    info!("static assets expected under {}", config.server.http_root.display());

    // Binding is the only fatal startup step.
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {listen_addr}"))?;

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::SeqCst);
            }
            Err(e) => {
                error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    // ── Device ────────────────────────────────────────────────────────────────
    let target = DeviceTarget::new(config.device.host.clone());
    let controller = Arc::new(SnmpPortController::new(
        target.clone(),
        SnmpSettings::from(&config.device),
    ));
    let (poller, poller_task) = spawn_port_poller(
        &Handle::current(),
        controller,
        PortId(config.device.port),
        config.poll_interval(),
        Arc::clone(&running),
    );
    info!(
        host = %config.device.host,
        port = config.device.port,
        "port poller started"
    );

    // ── Tick loop ─────────────────────────────────────────────────────────────
    let panel = PanelState::new(
        config.device.host.clone(),
        Box::new(PolledDevice::new(target, poller)),
    );
    let ids = Arc::new(ViewerIdAllocator::new());
    let tick_config = TickConfig {
        fps: config.schedule.fps,
        lease: config.lease(),
        rotation: config.control.rotation,
    };
    let mut tick_loop = TickLoop::new(tick_config, panel, PanelRenderer::new(), Arc::clone(&ids))
        .context("failed to build tick loop")?;
    let hub = ViewerHub::new(tick_loop.intake_sender(), ids);

    let tick_running = Arc::clone(&running);
    let tick_thread = std::thread::Builder::new()
        .name("uicast-tick".to_string())
        .spawn(move || tick_loop.run(&tick_running))
        .context("failed to spawn tick thread")?;

    // ── Accept loop ───────────────────────────────────────────────────────────
    run_server(listener, hub, Arc::clone(&running)).await;

    // The accept loop only returns once the flag is cleared; make sure the
    // tick thread sees the same.
    running.store(false, Ordering::SeqCst);
    match tokio::task::spawn_blocking(move || tick_thread.join()).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => error!("tick thread panicked"),
        Err(e) => error!("failed to join tick thread: {e}"),
    }
    poller_task.abort();

    info!("uicast server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["uicast-server"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_cli_defaults_produce_default_config() {
        // Arrange
        let cli = Cli {
            config: None,
            port: None,
            bind: None,
            http_root: None,
            fps: None,
            lease_secs: None,
            rotation: None,
            device_host: None,
            log_level: None,
        };

        // Act
        let config = cli.into_config().unwrap();

        // Assert
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.server.port, 5015);
        assert_eq!(config.server.http_root, PathBuf::from("../static/"));
    }

    #[test]
    fn test_cli_port_override() {
        let cli = cli(&["--port", "9999"]);
        assert_eq!(cli.port, Some(9999));
        assert_eq!(cli.into_config().unwrap().server.port, 9999);
    }

    #[test]
    fn test_cli_http_root_override() {
        let config = cli(&["--http-root", "/srv/uicast"]).into_config().unwrap();
        assert_eq!(config.server.http_root, PathBuf::from("/srv/uicast"));
    }

    #[test]
    fn test_cli_lease_and_rotation_override() {
        // Arrange
        let cli = cli(&["--lease-secs", "3", "--rotation", "all_viewers"]);

        // Act
        let config = cli.into_config().unwrap();

        // Assert
        assert_eq!(config.lease(), Duration::from_secs(3));
        assert_eq!(config.control.rotation, RotationPolicy::AllViewers);
    }

    #[test]
    fn test_cli_rejects_unknown_rotation() {
        let result = Cli::try_parse_from(["uicast-server", "--rotation", "random"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_device_host_override() {
        let config = cli(&["--device-host", "10.0.0.7"]).into_config().unwrap();
        assert_eq!(config.device.host, "10.0.0.7");
    }

    #[test]
    fn test_invalid_bind_returns_error() {
        let result = cli(&["--bind", "not.an.ip"]).into_config();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_fps_returns_error() {
        let result = cli(&["--fps", "0"]).into_config();
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_config_file_returns_error() {
        let result = cli(&["--config", "/nonexistent/uicast.toml"]).into_config();
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        // Arrange
        let path = std::env::temp_dir().join(format!("uicast-cli-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[server]\nport = 7000\n\n[schedule]\nfps = 30.0").unwrap();
        let path_arg = path.to_string_lossy().into_owned();

        // Act
        let config = cli(&["--config", &path_arg, "--port", "7001"])
            .into_config()
            .unwrap();
        std::fs::remove_file(&path).unwrap();

        // Assert
        assert_eq!(config.server.port, 7001);
        assert_eq!(config.schedule.fps, 30.0);
    }
}
