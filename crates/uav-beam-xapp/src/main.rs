//! UAV Beam Tracking xApp
//!
//! Near-RT RIC control application that tracks each UAV's best serving
//! beam from periodic RSRP reports and issues beam-switch / recovery
//! directives before signal quality collapses.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use uav_beam_xapp::config::XappConfig;
use uav_beam_xapp::server::{create_router, AppState};
use uav_beam_xapp::XappError;

#[derive(Parser, Debug)]
#[command(name = "uav-beam-xapp", about = "UAV beam tracking xApp")]
struct Args {
    /// Path to the xApp config-file.json
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the HTTP listen port
    #[arg(long)]
    http_port: Option<u16>,

    /// Log filter (overridden by RUST_LOG when set)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), XappError> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            XappConfig::load(path)?
        }
        None => {
            info!("no config file given, using defaults");
            XappConfig::default()
        }
    };
    if let Some(port) = args.http_port {
        config.http.port = port;
    }

    let (state, mut outbound_rx) = AppState::new(config)?;
    let config = state.config().clone();

    // Drain outbound control messages. A production deployment forwards
    // these through the RIC message router; standalone runs log them.
    tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            info!(
                msg_type = msg.msg_type,
                payload = %String::from_utf8_lossy(&msg.payload),
                "outbound control message"
            );
        }
    });

    // Periodic sweep of idle receivers.
    let tracker = state.tracker();
    let eviction_interval = Duration::from_millis(config.eviction_interval_ms);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(eviction_interval);
        loop {
            ticker.tick().await;
            let now_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
            let evicted = tracker.evict_idle(now_ms);
            for id in &evicted {
                info!(receiver = %id, "receiver evicted after idle timeout");
            }
        }
    });

    let addr: SocketAddr = format!("{}:{}", config.http.bind, config.http.port)
        .parse()
        .map_err(|err| XappError::Config(format!("invalid bind address: {err}")))?;

    info!(%addr, "UAV beam xApp listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(err) = axum::serve(listener, create_router(state)).await {
        warn!(%err, "server terminated");
        return Err(err.into());
    }
    Ok(())
}
