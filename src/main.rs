//! handctl daemon — hand gestures in, arrow keys out.

use std::path::PathBuf;
use std::time::Duration;

use calloop::channel;
use calloop::EventLoop;
use clap::Parser;
use tracing::info;

use handctl::detector;
use handctl::gesture::{EngineConfig, GestureEngine};
use handctl::ipc::IpcServer;
use handctl::keys::{ArrowKeys, KeySink, NullSink};
use handctl::state::DaemonState;

#[derive(Parser, Debug)]
#[command(name = "handctl", about = "Hand-gesture keyboard control daemon")]
struct Cli {
    /// Half-width of each directional band in degrees (must be below 45)
    #[arg(long, default_value_t = 35.0)]
    threshold_deg: f32,

    /// Minimum wrist-to-fingertip distance for a readable direction,
    /// in landmark units
    #[arg(long, default_value_t = 15.0)]
    stability_distance: f32,

    /// Per-action cooldown between key presses, milliseconds
    #[arg(long, default_value_t = 50.0)]
    cooldown_ms: f64,

    /// Consecutive identical frames required before adopting a new direction
    #[arg(long, default_value_t = 1)]
    min_confidence_frames: u32,

    /// Process only every (N+1)-th detector frame
    #[arg(long, default_value_t = 0)]
    skip_frames: u32,

    /// Detector command to spawn (default: read frames from stdin)
    #[arg(long)]
    detector: Option<String>,

    /// Log actions instead of pressing keys
    #[arg(long)]
    dry_run: bool,

    /// IPC socket path (default: $XDG_RUNTIME_DIR/handctl-ipc.sock)
    #[arg(long)]
    ipc_socket: Option<String>,

    /// Log all IPC messages to stderr
    #[arg(long)]
    ipc_trace: bool,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("handctl {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "handctl=info".into()),
        )
        .init();

    info!("handctl v{} starting", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig {
        angular_threshold_deg: cli.threshold_deg,
        stability_distance: cli.stability_distance,
        cooldown_seconds: cli.cooldown_ms / 1000.0,
        min_confidence_frames: cli.min_confidence_frames,
    };
    let engine = GestureEngine::new(config)?;

    let sink: Box<dyn KeySink> = if cli.dry_run {
        info!("dry run: actions will be logged, not injected");
        Box::new(NullSink)
    } else {
        Box::new(ArrowKeys::new())
    };

    let (detector_handle, frames) = match cli.detector.as_deref() {
        Some(cmd) => detector::spawn(cmd)?,
        None => {
            info!("no detector command given, reading frames from stdin");
            detector::from_stdin()
        }
    };

    let mut event_loop: EventLoop<DaemonState> = EventLoop::try_new()?;
    let loop_handle = event_loop.handle();

    let socket_path = cli
        .ipc_socket
        .map(PathBuf::from)
        .unwrap_or_else(IpcServer::default_socket_path);

    let mut ipc_server = IpcServer::new(socket_path.clone());
    ipc_server.ipc_trace = cli.ipc_trace;

    let mut daemon = DaemonState::new(
        engine,
        sink,
        ipc_server,
        event_loop.get_signal(),
        cli.skip_frames,
    );

    IpcServer::bind(&socket_path, &loop_handle)?;

    loop_handle
        .insert_source(frames, |event, _, state: &mut DaemonState| match event {
            channel::Event::Msg(frame) => state.handle_frame(frame),
            channel::Event::Closed => {
                info!("detector stream ended, shutting down");
                state.signal.stop();
            }
        })
        .map_err(|e| anyhow::anyhow!("failed to register detector source: {e}"))?;

    event_loop.run(Some(Duration::from_millis(100)), &mut daemon, |state| {
        IpcServer::poll_clients(state);
    })?;

    drop(detector_handle);
    std::fs::remove_file(&socket_path).ok();
    info!("handctl stopped");
    Ok(())
}
