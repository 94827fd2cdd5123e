//! pulsecast command line
//!
//! ```text
//! pulsecast serve                          live session, default device
//! pulsecast serve --replay hr-1718.trace   replay a recorded trace
//! pulsecast watch --addr 127.0.0.1:8888    print heart rate from a server
//! ```
//!
//! `serve` runs until a line is entered on stdin or Ctrl+C is pressed.

use std::io::BufRead;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

use pulsecast::client::Watcher;
use pulsecast::error::Result;
use pulsecast::server::{SessionConfig, SourceMode, DEFAULT_DEVICE_NAME};
use pulsecast::session::{SessionController, SessionReport};
use pulsecast::source::SimulatedSensor;

#[derive(Parser, Debug)]
#[command(name = "pulsecast", version, about = "Heart-rate sample broadcast server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a session and broadcast samples to TCP subscribers
    Serve(ServeArgs),
    /// Connect to a server and print each heart rate
    Watch {
        /// Server address
        #[arg(long, default_value = "127.0.0.1:8888")]
        addr: SocketAddr,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address subscribers connect to
    #[arg(long, default_value = "127.0.0.1:8888")]
    bind: SocketAddr,

    /// Replay this trace instead of reading a sensor
    #[arg(long, value_name = "TRACE", conflicts_with = "device")]
    replay: Option<PathBuf>,

    /// Sensor to connect to in live mode
    #[arg(long, value_name = "NAME", default_value = DEFAULT_DEVICE_NAME)]
    device: String,

    /// Directory for live recordings
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Milliseconds between replayed samples
    #[arg(long, value_name = "N", default_value = "100")]
    tick_ms: u64,
}

impl ServeArgs {
    fn session_config(&self) -> SessionConfig {
        let mode = match &self.replay {
            Some(path) => SourceMode::replay(path),
            None => SourceMode::live(&self.device),
        };

        SessionConfig::with_mode(mode)
            .bind(self.bind)
            .output_dir(&self.output_dir)
            .replay_tick(Duration::from_millis(self.tick_ms.max(1)))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pulsecast=info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Watch { addr } => watch(addr).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = args.session_config();

    let report = if config.mode.is_replay() {
        SessionController::replay(config).run_until(operator_stop()).await?
    } else {
        // No radio backend is linked into this binary
        let sensor = SimulatedSensor::new(&args.device);
        SessionController::new(config, sensor)
            .run_until(operator_stop())
            .await?
    };

    print_report(&report);
    Ok(())
}

async fn watch(addr: SocketAddr) -> Result<()> {
    let mut watcher = Watcher::connect(addr).await?;

    loop {
        match watcher.next_sample().await {
            Ok(sample) => match sample.heart_rate() {
                Some(bpm) => println!("HR: {}", bpm),
                None => tracing::debug!(len = sample.payload.len(), "Sample without heart rate"),
            },
            Err(e) if !e.is_fatal() => {
                tracing::info!(samples = watcher.received(), "Server closed the connection");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }
}

/// Resolves on a line from stdin or Ctrl+C
async fn operator_stop() {
    let stdin_line = async {
        // Closed or unreadable stdin leaves Ctrl+C as the only way out
        if line_signal(std::io::BufReader::new(std::io::stdin())).await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = stdin_line => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Fires once `reader` yields a line
///
/// The read runs on a detached OS thread so a pending read never holds up
/// runtime shutdown. The sender is dropped without firing on EOF or error.
fn line_signal<R>(mut reader: R) -> oneshot::Receiver<()>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = oneshot::channel();

    let spawned = std::thread::Builder::new()
        .name("stdin-stop".into())
        .spawn(move || {
            let mut line = String::new();
            if let Ok(n) = reader.read_line(&mut line) {
                if n > 0 {
                    let _ = tx.send(());
                }
            }
        });
    if let Err(e) = spawned {
        tracing::error!(error = %e, "Failed to start stdin reader");
    }

    rx
}

fn print_report(report: &SessionReport) {
    println!(
        "Session {} ({}): ran {:.1}s, published={} delivered={} subscribers={} dropped={}",
        report.phase,
        report.source,
        report.duration.as_secs_f64(),
        report.stats.samples_published,
        report.stats.frames_delivered,
        report.stats.subscribers_registered,
        report.stats.subscribers_dropped,
    );
    if let Some(recording) = &report.recording {
        match &recording.trace_path {
            Some(path) => println!("Trace written to {}", path.display()),
            None => println!("No samples recorded"),
        }
        println!("CSV log at {}", recording.csv_path.display());
    }
}
