//! Session controller
//!
//! Wires the listener, the hub and the sample source together and owns
//! their lifecycle. A session is started once and stopped once; there is
//! no automatic restart.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::hub::{BroadcastHub, HubStats};
use crate::sample::unix_now;
use crate::server::{SessionConfig, SourceMode, SubscriberListener};
use crate::source::{LiveSource, NoSensor, ReplaySource, SampleSource, SensorLink};
use crate::trace::{Recording, TraceRecorder};

use super::state::{SessionPhase, SessionState};

/// Summary of a finished session
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Phase the session ended in
    pub phase: SessionPhase,
    /// Source variant that ran ("live" or "replay")
    pub source: &'static str,
    /// Time spent running
    pub duration: Duration,
    /// Hub activity
    pub stats: HubStats,
    /// Files written by a live session
    pub recording: Option<Recording>,
}

/// Builds and starts a session
pub struct SessionController<L: SensorLink> {
    config: SessionConfig,
    link: Option<L>,
    state: SessionState,
}

impl SessionController<NoSensor> {
    /// Controller for a session that replays a trace
    pub fn replay(config: SessionConfig) -> Self {
        Self {
            config,
            link: None,
            state: SessionState::new(),
        }
    }
}

impl<L: SensorLink> SessionController<L> {
    /// Controller with a sensor link for live mode
    pub fn new(config: SessionConfig, link: L) -> Self {
        Self {
            config,
            link: Some(link),
            state: SessionState::new(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current phase
    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    /// Open the listener and the source
    ///
    /// A failure here (bind error, unreadable trace) aborts the session
    /// before it reaches Running.
    pub async fn start(mut self) -> Result<Session<L>> {
        self.state.start();
        let started_at = unix_now();

        let hub = Arc::new(BroadcastHub::with_config(self.config.hub_config()));

        let listener = match SubscriberListener::bind(
            self.config.bind_addr,
            self.config.tcp_nodelay,
            Arc::clone(&hub),
        )
        .await
        {
            Ok(listener) => listener,
            Err(e) => return Err(self.abort(e)),
        };

        let source = match self.open_source(started_at).await {
            Ok(source) => source,
            Err(e) => return Err(self.abort(e)),
        };

        self.state.mark_running();
        tracing::info!(
            addr = %listener.local_addr(),
            source = source.kind(),
            "Session running"
        );

        Ok(Session {
            state: self.state,
            hub,
            listener,
            source,
        })
    }

    /// Start, run until `stop` resolves, then tear down
    pub async fn run_until<F>(self, stop: F) -> Result<SessionReport>
    where
        F: Future<Output = ()>,
    {
        self.start().await?.run_until(stop).await
    }

    async fn open_source(&mut self, started_at: f64) -> Result<SampleSource<L>> {
        match &self.config.mode {
            SourceMode::Replay { trace_path } => {
                let source = ReplaySource::open(trace_path, self.config.replay_tick).await?;
                Ok(SampleSource::Replay(source))
            }
            SourceMode::Live { device_name, .. } => {
                let (Some(link), Some(settings)) = (self.link.take(), self.config.live_settings())
                else {
                    return Err(Error::ConnectionFailed {
                        name: device_name.clone(),
                        reason: "no sensor link available".into(),
                    });
                };

                let recorder = TraceRecorder::create(&self.config.output_dir, started_at)?;
                Ok(SampleSource::Live(LiveSource::new(link, settings, recorder)))
            }
        }
    }

    fn abort(mut self, error: Error) -> Error {
        tracing::error!(error = %error, "Session failed to start");
        self.state.stop();
        self.state.mark_stopped();
        error
    }
}

/// A running session
pub struct Session<L: SensorLink> {
    state: SessionState,
    hub: Arc<BroadcastHub>,
    listener: SubscriberListener,
    source: SampleSource<L>,
}

impl<L: SensorLink> Session<L> {
    /// Address subscribers connect to
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// The session's broadcast hub
    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Current phase
    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    /// Run the source and the listener until `stop` resolves or the source
    /// fails, then close everything
    ///
    /// The trace file and all subscriber connections are closed before this
    /// returns, whatever the outcome.
    pub async fn run_until<F>(mut self, stop: F) -> Result<SessionReport>
    where
        F: Future<Output = ()>,
    {
        let outcome = tokio::select! {
            _ = stop => {
                tracing::info!("Stop requested");
                Ok(())
            }
            result = self.source.run(&self.hub) => match result {
                Ok(()) => Ok(()),
                Err(e) => {
                    tracing::error!(error = %e, "Sample source failed");
                    Err(e)
                }
            },
            _ = self.listener.run() => Ok(()),
        };

        self.state.stop();
        let duration = self.state.running_duration();
        let finished = self.source.finish();

        drop(self.listener);
        self.hub.shutdown().await;
        self.state.mark_stopped();

        let (outcome, recording) = match finished {
            Ok(recording) => (outcome, recording),
            Err(e) => {
                tracing::error!(error = %e, "Failed to write recording");
                (outcome.and(Err(e)), None)
            }
        };
        if let Some(recording) = &recording {
            tracing::info!(
                trace = ?recording.trace_path,
                csv = %recording.csv_path.display(),
                samples = recording.samples,
                "Recording saved"
            );
        }

        let report = SessionReport {
            phase: self.state.phase(),
            source: self.source.kind(),
            duration,
            stats: self.hub.stats().await,
            recording,
        };

        tracing::info!(
            age_secs = self.state.age().as_secs_f64(),
            running_secs = duration.as_secs_f64(),
            published = report.stats.samples_published,
            subscribers = report.stats.subscribers_registered,
            dropped = report.stats.subscribers_dropped,
            "Session stopped"
        );

        outcome.map(|()| report)
    }
}
