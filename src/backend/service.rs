use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, instrument, warn};

use super::pipeline::CapturePipeline;
use super::{BackendCommand, BackendEvent, EventSink};
use crate::config::AppConfig;
use crate::constants::clamp_save_delay;
use crate::error::{HighlightError, Result};
use crate::models::ConnectionParams;
use crate::obs::{ObsClient, ObsEvent};
use crate::udp;

const CONNECTION_LOST: &str = "Lost connection to OBS";

pub struct BackendService {
    config: AppConfig,
    config_path: Option<PathBuf>,
    events: EventSink,
    save_delay: Arc<AtomicU64>,
    request_timeout: Duration,
    session: Option<Arc<ObsClient>>,
    session_events: Option<broadcast::Receiver<ObsEvent>>,
    pipeline: Option<CapturePipeline>,
}

impl BackendService {
    pub fn new(config: AppConfig, config_path: Option<PathBuf>, events: EventSink) -> Self {
        let save_delay = Arc::new(AtomicU64::new(clamp_save_delay(config.save_delay_secs)));
        let request_timeout = Duration::from_secs(config.obs_request_timeout_secs.max(1));
        Self {
            config,
            config_path,
            events,
            save_delay,
            request_timeout,
            session: None,
            session_events: None,
            pipeline: None,
        }
    }

    pub async fn run(mut self, mut commands: UnboundedReceiver<BackendCommand>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                () = session_lost(self.session_events.as_mut()) => {
                    self.reap_closed_session().await;
                }
            }
        }
        info!("Backend stopped");
    }

    pub async fn handle(&mut self, command: BackendCommand) {
        let event = match command {
            BackendCommand::Connect(params) => BackendEvent::ConnectFinished(
                self.connect(params).await.map_err(|err| err.to_string()),
            ),
            BackendCommand::PlayHighlights(paths) => BackendEvent::HighlightsFinished(
                self.play_highlights(paths).await.map_err(|err| err.to_string()),
            ),
            BackendCommand::SetSaveDelay(secs) => {
                BackendEvent::SaveDelayChanged(self.set_save_delay(secs))
            }
        };
        self.events.emit(event);
    }

    #[instrument(skip(self, params), fields(address = %params.address()))]
    pub async fn connect(&mut self, params: ConnectionParams) -> Result<String> {
        self.reap_closed_session().await;
        if self.pipeline.is_some() {
            return Err(HighlightError::AlreadyRunning);
        }
        info!(save_delay = self.save_delay(), "Connecting to OBS");

        let client = ObsClient::connect(&params, self.request_timeout).await?;
        client.ensure_replay_buffer().await?;
        client.ensure_playback_source().await?;
        let socket = udp::bind(&self.config.udp_listen_addr).await?;

        let client = Arc::new(client);
        let pipeline = CapturePipeline::start(
            Arc::clone(&client),
            socket,
            Arc::clone(&self.save_delay),
            self.events.clone(),
        )?;
        // Subscribed before the check: a drop lands in one or the other.
        let session_events = client.subscribe();
        if client.is_closed() {
            pipeline.shutdown().await;
            return Err(HighlightError::ConnectionClosed(
                "OBS went away while starting capture".to_string(),
            ));
        }
        self.session_events = Some(session_events);
        self.session = Some(client);
        self.pipeline = Some(pipeline);

        self.config.obs_host = params.host.clone();
        self.config.obs_port = params.port;
        self.persist_config();

        info!(udp = ?self.listening_on(), "Highlight capture running");
        Ok(format!("Connected to OBS at {}", params.address()))
    }

    pub async fn play_highlights(&mut self, paths: Vec<PathBuf>) -> Result<String> {
        if paths.is_empty() {
            return Ok("No clips to play".to_string());
        }
        self.reap_closed_session().await;
        let session = self.session.as_ref().ok_or(HighlightError::NotConnected)?;
        session.play_clips(&paths).await?;
        Ok(format!("Playing {} highlight clip(s)", paths.len()))
    }

    pub fn set_save_delay(&mut self, secs: u64) -> u64 {
        let secs = clamp_save_delay(secs);
        self.save_delay.store(secs, Ordering::Relaxed);
        if self.config.save_delay_secs != secs {
            self.config.save_delay_secs = secs;
            self.persist_config();
        }
        info!(secs, "Replay save delay updated");
        secs
    }

    pub fn save_delay(&self) -> u64 {
        self.save_delay.load(Ordering::Relaxed)
    }

    pub fn listening_on(&self) -> Option<SocketAddr> {
        self.pipeline.as_ref().map(CapturePipeline::local_addr)
    }

    pub fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(|session| !session.is_closed())
    }

    /// Drops the session and stops capture once OBS has closed the connection,
    /// telling the UI so.
    async fn reap_closed_session(&mut self) {
        if self.session.is_none() || self.is_connected() {
            return;
        }
        warn!("OBS session closed, stopping capture");
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.shutdown().await;
        }
        self.session = None;
        self.session_events = None;
        self.events
            .emit(BackendEvent::ConnectionLost(CONNECTION_LOST.to_string()));
    }

    fn persist_config(&self) {
        if let Some(path) = &self.config_path {
            if let Err(err) = self.config.save_to(path) {
                warn!(error = %err, "Failed to save config");
            }
        }
    }
}

/// Resolves once the session is gone. Never resolves without one.
async fn session_lost(events: Option<&mut broadcast::Receiver<ObsEvent>>) {
    let Some(events) = events else {
        return std::future::pending().await;
    };
    loop {
        match events.recv().await {
            Ok(ObsEvent::ConnectionLost) | Err(RecvError::Closed) => return,
            Ok(_) | Err(RecvError::Lagged(_)) => {}
        }
    }
}
