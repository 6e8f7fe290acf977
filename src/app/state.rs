use std::path::PathBuf;
use std::sync::mpsc::TryRecvError;

use tracing::{debug, info, warn};

use crate::backend::{BackendCommand, BackendEvent, BackendHandle};
use crate::config::AppConfig;
use crate::constants::clamp_save_delay;
use crate::models::{ClipList, ConnectionParams, ConnectionStatus};

const CONNECT_FAILED_FALLBACK: &str = "Connection failed";

pub struct HighlightApp {
    pub(super) backend: BackendHandle,
    pub(super) status: ConnectionStatus,
    pub(super) obs_host: String,
    pub(super) port_input: String,
    pub(super) password_input: String,
    pub(super) error_message: Option<String>,
    pub(super) clips: ClipList,
    pub(super) save_delay_secs: u64,
    /// Paths sent with the play request still awaiting a reply.
    pub(super) playing: Option<Vec<PathBuf>>,
    pub(super) last_play_summary: Option<String>,
    pub(super) last_play_error: Option<String>,
    pub(super) udp_listen_addr: String,
    pub(super) dark_theme: bool,
}

impl HighlightApp {
    pub fn new(config: &AppConfig, backend: BackendHandle) -> Self {
        Self {
            backend,
            status: ConnectionStatus::Idle,
            obs_host: config.obs_host.clone(),
            port_input: config.obs_port.to_string(),
            password_input: String::new(),
            error_message: None,
            clips: ClipList::default(),
            save_delay_secs: clamp_save_delay(config.save_delay_secs),
            playing: None,
            last_play_summary: None,
            last_play_error: None,
            udp_listen_addr: config.udp_listen_addr.clone(),
            dark_theme: true,
        }
    }

    /// Returns false when the form was not submitted (invalid port or locked).
    pub(super) fn submit_login(&mut self) -> bool {
        if self.status.locks_form() {
            return false;
        }
        let Some(port) = parse_port(&self.port_input) else {
            debug!(input = %self.port_input, "Ignoring submit with invalid port");
            return false;
        };
        let password = if self.password_input.is_empty() {
            None
        } else {
            Some(self.password_input.clone())
        };

        self.status = ConnectionStatus::Connecting;
        self.error_message = None;
        let params = ConnectionParams {
            host: self.obs_host.clone(),
            port,
            password,
        };
        info!(address = %params.address(), "Connect requested");
        if !self.backend.send(BackendCommand::Connect(params)) {
            self.backend_lost();
        }
        true
    }

    pub(super) fn play_in_flight(&self) -> bool {
        self.playing.is_some()
    }

    pub(super) fn play_highlights(&mut self) {
        if self.play_in_flight() {
            return;
        }
        let paths = self.clips.paths();
        self.playing = Some(paths.clone());
        self.last_play_error = None;
        self.last_play_summary = None;
        if !self.backend.send(BackendCommand::PlayHighlights(paths)) {
            self.backend_lost();
        }
    }

    pub(super) fn set_save_delay(&mut self, secs: u64) {
        self.save_delay_secs = clamp_save_delay(secs);
        if !self
            .backend
            .send(BackendCommand::SetSaveDelay(self.save_delay_secs))
        {
            self.backend_lost();
        }
    }

    pub(super) fn apply_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::ConnectFinished(Ok(message)) => {
                info!(%message, "Connected");
                self.status = ConnectionStatus::Connected;
                self.error_message = None;
            }
            BackendEvent::ConnectFinished(Err(err)) => {
                warn!(error = %err, "Connect failed");
                self.status = ConnectionStatus::Error;
                self.error_message = Some(if err.trim().is_empty() {
                    CONNECT_FAILED_FALLBACK.to_string()
                } else {
                    err
                });
            }
            BackendEvent::HighlightsFinished(Ok(message)) => {
                // Clips saved while the request was out stay listed.
                for path in self.playing.take().unwrap_or_default() {
                    self.clips.remove(&path);
                }
                self.last_play_summary = Some(message);
            }
            BackendEvent::HighlightsFinished(Err(err)) => {
                warn!(error = %err, "Highlight playback failed");
                self.playing = None;
                self.last_play_error = Some(err);
            }
            BackendEvent::ClipSaved(path) => {
                if !self.clips.insert(path) {
                    debug!("Clip already listed");
                }
            }
            BackendEvent::SaveDelayChanged(secs) => {
                self.save_delay_secs = secs;
            }
            BackendEvent::PlayRequested => {
                info!("Game requested highlight playback");
                self.play_highlights();
            }
            BackendEvent::ConnectionLost(message) => {
                warn!(%message, "OBS connection lost");
                self.status = ConnectionStatus::Error;
                self.playing = None;
                self.error_message = Some(message);
            }
        }
    }

    pub(super) fn poll_backend(&mut self) {
        loop {
            match self.backend.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.status != ConnectionStatus::Error {
                        self.backend_lost();
                    }
                    break;
                }
            }
        }
    }

    fn backend_lost(&mut self) {
        self.status = ConnectionStatus::Error;
        self.playing = None;
        self.error_message = Some("Backend stopped unexpectedly.".to_string());
    }
}

pub(super) fn parse_port(input: &str) -> Option<u16> {
    match input.trim().parse::<u32>() {
        Ok(port) if (1..=65535).contains(&port) => u16::try_from(port).ok(),
        _ => None,
    }
}
