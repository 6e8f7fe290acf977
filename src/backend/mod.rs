//! The side of the app that talks to OBS and the game.
//!
//! The GUI thread never blocks on it: commands go in through an unbounded
//! tokio channel and results come back on a std channel that the UI drains
//! with `try_recv` once per frame. Every event also fires the repaint hook so
//! an idle window wakes up.

mod pipeline;
mod service;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};

use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

use crate::config::AppConfig;
use crate::models::ConnectionParams;

pub use service::BackendService;

pub type Repaint = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug)]
pub enum BackendCommand {
    Connect(ConnectionParams),
    PlayHighlights(Vec<PathBuf>),
    SetSaveDelay(u64),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendEvent {
    ConnectFinished(Result<String, String>),
    HighlightsFinished(Result<String, String>),
    ClipSaved(PathBuf),
    SaveDelayChanged(u64),
    /// The game asked for the saved highlights to be shown.
    PlayRequested,
    /// OBS went away; capture has stopped until the next connect.
    ConnectionLost(String),
}

/// Sending half of the event channel plus the repaint hook.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<BackendEvent>,
    repaint: Repaint,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<BackendEvent>, repaint: Repaint) -> Self {
        Self { tx, repaint }
    }

    /// Returns false once the UI has gone away.
    pub fn emit(&self, event: BackendEvent) -> bool {
        let delivered = self.tx.send(event).is_ok();
        (self.repaint)();
        delivered
    }
}

/// What the UI holds on to.
pub struct BackendHandle {
    commands: UnboundedSender<BackendCommand>,
    events: Receiver<BackendEvent>,
}

impl BackendHandle {
    pub fn new(commands: UnboundedSender<BackendCommand>, events: Receiver<BackendEvent>) -> Self {
        Self { commands, events }
    }

    /// Returns false when the backend task has stopped.
    pub fn send(&self, command: BackendCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn try_recv(&self) -> Result<BackendEvent, TryRecvError> {
        self.events.try_recv()
    }
}

pub fn spawn(
    runtime: &Handle,
    config: AppConfig,
    config_path: Option<PathBuf>,
    repaint: Repaint,
) -> BackendHandle {
    let (command_tx, command_rx) = unbounded_channel();
    let (event_tx, event_rx) = mpsc::channel();
    let service = BackendService::new(config, config_path, EventSink::new(event_tx, repaint));
    runtime.spawn(service.run(command_rx));
    BackendHandle::new(command_tx, event_rx)
}
