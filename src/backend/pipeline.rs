use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{BackendEvent, EventSink};
use crate::game_events::{self, GameCommand};
use crate::obs::{ObsClient, ObsEvent};
use crate::udp;

const DATAGRAM_QUEUE: usize = 32;

/// Game events in, saved replays out. Stops when dropped.
pub struct CapturePipeline {
    local_addr: SocketAddr,
    tasks: Vec<JoinHandle<()>>,
}

impl CapturePipeline {
    pub fn start(
        client: Arc<ObsClient>,
        socket: UdpSocket,
        save_delay: Arc<AtomicU64>,
        events: EventSink,
    ) -> std::io::Result<Self> {
        let local_addr = socket.local_addr()?;
        let (tx, rx) = mpsc::channel::<String>(DATAGRAM_QUEUE);

        let listener = tokio::spawn(udp::forward_datagrams(socket, tx));
        let trigger = tokio::spawn(run_replay_trigger(
            rx,
            Arc::clone(&client),
            save_delay,
            events.clone(),
        ));
        let clips = tokio::spawn(forward_saved_clips(client.subscribe(), events));

        info!(%local_addr, "Capture pipeline started");
        Ok(Self {
            local_addr,
            tasks: vec![listener, trigger, clips],
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops every task and waits for them, so the UDP port is free on return.
    pub async fn shutdown(mut self) {
        let tasks = std::mem::take(&mut self.tasks);
        for task in &tasks {
            task.abort();
        }
        for task in tasks {
            let _ = task.await;
        }
        info!(local_addr = %self.local_addr, "Capture pipeline stopped");
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn run_replay_trigger(
    mut rx: mpsc::Receiver<String>,
    client: Arc<ObsClient>,
    save_delay: Arc<AtomicU64>,
    events: EventSink,
) {
    while let Some(payload) = rx.recv().await {
        let message = match game_events::parse_message(&payload) {
            Ok(message) => message,
            Err(err) => {
                debug!(error = %err, payload = %payload, "Failed to parse game event");
                continue;
            }
        };
        let command = message.cmd;
        if command.triggers_replay() {
            let delay = save_delay.load(Ordering::Relaxed);
            info!(?command, delay, "Saving replay after delay");
            // Off the loop so datagrams keep draining while we wait.
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(delay)).await;
                if let Err(err) = client.save_replay_buffer().await {
                    error!(error = %err, "Failed to save replay buffer");
                }
            });
        } else if command == GameCommand::Dbg {
            debug!(data = ?message.data, "Highlight playback requested by the game");
            if !events.emit(BackendEvent::PlayRequested) {
                break;
            }
        }
    }
}

async fn forward_saved_clips(mut rx: broadcast::Receiver<ObsEvent>, events: EventSink) {
    loop {
        match rx.recv().await {
            Ok(ObsEvent::ReplayBufferSaved { path }) => {
                info!(path = ?path, "Replay saved");
                if !events.emit(BackendEvent::ClipSaved(path)) {
                    break;
                }
            }
            Ok(ObsEvent::ReplayBufferStateChanged { active }) => {
                if !active {
                    warn!("Replay buffer was stopped in OBS");
                }
            }
            Ok(ObsEvent::ConnectionLost) => break,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Missed OBS events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
