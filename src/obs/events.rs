use std::path::PathBuf;

use obws::events::Event;

/// The OBS events the rest of the app reacts to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObsEvent {
    ReplayBufferSaved { path: PathBuf },
    ReplayBufferStateChanged { active: bool },
    /// The WebSocket session ended. Nothing follows it.
    ConnectionLost,
}

impl ObsEvent {
    pub fn from_obws(event: Event) -> Option<Self> {
        match event {
            Event::ReplayBufferSaved { path } => Some(Self::ReplayBufferSaved { path }),
            Event::ReplayBufferStateChanged { active, .. } => {
                Some(Self::ReplayBufferStateChanged { active })
            }
            Event::ServerStopped => Some(Self::ConnectionLost),
            _ => None,
        }
    }
}
