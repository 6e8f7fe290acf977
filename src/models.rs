use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Idle,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Idle => "Not connected",
            ConnectionStatus::Connecting => "Connecting…",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Error => "Error",
        }
    }

    /// The login form is locked while a connect is in flight or done.
    pub fn locks_form(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

impl ConnectionParams {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Debug)]
pub struct ClipEntry {
    pub path: PathBuf,
    pub received_at: DateTime<Local>,
}

/// Saved clip paths in arrival order, without duplicates.
#[derive(Default)]
pub struct ClipList {
    entries: Vec<ClipEntry>,
    seen: HashSet<PathBuf>,
}

impl ClipList {
    /// Returns false when the path was already listed.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        if !self.seen.insert(path.clone()) {
            return false;
        }
        self.entries.push(ClipEntry {
            path,
            received_at: Local::now(),
        });
        true
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.iter().map(|entry| entry.path.clone()).collect()
    }

    pub fn entries(&self) -> &[ClipEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns false when the path was not listed.
    pub fn remove(&mut self, path: &Path) -> bool {
        if !self.seen.remove(path) {
            return false;
        }
        self.entries.retain(|entry| entry.path != path);
        true
    }
}
