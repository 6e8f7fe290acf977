use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{Stream, StreamExt, pin_mut};
use obws::client::{ConnectConfig, DEFAULT_BROADCAST_CAPACITY, HandshakeError};
use obws::error::Error as ObwsError;
use obws::events::Event;
use obws::requests::EventSubscription;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::events::ObsEvent;
use crate::error::{HighlightError, Result};
use crate::models::ConnectionParams;

/// Close code OBS sends when the Identify message fails authentication.
const CLOSE_AUTHENTICATION_FAILED: u16 = 4009;
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// An identified OBS WebSocket session.
///
/// Every call is bounded by the request timeout, and fails straight away once
/// OBS has gone. Events are fanned out to every [`ObsClient::subscribe`]
/// receiver; the last one is always [`ObsEvent::ConnectionLost`].
pub struct ObsClient {
    inner: obws::Client,
    events: broadcast::Sender<ObsEvent>,
    closed: Arc<AtomicBool>,
    request_timeout: Duration,
    monitor: JoinHandle<()>,
}

impl ObsClient {
    /// Connects and identifies, bounding the handshake and every later
    /// request by `request_timeout`.
    pub async fn connect(params: &ConnectionParams, request_timeout: Duration) -> Result<Self> {
        let address = params.address();
        let config = ConnectConfig {
            host: params.host.as_str(),
            port: params.port,
            dangerous: None,
            password: params.password.as_deref(),
            event_subscriptions: Some(EventSubscription::OUTPUTS),
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            connect_timeout: request_timeout,
        };
        // The version check inside connect has no deadline of its own.
        let inner = tokio::time::timeout(request_timeout, obws::Client::connect_with_config(config))
            .await
            .map_err(|_| HighlightError::Timeout("connect".to_string()))?
            .map_err(|err| connect_error(err, params))?;
        info!(%address, "Identified with OBS");

        let stream = inner.events().map_err(|_| {
            HighlightError::ConnectionClosed("closed right after identify".to_string())
        })?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let closed = Arc::new(AtomicBool::new(false));
        let monitor = tokio::spawn(watch_events(stream, events.clone(), Arc::clone(&closed)));

        Ok(Self {
            inner,
            events,
            closed,
            request_timeout,
            monitor,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ObsEvent> {
        self.events.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(super) fn api(&self) -> &obws::Client {
        &self.inner
    }

    /// Runs one request against the session, named `request_type` in errors and logs.
    pub(super) async fn call<T, F>(&self, request_type: &str, request: F) -> Result<T>
    where
        F: Future<Output = obws::error::Result<T>>,
    {
        if self.is_closed() {
            return Err(HighlightError::ConnectionClosed(format!(
                "cannot send {request_type}"
            )));
        }
        debug!(request_type, "Sending OBS request");
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => result.map_err(|err| request_error(request_type, err)),
            Err(_) => Err(HighlightError::Timeout(request_type.to_string())),
        }
    }
}

impl Drop for ObsClient {
    fn drop(&mut self) {
        self.monitor.abort();
    }
}

async fn watch_events(
    stream: impl Stream<Item = Event>,
    events: broadcast::Sender<ObsEvent>,
    closed: Arc<AtomicBool>,
) {
    pin_mut!(stream);
    // The stream also ends if it falls behind, which leaves the session unusable.
    while let Some(event) = stream.next().await {
        match ObsEvent::from_obws(event) {
            Some(ObsEvent::ConnectionLost) => break,
            Some(event) => {
                debug!(?event, "OBS event");
                let _ = events.send(event);
            }
            None => {}
        }
    }
    // Flag first, so a late subscriber either sees it or gets the event.
    closed.store(true, Ordering::SeqCst);
    info!("OBS session ended");
    let _ = events.send(ObsEvent::ConnectionLost);
}

fn connect_error(err: ObwsError, params: &ConnectionParams) -> HighlightError {
    match err {
        ObwsError::Handshake(HandshakeError::ConnectionClosed(Some(details)))
            if u16::from(details.code) == CLOSE_AUTHENTICATION_FAILED =>
        {
            if params.password.is_none() {
                HighlightError::PasswordRequired
            } else {
                HighlightError::AuthenticationFailed
            }
        }
        ObwsError::Handshake(HandshakeError::ConnectionClosed(details)) => {
            HighlightError::ConnectionClosed(match details {
                Some(details) => details.reason,
                None => "closed during handshake".to_string(),
            })
        }
        source @ (ObwsError::Connect(_) | ObwsError::Timeout) => HighlightError::Connect {
            address: params.address(),
            source,
        },
        other => request_error("GetVersion", other),
    }
}

fn request_error(request_type: &str, err: ObwsError) -> HighlightError {
    match err {
        ObwsError::Api { code, message } => HighlightError::Request {
            request_type: request_type.to_string(),
            code: format!("{code:?}"),
            comment: message.unwrap_or_default(),
        },
        ObwsError::Send(_) | ObwsError::ReceiveMessage(_) | ObwsError::Disconnected => {
            HighlightError::ConnectionClosed(format!("no response to {request_type}"))
        }
        other => HighlightError::Obs(other),
    }
}
