use std::io;

use tokio::net::UdpSocket;
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, warn};

use crate::constants::UDP_DATAGRAM_SIZE;

pub async fn bind(addr: &str) -> io::Result<UdpSocket> {
    let socket = UdpSocket::bind(addr).await?;
    info!(addr = %socket.local_addr()?, "Listening for game events");
    Ok(socket)
}

/// Forwards every UTF-8 datagram to `tx` until the receiving side goes away.
///
/// Receive errors only cost the datagram that caused them.
pub async fn forward_datagrams(socket: UdpSocket, tx: Sender<String>) {
    let mut buf = [0u8; UDP_DATAGRAM_SIZE];
    loop {
        let (size, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(err) => {
                warn!(error = %err, "Failed to receive datagram");
                continue;
            }
        };
        let payload = match std::str::from_utf8(&buf[..size]) {
            Ok(text) => text.to_string(),
            Err(err) => {
                warn!(%peer, error = %err, "Dropping non UTF-8 datagram");
                continue;
            }
        };
        debug!(%peer, payload = %payload, "Datagram received");
        if tx.send(payload).await.is_err() {
            debug!("Game event receiver closed, stopping UDP listener");
            return;
        }
    }
}
