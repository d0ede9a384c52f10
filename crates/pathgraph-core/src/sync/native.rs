//! Native WebSocket client.

use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tungstenite::{Message, connect};
use url::Url;

use super::{ConnectionState, SyncError, SyncEvent, Transport, frame_to_event};

/// Commands sent to the WebSocket thread.
enum WsCommand {
    Send(Vec<u8>),
    Close,
}

/// WebSocket client for native platforms.
///
/// Uses a background thread for non-blocking operation.
pub struct NativeWebSocket {
    state: ConnectionState,
    events: Vec<SyncEvent>,
    /// Channel to send commands to the WebSocket thread.
    cmd_tx: Option<Sender<WsCommand>>,
    /// Channel to receive events from the WebSocket thread.
    event_rx: Option<Receiver<SyncEvent>>,
    /// Handle to the WebSocket thread.
    _thread: Option<JoinHandle<()>>,
}

impl NativeWebSocket {
    /// Create a new disconnected WebSocket client.
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            events: Vec::new(),
            cmd_tx: None,
            event_rx: None,
            _thread: None,
        }
    }

    /// Connect to a WebSocket server.
    pub fn connect(&mut self, url: &str) -> Result<(), SyncError> {
        if self.cmd_tx.is_some() {
            return Err(SyncError::AlreadyConnected);
        }

        let parsed_url = Url::parse(url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
        // Built without TLS support, so only plain sockets
        if parsed_url.scheme() != "ws" {
            return Err(SyncError::InvalidUrl(format!(
                "unsupported scheme: {}",
                parsed_url.scheme()
            )));
        }

        self.state = ConnectionState::Connecting;

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<SyncEvent>();
        let url = url.to_string();

        let handle = thread::spawn(move || run_socket(&url, &cmd_rx, &event_tx));

        self.cmd_tx = Some(cmd_tx);
        self.event_rx = Some(event_rx);
        self._thread = Some(handle);

        Ok(())
    }

    /// Disconnect from the server.
    pub fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WsCommand::Close);
        }
        self.event_rx = None;
        self._thread = None;
        self.state = ConnectionState::Disconnected;
    }
}

/// Socket loop run on the background thread.
fn run_socket(url: &str, cmd_rx: &Receiver<WsCommand>, event_tx: &Sender<SyncEvent>) {
    log::info!("WebSocket thread: connecting to {}", url);

    let (mut socket, response) = match connect(url) {
        Ok(pair) => pair,
        Err(e) => {
            log::error!("WebSocket connection failed: {}", e);
            let _ = event_tx.send(SyncEvent::Error {
                message: SyncError::ConnectFailed(e.to_string()).to_string(),
            });
            return;
        }
    };

    log::info!("WebSocket connected, status: {}", response.status());
    let _ = event_tx.send(SyncEvent::Connected);

    // Short read timeout so outbound commands are not starved by a quiet socket
    if let tungstenite::stream::MaybeTlsStream::Plain(tcp) = socket.get_mut() {
        let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
        let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
    }

    loop {
        match cmd_rx.try_recv() {
            Ok(WsCommand::Send(frame)) => {
                log::debug!("WebSocket sending {} bytes", frame.len());
                if let Err(e) = socket.send(Message::Binary(frame)) {
                    log::error!("WebSocket send error: {}", e);
                    break;
                }
            }
            Ok(WsCommand::Close) => {
                log::info!("WebSocket close requested");
                let _ = socket.close(None);
                break;
            }
            Err(TryRecvError::Disconnected) => {
                log::info!("WebSocket command channel disconnected");
                break;
            }
            Err(TryRecvError::Empty) => {}
        }

        match socket.read() {
            Ok(Message::Binary(frame)) => {
                if let Some(event) = frame_to_event(&frame) {
                    let _ = event_tx.send(event);
                }
            }
            Ok(Message::Text(txt)) => {
                log::warn!("Ignoring text frame ({} bytes)", txt.len());
            }
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                log::info!("WebSocket received close frame");
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                log::error!("WebSocket read error: {}", e);
                break;
            }
        }
    }

    log::info!("WebSocket thread exiting");
    let _ = event_tx.send(SyncEvent::Disconnected);
}

impl Transport for NativeWebSocket {
    fn state(&self) -> ConnectionState {
        self.state
    }

    fn send(&self, frame: Vec<u8>) -> Result<(), SyncError> {
        match self.cmd_tx {
            Some(ref tx) if self.state == ConnectionState::Connected => tx
                .send(WsCommand::Send(frame))
                .map_err(|e| SyncError::SendFailed(e.to_string())),
            _ => Err(SyncError::NotConnected),
        }
    }

    fn poll_events(&mut self) -> Vec<SyncEvent> {
        if let Some(ref rx) = self.event_rx {
            while let Ok(event) = rx.try_recv() {
                self.state = self.state.after(&event);
                self.events.push(event);
            }
        }

        std::mem::take(&mut self.events)
    }
}

impl Default for NativeWebSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NativeWebSocket {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_disconnected() {
        let ws = NativeWebSocket::new();
        assert_eq!(ws.state(), ConnectionState::Disconnected);
        assert_eq!(ws.send(vec![1, 2, 3]), Err(SyncError::NotConnected));
    }

    #[test]
    fn test_rejects_bad_scheme() {
        let mut ws = NativeWebSocket::new();
        let err = ws.connect("http://127.0.0.1:8888").unwrap_err();
        assert!(matches!(err, SyncError::InvalidUrl(_)));
        assert_eq!(ws.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_rejects_tls_scheme() {
        let mut ws = NativeWebSocket::new();
        let err = ws.connect("wss://127.0.0.1:8888/ws").unwrap_err();
        assert!(matches!(err, SyncError::InvalidUrl(ref msg) if msg.contains("wss")));
        assert_eq!(ws.state(), ConnectionState::Disconnected);
        assert_eq!(ws.send(vec![1]), Err(SyncError::NotConnected));
    }

    #[test]
    fn test_rejects_garbage_url() {
        let mut ws = NativeWebSocket::new();
        assert!(matches!(ws.connect("not a url"), Err(SyncError::InvalidUrl(_))));
    }
}
