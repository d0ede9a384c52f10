//! Transports between the editor and the graph server.
//!
//! A transport moves encoded frames out and hands decoded server messages
//! back through [`Transport::poll_events`]. It never blocks the caller:
//! reads happen in the background and pile up until polled.

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod native;

#[cfg(target_arch = "wasm32")]
mod wasm;

pub use memory::MemoryTransport;

#[cfg(not(target_arch = "wasm32"))]
pub use native::NativeWebSocket;

#[cfg(target_arch = "wasm32")]
pub use wasm::WasmWebSocket;

/// WebSocket client for the current target.
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformWebSocket = NativeWebSocket;

/// WebSocket client for the current target.
#[cfg(target_arch = "wasm32")]
pub type PlatformWebSocket = WasmWebSocket;

use thiserror::Error;

use crate::config::EditorConfig;
use crate::protocol::{ServerMessage, decode_server_message};

/// Transport errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Not connected")]
    NotConnected,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Connection failed: {0}")]
    ConnectFailed(String),
    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events from a transport
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Connected to server
    Connected,
    /// Disconnected from server
    Disconnected,
    /// A decoded server message
    Message(ServerMessage),
    /// Error occurred
    Error { message: String },
}

impl ConnectionState {
    /// Fold an event into the state.
    pub fn after(self, event: &SyncEvent) -> Self {
        match event {
            SyncEvent::Connected => ConnectionState::Connected,
            SyncEvent::Disconnected => ConnectionState::Disconnected,
            SyncEvent::Error { .. } => ConnectionState::Error,
            SyncEvent::Message(_) => self,
        }
    }
}

/// A message-oriented connection to the server.
pub trait Transport {
    /// Get current connection state.
    fn state(&self) -> ConnectionState;

    /// Check if connected.
    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Send one binary frame.
    fn send(&self, frame: Vec<u8>) -> Result<(), SyncError>;

    /// Poll for pending events (non-blocking).
    fn poll_events(&mut self) -> Vec<SyncEvent>;
}

/// Open the platform socket against the configured server.
///
/// Returns once the connection attempt has started; `SyncEvent::Connected`
/// arrives through a later poll.
pub fn connect_platform(config: &EditorConfig) -> Result<PlatformWebSocket, SyncError> {
    let mut socket = PlatformWebSocket::new();
    socket.connect(&config.server_url)?;
    Ok(socket)
}

/// Decode an inbound binary frame into an event.
///
/// Frames without a command, or that fail to decode, produce nothing.
pub(crate) fn frame_to_event(frame: &[u8]) -> Option<SyncEvent> {
    match decode_server_message(frame) {
        Ok(Some(msg)) => Some(SyncEvent::Message(msg)),
        Ok(None) => {
            log::debug!("Ignoring frame with no command set");
            None
        }
        Err(e) => {
            log::warn!("Dropping malformed frame ({} bytes): {}", frame.len(), e);
            None
        }
    }
}
