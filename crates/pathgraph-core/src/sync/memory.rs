//! In-memory transport.

use std::cell::RefCell;
use std::collections::VecDeque;

use super::{ConnectionState, SyncError, SyncEvent, Transport, frame_to_event};
use crate::protocol::{ClientMessage, ServerMessage, decode_client_message};

/// In-memory transport for testing and headless use.
///
/// Sent frames are recorded; inbound events are queued by the caller and
/// handed out on the next poll, exactly like a socket would.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    state: ConnectionState,
    sent: RefCell<Vec<Vec<u8>>>,
    inbox: VecDeque<SyncEvent>,
}

impl MemoryTransport {
    /// Create a disconnected transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport that is already connected.
    pub fn connected() -> Self {
        Self {
            state: ConnectionState::Connected,
            ..Self::default()
        }
    }

    /// Queue an event for the next poll.
    pub fn push_event(&mut self, event: SyncEvent) {
        self.inbox.push_back(event);
    }

    /// Queue a server message for the next poll.
    pub fn push_message(&mut self, msg: ServerMessage) {
        self.push_event(SyncEvent::Message(msg));
    }

    /// Queue a raw inbound frame, decoded the way a socket would.
    pub fn push_frame(&mut self, frame: &[u8]) {
        if let Some(event) = frame_to_event(frame) {
            self.push_event(event);
        }
    }

    /// Total bytes sent so far.
    pub fn bytes_sent(&self) -> usize {
        self.sent.borrow().iter().map(Vec::len).sum()
    }

    /// Drain the recorded frames.
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.sent.borrow_mut())
    }

    /// Decode the recorded frames without draining them.
    pub fn sent_messages(&self) -> Vec<ClientMessage> {
        self.sent
            .borrow()
            .iter()
            .filter_map(|frame| decode_client_message(frame).ok().flatten())
            .collect()
    }
}

impl Transport for MemoryTransport {
    fn state(&self) -> ConnectionState {
        self.state
    }

    fn send(&self, frame: Vec<u8>) -> Result<(), SyncError> {
        if self.state != ConnectionState::Connected {
            return Err(SyncError::NotConnected);
        }
        self.sent.borrow_mut().push(frame);
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<SyncEvent> {
        let events: Vec<SyncEvent> = self.inbox.drain(..).collect();
        for event in &events {
            self.state = self.state.after(event);
        }
        events
    }
}
