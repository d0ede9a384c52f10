//! Browser WebSocket client.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, ErrorEvent, MessageEvent, WebSocket};

use super::{ConnectionState, SyncError, SyncEvent, Transport, frame_to_event};

/// WebSocket client for WASM.
///
/// Events are collected by the socket callbacks and must be polled via
/// `poll_events()`.
pub struct WasmWebSocket {
    ws: Option<WebSocket>,
    state: ConnectionState,
    events: Rc<RefCell<Vec<SyncEvent>>>,
    // Store closures to prevent them from being dropped
    _on_open: Option<Closure<dyn Fn()>>,
    _on_message: Option<Closure<dyn Fn(MessageEvent)>>,
    _on_close: Option<Closure<dyn Fn(CloseEvent)>>,
    _on_error: Option<Closure<dyn Fn(ErrorEvent)>>,
}

impl WasmWebSocket {
    /// Create a new disconnected WebSocket client.
    pub fn new() -> Self {
        Self {
            ws: None,
            state: ConnectionState::Disconnected,
            events: Rc::new(RefCell::new(Vec::new())),
            _on_open: None,
            _on_message: None,
            _on_close: None,
            _on_error: None,
        }
    }

    /// Connect to a WebSocket server.
    pub fn connect(&mut self, url: &str) -> Result<(), SyncError> {
        if self.ws.is_some() {
            return Err(SyncError::AlreadyConnected);
        }

        let ws = WebSocket::new(url).map_err(|e| SyncError::InvalidUrl(format!("{:?}", e)))?;
        ws.set_binary_type(web_sys::BinaryType::Arraybuffer);

        self.state = ConnectionState::Connecting;
        let events = self.events.clone();

        let events_open = events.clone();
        let on_open = Closure::wrap(Box::new(move || {
            events_open.borrow_mut().push(SyncEvent::Connected);
        }) as Box<dyn Fn()>);
        ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));

        let events_msg = events.clone();
        let on_message = Closure::wrap(Box::new(move |e: MessageEvent| {
            match e.data().dyn_into::<js_sys::ArrayBuffer>() {
                Ok(buffer) => {
                    let frame = js_sys::Uint8Array::new(&buffer).to_vec();
                    if let Some(event) = frame_to_event(&frame) {
                        events_msg.borrow_mut().push(event);
                    }
                }
                Err(_) => log::warn!("Ignoring non-binary WebSocket message"),
            }
        }) as Box<dyn Fn(MessageEvent)>);
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        let events_close = events.clone();
        let on_close = Closure::wrap(Box::new(move |_e: CloseEvent| {
            events_close.borrow_mut().push(SyncEvent::Disconnected);
        }) as Box<dyn Fn(CloseEvent)>);
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        let events_err = events;
        let on_error = Closure::wrap(Box::new(move |_e: ErrorEvent| {
            events_err.borrow_mut().push(SyncEvent::Error {
                message: "WebSocket error".to_string(),
            });
        }) as Box<dyn Fn(ErrorEvent)>);
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        self.ws = Some(ws);
        self._on_open = Some(on_open);
        self._on_message = Some(on_message);
        self._on_close = Some(on_close);
        self._on_error = Some(on_error);

        Ok(())
    }

    /// Disconnect from the server.
    pub fn disconnect(&mut self) {
        if let Some(ws) = self.ws.take() {
            let _ = ws.close();
        }
        self.state = ConnectionState::Disconnected;
        self._on_open = None;
        self._on_message = None;
        self._on_close = None;
        self._on_error = None;
    }
}

impl Transport for WasmWebSocket {
    fn state(&self) -> ConnectionState {
        self.state
    }

    fn is_connected(&self) -> bool {
        // The browser knows before our polled state does
        self.ws
            .as_ref()
            .is_some_and(|ws| ws.ready_state() == WebSocket::OPEN)
    }

    fn send(&self, frame: Vec<u8>) -> Result<(), SyncError> {
        match self.ws {
            Some(ref ws) if ws.ready_state() == WebSocket::OPEN => ws
                .send_with_u8_array(&frame)
                .map_err(|e| SyncError::SendFailed(format!("{:?}", e))),
            _ => Err(SyncError::NotConnected),
        }
    }

    fn poll_events(&mut self) -> Vec<SyncEvent> {
        let mut events = self.events.borrow_mut();
        for event in events.iter() {
            self.state = self.state.after(event);
        }
        std::mem::take(&mut *events)
    }
}

impl Default for WasmWebSocket {
    fn default() -> Self {
        Self::new()
    }
}
