//! PathGraph Core Library
//!
//! Platform-agnostic client state for the PathGraph editor: the graph
//! mirror, camera, tools, wire protocol and transports.

pub mod camera;
pub mod canvas;
pub mod config;
pub mod editor;
pub mod graph;
pub mod hit;
pub mod input;
pub mod protocol;
pub mod sync;
pub mod tools;

pub use camera::Camera;
pub use canvas::Canvas;
pub use config::{ConfigError, EditorConfig};
pub use editor::Editor;
pub use graph::{Connection, ConnectionKey, GraphMirror, Node, NodeId};
pub use hit::{DEFAULT_PICK_RADIUS, hit_test};
pub use input::{InputEvent, InputState, MouseButton};
pub use protocol::{Algorithm, ClientMessage, ProtocolError, ServerMessage};
pub use sync::{ConnectionState, MemoryTransport, PlatformWebSocket, SyncError, SyncEvent, Transport, connect_platform};
pub use tools::{ToolKind, ToolManager, ToolState};
