//! Binary wire protocol between the client and the graph server.
//!
//! Frames are protobuf messages. Each direction has one envelope carrying a
//! `oneof` over the possible commands; the [`wire`] module holds the
//! prost-derived definitions and the rest of this module maps them onto
//! the [`ClientMessage`] and [`ServerMessage`] sum types the engine works
//! with.
//!
//! The codec only marshals. It never checks ids against the graph; that is
//! the mirror's job.

use kurbo::Point;
use prost::Message;
use thiserror::Error;

use crate::graph::NodeId;

pub use wire::Algorithm;

/// Protobuf definitions.
///
/// ```text
/// message ToServerCommand {
///   oneof command {
///     AddNode add_node = 1;
///     RemoveNode remove_node = 2;
///     AddConnection add_connection = 3;
///     RemoveConnection remove_connection = 4;
///     FindPath find_path = 5;
///   }
/// }
///
/// message ToClientCommand {
///   oneof command {
///     NodeAdded node_added = 1;
///     NodeRemoved node_removed = 2;
///     ConnectionAdded connection_added = 3;
///     ConnectionRemoved connection_removed = 4;
///     PathResult path_result = 5;
///   }
/// }
/// ```
pub mod wire {
    use serde::{Deserialize, Serialize};

    /// Path search strategy requested from the server.
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ::prost::Enumeration,
    )]
    #[serde(rename_all = "snake_case")]
    #[repr(i32)]
    pub enum Algorithm {
        BreadthFirst = 0,
        Dijkstra = 1,
        AStar = 2,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct AddNode {
        #[prost(float, tag = "1")]
        pub x: f32,
        #[prost(float, tag = "2")]
        pub y: f32,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct RemoveNode {
        #[prost(int32, tag = "1")]
        pub id: i32,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct AddConnection {
        #[prost(int32, tag = "1")]
        pub id1: i32,
        #[prost(int32, tag = "2")]
        pub id2: i32,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct RemoveConnection {
        #[prost(int32, tag = "1")]
        pub id1: i32,
        #[prost(int32, tag = "2")]
        pub id2: i32,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct FindPath {
        #[prost(int32, tag = "1")]
        pub start: i32,
        #[prost(int32, tag = "2")]
        pub goal: i32,
        #[prost(enumeration = "Algorithm", tag = "3")]
        pub algorithm: i32,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct NodeAdded {
        #[prost(int32, tag = "1")]
        pub id: i32,
        #[prost(float, tag = "2")]
        pub x: f32,
        #[prost(float, tag = "3")]
        pub y: f32,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct NodeRemoved {
        #[prost(int32, tag = "1")]
        pub id: i32,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct ConnectionAdded {
        #[prost(int32, tag = "1")]
        pub id1: i32,
        #[prost(int32, tag = "2")]
        pub id2: i32,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct ConnectionRemoved {
        #[prost(int32, tag = "1")]
        pub id1: i32,
        #[prost(int32, tag = "2")]
        pub id2: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PathResult {
        #[prost(int32, repeated, tag = "1")]
        pub nodes: Vec<i32>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ToServerCommand {
        #[prost(oneof = "to_server_command::Command", tags = "1, 2, 3, 4, 5")]
        pub command: Option<to_server_command::Command>,
    }

    pub mod to_server_command {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Command {
            #[prost(message, tag = "1")]
            AddNode(super::AddNode),
            #[prost(message, tag = "2")]
            RemoveNode(super::RemoveNode),
            #[prost(message, tag = "3")]
            AddConnection(super::AddConnection),
            #[prost(message, tag = "4")]
            RemoveConnection(super::RemoveConnection),
            #[prost(message, tag = "5")]
            FindPath(super::FindPath),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ToClientCommand {
        #[prost(oneof = "to_client_command::Command", tags = "1, 2, 3, 4, 5")]
        pub command: Option<to_client_command::Command>,
    }

    pub mod to_client_command {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Command {
            #[prost(message, tag = "1")]
            NodeAdded(super::NodeAdded),
            #[prost(message, tag = "2")]
            NodeRemoved(super::NodeRemoved),
            #[prost(message, tag = "3")]
            ConnectionAdded(super::ConnectionAdded),
            #[prost(message, tag = "4")]
            ConnectionRemoved(super::ConnectionRemoved),
            #[prost(message, tag = "5")]
            PathResult(super::PathResult),
        }
    }
}

/// Codec errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("Unknown path algorithm: {0}")]
    UnknownAlgorithm(i32),
}

/// Commands sent to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Ask the server to create a node at a world position.
    AddNode { position: Point },
    RemoveNode { id: NodeId },
    AddConnection { from: NodeId, to: NodeId },
    RemoveConnection { from: NodeId, to: NodeId },
    /// Ask the server for a path from `start` to `goal`.
    FindPath {
        start: NodeId,
        goal: NodeId,
        algorithm: Algorithm,
    },
}

/// Mutations and results received from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    NodeAdded { id: NodeId, position: Point },
    NodeRemoved { id: NodeId },
    ConnectionAdded { from: NodeId, to: NodeId },
    ConnectionRemoved { from: NodeId, to: NodeId },
    /// Ordered node ids of the most recent path, empty when none was found.
    PathResult { nodes: Vec<NodeId> },
}

fn point_from_wire(x: f32, y: f32) -> Point {
    Point::new(f64::from(x), f64::from(y))
}

impl From<&ClientMessage> for wire::ToServerCommand {
    fn from(msg: &ClientMessage) -> Self {
        use wire::to_server_command::Command;

        let command = match *msg {
            ClientMessage::AddNode { position } => Command::AddNode(wire::AddNode {
                x: position.x as f32,
                y: position.y as f32,
            }),
            ClientMessage::RemoveNode { id } => Command::RemoveNode(wire::RemoveNode { id: id.0 }),
            ClientMessage::AddConnection { from, to } => Command::AddConnection(wire::AddConnection {
                id1: from.0,
                id2: to.0,
            }),
            ClientMessage::RemoveConnection { from, to } => {
                Command::RemoveConnection(wire::RemoveConnection { id1: from.0, id2: to.0 })
            }
            ClientMessage::FindPath { start, goal, algorithm } => Command::FindPath(wire::FindPath {
                start: start.0,
                goal: goal.0,
                algorithm: algorithm.into(),
            }),
        };

        Self { command: Some(command) }
    }
}

impl TryFrom<wire::to_server_command::Command> for ClientMessage {
    type Error = ProtocolError;

    fn try_from(command: wire::to_server_command::Command) -> Result<Self, Self::Error> {
        use wire::to_server_command::Command;

        Ok(match command {
            Command::AddNode(c) => ClientMessage::AddNode { position: point_from_wire(c.x, c.y) },
            Command::RemoveNode(c) => ClientMessage::RemoveNode { id: NodeId(c.id) },
            Command::AddConnection(c) => ClientMessage::AddConnection {
                from: NodeId(c.id1),
                to: NodeId(c.id2),
            },
            Command::RemoveConnection(c) => ClientMessage::RemoveConnection {
                from: NodeId(c.id1),
                to: NodeId(c.id2),
            },
            Command::FindPath(c) => ClientMessage::FindPath {
                start: NodeId(c.start),
                goal: NodeId(c.goal),
                algorithm: Algorithm::try_from(c.algorithm)
                    .map_err(|_| ProtocolError::UnknownAlgorithm(c.algorithm))?,
            },
        })
    }
}

impl From<&ServerMessage> for wire::ToClientCommand {
    fn from(msg: &ServerMessage) -> Self {
        use wire::to_client_command::Command;

        let command = match msg {
            ServerMessage::NodeAdded { id, position } => Command::NodeAdded(wire::NodeAdded {
                id: id.0,
                x: position.x as f32,
                y: position.y as f32,
            }),
            ServerMessage::NodeRemoved { id } => Command::NodeRemoved(wire::NodeRemoved { id: id.0 }),
            ServerMessage::ConnectionAdded { from, to } => {
                Command::ConnectionAdded(wire::ConnectionAdded { id1: from.0, id2: to.0 })
            }
            ServerMessage::ConnectionRemoved { from, to } => {
                Command::ConnectionRemoved(wire::ConnectionRemoved { id1: from.0, id2: to.0 })
            }
            ServerMessage::PathResult { nodes } => Command::PathResult(wire::PathResult {
                nodes: nodes.iter().map(|id| id.0).collect(),
            }),
        };

        Self { command: Some(command) }
    }
}

impl From<wire::to_client_command::Command> for ServerMessage {
    fn from(command: wire::to_client_command::Command) -> Self {
        use wire::to_client_command::Command;

        match command {
            Command::NodeAdded(c) => ServerMessage::NodeAdded {
                id: NodeId(c.id),
                position: point_from_wire(c.x, c.y),
            },
            Command::NodeRemoved(c) => ServerMessage::NodeRemoved { id: NodeId(c.id) },
            Command::ConnectionAdded(c) => ServerMessage::ConnectionAdded {
                from: NodeId(c.id1),
                to: NodeId(c.id2),
            },
            Command::ConnectionRemoved(c) => ServerMessage::ConnectionRemoved {
                from: NodeId(c.id1),
                to: NodeId(c.id2),
            },
            Command::PathResult(c) => ServerMessage::PathResult {
                nodes: c.nodes.into_iter().map(NodeId).collect(),
            },
        }
    }
}

/// Encode a command for the server.
pub fn encode_client_message(msg: &ClientMessage) -> Vec<u8> {
    wire::ToServerCommand::from(msg).encode_to_vec()
}

/// Decode a command sent by a client.
///
/// Returns `Ok(None)` for a frame with no command set.
pub fn decode_client_message(bytes: &[u8]) -> Result<Option<ClientMessage>, ProtocolError> {
    let frame = wire::ToServerCommand::decode(bytes)?;
    frame.command.map(ClientMessage::try_from).transpose()
}

/// Encode a server message for a client.
pub fn encode_server_message(msg: &ServerMessage) -> Vec<u8> {
    wire::ToClientCommand::from(msg).encode_to_vec()
}

/// Decode a message received from the server.
///
/// Returns `Ok(None)` for a frame with no command set, which callers treat
/// as a no-op.
pub fn decode_server_message(bytes: &[u8]) -> Result<Option<ServerMessage>, ProtocolError> {
    let frame = wire::ToClientCommand::decode(bytes)?;
    Ok(frame.command.map(ServerMessage::from))
}
