//! Sessions against a live server on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use kurbo::Point;
use pathgraph_core::graph::NodeId;
use pathgraph_core::protocol::{
    Algorithm, ClientMessage, ServerMessage, decode_server_message, encode_client_message,
};
use pathgraph_server::{AppState, app};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = app(Arc::new(AppState::new(64)));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    ws
}

async fn send(client: &mut Client, msg: ClientMessage) {
    client
        .send(Message::Binary(encode_client_message(&msg).into()))
        .await
        .unwrap();
}

async fn recv(client: &mut Client) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for server")
            .expect("connection closed")
            .unwrap();
        if let Message::Binary(data) = frame {
            return decode_server_message(&data).unwrap().expect("empty command");
        }
    }
}

async fn add_node(client: &mut Client, x: f64, y: f64) -> NodeId {
    send(client, ClientMessage::AddNode { position: Point::new(x, y) }).await;
    match recv(client).await {
        ServerMessage::NodeAdded { id, .. } => id,
        other => panic!("expected NodeAdded, got {:?}", other),
    }
}

#[tokio::test]
async fn test_mutations_echo_to_sender() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;

    send(&mut client, ClientMessage::AddNode { position: Point::new(12.5, -4.0) }).await;
    assert_eq!(
        recv(&mut client).await,
        ServerMessage::NodeAdded {
            id: NodeId(0),
            position: Point::new(12.5, -4.0),
        }
    );
}

#[tokio::test]
async fn test_mutations_reach_other_clients() {
    let addr = spawn_server().await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;

    let a = add_node(&mut alice, 0.0, 0.0).await;
    assert!(matches!(recv(&mut bob).await, ServerMessage::NodeAdded { id, .. } if id == a));

    send(&mut bob, ClientMessage::RemoveNode { id: a }).await;
    assert_eq!(recv(&mut alice).await, ServerMessage::NodeRemoved { id: a });
    assert_eq!(recv(&mut bob).await, ServerMessage::NodeRemoved { id: a });
}

#[tokio::test]
async fn test_late_joiner_gets_snapshot() {
    let addr = spawn_server().await;
    let mut alice = connect(addr).await;
    let a = add_node(&mut alice, 0.0, 0.0).await;
    let b = add_node(&mut alice, 50.0, 0.0).await;
    send(&mut alice, ClientMessage::AddConnection { from: a, to: b }).await;
    assert_eq!(recv(&mut alice).await, ServerMessage::ConnectionAdded { from: a, to: b });

    let mut bob = connect(addr).await;
    assert_eq!(
        recv(&mut bob).await,
        ServerMessage::NodeAdded { id: a, position: Point::new(0.0, 0.0) }
    );
    assert_eq!(
        recv(&mut bob).await,
        ServerMessage::NodeAdded { id: b, position: Point::new(50.0, 0.0) }
    );
    assert_eq!(recv(&mut bob).await, ServerMessage::ConnectionAdded { from: a, to: b });
}

#[tokio::test]
async fn test_path_result_goes_to_requester_only() {
    let addr = spawn_server().await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;

    let a = add_node(&mut alice, 0.0, 0.0).await;
    let b = add_node(&mut alice, 10.0, 0.0).await;
    let c = add_node(&mut alice, 20.0, 0.0).await;
    for (from, to) in [(a, b), (b, c)] {
        send(&mut alice, ClientMessage::AddConnection { from, to }).await;
        assert_eq!(recv(&mut alice).await, ServerMessage::ConnectionAdded { from, to });
    }

    send(
        &mut alice,
        ClientMessage::FindPath { start: a, goal: c, algorithm: Algorithm::AStar },
    )
    .await;
    assert_eq!(recv(&mut alice).await, ServerMessage::PathResult { nodes: vec![a, b, c] });

    // Bob saw the five mutations, then the next one, never the path
    for _ in 0..5 {
        recv(&mut bob).await;
    }
    let d = add_node(&mut alice, 30.0, 0.0).await;
    assert!(matches!(recv(&mut bob).await, ServerMessage::NodeAdded { id, .. } if id == d));
}

#[tokio::test]
async fn test_rejected_commands_are_silent() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;
    let a = add_node(&mut client, 0.0, 0.0).await;

    // Self-loop, unknown node, garbage frame and a text frame change nothing
    send(&mut client, ClientMessage::AddConnection { from: a, to: a }).await;
    send(&mut client, ClientMessage::RemoveNode { id: NodeId(77) }).await;
    client.send(Message::Binary(vec![0xff, 0xff, 0xff].into())).await.unwrap();
    client.send(Message::Text("hello".into())).await.unwrap();

    let b = add_node(&mut client, 10.0, 0.0).await;
    assert_eq!(b, NodeId(1));
}
