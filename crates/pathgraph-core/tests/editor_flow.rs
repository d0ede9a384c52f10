//! End-to-end editing flows against a scripted server.

use kurbo::Point;
use pathgraph_core::protocol::{decode_client_message, encode_server_message};
use pathgraph_core::{
    ClientMessage, Editor, EditorConfig, InputEvent, MemoryTransport, MouseButton, NodeId,
    ServerMessage, SyncEvent, ToolKind,
};

/// Answers client commands the way the server would, minus path search.
#[derive(Default)]
struct ScriptedServer {
    next_id: i32,
}

impl ScriptedServer {
    fn answer(&mut self, frame: &[u8]) -> Vec<ServerMessage> {
        match decode_client_message(frame).unwrap() {
            Some(ClientMessage::AddNode { position }) => {
                let id = NodeId(self.next_id);
                self.next_id += 1;
                vec![ServerMessage::NodeAdded { id, position }]
            }
            Some(ClientMessage::RemoveNode { id }) => vec![ServerMessage::NodeRemoved { id }],
            Some(ClientMessage::AddConnection { from, to }) => {
                vec![ServerMessage::ConnectionAdded { from, to }]
            }
            Some(ClientMessage::RemoveConnection { from, to }) => {
                vec![ServerMessage::ConnectionRemoved { from, to }]
            }
            Some(ClientMessage::FindPath { start, goal, .. }) => {
                vec![ServerMessage::PathResult { nodes: vec![start, goal] }]
            }
            None => Vec::new(),
        }
    }
}

/// Deliver everything the editor sent and poll the replies back in.
fn round_trip(editor: &mut Editor<MemoryTransport>, server: &mut ScriptedServer) {
    let frames = editor.transport().take_sent();
    for frame in frames {
        for reply in server.answer(&frame) {
            // Replies arrive as raw frames, like off a socket
            editor.transport_mut().push_frame(&encode_server_message(&reply));
        }
    }
    editor.poll_transport();
}

fn click(editor: &mut Editor<MemoryTransport>, x: f64, y: f64) {
    editor.handle_event(InputEvent::Click {
        position: Point::new(x, y),
        button: MouseButton::Left,
    });
}

fn connected_editor() -> Editor<MemoryTransport> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut transport = MemoryTransport::new();
    transport.push_event(SyncEvent::Connected);
    let mut editor = Editor::new(&EditorConfig::default(), transport);
    editor.poll_transport();
    editor
}

#[test]
fn test_build_graph_and_find_path() {
    let mut editor = connected_editor();
    let mut server = ScriptedServer::default();

    editor.handle_event(InputEvent::SelectTool(ToolKind::AddNode));
    click(&mut editor, 100.0, 100.0);
    click(&mut editor, 300.0, 100.0);
    round_trip(&mut editor, &mut server);
    assert_eq!(editor.canvas().graph.node_count(), 2);

    editor.handle_event(InputEvent::SelectTool(ToolKind::AddConnection));
    click(&mut editor, 100.0, 100.0);
    click(&mut editor, 300.0, 100.0);
    round_trip(&mut editor, &mut server);
    assert!(editor.canvas().graph.find_connection(NodeId(0), NodeId(1)).is_some());

    editor.handle_event(InputEvent::SelectTool(ToolKind::SetStart));
    click(&mut editor, 100.0, 100.0);
    editor.handle_event(InputEvent::SelectTool(ToolKind::SetGoal));
    click(&mut editor, 300.0, 100.0);
    editor.handle_event(InputEvent::FindPath);
    round_trip(&mut editor, &mut server);

    let graph = &editor.canvas().graph;
    assert!(graph.find_node(NodeId(0)).unwrap().active);
    assert!(graph.find_node(NodeId(1)).unwrap().active);
    assert!(graph.find_connection(NodeId(0), NodeId(1)).unwrap().active);
}

#[test]
fn test_remove_node_cascades_in_mirror() {
    let mut editor = connected_editor();
    let mut server = ScriptedServer::default();

    editor.handle_event(InputEvent::SelectTool(ToolKind::AddNode));
    for x in [0.0, 200.0, 400.0] {
        click(&mut editor, x, 0.0);
    }
    round_trip(&mut editor, &mut server);

    editor.handle_event(InputEvent::SelectTool(ToolKind::AddConnection));
    click(&mut editor, 0.0, 0.0);
    click(&mut editor, 200.0, 0.0);
    click(&mut editor, 200.0, 0.0);
    click(&mut editor, 400.0, 0.0);
    round_trip(&mut editor, &mut server);
    assert_eq!(editor.canvas().graph.connection_count(), 2);

    editor.handle_event(InputEvent::SelectTool(ToolKind::RemoveNode));
    click(&mut editor, 200.0, 0.0);
    round_trip(&mut editor, &mut server);

    let graph = &editor.canvas().graph;
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.connection_count(), 0);
}

#[test]
fn test_commands_while_offline_are_dropped() {
    let mut editor = connected_editor();
    editor.transport_mut().push_event(SyncEvent::Disconnected);
    editor.poll_transport();
    assert!(editor.connection_error());

    editor.handle_event(InputEvent::SelectTool(ToolKind::AddNode));
    click(&mut editor, 10.0, 10.0);
    click(&mut editor, 20.0, 10.0);

    assert_eq!(editor.transport().bytes_sent(), 0);
    assert_eq!(editor.dropped_commands(), 2);
    assert!(editor.canvas().graph.is_empty());
}

#[test]
fn test_garbage_frames_are_skipped() {
    let mut editor = connected_editor();
    let transport = editor.transport_mut();
    transport.push_frame(&[0xff, 0xff, 0xff]);
    transport.push_frame(&[]);
    transport.push_frame(&encode_server_message(&ServerMessage::NodeAdded {
        id: NodeId(9),
        position: Point::new(1.0, 2.0),
    }));

    assert_eq!(editor.poll_transport(), 1);
    assert!(editor.canvas().graph.find_node(NodeId(9)).is_some());
}
