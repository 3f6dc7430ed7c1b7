//! End-to-end checks across the background threads: document ingest from
//! disk and a live channel talking to a local WebSocket server.
#![allow(missing_docs)]

use std::net::TcpListener;
use std::thread::JoinHandle;
use std::time::Duration;

use glam::Vec3;
use trajview::codec::document::{DeltaMessage, StateChange, TrajectoryDocument};
use trajview::engine::TransformEngine;
use trajview::ingest::FrameIngestPipeline;
use trajview::live::{ConnectionState, FrameDelta, LiveEvent, LiveFrameChannel};
use trajview::options::{EngineOptions, Options, StreamOptions};
use trajview::session::Session;
use trajview::trajectory::{Frame, PeriodicCell, Topology, Trajectory};
use tungstenite::Message;
use web_time::Instant;

const WAIT: Duration = Duration::from_secs(10);

fn diatomic() -> Topology {
    Topology::new(vec![6, 8], vec![[0, 1]]).unwrap()
}

fn frame(x: f32) -> Frame {
    Frame::new(vec![x, 0.0, 0.0, x + 1.2, 0.0, 0.0])
}

fn cube(edge: f32) -> PeriodicCell {
    PeriodicCell::new([Vec3::X * edge, Vec3::Y * edge, Vec3::Z * edge])
}

fn delta_json(
    topology: Option<Topology>,
    positions: Option<Frame>,
    cell: Option<PeriodicCell>,
) -> String {
    DeltaMessage::encode(&FrameDelta {
        topology,
        positions,
        cell,
    })
    .to_json()
    .unwrap()
}

/// One-shot WebSocket server: sends `messages`, optionally waits for one
/// text message from the client, then closes. Returns the endpoint and a
/// handle yielding whatever the client sent.
fn serve(
    messages: Vec<String>,
    expect_reply: bool,
) -> (String, JoinHandle<Option<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut ws = tungstenite::accept(stream).unwrap();
        for text in messages {
            ws.send(Message::text(text)).unwrap();
        }

        let mut reply = None;
        if expect_reply {
            while reply.is_none() {
                if let Message::Text(text) = ws.read().unwrap() {
                    reply = Some(text.as_str().to_owned());
                }
            }
        }

        ws.close(None).unwrap();
        while ws.read().is_ok() {}
        reply
    });
    (url, handle)
}

#[test]
fn ingest_then_transform() {
    let traj = Trajectory::new(diatomic(), vec![frame(0.0), frame(3.0)]).unwrap();
    let json = TrajectoryDocument::encode(&traj).to_json().unwrap();
    let path = std::env::temp_dir()
        .join(format!("trajview-pipeline-{}.json", std::process::id()));
    std::fs::write(&path, json).unwrap();

    let mut pipeline = FrameIngestPipeline::new().unwrap();
    let id = pipeline.submit(path.to_str().unwrap());
    let response = pipeline.recv_timeout(WAIT).unwrap();
    assert_eq!(response.id, id);
    let loaded = response.result.unwrap();
    assert_eq!(loaded, traj);

    let mut engine = TransformEngine::new(EngineOptions::default());
    engine.set_topology(loaded.topology()).unwrap();
    engine.set_positions(loaded.frames()[1].coords()).unwrap();

    let bond = engine.bond_instances()[0];
    assert!((bond.translation() - Vec3::new(3.6, 0.0, 0.0)).length() < 1e-5);
    assert!((bond.axis_extent(2) - 1.2).abs() < 1e-5);

    pipeline.shutdown();
    std::fs::remove_file(path).unwrap();
}

#[test]
fn live_channel_delivers_in_order() {
    let (url, server) = serve(
        vec![
            delta_json(Some(diatomic()), Some(frame(0.0)), None),
            delta_json(None, Some(frame(1.0)), None),
            "not json".to_owned(),
            delta_json(None, None, Some(cube(4.0))),
        ],
        true,
    );

    let mut channel =
        LiveFrameChannel::connect(url, &StreamOptions::default()).unwrap();
    let mut next = || channel.recv_timeout(WAIT).unwrap();

    assert!(matches!(next(), LiveEvent::State(ConnectionState::Connecting)));
    assert!(matches!(next(), LiveEvent::State(ConnectionState::Open)));

    let LiveEvent::Delta(first) = next() else { panic!("expected delta") };
    assert_eq!(first.topology, Some(diatomic()));
    assert_eq!(first.positions, Some(frame(0.0)));

    let LiveEvent::Delta(second) = next() else { panic!("expected delta") };
    assert!(second.topology.is_none());
    assert_eq!(second.positions, Some(frame(1.0)));

    assert!(matches!(next(), LiveEvent::Rejected(_)));

    let LiveEvent::Delta(third) = next() else { panic!("expected delta") };
    assert_eq!(third.cell, Some(cube(4.0)));
    assert!(third.positions.is_none());

    let mut change = StateChange::default();
    let _ = change.updates.insert("paused".to_owned(), serde_json::Value::Bool(true));
    channel.send_state(change.clone());

    assert!(matches!(
        channel.recv_timeout(WAIT).unwrap(),
        LiveEvent::State(ConnectionState::Closed)
    ));
    assert_eq!(channel.state(), &ConnectionState::Closed);

    let reply = server.join().unwrap().unwrap();
    let echoed: StateChange = serde_json::from_str(&reply).unwrap();
    assert_eq!(echoed, change);
}

#[test]
fn session_follows_live_stream() {
    let (url, server) = serve(
        vec![
            delta_json(None, None, Some(cube(2.0))),
            delta_json(Some(diatomic()), Some(frame(0.0)), None),
            delta_json(None, Some(frame(5.0)), None),
        ],
        false,
    );

    let mut session = Session::new(Options::default()).unwrap();
    session.connect_live(&url).unwrap();

    let deadline = Instant::now() + WAIT;
    while session.live_state() != Some(&ConnectionState::Closed) {
        assert!(Instant::now() < deadline, "stream never closed");
        let _ = session.tick(Instant::now());
        std::thread::sleep(Duration::from_millis(5));
    }
    let report = session.tick(Instant::now());

    assert_eq!(report.displays, 1);
    assert_eq!(report.atoms, 2);
    assert_eq!(report.bonds, 1);

    // Live displays show the newest frame.
    let display = session.displays().next().unwrap();
    assert_eq!(display.store().frame_count(), 2);
    let first_atom = display.engine().atom_instances()[0].translation();
    assert!((first_atom - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-6);

    // Centroid (5.6, 0, 0) pinned to the origin.
    assert!((report.offset.unwrap() - Vec3::new(-5.6, 0.0, 0.0)).length() < 1e-5);

    let framing = session.framing().unwrap();
    assert!((framing.center - Vec3::splat(1.0)).length() < 1e-6);

    assert!(server.join().unwrap().is_none());
}

#[test]
fn peer_dropping_without_close_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let server = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut ws = tungstenite::accept(stream).unwrap();
        ws.send(Message::text(delta_json(None, Some(frame(0.0)), None)))
            .unwrap();
        // Dropped here: TCP goes away with no close frame.
    });

    let mut channel =
        LiveFrameChannel::connect(url, &StreamOptions::default()).unwrap();
    let mut next = || channel.recv_timeout(WAIT).unwrap();

    assert!(matches!(next(), LiveEvent::State(ConnectionState::Connecting)));
    assert!(matches!(next(), LiveEvent::State(ConnectionState::Open)));
    assert!(matches!(next(), LiveEvent::Delta(_)));
    assert!(matches!(
        next(),
        LiveEvent::State(ConnectionState::Errored(_))
    ));
    assert!(channel.state().is_terminal());
    assert!(matches!(channel.state(), ConnectionState::Errored(_)));

    server.join().unwrap();
}
