//! Live frame stream over a WebSocket.
//!
//! One background thread owns the socket. Every inbound JSON message is
//! decoded into a [`FrameDelta`] and forwarded in receipt order; connection
//! changes arrive on the same ordered stream as [`LiveEvent::State`].
//! Nothing here retries: once the state reaches `Closed` or `Errored` the
//! channel is finished and the caller decides whether to reconnect.

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use tungstenite::client::IntoClientRequest;
use tungstenite::handshake::client::Request;
use tungstenite::{Message, WebSocket};
use web_time::Instant;

use crate::codec::document::{DeltaMessage, StateChange};
use crate::error::TrajviewError;
use crate::options::StreamOptions;
use crate::trajectory::{Frame, PeriodicCell, Topology};

/// Read attempts allowed for the close handshake before giving up.
const CLOSE_READ_ATTEMPTS: usize = 50;

/// Longest [`LiveFrameChannel::close`] waits for the socket thread before
/// detaching it.
const CLOSE_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Sleep between checks while waiting for the socket thread to finish.
const JOIN_POLL: Duration = Duration::from_millis(5);

/// Partial update; `None` fields are unchanged since the last delta.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameDelta {
    /// Replacement topology.
    pub topology: Option<Topology>,
    /// New coordinates.
    pub positions: Option<Frame>,
    /// New periodic cell.
    pub cell: Option<PeriodicCell>,
}

impl FrameDelta {
    /// Whether the delta carries no fields at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topology.is_none() && self.positions.is_none() && self.cell.is_none()
    }
}

/// Connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake in progress.
    Connecting,
    /// Receiving frames.
    Open,
    /// Closed cleanly by either side.
    Closed,
    /// Failed to connect or dropped with an error.
    Errored(String),
}

impl ConnectionState {
    /// Whether the connection has ended.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Errored(_))
    }
}

/// Everything the channel reports, in order.
#[derive(Debug)]
pub enum LiveEvent {
    /// Lifecycle transition.
    State(ConnectionState),
    /// A decoded update.
    Delta(FrameDelta),
    /// A message that could not be decoded; prior state is unaffected.
    Rejected(TrajviewError),
}

enum Outgoing {
    State(StateChange),
    Close,
}

/// Persistent connection to a streaming simulation.
pub struct LiveFrameChannel {
    url: String,
    outgoing_tx: mpsc::Sender<Outgoing>,
    event_rx: mpsc::Receiver<LiveEvent>,
    state: ConnectionState,
    thread: Option<JoinHandle<()>>,
}

impl LiveFrameChannel {
    /// Start connecting to `url` (`ws://` or `wss://`) in the background.
    ///
    /// Returns immediately; the first event is always
    /// `State(Connecting)`. Connection failures are reported as
    /// `State(Errored(..))`, never as an `Err` here.
    ///
    /// # Errors
    ///
    /// [`TrajviewError::ThreadSpawn`] if the socket thread cannot start.
    pub fn connect(
        url: impl Into<String>,
        options: &StreamOptions,
    ) -> Result<Self, TrajviewError> {
        let url = url.into();
        let (outgoing_tx, outgoing_rx) = mpsc::channel::<Outgoing>();
        let (event_tx, event_rx) = mpsc::channel::<LiveEvent>();
        let poll = Duration::from_millis(options.poll_interval_ms.max(1));
        let connect_timeout =
            Duration::from_millis(options.connect_timeout_ms.max(1));

        let thread_url = url.clone();
        let thread = std::thread::Builder::new()
            .name("live-frame-channel".into())
            .spawn(move || {
                let socket = SocketTask {
                    events: event_tx,
                    outgoing: outgoing_rx,
                    poll,
                    connect_timeout,
                };
                socket.run(&thread_url);
            })
            .map_err(TrajviewError::ThreadSpawn)?;

        Ok(Self {
            url,
            outgoing_tx,
            event_rx,
            state: ConnectionState::Connecting,
            thread: Some(thread),
        })
    }

    /// Endpoint this channel was opened against.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Last lifecycle state seen through [`try_recv`](Self::try_recv).
    #[must_use]
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Next pending event, without blocking.
    pub fn try_recv(&mut self) -> Option<LiveEvent> {
        let event = self.event_rx.try_recv().ok()?;
        self.observe(&event);
        Some(event)
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<LiveEvent> {
        let event = self.event_rx.recv_timeout(timeout).ok()?;
        self.observe(&event);
        Some(event)
    }

    /// Push a shared-state change to the server (non-blocking).
    ///
    /// Dropped with a warning if the socket thread has already exited.
    pub fn send_state(&self, change: StateChange) {
        if change.is_empty() {
            return;
        }
        if self.outgoing_tx.send(Outgoing::State(change)).is_err() {
            log::warn!("live channel {} is closed; state change dropped", self.url);
        }
    }

    /// Close the connection and wait (bounded) for the socket thread to
    /// exit.
    ///
    /// Events already queued (including the final `Closed`) stay readable.
    /// A thread still stuck connecting after the wait is detached; it exits
    /// on its own once its connect or handshake timeout fires.
    pub fn close(&mut self) {
        let _ = self.outgoing_tx.send(Outgoing::Close);
        let Some(handle) = self.thread.take() else {
            return;
        };
        let deadline = Instant::now() + CLOSE_JOIN_TIMEOUT;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                log::warn!(
                    "live channel {} did not stop in time; detaching",
                    self.url
                );
                return;
            }
            std::thread::sleep(JOIN_POLL);
        }
        let _ = handle.join();
    }

    fn observe(&mut self, event: &LiveEvent) {
        if let LiveEvent::State(state) = event {
            log::info!("live channel {}: {state:?}", self.url);
            self.state = state.clone();
        }
    }
}

impl Drop for LiveFrameChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Decode one inbound text payload.
///
/// # Errors
///
/// JSON, codec or topology errors; the whole message is rejected.
pub fn decode_message(text: &str) -> Result<FrameDelta, TrajviewError> {
    DeltaMessage::from_json(text)?.decode()
}

/// State owned by the socket thread.
struct SocketTask {
    events: mpsc::Sender<LiveEvent>,
    outgoing: mpsc::Receiver<Outgoing>,
    poll: Duration,
    connect_timeout: Duration,
}

/// Why the read loop stopped.
enum Exit {
    /// Caller asked to close (or dropped the channel).
    Requested,
    /// The peer closed the connection.
    PeerClosed,
    /// Transport failure.
    Failed(String),
    /// Nobody is listening for events any more.
    Abandoned,
}

type Socket = WebSocket<TcpStream>;

impl SocketTask {
    fn emit(&self, event: LiveEvent) -> bool {
        self.events.send(event).is_ok()
    }

    fn run(&self, url: &str) {
        if !self.emit(LiveEvent::State(ConnectionState::Connecting)) {
            return;
        }

        let mut socket = match self.handshake(url) {
            Ok(socket) => socket,
            Err(msg) => {
                log::error!("live channel failed to connect to {url}: {msg}");
                let _ =
                    self.emit(LiveEvent::State(ConnectionState::Errored(msg)));
                return;
            }
        };

        if let Err(e) = socket.get_mut().set_read_timeout(Some(self.poll)) {
            log::warn!("could not set socket read timeout: {e}");
        }
        if !self.emit(LiveEvent::State(ConnectionState::Open)) {
            return;
        }

        let final_state = match self.read_loop(&mut socket) {
            Exit::Requested => {
                close_socket(&mut socket);
                ConnectionState::Closed
            }
            Exit::PeerClosed => ConnectionState::Closed,
            Exit::Failed(msg) => ConnectionState::Errored(msg),
            Exit::Abandoned => {
                close_socket(&mut socket);
                return;
            }
        };
        let _ = self.emit(LiveEvent::State(final_state));
    }

    /// TCP connect and WebSocket upgrade, each bounded by the connect
    /// timeout.
    fn handshake(&self, url: &str) -> Result<Socket, String> {
        let request = url.into_client_request().map_err(|e| e.to_string())?;
        let stream = open_stream(&request, self.connect_timeout)?;
        stream
            .set_read_timeout(Some(self.connect_timeout))
            .and_then(|()| stream.set_write_timeout(Some(self.connect_timeout)))
            .map_err(|e| e.to_string())?;
        tungstenite::client(request, stream)
            .map(|(socket, _response)| socket)
            .map_err(|e| format!("handshake failed: {e}"))
    }

    fn read_loop(&self, socket: &mut Socket) -> Exit {
        loop {
            if let Some(exit) = self.flush_outgoing(socket) {
                return exit;
            }

            let payload = match socket.read() {
                Ok(Message::Text(text)) => text.as_str().to_owned(),
                Ok(Message::Binary(bytes)) => {
                    match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => text,
                        Err(e) => {
                            let err = TrajviewError::Json(e.to_string());
                            if !self.emit(LiveEvent::Rejected(err)) {
                                return Exit::Abandoned;
                            }
                            continue;
                        }
                    }
                }
                Ok(_) => continue,
                Err(tungstenite::Error::Io(e)) if is_timeout(&e) => continue,
                Err(
                    tungstenite::Error::ConnectionClosed
                    | tungstenite::Error::AlreadyClosed,
                ) => return Exit::PeerClosed,
                Err(e) => {
                    log::error!("live channel transport error: {e}");
                    return Exit::Failed(e.to_string());
                }
            };

            let event = match decode_message(&payload) {
                Ok(delta) if delta.is_empty() => {
                    log::debug!("live channel: empty delta ignored");
                    continue;
                }
                Ok(delta) => LiveEvent::Delta(delta),
                Err(e) => {
                    log::warn!("live channel rejected message: {e}");
                    LiveEvent::Rejected(e)
                }
            };
            if !self.emit(event) {
                return Exit::Abandoned;
            }
        }
    }

    /// Send queued state changes; `Some` if the loop should stop.
    fn flush_outgoing(&self, socket: &mut Socket) -> Option<Exit> {
        loop {
            match self.outgoing.try_recv() {
                Ok(Outgoing::State(change)) => {
                    let text = match serde_json::to_string(&change) {
                        Ok(text) => text,
                        Err(e) => {
                            log::warn!("could not encode state change: {e}");
                            continue;
                        }
                    };
                    if let Err(e) = socket.send(Message::text(text)) {
                        return Some(Exit::Failed(e.to_string()));
                    }
                }
                Ok(Outgoing::Close)
                | Err(mpsc::TryRecvError::Disconnected) => {
                    return Some(Exit::Requested);
                }
                Err(mpsc::TryRecvError::Empty) => return None,
            }
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Resolve the request's host and connect to the first address that
/// answers within `timeout`.
fn open_stream(request: &Request, timeout: Duration) -> Result<TcpStream, String> {
    let uri = request.uri();
    let port = match uri.scheme_str() {
        Some("ws") => uri.port_u16().unwrap_or(80),
        Some("wss") => {
            return Err("wss:// needs TLS, which this build does not include".into());
        }
        other => return Err(format!("unsupported scheme {other:?}")),
    };
    let host = uri
        .host()
        .ok_or_else(|| format!("no host in {uri}"))?
        .trim_start_matches('[')
        .trim_end_matches(']');

    let addrs = (host, port).to_socket_addrs().map_err(|e| e.to_string())?;
    let mut last_error = format!("{host} did not resolve");
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = format!("{addr}: {e}"),
        }
    }
    Err(last_error)
}

/// Start the close handshake and read until the peer acknowledges it.
fn close_socket(socket: &mut Socket) {
    if socket.close(None).is_err() {
        return;
    }
    for _ in 0..CLOSE_READ_ATTEMPTS {
        match socket.read() {
            Ok(_) => {}
            Err(tungstenite::Error::Io(e)) if is_timeout(&e) => {}
            Err(_) => return,
        }
    }
}
