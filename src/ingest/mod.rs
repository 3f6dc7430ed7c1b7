//! Background trajectory loader.
//!
//! A dispatcher thread receives load requests over a channel and fetches
//! each one on its own worker thread, so several documents download and
//! decode concurrently. Finished trajectories come back over a second
//! channel in completion order. The caller only ever does non-blocking
//! sends and `try_recv`s, so the render loop never waits on I/O.
//!
//! A failed fetch or decode is reported as that request's response; the
//! pipeline itself keeps running.

use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use rustc_hash::FxHashMap;

use crate::codec::document::TrajectoryDocument;
use crate::error::TrajviewError;
use crate::trajectory::Trajectory;

/// Upper bound on a fetched document body.
#[cfg(feature = "remote")]
const MAX_DOCUMENT_BYTES: u64 = 1 << 30;

/// How long the dispatcher waits for a request before reaping finished
/// workers.
const REAP_INTERVAL: Duration = Duration::from_millis(100);

/// Worker threads still running, with the path each one is loading.
type InFlight = FxHashMap<RequestId, (String, JoinHandle<()>)>;

/// Identifies one submitted load.
pub type RequestId = u64;

/// Outcome of one load request.
#[derive(Debug)]
pub struct IngestResponse {
    /// Id returned by [`FrameIngestPipeline::submit`].
    pub id: RequestId,
    /// The requested path or URL.
    pub path: String,
    /// The decoded trajectory, or why it could not be produced.
    pub result: Result<Trajectory, TrajviewError>,
}

enum IngestRequest {
    Load { id: RequestId, path: String },
    Shutdown,
}

/// Loads trajectory documents off the caller's thread.
pub struct FrameIngestPipeline {
    request_tx: mpsc::Sender<IngestRequest>,
    response_rx: mpsc::Receiver<IngestResponse>,
    next_id: RequestId,
    thread: Option<JoinHandle<()>>,
}

impl FrameIngestPipeline {
    /// Spawn the dispatcher thread.
    ///
    /// # Errors
    ///
    /// [`TrajviewError::ThreadSpawn`] if the thread cannot be started.
    pub fn new() -> Result<Self, TrajviewError> {
        let (request_tx, request_rx) = mpsc::channel::<IngestRequest>();
        let (response_tx, response_rx) = mpsc::channel::<IngestResponse>();

        let thread = std::thread::Builder::new()
            .name("trajectory-ingest".into())
            .spawn(move || Self::dispatch_loop(&request_rx, &response_tx))
            .map_err(TrajviewError::ThreadSpawn)?;

        Ok(Self {
            request_tx,
            response_rx,
            next_id: 0,
            thread: Some(thread),
        })
    }

    /// Queue a load of a local path or `http(s)://` URL (non-blocking).
    pub fn submit(&mut self, path: impl Into<String>) -> RequestId {
        let id = self.next_id;
        self.next_id += 1;
        let path = path.into();
        log::debug!("ingest request {id}: {path}");
        if self
            .request_tx
            .send(IngestRequest::Load { id, path })
            .is_err()
        {
            log::error!("ingest dispatcher has stopped; request {id} dropped");
        }
        id
    }

    /// Next finished load, if one is ready.
    pub fn try_recv(&self) -> Option<IngestResponse> {
        self.response_rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next finished load.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<IngestResponse> {
        self.response_rx.recv_timeout(timeout).ok()
    }

    /// Stop the dispatcher and wait for it to exit.
    ///
    /// Loads still in flight are abandoned; their results are discarded.
    pub fn shutdown(&mut self) {
        let _ = self.request_tx.send(IngestRequest::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    fn dispatch_loop(
        request_rx: &mpsc::Receiver<IngestRequest>,
        response_tx: &mpsc::Sender<IngestResponse>,
    ) {
        let mut in_flight = InFlight::default();

        loop {
            let request = match request_rx.recv_timeout(REAP_INTERVAL) {
                Ok(request) => request,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    reap_finished(&mut in_flight, response_tx);
                    continue;
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            };
            reap_finished(&mut in_flight, response_tx);

            let (id, path) = match request {
                IngestRequest::Shutdown => break,
                IngestRequest::Load { id, path } => (id, path),
            };

            match spawn_worker(id, path.clone(), response_tx.clone()) {
                Ok(handle) => drop(in_flight.insert(id, (path, handle))),
                Err(e) => {
                    log::error!("failed to spawn ingest worker: {e}");
                    let _ = response_tx.send(IngestResponse {
                        id,
                        path,
                        result: Err(TrajviewError::ThreadSpawn(e)),
                    });
                }
            }
        }

        reap_finished(&mut in_flight, response_tx);
        for (id, (path, _)) in &in_flight {
            log::debug!("abandoning load {id} ({path})");
        }
    }
}

fn spawn_worker(
    id: RequestId,
    path: String,
    tx: mpsc::Sender<IngestResponse>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("ingest-{id}"))
        .spawn(move || {
            let result = load_document(&path);
            match &result {
                Ok(traj) => log::info!(
                    "loaded {path}: {} atoms, {} frames",
                    traj.topology().atom_count(),
                    traj.frames().len()
                ),
                Err(e) => log::warn!("failed to load {path}: {e}"),
            }
            let _ = tx.send(IngestResponse { id, path, result });
        })
}

/// Join every worker that has exited. A worker that panicked never sent its
/// response, so one is sent on its behalf.
fn reap_finished(in_flight: &mut InFlight, response_tx: &mpsc::Sender<IngestResponse>) {
    let finished: Vec<RequestId> = in_flight
        .iter()
        .filter(|(_, (_, handle))| handle.is_finished())
        .map(|(&id, _)| id)
        .collect();
    for id in finished {
        let Some((path, handle)) = in_flight.remove(&id) else {
            continue;
        };
        if handle.join().is_err() {
            log::error!("ingest worker for {path} panicked");
            let _ = response_tx.send(IngestResponse {
                id,
                result: Err(TrajviewError::Fetch(format!("{path}: loader panicked"))),
                path,
            });
        }
    }
}

impl Drop for FrameIngestPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Fetch, parse and decode one trajectory document.
///
/// # Errors
///
/// Fetch/IO, JSON, codec or topology errors.
pub fn load_document(path: &str) -> Result<Trajectory, TrajviewError> {
    let text = fetch_text(path)?;
    TrajectoryDocument::from_json(&text)?.decode()
}

fn is_remote(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

fn fetch_text(path: &str) -> Result<String, TrajviewError> {
    if is_remote(path) {
        return fetch_remote(path);
    }
    Ok(std::fs::read_to_string(path)?)
}

#[cfg(feature = "remote")]
fn fetch_remote(url: &str) -> Result<String, TrajviewError> {
    let mut body = ureq::get(url)
        .call()
        .map_err(|e| TrajviewError::Fetch(format!("{url}: {e}")))?
        .into_body();
    body.with_config()
        .limit(MAX_DOCUMENT_BYTES)
        .read_to_string()
        .map_err(|e| TrajviewError::Fetch(format!("{url}: {e}")))
}

#[cfg(not(feature = "remote"))]
fn fetch_remote(url: &str) -> Result<String, TrajviewError> {
    Err(TrajviewError::Fetch(format!(
        "{url}: built without the `remote` feature"
    )))
}
