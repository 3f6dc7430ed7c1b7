//! Single-threaded render-tick driver.
//!
//! A [`Session`] owns every displayed trajectory (store, engine and player),
//! the background ingest pipeline and at most one live channel. Each
//! [`Session::tick`] drains whatever the background threads have finished,
//! advances playback, refreshes instance transforms and computes the shared
//! recenter offset. Nothing in a tick blocks on I/O.

use glam::Vec3;
use web_time::Instant;

use crate::codec::document::StateChange;
use crate::engine::TransformEngine;
use crate::error::TrajviewError;
use crate::ingest::{FrameIngestPipeline, IngestResponse, RequestId};
use crate::live::{ConnectionState, FrameDelta, LiveEvent, LiveFrameChannel};
use crate::options::Options;
use crate::playback::TrajectoryPlayer;
use crate::recenter::AggregateRecenter;
use crate::trajectory::{
    FrameMode, PeriodicCell, Topology, Trajectory, TrajectoryStore,
    ViewFraming,
};

/// Where a display's frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplaySource {
    /// A preloaded document.
    Document(String),
    /// A streaming endpoint.
    Live(String),
}

/// One trajectory on screen: its frames, its instances and (for preloaded
/// documents) its player.
pub struct Display {
    source: DisplaySource,
    store: TrajectoryStore,
    engine: TransformEngine,
    player: Option<TrajectoryPlayer>,
}

impl Display {
    fn new(
        source: DisplaySource,
        store: TrajectoryStore,
        options: &Options,
        player: Option<TrajectoryPlayer>,
    ) -> Result<Self, TrajviewError> {
        let mut engine = TransformEngine::new(options.engine.clone());
        engine.set_topology(store.topology())?;
        Ok(Self {
            source,
            store,
            engine,
            player,
        })
    }

    /// Origin of the frames.
    #[must_use]
    pub fn source(&self) -> &DisplaySource {
        &self.source
    }

    /// Frames and topology.
    #[must_use]
    pub fn store(&self) -> &TrajectoryStore {
        &self.store
    }

    /// Current instance transforms.
    #[must_use]
    pub fn engine(&self) -> &TransformEngine {
        &self.engine
    }

    /// Playback state; `None` for live displays, which follow the newest
    /// frame.
    #[must_use]
    pub fn player(&self) -> Option<&TrajectoryPlayer> {
        self.player.as_ref()
    }

    /// Index handed to the store's clamped lookup.
    #[must_use]
    pub fn frame_index(&self) -> i64 {
        self.player.as_ref().map_or(i64::MAX, |p| {
            i64::try_from(p.current_frame()).unwrap_or(i64::MAX)
        })
    }

    /// Whether a frame is available to draw.
    #[must_use]
    pub fn is_showing(&self) -> bool {
        self.store.frame_at(self.frame_index()).is_some()
    }

    fn advance(&mut self, now: Instant) {
        if let Some(player) = &mut self.player {
            let _ = player.tick(now, self.store.frame_count());
        }
    }

    fn sync_positions(&mut self) {
        let Some(frame) = self.store.frame_at(self.frame_index()) else {
            return;
        };
        if let Err(e) = self.engine.set_positions(frame.coords()) {
            log::warn!("{:?}: frame not applied: {e}", self.source);
        }
    }
}

/// Live stream state that outlives individual deltas.
///
/// Deltas may arrive in any field combination; the display only exists once
/// a topology has been accepted, while the cell is tracked from the start.
struct LiveView {
    url: String,
    display: Option<Display>,
    cell: Option<PeriodicCell>,
}

impl LiveView {
    fn new(url: String) -> Self {
        Self {
            url,
            display: None,
            cell: None,
        }
    }

    /// Apply one delta: topology, then positions, then box.
    ///
    /// A new topology is all-or-nothing with the positions sent alongside
    /// it: if they disagree, or the topology does not fit the engine, the
    /// whole delta is dropped and the previous display stays. Positions or a
    /// box sent on their own are checked against the topology that stands.
    fn apply(&mut self, delta: FrameDelta, options: &Options) {
        if let Some(topology) = delta.topology {
            if let Some(frame) = &delta.positions {
                if let Err(e) = topology.check_frame(frame.coords()) {
                    log::warn!("live delta from {} dropped: {e}", self.url);
                    return;
                }
            }
            if !self.apply_topology(topology, options) {
                return;
            }
        }
        if let Some(frame) = delta.positions {
            match &mut self.display {
                Some(display) => {
                    if let Err(e) = display
                        .store
                        .append_or_replace_frame(frame, FrameMode::Append)
                    {
                        log::warn!("live positions from {} dropped: {e}", self.url);
                    }
                }
                None => log::warn!(
                    "live positions from {} arrived before any topology",
                    self.url
                ),
            }
        }
        if let Some(cell) = delta.cell {
            log::debug!("live cell from {}: extents {}", self.url, cell.extents());
            if let Some(display) = &mut self.display {
                display.store.set_cell(cell);
            }
            self.cell = Some(cell);
        }
    }

    /// Returns `false` if the topology was rejected.
    fn apply_topology(&mut self, topology: Topology, options: &Options) -> bool {
        if let Some(display) = &mut self.display {
            return match display.engine.set_topology(&topology) {
                Ok(()) => {
                    display.store.replace_topology(topology);
                    true
                }
                Err(e) => {
                    log::error!("live topology from {} dropped: {e}", self.url);
                    false
                }
            };
        }

        let limit = options.stream.frame_history;
        let mut store =
            TrajectoryStore::new(topology).with_history_limit(Some(limit));
        if let Some(cell) = self.cell {
            store.set_cell(cell);
        }
        match Display::new(DisplaySource::Live(self.url.clone()), store, options, None)
        {
            Ok(display) => {
                self.display = Some(display);
                true
            }
            Err(e) => {
                log::error!("live topology from {} dropped: {e}", self.url);
                false
            }
        }
    }
}

/// Summary of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Displays with a frame on screen.
    pub displays: usize,
    /// Atom instances across all displays.
    pub atoms: usize,
    /// Bond instances across all displays.
    pub bonds: usize,
    /// Translation applied to every display, when recentering has atoms.
    pub offset: Option<Vec3>,
}

/// Owns everything the render loop reads each frame.
pub struct Session {
    options: Options,
    ingest: FrameIngestPipeline,
    documents: Vec<Display>,
    channel: Option<LiveFrameChannel>,
    live: Option<LiveView>,
    recenter: AggregateRecenter,
    offset: Option<Vec3>,
}

impl Session {
    /// Start the ingest pipeline.
    ///
    /// # Errors
    ///
    /// [`TrajviewError::ThreadSpawn`] if the ingest thread cannot start.
    pub fn new(options: Options) -> Result<Self, TrajviewError> {
        let recenter = AggregateRecenter::new(Vec3::from_array(
            options.recenter.anchor,
        ));
        Ok(Self {
            ingest: FrameIngestPipeline::new()?,
            options,
            documents: Vec::new(),
            channel: None,
            live: None,
            recenter,
            offset: None,
        })
    }

    /// Active options.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Queue a document load (local path or URL).
    pub fn load(&mut self, path: impl Into<String>) -> RequestId {
        self.ingest.submit(path)
    }

    /// Connect the live stream, replacing any previous one.
    ///
    /// # Errors
    ///
    /// [`TrajviewError::ThreadSpawn`] if the socket thread cannot start.
    pub fn connect_live(&mut self, url: &str) -> Result<(), TrajviewError> {
        if let Some(mut old) = self.channel.take() {
            log::info!("replacing live channel {}", old.url());
            old.close();
        }
        self.channel = Some(LiveFrameChannel::connect(url, &self.options.stream)?);
        self.live = Some(LiveView::new(url.to_owned()));
        Ok(())
    }

    /// Lifecycle of the live channel, if one was opened.
    #[must_use]
    pub fn live_state(&self) -> Option<&ConnectionState> {
        self.channel.as_ref().map(LiveFrameChannel::state)
    }

    /// Forward a shared-state change to the live server.
    pub fn send_state(&self, change: StateChange) {
        match &self.channel {
            Some(channel) => channel.send_state(change),
            None => log::debug!("no live channel; state change dropped"),
        }
    }

    /// Every display with a topology: preloaded documents first, then the
    /// live stream.
    pub fn displays(&self) -> impl Iterator<Item = &Display> {
        self.documents
            .iter()
            .chain(self.live.as_ref().and_then(|l| l.display.as_ref()))
    }

    /// Camera framing for the most recent live cell.
    #[must_use]
    pub fn framing(&self) -> Option<ViewFraming> {
        self.live
            .as_ref()
            .and_then(|l| l.cell)
            .map(|cell| cell.framing(self.options.framing.fovy))
    }

    /// Offset computed on the last tick.
    #[must_use]
    pub fn offset(&self) -> Option<Vec3> {
        self.offset
    }

    /// Pause or resume every document player.
    pub fn toggle_playback(&mut self, now: Instant) {
        for player in self.documents.iter_mut().filter_map(|d| d.player.as_mut()) {
            player.toggle_playback(now);
        }
    }

    /// Change the rate of every document player.
    pub fn set_fps(&mut self, fps: f32) {
        self.options.playback.fps = fps;
        for player in self.documents.iter_mut().filter_map(|d| d.player.as_mut()) {
            player.set_fps(fps);
        }
    }

    /// Run one render tick.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        self.drain_ingest(now);
        self.drain_live();

        let live = self.live.as_mut().and_then(|l| l.display.as_mut());
        for display in self.documents.iter_mut().chain(live) {
            display.advance(now);
            display.sync_positions();
        }

        self.offset = if self.options.recenter.enabled {
            let stores: Vec<(&TrajectoryStore, i64)> = self
                .displays()
                .map(|d| (&d.store, d.frame_index()))
                .collect();
            self.recenter.offset_for_stores(&stores)
        } else {
            None
        };

        let mut report = TickReport {
            displays: 0,
            atoms: 0,
            bonds: 0,
            offset: self.offset,
        };
        for display in self.displays().filter(|d| d.is_showing()) {
            report.displays += 1;
            report.atoms += display.engine.atom_count();
            report.bonds += display.engine.bond_count();
        }
        report
    }

    fn drain_ingest(&mut self, now: Instant) {
        while let Some(response) = self.ingest.try_recv() {
            self.accept_document(response, now);
        }
    }

    fn accept_document(&mut self, response: IngestResponse, now: Instant) {
        let IngestResponse { id, path, result } = response;
        let trajectory: Trajectory = match result {
            Ok(t) => t,
            Err(e) => {
                log::warn!("load {id} ({path}) failed: {e}");
                return;
            }
        };
        let store = TrajectoryStore::from_trajectory(trajectory);
        let player = TrajectoryPlayer::new(&self.options.playback, now);
        match Display::new(DisplaySource::Document(path), store, &self.options, Some(player))
        {
            Ok(display) => {
                log::info!(
                    "displaying {:?}: {} atoms, {} frames",
                    display.source,
                    display.store.atom_count(),
                    display.store.frame_count()
                );
                self.documents.push(display);
            }
            Err(e) => log::error!("load {id} not displayed: {e}"),
        }
    }

    fn drain_live(&mut self) {
        let (Some(channel), Some(live)) = (&mut self.channel, &mut self.live)
        else {
            return;
        };
        let limit = self.options.stream.max_events_per_tick.max(1);
        for _ in 0..limit {
            let Some(event) = channel.try_recv() else {
                break;
            };
            match event {
                LiveEvent::State(_) => {}
                LiveEvent::Delta(delta) => live.apply(delta, &self.options),
                LiveEvent::Rejected(e) => {
                    log::warn!("live message from {} rejected: {e}", live.url);
                }
            }
        }
    }
}
