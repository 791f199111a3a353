//! # Playback State Machine
//!
//! Single owner of the audio engine for one playback session.
//!
//! Two independent producers feed the session: user intents coming through
//! the [`PlaybackStateMachine`] handle, and engine callbacks pushed into the
//! listener channel from the engine's own thread. Both are drained by one
//! spawned task together with the progress poller ticks, so every engine call
//! and every state change happens on that task in arrival order.
//!
//! ```text
//!  handle(intent) ──┐
//!  set_playlist() ──┤ commands
//!                   ▼
//!  engine thread ──► session loop ──► watch<PlaybackSnapshot>
//!   (callbacks)     ▲           └──► broadcast<MusicState>
//!  PeriodicTask ────┘ ticks
//! ```
//!
//! ## Progress polling
//!
//! While the engine plays, a [`PeriodicTask`] samples the position every
//! `progress_interval`. Restarting the poller cancels the previous ticker and
//! ticks of superseded tickers are dropped by generation, so a stop takes
//! effect within one tick.
//!
//! ## Teardown
//!
//! [`PlaybackStateMachine::release`] cancels the poller, releases the loudness
//! effect and the engine, and detaches the listener. Each step is attempted
//! even if an earlier one fails. Dropping the handle without calling
//! `release` runs the same teardown once the loop notices.

use bridge_traits::playback::engine_event_channel;
use bridge_traits::{AudioEngine, EngineEvent, EngineEventReceiver, EngineState, MediaItem};
use core_async::periodic::PeriodicTask;
use core_async::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use core_async::task::JoinHandle;
use core_async::time::Duration;
use core_library::Track;
use core_runtime::config::{CoreConfig, DEFAULT_PROGRESS_INTERVAL};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{PlaybackError, Result};
use crate::gain::GainController;
use crate::state::{MusicState, PlaybackSnapshot, PlayerIntent};

const COMMAND_BUFFER: usize = 32;
const STATE_BUFFER: usize = 256;

/// Session tuning.
#[derive(Debug, Clone)]
pub struct PlaybackSettings {
    /// Position sampling period while playing
    pub progress_interval: Duration,
    /// Bus for `PlaybackEvent`s
    pub event_bus: Option<EventBus>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            event_bus: None,
        }
    }
}

impl PlaybackSettings {
    pub fn from_config(config: &CoreConfig, event_bus: EventBus) -> Self {
        Self {
            progress_interval: config.progress_interval,
            event_bus: Some(event_bus),
        }
    }
}

enum Command {
    Intent(PlayerIntent, oneshot::Sender<()>),
    SetPlaylist(Vec<Track>, oneshot::Sender<()>),
    ClearMediaItems(oneshot::Sender<()>),
    ApplyNormalization(Box<Track>, oneshot::Sender<()>),
    Release(oneshot::Sender<()>),
}

/// Handle to a running playback session.
///
/// Every method is marshalled onto the session loop and returns once the loop
/// processed it. After [`release`](Self::release) the methods fail with
/// [`PlaybackError::SessionClosed`].
pub struct PlaybackStateMachine {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<PlaybackSnapshot>,
    states: broadcast::Sender<MusicState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackStateMachine {
    /// Registers the engine listener and spawns the session loop.
    ///
    /// Must be called from within a tokio runtime. The loudness effect is
    /// enabled once, as the first thing the loop does.
    pub fn start(
        engine: Arc<dyn AudioEngine>,
        gain: GainController,
        settings: PlaybackSettings,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(PlaybackSnapshot::default());
        let (states_tx, _) = broadcast::channel(STATE_BUFFER);
        let (engine_tx, engine_rx) = engine_event_channel();
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();

        engine.set_listener(engine_tx);

        let session = Session {
            engine,
            gain,
            events: settings.event_bus,
            interval: settings.progress_interval,
            poller: PeriodicTask::new("playback-progress"),
            tick_tx,
            tracks: Vec::new(),
            snapshot: PlaybackSnapshot::default(),
            snapshot_tx,
            states: states_tx.clone(),
        };

        let task = core_async::spawn(session.run(command_rx, engine_rx, tick_rx));
        debug!("Playback session started");

        Self {
            commands: command_tx,
            snapshot: snapshot_rx,
            states: states_tx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Apply a user intent.
    pub async fn handle(&self, intent: PlayerIntent) -> Result<()> {
        self.call(|ack| Command::Intent(intent, ack)).await
    }

    /// Replace the active list and leave the engine paused at its first item.
    pub async fn set_playlist(&self, tracks: Vec<Track>) -> Result<()> {
        self.call(|ack| Command::SetPlaylist(tracks, ack)).await
    }

    /// Empty the engine queue and reset the session state.
    pub async fn clear_media_items(&self) -> Result<()> {
        self.call(Command::ClearMediaItems).await
    }

    /// Set the loudness effect gain for `track`.
    pub async fn apply_normalization(&self, track: Track) -> Result<()> {
        self.call(|ack| Command::ApplyNormalization(Box::new(track), ack))
            .await
    }

    /// Latest session state.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Observer that sees the latest snapshot immediately and every update
    /// after it.
    pub fn subscribe_snapshot(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshot.clone()
    }

    /// Raw state stream in emission order. Only entries published after
    /// subscribing are delivered.
    pub fn subscribe_states(&self) -> broadcast::Receiver<MusicState> {
        self.states.subscribe()
    }

    /// Returns `true` until the session loop has stopped.
    pub fn is_active(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Tear the session down. Safe to call more than once.
    pub async fn release(&self) {
        let (ack, done) = oneshot::channel();
        if self.commands.send(Command::Release(ack)).await.is_ok() {
            let _ = done.await;
        }

        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Playback session task ended abnormally");
            }
        }
    }

    async fn call<F>(&self, make: F) -> Result<()>
    where
        F: FnOnce(oneshot::Sender<()>) -> Command,
    {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(make(ack))
            .await
            .map_err(|_| PlaybackError::SessionClosed)?;
        done.await.map_err(|_| PlaybackError::SessionClosed)
    }
}

impl std::fmt::Debug for PlaybackStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackStateMachine")
            .field("snapshot", &*self.snapshot.borrow())
            .field("active", &self.is_active())
            .finish()
    }
}

/// State owned by the session loop.
struct Session {
    engine: Arc<dyn AudioEngine>,
    gain: GainController,
    events: Option<EventBus>,
    interval: Duration,
    poller: PeriodicTask,
    tick_tx: mpsc::UnboundedSender<u64>,
    tracks: Vec<Track>,
    snapshot: PlaybackSnapshot,
    snapshot_tx: watch::Sender<PlaybackSnapshot>,
    states: broadcast::Sender<MusicState>,
}

impl Session {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut engine_events: EngineEventReceiver,
        mut ticks: mpsc::UnboundedReceiver<u64>,
    ) {
        self.gain.enable().await;
        let mut engine_open = true;

        loop {
            // Callbacks first: a command sees every callback queued before it.
            core_async::select! {
                biased;

                event = engine_events.recv(), if engine_open => match event {
                    Some(event) => self.on_engine_event(event).await,
                    None => engine_open = false,
                },

                command = commands.recv() => match command {
                    Some(Command::Release(ack)) => {
                        self.teardown().await;
                        let _ = ack.send(());
                        break;
                    }
                    Some(command) => self.on_command(command).await,
                    None => {
                        debug!("Playback handle dropped without release");
                        self.teardown().await;
                        break;
                    }
                },

                Some(generation) = ticks.recv() => self.on_tick(generation).await,
            }
        }
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Intent(intent, ack) => {
                self.on_intent(intent).await;
                let _ = ack.send(());
            }
            Command::SetPlaylist(tracks, ack) => {
                self.set_playlist(tracks).await;
                let _ = ack.send(());
            }
            Command::ClearMediaItems(ack) => {
                self.clear_media_items().await;
                let _ = ack.send(());
            }
            Command::ApplyNormalization(track, ack) => {
                self.gain.apply_normalization(&track).await;
                let _ = ack.send(());
            }
            Command::Release(ack) => {
                let _ = ack.send(());
            }
        }
    }

    async fn on_intent(&mut self, intent: PlayerIntent) {
        debug!(?intent, "Player intent");

        match intent {
            PlayerIntent::PlayPause => self.play_pause().await,
            PlayerIntent::SelectedAudioChange(index) => self.select(index).await,
            PlayerIntent::SeekTo(ratio) => {
                self.seek_to_ratio(ratio).await;
            }
            PlayerIntent::UpdateProgress(ratio) => {
                if self.seek_to_ratio(ratio).await {
                    self.snapshot.progress_percent = clamp_percent(ratio);
                    self.publish_snapshot();
                }
            }
            PlayerIntent::SeekToNext => {
                log_engine("seek_to_next_item", self.engine.seek_to_next_item().await)
            }
            PlayerIntent::Backward => log_engine("seek_back", self.engine.seek_back().await),
            PlayerIntent::Forward => log_engine("seek_forward", self.engine.seek_forward().await),
            PlayerIntent::Stop => self.stop_progress(),
        }
    }

    async fn play_pause(&mut self) {
        let playing = match self.engine.is_playing().await {
            Ok(playing) => playing,
            Err(e) => {
                warn!(error = %e, "Failed to read engine playing flag");
                self.snapshot.is_playing
            }
        };

        if playing {
            log_engine("pause", self.engine.pause().await);
            self.stop_progress();
        } else {
            log_engine("play", self.engine.play().await);
            self.publish(MusicState::Playing(true));
            self.start_progress();
        }
    }

    async fn select(&mut self, index: i64) {
        let count = self.tracks.len();
        if count == 0 {
            warn!(index, "Track selection ignored: no active list");
            return;
        }

        let index = index.rem_euclid(count as i64) as usize;
        let current = match self.engine.current_index().await {
            Ok(current) => current,
            Err(e) => {
                warn!(error = %e, "Failed to read engine index");
                self.snapshot.current_index
            }
        };

        if index == current {
            self.play_pause().await;
        } else {
            log_engine(
                "seek_to_default_position",
                self.engine.seek_to_default_position(index).await,
            );
            self.snapshot.current_index = index;
            self.publish(MusicState::Playing(true));
            log_engine("play", self.engine.play().await);
            self.start_progress();
        }

        let track_id = self.tracks[index].id.0;
        info!(index, track_id, "Selected track");
        self.emit(PlaybackEvent::TrackSelected { index, track_id });
    }

    /// Returns false when the seek was skipped for lack of a duration.
    async fn seek_to_ratio(&mut self, ratio: f32) -> bool {
        let duration = match self.engine.duration_ms().await {
            Ok(Some(duration)) if duration > 0 => duration,
            Ok(_) => {
                debug!(ratio, "Seek ignored: duration unknown");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read engine duration");
                return false;
            }
        };

        let position = (duration as f32 * clamp_percent(ratio) / 100.0) as i64;
        log_engine("seek_to", self.engine.seek_to(position).await);
        true
    }

    async fn set_playlist(&mut self, tracks: Vec<Track>) {
        self.poller.stop();
        if matches!(self.engine.is_playing().await, Ok(true)) {
            log_engine("pause", self.engine.pause().await);
        }

        let items: Vec<MediaItem> = tracks
            .iter()
            .map(|track| {
                MediaItem::new(track.id.to_string(), track.content_uri.clone())
                    .with_title(track.title.clone())
                    .with_artist(track.artist.clone())
            })
            .collect();

        log_engine("set_media_items", self.engine.set_media_items(items).await);
        log_engine("seek_to_item", self.engine.seek_to_item(0, 0).await);
        log_engine("prepare", self.engine.prepare().await);

        let track_count = tracks.len();
        self.tracks = tracks;
        self.snapshot = PlaybackSnapshot::loaded(track_count);
        self.publish_snapshot();

        info!(track_count, "Loaded active list");
        self.emit(PlaybackEvent::PlaylistLoaded { track_count });
    }

    async fn clear_media_items(&mut self) {
        self.poller.stop();
        log_engine("clear_media_items", self.engine.clear_media_items().await);
        self.tracks.clear();
        self.snapshot = PlaybackSnapshot::default();
        self.publish_snapshot();
    }

    async fn on_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::PlaybackStateChanged(EngineState::Buffering) => {
                let position_ms = self.position_or_last().await;
                self.publish(MusicState::Buffering { position_ms });
            }
            EngineEvent::PlaybackStateChanged(EngineState::Ready) => {
                let duration_ms = match self.engine.duration_ms().await {
                    Ok(duration) => duration.unwrap_or(0),
                    Err(e) => {
                        warn!(error = %e, "Failed to read engine duration");
                        0
                    }
                };
                self.publish(MusicState::Ready { duration_ms });
            }
            EngineEvent::PlaybackStateChanged(EngineState::Ended) => {
                // No auto-advance.
                self.snapshot.engine_status = EngineState::Ended;
                self.publish_snapshot();
            }
            EngineEvent::PlaybackStateChanged(EngineState::Idle) => {
                self.publish(MusicState::Idle);
            }
            EngineEvent::IsPlayingChanged(is_playing) => {
                self.publish(MusicState::Playing(is_playing));

                let index = match self.engine.current_index().await {
                    Ok(index) => index,
                    Err(_) => self.snapshot.current_index,
                };
                self.publish(MusicState::CurrentPlaying(index));
                self.emit(PlaybackEvent::PlayingChanged { is_playing });

                if is_playing {
                    self.start_progress();
                } else {
                    self.stop_progress();
                }
            }
        }
    }

    async fn on_tick(&mut self, generation: u64) {
        if generation != self.poller.generation() {
            return;
        }

        match self.engine.current_position_ms().await {
            Ok(position_ms) => self.publish(MusicState::InProgress { position_ms }),
            Err(e) => debug!(error = %e, "Progress sample failed"),
        }
    }

    async fn position_or_last(&self) -> i64 {
        self.engine
            .current_position_ms()
            .await
            .unwrap_or(self.snapshot.position_ms)
    }

    fn start_progress(&mut self) {
        let ticks = self.tick_tx.clone();
        self.poller
            .start(self.interval, move |generation| ticks.send(generation).is_ok());
    }

    /// Stops sampling and republishes the paused flag after the poller is gone.
    fn stop_progress(&mut self) {
        self.poller.stop();
        self.publish(MusicState::Playing(false));
    }

    async fn teardown(&mut self) {
        self.poller.shutdown().await;

        if let Err(e) = self.gain.release().await {
            warn!(error = %e, "Failed to release loudness enhancer");
        }
        log_engine("release", self.engine.release().await);
        self.engine.clear_listener();

        self.snapshot.is_playing = false;
        self.publish_snapshot();
        self.emit(PlaybackEvent::Released);
        info!("Playback session released");
    }

    fn publish(&mut self, state: MusicState) {
        self.snapshot.apply(&state);
        let _ = self.states.send(state);
        self.publish_snapshot();
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(self.snapshot.clone());
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.events {
            let _ = bus.emit(CoreEvent::Playback(event));
        }
    }
}

fn clamp_percent(ratio: f32) -> f32 {
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 100.0)
    }
}

fn log_engine(operation: &'static str, result: bridge_traits::error::Result<()>) {
    if let Err(e) = result {
        warn!(operation, error = %e, "Engine command failed");
    }
}
