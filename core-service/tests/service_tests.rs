//! Service façade tests with mocked repositories and fake bridges.

mod common;

use common::{
    playlist, scanned, track, FakeAnalyzer, FakeEngine, FakeEnhancer, FakeScanner, MockPlaylistRepo,
    MockTrackRepo,
};
use core_async::time::{timeout, Duration};
use core_library::{LibraryError, LoudnessStats, PlaylistId, TrackId};
use core_playback::{PlaybackSnapshot, PlaybackStatus, PlayerIntent};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, NormalizationEvent};
use core_service::{CoreDependencies, CoreError, CoreService, UiState};
use core_async::sync::broadcast;
use mockall::predicate::*;
use std::sync::Arc;

const MEASURED: LoudnessStats = LoudnessStats {
    integrated_loudness: -20.0,
    loudness_range: 10.0,
    true_peak: -3.0,
};

struct Harness {
    service: CoreService,
    engine: Arc<FakeEngine>,
    enhancer: Arc<FakeEnhancer>,
    scanner: Arc<FakeScanner>,
    analyzer: Arc<FakeAnalyzer>,
}

fn config() -> CoreConfig {
    CoreConfig::builder()
        .database_path("/tmp/unused.db")
        .cache_dir("/tmp/unused-cache")
        .build()
        .unwrap()
}

fn start(
    tracks: MockTrackRepo,
    playlists: MockPlaylistRepo,
    scanner: FakeScanner,
    analyzer: FakeAnalyzer,
) -> Harness {
    let engine = Arc::new(FakeEngine::new());
    let enhancer = Arc::new(FakeEnhancer::new());
    let scanner = Arc::new(scanner);
    let analyzer = Arc::new(analyzer);

    let deps = CoreDependencies::new(
        Arc::new(tracks),
        Arc::new(playlists),
        scanner.clone(),
        analyzer.clone(),
        engine.clone(),
        enhancer.clone(),
        EventBus::new(64),
    );

    Harness {
        service: CoreService::new(deps, &config()),
        engine,
        enhancer,
        scanner,
        analyzer,
    }
}

/// Track repository holding `library`, analyzed or not as given.
fn library_repo(library: Vec<core_library::Track>) -> MockTrackRepo {
    let mut repo = MockTrackRepo::new();
    let all = library.clone();
    repo.expect_find_all().returning(move || Ok(all.clone()));
    let by_ids = library.clone();
    repo.expect_find_by_ids().returning(move |ids| {
        Ok(ids
            .iter()
            .filter_map(|id| by_ids.iter().find(|t| t.id == *id).cloned())
            .collect())
    });
    repo.expect_find_by_id()
        .returning(move |id| Ok(library.iter().find(|t| t.id == id).cloned()));
    repo
}

fn empty_playlists() -> MockPlaylistRepo {
    let mut repo = MockPlaylistRepo::new();
    repo.expect_find_all().returning(|| Ok(Vec::new()));
    repo
}

async fn wait_for_ready(service: &CoreService) -> PlaybackSnapshot {
    let mut rx = service.playback();
    let snapshot = timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| s.duration_ms.is_some()),
    )
    .await
    .expect("engine never became ready")
    .expect("session closed")
    .clone();
    snapshot
}

fn drain(events: &mut broadcast::Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

// ============================================================================
// Library loading
// ============================================================================

#[tokio::test]
async fn test_fresh_library_is_scanned_sorted_and_persisted() {
    let mut tracks = MockTrackRepo::new();
    tracks.expect_find_all().times(1).returning(|| Ok(Vec::new()));
    tracks
        .expect_upsert_many()
        .withf(|batch| {
            batch.iter().map(|t| t.id).collect::<Vec<_>>() == vec![TrackId(2), TrackId(1)]
        })
        .times(1)
        .returning(|_| Ok(()));

    let scanner = FakeScanner::with_files(vec![scanned(1, "b.mp3"), scanned(2, "A.mp3")]);
    let h = start(
        tracks,
        empty_playlists(),
        scanner,
        FakeAnalyzer::returning(MEASURED),
    );
    let mut events = h.service.events();

    let loaded = h.service.fetch_music_list().await.unwrap();

    assert_eq!(loaded.len(), 2);
    assert_eq!(h.scanner.scans(), 1);
    assert_eq!(*h.service.ui_state().borrow(), UiState::Success(loaded.clone()));
    assert_eq!(*h.service.library().borrow(), loaded);
    assert_eq!(
        h.service.current_track().borrow().as_ref().map(|t| t.id),
        Some(TrackId(2))
    );
    assert_eq!(h.engine.calls()[0], "set_media_items:2,1");

    let snapshot = wait_for_ready(&h.service).await;
    assert_eq!(snapshot.track_count, 2);
    assert_eq!(snapshot.status(), PlaybackStatus::Paused);

    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        CoreEvent::Library(LibraryEvent::LibraryLoaded {
            track_count: 2,
            from_cache: false
        })
    )));
}

#[tokio::test]
async fn test_cached_library_loads_once() {
    let mut tracks = MockTrackRepo::new();
    tracks
        .expect_find_all()
        .times(1)
        .returning(|| Ok(vec![track(1), track(2)]));
    let mut playlists = MockPlaylistRepo::new();
    playlists
        .expect_find_all()
        .times(1)
        .returning(|| Ok(vec![playlist(1, "Mix", &[2])]));

    let h = start(
        tracks,
        playlists,
        FakeScanner::default(),
        FakeAnalyzer::returning(MEASURED),
    );

    h.service.load_music_if_needed().await.unwrap();
    h.service.load_music_if_needed().await.unwrap();

    assert_eq!(h.scanner.scans(), 0);
    assert_eq!(h.service.playlists().borrow().len(), 1);
    assert_eq!(h.engine.count("set_media_items"), 1);
}

#[tokio::test]
async fn test_empty_library_is_reloaded_on_next_request() {
    let mut tracks = MockTrackRepo::new();
    tracks.expect_find_all().times(2).returning(|| Ok(Vec::new()));
    tracks.expect_upsert_many().returning(|_| Ok(()));

    let h = start(
        tracks,
        empty_playlists(),
        FakeScanner::default(),
        FakeAnalyzer::returning(MEASURED),
    );

    h.service.load_music_if_needed().await.unwrap();
    h.service.load_music_if_needed().await.unwrap();

    assert_eq!(h.scanner.scans(), 2);
    assert!(h.service.current_track().borrow().is_none());
}

#[tokio::test]
async fn test_load_failure_publishes_error_state() {
    let mut tracks = MockTrackRepo::new();
    tracks.expect_find_all().returning(|| {
        Err(LibraryError::Migration("schema missing".to_string()))
    });

    let h = start(
        tracks,
        empty_playlists(),
        FakeScanner::default(),
        FakeAnalyzer::returning(MEASURED),
    );
    let mut events = h.service.events();

    let err = h.service.fetch_music_list().await.unwrap_err();

    assert!(matches!(err, CoreError::Library(_)));
    assert!(matches!(
        &*h.service.ui_state().borrow(),
        UiState::Error(message) if message.contains("schema missing")
    ));
    assert_eq!(h.engine.count("set_media_items"), 0);
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, CoreEvent::Library(LibraryEvent::LoadFailed { .. }))));
}

#[tokio::test]
async fn test_scan_failure_publishes_error_state() {
    let mut tracks = MockTrackRepo::new();
    tracks.expect_find_all().returning(|| Ok(Vec::new()));
    tracks.expect_upsert_many().never();

    let h = start(
        tracks,
        empty_playlists(),
        FakeScanner::failing(),
        FakeAnalyzer::returning(MEASURED),
    );

    let err = h.service.fetch_music_list().await.unwrap_err();
    assert!(matches!(err, CoreError::Bridge(_)));
    assert!(matches!(&*h.service.ui_state().borrow(), UiState::Error(_)));
}

// ============================================================================
// Playlists and normalization
// ============================================================================

#[tokio::test]
async fn test_create_playlist_analyzes_only_unmeasured_tracks() {
    let mut tracks = library_repo(vec![track(1).with_loudness(MEASURED), track(2)]);
    tracks
        .expect_update_loudness_stats()
        .with(eq(TrackId(2)), eq(MEASURED))
        .times(1)
        .returning(|_, _| Ok(()));

    let mut playlists = MockPlaylistRepo::new();
    playlists
        .expect_create()
        .withf(|name, ids| name == "Road trip" && ids.to_vec() == vec![TrackId(1), TrackId(2)])
        .times(1)
        .returning(|name, _| Ok(playlist(7, name, &[1, 2])));
    playlists
        .expect_find_all()
        .times(1)
        .returning(|| Ok(vec![playlist(7, "Road trip", &[1, 2])]));

    let h = start(
        tracks,
        playlists,
        FakeScanner::default(),
        FakeAnalyzer::returning(MEASURED),
    );
    let mut events = h.service.events();

    h.service.toggle_selection(TrackId(1));
    h.service.toggle_selection(TrackId(2));
    let created = h.service.create_playlist("Road trip").await.unwrap();

    assert_eq!(created.id, PlaylistId(7));
    assert_eq!(h.analyzer.calls(), vec![TrackId(2)]);
    assert!(h.service.selected_ids().is_empty());
    assert_eq!(h.service.playlists().borrow().len(), 1);

    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        CoreEvent::Normalization(NormalizationEvent::TrackAnalyzed { track_id: 2, .. })
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        CoreEvent::Library(LibraryEvent::PlaylistCreated { playlist_id: 7, .. })
    )));
}

#[tokio::test]
async fn test_analysis_failure_does_not_block_adding_tracks() {
    let mut tracks = library_repo(vec![track(4)]);
    tracks.expect_update_loudness_stats().never();

    let mut playlists = MockPlaylistRepo::new();
    playlists
        .expect_add_tracks()
        .with(eq(PlaylistId(3)), always())
        .times(1)
        .returning(|_, _| Ok(()));
    playlists.expect_find_all().returning(|| Ok(Vec::new()));

    let h = start(
        tracks,
        playlists,
        FakeScanner::default(),
        FakeAnalyzer::failing(),
    );
    let mut events = h.service.events();

    h.service.toggle_selection(TrackId(4));
    h.service.add_selected_to_playlist(PlaylistId(3)).await.unwrap();

    assert_eq!(h.analyzer.calls(), vec![TrackId(4)]);
    assert!(h.service.selected_ids().is_empty());
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        CoreEvent::Normalization(NormalizationEvent::AnalysisFailed { track_id: 4, .. })
    )));
}

#[tokio::test]
async fn test_duplicate_and_unknown_ids_are_analyzed_once() {
    let mut tracks = library_repo(vec![track(1)]);
    tracks
        .expect_update_loudness_stats()
        .times(1)
        .returning(|_, _| Ok(()));

    let mut playlists = MockPlaylistRepo::new();
    playlists.expect_add_tracks().returning(|_, _| Ok(()));
    playlists.expect_find_all().returning(|| Ok(Vec::new()));

    let h = start(
        tracks,
        playlists,
        FakeScanner::default(),
        FakeAnalyzer::returning(MEASURED),
    );

    h.service
        .add_tracks_to_playlist(PlaylistId(1), &[TrackId(1), TrackId(99), TrackId(1)])
        .await
        .unwrap();

    assert_eq!(h.analyzer.calls(), vec![TrackId(1)]);
}

#[tokio::test]
async fn test_invalid_playlist_name_is_rejected_before_analysis() {
    let mut playlists = MockPlaylistRepo::new();
    playlists.expect_create().never();

    let h = start(
        library_repo(vec![track(1)]),
        playlists,
        FakeScanner::default(),
        FakeAnalyzer::returning(MEASURED),
    );

    let err = h
        .service
        .create_playlist_with("   ", &[TrackId(1)])
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Library(LibraryError::InvalidInput { .. })));
    assert!(h.analyzer.calls().is_empty());
}

#[tokio::test]
async fn test_remove_track_refetches_playlists() {
    let mut playlists = MockPlaylistRepo::new();
    playlists
        .expect_remove_track()
        .with(eq(PlaylistId(2)), eq(TrackId(5)))
        .times(1)
        .returning(|_, _| Ok(true));
    playlists
        .expect_remove_track()
        .with(eq(PlaylistId(2)), eq(TrackId(6)))
        .returning(|_, _| Ok(false));
    playlists
        .expect_find_all()
        .times(2)
        .returning(|| Ok(vec![playlist(2, "Chill", &[9])]));

    let h = start(
        library_repo(Vec::new()),
        playlists,
        FakeScanner::default(),
        FakeAnalyzer::returning(MEASURED),
    );
    let mut events = h.service.events();

    assert!(h
        .service
        .remove_track_from_playlist(PlaylistId(2), TrackId(5))
        .await
        .unwrap());
    assert!(!h
        .service
        .remove_track_from_playlist(PlaylistId(2), TrackId(6))
        .await
        .unwrap());

    let updates = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, CoreEvent::Library(LibraryEvent::PlaylistUpdated { .. })))
        .count();
    assert_eq!(updates, 1);
    assert_eq!(h.service.playlists().borrow()[0].track_ids, vec![TrackId(9)]);
}

// ============================================================================
// Selection
// ============================================================================

#[tokio::test]
async fn test_toggle_selection_keeps_selection_order() {
    let h = start(
        library_repo(Vec::new()),
        empty_playlists(),
        FakeScanner::default(),
        FakeAnalyzer::returning(MEASURED),
    );
    let watch = h.service.selected_ids_watch();

    h.service.toggle_selection(TrackId(3));
    h.service.toggle_selection(TrackId(1));
    h.service.toggle_selection(TrackId(2));
    h.service.toggle_selection(TrackId(1));

    assert_eq!(*watch.borrow(), vec![TrackId(3), TrackId(2)]);

    h.service.clear_selection();
    assert!(watch.borrow().is_empty());
}

// ============================================================================
// Playback
// ============================================================================

#[tokio::test]
async fn test_play_playlist_swaps_the_active_list() {
    let library: Vec<_> = (1..=10).map(track).collect();
    let h = start(
        library_repo(library),
        empty_playlists(),
        FakeScanner::default(),
        FakeAnalyzer::returning(MEASURED),
    );
    h.service.fetch_music_list().await.unwrap();
    h.service
        .on_player_ui_event(PlayerIntent::PlayPause)
        .await
        .unwrap();
    h.engine.clear_calls();

    h.service
        .play_playlist(&playlist(1, "Mix", &[5, 9, 3]))
        .await
        .unwrap();

    let active: Vec<_> = h
        .service
        .active_playlist_tracks()
        .borrow()
        .iter()
        .map(|t| t.id.0)
        .collect();
    assert_eq!(active, vec![5, 9, 3]);
    assert_eq!(
        h.service.current_track().borrow().as_ref().map(|t| t.id),
        Some(TrackId(5))
    );

    let calls = h.engine.calls();
    let clear = calls.iter().position(|c| c == "clear_media_items").unwrap();
    let load = calls
        .iter()
        .position(|c| c == "set_media_items:5,9,3")
        .unwrap();
    assert!(clear < load);
    assert!(calls.contains(&"seek_to_item:0:0".to_string()));

    let snapshot = wait_for_ready(&h.service).await;
    assert_eq!(snapshot.current_index, 0);
    assert_eq!(snapshot.track_count, 3);
    assert_eq!(snapshot.status(), PlaybackStatus::Paused);
}

#[tokio::test]
async fn test_selecting_a_track_applies_its_gain_first() {
    let library = vec![track(1), track(2).with_loudness(MEASURED)];
    let h = start(
        library_repo(library),
        empty_playlists(),
        FakeScanner::default(),
        FakeAnalyzer::returning(MEASURED),
    );
    h.service.fetch_music_list().await.unwrap();

    // 3 wraps to index 1 of the two-track library.
    h.service
        .on_player_ui_event(PlayerIntent::SelectedAudioChange(3))
        .await
        .unwrap();

    // Loading the library applied the unmeasured first track's gain.
    assert_eq!(h.enhancer.gains(), vec![0.0, 3.0]);
    assert_eq!(
        h.service.current_track().borrow().as_ref().map(|t| t.id),
        Some(TrackId(2))
    );
    assert_eq!(h.engine.count("seek_to_default_position:1"), 1);
    assert!(h.service.playback_snapshot().is_playing);
}

#[tokio::test]
async fn test_selection_resolves_against_active_playlist() {
    let library: Vec<_> = (1..=10).map(track).collect();
    let h = start(
        library_repo(library),
        empty_playlists(),
        FakeScanner::default(),
        FakeAnalyzer::returning(MEASURED),
    );
    h.service.fetch_music_list().await.unwrap();
    h.service
        .play_playlist(&playlist(1, "Mix", &[5, 9, 3]))
        .await
        .unwrap();

    h.service
        .on_player_ui_event(PlayerIntent::SelectedAudioChange(-1))
        .await
        .unwrap();

    assert_eq!(
        h.service.current_track().borrow().as_ref().map(|t| t.id),
        Some(TrackId(3))
    );
    assert_eq!(h.enhancer.gains(), vec![0.0, 0.0, 0.0]);

    h.service.reset_playlist_selection().await.unwrap();
    assert!(h.service.active_playlist_tracks().borrow().is_empty());
    assert_eq!(
        h.service.current_track().borrow().as_ref().map(|t| t.id),
        Some(TrackId(1))
    );
    assert_eq!(h.service.playback_snapshot().track_count, 10);
}

#[tokio::test]
async fn test_loading_a_list_applies_the_first_track_gain() {
    let library = vec![track(1).with_loudness(MEASURED), track(2)];
    let h = start(
        library_repo(library),
        empty_playlists(),
        FakeScanner::default(),
        FakeAnalyzer::returning(MEASURED),
    );
    h.service.fetch_music_list().await.unwrap();
    assert_eq!(h.enhancer.gains(), vec![3.0]);

    h.service
        .on_player_ui_event(PlayerIntent::SelectedAudioChange(1))
        .await
        .unwrap();
    assert_eq!(h.enhancer.gains().last(), Some(&0.0));

    h.service
        .play_playlist(&playlist(1, "Loud", &[1]))
        .await
        .unwrap();
    assert_eq!(
        h.service.current_track().borrow().as_ref().map(|t| t.id),
        Some(TrackId(1))
    );
    assert_eq!(h.enhancer.gains().last(), Some(&3.0));

    h.service
        .on_player_ui_event(PlayerIntent::SelectedAudioChange(1))
        .await
        .unwrap();
    h.service.reset_playlist_selection().await.unwrap();
    assert_eq!(h.enhancer.gains(), vec![3.0, 0.0, 3.0, 3.0, 3.0]);
}

#[tokio::test]
async fn test_selection_without_tracks_is_ignored() {
    let h = start(
        library_repo(Vec::new()),
        empty_playlists(),
        FakeScanner::default(),
        FakeAnalyzer::returning(MEASURED),
    );

    h.service
        .on_player_ui_event(PlayerIntent::SelectedAudioChange(0))
        .await
        .unwrap();

    assert!(h.enhancer.gains().is_empty());
    assert!(h.service.current_track().borrow().is_none());
}

#[tokio::test]
async fn test_controls_are_forwarded() {
    let h = start(
        library_repo(vec![track(1), track(2)]),
        empty_playlists(),
        FakeScanner::default(),
        FakeAnalyzer::returning(MEASURED),
    );
    h.service.fetch_music_list().await.unwrap();
    wait_for_ready(&h.service).await;

    h.service
        .on_player_ui_event(PlayerIntent::SeekTo(50.0))
        .await
        .unwrap();
    h.service
        .on_player_ui_event(PlayerIntent::SeekToNext)
        .await
        .unwrap();

    assert_eq!(h.engine.count("seek_to:90000"), 1);
    assert_eq!(h.engine.count("seek_to_next_item"), 1);
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let h = start(
        library_repo(vec![track(1)]),
        empty_playlists(),
        FakeScanner::default(),
        FakeAnalyzer::returning(MEASURED),
    );
    h.service.fetch_music_list().await.unwrap();

    h.service.shutdown().await;
    h.service.shutdown().await;

    assert!(h.service.is_shut_down());
    assert_eq!(h.engine.count("release"), 1);
    assert_eq!(h.enhancer.release_count(), 1);
    assert!(matches!(
        h.service
            .on_player_ui_event(PlayerIntent::PlayPause)
            .await
            .unwrap_err(),
        CoreError::Playback(_)
    ));
}
