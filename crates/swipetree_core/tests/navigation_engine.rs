use async_trait::async_trait;
use rusqlite::Connection;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use swipetree_core::service::location::LocationReflector;
use swipetree_core::service::navigation::{ArtifactStatus, BackResult};
use swipetree_core::{
    open_db_in_memory, parse, DispatchOutcome, EditResult, EngineConfig, ExistenceProbe,
    GestureEvent, GestureTracker, GridKind, IdError, Identifier, Intent, LabelSync,
    LabelSyncError, MetadataStore, NavState, NavigationEngine, NavigationError, PersonMeta,
    SoftEditor, SqliteMetaRepository, SwipeDirection, SyncStatus,
};

struct SetProbe {
    existing: HashSet<String>,
}

#[async_trait]
impl ExistenceProbe for SetProbe {
    async fn probe(&self, id: &Identifier) -> bool {
        self.existing.contains(&id.to_string())
    }
}

struct ScriptedEditor(EditResult);

#[async_trait]
impl SoftEditor for ScriptedEditor {
    async fn request_edit(&self, _id: &Identifier, _current: &PersonMeta) -> EditResult {
        self.0.clone()
    }
}

struct RejectingRemote;

#[async_trait]
impl LabelSync for RejectingRemote {
    async fn commit_label(&self, _id: &Identifier, _meta: &PersonMeta) -> Result<(), LabelSyncError> {
        Err(LabelSyncError::CommitConflict {
            status: 409,
            detail: "sha mismatch".to_string(),
        })
    }
}

struct RecordingReflector(Arc<Mutex<Vec<String>>>);

impl LocationReflector for RecordingReflector {
    fn replace_fragment(&mut self, fragment: &str) {
        self.0.lock().unwrap().push(fragment.to_string());
    }
}

type Engine<'c> = NavigationEngine<SetProbe, SqliteMetaRepository<'c>>;

fn engine<'c>(conn: &'c Connection, start: &str, existing: &[&str]) -> Engine<'c> {
    let probe = SetProbe {
        existing: existing.iter().map(|id| id.to_string()).collect(),
    };
    let store = SqliteMetaRepository::new(conn, "swipetree");
    NavigationEngine::new(EngineConfig::default(), probe, store, start).unwrap()
}

fn grid_ids(engine: &Engine<'_>) -> Vec<String> {
    engine
        .grid()
        .map(|grid| grid.cards.iter().map(|card| card.id.to_string()).collect())
        .unwrap_or_default()
}

fn history(engine: &Engine<'_>) -> Vec<String> {
    engine.history().iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn swipe_down_opens_children_grid_with_existing_cards() {
    let conn = open_db_in_memory().unwrap();
    let mut engine = engine(&conn, "140000", &["141000", "145000"]);

    let outcome = engine.dispatch(SwipeDirection::Down.into()).await.unwrap();

    assert_eq!(
        outcome,
        DispatchOutcome::GridOpened {
            kind: GridKind::Children,
            cards: 2
        }
    );
    assert_eq!(engine.state(), NavState::GridOpen(GridKind::Children));
    assert_eq!(grid_ids(&engine), vec!["141000", "145000"]);
    assert!(engine.history().is_empty());
}

#[tokio::test]
async fn swipes_while_grid_is_open_are_ignored() {
    let conn = open_db_in_memory().unwrap();
    let mut engine = engine(&conn, "140000", &["141000", "130000"]);
    engine.dispatch(SwipeDirection::Down.into()).await.unwrap();

    for direction in [SwipeDirection::Left, SwipeDirection::Up, SwipeDirection::Right] {
        let outcome = engine.dispatch(direction.into()).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Ignored);
    }
    assert_eq!(engine.state(), NavState::GridOpen(GridKind::Children));
    assert_eq!(grid_ids(&engine), vec!["141000"]);
}

#[tokio::test]
async fn tap_tile_navigates_with_history_and_reflects_location() {
    let conn = open_db_in_memory().unwrap();
    let fragments = Arc::new(Mutex::new(Vec::new()));
    let mut engine = engine(&conn, "140000", &["141000", "145000"])
        .with_location_reflector(Box::new(RecordingReflector(Arc::clone(&fragments))));

    engine.dispatch(SwipeDirection::Down.into()).await.unwrap();
    let outcome = engine.dispatch(Intent::TapTile(1)).await.unwrap();

    assert_eq!(outcome, DispatchOutcome::Navigated(parse("145000").unwrap()));
    assert_eq!(engine.state(), NavState::Viewing);
    assert_eq!(engine.anchor().to_string(), "145000");
    assert_eq!(history(&engine), vec!["140000"]);
    assert_eq!(engine.location_fragment(), "id=145000");
    assert_eq!(engine.anchor_view().status, ArtifactStatus::Found);
    assert_eq!(engine.anchor_view().artifact_ref, "145000.jpg");
    assert_eq!(
        *fragments.lock().unwrap(),
        vec!["id=140000".to_string(), "id=145000".to_string()]
    );
}

#[tokio::test]
async fn tap_out_of_range_or_without_grid_is_ignored() {
    let conn = open_db_in_memory().unwrap();
    let mut engine = engine(&conn, "140000", &["141000"]);

    assert_eq!(
        engine.dispatch(Intent::TapTile(0)).await.unwrap(),
        DispatchOutcome::Ignored
    );
    engine.dispatch(SwipeDirection::Down.into()).await.unwrap();
    assert_eq!(
        engine.dispatch(Intent::TapTile(5)).await.unwrap(),
        DispatchOutcome::Ignored
    );
    assert_eq!(engine.state(), NavState::GridOpen(GridKind::Children));
}

#[tokio::test]
async fn back_closes_grid_before_touching_history() {
    let conn = open_db_in_memory().unwrap();
    let mut engine = engine(&conn, "140000", &["141000", "145000"]);
    engine.dispatch(SwipeDirection::Down.into()).await.unwrap();
    engine.dispatch(Intent::TapTile(0)).await.unwrap();
    engine.dispatch(SwipeDirection::Left.into()).await.unwrap();
    assert_eq!(engine.state(), NavState::GridOpen(GridKind::Siblings));
    assert_eq!(grid_ids(&engine), vec!["145000"]);

    assert_eq!(engine.back(), BackResult::GridClosed);
    assert_eq!(engine.state(), NavState::Viewing);
    assert_eq!(engine.anchor().to_string(), "141000");
    assert_eq!(history(&engine), vec!["140000"]);

    let outcome = engine.dispatch(Intent::Back).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Navigated(parse("140000").unwrap()));
    assert!(engine.history().is_empty());
    assert_eq!(engine.location_fragment(), "id=140000");
}

#[tokio::test]
async fn back_on_empty_history_is_a_no_op() {
    let conn = open_db_in_memory().unwrap();
    let mut engine = engine(&conn, "140000", &[]);

    assert_eq!(engine.back(), BackResult::Ignored);
    assert_eq!(
        engine.dispatch(Intent::Back).await.unwrap(),
        DispatchOutcome::Ignored
    );
    assert_eq!(engine.anchor().to_string(), "140000");
}

#[tokio::test]
async fn parents_grid_adds_placeholder_for_missing_second_parent() {
    let conn = open_db_in_memory().unwrap();
    let mut engine = engine(&conn, "140000", &["100000"]);

    let outcome = engine.dispatch(SwipeDirection::Up.into()).await.unwrap();

    assert_eq!(
        outcome,
        DispatchOutcome::GridOpened {
            kind: GridKind::Parents,
            cards: 2
        }
    );
    let cards = &engine.grid().unwrap().cards;
    assert_eq!(cards[0].id.to_string(), "100000");
    assert!(!cards[0].placeholder);
    assert_eq!(cards[1].id.to_string(), "100000.1");
    assert!(cards[1].placeholder);
    assert_eq!(cards[1].artifact_ref, "placeholder.jpg");
}

#[tokio::test]
async fn parents_grid_shows_existing_second_parent() {
    let conn = open_db_in_memory().unwrap();
    let mut engine = engine(&conn, "140000", &["100000.1"]);

    engine.dispatch(SwipeDirection::Up.into()).await.unwrap();

    let cards = &engine.grid().unwrap().cards;
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].id.to_string(), "100000.1");
    assert_eq!(cards[0].artifact_ref, "100000.1.jpg");
    assert!(!cards[0].placeholder);
}

#[tokio::test]
async fn parents_grid_at_root_is_empty() {
    let conn = open_db_in_memory().unwrap();
    let mut engine = engine(&conn, "000000", &["000000.1"]);

    let outcome = engine.dispatch(SwipeDirection::Up.into()).await.unwrap();

    assert_eq!(
        outcome,
        DispatchOutcome::GridOpened {
            kind: GridKind::Parents,
            cards: 0
        }
    );
    assert!(grid_ids(&engine).is_empty());
}

#[tokio::test]
async fn spouse_toggle_navigates_only_when_target_exists() {
    let conn = open_db_in_memory().unwrap();
    let mut engine = engine(&conn, "140000", &["140000.1"]);

    let outcome = engine.dispatch(SwipeDirection::Right.into()).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Navigated(parse("140000.1").unwrap()));
    assert_eq!(history(&engine), vec!["140000"]);

    // The base person has no artifact, so toggling back is a no-op.
    let outcome = engine.dispatch(SwipeDirection::Right.into()).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Ignored);
    assert_eq!(engine.anchor().to_string(), "140000.1");
    assert_eq!(engine.state(), NavState::Viewing);
}

#[tokio::test]
async fn spouse_kind_never_opens_a_grid() {
    let conn = open_db_in_memory().unwrap();
    let mut engine = engine(&conn, "140000", &["140000.1"]);

    assert!(engine.request_grid(GridKind::Spouse).unwrap().is_none());
    assert_eq!(engine.state(), NavState::Viewing);
}

#[tokio::test]
async fn stale_grid_result_is_discarded_after_anchor_change() {
    let conn = open_db_in_memory().unwrap();
    let mut engine = engine(&conn, "140000", &["141000", "151000"]);

    let request = engine.request_grid(GridKind::Children).unwrap().unwrap();
    let ticket = engine.jump_to("150000").unwrap();
    let result = engine.resolve_grid(request).await;

    assert!(!engine.apply_grid(result));
    assert_eq!(engine.state(), NavState::Viewing);

    let load = engine.load_anchor(ticket).await;
    assert!(engine.apply_anchor(load));
    let request = engine.request_grid(GridKind::Children).unwrap().unwrap();
    let result = engine.resolve_grid(request).await;
    assert!(engine.apply_grid(result));
    assert_eq!(grid_ids(&engine), vec!["151000"]);
}

#[tokio::test]
async fn superseded_grid_request_is_discarded() {
    let conn = open_db_in_memory().unwrap();
    let mut engine = engine(&conn, "140000", &["141000", "130000"]);

    let children = engine.request_grid(GridKind::Children).unwrap().unwrap();
    let siblings = engine.request_grid(GridKind::Siblings).unwrap().unwrap();
    let children = engine.resolve_grid(children).await;
    let siblings = engine.resolve_grid(siblings).await;

    assert!(!engine.apply_grid(children));
    assert!(engine.apply_grid(siblings));
    assert_eq!(engine.state(), NavState::GridOpen(GridKind::Siblings));
    assert_eq!(grid_ids(&engine), vec!["130000"]);
}

#[tokio::test]
async fn stale_anchor_load_is_discarded() {
    let conn = open_db_in_memory().unwrap();
    let mut engine = engine(&conn, "140000", &["141000"]);

    let first = engine.jump_to("141000").unwrap();
    let second = engine.jump_to("149000").unwrap();
    let first = engine.load_anchor(first).await;
    let second = engine.load_anchor(second).await;

    assert!(!engine.apply_anchor(first));
    assert_eq!(engine.anchor_view().status, ArtifactStatus::Pending);
    assert!(engine.apply_anchor(second));

    let view = engine.anchor_view();
    assert_eq!(view.id.to_string(), "149000");
    assert_eq!(view.status, ArtifactStatus::Missing);
    assert_eq!(view.artifact_ref, "placeholder.jpg");
    assert_eq!(history(&engine), vec!["140000", "141000"]);
}

#[tokio::test]
async fn stale_spouse_probe_does_not_navigate() {
    let conn = open_db_in_memory().unwrap();
    let mut engine = engine(&conn, "140000", &["140000.1"]);

    let request = engine.request_spouse().unwrap();
    assert_eq!(request.target().to_string(), "140000.1");
    engine.jump_to("141000").unwrap();
    let probe = engine.probe_spouse(request).await;

    assert!(engine.apply_spouse(probe).is_none());
    assert_eq!(engine.anchor().to_string(), "141000");
}

#[tokio::test]
async fn sub_threshold_swipe_leaves_state_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let mut engine = engine(&conn, "140000", &["141000"]);
    let mut tracker = GestureTracker::new(engine.config());
    let start = Instant::now();

    tracker.press(200.0, 200.0, start);
    let event = tracker.release(210.0, 205.0, start + Duration::from_millis(80));
    assert_eq!(event, None);
    assert_eq!(engine.state(), NavState::Viewing);

    tracker.press(200.0, 200.0, start);
    tracker.motion(200.0, 240.0);
    let event = tracker
        .release(205.0, 290.0, start + Duration::from_millis(120))
        .unwrap();
    assert_eq!(event, GestureEvent::Swipe(SwipeDirection::Down));
    engine.dispatch(event.into()).await.unwrap();
    assert_eq!(engine.state(), NavState::GridOpen(GridKind::Children));
}

#[tokio::test]
async fn long_press_saves_cleaned_metadata_locally() {
    let conn = open_db_in_memory().unwrap();
    let edit = PersonMeta {
        name: Some(" Ada\u{a0}Lovelace ".to_string()),
        dob: Some("1815-12-10".to_string()),
    };
    let mut engine =
        engine(&conn, "140000", &[]).with_soft_editor(Box::new(ScriptedEditor(EditResult::Saved(edit))));

    let mut tracker = GestureTracker::new(engine.config());
    let start = Instant::now();
    tracker.press(50.0, 50.0, start);
    tracker.motion(54.0, 47.0);
    let event = tracker.poll(start + Duration::from_millis(600)).unwrap();
    assert_eq!(event, GestureEvent::LongPress);
    assert_eq!(tracker.release(54.0, 47.0, start + Duration::from_millis(700)), None);

    let outcome = engine.dispatch(event.into()).await.unwrap();

    assert_eq!(outcome, DispatchOutcome::MetadataSaved(SyncStatus::LocalOnly));
    assert_eq!(engine.anchor_view().display_name, "AdaLovelace");
    let stored = engine
        .metadata()
        .store()
        .get_meta(&parse("140000").unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(stored.dob.as_deref(), Some("1815-12-10"));
}

#[tokio::test]
async fn long_press_reports_remote_failure_but_keeps_local_write() {
    let conn = open_db_in_memory().unwrap();
    let edit = PersonMeta::new(Some("Ada".to_string()), None);
    let mut engine = engine(&conn, "140000", &[])
        .with_soft_editor(Box::new(ScriptedEditor(EditResult::Saved(edit))))
        .with_remote_sync(Box::new(RejectingRemote));

    let outcome = engine.dispatch(Intent::LongPress).await.unwrap();

    match outcome {
        DispatchOutcome::MetadataSaved(SyncStatus::Failed(LabelSyncError::CommitConflict {
            status,
            ..
        })) => assert_eq!(status, 409),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(engine.metadata().label(&parse("140000").unwrap()), "Ada");
}

#[tokio::test]
async fn long_press_cancel_and_missing_editor() {
    let conn = open_db_in_memory().unwrap();
    let mut without_editor = engine(&conn, "140000", &[]);
    assert_eq!(
        without_editor.dispatch(Intent::LongPress).await.unwrap(),
        DispatchOutcome::Ignored
    );

    let mut engine = engine(&conn, "140000", &[])
        .with_soft_editor(Box::new(ScriptedEditor(EditResult::Cancelled)));
    assert_eq!(
        engine.dispatch(Intent::LongPress).await.unwrap(),
        DispatchOutcome::EditCancelled
    );
    assert!(engine
        .metadata()
        .store()
        .get_meta(&parse("140000").unwrap())
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn jump_to_rejects_wrong_width() {
    let conn = open_db_in_memory().unwrap();
    let mut engine = engine(&conn, "140000", &[]);

    let err = engine.jump_to("14000").unwrap_err();
    assert!(matches!(err, NavigationError::Id(IdError::MalformedId(_))));
    assert_eq!(engine.anchor().to_string(), "140000");

    let store = SqliteMetaRepository::new(&conn, "swipetree");
    let probe = SetProbe {
        existing: HashSet::new(),
    };
    assert!(NavigationEngine::new(EngineConfig::default(), probe, store, "abc").is_err());
}
