//! End-to-end tests for recording sessions against the headless harness.

use pilot_core::{Application, InputEvent, LaunchError, Offset, Size, WidgetTree};
use pilot_harness::{HeadlessApp, Layout};
use pilot_recorder::{
    CaptureOutcome, RecorderConfig, RecorderError, ReplayConfig, SessionController,
    SessionState, Step, StepEvent, StepLog,
};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;
use tempfile::TempDir;

const LAYOUT: &str = r##"
size = { width = 60, height = 20 }

[[widgets]]
kind = "Button"
id = "ok-button"
region = { x = 10, y = 5, width = 8, height = 3 }

[[widgets]]
kind = "Toolbar"
region = { x = 0, y = 0, width = 60, height = 3 }

[[widgets.children]]
kind = "Button"
region = { x = 0, y = 0, width = 6, height = 3 }

[[widgets.children]]
kind = "Button"
region = { x = 10, y = 0, width = 6, height = 3 }

[[widgets]]
kind = "Button"
id = "add"
region = { x = 30, y = 5, width = 8, height = 3 }
on_press = [{ action = "insert", parent = "#canvas", widget = { kind = "Label" } }]

[[widgets]]
kind = "Panel"
id = "canvas"
region = { x = 0, y = 10, width = 60, height = 10 }
"##;

// ============================================================================
// Test host
// ============================================================================

type EventLog = Rc<RefCell<Vec<InputEvent>>>;

/// Event logs of every instance launched so far.
#[derive(Clone, Default)]
struct Launches(Rc<RefCell<Vec<EventLog>>>);

impl Launches {
    fn count(&self) -> usize {
        self.0.borrow().len()
    }

    fn events(&self, launch: usize) -> Vec<InputEvent> {
        self.0.borrow()[launch].borrow().clone()
    }
}

/// A headless app that remembers every event it was given.
struct Tracked {
    inner: HeadlessApp,
    events: EventLog,
    stubborn: bool,
}

impl Application for Tracked {
    fn tree(&self) -> &dyn WidgetTree {
        self.inner.tree()
    }

    fn size(&self) -> Size {
        self.inner.size()
    }

    fn handle_event(&mut self, event: &InputEvent) {
        self.events.borrow_mut().push(event.clone());
        self.inner.handle_event(event);
    }

    fn exit(&mut self) {
        self.inner.exit();
    }

    fn is_running(&self) -> bool {
        self.stubborn || self.inner.is_running()
    }

    fn settle(&mut self) {
        self.inner.settle();
    }
}

fn factory(
    launches: &Launches,
    stubborn: bool,
) -> impl Fn() -> Result<Box<dyn Application>, LaunchError> + use<> {
    let layout = Layout::from_toml_str(LAYOUT).unwrap();
    let launches = launches.clone();
    move || {
        let inner = HeadlessApp::from_layout(&layout).map_err(|e| LaunchError(e.to_string()))?;
        let events = EventLog::default();
        launches.0.borrow_mut().push(events.clone());
        Ok(Box::new(Tracked {
            inner,
            events,
            stubborn,
        }) as Box<dyn Application>)
    }
}

fn config(dir: &TempDir) -> RecorderConfig {
    RecorderConfig::default()
        .with_output_path(dir.path().join("tests").join("test_paint_something.rs"))
        .with_app_path("paint.toml")
}

fn key(name: &str) -> InputEvent {
    InputEvent::key(name).unwrap()
}

// ============================================================================
// Capture scenarios
// ============================================================================

#[tokio::test]
async fn test_click_on_id_widget() {
    let dir = TempDir::new().unwrap();
    let launches = Launches::default();
    let mut session = SessionController::new(factory(&launches, false), config(&dir)).unwrap();
    session.start().await.unwrap();
    assert_eq!(session.state(), SessionState::Live);

    let outcome = session
        .dispatch(&InputEvent::mouse_down(13, 7))
        .await
        .unwrap();
    assert_eq!(outcome, CaptureOutcome::Recorded);

    let step = &session.steps()[0];
    assert_eq!(step.selector, "#ok-button");
    assert_eq!(step.index, None);
    assert_eq!(step.offset, Some(Offset::new(3, 2)));
    assert!(matches!(step.event, StepEvent::PointerDown { .. }));
}

#[tokio::test]
async fn test_second_of_two_buttons_is_indexed() {
    let dir = TempDir::new().unwrap();
    let launches = Launches::default();
    let mut session = SessionController::new(factory(&launches, false), config(&dir)).unwrap();
    session.start().await.unwrap();

    session
        .dispatch(&InputEvent::mouse_down(11, 1))
        .await
        .unwrap();

    let step = &session.steps()[0];
    assert_eq!(step.selector, "Toolbar Button");
    assert_eq!(step.index, Some(1));
    assert_eq!(step.offset, Some(Offset::new(1, 1)));
}

#[tokio::test]
async fn test_events_outside_widgets_are_ignored() {
    let dir = TempDir::new().unwrap();
    let launches = Launches::default();
    let mut session = SessionController::new(factory(&launches, false), config(&dir)).unwrap();
    session.start().await.unwrap();

    let outcome = session
        .dispatch(&InputEvent::mouse_down(500, 500))
        .await
        .unwrap();
    assert_eq!(outcome, CaptureOutcome::Ignored);
    assert!(session.steps().is_empty());
}

// ============================================================================
// Undo
// ============================================================================

#[tokio::test]
async fn test_undo_restarts_and_replays_prefix() {
    let dir = TempDir::new().unwrap();
    let launches = Launches::default();
    let mut session = SessionController::new(factory(&launches, false), config(&dir)).unwrap();
    session.start().await.unwrap();

    session
        .dispatch(&InputEvent::mouse_down(31, 6))
        .await
        .unwrap();
    session.dispatch(&key("a")).await.unwrap();
    session
        .dispatch(&InputEvent::mouse_down(31, 6))
        .await
        .unwrap();
    let before: Vec<Step> = session.steps().to_vec();
    assert_eq!(before.len(), 3);
    assert_eq!(
        session.app().unwrap().tree().query("#canvas Label").unwrap().len(),
        2
    );

    let outcome = session.dispatch(&key("ctrl+z")).await.unwrap();
    assert_eq!(outcome, CaptureOutcome::Undo(before[2].clone()));

    // Undo keeps the first steps untouched.
    assert_eq!(session.steps(), &before[..2]);
    assert_eq!(session.state(), SessionState::Live);
    assert_eq!(session.restarts(), 1);
    assert_eq!(launches.count(), 2);

    // The fresh instance went through the remaining steps before control
    // came back.
    let replayed = launches.events(1);
    assert_eq!(
        replayed,
        vec![
            InputEvent::mouse_down(31, 6),
            InputEvent::mouse_up(31, 6),
            key("a"),
        ]
    );
    assert_eq!(
        session.app().unwrap().tree().query("#canvas Label").unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_replay_adds_no_steps() {
    let dir = TempDir::new().unwrap();
    let launches = Launches::default();
    let mut session = SessionController::new(factory(&launches, false), config(&dir)).unwrap();
    session.start().await.unwrap();

    for event in [
        InputEvent::mouse_down(13, 7),
        InputEvent::mouse_up(13, 7),
        key("b"),
        key("c"),
    ] {
        session.dispatch(&event).await.unwrap();
    }
    session.dispatch(&key("ctrl+z")).await.unwrap();
    assert_eq!(session.steps().len(), 3);

    session.restart().await.unwrap();
    assert_eq!(session.steps().len(), 3);
    assert_eq!(session.restarts(), 2);
}

#[tokio::test]
async fn test_undo_on_empty_log_is_noop() {
    let dir = TempDir::new().unwrap();
    let launches = Launches::default();
    let mut session = SessionController::new(factory(&launches, false), config(&dir)).unwrap();
    session.start().await.unwrap();

    let outcome = session.dispatch(&key("ctrl+z")).await.unwrap();
    assert_eq!(outcome, CaptureOutcome::Ignored);
    assert_eq!(session.restarts(), 0);
    assert_eq!(launches.count(), 1);
    assert!(session.steps().is_empty());
}

#[tokio::test]
async fn test_restart_times_out_on_stuck_instance() {
    let dir = TempDir::new().unwrap();
    let launches = Launches::default();
    let config = config(&dir).with_replay(ReplayConfig {
        exit_timeout_ms: 20,
        ..ReplayConfig::default()
    });
    let mut session = SessionController::new(factory(&launches, true), config).unwrap();
    session.start().await.unwrap();

    let err = session.restart().await.unwrap_err();
    assert!(matches!(err, RecorderError::ExitTimeout(20)));
    assert_eq!(session.state(), SessionState::NoApp);
}

// ============================================================================
// Saving
// ============================================================================

#[tokio::test]
async fn test_finalize_writes_unique_files() {
    let dir = TempDir::new().unwrap();
    let launches = Launches::default();
    let mut session = SessionController::new(factory(&launches, false), config(&dir)).unwrap();
    session.start().await.unwrap();

    session
        .dispatch(&InputEvent::mouse_down(13, 7))
        .await
        .unwrap();
    session
        .dispatch(&InputEvent::mouse_down(11, 1))
        .await
        .unwrap();
    session.dispatch(&key("enter")).await.unwrap();

    let outcome = session.dispatch(&key("ctrl+c")).await.unwrap();
    assert_eq!(outcome, CaptureOutcome::Finalize);
    session.dispatch(&key("ctrl+c")).await.unwrap();

    let tests_dir = dir.path().join("tests");
    assert_eq!(
        session.saved_files(),
        &[
            tests_dir.join("test_paint_something.rs"),
            tests_dir.join("test_paint_something_1.rs"),
        ]
    );

    let source = std::fs::read_to_string(&session.saved_files()[0]).unwrap();
    assert!(source.contains("const APP: &str = \"paint.toml\";"));
    assert!(source.contains(
        "pilot.click(Some(\"#ok-button\"), Offset::new(3, 2), Modifiers::empty()).await?;"
    ));
    assert!(source.contains("let widget = pilot.query(\"Toolbar Button\")?[1];"));
    assert!(source.contains("pilot.press(\"enter\").await?;"));
    assert!(source.contains("SnapOptions::new(60, 20)"));
    assert!(!source.contains("ctrl+c"));

    // Saving twice without new steps yields identical text.
    let second = std::fs::read_to_string(&session.saved_files()[1]).unwrap();
    assert_eq!(source, second);
}

#[tokio::test]
async fn test_empty_session_saves_noop_test() {
    let dir = TempDir::new().unwrap();
    let launches = Launches::default();
    let mut session = SessionController::new(factory(&launches, false), config(&dir)).unwrap();
    session.start().await.unwrap();

    let path = session.save().await.unwrap();
    let source = std::fs::read_to_string(path).unwrap();
    assert!(source.contains("        let _ = pilot;\n        Ok(())"));
}

#[tokio::test]
async fn test_export_steps_beside_test() {
    let dir = TempDir::new().unwrap();
    let launches = Launches::default();
    let config = config(&dir).with_export_steps(true);
    let mut session = SessionController::new(factory(&launches, false), config).unwrap();
    session.start().await.unwrap();
    session.dispatch(&key("x")).await.unwrap();

    let path = session.save().await.unwrap();
    let log = StepLog::import(path.with_extension("json")).await.unwrap();
    assert_eq!(log.steps(), session.steps());
}

#[tokio::test]
async fn test_export_never_replaces_existing_log() {
    let dir = TempDir::new().unwrap();
    let tests_dir = dir.path().join("tests");
    std::fs::create_dir_all(&tests_dir).unwrap();
    let existing = tests_dir.join("test_paint_something.json");
    std::fs::write(&existing, "KEEP ME").unwrap();

    let launches = Launches::default();
    let config = config(&dir).with_export_steps(true);
    let mut session = SessionController::new(factory(&launches, false), config).unwrap();
    session.start().await.unwrap();
    session.dispatch(&key("x")).await.unwrap();

    let path = session.save().await.unwrap();
    assert_eq!(path, tests_dir.join("test_paint_something_1.rs"));
    assert!(!tests_dir.join("test_paint_something.rs").exists());
    assert_eq!(std::fs::read_to_string(&existing).unwrap(), "KEEP ME");

    let log = StepLog::import(tests_dir.join("test_paint_something_1.json"))
        .await
        .unwrap();
    assert_eq!(log.steps(), session.steps());
}

#[tokio::test]
async fn test_save_skips_file_created_by_someone_else() {
    let dir = TempDir::new().unwrap();
    let launches = Launches::default();
    let mut session = SessionController::new(factory(&launches, false), config(&dir)).unwrap();
    session.start().await.unwrap();

    let tests_dir = dir.path().join("tests");
    std::fs::create_dir_all(&tests_dir).unwrap();
    std::fs::write(tests_dir.join("test_paint_something.rs"), "// hand written").unwrap();

    let path = session.save().await.unwrap();
    assert_eq!(path, tests_dir.join("test_paint_something_1.rs"));
    assert_eq!(
        std::fs::read_to_string(tests_dir.join("test_paint_something.rs")).unwrap(),
        "// hand written"
    );
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_state_machine_guards() {
    let dir = TempDir::new().unwrap();
    let launches = Launches::default();
    let mut session = SessionController::new(factory(&launches, false), config(&dir)).unwrap();
    assert_eq!(session.state(), SessionState::NoApp);

    assert!(matches!(
        session.dispatch(&key("a")).await,
        Err(RecorderError::InvalidState { .. })
    ));
    assert!(matches!(
        session.restart().await,
        Err(RecorderError::InvalidState { .. })
    ));
    assert!(matches!(
        session.save().await,
        Err(RecorderError::InvalidState { .. })
    ));

    session.start().await.unwrap();
    assert!(matches!(
        session.start().await,
        Err(RecorderError::InvalidState { .. })
    ));

    session.stop().await.unwrap();
    assert_eq!(session.state(), SessionState::NoApp);
    assert!(session.app().is_none());
}

#[tokio::test]
async fn test_start_replays_preloaded_log() {
    let dir = TempDir::new().unwrap();
    let launches = Launches::default();
    let log = StepLog::from(vec![
        Step::click("#add", None, Offset::new(1, 1)),
        Step::click("Toolbar Button", Some(0), Offset::ZERO),
    ]);
    let mut session = SessionController::new(factory(&launches, false), config(&dir))
        .unwrap()
        .with_log(log);

    let report = session.start().await.unwrap();
    assert_eq!(report.executed, 2);
    assert_eq!(session.steps().len(), 2);
    assert_eq!(
        launches.events(0),
        vec![
            InputEvent::mouse_down(31, 6),
            InputEvent::mouse_up(31, 6),
            InputEvent::mouse_down(0, 0),
            InputEvent::mouse_up(0, 0),
        ]
    );
}

#[tokio::test]
async fn test_failed_replay_discards_instance() {
    let dir = TempDir::new().unwrap();
    let launches = Launches::default();
    let log = StepLog::from(vec![Step::click("#missing", None, Offset::ZERO)]);
    let mut session = SessionController::new(factory(&launches, false), config(&dir))
        .unwrap()
        .with_log(log);

    let err = session.start().await.unwrap_err();
    assert!(matches!(err, RecorderError::Driver(_)));
    assert_eq!(session.state(), SessionState::NoApp);
    assert!(session.app().is_none());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let launches = Launches::default();
    let config = RecorderConfig::default().with_bindings("ctrl+z", "ctrl+z");
    let result = SessionController::new(factory(&launches, false), config);
    assert!(matches!(result, Err(RecorderError::ConfigError(_))));
}
