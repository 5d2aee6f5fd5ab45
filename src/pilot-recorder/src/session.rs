//! Session controller.
//!
//! [`SessionController`] owns the single live application instance, the step
//! log (through its [`EventCapture`]) and the replay state. Genuine input
//! enters through [`SessionController::dispatch`]; undo and finalize
//! requests reported by capture are carried out there, after capture has
//! returned.
//!
//! ```text
//! NoApp ──start──▶ Starting ──▶ Replaying ──▶ Live ──dispatch──▶ Live
//!                     ▲                         │
//!                     └──────── Restarting ◀────┘ undo
//! ```

use crate::capture::{CaptureOutcome, EventCapture};
use crate::compiler::ScriptCompiler;
use crate::config::RecorderConfig;
use crate::error::{RecorderError, RecorderResult};
use crate::files::create_unique;
use crate::log::{StepLog, StepLogFile};
use crate::observer::{EventObserver, dispatch};
use crate::pilot::Pilot;
use crate::replay::{ReplayEngine, ReplayReport};
use crate::step::Step;
use pilot_core::{AppFactory, Application, InputEvent, Size};
use std::fmt;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Lifecycle of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No application instance exists.
    NoApp,
    /// An instance is being created.
    Starting,
    /// The instance accepts genuine input.
    Live,
    /// The step log is being replayed; capture is suppressed.
    Replaying,
    /// The previous instance is shutting down.
    Restarting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::NoApp => write!(f, "no application"),
            SessionState::Starting => write!(f, "starting"),
            SessionState::Live => write!(f, "live"),
            SessionState::Replaying => write!(f, "replaying"),
            SessionState::Restarting => write!(f, "restarting"),
        }
    }
}

/// Owns the live application and the recording built from it.
pub struct SessionController<F: AppFactory> {
    factory: F,
    config: RecorderConfig,
    compiler: ScriptCompiler,
    engine: ReplayEngine,
    capture: EventCapture,
    app: Option<Box<dyn Application>>,
    state: SessionState,
    session_id: Uuid,
    restarts: usize,
    saved: Vec<PathBuf>,
}

impl<F: AppFactory> fmt::Debug for SessionController<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("session_id", &self.session_id)
            .field("state", &self.state)
            .field("steps", &self.capture.log().len())
            .field("restarts", &self.restarts)
            .finish()
    }
}

impl<F: AppFactory> SessionController<F> {
    /// Creates a controller with an empty log. No instance is started yet.
    pub fn new(factory: F, config: RecorderConfig) -> RecorderResult<Self> {
        config.validate()?;
        let capture = EventCapture::new(&config.bindings)?;
        Ok(Self {
            factory,
            compiler: ScriptCompiler::new(&config.output.test_name, &config.output.app_path),
            engine: ReplayEngine::from_config(&config.replay),
            config,
            capture,
            app: None,
            state: SessionState::NoApp,
            session_id: Uuid::new_v4(),
            restarts: 0,
            saved: Vec::new(),
        })
    }

    /// Builder: steps replayed when the session starts.
    pub fn with_log(mut self, log: StepLog) -> Self {
        *self.capture.log_mut() = log;
        self
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The recorded steps.
    pub fn steps(&self) -> &[Step] {
        self.capture.log().steps()
    }

    /// The step log.
    pub fn log(&self) -> &StepLog {
        self.capture.log()
    }

    /// Identifier of this session.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Terminal size of the live instance.
    pub fn terminal_size(&self) -> Option<Size> {
        self.app.as_ref().map(|app| app.size())
    }

    /// The live instance.
    pub fn app(&self) -> Option<&dyn Application> {
        self.app.as_deref()
    }

    /// The configuration in use.
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// How many times the application has been restarted.
    pub fn restarts(&self) -> usize {
        self.restarts
    }

    /// Files written by [`Self::save`], oldest first.
    pub fn saved_files(&self) -> &[PathBuf] {
        &self.saved
    }

    fn require(&self, expected: SessionState, operation: &'static str) -> RecorderResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(RecorderError::InvalidState {
                operation,
                state: self.state.to_string(),
            })
        }
    }

    /// Launches the application and replays the current log.
    pub async fn start(&mut self) -> RecorderResult<ReplayReport> {
        self.require(SessionState::NoApp, "start")?;
        self.launch().await
    }

    /// Stops the live instance, starts a fresh one and replays the log.
    pub async fn restart(&mut self) -> RecorderResult<ReplayReport> {
        self.require(SessionState::Live, "restart")?;
        self.state = SessionState::Restarting;
        tracing::info!(session_id = %self.session_id, steps = self.capture.log().len(), "Restarting application");

        if let Err(e) = self.shutdown().await {
            self.state = SessionState::NoApp;
            return Err(e);
        }
        self.restarts += 1;
        self.launch().await
    }

    /// Requests termination of the live instance.
    pub async fn stop(&mut self) -> RecorderResult<()> {
        self.require(SessionState::Live, "stop")?;
        let result = self.shutdown().await;
        self.state = SessionState::NoApp;
        tracing::info!(session_id = %self.session_id, "Session stopped");
        result
    }

    /// Delivers a genuine user event and acts on undo and finalize.
    pub async fn dispatch(&mut self, event: &InputEvent) -> RecorderResult<CaptureOutcome> {
        self.require(SessionState::Live, "dispatch")?;
        let Some(app) = self.app.as_deref_mut() else {
            return Err(RecorderError::InvalidState {
                operation: "dispatch",
                state: self.state.to_string(),
            });
        };

        let observer: &mut dyn EventObserver = &mut self.capture;
        let outcome = dispatch(app, event, Some(observer))?;
        app.settle();

        match &outcome {
            CaptureOutcome::Undo(_) => {
                self.restart().await?;
            }
            CaptureOutcome::Finalize => {
                self.save().await?;
            }
            _ => {}
        }
        Ok(outcome)
    }

    /// Compiles the log into a test file at a fresh path and writes it.
    ///
    /// Existing files are never overwritten. With step export enabled the
    /// log is written beside the test under the same name, and a name is only
    /// used when both files are free.
    pub async fn save(&mut self) -> RecorderResult<PathBuf> {
        let size = self
            .terminal_size()
            .ok_or_else(|| RecorderError::InvalidState {
                operation: "save",
                state: self.state.to_string(),
            })?;
        let source = self.compiler.render(self.capture.log().steps(), size);

        let output = &self.config.output.path;
        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let companions: &[&str] = if self.config.output.export_steps {
            &["json"]
        } else {
            &[]
        };
        let (mut test_file, exports) = create_unique(output, companions).await?;

        test_file.file.write_all(source.as_bytes()).await?;
        test_file.file.flush().await?;
        let path = test_file.path;
        tracing::info!(
            path = %path.display(),
            steps = self.capture.log().len(),
            "Saved recorded test"
        );

        for mut export in exports {
            let content = StepLogFile::new(self.session_id, size, self.capture.log()).to_json()?;
            export.file.write_all(content.as_bytes()).await?;
            export.file.flush().await?;
            tracing::info!(path = %export.path.display(), "Exported step log");
        }

        self.saved.push(path.clone());
        Ok(path)
    }

    async fn launch(&mut self) -> RecorderResult<ReplayReport> {
        self.state = SessionState::Starting;
        let app = match self.factory.create() {
            Ok(app) => app,
            Err(e) => {
                self.state = SessionState::NoApp;
                return Err(e.into());
            }
        };
        tracing::info!(
            session_id = %self.session_id,
            size = %app.size(),
            "Application started"
        );
        self.app = Some(app);

        match self.replay_log().await {
            Ok(report) => {
                self.state = SessionState::Live;
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Replay failed, discarding instance");
                self.app = None;
                self.state = SessionState::NoApp;
                Err(e)
            }
        }
    }

    async fn replay_log(&mut self) -> RecorderResult<ReplayReport> {
        let steps = self.capture.log().steps().to_vec();
        let Some(app) = self.app.as_deref_mut() else {
            return Err(RecorderError::InvalidState {
                operation: "replay",
                state: self.state.to_string(),
            });
        };

        self.state = SessionState::Replaying;
        self.capture.set_replaying(true);

        let mut pilot = Pilot::new(app)
            .with_observer(&mut self.capture)
            .with_settle_yields(self.config.replay.settle_yields);
        let result = self.engine.replay(&steps, &mut pilot).await;
        let observed = pilot.finish();

        self.capture.set_replaying(false);
        let report = result?;
        observed?;
        Ok(report)
    }

    async fn shutdown(&mut self) -> RecorderResult<()> {
        let Some(mut app) = self.app.take() else {
            return Ok(());
        };
        app.exit();

        let timeout = self.config.replay.exit_timeout();
        let stopped = tokio::time::timeout(timeout, async {
            while app.is_running() {
                app.settle();
                tokio::task::yield_now().await;
            }
        })
        .await;

        match stopped {
            Ok(()) => {
                tracing::debug!("Application stopped");
                Ok(())
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.replay.exit_timeout_ms,
                    "Application did not stop in time"
                );
                Err(RecorderError::ExitTimeout(self.config.replay.exit_timeout_ms))
            }
        }
    }
}

impl<F: AppFactory> Drop for SessionController<F> {
    fn drop(&mut self) {
        if let Some(app) = self.app.as_mut() {
            app.exit();
        }
    }
}
