//! Event capture.
//!
//! [`EventCapture`] is the [`EventObserver`] that turns observed input into
//! [`Step`]s. It also recognizes the undo and finalize bindings, reporting
//! them as a [`CaptureOutcome`] for the session controller to act on.

use crate::config::KeyBindings;
use crate::error::{RecorderError, RecorderResult};
use crate::log::StepLog;
use crate::observer::EventObserver;
use crate::resolver::resolve;
use crate::step::{Step, StepEvent};
use pilot_core::{InputEvent, KeyCode, KeyEvent, Modifiers, WidgetTree};

/// What capture did with an observed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A step was appended to the log.
    Recorded,
    /// Nothing to record: no widget under the pointer, or undo on an empty log.
    Ignored,
    /// A replay is in progress.
    Suppressed,
    /// The target could not be described; the event was dropped.
    Skipped,
    /// The undo binding removed this step; the application must restart.
    Undo(Step),
    /// The finalize binding was pressed; the log must be saved.
    Finalize,
}

/// Records observed events into a [`StepLog`].
#[derive(Debug, Clone)]
pub struct EventCapture {
    log: StepLog,
    undo: KeyEvent,
    finalize: KeyEvent,
    replaying: bool,
}

impl Default for EventCapture {
    fn default() -> Self {
        Self {
            log: StepLog::new(),
            undo: KeyEvent::new(KeyCode::Char('z'), Modifiers::CONTROL),
            finalize: KeyEvent::new(KeyCode::Char('c'), Modifiers::CONTROL),
            replaying: false,
        }
    }
}

impl EventCapture {
    /// Creates a capture with the given control keys.
    pub fn new(bindings: &KeyBindings) -> RecorderResult<Self> {
        let parse = |name: &str| {
            KeyEvent::parse(name).map_err(|e| RecorderError::ConfigError(e.to_string()))
        };
        Ok(Self {
            log: StepLog::new(),
            undo: parse(&bindings.undo)?,
            finalize: parse(&bindings.finalize)?,
            replaying: false,
        })
    }

    /// Builder: start from an existing log.
    pub fn with_log(mut self, log: StepLog) -> Self {
        self.log = log;
        self
    }

    /// The recorded steps.
    pub fn log(&self) -> &StepLog {
        &self.log
    }

    /// Mutable access to the recorded steps.
    pub fn log_mut(&mut self) -> &mut StepLog {
        &mut self.log
    }

    /// Returns true while capture is suppressed for replay.
    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    /// Suppresses or resumes capture.
    pub fn set_replaying(&mut self, replaying: bool) {
        self.replaying = replaying;
    }

    fn capture_pointer(
        &mut self,
        tree: &dyn WidgetTree,
        event: &InputEvent,
    ) -> RecorderResult<CaptureOutcome> {
        let Some(position) = event.screen_position() else {
            return Ok(CaptureOutcome::Ignored);
        };
        let Some(widget) = tree.widget_at(position) else {
            tracing::trace!(position = %position, "No widget under pointer");
            return Ok(CaptureOutcome::Ignored);
        };

        let resolved = match resolve(tree, widget) {
            Ok(resolved) => resolved,
            Err(e) if e.is_recoverable() => {
                tracing::warn!(
                    widget = %tree.describe(widget),
                    error = %e,
                    "Skipping event on widget without a usable selector"
                );
                return Ok(CaptureOutcome::Skipped);
            }
            Err(e) => return Err(e),
        };

        let origin = tree
            .region(widget)
            .map(|region| region.origin())
            .unwrap_or_default();
        let step_event = match *event {
            InputEvent::MouseDown {
                button, modifiers, ..
            } => StepEvent::PointerDown { button, modifiers },
            InputEvent::MouseMove { modifiers, .. } => StepEvent::PointerMove { modifiers },
            InputEvent::MouseUp {
                button, modifiers, ..
            } => StepEvent::PointerUp { button, modifiers },
            InputEvent::Key { .. } => return Ok(CaptureOutcome::Ignored),
        };

        self.log.push(Step::pointer(
            step_event,
            resolved.selector,
            resolved.index,
            position - origin,
        ));
        Ok(CaptureOutcome::Recorded)
    }

    fn capture_key(&mut self, key: &KeyEvent) -> CaptureOutcome {
        if *key == self.undo {
            return match self.log.pop() {
                Some(step) => {
                    tracing::info!(step = %step, remaining = self.log.len(), "Undo");
                    CaptureOutcome::Undo(step)
                }
                None => {
                    tracing::debug!("Undo on empty log");
                    CaptureOutcome::Ignored
                }
            };
        }
        if *key == self.finalize {
            tracing::info!(steps = self.log.len(), "Finalize requested");
            return CaptureOutcome::Finalize;
        }
        self.log.push(Step::key(key.name(), key.modifiers));
        CaptureOutcome::Recorded
    }
}

impl EventObserver for EventCapture {
    fn on_event(
        &mut self,
        tree: &dyn WidgetTree,
        event: &InputEvent,
    ) -> RecorderResult<CaptureOutcome> {
        if self.replaying {
            tracing::trace!(event = %event, "Capture suppressed during replay");
            return Ok(CaptureOutcome::Suppressed);
        }
        match event {
            InputEvent::Key { key } => Ok(self.capture_key(key)),
            _ => self.capture_pointer(tree, event),
        }
    }
}
