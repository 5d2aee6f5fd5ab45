//! Observer seam around an application's event handling.
//!
//! The recorder never replaces the host's event handler. Instead every event
//! goes through [`dispatch`], which runs the application's own handling first
//! and then shows the event to an optional [`EventObserver`] together with
//! the tree as it looks after handling.

use crate::capture::CaptureOutcome;
use crate::error::RecorderResult;
use pilot_core::{Application, InputEvent, WidgetTree};

/// Sees every event after the application has handled it.
pub trait EventObserver {
    /// Observes one event. Must not suspend.
    fn on_event(&mut self, tree: &dyn WidgetTree, event: &InputEvent)
    -> RecorderResult<CaptureOutcome>;
}

/// Delivers an event to the application, then to the observer.
///
/// Without an observer the outcome is [`CaptureOutcome::Ignored`].
pub fn dispatch(
    app: &mut (dyn Application + '_),
    event: &InputEvent,
    observer: Option<&mut (dyn EventObserver + '_)>,
) -> RecorderResult<CaptureOutcome> {
    app.handle_event(event);
    match observer {
        Some(observer) => observer.on_event(app.tree(), event),
        None => Ok(CaptureOutcome::Ignored),
    }
}
