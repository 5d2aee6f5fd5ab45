//! Host application interface.
//!
//! An [`Application`] is a running instance of the program being recorded. The
//! recorder only needs its widget tree, its terminal size, its own event
//! handler and a way to shut it down. New instances come from an
//! [`AppFactory`], because every restart needs a fresh instance.

use crate::geometry::Size;
use crate::input::InputEvent;
use crate::tree::WidgetTree;
use thiserror::Error;

/// Error raised when an application instance cannot be created.
#[derive(Debug, Error)]
#[error("failed to launch application: {0}")]
pub struct LaunchError(pub String);

/// A live application instance.
pub trait Application {
    /// The current widget tree.
    fn tree(&self) -> &dyn WidgetTree;

    /// The terminal size the application is rendering at.
    fn size(&self) -> Size;

    /// The application's own event handling.
    fn handle_event(&mut self, event: &InputEvent);

    /// Requests termination. Completion is reported by [`Self::is_running`].
    fn exit(&mut self);

    /// Returns false once the instance has fully stopped.
    fn is_running(&self) -> bool;

    /// Processes pending layout and deferred work.
    fn settle(&mut self) {}
}

/// Creates fresh application instances.
pub trait AppFactory {
    /// Builds a new, not yet interacted-with instance.
    fn create(&self) -> Result<Box<dyn Application>, LaunchError>;
}

impl<F> AppFactory for F
where
    F: Fn() -> Result<Box<dyn Application>, LaunchError>,
{
    fn create(&self) -> Result<Box<dyn Application>, LaunchError> {
        self()
    }
}
