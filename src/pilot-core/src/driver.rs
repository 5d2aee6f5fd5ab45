//! Automation driver interface.
//!
//! A [`Driver`] acts as a simulated user against a live application. Replay
//! and generated tests are written purely in terms of this trait, so they run
//! against any host that provides one.
//!
//! Drivers are `?Send`: the application, its dispatch and the driver all run
//! on a single task, and every action suspends until the application has
//! processed it.

use crate::geometry::{Offset, Region};
use crate::input::{Modifiers, MouseButton};
use crate::selector::SelectorError;
use crate::tree::WidgetHandle;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by drivers.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The selector matched nothing.
    #[error("no widget matches selector {0:?}")]
    NoMatches(String),

    /// A disambiguation index beyond the number of matches.
    #[error("selector {selector:?} has {count} matches, index {index} is out of range")]
    IndexOutOfRange {
        selector: String,
        index: usize,
        count: usize,
    },

    /// The widget is no longer part of the tree.
    #[error("widget {0} is no longer attached")]
    WidgetGone(WidgetHandle),

    /// The key name could not be understood.
    #[error("unknown key {0:?}")]
    UnknownKey(String),

    /// The application has stopped.
    #[error("application is not running")]
    NotRunning,

    /// A drag needs at least one point.
    #[error("drag on {0:?} has no points")]
    EmptyDrag(String),

    /// The selector could not be parsed.
    #[error(transparent)]
    Selector(#[from] SelectorError),
}

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// A single pointer event sent by [`Driver::pointer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    /// Press a button.
    Down(MouseButton),
    /// Move with whatever buttons are held.
    Move,
    /// Release a button.
    Up(MouseButton),
}

/// Simulated-user capabilities required by replay and generated tests.
#[async_trait(?Send)]
pub trait Driver {
    /// Presses and releases a mouse button.
    ///
    /// With a selector, `offset` is relative to the first matching widget's
    /// origin. Without one, `offset` is a screen coordinate.
    async fn click(
        &mut self,
        selector: Option<&str>,
        offset: Offset,
        modifiers: Modifiers,
    ) -> DriverResult<()>;

    /// Simulates a key press by name, e.g. `"ctrl+z"`.
    async fn press(&mut self, key: &str) -> DriverResult<()>;

    /// Sends one pointer event at a screen position, then lets the
    /// application settle.
    async fn pointer(
        &mut self,
        action: PointerAction,
        position: Offset,
        modifiers: Modifiers,
    ) -> DriverResult<()>;

    /// Lets the application settle, optionally waiting a fixed duration.
    async fn pause(&mut self, duration: Option<Duration>) -> DriverResult<()>;

    /// Widgets matching a selector, in document order.
    fn query(&self, selector: &str) -> DriverResult<Vec<WidgetHandle>>;

    /// The current on-screen region of a widget.
    fn region(&self, widget: WidgetHandle) -> DriverResult<Region>;

    /// Clicks a widget by reference, at `offset` from its current origin.
    async fn click_widget(
        &mut self,
        widget: WidgetHandle,
        offset: Offset,
        modifiers: Modifiers,
    ) -> DriverResult<()> {
        let origin = self.region(widget)?.origin();
        self.click(None, origin + offset, modifiers).await
    }

    /// Clicks the `index`-th match of a selector.
    async fn click_by_index(
        &mut self,
        selector: &str,
        index: usize,
        offset: Offset,
        modifiers: Modifiers,
    ) -> DriverResult<()> {
        let matches = self.query(selector)?;
        let widget = *matches
            .get(index)
            .ok_or_else(|| DriverError::IndexOutOfRange {
                selector: selector.to_string(),
                index,
                count: matches.len(),
            })?;
        self.click_widget(widget, offset, modifiers).await
    }

    /// Drags across `offsets`, relative to the first match of `selector`.
    ///
    /// The left button goes down at the first offset, the pointer moves
    /// through the rest and the button is released at the last one.
    async fn drag(
        &mut self,
        selector: &str,
        offsets: &[Offset],
        modifiers: Modifiers,
    ) -> DriverResult<()> {
        let (Some(first), Some(last)) = (offsets.first(), offsets.last()) else {
            return Err(DriverError::EmptyDrag(selector.to_string()));
        };
        let widget = *self
            .query(selector)?
            .first()
            .ok_or_else(|| DriverError::NoMatches(selector.to_string()))?;

        let origin = self.region(widget)?.origin();
        self.pointer(PointerAction::Down(MouseButton::Left), origin + *first, modifiers)
            .await?;
        for offset in &offsets[1..] {
            let origin = self.region(widget)?.origin();
            self.pointer(PointerAction::Move, origin + *offset, modifiers)
                .await?;
        }
        let origin = self.region(widget)?.origin();
        self.pointer(PointerAction::Up(MouseButton::Left), origin + *last, modifiers)
            .await
    }
}
