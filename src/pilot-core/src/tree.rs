//! Widget tree abstraction.
//!
//! The recorder never owns widgets. It sees the host application's UI through
//! the [`WidgetTree`] trait: structure (parent / children), identity (stable
//! id, kind, classes), geometry (regions, hit-testing) and selector queries.

use crate::geometry::{Offset, Region};
use crate::selector::{Selector, SelectorResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// An opaque reference to a widget in a live tree.
///
/// Handles are only meaningful for the instance that produced them; a freshly
/// started application hands out different handles for the same logical
/// widgets. Recorded steps therefore store selectors, never handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WidgetHandle(u64);

impl WidgetHandle {
    /// Allocates a new handle, unique within the lifetime of the process.
    #[must_use]
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates a handle from a raw value.
    ///
    /// Intended for hosts that already have their own node identifiers.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WidgetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Read access to a host application's widget tree.
///
/// The root is the screen. Accessors return `None` (or an empty slice) for
/// handles that are not attached to the tree.
pub trait WidgetTree {
    /// The screen at the root of the tree.
    fn root(&self) -> WidgetHandle;

    /// Parent of a widget, `None` for the root or detached widgets.
    fn parent(&self, widget: WidgetHandle) -> Option<WidgetHandle>;

    /// Children of a widget in document order.
    fn children(&self, widget: WidgetHandle) -> &[WidgetHandle];

    /// The widget kind (its type name), e.g. `"Button"`.
    fn kind(&self, widget: WidgetHandle) -> Option<&str>;

    /// The stable identifier of a widget, if it has one.
    fn node_id(&self, widget: WidgetHandle) -> Option<&str>;

    /// Style classes attached to a widget.
    fn classes(&self, widget: WidgetHandle) -> &[String];

    /// The on-screen region of a widget.
    fn region(&self, widget: WidgetHandle) -> Option<Region>;

    /// The top-most widget under a screen coordinate.
    fn widget_at(&self, point: Offset) -> Option<WidgetHandle>;

    /// Returns true if the widget is a screen.
    fn is_screen(&self, widget: WidgetHandle) -> bool {
        widget == self.root()
    }

    /// Returns true if the widget is attached to this tree.
    fn contains(&self, widget: WidgetHandle) -> bool {
        self.kind(widget).is_some()
    }

    /// All widgets in document (pre-order) order, starting at the root.
    fn descendants(&self) -> Vec<WidgetHandle> {
        let mut order = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(widget) = stack.pop() {
            order.push(widget);
            stack.extend(self.children(widget).iter().rev().copied());
        }
        order
    }

    /// Widgets matching a selector, in document order.
    fn query(&self, selector: &str) -> SelectorResult<Vec<WidgetHandle>> {
        let selector = Selector::parse(selector)?;
        Ok(selector.query(self))
    }

    /// The first widget matching a selector, in document order.
    fn query_one(&self, selector: &str) -> SelectorResult<Option<WidgetHandle>> {
        Ok(self.query(selector)?.into_iter().next())
    }

    /// Short human-readable description, e.g. `Button#ok` or `Button(@12)`.
    fn describe(&self, widget: WidgetHandle) -> String {
        match (self.kind(widget), self.node_id(widget)) {
            (Some(kind), Some(id)) => format!("{kind}#{id}"),
            (Some(kind), None) => format!("{kind}({widget})"),
            (None, _) => format!("<detached {widget}>"),
        }
    }
}
