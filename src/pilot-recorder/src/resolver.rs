//! Selector resolution.
//!
//! Turns a live widget into a declarative locator that finds the same logical
//! widget in a freshly started instance of the application, where every
//! widget handle is different.
//!
//! The locator is built bottom-up: a widget with an id is `#id`; otherwise
//! the kinds of the widget and its ancestors are joined with descendant
//! combinators, stopping below the screen or at the first ancestor with an
//! id. The candidate is then checked against the live tree, and when it
//! matches several widgets the target's position among the matches is
//! recorded as well.

use crate::error::{RecorderError, RecorderResult};
use pilot_core::{SelectorError, WidgetHandle, WidgetTree, is_identifier};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A selector plus the disambiguating index needed to re-find a widget.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedSelector {
    /// The selector text.
    pub selector: String,
    /// Position among the selector's matches, present only when the selector
    /// matches more than one widget.
    pub index: Option<usize>,
}

impl ResolvedSelector {
    /// Finds the widget this selector designates in `tree`.
    pub fn locate<T: WidgetTree + ?Sized>(&self, tree: &T) -> RecorderResult<Option<WidgetHandle>> {
        let matches = tree.query(&self.selector)?;
        Ok(matches.get(self.index.unwrap_or(0)).copied())
    }
}

impl fmt::Display for ResolvedSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{index}]", self.selector),
            None => f.write_str(&self.selector),
        }
    }
}

/// The id of a widget, if it can be written in a selector.
fn usable_id<T: WidgetTree + ?Sized>(tree: &T, widget: WidgetHandle) -> Option<&str> {
    let id = tree.node_id(widget)?;
    if is_identifier(id) {
        Some(id)
    } else {
        tracing::debug!(
            widget = %widget,
            id = %id,
            "Ignoring id that is not a valid selector identifier"
        );
        None
    }
}

fn kind_segment<T: WidgetTree + ?Sized>(
    tree: &T,
    widget: WidgetHandle,
) -> Result<String, SelectorError> {
    let kind = tree.kind(widget).unwrap_or_default();
    if is_identifier(kind) {
        return Ok(kind.to_string());
    }
    let invalid = |(i, c): &(usize, char)| {
        let allowed = c.is_ascii_alphanumeric() || *c == '_' || *c == '-';
        !allowed || (*i == 0 && c.is_ascii_digit())
    };
    match kind.char_indices().find(invalid) {
        Some((position, found)) => Err(SelectorError::UnexpectedChar {
            selector: kind.to_string(),
            position,
            found,
        }),
        None => Err(SelectorError::Empty),
    }
}

/// Builds the candidate selector for a widget without checking it.
pub fn selector_for<T: WidgetTree + ?Sized>(
    tree: &T,
    widget: WidgetHandle,
) -> Result<String, SelectorError> {
    if let Some(id) = usable_id(tree, widget) {
        return Ok(format!("#{id}"));
    }

    let mut segments = vec![kind_segment(tree, widget)?];
    let mut current = tree.parent(widget);
    while let Some(ancestor) = current {
        if tree.is_screen(ancestor) {
            break;
        }
        if let Some(id) = usable_id(tree, ancestor) {
            segments.push(format!("#{id}"));
            break;
        }
        segments.push(kind_segment(tree, ancestor)?);
        current = tree.parent(ancestor);
    }
    segments.reverse();
    Ok(segments.join(" "))
}

/// Computes the selector and optional index that re-find `widget`.
///
/// # Errors
///
/// - [`RecorderError::InvalidSelector`] when a kind cannot be written as a
///   selector.
/// - [`RecorderError::SelectorNotFound`] when the selector matches nothing.
/// - [`RecorderError::SelectorAmbiguous`] when the selector does not include
///   the target among its matches.
pub fn resolve<T: WidgetTree + ?Sized>(
    tree: &T,
    widget: WidgetHandle,
) -> RecorderResult<ResolvedSelector> {
    let selector = selector_for(tree, widget)?;
    let matches = tree.query(&selector)?;

    match matches.as_slice() {
        [] => Err(RecorderError::SelectorNotFound {
            selector,
            target: tree.describe(widget),
        }),
        [only] if *only == widget => Ok(ResolvedSelector {
            selector,
            index: None,
        }),
        [other] => Err(RecorderError::SelectorAmbiguous {
            selector,
            expected: tree.describe(widget),
            matched: tree.describe(*other),
        }),
        _ => {
            let Some(index) = matches.iter().position(|m| *m == widget) else {
                return Err(RecorderError::SelectorAmbiguous {
                    selector,
                    expected: tree.describe(widget),
                    matched: format!("{} other widgets", matches.len()),
                });
            };
            if selector.starts_with('#') {
                tracing::warn!(
                    selector = %selector,
                    index,
                    matches = matches.len(),
                    "Id-anchored selector matches several widgets, falling back to index"
                );
            }
            Ok(ResolvedSelector {
                selector,
                index: Some(index),
            })
        }
    }
}
