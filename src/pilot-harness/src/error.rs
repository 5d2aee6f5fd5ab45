//! Error types for the headless harness.

use pilot_core::WidgetHandle;
use thiserror::Error;

/// Errors raised while building or mutating a headless widget tree.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The widget is not part of the tree
    #[error("Widget not found: {0}")]
    WidgetNotFound(WidgetHandle),

    /// Two widgets share the same id
    #[error("Duplicate widget id: {0:?}")]
    DuplicateId(String),

    /// A widget was declared without a kind
    #[error("Widget kind must not be empty")]
    EmptyKind,

    /// The screen root cannot be removed
    #[error("The screen cannot be removed")]
    RemoveScreen,

    /// IO error while reading a layout
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Layout file could not be parsed
    #[error("Failed to parse layout: {0}")]
    ParseError(String),
}

/// Result type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;
