//! # Pilot Core
//!
//! The host interface shared by the pilot recorder and the applications it
//! records.
//!
//! ## Overview
//!
//! - [`geometry`]: offsets, sizes and regions in character cells
//! - [`input`]: pointer and key events, modifiers and key names
//! - [`tree`]: the [`WidgetTree`] trait and [`WidgetHandle`]s
//! - [`selector`]: the selector language used to locate widgets
//! - [`app`]: the [`Application`] and [`AppFactory`] traits
//! - [`driver`]: the [`Driver`] trait used by replay and generated tests
//!
//! ```text
//! ┌──────────────┐   handle_event   ┌──────────────────┐
//! │   Driver     │ ───────────────▶ │   Application    │
//! │ click/press  │                  │  tree() / size() │
//! └──────┬───────┘                  └────────┬─────────┘
//!        │ query(selector)                   │
//!        ▼                                   ▼
//! ┌──────────────┐   matches        ┌──────────────────┐
//! │   Selector   │ ───────────────▶ │    WidgetTree    │
//! └──────────────┘                  └──────────────────┘
//! ```

pub mod app;
pub mod driver;
pub mod geometry;
pub mod input;
pub mod selector;
pub mod tree;

#[cfg(test)]
mod fixtures;

pub use app::{AppFactory, Application, LaunchError};
pub use driver::{Driver, DriverError, DriverResult, PointerAction};
pub use geometry::{Offset, Region, Size};
pub use input::{InputEvent, KeyCode, KeyEvent, KeyParseError, Modifiers, MouseButton};
pub use selector::{Selector, SelectorError, SelectorResult, is_identifier};
pub use tree::{WidgetHandle, WidgetTree};
