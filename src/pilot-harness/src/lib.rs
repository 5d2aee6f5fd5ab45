//! # Pilot Harness
//!
//! A headless host application for the pilot recorder.
//!
//! The harness builds widget trees from declarative [`Layout`] files and runs
//! them as [`HeadlessApp`] instances. It exercises the recorder end to end
//! without a terminal: sessions can be recorded from event streams, replayed
//! against fresh instances and compared through each instance's
//! [`Activation`] log.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pilot_harness::{Layout, LayoutFactory};
//!
//! let layout = Layout::load("app.toml")?;
//! let factory = LayoutFactory::new(layout);
//! let app = factory.create()?;
//! ```

pub mod app;
pub mod dom;
pub mod error;
pub mod layout;

pub use app::{Activation, AppState, HeadlessApp, LayoutFactory};
pub use dom::{Dom, SCREEN_KIND, WidgetSpec};
pub use error::{HarnessError, HarnessResult};
pub use layout::{Layout, PressAction, WidgetLayout};
