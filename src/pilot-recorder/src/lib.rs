//! # Pilot Recorder
//!
//! Records pointer and keyboard interaction with a live terminal application
//! and compiles it into an automated test that reproduces the interaction.
//!
//! ## Overview
//!
//! - [`resolver`]: turns a widget into a selector (plus index) that finds the
//!   same logical widget in a fresh instance
//! - [`step`] and [`log`]: the recorded steps, in order
//! - [`capture`]: the [`EventObserver`] that appends steps and recognizes the
//!   undo and finalize keys
//! - [`pilot`]: an in-process [`pilot_core::Driver`] for a live instance
//! - [`replay`]: drives an instance through a step sequence
//! - [`compiler`]: emits the test source for a step sequence
//! - [`session`]: owns the live instance, restarts it on undo and saves tests
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      SessionController                         │
//! │                                                                │
//! │   genuine input ──▶ dispatch ──▶ Application::handle_event     │
//! │                          │                                     │
//! │                          ▼                                     │
//! │                    EventCapture ──resolve──▶ StepLog           │
//! │                          │                      │              │
//! │             undo ◀───────┴──────▶ finalize      │              │
//! │               │                      │          │              │
//! │               ▼                      ▼          ▼              │
//! │   restart + ReplayEngine ◀──── steps    ScriptCompiler ──▶ .rs │
//! │          (via Pilot)                                           │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use pilot_recorder::{RecorderConfig, SessionController};
//!
//! let mut session = SessionController::new(factory, RecorderConfig::default())?;
//! session.start().await?;
//! session.dispatch(&InputEvent::mouse_down(12, 6)).await?;
//! let path = session.save().await?;
//! ```

pub mod capture;
pub mod compiler;
pub mod config;
pub mod error;
pub mod files;
pub mod log;
pub mod observer;
pub mod pilot;
pub mod replay;
pub mod resolver;
pub mod session;
pub mod step;

pub use capture::{CaptureOutcome, EventCapture};
pub use compiler::{EMPTY_BODY, ScriptCompiler};
pub use config::{KeyBindings, OutputConfig, RecorderConfig, ReplayConfig};
pub use error::{RecorderError, RecorderResult};
pub use files::{NewFile, candidate, create_unique, unique_file};
pub use log::{StepLog, StepLogFile};
pub use observer::{EventObserver, dispatch};
pub use pilot::Pilot;
pub use replay::{ReplayEngine, ReplayReport};
pub use resolver::{ResolvedSelector, resolve, selector_for};
pub use session::{SessionController, SessionState};
pub use step::{ReplayAction, Step, StepEvent};
