//! Headless application.
//!
//! [`HeadlessApp`] is a minimal host that renders nothing. It keeps a widget
//! tree, hit-tests pointer events, runs the press actions declared in its
//! layout and remembers everything it reacted to, so tests can compare what
//! two instances went through.
//!
//! Like a real event loop, press actions are queued by `handle_event` and
//! only change the tree on the next `settle`.

use crate::dom::Dom;
use crate::error::HarnessResult;
use crate::layout::{Layout, PressAction};
use pilot_core::{
    AppFactory, Application, InputEvent, LaunchError, MouseButton, Size, WidgetHandle, WidgetTree,
};
use std::fmt;

/// Lifecycle of a headless instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Accepting events.
    Running,
    /// Exit requested, stops on the next settle.
    Exiting,
    /// Fully stopped.
    Stopped,
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppState::Running => write!(f, "running"),
            AppState::Exiting => write!(f, "exiting"),
            AppState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Something the application reacted to.
///
/// Targets are described by kind and id rather than by handle, so the
/// activity of two instances can be compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// A button went down over a widget.
    Down { target: String, button: MouseButton },
    /// A button was released over a widget.
    Up { target: String },
    /// The pointer entered a widget.
    Hover { target: String },
    /// A key was pressed.
    Key { name: String },
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activation::Down { target, button } => write!(f, "down {target} ({button})"),
            Activation::Up { target } => write!(f, "up {target}"),
            Activation::Hover { target } => write!(f, "hover {target}"),
            Activation::Key { name } => write!(f, "key {name}"),
        }
    }
}

/// A headless application instance built from a [`Layout`].
#[derive(Debug)]
pub struct HeadlessApp {
    dom: Dom,
    size: Size,
    state: AppState,
    hovered: Option<WidgetHandle>,
    activity: Vec<Activation>,
    pending: Vec<PressAction>,
}

impl HeadlessApp {
    /// Builds a running instance from a layout.
    pub fn from_layout(layout: &Layout) -> HarnessResult<Self> {
        Ok(Self::new(layout.build()?, layout.size))
    }

    /// Wraps an already built tree.
    pub fn new(dom: Dom, size: Size) -> Self {
        Self {
            dom,
            size,
            state: AppState::Running,
            hovered: None,
            activity: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// The widget tree.
    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    /// Mutable access to the widget tree.
    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AppState {
        self.state
    }

    /// Everything the instance has reacted to so far.
    pub fn activity(&self) -> &[Activation] {
        &self.activity
    }

    /// Returns true if press actions are waiting for the next settle.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn run_pending(&mut self) {
        for action in std::mem::take(&mut self.pending) {
            if let Err(e) = self.apply(&action) {
                tracing::warn!(action = ?action, error = %e, "Press action failed");
            }
        }
    }

    fn apply(&mut self, action: &PressAction) -> HarnessResult<()> {
        match action {
            PressAction::Remove { selector } => {
                let matches = self.dom.query(selector).unwrap_or_default();
                for widget in matches {
                    // An earlier removal may already have taken this subtree.
                    if self.dom.contains(widget) {
                        self.dom.remove(widget)?;
                    }
                }
            }
            PressAction::Insert { parent, widget } => {
                match self.dom.query_one(parent).ok().flatten() {
                    Some(target) => {
                        widget.insert_into(&mut self.dom, target)?;
                    }
                    None => tracing::debug!(parent = %parent, "Insert target not found"),
                }
            }
        }
        Ok(())
    }
}

impl Application for HeadlessApp {
    fn tree(&self) -> &dyn WidgetTree {
        &self.dom
    }

    fn size(&self) -> Size {
        self.size
    }

    fn handle_event(&mut self, event: &InputEvent) {
        if self.state != AppState::Running {
            tracing::trace!(state = %self.state, "Ignoring event");
            return;
        }

        match event {
            InputEvent::MouseDown {
                position, button, ..
            } => {
                if let Some(widget) = self.dom.widget_at(*position) {
                    self.activity.push(Activation::Down {
                        target: self.dom.describe_stable(widget),
                        button: *button,
                    });
                    self.pending
                        .extend_from_slice(self.dom.press_actions(widget));
                }
            }
            InputEvent::MouseUp { position, .. } => {
                if let Some(widget) = self.dom.widget_at(*position) {
                    self.activity.push(Activation::Up {
                        target: self.dom.describe_stable(widget),
                    });
                }
            }
            InputEvent::MouseMove { position, .. } => {
                let widget = self.dom.widget_at(*position);
                if widget != self.hovered {
                    self.hovered = widget;
                    if let Some(widget) = widget {
                        self.activity.push(Activation::Hover {
                            target: self.dom.describe_stable(widget),
                        });
                    }
                }
            }
            InputEvent::Key { key } => {
                self.activity.push(Activation::Key { name: key.name() });
            }
        }
    }

    fn exit(&mut self) {
        if self.state == AppState::Running {
            tracing::debug!("Exit requested");
            self.state = AppState::Exiting;
        }
    }

    fn is_running(&self) -> bool {
        self.state != AppState::Stopped
    }

    fn settle(&mut self) {
        if self.state == AppState::Running {
            self.run_pending();
        }
        if self.state == AppState::Exiting {
            self.state = AppState::Stopped;
        }
    }
}

/// Creates [`HeadlessApp`] instances from a layout.
#[derive(Debug, Clone)]
pub struct LayoutFactory {
    layout: Layout,
}

impl LayoutFactory {
    /// Creates a factory for the given layout.
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// The layout every instance starts from.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }
}

impl AppFactory for LayoutFactory {
    fn create(&self) -> Result<Box<dyn Application>, LaunchError> {
        let app =
            HeadlessApp::from_layout(&self.layout).map_err(|e| LaunchError(e.to_string()))?;
        Ok(Box::new(app))
    }
}
