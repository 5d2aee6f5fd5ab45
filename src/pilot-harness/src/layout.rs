//! Declarative layout files.
//!
//! A layout describes the initial widget tree of a headless application and
//! what happens when widgets are pressed. Layouts are read from TOML or JSON:
//!
//! ```toml
//! size = { width = 80, height = 24 }
//!
//! [[widgets]]
//! kind = "Button"
//! id = "ok"
//! region = { x = 10, y = 5, width = 8, height = 3 }
//! on_press = [{ action = "remove", selector = "#ok" }]
//! ```

use crate::dom::{Dom, WidgetSpec};
use crate::error::{HarnessError, HarnessResult};
use pilot_core::{Region, Size, WidgetHandle};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_size() -> Size {
    Size::new(80, 24)
}

/// What a widget does when it receives a mouse press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PressAction {
    /// Remove every widget matching the selector.
    Remove { selector: String },
    /// Append a widget under the first widget matching `parent`.
    Insert {
        parent: String,
        widget: Box<WidgetLayout>,
    },
}

/// A widget and its children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetLayout {
    /// Widget kind.
    pub kind: String,
    /// Optional stable identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Style classes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    /// On-screen region.
    #[serde(default)]
    pub region: Region,
    /// Press behaviour.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_press: Vec<PressAction>,
    /// Child widgets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<WidgetLayout>,
}

impl WidgetLayout {
    /// Creates a layout node for the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// Builder: sets the id.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder: adds a class.
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Builder: sets the region.
    pub fn region(mut self, x: i32, y: i32, width: u16, height: u16) -> Self {
        self.region = Region::new(x, y, width, height);
        self
    }

    /// Builder: adds a press action.
    pub fn on_press(mut self, action: PressAction) -> Self {
        self.on_press.push(action);
        self
    }

    /// Builder: appends a child.
    pub fn child(mut self, child: WidgetLayout) -> Self {
        self.children.push(child);
        self
    }

    fn spec(&self) -> WidgetSpec {
        WidgetSpec {
            kind: self.kind.clone(),
            id: self.id.clone(),
            classes: self.classes.clone(),
            region: self.region,
            on_press: self.on_press.clone(),
        }
    }

    /// Inserts this widget and its children under `parent`.
    pub fn insert_into(&self, dom: &mut Dom, parent: WidgetHandle) -> HarnessResult<WidgetHandle> {
        let widget = dom.insert(parent, self.spec())?;
        for child in &self.children {
            child.insert_into(dom, widget)?;
        }
        Ok(widget)
    }
}

/// A complete application layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Terminal size the application renders at.
    #[serde(default = "default_size")]
    pub size: Size,
    /// Top-level widgets, children of the screen.
    #[serde(default)]
    pub widgets: Vec<WidgetLayout>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            size: default_size(),
            widgets: Vec::new(),
        }
    }
}

impl Layout {
    /// Creates an empty layout of the given size.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            widgets: Vec::new(),
        }
    }

    /// Builder: add a top-level widget.
    pub fn with_widget(mut self, widget: WidgetLayout) -> Self {
        self.widgets.push(widget);
        self
    }

    /// Parses a TOML layout.
    pub fn from_toml_str(source: &str) -> HarnessResult<Self> {
        toml::from_str(source).map_err(|e| HarnessError::ParseError(e.to_string()))
    }

    /// Parses a JSON layout.
    pub fn from_json_str(source: &str) -> HarnessResult<Self> {
        serde_json::from_str(source).map_err(|e| HarnessError::ParseError(e.to_string()))
    }

    /// Loads a layout file. Files ending in `.json` are read as JSON, anything
    /// else as TOML.
    pub fn load(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let layout = if is_json {
            Self::from_json_str(&source)?
        } else {
            Self::from_toml_str(&source)?
        };
        tracing::debug!(
            path = %path.display(),
            widgets = layout.widgets.len(),
            "Loaded layout"
        );
        Ok(layout)
    }

    /// Builds a fresh widget tree from this layout.
    pub fn build(&self) -> HarnessResult<Dom> {
        let mut dom = Dom::new(self.size);
        let root = pilot_core::WidgetTree::root(&dom);
        for widget in &self.widgets {
            widget.insert_into(&mut dom, root)?;
        }
        Ok(dom)
    }
}
