//! Recorded steps.
//!
//! A [`Step`] is the durable form of one observed input event. It never holds
//! widget handles, only the selector (and index) that re-find the target in a
//! fresh instance and the pointer offset relative to that target.

use pilot_core::{Modifiers, MouseButton, Offset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of input a step records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepEvent {
    /// A mouse button went down.
    PointerDown {
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// The pointer moved.
    PointerMove {
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// A mouse button was released.
    PointerUp {
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// A key was pressed, identified by its normalized name.
    KeyPress {
        key: String,
        #[serde(default)]
        modifiers: Modifiers,
    },
}

impl StepEvent {
    /// Modifiers held when the event was captured.
    pub fn modifiers(&self) -> Modifiers {
        match self {
            StepEvent::PointerDown { modifiers, .. }
            | StepEvent::PointerMove { modifiers }
            | StepEvent::PointerUp { modifiers, .. }
            | StepEvent::KeyPress { modifiers, .. } => *modifiers,
        }
    }

    /// Returns true for pointer events.
    pub fn is_pointer(&self) -> bool {
        !matches!(self, StepEvent::KeyPress { .. })
    }
}

impl fmt::Display for StepEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepEvent::PointerDown { button, .. } => write!(f, "pointer down ({button})"),
            StepEvent::PointerMove { .. } => write!(f, "pointer move"),
            StepEvent::PointerUp { button, .. } => write!(f, "pointer up ({button})"),
            StepEvent::KeyPress { key, .. } => write!(f, "key {key}"),
        }
    }
}

/// One recorded input event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// What happened.
    pub event: StepEvent,
    /// Pointer position relative to the target's origin. `None` for keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Offset>,
    /// Selector of the target widget. Empty for keys.
    #[serde(default)]
    pub selector: String,
    /// Which match of `selector` was the target, when it matches several.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl Step {
    /// Creates a pointer step.
    pub fn pointer(
        event: StepEvent,
        selector: impl Into<String>,
        index: Option<usize>,
        offset: Offset,
    ) -> Self {
        Self {
            event,
            offset: Some(offset),
            selector: selector.into(),
            index,
        }
    }

    /// Creates a key step.
    pub fn key(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            event: StepEvent::KeyPress {
                key: key.into(),
                modifiers,
            },
            offset: None,
            selector: String::new(),
            index: None,
        }
    }

    /// Creates a left-button press on a widget.
    pub fn click(selector: impl Into<String>, index: Option<usize>, offset: Offset) -> Self {
        Self::pointer(
            StepEvent::PointerDown {
                button: MouseButton::Left,
                modifiers: Modifiers::empty(),
            },
            selector,
            index,
            offset,
        )
    }

    /// Lowers the step to what replay and generated tests actually perform.
    ///
    /// Pointer moves and releases have no replay action.
    pub fn action(&self) -> Option<ReplayAction> {
        match &self.event {
            StepEvent::PointerDown { modifiers, .. } => {
                let offset = self.offset.unwrap_or_default();
                Some(match self.index {
                    None => ReplayAction::ClickSelector {
                        selector: self.selector.clone(),
                        offset,
                        modifiers: *modifiers,
                    },
                    Some(index) => ReplayAction::ClickNth {
                        selector: self.selector.clone(),
                        index,
                        offset,
                        modifiers: *modifiers,
                    },
                })
            }
            StepEvent::PointerMove { .. } | StepEvent::PointerUp { .. } => None,
            StepEvent::KeyPress { key, .. } => Some(ReplayAction::Press { key: key.clone() }),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.event)?;
        if !self.selector.is_empty() {
            write!(f, " on {}", self.selector)?;
            if let Some(index) = self.index {
                write!(f, "[{index}]")?;
            }
        }
        if let Some(offset) = self.offset {
            write!(f, " at {offset}")?;
        }
        Ok(())
    }
}

/// A driver-level action derived from a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayAction {
    /// Click the first match of a selector.
    ClickSelector {
        selector: String,
        offset: Offset,
        modifiers: Modifiers,
    },
    /// Click the `index`-th match of a selector.
    ClickNth {
        selector: String,
        index: usize,
        offset: Offset,
        modifiers: Modifiers,
    },
    /// Press a key by name.
    Press { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_click_lowers_to_selector_click() {
        let step = Step::click("#ok-button", None, Offset::new(3, 2));
        assert_eq!(
            step.action(),
            Some(ReplayAction::ClickSelector {
                selector: "#ok-button".to_string(),
                offset: Offset::new(3, 2),
                modifiers: Modifiers::empty(),
            })
        );
    }

    #[test]
    fn test_indexed_click_lowers_to_nth() {
        let step = Step::click("Button", Some(1), Offset::new(0, 0));
        assert!(matches!(
            step.action(),
            Some(ReplayAction::ClickNth { index: 1, .. })
        ));
    }

    #[test]
    fn test_move_and_up_have_no_action() {
        let moved = Step::pointer(
            StepEvent::PointerMove {
                modifiers: Modifiers::empty(),
            },
            "Button",
            None,
            Offset::ZERO,
        );
        let up = Step::pointer(
            StepEvent::PointerUp {
                button: MouseButton::Left,
                modifiers: Modifiers::SHIFT,
            },
            "Button",
            None,
            Offset::ZERO,
        );
        assert_eq!(moved.action(), None);
        assert_eq!(up.action(), None);
        assert!(up.event.modifiers().shift());
    }

    #[test]
    fn test_key_step() {
        let step = Step::key("ctrl+s", Modifiers::CONTROL);
        assert_eq!(step.selector, "");
        assert_eq!(step.offset, None);
        assert_eq!(
            step.action(),
            Some(ReplayAction::Press {
                key: "ctrl+s".to_string()
            })
        );
        assert_eq!(step.to_string(), "key ctrl+s");
    }

    #[test]
    fn test_json_shape() {
        let step = Step::click("Button", Some(1), Offset::new(3, 2));
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["event"]["type"], "pointer_down");
        assert_eq!(json["event"]["button"], "left");
        assert_eq!(json["offset"], serde_json::json!({"x": 3, "y": 2}));
        assert_eq!(json["selector"], "Button");
        assert_eq!(json["index"], 1);
        assert_eq!(serde_json::from_value::<Step>(json).unwrap(), step);

        let key: Step =
            serde_json::from_str(r#"{"event":{"type":"key_press","key":"a"}}"#).unwrap();
        assert_eq!(key, Step::key("a", Modifiers::empty()));
    }

    #[test]
    fn test_display() {
        let step = Step::click("Button", Some(1), Offset::new(3, 2));
        assert_eq!(step.to_string(), "pointer down (left) on Button[1] at (3, 2)");
    }
}
