//! Script compiler.
//!
//! Translates a step sequence into the source of a standalone Rust
//! integration test that replays the same interaction through a
//! [`pilot_core::Driver`] and compares the final screen with a snapshot.
//!
//! Compilation is pure: the same steps, size and names always produce the
//! same bytes.

use crate::step::{ReplayAction, Step};
use pilot_core::{Modifiers, Offset, Size};
use std::fmt::Write as _;

/// Statement emitted for a test with no steps.
pub const EMPTY_BODY: &str = "let _ = pilot;";

const INDENT: &str = "    ";

/// Compiles step logs into test source files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCompiler {
    test_name: String,
    app_path: String,
}

impl Default for ScriptCompiler {
    fn default() -> Self {
        Self::new("test_paint_something", "app.toml")
    }
}

fn offset_expr(offset: Offset) -> String {
    format!("Offset::new({}, {})", offset.x, offset.y)
}

fn modifiers_expr(modifiers: Modifiers) -> String {
    let names: Vec<&str> = [
        (Modifiers::SHIFT, "Modifiers::SHIFT"),
        (Modifiers::META, "Modifiers::META"),
        (Modifiers::CONTROL, "Modifiers::CONTROL"),
    ]
    .into_iter()
    .filter(|(flag, _)| modifiers.contains(*flag))
    .map(|(_, name)| name)
    .collect();

    if names.is_empty() {
        "Modifiers::empty()".to_string()
    } else {
        names.join(" | ")
    }
}

/// Prefixes every non-empty line of `text` with `level` indents.
fn indent(text: &str, level: usize) -> String {
    let prefix = INDENT.repeat(level);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl ScriptCompiler {
    /// Creates a compiler for the given test function name and application path.
    pub fn new(test_name: impl Into<String>, app_path: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            app_path: app_path.into(),
        }
    }

    /// The generated test function name.
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// Source statements for one step. Empty for steps without an action.
    pub fn compile_step(step: &Step) -> Vec<String> {
        match step.action() {
            None => Vec::new(),
            Some(ReplayAction::ClickSelector {
                selector,
                offset,
                modifiers,
            }) => vec![format!(
                "pilot.click(Some({selector:?}), {}, {}).await?;",
                offset_expr(offset),
                modifiers_expr(modifiers)
            )],
            Some(ReplayAction::ClickNth {
                selector,
                index,
                offset,
                modifiers,
            }) => vec![
                format!("let widget = pilot.query({selector:?})?[{index}];"),
                format!(
                    "pilot.click(None, pilot.region(widget)?.origin() + {}, {}).await?;",
                    offset_expr(offset),
                    modifiers_expr(modifiers)
                ),
            ],
            Some(ReplayAction::Press { key }) => vec![format!("pilot.press({key:?}).await?;")],
        }
    }

    /// The body of the steps function, one statement per line.
    pub fn compile(&self, steps: &[Step]) -> String {
        let statements: Vec<String> = steps.iter().flat_map(Self::compile_step).collect();
        if statements.is_empty() {
            EMPTY_BODY.to_string()
        } else {
            statements.join("\n")
        }
    }

    /// The complete test file.
    pub fn render(&self, steps: &[Step], terminal_size: Size) -> String {
        let name = &self.test_name;
        let body = indent(&self.compile(steps), 2);
        // Clicks are the only statements naming `Offset` and `Modifiers`.
        let uses_pointer = steps.iter().any(|step| {
            matches!(
                step.action(),
                Some(ReplayAction::ClickSelector { .. } | ReplayAction::ClickNth { .. })
            )
        });

        let mut out = String::new();
        let _ = writeln!(out, "//! Recorded interaction test.");
        let _ = writeln!(out);
        let _ = writeln!(out, "mod common;");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "use common::{{SnapOptions, disable_cursor_blink, snap_compare}};"
        );
        if uses_pointer {
            let _ = writeln!(out, "use pilot_core::{{Driver, DriverResult, Modifiers, Offset}};");
        } else {
            let _ = writeln!(out, "use pilot_core::{{Driver, DriverResult}};");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "const APP: &str = {:?};", self.app_path);
        let _ = writeln!(out);
        let _ = writeln!(out, "#[tokio::test]");
        let _ = writeln!(out, "async fn {name}() {{");
        let _ = writeln!(out, "    // Prevent flaky tests due to timing issues.");
        let _ = writeln!(out, "    disable_cursor_blink();");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "    async fn {name}_steps(pilot: &mut dyn Driver) -> DriverResult<()> {{"
        );
        let _ = writeln!(out, "{body}");
        let _ = writeln!(out, "        Ok(())");
        let _ = writeln!(out, "    }}");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "    let options = SnapOptions::new({}, {});",
            terminal_size.width, terminal_size.height
        );
        let _ = writeln!(
            out,
            "    assert!(snap_compare(APP, options, async |pilot: &mut dyn Driver| {name}_steps(pilot).await).await);"
        );
        let _ = writeln!(out, "}}");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepEvent;
    use pilot_core::MouseButton;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_log() {
        let compiler = ScriptCompiler::default();
        assert_eq!(compiler.compile(&[]), "let _ = pilot;");
    }

    #[test]
    fn test_click_with_selector() {
        let step = Step::click("#ok-button", None, Offset::new(3, 2));
        assert_eq!(
            ScriptCompiler::compile_step(&step),
            vec![
                "pilot.click(Some(\"#ok-button\"), Offset::new(3, 2), Modifiers::empty()).await?;"
            ]
        );
    }

    #[test]
    fn test_click_with_index() {
        let step = Step::click("#tools Button", Some(1), Offset::new(0, 1));
        assert_eq!(
            ScriptCompiler::compile_step(&step),
            vec![
                "let widget = pilot.query(\"#tools Button\")?[1];",
                "pilot.click(None, pilot.region(widget)?.origin() + Offset::new(0, 1), Modifiers::empty()).await?;",
            ]
        );
    }

    #[test]
    fn test_modifiers() {
        assert_eq!(modifiers_expr(Modifiers::empty()), "Modifiers::empty()");
        assert_eq!(
            modifiers_expr(Modifiers::CONTROL | Modifiers::SHIFT),
            "Modifiers::SHIFT | Modifiers::CONTROL"
        );
    }

    #[test]
    fn test_move_and_up_emit_nothing() {
        let steps = vec![
            Step::pointer(
                StepEvent::PointerMove {
                    modifiers: Modifiers::empty(),
                },
                "Button",
                None,
                Offset::ZERO,
            ),
            Step::pointer(
                StepEvent::PointerUp {
                    button: MouseButton::Left,
                    modifiers: Modifiers::empty(),
                },
                "Button",
                None,
                Offset::ZERO,
            ),
        ];
        assert_eq!(ScriptCompiler::default().compile(&steps), EMPTY_BODY);
    }

    #[test]
    fn test_key_escaping() {
        let step = Step::key("\"", Modifiers::empty());
        assert_eq!(
            ScriptCompiler::compile_step(&step),
            vec!["pilot.press(\"\\\"\").await?;"]
        );
    }

    #[test]
    fn test_render_file() {
        let compiler = ScriptCompiler::new("test_click_ok", "paint.toml");
        let steps = vec![
            Step::click("#ok", None, Offset::new(1, 1)),
            Step::key("enter", Modifiers::empty()),
        ];
        let expected = r##"//! Recorded interaction test.

mod common;

use common::{SnapOptions, disable_cursor_blink, snap_compare};
use pilot_core::{Driver, DriverResult, Modifiers, Offset};

const APP: &str = "paint.toml";

#[tokio::test]
async fn test_click_ok() {
    // Prevent flaky tests due to timing issues.
    disable_cursor_blink();

    async fn test_click_ok_steps(pilot: &mut dyn Driver) -> DriverResult<()> {
        pilot.click(Some("#ok"), Offset::new(1, 1), Modifiers::empty()).await?;
        pilot.press("enter").await?;
        Ok(())
    }

    let options = SnapOptions::new(80, 24);
    assert!(snap_compare(APP, options, async |pilot: &mut dyn Driver| test_click_ok_steps(pilot).await).await);
}
"##;
        assert_eq!(compiler.render(&steps, Size::new(80, 24)), expected);
    }

    #[test]
    fn test_imports_follow_body() {
        let compiler = ScriptCompiler::default();
        let size = Size::new(80, 24);

        let empty = compiler.render(&[], size);
        assert!(empty.contains("use pilot_core::{Driver, DriverResult};\n"));
        assert!(!empty.contains("Modifiers"));

        let keys = compiler.render(&[Step::key("q", Modifiers::empty())], size);
        assert!(keys.contains("use pilot_core::{Driver, DriverResult};\n"));
        assert!(!keys.contains("Offset"));

        let moves_only = vec![Step::pointer(
            StepEvent::PointerMove {
                modifiers: Modifiers::empty(),
            },
            "Canvas",
            None,
            Offset::ZERO,
        )];
        assert!(!compiler.render(&moves_only, size).contains("Offset"));

        let clicks = compiler.render(&[Step::click("#ok", None, Offset::ZERO)], size);
        assert!(clicks.contains("use pilot_core::{Driver, DriverResult, Modifiers, Offset};\n"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let compiler = ScriptCompiler::default();
        let steps = vec![
            Step::click("Button", Some(2), Offset::new(4, 0)),
            Step::key("ctrl+s", Modifiers::CONTROL),
        ];
        let size = Size::new(100, 40);
        assert_eq!(compiler.render(&steps, size), compiler.render(&steps, size));
    }
}
