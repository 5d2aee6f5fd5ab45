//! Selector language for locating widgets.
//!
//! Grammar:
//!
//! ```text
//! selector  := compound (combinator compound)*
//! compound  := "*" | kind? ("#" ident)? ("." ident)*
//! combinator:= whitespace          (descendant)
//!            | ">"                 (child)
//! ident     := [A-Za-z_-][A-Za-z0-9_-]*
//! ```
//!
//! Examples: `#ok-button`, `Button`, `#dialog Button`, `Toolbar > Button.primary`.
//!
//! Queries walk the tree in document order, so the position of a widget in a
//! query result is stable for a given tree shape.

use crate::tree::{WidgetHandle, WidgetTree};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing a selector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// The selector contained no compound selectors.
    #[error("empty selector")]
    Empty,

    /// A character that cannot start or continue a selector.
    #[error("unexpected character {found:?} at position {position} in selector {selector:?}")]
    UnexpectedChar {
        selector: String,
        position: usize,
        found: char,
    },

    /// `#` or `.` was not followed by an identifier.
    #[error("missing name after {prefix:?} in selector {selector:?}")]
    MissingName { selector: String, prefix: char },

    /// A `>` combinator with nothing after it.
    #[error("dangling combinator in selector {0:?}")]
    DanglingCombinator(String),
}

/// Result type for selector parsing.
pub type SelectorResult<T> = Result<T, SelectorError>;

/// Returns true if `s` can be written as a selector identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => chars.all(is_ident_char),
        _ => false,
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// How two compound selectors are related.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// The right side is any descendant of the left side.
    Descendant,
    /// The right side is a direct child of the left side.
    Child,
}

/// A single compound selector such as `Button#ok.primary`.
///
/// An empty compound (`*`) matches every widget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    /// Required widget kind.
    pub kind: Option<String>,
    /// Required stable identifier.
    pub id: Option<String>,
    /// Required classes.
    pub classes: Vec<String>,
}

impl Compound {
    /// Returns true if the widget satisfies every part of this compound.
    pub fn matches<T: WidgetTree + ?Sized>(&self, tree: &T, widget: WidgetHandle) -> bool {
        let Some(kind) = tree.kind(widget) else {
            return false;
        };
        if self.kind.as_deref().is_some_and(|k| k != kind) {
            return false;
        }
        if let Some(id) = &self.id
            && tree.node_id(widget) != Some(id.as_str())
        {
            return false;
        }
        let classes = tree.classes(widget);
        self.classes.iter().all(|c| classes.contains(c))
    }
}

/// A parsed selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    compounds: Vec<Compound>,
    /// `combinators[i]` links `compounds[i]` to `compounds[i + 1]`.
    combinators: Vec<Combinator>,
}

impl Selector {
    /// Parses a selector.
    pub fn parse(source: &str) -> SelectorResult<Self> {
        let unexpected = |position: usize, found: char| SelectorError::UnexpectedChar {
            selector: source.to_string(),
            position,
            found,
        };

        let mut compounds: Vec<Compound> = Vec::new();
        let mut combinators: Vec<Combinator> = Vec::new();
        let mut pending: Option<Combinator> = None;
        let mut current: Option<Compound> = None;

        let flush = |current: &mut Option<Compound>,
                     compounds: &mut Vec<Compound>,
                     combinators: &mut Vec<Combinator>,
                     pending: &mut Option<Combinator>| {
            if let Some(compound) = current.take() {
                if !compounds.is_empty() {
                    combinators.push(pending.take().unwrap_or(Combinator::Descendant));
                }
                compounds.push(compound);
            }
        };

        let mut chars = source.char_indices().peekable();
        while let Some((position, c)) = chars.next() {
            match c {
                c if c.is_whitespace() => {
                    flush(&mut current, &mut compounds, &mut combinators, &mut pending);
                    if !compounds.is_empty() && pending.is_none() {
                        pending = Some(Combinator::Descendant);
                    }
                }
                '>' => {
                    flush(&mut current, &mut compounds, &mut combinators, &mut pending);
                    if compounds.is_empty() || pending == Some(Combinator::Child) {
                        return Err(unexpected(position, c));
                    }
                    pending = Some(Combinator::Child);
                }
                '*' => {
                    if current.is_some() {
                        return Err(unexpected(position, c));
                    }
                    current = Some(Compound::default());
                }
                '#' | '.' => {
                    let mut name = String::new();
                    while let Some(&(_, next)) = chars.peek() {
                        if name.is_empty() && !is_ident_start(next) {
                            break;
                        }
                        if !is_ident_char(next) {
                            break;
                        }
                        name.push(next);
                        chars.next();
                    }
                    if name.is_empty() {
                        return Err(SelectorError::MissingName {
                            selector: source.to_string(),
                            prefix: c,
                        });
                    }
                    let compound = current.get_or_insert_with(Compound::default);
                    if c == '#' {
                        if compound.id.is_some() {
                            return Err(unexpected(position, c));
                        }
                        compound.id = Some(name);
                    } else {
                        compound.classes.push(name);
                    }
                }
                c if is_ident_start(c) => {
                    if current.is_some() {
                        return Err(unexpected(position, c));
                    }
                    let mut kind = String::from(c);
                    while let Some(&(_, next)) = chars.peek() {
                        if !is_ident_char(next) {
                            break;
                        }
                        kind.push(next);
                        chars.next();
                    }
                    current = Some(Compound {
                        kind: Some(kind),
                        ..Compound::default()
                    });
                }
                _ => return Err(unexpected(position, c)),
            }
        }
        flush(&mut current, &mut compounds, &mut combinators, &mut pending);

        if compounds.is_empty() {
            return Err(SelectorError::Empty);
        }
        if pending == Some(Combinator::Child) {
            return Err(SelectorError::DanglingCombinator(source.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            compounds,
            combinators,
        })
    }

    /// The selector text as given.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The compound selectors, left to right.
    pub fn compounds(&self) -> &[Compound] {
        &self.compounds
    }

    /// Returns true if the widget matches the whole selector.
    pub fn matches<T: WidgetTree + ?Sized>(&self, tree: &T, widget: WidgetHandle) -> bool {
        self.matches_from(tree, widget, self.compounds.len() - 1)
    }

    fn matches_from<T: WidgetTree + ?Sized>(
        &self,
        tree: &T,
        widget: WidgetHandle,
        index: usize,
    ) -> bool {
        if !self.compounds[index].matches(tree, widget) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => tree
                .parent(widget)
                .is_some_and(|parent| self.matches_from(tree, parent, index - 1)),
            Combinator::Descendant => {
                let mut ancestor = tree.parent(widget);
                while let Some(current) = ancestor {
                    if self.matches_from(tree, current, index - 1) {
                        return true;
                    }
                    ancestor = tree.parent(current);
                }
                false
            }
        }
    }

    /// All matching widgets in document order.
    pub fn query<T: WidgetTree + ?Sized>(&self, tree: &T) -> Vec<WidgetHandle> {
        tree.descendants()
            .into_iter()
            .filter(|widget| self.matches(tree, *widget))
            .collect()
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
