//! Arena-backed widget tree.
//!
//! `Dom` stores widgets in a slotmap and addresses them through
//! [`WidgetHandle`]s allocated from a process-wide counter, so two instances
//! built from the same layout never share handles.

use crate::error::{HarnessError, HarnessResult};
use crate::layout::PressAction;
use pilot_core::{Offset, Region, Size, WidgetHandle, WidgetTree};
use slotmap::{DefaultKey, SlotMap};
use std::collections::HashMap;

/// A key identifying a node in the arena.
pub type DomKey = DefaultKey;

/// Kind name of the root widget.
pub const SCREEN_KIND: &str = "Screen";

/// Description of a widget to insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetSpec {
    /// Widget kind, e.g. `"Button"`.
    pub kind: String,
    /// Optional stable identifier.
    pub id: Option<String>,
    /// Style classes.
    pub classes: Vec<String>,
    /// On-screen region.
    pub region: Region,
    /// Actions performed when the widget is pressed.
    pub on_press: Vec<PressAction>,
}

impl WidgetSpec {
    /// Creates a spec for the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// Builder: set the id.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder: add a class.
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Builder: set the region.
    pub fn region(mut self, x: i32, y: i32, width: u16, height: u16) -> Self {
        self.region = Region::new(x, y, width, height);
        self
    }

    /// Builder: add a press action.
    pub fn on_press(mut self, action: PressAction) -> Self {
        self.on_press.push(action);
        self
    }
}

#[derive(Debug, Clone)]
struct Node {
    handle: WidgetHandle,
    kind: String,
    id: Option<String>,
    classes: Vec<String>,
    region: Region,
    on_press: Vec<PressAction>,
    parent: Option<WidgetHandle>,
    children: Vec<WidgetHandle>,
}

/// An in-memory widget tree rooted at a screen.
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: SlotMap<DomKey, Node>,
    keys: HashMap<WidgetHandle, DomKey>,
    root: WidgetHandle,
}

impl Dom {
    /// Creates a tree containing only a screen covering `size`.
    pub fn new(size: Size) -> Self {
        let root = WidgetHandle::next();
        let mut nodes = SlotMap::new();
        let key = nodes.insert(Node {
            handle: root,
            kind: SCREEN_KIND.to_string(),
            id: None,
            classes: Vec::new(),
            region: Region::from_size(size),
            on_press: Vec::new(),
            parent: None,
            children: Vec::new(),
        });
        let mut keys = HashMap::new();
        keys.insert(root, key);
        Self { nodes, keys, root }
    }

    /// Returns the number of widgets, including the screen.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree only contains the screen.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn node(&self, widget: WidgetHandle) -> Option<&Node> {
        self.keys.get(&widget).and_then(|key| self.nodes.get(*key))
    }

    fn node_mut(&mut self, widget: WidgetHandle) -> Option<&mut Node> {
        let key = *self.keys.get(&widget)?;
        self.nodes.get_mut(key)
    }

    /// Appends a widget as the last child of `parent`.
    pub fn insert(&mut self, parent: WidgetHandle, spec: WidgetSpec) -> HarnessResult<WidgetHandle> {
        if spec.kind.is_empty() {
            return Err(HarnessError::EmptyKind);
        }
        if !self.keys.contains_key(&parent) {
            return Err(HarnessError::WidgetNotFound(parent));
        }
        if let Some(id) = &spec.id
            && self.find_by_id(id).is_some()
        {
            return Err(HarnessError::DuplicateId(id.clone()));
        }

        let handle = WidgetHandle::next();
        let key = self.nodes.insert(Node {
            handle,
            kind: spec.kind,
            id: spec.id,
            classes: spec.classes,
            region: spec.region,
            on_press: spec.on_press,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.keys.insert(handle, key);
        if let Some(parent) = self.node_mut(parent) {
            parent.children.push(handle);
        }
        Ok(handle)
    }

    /// Removes a widget and its whole subtree. Returns the number of widgets removed.
    pub fn remove(&mut self, widget: WidgetHandle) -> HarnessResult<usize> {
        if widget == self.root {
            return Err(HarnessError::RemoveScreen);
        }
        let parent = self
            .node(widget)
            .ok_or(HarnessError::WidgetNotFound(widget))?
            .parent;
        if let Some(parent) = parent.and_then(|p| self.node_mut(p)) {
            parent.children.retain(|child| *child != widget);
        }

        let mut removed = 0;
        let mut stack = vec![widget];
        while let Some(current) = stack.pop() {
            if let Some(key) = self.keys.remove(&current)
                && let Some(node) = self.nodes.remove(key)
            {
                stack.extend(node.children);
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Moves or resizes a widget.
    pub fn set_region(&mut self, widget: WidgetHandle, region: Region) -> HarnessResult<()> {
        let node = self
            .node_mut(widget)
            .ok_or(HarnessError::WidgetNotFound(widget))?;
        node.region = region;
        Ok(())
    }

    /// Resizes the screen.
    pub fn resize(&mut self, size: Size) {
        let root = self.root;
        if let Some(node) = self.node_mut(root) {
            node.region = Region::from_size(size);
        }
    }

    /// Finds the widget with the given id.
    pub fn find_by_id(&self, id: &str) -> Option<WidgetHandle> {
        self.nodes
            .values()
            .find(|node| node.id.as_deref() == Some(id))
            .map(|node| node.handle)
    }

    /// Actions to perform when the widget is pressed.
    pub fn press_actions(&self, widget: WidgetHandle) -> &[PressAction] {
        self.node(widget)
            .map(|node| node.on_press.as_slice())
            .unwrap_or(&[])
    }

    /// Describes a widget independently of its handle.
    ///
    /// Widgets with an id are `Kind#id`; others are the path of kinds from
    /// the screen with sibling positions, e.g. `Screen/Panel[0]/Button[1]`.
    pub fn describe_stable(&self, widget: WidgetHandle) -> String {
        let Some(node) = self.node(widget) else {
            return format!("<detached {widget}>");
        };
        if let Some(id) = &node.id {
            return format!("{}#{id}", node.kind);
        }
        match node.parent {
            Some(parent) => {
                let position = self
                    .children(parent)
                    .iter()
                    .position(|child| *child == widget)
                    .unwrap_or(0);
                format!("{}/{}[{position}]", self.describe_stable(parent), node.kind)
            }
            None => node.kind.clone(),
        }
    }

    fn hit(&self, widget: WidgetHandle, point: Offset) -> Option<WidgetHandle> {
        let node = self.node(widget)?;
        if !node.region.contains(point) {
            return None;
        }
        // Later siblings paint over earlier ones.
        node.children
            .iter()
            .rev()
            .find_map(|child| self.hit(*child, point))
            .or(Some(widget))
    }
}

impl WidgetTree for Dom {
    fn root(&self) -> WidgetHandle {
        self.root
    }

    fn parent(&self, widget: WidgetHandle) -> Option<WidgetHandle> {
        self.node(widget).and_then(|node| node.parent)
    }

    fn children(&self, widget: WidgetHandle) -> &[WidgetHandle] {
        self.node(widget)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    fn kind(&self, widget: WidgetHandle) -> Option<&str> {
        self.node(widget).map(|node| node.kind.as_str())
    }

    fn node_id(&self, widget: WidgetHandle) -> Option<&str> {
        self.node(widget).and_then(|node| node.id.as_deref())
    }

    fn classes(&self, widget: WidgetHandle) -> &[String] {
        self.node(widget)
            .map(|node| node.classes.as_slice())
            .unwrap_or(&[])
    }

    fn region(&self, widget: WidgetHandle) -> Option<Region> {
        self.node(widget).map(|node| node.region)
    }

    fn widget_at(&self, point: Offset) -> Option<WidgetHandle> {
        self.hit(self.root, point)
    }
}
