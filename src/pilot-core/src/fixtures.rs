//! Minimal in-memory tree for unit tests.

use crate::geometry::{Offset, Region};
use crate::tree::{WidgetHandle, WidgetTree};
use std::collections::HashMap;

struct FixtureNode {
    kind: String,
    id: Option<String>,
    classes: Vec<String>,
    parent: Option<WidgetHandle>,
    children: Vec<WidgetHandle>,
}

pub(crate) struct FixtureTree {
    root: WidgetHandle,
    nodes: HashMap<WidgetHandle, FixtureNode>,
}

impl FixtureTree {
    pub(crate) fn new() -> Self {
        let root = WidgetHandle::next();
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            FixtureNode {
                kind: "Screen".to_string(),
                id: None,
                classes: Vec::new(),
                parent: None,
                children: Vec::new(),
            },
        );
        Self { root, nodes }
    }

    pub(crate) fn add(
        &mut self,
        parent: WidgetHandle,
        kind: &str,
        id: Option<&str>,
        classes: &[&str],
    ) -> WidgetHandle {
        let handle = WidgetHandle::next();
        self.nodes.insert(
            handle,
            FixtureNode {
                kind: kind.to_string(),
                id: id.map(str::to_string),
                classes: classes.iter().map(|c| c.to_string()).collect(),
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(handle);
        }
        handle
    }
}

impl WidgetTree for FixtureTree {
    fn root(&self) -> WidgetHandle {
        self.root
    }

    fn parent(&self, widget: WidgetHandle) -> Option<WidgetHandle> {
        self.nodes.get(&widget).and_then(|n| n.parent)
    }

    fn children(&self, widget: WidgetHandle) -> &[WidgetHandle] {
        self.nodes
            .get(&widget)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    fn kind(&self, widget: WidgetHandle) -> Option<&str> {
        self.nodes.get(&widget).map(|n| n.kind.as_str())
    }

    fn node_id(&self, widget: WidgetHandle) -> Option<&str> {
        self.nodes.get(&widget).and_then(|n| n.id.as_deref())
    }

    fn classes(&self, widget: WidgetHandle) -> &[String] {
        self.nodes
            .get(&widget)
            .map(|n| n.classes.as_slice())
            .unwrap_or(&[])
    }

    fn region(&self, _widget: WidgetHandle) -> Option<Region> {
        None
    }

    fn widget_at(&self, _point: Offset) -> Option<WidgetHandle> {
        None
    }
}
