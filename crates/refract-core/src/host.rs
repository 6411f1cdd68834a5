use std::fmt;

use indexmap::IndexMap;

use crate::props::EventHandler;

/// Opaque handle to a node in the external display tree.
pub type HostId = usize;

/// Fault raised by a host-tree adapter. The core propagates these
/// untouched; there is no retry or recovery path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    MissingNode {
        id: HostId,
    },
    NotAnElement {
        id: HostId,
    },
    ChildIndexOutOfBounds {
        parent: HostId,
        index: usize,
        len: usize,
    },
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::MissingNode { id } => write!(f, "host node {id} missing"),
            HostError::NotAnElement { id } => write!(f, "host node {id} is not an element"),
            HostError::ChildIndexOutOfBounds { parent, index, len } => {
                write!(
                    f,
                    "child index {index} out of bounds for host node {parent} with {len} children"
                )
            }
        }
    }
}

impl std::error::Error for HostError {}

/// Mutation interface of the external display tree. Nodes are
/// addressed by opaque ids; the core only applies diffs forward and
/// never reads host state back, so no enumeration is required.
pub trait HostTree {
    /// Creates a detached element node of the given kind.
    fn create_element(&mut self, tag: &str) -> Result<HostId, HostError>;
    /// Creates a detached text node.
    fn create_text(&mut self, value: &str) -> Result<HostId, HostError>;
    /// Appends `child` at the end of `parent`'s child list.
    fn append_child(&mut self, parent: HostId, child: HostId) -> Result<(), HostError>;
    /// Detaches the child at `index` under `parent`.
    fn remove_child(&mut self, parent: HostId, index: usize) -> Result<(), HostError>;
    /// Swaps the child at `index` under `parent` for `new_child`.
    fn replace_child(
        &mut self,
        parent: HostId,
        index: usize,
        new_child: HostId,
    ) -> Result<(), HostError>;
    /// Writes a named attribute on an element node.
    fn set_attribute(&mut self, node: HostId, name: &str, value: &str) -> Result<(), HostError>;
    /// Drops a named attribute from an element node.
    fn remove_attribute(&mut self, node: HostId, name: &str) -> Result<(), HostError>;
    /// Installs `handler` as the listener for `event` on an element
    /// node.
    fn add_listener(
        &mut self,
        node: HostId,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), HostError>;
    /// Unregisters the listener for `event`; unknown names are
    /// ignored.
    fn remove_listener(&mut self, node: HostId, event: &str) -> Result<(), HostError>;
}

/// One applied host mutation, in application order. [`MemoryHost`]
/// journals these so tests can assert exactly which writes a pass
/// produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    CreateElement {
        id: HostId,
        tag: String,
    },
    CreateText {
        id: HostId,
        value: String,
    },
    AppendChild {
        parent: HostId,
        child: HostId,
    },
    RemoveChild {
        parent: HostId,
        index: usize,
    },
    ReplaceChild {
        parent: HostId,
        index: usize,
        new_child: HostId,
    },
    SetAttribute {
        id: HostId,
        name: String,
        value: String,
    },
    RemoveAttribute {
        id: HostId,
        name: String,
    },
    AddListener {
        id: HostId,
        event: String,
    },
    RemoveListener {
        id: HostId,
        event: String,
    },
}

struct ElementData {
    tag: String,
    attributes: IndexMap<String, String>,
    listeners: IndexMap<String, EventHandler>,
    children: Vec<HostId>,
}

enum MemoryNode {
    Element(ElementData),
    Text(String),
}

/// In-memory host tree for tests and headless embedding. Nodes live in
/// an arena addressed by index; removed or replaced nodes are only
/// detached and stay addressable for inspection.
#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<MemoryNode>,
    ops: Vec<HostOp>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn element(&self, id: HostId) -> Result<&ElementData, HostError> {
        match self.nodes.get(id) {
            Some(MemoryNode::Element(element)) => Ok(element),
            Some(MemoryNode::Text(_)) => Err(HostError::NotAnElement { id }),
            None => Err(HostError::MissingNode { id }),
        }
    }

    fn element_mut(&mut self, id: HostId) -> Result<&mut ElementData, HostError> {
        match self.nodes.get_mut(id) {
            Some(MemoryNode::Element(element)) => Ok(element),
            Some(MemoryNode::Text(_)) => Err(HostError::NotAnElement { id }),
            None => Err(HostError::MissingNode { id }),
        }
    }

    /// Element tag of a node, or `None` for text nodes and unknown
    /// ids.
    pub fn tag_of(&self, id: HostId) -> Option<&str> {
        match self.nodes.get(id) {
            Some(MemoryNode::Element(element)) => Some(element.tag.as_str()),
            _ => None,
        }
    }

    /// Text content of a node, or `None` for elements and unknown ids.
    pub fn text_of(&self, id: HostId) -> Option<&str> {
        match self.nodes.get(id) {
            Some(MemoryNode::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn children_of(&self, id: HostId) -> &[HostId] {
        match self.nodes.get(id) {
            Some(MemoryNode::Element(element)) => &element.children,
            _ => &[],
        }
    }

    pub fn attribute(&self, id: HostId, name: &str) -> Option<&str> {
        self.element(id)
            .ok()
            .and_then(|element| element.attributes.get(name))
            .map(String::as_str)
    }

    /// Clones the listener registered for `event`, so callers can
    /// invoke it without holding a borrow of the host.
    pub fn listener(&self, id: HostId, event: &str) -> Option<EventHandler> {
        self.element(id)
            .ok()
            .and_then(|element| element.listeners.get(event))
            .cloned()
    }

    pub fn has_listener(&self, id: HostId, event: &str) -> bool {
        self.listener(id, event).is_some()
    }

    /// Total number of nodes ever created, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    /// Drains the op journal. Tests call this to scope assertions to
    /// the mutations of a single pass.
    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    /// Renders the subtree under `id` as an indented listing.
    pub fn dump_tree(&self, id: HostId) -> String {
        let mut output = String::new();
        self.dump_node(&mut output, id, 0);
        output
    }

    fn dump_node(&self, output: &mut String, id: HostId, depth: usize) {
        let indent = "  ".repeat(depth);
        match self.nodes.get(id) {
            Some(MemoryNode::Text(value)) => {
                output.push_str(&format!("{indent}[{id}] \"{value}\"\n"));
            }
            Some(MemoryNode::Element(element)) => {
                output.push_str(&format!("{indent}[{id}] <{}", element.tag));
                for (name, value) in &element.attributes {
                    output.push_str(&format!(" {name}=\"{value}\""));
                }
                output.push_str(">\n");
                for child in &element.children {
                    self.dump_node(output, *child, depth + 1);
                }
            }
            None => {
                output.push_str(&format!("{indent}[{id}] (missing)\n"));
            }
        }
    }
}

impl HostTree for MemoryHost {
    fn create_element(&mut self, tag: &str) -> Result<HostId, HostError> {
        let id = self.nodes.len();
        self.nodes.push(MemoryNode::Element(ElementData {
            tag: tag.to_string(),
            attributes: IndexMap::new(),
            listeners: IndexMap::new(),
            children: Vec::new(),
        }));
        self.ops.push(HostOp::CreateElement {
            id,
            tag: tag.to_string(),
        });
        Ok(id)
    }

    fn create_text(&mut self, value: &str) -> Result<HostId, HostError> {
        let id = self.nodes.len();
        self.nodes.push(MemoryNode::Text(value.to_string()));
        self.ops.push(HostOp::CreateText {
            id,
            value: value.to_string(),
        });
        Ok(id)
    }

    fn append_child(&mut self, parent: HostId, child: HostId) -> Result<(), HostError> {
        if child >= self.nodes.len() {
            return Err(HostError::MissingNode { id: child });
        }
        self.element_mut(parent)?.children.push(child);
        self.ops.push(HostOp::AppendChild { parent, child });
        Ok(())
    }

    fn remove_child(&mut self, parent: HostId, index: usize) -> Result<(), HostError> {
        let element = self.element_mut(parent)?;
        let len = element.children.len();
        if index >= len {
            return Err(HostError::ChildIndexOutOfBounds { parent, index, len });
        }
        element.children.remove(index);
        self.ops.push(HostOp::RemoveChild { parent, index });
        Ok(())
    }

    fn replace_child(
        &mut self,
        parent: HostId,
        index: usize,
        new_child: HostId,
    ) -> Result<(), HostError> {
        if new_child >= self.nodes.len() {
            return Err(HostError::MissingNode { id: new_child });
        }
        let element = self.element_mut(parent)?;
        let len = element.children.len();
        if index >= len {
            return Err(HostError::ChildIndexOutOfBounds { parent, index, len });
        }
        element.children[index] = new_child;
        self.ops.push(HostOp::ReplaceChild {
            parent,
            index,
            new_child,
        });
        Ok(())
    }

    fn set_attribute(&mut self, node: HostId, name: &str, value: &str) -> Result<(), HostError> {
        self.element_mut(node)?
            .attributes
            .insert(name.to_string(), value.to_string());
        self.ops.push(HostOp::SetAttribute {
            id: node,
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn remove_attribute(&mut self, node: HostId, name: &str) -> Result<(), HostError> {
        self.element_mut(node)?.attributes.shift_remove(name);
        self.ops.push(HostOp::RemoveAttribute {
            id: node,
            name: name.to_string(),
        });
        Ok(())
    }

    fn add_listener(
        &mut self,
        node: HostId,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), HostError> {
        self.element_mut(node)?
            .listeners
            .insert(event.to_string(), handler);
        self.ops.push(HostOp::AddListener {
            id: node,
            event: event.to_string(),
        });
        Ok(())
    }

    fn remove_listener(&mut self, node: HostId, event: &str) -> Result<(), HostError> {
        self.element_mut(node)?.listeners.shift_remove(event);
        self.ops.push(HostOp::RemoveListener {
            id: node,
            event: event.to_string(),
        });
        Ok(())
    }
}
