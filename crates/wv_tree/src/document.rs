use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

// -----------------------------------------------------------------------------
// NodeId

/// A handle to a node stored in a [`Document`].
///
/// Handles are plain indices, they are only meaningful for the
/// document that created them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

// -----------------------------------------------------------------------------
// Node

/// An attributed tree node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Node {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<NodeId>,
    text: Option<String>,
    parent: Option<NodeId>,
}

impl Node {
    /// Returns the node name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the attributes in insertion order.
    #[inline]
    pub fn attributes(&self) -> impl ExactSizeIterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the child handles in document order.
    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Returns the text content, if any was set.
    #[inline]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Returns the parent handle, `None` for detached nodes and the root.
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

// -----------------------------------------------------------------------------
// Document

/// An arena of [`Node`]s with an optional root.
///
/// Nodes are created detached and attached with [`append_child`](Self::append_child).
/// Nodes are never removed, so a [`NodeId`] stays valid for the document lifetime.
///
/// # Panics
///
/// Accessors taking a [`NodeId`] panic if the handle belongs to another document
/// and is out of range, the same way slice indexing does.
///
/// # Examples
///
/// ```
/// use wv_tree::Document;
///
/// let mut doc = Document::new();
/// let root = doc.create_root("List");
/// for text in ["a", "b"] {
///     let item = doc.add_child(root, "Item");
///     doc.set_text(item, text);
/// }
///
/// assert_eq!(doc.children(root).len(), 2);
/// assert_eq!(doc.element_count(), 3);
/// assert_eq!(doc.depth(), 2);
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Document {
    /// Creates an empty document.
    #[inline]
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }

    /// Returns the root node, if one was set.
    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Makes `node` the document root.
    #[inline]
    pub fn set_root(&mut self, node: NodeId) {
        self.root = Some(node);
    }

    /// Creates a node and makes it the document root.
    pub fn create_root(&mut self, name: impl Into<String>) -> NodeId {
        let node = self.create_node(name);
        self.root = Some(node);
        node
    }

    /// Creates a detached node.
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            name: name.into(),
            ..Node::default()
        });
        id
    }

    /// Appends `child` to the children of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Creates a node named `name` and appends it to `parent`.
    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let child = self.create_node(name);
        self.append_child(parent, child);
        child
    }

    /// Returns the node behind `id`.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Returns the name of `id`.
    #[inline]
    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.index()].name
    }

    /// Returns the value of the attribute `name` on `id`.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.index()]
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets an attribute, replacing the value in place if it already exists.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        let attributes = &mut self.nodes[id.index()].attributes;
        match attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => attributes.push((String::from(name), value)),
        }
    }

    /// Removes an attribute and returns its value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let attributes = &mut self.nodes[id.index()].attributes;
        let index = attributes.iter().position(|(k, _)| k == name)?;
        Some(attributes.remove(index).1)
    }

    /// Returns the attributes of `id` in insertion order.
    #[inline]
    pub fn attributes(&self, id: NodeId) -> impl ExactSizeIterator<Item = (&str, &str)> {
        self.nodes[id.index()].attributes()
    }

    /// Returns the children of `id` in document order.
    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Returns the first child of `id` named `name`.
    pub fn child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[id.index()]
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[child.index()].name == name)
    }

    /// Returns the text content of `id`.
    #[inline]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.index()].text.as_deref()
    }

    /// Sets the text content of `id`.
    #[inline]
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.nodes[id.index()].text = Some(text.into());
    }

    /// Clears the text content of `id`.
    #[inline]
    pub fn clear_text(&mut self, id: NodeId) {
        self.nodes[id.index()].text = None;
    }

    // Used by the XML reader to append text split across several events.
    pub(crate) fn push_text(&mut self, id: NodeId, text: &str) {
        let slot = &mut self.nodes[id.index()].text;
        match slot {
            Some(existing) => existing.push_str(text),
            None => *slot = Some(String::from(text)),
        }
    }

    /// Returns the number of nodes reachable from the root, the root included.
    pub fn element_count(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut count = 0;
        let mut stack = alloc::vec![root];
        while let Some(id) = stack.pop() {
            count += 1;
            stack.extend_from_slice(self.children(id));
        }
        count
    }

    /// Returns the number of levels below and including the root.
    pub fn depth(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut deepest = 0;
        let mut stack = alloc::vec![(root, 1usize)];
        while let Some((id, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(self.children(id).iter().map(|c| (*c, level + 1)));
        }
        deepest
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_xml() {
            Ok(xml) => f.write_str(&xml),
            Err(_) => f
                .debug_struct("Document")
                .field("nodes", &self.nodes.len())
                .field("root", &self.root)
                .finish(),
        }
    }
}
