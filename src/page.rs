//! Minimal document model scanned by the content context
//!
//! The engine navigates pages it does not own, so the model keeps exactly
//! what extraction, anchor navigation, and highlight tracking consume: tags,
//! identifiers, text, vertical offsets, and parent/child structure in
//! document order.

/// Index into the page's element arena.
pub type NodeId = usize;

/// Vertical distance between consecutively appended elements (px).
/// Stands in for flow layout; callers that need exact geometry use `append_at`.
const FLOW_STEP: f32 = 40.0;

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    id: Option<String>,
    text: String,
    offset_y: f32,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

/// A page's element tree. The root is a `body` element created up front.
#[derive(Debug, Clone)]
pub struct PageDocument {
    nodes: Vec<Element>,
    flow_cursor: f32,
}

impl Default for PageDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PageDocument {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        Self {
            nodes: vec![Element {
                tag: "body".to_string(),
                id: None,
                text: String::new(),
                offset_y: 0.0,
                children: Vec::new(),
                parent: None,
            }],
            flow_cursor: 0.0,
        }
    }

    /// Append a child element at the next flow position.
    pub fn append(&mut self, parent: NodeId, tag: &str, text: &str) -> NodeId {
        let offset = self.flow_cursor;
        self.append_at(parent, tag, text, offset)
    }

    /// Append a child element at an explicit vertical offset.
    pub fn append_at(&mut self, parent: NodeId, tag: &str, text: &str, offset_y: f32) -> NodeId {
        let node = self.nodes.len();
        self.nodes.push(Element {
            tag: tag.to_string(),
            id: None,
            text: text.to_string(),
            offset_y,
            children: Vec::new(),
            parent: Some(parent),
        });
        self.nodes[parent].children.push(node);
        self.flow_cursor = self.flow_cursor.max(offset_y) + FLOW_STEP;
        node
    }

    pub fn tag(&self, node: NodeId) -> &str {
        &self.nodes[node].tag
    }

    pub fn id(&self, node: NodeId) -> Option<&str> {
        self.nodes[node].id.as_deref()
    }

    pub fn set_id(&mut self, node: NodeId, id: &str) {
        self.nodes[node].id = Some(id.to_string());
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) {
        self.nodes[node].text = text.to_string();
    }

    pub fn offset_y(&self, node: NodeId) -> f32 {
        self.nodes[node].offset_y
    }

    /// Detach an element (and its subtree) from its parent. The arena slot
    /// survives but the subtree no longer appears in document order.
    pub fn remove(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node].parent.take() {
            self.nodes[parent].children.retain(|&child| child != node);
        }
    }

    /// Concatenated text of the element and its descendants, in document order.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        out.push_str(&self.nodes[node].text);
        for &child in &self.nodes[node].children {
            self.collect_text(child, out);
        }
    }

    /// Depth-first pre-order traversal from the root. Defines document order.
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![Self::ROOT];
        while let Some(node) = stack.pop() {
            order.push(node);
            // Reverse so the leftmost child is visited first
            for &child in self.nodes[node].children.iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    /// First element in document order carrying `id`, if any.
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.document_order()
            .into_iter()
            .find(|&node| self.nodes[node].id.as_deref() == Some(id))
    }
}
