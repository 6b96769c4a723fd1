use serde::{Deserialize, Serialize};

use crate::ir::{EdgeStyle, NodeStyle};

/// Top-left anchored position in flow coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Size reported by the renderer after the node was mounted. Both fields stay
/// `None` until the first measurement arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: Option<f32>,
    pub height: Option<f32>,
}

impl Dimensions {
    pub const fn new(width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }

    pub const fn unmeasured() -> Self {
        Self {
            width: None,
            height: None,
        }
    }

    pub fn has_height(&self) -> bool {
        self.height.is_some_and(|height| height > 0.0)
    }

    pub fn is_measured(&self) -> bool {
        self.width.is_some() && self.has_height()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    /// Where incoming edges attach.
    Target,
    /// Where outgoing edges leave.
    Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleSide {
    Top,
    Bottom,
}

/// Display wrapper generated around every node's content.
///
/// Hidden nodes keep their box (so they are still measured and laid out) but
/// the content is not drawn and both connection handles collapse onto the top
/// edge with zero height, which lets edges pass straight through the node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeWrapper<C> {
    pub content: C,
    pub hidden: bool,
}

impl<C> NodeWrapper<C> {
    pub fn new(content: C, hidden: bool) -> Self {
        Self { content, hidden }
    }

    pub fn handle_side(&self, kind: HandleKind) -> HandleSide {
        match (kind, self.hidden) {
            (HandleKind::Target, false) => HandleSide::Top,
            (HandleKind::Target, true) => HandleSide::Bottom,
            (HandleKind::Source, false) => HandleSide::Bottom,
            (HandleKind::Source, true) => HandleSide::Top,
        }
    }

    /// Point where an edge attaches for a node placed at `position`.
    pub fn handle_point(&self, kind: HandleKind, position: Position, width: f32, height: f32) -> (f32, f32) {
        let x = position.x + width / 2.0;
        if self.hidden {
            return (x, position.y);
        }
        match self.handle_side(kind) {
            HandleSide::Top => (x, position.y),
            HandleSide::Bottom => (x, position.y + height),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowNode<C> {
    pub id: String,
    pub data: NodeWrapper<C>,
    pub style: Option<NodeStyle>,
    pub position: Position,
    pub dimensions: Dimensions,
}

impl<C> FlowNode<C> {
    pub fn is_hidden(&self) -> bool {
        self.data.hidden
    }

    pub fn width(&self) -> f32 {
        self.dimensions.width.unwrap_or(0.0)
    }

    pub fn height(&self) -> f32 {
        self.dimensions.height.unwrap_or(0.0)
    }

    pub fn with_dimensions(&self, dimensions: Dimensions) -> Self
    where
        C: Clone,
    {
        Self {
            dimensions,
            ..self.clone()
        }
    }

    pub fn with_position(&self, position: Position) -> Self
    where
        C: Clone,
    {
        Self {
            position,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub style: EdgeStyle,
}

pub fn edge_id(source: &str, target: &str) -> String {
    format!("{source}->{target}")
}

/// A renderer element: either a positioned node or a connection between two
/// nodes. A flow is always handled as one flat, ordered list of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Element<C> {
    Node(FlowNode<C>),
    Edge(FlowEdge),
}

impl<C> Element<C> {
    pub fn id(&self) -> &str {
        match self {
            Element::Node(node) => &node.id,
            Element::Edge(edge) => &edge.id,
        }
    }

    pub fn as_node(&self) -> Option<&FlowNode<C>> {
        match self {
            Element::Node(node) => Some(node),
            Element::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&FlowEdge> {
        match self {
            Element::Node(_) => None,
            Element::Edge(edge) => Some(edge),
        }
    }
}

pub fn is_node<C>(element: &Element<C>) -> bool {
    matches!(element, Element::Node(_))
}

pub fn is_edge<C>(element: &Element<C>) -> bool {
    matches!(element, Element::Edge(_))
}

pub fn nodes<C: Clone>(elements: &[Element<C>]) -> Vec<FlowNode<C>> {
    elements.iter().filter_map(Element::as_node).cloned().collect()
}

pub fn edges<C>(elements: &[Element<C>]) -> Vec<FlowEdge> {
    elements.iter().filter_map(Element::as_edge).cloned().collect()
}
