use crate::elements::{Dimensions, Element, FlowEdge, FlowNode, NodeWrapper, Position, edge_id};
use crate::ir::{EdgeStyle, NodeMap};

/// Flattens a node map into renderer elements.
///
/// Each node is followed by the edges leaving it, in the map's insertion
/// order. Nodes start at the origin and unmeasured. Target ids are not
/// checked here; the layout pass reports dangling edges.
pub fn elements_from_nodes<C: Clone>(
    nodes: &NodeMap<C>,
    default_edge_style: Option<&EdgeStyle>,
) -> Vec<Element<C>> {
    let edge_count: usize = nodes.values().map(|spec| spec.targets.len()).sum();
    let mut elements = Vec::with_capacity(nodes.len() + edge_count);

    for (node_id, spec) in nodes {
        elements.push(Element::Node(FlowNode {
            id: node_id.clone(),
            data: NodeWrapper::new(spec.content.clone(), spec.is_hidden),
            style: spec.style.clone(),
            position: Position::default(),
            dimensions: Dimensions::unmeasured(),
        }));

        for target in &spec.targets {
            let style = match (default_edge_style, target.edge_style.as_ref()) {
                (Some(default), Some(overrides)) => default.merged_with(overrides),
                (Some(default), None) => default.clone(),
                (None, Some(overrides)) => overrides.clone(),
                (None, None) => EdgeStyle::default(),
            };
            elements.push(Element::Edge(FlowEdge {
                id: edge_id(node_id, &target.target_id),
                source: node_id.clone(),
                target: target.target_id.clone(),
                style,
            }));
        }
    }

    elements
}
