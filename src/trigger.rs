use crate::elements::FlowNode;

/// Decides whether freshly measured nodes warrant a new layout pass.
///
/// Layout runs only once the renderer has reported a non-zero height for
/// every node, and only if the node count or some node's size differs from
/// the nodes the last pass was computed for. Sizes are compared by index.
pub fn should_relayout<C>(nodes: &[FlowNode<C>], previous: &[FlowNode<C>]) -> bool {
    let any_measured = nodes.iter().any(|node| node.dimensions.has_height());
    if !any_measured {
        return false;
    }
    let all_measured = nodes.iter().all(|node| node.dimensions.has_height());
    if !all_measured {
        return false;
    }
    if nodes.len() != previous.len() {
        return true;
    }
    nodes.iter().zip(previous).any(|(node, before)| {
        node.dimensions.width != before.dimensions.width
            || node.dimensions.height != before.dimensions.height
    })
}
