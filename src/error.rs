/// Precondition failures reported by the layout pass.
///
/// The layered layout anchors every position to a single root node, so any
/// input that is not one connected flow rooted at exactly one node is
/// rejected instead of being laid out with undefined coordinates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("flow has no root node (every node has an incoming edge)")]
    NoRoot,
    #[error("flow has more than one root node: {}", roots.join(", "))]
    MultipleRoots { roots: Vec<String> },
    #[error("nodes not reachable from root `{root}`: {}", unreachable.join(", "))]
    Disconnected {
        root: String,
        unreachable: Vec<String>,
    },
    #[error("edge `{edge_id}` points at missing node `{node_id}`")]
    MissingEndpoint { edge_id: String, node_id: String },
    #[error("node `{node_id}` has not been measured yet")]
    Unmeasured { node_id: String },
}

pub type Result<T> = std::result::Result<T, LayoutError>;
