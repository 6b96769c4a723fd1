use crate::config::LayoutConfig;
use crate::elements::{Element, FlowEdge, FlowNode, Position};
use crate::error::{LayoutError, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, trace};

mod ranking;

use ranking::{compute_ranks, order_rank_nodes};

const ORDER_PASSES: usize = 4;
const PLACEMENT_PASSES: usize = 2;

/// Runs a top-to-bottom layered layout over fully measured elements and
/// returns a new element list with every node repositioned.
///
/// Positions are top-left anchored and relative to the root node, which ends
/// at `(0, 0)`; descendants get positive `y`. Edges are copied unchanged.
///
/// Every domain edge enters the layered graph reversed so nodes without
/// outgoing edges (the flow's end) settle on rank 0, the rank furthest from
/// the root. Ranks are read back mirrored, putting the root in the top band.
pub fn layout_elements<C: Clone>(
    elements: &[Element<C>],
    config: &LayoutConfig,
) -> Result<Vec<Element<C>>> {
    let nodes: Vec<&FlowNode<C>> = elements.iter().filter_map(Element::as_node).collect();
    let edges: Vec<&FlowEdge> = elements.iter().filter_map(Element::as_edge).collect();
    if nodes.is_empty() {
        return Ok(elements.to_vec());
    }

    validate_measured(&nodes)?;
    validate_endpoints(&nodes, &edges)?;
    let root = find_root(&nodes, &edges)?;
    validate_connected(root, &nodes, &edges)?;

    let graph = build_layout_graph(root, &nodes, &edges, config);
    let centers = place_nodes(&graph, config);
    let anchor = |node: &FlowNode<C>| -> (f32, f32) {
        let (cx, cy) = graph
            .index
            .get(node.id.as_str())
            .map(|&idx| centers[idx])
            .unwrap_or_default();
        (cx - node.width() / 2.0, cy - node.height() / 2.0)
    };
    let root_anchor = anchor(root);

    let laid_out: Vec<Element<C>> = elements
        .iter()
        .map(|element| {
            let Element::Node(node) = element else {
                return element.clone();
            };
            let (x, y) = anchor(node);
            let position = Position::new(x - root_anchor.0, y - root_anchor.1);
            trace!(node = %node.id, x = position.x, y = position.y, "placed node");
            Element::Node(node.with_position(position))
        })
        .collect();

    debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        layout_edges = graph.edges.len(),
        root = %root.id,
        "layout finished"
    );
    Ok(laid_out)
}

/// The unique node no edge points at.
pub fn root_node<C>(elements: &[Element<C>]) -> Result<&FlowNode<C>> {
    let nodes: Vec<&FlowNode<C>> = elements.iter().filter_map(Element::as_node).collect();
    let edges: Vec<&FlowEdge> = elements.iter().filter_map(Element::as_edge).collect();
    find_root(&nodes, &edges)
}

fn find_root<'a, C>(nodes: &[&'a FlowNode<C>], edges: &[&FlowEdge]) -> Result<&'a FlowNode<C>> {
    let targeted: HashSet<&str> = edges.iter().map(|edge| edge.target.as_str()).collect();
    let roots: Vec<&'a FlowNode<C>> = nodes
        .iter()
        .copied()
        .filter(|node| !targeted.contains(node.id.as_str()))
        .collect();
    match roots.as_slice() {
        [] => Err(LayoutError::NoRoot),
        [root] => Ok(*root),
        _ => Err(LayoutError::MultipleRoots {
            roots: roots.iter().map(|node| node.id.clone()).collect(),
        }),
    }
}

fn validate_measured<C>(nodes: &[&FlowNode<C>]) -> Result<()> {
    match nodes.iter().find(|node| !node.dimensions.is_measured()) {
        Some(node) => Err(LayoutError::Unmeasured {
            node_id: node.id.clone(),
        }),
        None => Ok(()),
    }
}

fn validate_endpoints<C>(nodes: &[&FlowNode<C>], edges: &[&FlowEdge]) -> Result<()> {
    let known: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
    for edge in edges {
        for endpoint in [&edge.source, &edge.target] {
            if !known.contains(endpoint.as_str()) {
                return Err(LayoutError::MissingEndpoint {
                    edge_id: edge.id.clone(),
                    node_id: endpoint.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_connected<C>(root: &FlowNode<C>, nodes: &[&FlowNode<C>], edges: &[&FlowEdge]) -> Result<()> {
    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        outgoing
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    seen.insert(root.id.as_str());
    queue.push_back(root.id.as_str());
    while let Some(current) = queue.pop_front() {
        for &next in outgoing.get(current).into_iter().flatten() {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }

    let unreachable: Vec<String> = nodes
        .iter()
        .filter(|node| !seen.contains(node.id.as_str()))
        .map(|node| node.id.clone())
        .collect();
    if unreachable.is_empty() {
        Ok(())
    } else {
        Err(LayoutError::Disconnected {
            root: root.id.clone(),
            unreachable,
        })
    }
}

/// Per-run layered graph: node sizes by index and reversed edges.
struct LayoutGraph<'a> {
    index: HashMap<&'a str, usize>,
    sizes: Vec<(f32, f32)>,
    edges: Vec<(usize, usize)>,
}

fn build_layout_graph<'a, C>(
    root: &FlowNode<C>,
    nodes: &[&'a FlowNode<C>],
    edges: &[&FlowEdge],
    config: &LayoutConfig,
) -> LayoutGraph<'a> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();
    let sizes = nodes
        .iter()
        .map(|node| (node.width().max(config.min_node_width), node.height()))
        .collect();

    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    let mut forward: Vec<(usize, usize)> = Vec::with_capacity(edges.len());
    for edge in edges {
        let (Some(&source), Some(&target)) = (
            index.get(edge.source.as_str()),
            index.get(edge.target.as_str()),
        ) else {
            continue;
        };
        if source != target && seen.insert((source, target)) {
            forward.push((source, target));
        }
    }

    let back = match index.get(root.id.as_str()) {
        Some(&root_idx) => back_edges(root_idx, nodes.len(), &forward),
        None => HashSet::new(),
    };
    let layout_edges: Vec<(usize, usize)> = forward
        .into_iter()
        .filter(|edge| !back.contains(edge))
        .map(|(source, target)| (target, source))
        .collect();
    if !back.is_empty() {
        debug!(dropped = back.len(), "ignoring cycle-closing edges for ranking");
    }

    LayoutGraph {
        index,
        sizes,
        edges: layout_edges,
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    New,
    OnStack,
    Done,
}

/// Edges that close a cycle when the flow is walked depth first from `root`.
fn back_edges(root: usize, node_count: usize, edges: &[(usize, usize)]) -> HashSet<(usize, usize)> {
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for &(source, target) in edges {
        outgoing[source].push(target);
    }

    let mut state = vec![Visit::New; node_count];
    let mut back = HashSet::new();
    let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
    state[root] = Visit::OnStack;
    while let Some((node, cursor)) = stack.last_mut() {
        let node = *node;
        let Some(&child) = outgoing[node].get(*cursor) else {
            state[node] = Visit::Done;
            stack.pop();
            continue;
        };
        *cursor += 1;
        match state[child] {
            Visit::New => {
                state[child] = Visit::OnStack;
                stack.push((child, 0));
            }
            Visit::OnStack => {
                back.insert((node, child));
            }
            Visit::Done => {}
        }
    }
    back
}

/// Center of every node, indexed like `graph.sizes`, with the root's band
/// on top.
fn place_nodes(graph: &LayoutGraph<'_>, config: &LayoutConfig) -> Vec<(f32, f32)> {
    let node_count = graph.sizes.len();
    let ranks = compute_ranks(node_count, &graph.edges);
    let max_rank = ranks.iter().copied().max().unwrap_or(0);

    let mut rank_nodes: Vec<Vec<usize>> = vec![Vec::new(); max_rank + 1];
    for (idx, &rank) in ranks.iter().enumerate() {
        rank_nodes[rank].push(idx);
    }

    // Long edges get a virtual node on every rank they cross so the ordering
    // sweeps see them.
    let mut expanded: Vec<(usize, usize)> = Vec::with_capacity(graph.edges.len());
    let mut next_virtual = node_count;
    for &(from, to) in &graph.edges {
        let (from_rank, to_rank) = (ranks[from], ranks[to]);
        if to_rank <= from_rank {
            continue;
        }
        let mut prev = from;
        for bucket in &mut rank_nodes[from_rank + 1..to_rank] {
            bucket.push(next_virtual);
            expanded.push((prev, next_virtual));
            prev = next_virtual;
            next_virtual += 1;
        }
        expanded.push((prev, to));
    }
    order_rank_nodes(&mut rank_nodes, &expanded, ORDER_PASSES);

    let mut band_center = vec![0.0f32; max_rank + 1];
    let mut cursor = 0.0f32;
    for rank in (0..=max_rank).rev() {
        let band_height = rank_nodes[rank]
            .iter()
            .filter(|&&idx| idx < node_count)
            .map(|&idx| graph.sizes[idx].1)
            .fold(0.0f32, f32::max);
        band_center[rank] = cursor + band_height / 2.0;
        cursor += band_height + config.rank_spacing;
    }

    // `above` holds each node's parents in the drawn flow, `below` its children.
    let mut above: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut below: HashMap<usize, Vec<usize>> = HashMap::new();
    for &(from, to) in &graph.edges {
        above.entry(from).or_default().push(to);
        below.entry(to).or_default().push(from);
    }

    let mut cross: HashMap<usize, f32> = HashMap::new();
    for _ in 0..PLACEMENT_PASSES {
        for bucket in rank_nodes.iter().rev() {
            place_rank(bucket, &above, &graph.sizes, config.node_spacing, &mut cross);
        }
        for bucket in &rank_nodes {
            place_rank(bucket, &below, &graph.sizes, config.node_spacing, &mut cross);
        }
    }

    (0..node_count)
        .map(|idx| {
            let x = cross.get(&idx).copied().unwrap_or(0.0);
            (x, band_center[ranks[idx]])
        })
        .collect()
}

/// Pulls every real node of one rank toward the mean of its placed
/// neighbours, then pushes overlapping nodes apart keeping the rank's mean.
fn place_rank(
    bucket: &[usize],
    neighbors: &HashMap<usize, Vec<usize>>,
    sizes: &[(f32, f32)],
    node_spacing: f32,
    cross: &mut HashMap<usize, f32>,
) {
    let mut entries: Vec<(usize, f32, f32)> = bucket
        .iter()
        .filter(|&&idx| idx < sizes.len())
        .map(|&idx| {
            let placed: Vec<f32> = neighbors
                .get(&idx)
                .into_iter()
                .flatten()
                .filter_map(|neighbor| cross.get(neighbor).copied())
                .collect();
            let desired = if placed.is_empty() {
                cross.get(&idx).copied().unwrap_or(0.0)
            } else {
                placed.iter().sum::<f32>() / placed.len() as f32
            };
            (idx, desired, sizes[idx].0 / 2.0)
        })
        .collect();
    if entries.is_empty() {
        return;
    }
    entries.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let desired_mean = entries.iter().map(|(_, desired, _)| *desired).sum::<f32>() / entries.len() as f32;
    let mut assigned: Vec<(usize, f32)> = Vec::with_capacity(entries.len());
    let mut prev: Option<(f32, f32)> = None;
    for (idx, desired, half) in entries {
        let center = match prev {
            Some((prev_center, prev_half)) => desired.max(prev_center + prev_half + half + node_spacing),
            None => desired,
        };
        assigned.push((idx, center));
        prev = Some((center, half));
    }
    let actual_mean = assigned.iter().map(|(_, center)| *center).sum::<f32>() / assigned.len() as f32;
    let delta = desired_mean - actual_mean;
    for (idx, center) in assigned {
        cross.insert(idx, center + delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Dimensions, NodeWrapper, edge_id, nodes};
    use crate::ir::EdgeStyle;

    fn node(id: &str, width: f32, height: f32) -> Element<()> {
        Element::Node(FlowNode {
            id: id.to_string(),
            data: NodeWrapper::new((), false),
            style: None,
            position: Position::default(),
            dimensions: Dimensions::new(width, height),
        })
    }

    fn edge(source: &str, target: &str) -> Element<()> {
        Element::Edge(FlowEdge {
            id: edge_id(source, target),
            source: source.to_string(),
            target: target.to_string(),
            style: EdgeStyle::default(),
        })
    }

    fn position_of(elements: &[Element<()>], id: &str) -> Position {
        nodes(elements)
            .into_iter()
            .find(|node| node.id == id)
            .map(|node| node.position)
            .unwrap()
    }

    #[test]
    fn root_at_origin_and_child_below() {
        let elements = vec![node("A", 100.0, 50.0), edge("A", "B"), node("B", 80.0, 40.0)];
        let laid_out = layout_elements(&elements, &LayoutConfig::default()).unwrap();
        let a = position_of(&laid_out, "A");
        let b = position_of(&laid_out, "B");
        assert_eq!(a, Position::new(0.0, 0.0));
        assert!(b.y > a.y);
        assert!(b.y >= 50.0, "child should start below the root's bottom edge, got {}", b.y);
    }

    #[test]
    fn end_node_lands_on_the_last_rank() {
        let elements = vec![
            node("start", 100.0, 40.0),
            edge("start", "left"),
            edge("start", "right"),
            edge("start", "end"),
            node("left", 100.0, 40.0),
            edge("left", "end"),
            node("right", 100.0, 40.0),
            edge("right", "end"),
            node("end", 60.0, 30.0),
        ];
        let laid_out = layout_elements(&elements, &LayoutConfig::default()).unwrap();
        let end = position_of(&laid_out, "end");
        assert!(end.y > position_of(&laid_out, "left").y);
        assert!(end.y > position_of(&laid_out, "right").y);
    }

    #[test]
    fn narrow_siblings_keep_minimum_width_apart() {
        let elements = vec![
            node("A", 100.0, 40.0),
            edge("A", "B"),
            edge("A", "C"),
            node("B", 20.0, 40.0),
            node("C", 20.0, 40.0),
        ];
        let laid_out = layout_elements(&elements, &LayoutConfig::default()).unwrap();
        let b = position_of(&laid_out, "B");
        let c = position_of(&laid_out, "C");
        assert!((b.x - c.x).abs() >= 120.0, "siblings too close: {} vs {}", b.x, c.x);
    }

    #[test]
    fn edges_pass_through_in_order() {
        let elements = vec![node("A", 100.0, 50.0), edge("A", "B"), node("B", 80.0, 40.0)];
        let laid_out = layout_elements(&elements, &LayoutConfig::default()).unwrap();
        let ids: Vec<&str> = laid_out.iter().map(Element::id).collect();
        assert_eq!(ids, vec!["A", "A->B", "B"]);
        assert_eq!(laid_out[1], elements[1]);
    }

    #[test]
    fn layout_is_idempotent() {
        let elements = vec![
            node("A", 100.0, 50.0),
            edge("A", "B"),
            edge("A", "C"),
            node("B", 80.0, 40.0),
            edge("B", "D"),
            node("C", 140.0, 60.0),
            edge("C", "D"),
            node("D", 90.0, 30.0),
        ];
        let config = LayoutConfig::default();
        let first = layout_elements(&elements, &config).unwrap();
        let second = layout_elements(&first, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn chain_into_diamond_ranks_every_node() {
        let elements = vec![
            node("t", 120.0, 40.0),
            edge("t", "o"),
            node("o", 120.0, 40.0),
            edge("o", "c"),
            edge("o", "r"),
            node("c", 120.0, 40.0),
            edge("c", "e"),
            node("r", 120.0, 40.0),
            edge("r", "e"),
            node("e", 120.0, 40.0),
        ];
        let laid_out = layout_elements(&elements, &LayoutConfig::default()).unwrap();
        let t = position_of(&laid_out, "t");
        let o = position_of(&laid_out, "o");
        let c = position_of(&laid_out, "c");
        let r = position_of(&laid_out, "r");
        let e = position_of(&laid_out, "e");
        assert_eq!(t, Position::new(0.0, 0.0));
        assert_eq!(o.y, 90.0);
        assert_eq!(c.y, r.y);
        assert_eq!(c.y, 180.0);
        assert_eq!(e.y, 270.0);
        assert!((c.x - r.x).abs() >= 170.0);
        assert!((o.x - (c.x + r.x) / 2.0).abs() < 1e-3);
        assert!((e.x - o.x).abs() < 1e-3);
    }

    #[test]
    fn cycle_below_the_root_keeps_root_on_top() {
        let elements = vec![
            node("A", 100.0, 40.0),
            edge("A", "B"),
            node("B", 100.0, 40.0),
            edge("B", "C"),
            node("C", 100.0, 40.0),
            edge("C", "B"),
            edge("B", "B"),
        ];
        let laid_out = layout_elements(&elements, &LayoutConfig::default()).unwrap();
        let a = position_of(&laid_out, "A");
        let b = position_of(&laid_out, "B");
        let c = position_of(&laid_out, "C");
        assert_eq!(a, Position::new(0.0, 0.0));
        assert!(b.y > a.y);
        assert!(c.y > b.y);
    }

    #[test]
    fn shallow_leaf_settles_on_the_furthest_rank() {
        let elements = vec![
            node("root", 100.0, 40.0),
            edge("root", "leaf"),
            edge("root", "mid"),
            node("leaf", 100.0, 40.0),
            node("mid", 100.0, 40.0),
            edge("mid", "deep"),
            node("deep", 100.0, 40.0),
        ];
        let laid_out = layout_elements(&elements, &LayoutConfig::default()).unwrap();
        assert_eq!(position_of(&laid_out, "leaf").y, position_of(&laid_out, "deep").y);
    }

    #[test]
    fn rejects_cycles_without_root() {
        let elements = vec![node("A", 10.0, 10.0), edge("A", "B"), node("B", 10.0, 10.0), edge("B", "A")];
        assert_eq!(
            layout_elements(&elements, &LayoutConfig::default()),
            Err(LayoutError::NoRoot)
        );
    }

    #[test]
    fn rejects_multiple_roots() {
        let elements = vec![node("A", 10.0, 10.0), node("B", 10.0, 10.0)];
        assert_eq!(
            layout_elements(&elements, &LayoutConfig::default()),
            Err(LayoutError::MultipleRoots {
                roots: vec!["A".to_string(), "B".to_string()]
            })
        );
    }

    #[test]
    fn rejects_islands_unreachable_from_root() {
        let elements = vec![
            node("A", 10.0, 10.0),
            edge("A", "B"),
            node("B", 10.0, 10.0),
            node("C", 10.0, 10.0),
            edge("C", "D"),
            node("D", 10.0, 10.0),
            edge("D", "C"),
        ];
        assert_eq!(
            layout_elements(&elements, &LayoutConfig::default()),
            Err(LayoutError::Disconnected {
                root: "A".to_string(),
                unreachable: vec!["C".to_string(), "D".to_string()],
            })
        );
    }

    #[test]
    fn rejects_dangling_edges_and_unmeasured_nodes() {
        let dangling = vec![node("A", 10.0, 10.0), edge("A", "ghost")];
        assert_eq!(
            layout_elements(&dangling, &LayoutConfig::default()),
            Err(LayoutError::MissingEndpoint {
                edge_id: "A->ghost".to_string(),
                node_id: "ghost".to_string(),
            })
        );

        let mut unmeasured = vec![node("A", 10.0, 10.0), edge("A", "B"), node("B", 10.0, 10.0)];
        if let Element::Node(b) = &mut unmeasured[2] {
            b.dimensions = Dimensions::unmeasured();
        }
        assert_eq!(
            layout_elements(&unmeasured, &LayoutConfig::default()),
            Err(LayoutError::Unmeasured {
                node_id: "B".to_string()
            })
        );
    }

    #[test]
    fn finds_root_among_elements() {
        let elements = vec![node("B", 10.0, 10.0), edge("A", "B"), node("A", 10.0, 10.0)];
        assert_eq!(root_node(&elements).unwrap().id, "A");
    }
}
