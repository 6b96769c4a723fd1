use crate::elements::{Element, Position};
use std::collections::HashMap;

/// Where nodes wait until they have been measured and laid out.
pub const OFFSCREEN_POSITION: Position = Position::new(-10000.0, -10000.0);

/// Merges a freshly built element list with the currently displayed one.
///
/// Nodes already on screen keep their last laid-out position so nothing
/// jumps before the next layout. New nodes are parked off screen. Edges that
/// are not already displayed are held back, since they would point at nodes
/// that have no size yet.
pub fn reconcile_elements<C: Clone>(incoming: &[Element<C>], previous: &[Element<C>]) -> Vec<Element<C>> {
    let known: HashMap<&str, &Element<C>> = previous
        .iter()
        .map(|element| (element.id(), element))
        .collect();

    incoming
        .iter()
        .filter_map(|element| match element {
            Element::Edge(edge) => known
                .contains_key(edge.id.as_str())
                .then(|| element.clone()),
            Element::Node(node) => {
                let position = match known.get(node.id.as_str()) {
                    Some(Element::Node(before)) => before.position,
                    _ => OFFSCREEN_POSITION,
                };
                Some(Element::Node(node.with_position(position)))
            }
        })
        .collect()
}
