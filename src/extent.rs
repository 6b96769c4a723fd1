use crate::elements::FlowNode;
use serde::{Deserialize, Serialize};

/// Panning boundary `[[left, top], [right, bottom]]` in flow coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extent(pub [[f32; 2]; 2]);

impl Extent {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self([[left, top], [right, bottom]])
    }

    pub fn left(&self) -> f32 {
        self.0[0][0]
    }

    pub fn top(&self) -> f32 {
        self.0[0][1]
    }

    pub fn right(&self) -> f32 {
        self.0[1][0]
    }

    pub fn bottom(&self) -> f32 {
        self.0[1][1]
    }

    pub fn width(&self) -> f32 {
        self.right() - self.left()
    }

    pub fn height(&self) -> f32 {
        self.bottom() - self.top()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtentPadding {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for ExtentPadding {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 30.0,
            bottom: 20.0,
            left: 30.0,
        }
    }
}

impl ExtentPadding {
    pub fn with_overrides(self, overrides: &PaddingOverrides) -> Self {
        Self {
            top: overrides.top.unwrap_or(self.top),
            right: overrides.right.unwrap_or(self.right),
            bottom: overrides.bottom.unwrap_or(self.bottom),
            left: overrides.left.unwrap_or(self.left),
        }
    }
}

/// Per-side replacements for the default extent padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaddingOverrides {
    pub top: Option<f32>,
    pub right: Option<f32>,
    pub bottom: Option<f32>,
    pub left: Option<f32>,
}

/// Bounding box of the visible nodes grown by `padding`.
///
/// When the content is shorter than the container the bottom side absorbs
/// all remaining free space, so the extent is exactly as tall as the
/// container and there is nothing to scroll. Returns `None` while the
/// container height is unknown or when no node is visible.
pub fn calc_flow_extent<C>(
    nodes: &[FlowNode<C>],
    container_height: Option<f32>,
    padding: &ExtentPadding,
) -> Option<Extent> {
    let container_height = container_height?;

    let mut visible = nodes.iter().filter(|node| !node.is_hidden()).peekable();
    visible.peek()?;

    let mut top_most_y = f32::INFINITY;
    let mut left_most_x = f32::INFINITY;
    let mut right_most_x = f32::NEG_INFINITY;
    let mut bottom_most_y = f32::NEG_INFINITY;
    for node in visible {
        top_most_y = top_most_y.min(node.position.y);
        left_most_x = left_most_x.min(node.position.x);
        right_most_x = right_most_x.max(node.position.x + node.width());
        bottom_most_y = bottom_most_y.max(node.position.y + node.height());
    }

    let content_height = bottom_most_y - top_most_y;
    let free_space = container_height - (content_height + padding.top);
    let bottom_padding = if free_space < 0.0 {
        padding.bottom
    } else {
        free_space
    };

    Some(Extent::new(
        left_most_x - padding.left,
        top_most_y - padding.top,
        right_most_x + padding.right,
        bottom_most_y + bottom_padding,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Dimensions, NodeWrapper, Position};
    use proptest::prelude::*;

    fn node(x: f32, y: f32, width: f32, height: f32, hidden: bool) -> FlowNode<()> {
        FlowNode {
            id: format!("{x}:{y}"),
            data: NodeWrapper::new((), hidden),
            style: None,
            position: Position::new(x, y),
            dimensions: Dimensions::new(width, height),
        }
    }

    #[test]
    fn needs_a_container() {
        let nodes = vec![node(0.0, 0.0, 100.0, 50.0, false)];
        assert_eq!(calc_flow_extent(&nodes, None, &ExtentPadding::default()), None);
    }

    #[test]
    fn short_content_fills_the_container() {
        let nodes = vec![node(0.0, 0.0, 100.0, 50.0, false)];
        let extent = calc_flow_extent(&nodes, Some(150.0), &ExtentPadding::default()).unwrap();
        assert_eq!(extent, Extent::new(-30.0, -20.0, 130.0, 130.0));
        assert_eq!(extent.height(), 150.0);
    }

    #[test]
    fn tall_content_gets_fixed_bottom_padding() {
        let nodes = vec![node(0.0, 0.0, 100.0, 50.0, false), node(-40.0, 400.0, 180.0, 60.0, false)];
        let extent = calc_flow_extent(&nodes, Some(300.0), &ExtentPadding::default()).unwrap();
        assert_eq!(extent, Extent::new(-70.0, -20.0, 170.0, 480.0));
    }

    #[test]
    fn hidden_nodes_do_not_count() {
        let nodes = vec![node(0.0, 0.0, 100.0, 50.0, false), node(500.0, 900.0, 100.0, 50.0, true)];
        let extent = calc_flow_extent(&nodes, Some(100.0), &ExtentPadding::default()).unwrap();
        assert_eq!(extent.right(), 130.0);
        assert_eq!(extent.bottom(), 80.0);

        let only_hidden = vec![node(0.0, 0.0, 100.0, 50.0, true)];
        assert_eq!(calc_flow_extent(&only_hidden, Some(100.0), &ExtentPadding::default()), None);
    }

    #[test]
    fn overrides_replace_single_sides() {
        let padding = ExtentPadding::default().with_overrides(&PaddingOverrides {
            left: Some(0.0),
            bottom: Some(5.0),
            ..Default::default()
        });
        assert_eq!(padding, ExtentPadding { top: 20.0, right: 30.0, bottom: 5.0, left: 0.0 });
        let nodes = vec![node(0.0, 0.0, 100.0, 500.0, false)];
        let extent = calc_flow_extent(&nodes, Some(100.0), &padding).unwrap();
        assert_eq!(extent, Extent::new(0.0, -20.0, 130.0, 505.0));
    }

    #[test]
    fn serializes_as_nested_pairs() {
        let extent = Extent::new(-30.0, -20.0, 130.0, 130.0);
        assert_eq!(serde_json::to_string(&extent).unwrap(), "[[-30.0,-20.0],[130.0,130.0]]");
    }

    proptest! {
        #[test]
        fn free_space_is_absorbed_by_the_bottom(height in 1.0f32..400.0, extra in 20.0f32..600.0) {
            let nodes = vec![node(0.0, 0.0, 100.0, height, false)];
            let container = height + extra;
            let extent = calc_flow_extent(&nodes, Some(container), &ExtentPadding::default()).unwrap();
            prop_assert!((extent.height() - container).abs() < 1e-3);
        }
    }
}
