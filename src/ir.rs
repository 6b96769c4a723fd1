use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::measure::split_lines;
use crate::theme::Theme;

/// Caller-supplied flow description keyed by node id. Iteration follows
/// insertion order, which is also the order elements are emitted in.
pub type NodeMap<C> = IndexMap<String, NodeSpec<C>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec<C> {
    pub content: C,
    #[serde(default)]
    pub targets: Vec<NodeTarget>,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<NodeStyle>,
}

impl<C> NodeSpec<C> {
    pub fn new(content: C) -> Self {
        Self {
            content,
            targets: Vec::new(),
            is_hidden: false,
            style: None,
        }
    }

    pub fn target(mut self, target_id: impl Into<String>) -> Self {
        self.targets.push(NodeTarget::new(target_id));
        self
    }

    pub fn styled_target(mut self, target_id: impl Into<String>, edge_style: EdgeStyle) -> Self {
        self.targets.push(NodeTarget {
            target_id: target_id.into(),
            edge_style: Some(edge_style),
        });
        self
    }

    pub fn hidden(mut self, is_hidden: bool) -> Self {
        self.is_hidden = is_hidden;
        self
    }

    pub fn with_style(mut self, style: NodeStyle) -> Self {
        self.style = Some(style);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTarget {
    #[serde(alias = "nodeId")]
    pub target_id: String,
    #[serde(default, alias = "edgeProps", skip_serializing_if = "Option::is_none")]
    pub edge_style: Option<EdgeStyle>,
}

impl NodeTarget {
    pub fn new(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            edge_style: None,
        }
    }
}

/// Display settings of a connection. Every field is optional so a per-target
/// style can override only what it sets on top of the flow-wide default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdgeStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_background_opacity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_padding: Option<[f32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
}

impl EdgeStyle {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    /// Field-wise merge where `overrides` wins wherever it sets a value.
    pub fn merged_with(&self, overrides: &EdgeStyle) -> EdgeStyle {
        EdgeStyle {
            label: overrides.label.clone().or_else(|| self.label.clone()),
            label_color: overrides
                .label_color
                .clone()
                .or_else(|| self.label_color.clone()),
            label_background: overrides
                .label_background
                .clone()
                .or_else(|| self.label_background.clone()),
            label_background_opacity: overrides
                .label_background_opacity
                .or(self.label_background_opacity),
            label_padding: overrides.label_padding.or(self.label_padding),
            stroke: overrides.stroke.clone().or_else(|| self.stroke.clone()),
            stroke_width: overrides.stroke_width.or(self.stroke_width),
            dashed: overrides.dashed.or(self.dashed),
            animated: overrides.animated.or(self.animated),
        }
    }
}

/// Free-form CSS declarations forwarded to the node wrapper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeStyle(pub IndexMap<String, String>);

impl NodeStyle {
    pub fn set(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(property.into(), value.into());
        self
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.0.get(property).map(String::as_str)
    }

    pub fn to_css(&self) -> String {
        self.0
            .iter()
            .map(|(property, value)| format!("{property}: {value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Where a node's content is drawn.
#[derive(Debug, Clone, Copy)]
pub struct ContentFrame<'a> {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub theme: &'a Theme,
}

/// Renderable node payload. The layout core only forwards it; the preview
/// renderer asks it to draw itself inside the box the layout assigned.
pub trait NodeContent {
    fn render_svg(&self, frame: ContentFrame<'_>) -> String;
}

/// Plain text payload. `<br>` and `\n` separate lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextContent(pub String);

impl TextContent {
    pub fn lines(&self) -> Vec<String> {
        split_lines(&self.0)
    }
}

impl From<&str> for TextContent {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TextContent {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl NodeContent for TextContent {
    fn render_svg(&self, frame: ContentFrame<'_>) -> String {
        let theme = frame.theme;
        let lines = self.lines();
        let line_height = theme.font_size * theme.line_height;
        let total_height = lines.len() as f32 * line_height;
        let center_x = frame.x + frame.width / 2.0;
        let start_y = frame.y + (frame.height - total_height) / 2.0 + theme.font_size;
        let mut text = format!(
            "<text x=\"{center_x:.2}\" y=\"{start_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">",
            theme.font_family, theme.font_size, theme.text_color
        );
        for (idx, line) in lines.iter().enumerate() {
            let dy = if idx == 0 { 0.0 } else { line_height };
            text.push_str(&format!(
                "<tspan x=\"{center_x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
                escape_xml(line)
            ));
        }
        text.push_str("</text>");
        text
    }
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
