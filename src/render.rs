use crate::config::RenderConfig;
use crate::elements::{Element, FlowEdge, FlowNode, HandleKind};
use crate::extent::Extent;
use crate::flow::LayoutFlow;
use crate::ir::{ContentFrame, NodeContent, escape_xml};
use crate::theme::Theme;
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

const DEFAULT_LABEL_PADDING: [f32; 2] = [2.0, 4.0];
const FALLBACK_MARGIN: f32 = 20.0;

/// Renders a laid-out flow, framed by its extent when one is known.
pub fn render_flow_svg<C: NodeContent + Clone>(flow: &LayoutFlow<C>) -> String {
    let config = flow.config();
    render_svg(
        flow.elements(),
        flow.extent(),
        &config.theme,
        &config.render.class_name,
        &flow.stylesheet(),
    )
}

pub fn render_svg<C: NodeContent>(
    elements: &[Element<C>],
    extent: Option<Extent>,
    theme: &Theme,
    class_name: &str,
    stylesheet: &str,
) -> String {
    let nodes: HashMap<&str, &FlowNode<C>> = elements
        .iter()
        .filter_map(Element::as_node)
        .map(|node| (node.id.as_str(), node))
        .collect();
    let frame = extent.unwrap_or_else(|| content_bounds(nodes.values().copied()));
    let width = frame.width().max(1.0);
    let height = frame.height().max(1.0);

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" class=\"{class_name}\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"{:.2} {:.2} {width:.2} {height:.2}\">",
        frame.left(),
        frame.top(),
    ));
    svg.push_str(&format!("<style>{stylesheet}</style>"));
    svg.push_str(&format!(
        "<rect class=\"flow-pane\" x=\"{:.2}\" y=\"{:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" fill=\"{}\"/>",
        frame.left(),
        frame.top(),
        theme.background
    ));
    svg.push_str(&format!(
        "<defs><marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker></defs>",
        theme.line_color
    ));

    for edge in elements.iter().filter_map(Element::as_edge) {
        let (Some(source), Some(target)) = (
            nodes.get(edge.source.as_str()),
            nodes.get(edge.target.as_str()),
        ) else {
            continue;
        };
        svg.push_str(&edge_svg(edge, source, target, theme));
    }

    for node in elements.iter().filter_map(Element::as_node) {
        if node.is_hidden() {
            continue;
        }
        svg.push_str(&node_svg(node, theme));
    }

    svg.push_str("</svg>");
    svg
}

fn node_svg<C: NodeContent>(node: &FlowNode<C>, theme: &Theme) -> String {
    let style = node
        .style
        .as_ref()
        .map(|style| format!(" style=\"{}\"", escape_xml(&style.to_css())))
        .unwrap_or_default();
    let fill = node
        .style
        .as_ref()
        .and_then(|style| style.get("background"))
        .unwrap_or(theme.node_fill.as_str());
    let mut out = format!(
        "<g class=\"flow-node\" data-id=\"{}\"{style}>",
        escape_xml(&node.id)
    );
    out.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"6\" ry=\"6\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
        node.position.x,
        node.position.y,
        node.width(),
        node.height(),
        escape_xml(fill),
        theme.node_border
    ));
    out.push_str(&node.data.content.render_svg(ContentFrame {
        x: node.position.x,
        y: node.position.y,
        width: node.width(),
        height: node.height(),
        theme,
    }));
    out.push_str("</g>");
    out
}

fn edge_svg<C>(edge: &FlowEdge, source: &FlowNode<C>, target: &FlowNode<C>, theme: &Theme) -> String {
    let (x1, y1) = source
        .data
        .handle_point(HandleKind::Source, source.position, source.width(), source.height());
    let (x2, y2) = target
        .data
        .handle_point(HandleKind::Target, target.position, target.width(), target.height());
    let style = &edge.style;
    let stroke = style.stroke.as_deref().unwrap_or(theme.line_color.as_str());
    let stroke_width = style.stroke_width.unwrap_or(1.0);
    let dash = if style.dashed.unwrap_or(false) || style.animated.unwrap_or(false) {
        " stroke-dasharray=\"5 5\""
    } else {
        ""
    };

    let mut out = format!(
        "<path class=\"flow-edge\" data-id=\"{}\" d=\"M {x1:.2} {y1:.2} L {x2:.2} {y2:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{stroke_width}\"{dash} marker-end=\"url(#arrow)\"/>",
        escape_xml(&edge.id),
        escape_xml(stroke),
    );

    if let Some(label) = style.label.as_deref().filter(|label| !label.is_empty()) {
        let [pad_x, pad_y] = style.label_padding.unwrap_or(DEFAULT_LABEL_PADDING);
        let text_width = label.chars().count() as f32 * theme.font_size * 0.6;
        let text_height = theme.font_size;
        let (mid_x, mid_y) = ((x1 + x2) / 2.0, (y1 + y2) / 2.0);
        let background = style
            .label_background
            .as_deref()
            .unwrap_or(theme.edge_label_background.as_str());
        let opacity = style.label_background_opacity.unwrap_or(1.0);
        let color = style.label_color.as_deref().unwrap_or(theme.edge_label_color.as_str());
        out.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"2\" ry=\"2\" fill=\"{}\" fill-opacity=\"{opacity}\"/>",
            mid_x - text_width / 2.0 - pad_x,
            mid_y - text_height / 2.0 - pad_y,
            text_width + pad_x * 2.0,
            text_height + pad_y * 2.0,
            escape_xml(background),
        ));
        out.push_str(&format!(
            "<text x=\"{mid_x:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            mid_y + text_height * 0.35,
            theme.font_family,
            theme.font_size,
            escape_xml(color),
            escape_xml(label)
        ));
    }
    out
}

fn content_bounds<'a, C: 'a>(nodes: impl Iterator<Item = &'a FlowNode<C>>) -> Extent {
    let mut bounds: Option<(f32, f32, f32, f32)> = None;
    for node in nodes.filter(|node| !node.is_hidden()) {
        let (x, y) = (node.position.x, node.position.y);
        let (right, bottom) = (x + node.width(), y + node.height());
        bounds = Some(match bounds {
            None => (x, y, right, bottom),
            Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(right), b.max(bottom)),
        });
    }
    let (left, top, right, bottom) = bounds.unwrap_or((0.0, 0.0, 200.0, 200.0));
    Extent::new(
        left - FALLBACK_MARGIN,
        top - FALLBACK_MARGIN,
        right + FALLBACK_MARGIN,
        bottom + FALLBACK_MARGIN,
    )
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .next()
        .map(|family| family.trim().trim_matches('"').to_string())
        .unwrap_or_else(|| "Inter".to_string());
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("invalid render size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig, _theme: &Theme) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}
