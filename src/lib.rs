pub mod builder;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod elements;
pub mod error;
pub mod extent;
pub mod flow;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod measure;
pub mod preset;
pub mod reconcile;
pub mod render;
pub mod style;
pub mod theme;
pub mod trigger;

pub use builder::elements_from_nodes;
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, RenderConfig, load_config};
pub use elements::{Dimensions, Element, FlowEdge, FlowNode, NodeWrapper, Position};
pub use error::{LayoutError, Result};
pub use extent::{Extent, ExtentPadding, PaddingOverrides, calc_flow_extent};
pub use flow::{FlowInstance, LayoutFlow, RelayoutOutcome, Viewport};
pub use ir::{EdgeStyle, NodeContent, NodeMap, NodeSpec, NodeStyle, NodeTarget, TextContent};
pub use layout::layout_elements;
pub use measure::{Measure, MeasureConfig, TextMeasurer};
pub use preset::{FlagOverrides, Preset, RendererFlags};
pub use reconcile::{OFFSCREEN_POSITION, reconcile_elements};
pub use render::render_flow_svg;
pub use theme::Theme;
pub use trigger::should_relayout;

/// Lays out a text node map in one pass, measuring nodes with
/// [`TextMeasurer`] instead of a live renderer.
pub fn layout_text_flow(nodes: &NodeMap<TextContent>, config: Config) -> Result<LayoutFlow<TextContent>> {
    let measurer = TextMeasurer::new(config.measure.clone());
    let mut flow = LayoutFlow::with_nodes(nodes, config);
    match flow.measure_with(&measurer) {
        RelayoutOutcome::Failed(err) => Err(err),
        RelayoutOutcome::LaidOut | RelayoutOutcome::Skipped => Ok(flow),
    }
}
