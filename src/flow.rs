use crate::builder::elements_from_nodes;
use crate::config::Config;
use crate::elements::{Dimensions, Element, FlowNode, nodes};
use crate::error::LayoutError;
use crate::extent::{Extent, ExtentPadding, calc_flow_extent};
use crate::ir::NodeMap;
use crate::layout::layout_elements;
use crate::measure::Measure;
use crate::preset::RendererFlags;
use crate::reconcile::reconcile_elements;
use crate::style::scoped_stylesheet;
use crate::trigger::should_relayout;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Container width assumed until the host reports one.
const FALLBACK_CONTAINER_WIDTH: f32 = 700.0;
const DEFAULT_VIEWPORT_Y: f32 = 50.0;

/// Screen transform of the diagram: `screen = flow * zoom + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
}

/// Handle for host-driven pan and zoom. Every change is clamped so the
/// visible window stays inside the current extent.
#[derive(Debug, Clone)]
pub struct FlowInstance {
    viewport: Viewport,
    extent: Option<Extent>,
    container: (f32, f32),
    flags: RendererFlags,
}

impl FlowInstance {
    fn new(viewport: Viewport, container: (f32, f32), flags: RendererFlags) -> Self {
        Self {
            viewport,
            extent: None,
            container,
            flags,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn extent(&self) -> Option<Extent> {
        self.extent
    }

    pub fn flags(&self) -> &RendererFlags {
        &self.flags
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        let zoom = viewport
            .zoom
            .clamp(self.flags.min_zoom, self.flags.max_zoom);
        self.viewport = self.constrain(Viewport { zoom, ..viewport });
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        let current = self.viewport;
        self.set_viewport(Viewport {
            x: current.x + dx,
            y: current.y + dy,
            ..current
        });
    }

    /// Zooms around the center of the container.
    pub fn zoom_to(&mut self, zoom: f32) {
        let current = self.viewport;
        let zoom = zoom.clamp(self.flags.min_zoom, self.flags.max_zoom);
        let (width, height) = self.container;
        let center = (width / 2.0, height / 2.0);
        let flow_x = (center.0 - current.x) / current.zoom;
        let flow_y = (center.1 - current.y) / current.zoom;
        self.set_viewport(Viewport {
            x: center.0 - flow_x * zoom,
            y: center.1 - flow_y * zoom,
            zoom,
        });
    }

    fn update(&mut self, extent: Option<Extent>, container: (f32, f32)) {
        self.extent = extent;
        self.container = container;
        self.viewport = self.constrain(self.viewport);
    }

    // Same rule d3-zoom applies for a translate extent: center content that
    // is smaller than the window, otherwise pull the nearest edge back in.
    fn constrain(&self, viewport: Viewport) -> Viewport {
        let Some(extent) = self.extent else {
            return viewport;
        };
        let (width, height) = self.container;
        let k = viewport.zoom;
        let shift = |near: f32, far: f32| {
            if far > near {
                (near + far) / 2.0
            } else if near < 0.0 {
                near
            } else {
                far.max(0.0)
            }
        };
        let dx0 = -viewport.x / k - extent.left();
        let dx1 = (width - viewport.x) / k - extent.right();
        let dy0 = -viewport.y / k - extent.top();
        let dy1 = (height - viewport.y) / k - extent.bottom();
        Viewport {
            x: viewport.x + k * shift(dx0, dx1),
            y: viewport.y + k * shift(dy0, dy1),
            zoom: k,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelayoutOutcome {
    /// Sizes are incomplete or unchanged since the last layout.
    Skipped,
    LaidOut,
    /// The flow violates a layout precondition; positions were left as they
    /// were.
    Failed(LayoutError),
}

type InitCallback = Box<dyn FnOnce(&mut FlowInstance)>;

/// Keeps a flow laid out while its node map and node sizes change.
///
/// The host feeds node map changes through [`LayoutFlow::set_nodes`] and
/// renderer measurements through [`LayoutFlow::apply_measurements`]; layout
/// runs only when the measurements warrant it. The element list is always
/// replaced as a whole, never edited in place.
pub struct LayoutFlow<C> {
    config: Config,
    padding: ExtentPadding,
    built: Vec<Element<C>>,
    elements: Vec<Element<C>>,
    previous_nodes: Vec<FlowNode<C>>,
    laid_out_nodes: Vec<FlowNode<C>>,
    extent: Option<Extent>,
    instance: FlowInstance,
    on_init: Option<InitCallback>,
}

impl<C: Clone> LayoutFlow<C> {
    pub fn new(config: Config) -> Self {
        let flags = config.preset.flags().with_overrides(&config.renderer);
        let padding = ExtentPadding::default().with_overrides(&config.extent);
        let viewport = default_viewport(config.render.container_width);
        let container = container_size(&config);
        Self {
            config,
            padding,
            built: Vec::new(),
            elements: Vec::new(),
            previous_nodes: Vec::new(),
            laid_out_nodes: Vec::new(),
            extent: None,
            instance: FlowInstance::new(viewport, container, flags),
            on_init: None,
        }
    }

    pub fn with_nodes(nodes: &NodeMap<C>, config: Config) -> Self {
        let mut flow = Self::new(config);
        flow.set_nodes(nodes);
        flow
    }

    /// Registers a callback that receives the instance handle once the first
    /// layout has landed.
    pub fn on_init(&mut self, callback: impl FnOnce(&mut FlowInstance) + 'static) {
        self.on_init = Some(Box::new(callback));
    }

    /// Rebuilds the elements from a changed node map. Known nodes stay where
    /// they are, new ones wait off screen for their first measurement.
    pub fn set_nodes(&mut self, nodes: &NodeMap<C>) {
        self.built = elements_from_nodes(nodes, self.config.default_edge_style.as_ref());
        self.elements = reconcile_elements(&self.built, &self.elements);
        self.previous_nodes.clear();
        self.laid_out_nodes.retain(|node| nodes.contains_key(&node.id));
        debug!(
            nodes = nodes.len(),
            elements = self.elements.len(),
            "node map changed"
        );
    }

    /// Attaches renderer measurements to the displayed nodes and lays the
    /// flow out again if they call for it. Unknown ids are ignored.
    pub fn apply_measurements<I, S>(&mut self, measurements: I) -> RelayoutOutcome
    where
        I: IntoIterator<Item = (S, Dimensions)>,
        S: Into<String>,
    {
        let measurements: HashMap<String, Dimensions> = measurements
            .into_iter()
            .map(|(id, dimensions)| (id.into(), dimensions))
            .collect();
        self.elements = self
            .elements
            .iter()
            .map(|element| match element {
                Element::Node(node) => match measurements.get(&node.id) {
                    Some(dimensions) => Element::Node(node.with_dimensions(*dimensions)),
                    None => element.clone(),
                },
                Element::Edge(_) => element.clone(),
            })
            .collect();

        let measured = nodes(&self.elements);
        if !should_relayout(&measured, &self.previous_nodes) {
            debug!(nodes = measured.len(), "relayout skipped");
            return RelayoutOutcome::Skipped;
        }

        let displayed: HashMap<&str, &FlowNode<C>> = self
            .elements
            .iter()
            .filter_map(Element::as_node)
            .map(|node| (node.id.as_str(), node))
            .collect();
        let input: Vec<Element<C>> = self
            .built
            .iter()
            .filter_map(|element| match element {
                Element::Node(node) => displayed
                    .get(node.id.as_str())
                    .map(|current| Element::Node((*current).clone())),
                Element::Edge(_) => Some(element.clone()),
            })
            .collect();

        let outcome = match layout_elements(&input, &self.config.layout) {
            Ok(laid_out) => {
                self.laid_out_nodes = nodes(&laid_out);
                self.elements = laid_out;
                self.refresh_extent();
                if let Some(callback) = self.on_init.take() {
                    callback(&mut self.instance);
                }
                RelayoutOutcome::LaidOut
            }
            Err(err) => {
                warn!(error = %err, "layout failed, keeping previous positions");
                RelayoutOutcome::Failed(err)
            }
        };
        self.previous_nodes = measured;
        outcome
    }

    /// Measures every displayed node with `measurer`, standing in for the
    /// renderer's size report.
    pub fn measure_with<M: Measure<C>>(&mut self, measurer: &M) -> RelayoutOutcome {
        let measurements: Vec<(String, Dimensions)> = self
            .elements
            .iter()
            .filter_map(Element::as_node)
            .map(|node| (node.id.clone(), measurer.measure(&node.data.content)))
            .collect();
        self.apply_measurements(measurements)
    }

    pub fn set_container_size(&mut self, width: Option<f32>, height: Option<f32>) {
        self.config.render.container_width = width;
        self.config.render.container_height = height;
        self.refresh_extent();
    }

    fn refresh_extent(&mut self) {
        self.extent = calc_flow_extent(
            &self.laid_out_nodes,
            self.config.render.container_height,
            &self.padding,
        );
        self.instance.update(self.extent, container_size(&self.config));
        debug!(extent = ?self.extent, "extent updated");
    }

    pub fn elements(&self) -> &[Element<C>] {
        &self.elements
    }

    pub fn extent(&self) -> Option<Extent> {
        self.extent
    }

    pub fn flags(&self) -> &RendererFlags {
        self.instance.flags()
    }

    pub fn instance(&self) -> &FlowInstance {
        &self.instance
    }

    pub fn instance_mut(&mut self) -> &mut FlowInstance {
        &mut self.instance
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stylesheet(&self) -> String {
        scoped_stylesheet(&self.config.render.class_name, self.instance.flags())
    }

    /// True once at least one layout has been applied.
    pub fn is_laid_out(&self) -> bool {
        !self.laid_out_nodes.is_empty()
    }
}

fn default_viewport(container_width: Option<f32>) -> Viewport {
    let width = container_width.unwrap_or(FALLBACK_CONTAINER_WIDTH);
    Viewport {
        x: width / 2.0,
        y: DEFAULT_VIEWPORT_Y,
        zoom: 1.0,
    }
}

fn container_size(config: &Config) -> (f32, f32) {
    (
        config
            .render
            .container_width
            .unwrap_or(FALLBACK_CONTAINER_WIDTH),
        config.render.container_height.unwrap_or(config.render.height),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{NodeSpec, TextContent};
    use crate::preset::Preset;
    use crate::reconcile::OFFSCREEN_POSITION;
    use crate::elements::Position;
    use std::cell::Cell;
    use std::rc::Rc;

    fn two_nodes() -> NodeMap<TextContent> {
        let mut map = NodeMap::new();
        map.insert("A".to_string(), NodeSpec::new(TextContent::from("Start")).target("B"));
        map.insert("B".to_string(), NodeSpec::new(TextContent::from("End")));
        map
    }

    fn position(flow: &LayoutFlow<TextContent>, id: &str) -> Position {
        flow.elements()
            .iter()
            .filter_map(Element::as_node)
            .find(|node| node.id == id)
            .map(|node| node.position)
            .unwrap()
    }

    fn config_with_container(height: f32) -> Config {
        let mut config = Config::default();
        config.render.container_width = Some(800.0);
        config.render.container_height = Some(height);
        config
    }

    #[test]
    fn first_build_waits_for_measurements() {
        let flow = LayoutFlow::with_nodes(&two_nodes(), Config::default());
        assert_eq!(flow.elements().len(), 2);
        assert_eq!(position(&flow, "A"), OFFSCREEN_POSITION);
        assert!(!flow.is_laid_out());
        assert_eq!(flow.extent(), None);
    }

    #[test]
    fn partial_measurement_does_not_lay_out() {
        let mut flow = LayoutFlow::with_nodes(&two_nodes(), config_with_container(600.0));
        let outcome = flow.apply_measurements([("A", Dimensions::new(100.0, 50.0))]);
        assert_eq!(outcome, RelayoutOutcome::Skipped);
        assert_eq!(position(&flow, "A"), OFFSCREEN_POSITION);
    }

    #[test]
    fn full_measurement_lays_out_once() {
        let mut flow = LayoutFlow::with_nodes(&two_nodes(), config_with_container(600.0));
        let sizes = [("A", Dimensions::new(100.0, 50.0)), ("B", Dimensions::new(80.0, 40.0))];
        assert_eq!(flow.apply_measurements(sizes), RelayoutOutcome::LaidOut);
        assert_eq!(position(&flow, "A"), Position::new(0.0, 0.0));
        assert!(position(&flow, "B").y > 0.0);
        assert_eq!(flow.elements().len(), 3);
        assert_eq!(flow.apply_measurements(sizes), RelayoutOutcome::Skipped);

        let extent = flow.extent().unwrap();
        assert_eq!(extent.top(), -20.0);
        assert_eq!(extent.height(), 600.0);
    }

    #[test]
    fn size_change_triggers_relayout() {
        let mut flow = LayoutFlow::with_nodes(&two_nodes(), config_with_container(600.0));
        flow.apply_measurements([("A", Dimensions::new(100.0, 50.0)), ("B", Dimensions::new(80.0, 40.0))]);
        let before = position(&flow, "B");
        let outcome =
            flow.apply_measurements([("A", Dimensions::new(100.0, 150.0)), ("B", Dimensions::new(80.0, 40.0))]);
        assert_eq!(outcome, RelayoutOutcome::LaidOut);
        assert!(position(&flow, "B").y > before.y);
    }

    #[test]
    fn adding_a_node_keeps_existing_positions_until_measured() {
        let mut map = two_nodes();
        let mut flow = LayoutFlow::with_nodes(&map, config_with_container(600.0));
        flow.apply_measurements([("A", Dimensions::new(100.0, 50.0)), ("B", Dimensions::new(80.0, 40.0))]);
        let a = position(&flow, "A");
        let b = position(&flow, "B");

        map["B"].targets.push(crate::ir::NodeTarget::new("C"));
        map.insert("C".to_string(), NodeSpec::new(TextContent::from("New")));
        flow.set_nodes(&map);

        assert_eq!(position(&flow, "A"), a);
        assert_eq!(position(&flow, "B"), b);
        assert_eq!(position(&flow, "C"), OFFSCREEN_POSITION);
        assert!(flow.elements().iter().all(|element| element.id() != "B->C"));

        let outcome = flow.apply_measurements([
            ("A", Dimensions::new(100.0, 50.0)),
            ("B", Dimensions::new(80.0, 40.0)),
            ("C", Dimensions::new(90.0, 30.0)),
        ]);
        assert_eq!(outcome, RelayoutOutcome::LaidOut);
        assert!(position(&flow, "C").y > position(&flow, "B").y);
        assert!(flow.elements().iter().any(|element| element.id() == "B->C"));
    }

    #[test]
    fn invalid_flow_keeps_positions_and_does_not_loop() {
        let mut map = two_nodes();
        map.insert("island".to_string(), NodeSpec::new(TextContent::from("Alone")));
        let mut flow = LayoutFlow::with_nodes(&map, config_with_container(600.0));
        let sizes = [
            ("A", Dimensions::new(100.0, 50.0)),
            ("B", Dimensions::new(80.0, 40.0)),
            ("island", Dimensions::new(80.0, 40.0)),
        ];
        assert!(matches!(
            flow.apply_measurements(sizes),
            RelayoutOutcome::Failed(LayoutError::MultipleRoots { .. })
        ));
        assert_eq!(position(&flow, "A"), OFFSCREEN_POSITION);
        assert_eq!(flow.apply_measurements(sizes), RelayoutOutcome::Skipped);
    }

    #[test]
    fn on_init_fires_once_after_first_layout() {
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let mut flow = LayoutFlow::with_nodes(&two_nodes(), config_with_container(600.0));
        flow.on_init(move |instance| {
            seen.set(seen.get() + 1);
            instance.zoom_to(1.5);
        });
        flow.apply_measurements([("A", Dimensions::new(100.0, 50.0))]);
        assert_eq!(calls.get(), 0);
        flow.apply_measurements([("A", Dimensions::new(100.0, 50.0)), ("B", Dimensions::new(80.0, 40.0))]);
        flow.apply_measurements([("A", Dimensions::new(120.0, 50.0)), ("B", Dimensions::new(80.0, 40.0))]);
        assert_eq!(calls.get(), 1);
        assert_eq!(flow.instance().viewport().zoom, 1.5);
    }

    #[test]
    fn measure_with_uses_the_measurer() {
        let mut flow = LayoutFlow::with_nodes(&two_nodes(), config_with_container(600.0));
        let outcome = flow.measure_with(&|_: &TextContent| Dimensions::new(100.0, 40.0));
        assert_eq!(outcome, RelayoutOutcome::LaidOut);
        assert_eq!(position(&flow, "A"), Position::new(0.0, 0.0));
    }

    #[test]
    fn container_resize_refreshes_extent() {
        let mut flow = LayoutFlow::with_nodes(&two_nodes(), Config::default());
        flow.apply_measurements([("A", Dimensions::new(100.0, 50.0)), ("B", Dimensions::new(80.0, 40.0))]);
        assert_eq!(flow.extent(), None);
        flow.set_container_size(Some(800.0), Some(1000.0));
        assert_eq!(flow.extent().unwrap().height(), 1000.0);
    }

    #[test]
    fn removed_nodes_leave_the_extent() {
        let mut map = two_nodes();
        map["A"].targets.push(crate::ir::NodeTarget::new("C"));
        map.insert("C".to_string(), NodeSpec::new(TextContent::from("Side")));
        let mut flow = LayoutFlow::with_nodes(&map, config_with_container(600.0));
        flow.apply_measurements([
            ("A", Dimensions::new(100.0, 50.0)),
            ("B", Dimensions::new(80.0, 40.0)),
            ("C", Dimensions::new(300.0, 40.0)),
        ]);
        let with_c = flow.extent().unwrap();

        flow.set_nodes(&two_nodes());
        flow.set_container_size(Some(800.0), Some(600.0));
        let extent = flow.extent().unwrap();
        let right_most = ["A", "B"]
            .iter()
            .map(|id| {
                let node = flow
                    .elements()
                    .iter()
                    .filter_map(Element::as_node)
                    .find(|node| node.id == *id)
                    .unwrap();
                node.position.x + node.width()
            })
            .fold(f32::NEG_INFINITY, f32::max);
        assert_eq!(extent.right(), right_most + 30.0);
        assert_ne!(extent, with_c);
    }

    #[test]
    fn viewport_defaults_to_half_container_width() {
        let flow: LayoutFlow<TextContent> = LayoutFlow::new(Config::default());
        assert_eq!(
            flow.instance().viewport(),
            Viewport { x: 350.0, y: 50.0, zoom: 1.0 }
        );
    }

    #[test]
    fn panning_is_clamped_to_the_extent() {
        let mut config = config_with_container(600.0);
        config.preset = Preset::Embedded;
        let mut flow = LayoutFlow::with_nodes(&two_nodes(), config);
        flow.apply_measurements([("A", Dimensions::new(100.0, 50.0)), ("B", Dimensions::new(80.0, 40.0))]);
        let extent = flow.extent().unwrap();

        let instance = flow.instance_mut();
        instance.pan_by(0.0, 5000.0);
        let viewport = instance.viewport();
        // The extent is exactly as tall as the container, so the only valid
        // vertical offset puts its top edge at the top of the window.
        assert!((viewport.y + extent.top()).abs() < 1e-3);

        instance.zoom_to(10.0);
        assert_eq!(instance.viewport().zoom, 2.0);
    }

    #[test]
    fn stylesheet_follows_preset() {
        let mut config = Config::default();
        config.render.class_name = "builder".to_string();
        let flow: LayoutFlow<TextContent> = LayoutFlow::new(config);
        assert!(flow.stylesheet().contains(".builder .flow-pane { cursor: grab; }"));
    }
}
