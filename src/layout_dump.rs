use crate::elements::Element;
use crate::extent::Extent;
use crate::flow::LayoutFlow;
use crate::ir::EdgeStyle;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub extent: Option<Extent>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub hidden: bool,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub id: String,
    pub source: String,
    pub target: String,
    pub style: EdgeStyle,
}

impl LayoutDump {
    pub fn from_elements<C>(elements: &[Element<C>], extent: Option<Extent>) -> Self {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        for element in elements {
            match element {
                Element::Node(node) => nodes.push(NodeDump {
                    id: node.id.clone(),
                    x: node.position.x,
                    y: node.position.y,
                    width: node.dimensions.width,
                    height: node.dimensions.height,
                    hidden: node.is_hidden(),
                }),
                Element::Edge(edge) => edges.push(EdgeDump {
                    id: edge.id.clone(),
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    style: edge.style.clone(),
                }),
            }
        }
        LayoutDump { nodes, edges, extent }
    }

    pub fn from_flow<C: Clone>(flow: &LayoutFlow<C>) -> Self {
        Self::from_elements(flow.elements(), flow.extent())
    }
}

/// Writes the dump as pretty JSON to `path`, or stdout when `None`.
pub fn write_layout_dump<C: Clone>(path: Option<&Path>, flow: &LayoutFlow<C>) -> anyhow::Result<()> {
    let dump = LayoutDump::from_flow(flow);
    let json = serde_json::to_string_pretty(&dump)?;
    match path {
        Some(path) => std::fs::write(path, json)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::elements::Dimensions;
    use crate::ir::{NodeMap, NodeSpec, TextContent};

    #[test]
    fn dumps_positions_and_extent() {
        let mut map = NodeMap::new();
        map.insert("A".to_string(), NodeSpec::new(TextContent::from("A")).target("B"));
        map.insert("B".to_string(), NodeSpec::new(TextContent::from("B")));
        let mut config = Config::default();
        config.render.container_height = Some(400.0);
        let mut flow = LayoutFlow::with_nodes(&map, config);
        flow.apply_measurements([("A", Dimensions::new(100.0, 50.0)), ("B", Dimensions::new(80.0, 40.0))]);

        let value = serde_json::to_value(LayoutDump::from_flow(&flow)).unwrap();
        assert_eq!(value["nodes"][0]["id"], "A");
        assert_eq!(value["nodes"][0]["x"], 0.0);
        assert_eq!(value["edges"][0]["id"], "A->B");
        assert_eq!(value["extent"][0][1], -20.0);
    }
}
