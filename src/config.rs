use crate::extent::PaddingOverrides;
use crate::ir::EdgeStyle;
use crate::measure::MeasureConfig;
use crate::preset::{FlagOverrides, Preset};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub node_spacing: f32,
    pub rank_spacing: f32,
    /// Narrower nodes are laid out as if they had this width.
    pub min_node_width: f32,
    pub margin_x: f32,
    pub margin_y: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_spacing: 50.0,
            rank_spacing: 50.0,
            min_node_width: 120.0,
            margin_x: 0.0,
            margin_y: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    /// Width of the element hosting the flow; `None` until it is known.
    pub container_width: Option<f32>,
    /// Rendered height of the scroll container; the extent is not computed
    /// without it.
    pub container_height: Option<f32>,
    pub class_name: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            container_width: None,
            container_height: None,
            class_name: "layout-flow".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub measure: MeasureConfig,
    pub preset: Preset,
    pub renderer: FlagOverrides,
    pub extent: PaddingOverrides,
    pub default_edge_style: Option<EdgeStyle>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfig>,
    render: Option<RenderConfig>,
    measure: Option<MeasureConfig>,
    preset: Option<Preset>,
    renderer: Option<FlagOverrides>,
    extent: Option<PaddingOverrides>,
    default_edge_style: Option<EdgeStyle>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    text_color: Option<String>,
    node_fill: Option<String>,
    node_border: Option<String>,
    line_color: Option<String>,
    background: Option<String>,
}

/// Loads a config file. Strict JSON is tried first, then JSON5 so hand
/// written files may carry comments and trailing commas.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(contents).map_err(|json5_err| {
            anyhow::anyhow!("invalid config: {json_err} (json5: {json5_err})")
        })?,
    };

    let mut config = Config::default();
    if let Some(theme_name) = parsed.theme.as_deref() {
        match Theme::by_name(theme_name) {
            Some(theme) => config.theme = theme,
            None => tracing::warn!(theme = theme_name, "unknown theme, keeping default"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.node_fill {
            config.theme.node_fill = v;
        }
        if let Some(v) = vars.node_border {
            config.theme.node_border = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
    }

    if let Some(layout) = parsed.layout {
        config.layout = layout;
    }
    if let Some(render) = parsed.render {
        config.render = render;
    }
    if let Some(measure) = parsed.measure {
        config.measure = measure;
    }
    if let Some(preset) = parsed.preset {
        config.preset = preset;
    }
    if let Some(renderer) = parsed.renderer {
        config.renderer = renderer;
    }
    if let Some(extent) = parsed.extent {
        config.extent = extent;
    }
    config.default_edge_style = parsed.default_edge_style;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_gives_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.layout.min_node_width, 120.0);
        assert_eq!(config.preset, Preset::ScrollPan);
    }

    #[test]
    fn parses_json5_with_comments() {
        let config = parse_config(
            r##"{
                // pan with the wheel, no zoom
                preset: "embedded",
                theme: "classic",
                themeVariables: { lineColor: "#ff0000" },
                layout: { rank_spacing: 80 },
                extent: { bottom: 60 },
            }"##,
        )
        .unwrap();
        assert_eq!(config.preset, Preset::Embedded);
        assert_eq!(config.theme.line_color, "#ff0000");
        assert_eq!(config.layout.rank_spacing, 80.0);
        assert_eq!(config.layout.node_spacing, 50.0);
        assert_eq!(config.extent.bottom, Some(60.0));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_config("not a config").is_err());
    }
}
