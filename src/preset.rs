use serde::{Deserialize, Serialize};

/// Interaction scheme of the host product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Wheel pans the diagram; double click does not zoom. The pane shows a
    /// grab cursor.
    #[default]
    ScrollPan,
    /// Diagram embedded in a scrolling page: the wheel scrolls the page and
    /// never zooms.
    Embedded,
}

/// Pan/zoom behavior handed to the diagram renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererFlags {
    pub pan_on_scroll: bool,
    pub pan_on_scroll_speed: f32,
    pub zoom_on_scroll: bool,
    pub zoom_on_double_click: bool,
    pub prevent_scrolling: bool,
    pub nodes_draggable: bool,
    pub elements_selectable: bool,
    pub grab_cursor: bool,
    pub min_zoom: f32,
    pub max_zoom: f32,
}

impl Default for RendererFlags {
    fn default() -> Self {
        Self {
            pan_on_scroll: true,
            pan_on_scroll_speed: 1.0,
            zoom_on_scroll: true,
            zoom_on_double_click: true,
            prevent_scrolling: true,
            nodes_draggable: false,
            elements_selectable: false,
            grab_cursor: false,
            min_zoom: 0.5,
            max_zoom: 2.0,
        }
    }
}

/// Caller pass-through; whatever is set here wins over the preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlagOverrides {
    pub pan_on_scroll: Option<bool>,
    pub pan_on_scroll_speed: Option<f32>,
    pub zoom_on_scroll: Option<bool>,
    pub zoom_on_double_click: Option<bool>,
    pub prevent_scrolling: Option<bool>,
    pub nodes_draggable: Option<bool>,
    pub elements_selectable: Option<bool>,
    pub min_zoom: Option<f32>,
    pub max_zoom: Option<f32>,
}

impl Preset {
    pub fn flags(self) -> RendererFlags {
        let base = RendererFlags::default();
        match self {
            Preset::ScrollPan => RendererFlags {
                pan_on_scroll: true,
                pan_on_scroll_speed: 1.0,
                zoom_on_double_click: false,
                grab_cursor: true,
                ..base
            },
            Preset::Embedded => RendererFlags {
                pan_on_scroll: false,
                zoom_on_scroll: false,
                prevent_scrolling: false,
                ..base
            },
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "scroll-pan" => Some(Preset::ScrollPan),
            "embedded" => Some(Preset::Embedded),
            _ => None,
        }
    }
}

impl RendererFlags {
    pub fn with_overrides(self, overrides: &FlagOverrides) -> Self {
        Self {
            pan_on_scroll: overrides.pan_on_scroll.unwrap_or(self.pan_on_scroll),
            pan_on_scroll_speed: overrides
                .pan_on_scroll_speed
                .unwrap_or(self.pan_on_scroll_speed),
            zoom_on_scroll: overrides.zoom_on_scroll.unwrap_or(self.zoom_on_scroll),
            zoom_on_double_click: overrides
                .zoom_on_double_click
                .unwrap_or(self.zoom_on_double_click),
            prevent_scrolling: overrides.prevent_scrolling.unwrap_or(self.prevent_scrolling),
            nodes_draggable: overrides.nodes_draggable.unwrap_or(self.nodes_draggable),
            elements_selectable: overrides
                .elements_selectable
                .unwrap_or(self.elements_selectable),
            grab_cursor: self.grab_cursor,
            min_zoom: overrides.min_zoom.unwrap_or(self.min_zoom),
            max_zoom: overrides.max_zoom.unwrap_or(self.max_zoom),
        }
    }
}
