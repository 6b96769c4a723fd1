//! Node measurement.
//!
//! In a live diagram the renderer reports each node's box after mounting it.
//! [`Measure`] stands in for that report so flows can be laid out headless;
//! [`TextMeasurer`] sizes [`TextContent`] the way a padded text box would be.

mod font;

use crate::elements::Dimensions;
use crate::ir::TextContent;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use font::measure_text_width;

static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>|\\n|\n").expect("valid line break pattern"));

/// Reports the rendered size of a node's content.
pub trait Measure<C> {
    fn measure(&self, content: &C) -> Dimensions;
}

impl<C, F> Measure<C> for F
where
    F: Fn(&C) -> Dimensions,
{
    fn measure(&self, content: &C) -> Dimensions {
        self(content)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureConfig {
    pub font_family: String,
    pub font_size: f32,
    pub line_height: f32,
    pub padding_x: f32,
    pub padding_y: f32,
    /// Skip font lookup and use per-character width estimates.
    pub fast_text_metrics: bool,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            line_height: 1.5,
            padding_x: 16.0,
            padding_y: 10.0,
            fast_text_metrics: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextMeasurer {
    config: MeasureConfig,
}

impl TextMeasurer {
    pub fn new(config: MeasureConfig) -> Self {
        Self { config }
    }

    pub fn fast() -> Self {
        Self::new(MeasureConfig {
            fast_text_metrics: true,
            ..Default::default()
        })
    }

    pub fn text_width(&self, text: &str) -> f32 {
        let config = &self.config;
        if config.fast_text_metrics {
            return fallback_text_width(text, config.font_size);
        }
        measure_text_width(text, config.font_size, &config.font_family)
            .unwrap_or_else(|| fallback_text_width(text, config.font_size))
    }
}

impl Measure<TextContent> for TextMeasurer {
    fn measure(&self, content: &TextContent) -> Dimensions {
        let config = &self.config;
        let lines = content.lines();
        let text_width = lines
            .iter()
            .map(|line| self.text_width(line))
            .fold(0.0, f32::max);
        let text_height = lines.len() as f32 * config.font_size * config.line_height;
        Dimensions::new(
            text_width + config.padding_x * 2.0,
            text_height + config.padding_y * 2.0,
        )
    }
}

pub(crate) fn split_lines(text: &str) -> Vec<String> {
    let lines: Vec<String> = LINE_BREAK
        .split(text)
        .map(|line| line.trim().to_string())
        .collect();
    if lines.is_empty() {
        vec![String::new()]
    } else {
        lines
    }
}

fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' => 0.306,
        '.' | ',' | ':' | ';' | '|' | '!' | '\'' | '(' | ')' | '[' | ']' | '{' | '}' => 0.321,
        'i' | 'j' | 'l' | 'I' => 0.272,
        'm' | 'w' | 'M' | 'W' => 0.86,
        'A'..='Z' => 0.68,
        '0'..='9' => 0.56,
        'a'..='z' => 0.54,
        c if c as u32 >= 0x1100 => 1.0,
        _ => 0.6,
    }
}
