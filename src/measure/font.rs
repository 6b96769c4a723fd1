use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

static FONT_METRICS: Lazy<Mutex<FontMetrics>> = Lazy::new(|| Mutex::new(FontMetrics::new()));

/// Width of `text` in the first installed font of `font_family`, or `None`
/// when no matching font is available.
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = FONT_METRICS.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

struct FontMetrics {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<String, Option<FaceAdvances>>,
}

impl FontMetrics {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = normalize_family_key(font_family);
        if !self.cache.contains_key(&key) {
            let advances = self.load_advances(font_family);
            self.cache.insert(key.clone(), advances);
        }
        let advances = self.cache.get(&key)?.as_ref()?;
        Some(advances.width(text, font_size))
    }

    fn load_advances(&mut self, font_family: &str) -> Option<FaceAdvances> {
        let names: Vec<String> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|name| !name.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => Family::SansSerif,
                "monospace" | "ui-monospace" => Family::Monospace,
                "cursive" => Family::Cursive,
                "fantasy" => Family::Fantasy,
                _ => Family::Name(name.as_str()),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| {
                Face::parse(data, index).ok().map(|face| FaceAdvances::from_face(&face))
            })
            .flatten()
    }
}

/// Horizontal advances of the ASCII range; other characters use an average.
struct FaceAdvances {
    units_per_em: u16,
    ascii: [u16; 128],
}

impl FaceAdvances {
    fn from_face(face: &Face<'_>) -> Self {
        let mut ascii = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph_id) = face.glyph_index(byte as char) {
                ascii[byte as usize] = face.glyph_hor_advance(glyph_id).unwrap_or(0);
            }
        }
        Self {
            units_per_em: face.units_per_em().max(1),
            ascii,
        }
    }

    fn width(&self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * 0.56;
        text.chars()
            .filter(|ch| *ch != '\n')
            .map(|ch| match self.ascii.get(ch as usize) {
                Some(advance) if *advance > 0 => *advance as f32 * scale,
                _ => fallback,
            })
            .sum::<f32>()
            .max(0.0)
    }
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}
