use anyhow::{anyhow, Result};
use image::Rgb;
use std::path::PathBuf;

pub const DEFAULT_FONT_SIZE: f32 = 130.0;
pub const DEFAULT_MARGIN: u32 = 15;
/// Extra pixels between stacked lines, on top of the font's own line height.
pub const DEFAULT_LINE_SPACING: f32 = 4.0;
pub const DEFAULT_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// How the timestamp and location block is drawn onto every image.
#[derive(Debug, Clone)]
pub struct AnnotationStyle {
    pub font_path: PathBuf,
    pub font_size: f32,
    pub margin: u32,
    pub line_spacing: f32,
    pub color: Rgb<u8>,
}

impl AnnotationStyle {
    pub fn with_font(font_path: impl Into<PathBuf>) -> Self {
        Self {
            font_path: font_path.into(),
            font_size: DEFAULT_FONT_SIZE,
            margin: DEFAULT_MARGIN,
            line_spacing: DEFAULT_LINE_SPACING,
            color: DEFAULT_TEXT_COLOR,
        }
    }
}

pub fn parse_hex_color(value: &str) -> Result<Rgb<u8>> {
    let digits = value.trim().trim_start_matches('#');
    if digits.len() != 6 {
        return Err(anyhow!("invalid color: {}", value));
    }
    let bytes = hex::decode(digits).map_err(|_| anyhow!("invalid color: {}", value))?;
    Ok(Rgb([bytes[0], bytes[1], bytes[2]]))
}
