use std::io;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageBuffer, ImageError, ImageReader, Pixel, Rgb};
use rusttype::{point, Font, Scale};
use thiserror::Error;

use crate::config::annotation::AnnotationStyle;
use crate::domain::timestamp::Timestamp;
use crate::infra::storage::output_name_for;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("failed to read image '{path}': {source}")]
    ReadImage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode image '{path}': {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error("failed to load font '{path}': {reason}")]
    FontLoad { path: PathBuf, reason: String },

    #[error("failed to write annotated image '{path}': {source}")]
    WriteImage {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
}

/// Pixel extent of the rendered caption.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBlock {
    pub width: u32,
    pub height: u32,
    pub line_height: f32,
    pub ascent: f32,
}

/// Two-line caption burned into each image.
pub fn caption(timestamp: Timestamp, location: &str) -> String {
    format!("{}\n{}", timestamp, location)
}

/// Stamps a timestamp and location into the top-right corner of an image.
#[derive(Debug, Clone)]
pub struct Annotator {
    style: AnnotationStyle,
}

impl Annotator {
    pub fn new(style: AnnotationStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &AnnotationStyle {
        &self.style
    }

    pub fn load_font(&self) -> Result<Font<'static>, AnnotateError> {
        let path = &self.style.font_path;
        let data = std::fs::read(path).map_err(|err| AnnotateError::FontLoad {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        Font::try_from_vec(data).ok_or_else(|| AnnotateError::FontLoad {
            path: path.clone(),
            reason: "not a TrueType/OpenType font".to_string(),
        })
    }

    fn scale(&self) -> Scale {
        Scale::uniform(self.style.font_size)
    }

    pub fn measure(&self, font: &Font<'static>, text: &str) -> TextBlock {
        let scale = self.scale();
        let v_metrics = font.v_metrics(scale);
        let line_height =
            v_metrics.ascent - v_metrics.descent + v_metrics.line_gap + self.style.line_spacing;

        let lines: Vec<&str> = text.split('\n').collect();
        let width = lines
            .iter()
            .map(|line| line_width(font, scale, line))
            .fold(0.0_f32, f32::max);
        let height = line_height * lines.len() as f32 - self.style.line_spacing;

        TextBlock {
            width: width.ceil() as u32,
            height: height.max(0.0).ceil() as u32,
            line_height,
            ascent: v_metrics.ascent,
        }
    }

    /// Top-left corner of the block: `margin` px in from the top and right
    /// edges. May be negative when the caption is wider than the image.
    pub fn anchor(&self, image_width: u32, block: &TextBlock) -> (i32, i32) {
        let margin = self.style.margin as i64;
        let x = image_width as i64 - block.width as i64 - margin;
        (x as i32, margin as i32)
    }

    /// Decodes `image_path`, draws the caption and writes
    /// `processed_<basename>` into `output_dir` in the source format.
    /// Returns the output file name.
    pub fn annotate(
        &self,
        image_path: &Path,
        output_dir: &Path,
        timestamp: Timestamp,
        location: &str,
    ) -> Result<String, AnnotateError> {
        let reader = ImageReader::open(image_path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|source| AnnotateError::ReadImage {
                path: image_path.to_path_buf(),
                source,
            })?;
        let format = reader.format();
        let image = reader
            .decode()
            .map_err(|source| AnnotateError::ImageDecode {
                path: image_path.to_path_buf(),
                source,
            })?;

        let font = self.load_font()?;
        let text = caption(timestamp, location);
        let block = self.measure(&font, &text);
        let origin = self.anchor(image.width(), &block);

        let annotated = if image.color().has_alpha() {
            let mut canvas = image.to_rgba8();
            self.paint(&mut canvas, &font, &text, &block, origin);
            DynamicImage::ImageRgba8(canvas)
        } else {
            let mut canvas = image.to_rgb8();
            self.paint(&mut canvas, &font, &text, &block, origin);
            DynamicImage::ImageRgb8(canvas)
        };

        let base_name = image_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output_name = output_name_for(&base_name);
        let output_path = output_dir.join(&output_name);

        let saved = match format {
            Some(format) => annotated.save_with_format(&output_path, format),
            None => annotated.save(&output_path),
        };
        saved.map_err(|source| AnnotateError::WriteImage {
            path: output_path.clone(),
            source,
        })?;

        Ok(output_name)
    }

    fn paint<P>(
        &self,
        canvas: &mut ImageBuffer<P, Vec<u8>>,
        font: &Font<'static>,
        text: &str,
        block: &TextBlock,
        origin: (i32, i32),
    ) where
        P: Pixel<Subpixel = u8>,
    {
        let scale = self.scale();
        let color = self.style.color;
        let (width, height) = canvas.dimensions();

        for (index, line) in text.split('\n').enumerate() {
            let baseline = origin.1 as f32 + block.line_height * index as f32 + block.ascent;
            for glyph in font.layout(line, scale, point(origin.0 as f32, baseline)) {
                let Some(bb) = glyph.pixel_bounding_box() else {
                    continue;
                };
                glyph.draw(|gx, gy, coverage| {
                    let px = bb.min.x + gx as i32;
                    let py = bb.min.y + gy as i32;
                    if px < 0 || py < 0 || px as u32 >= width || py as u32 >= height {
                        return;
                    }
                    blend(canvas.get_pixel_mut(px as u32, py as u32), color, coverage);
                });
            }
        }
    }
}

fn line_width(font: &Font<'static>, scale: Scale, line: &str) -> f32 {
    font.layout(line, scale, point(0.0, 0.0))
        .last()
        .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0)
}

// Channels 0..3 are colour; a fourth channel, when present, is alpha.
fn blend<P: Pixel<Subpixel = u8>>(pixel: &mut P, color: Rgb<u8>, coverage: f32) {
    let coverage = coverage.clamp(0.0, 1.0);
    if coverage == 0.0 {
        return;
    }
    let alpha = (coverage * 255.0).round() as u8;
    for (channel, value) in pixel.channels_mut().iter_mut().enumerate() {
        if channel < 3 {
            let src = color.0[channel] as f32;
            let dst = *value as f32;
            *value = (src * coverage + dst * (1.0 - coverage)).round() as u8;
        } else {
            *value = (*value).max(alpha);
        }
    }
}
