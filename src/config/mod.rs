pub mod annotation;

use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::annotation::{
    parse_hex_color, AnnotationStyle, DEFAULT_FONT_SIZE, DEFAULT_LINE_SPACING, DEFAULT_MARGIN,
};

pub const DEFAULT_LOCATION: &str = "Default Location";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub annotation: AnnotationStyle,
    pub default_location: String,
    pub max_step_seconds: u32,
    pub random_seed: Option<u64>,
    pub upload_max_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let font_size: f32 = env_or_parse("FONT_SIZE", &DEFAULT_FONT_SIZE.to_string())?;
        if !font_size.is_finite() || font_size <= 0.0 {
            return Err(anyhow!("invalid FONT_SIZE: must be positive"));
        }

        let annotation = AnnotationStyle {
            font_path: PathBuf::from(env_or("FONT_PATH", "fonts/DejaVuSans.ttf")),
            font_size,
            margin: env_or_parse("TEXT_MARGIN", &DEFAULT_MARGIN.to_string())?,
            line_spacing: DEFAULT_LINE_SPACING,
            color: parse_hex_color(&env_or("TEXT_COLOR", "#FFFFFF"))
                .map_err(|err| anyhow!("invalid TEXT_COLOR: {}", err))?,
        };

        Ok(Self {
            http_addr,
            upload_dir: PathBuf::from(env_or("UPLOAD_DIR", "uploads")),
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "outputs")),
            annotation,
            default_location: env_or("DEFAULT_LOCATION", DEFAULT_LOCATION),
            max_step_seconds: env_or_parse("MAX_STEP_SECONDS", "60")?,
            random_seed: env_opt_parse("RANDOM_SEED")?,
            upload_max_bytes: env_or_parse("UPLOAD_MAX_BYTES", "104857600")?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn env_opt_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|err| anyhow!("invalid {}: {}", key, err)),
        Err(_) => Ok(None),
    }
}
