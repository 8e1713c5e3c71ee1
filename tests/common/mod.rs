#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use tempfile::TempDir;
use time::macros::datetime;
use time::PrimitiveDateTime;
use tower::ServiceExt;

use stampbox::app::annotator::Annotator;
use stampbox::config::annotation::AnnotationStyle;
use stampbox::infra::clock::FixedClock;
use stampbox::infra::storage::LocalStorage;
use stampbox::AppState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const TEST_SEED: u64 = 7;
/// Requests in tests always "arrive" at 20:15 local time.
pub const TEST_NOW: PrimitiveDateTime = datetime!(2024-12-28 20:15:00);
pub const TEST_HOUR_BUCKET: &str = "20";
const BOUNDARY: &str = "----stampbox-test-boundary";

pub fn font_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fonts/DejaVuSans.ttf")
}

// ---------------------------------------------------------------------------
// TestApp — one isolated upload/output tree per test
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    root: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(serde_json::Value::Null)
    }
}

/// A multipart part: either a text field or a file.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, Vec<u8>),
}

pub fn app() -> TestApp {
    TestApp::with_style(AnnotationStyle::with_font(font_path()))
}

impl TestApp {
    pub fn with_style(style: AnnotationStyle) -> Self {
        let root = tempfile::tempdir().expect("failed to create temp dir");
        let storage = LocalStorage::new(root.path().join("uploads"), root.path().join("outputs"));
        storage.ensure_layout().expect("failed to create layout");

        let state = AppState {
            storage,
            annotator: Arc::new(Annotator::new(style)),
            clock: Arc::new(FixedClock(TEST_NOW)),
            default_location: "Default Location".to_string(),
            max_step_seconds: 60,
            random_seed: Some(TEST_SEED),
            upload_max_bytes: 32 * 1024 * 1024,
        };

        Self {
            router: stampbox::http::router(state.clone()),
            state,
            root,
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.root.path().join("uploads")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.path().join("outputs")
    }

    pub fn bucket_dir(&self) -> PathBuf {
        self.output_dir().join(TEST_HOUR_BUCKET)
    }

    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let content_type = header_string(response.headers(), header::CONTENT_TYPE);
        let content_disposition = header_string(response.headers(), header::CONTENT_DISPOSITION);

        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            content_type,
            content_disposition,
            body_bytes,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.request(request).await
    }

    pub async fn post_multipart(&self, path: &str, parts: Vec<Part<'_>>) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        self.request(request).await
    }
}

fn header_string(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub fn multipart_body(parts: Vec<Part<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

// ---------------------------------------------------------------------------
// Image fixtures
// ---------------------------------------------------------------------------

pub fn black_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
    encode(image::DynamicImage::ImageRgb8(image), ImageFormat::Png)
}

pub fn black_jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
    encode(image::DynamicImage::ImageRgb8(image), ImageFormat::Jpeg)
}

pub fn transparent_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    encode(image::DynamicImage::ImageRgba8(image), ImageFormat::Png)
}

fn encode(image: image::DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).expect("encode fixture");
    out.into_inner()
}

pub fn count_files(dir: &Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .count(),
        Err(_) => 0,
    }
}
