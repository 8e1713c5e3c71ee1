use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::app::batch::BatchError;
use crate::domain::batch::{UploadBatch, UploadedImage};
use crate::domain::timestamp::TIMESTAMP_EXAMPLE;
use crate::http::AppError;
use crate::AppState;

const INDEX_PAGE: &str = include_str!("../../templates/index.html");

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let font = state.annotator.style().font_path.is_file();
    let dirs = state.storage.upload_dir().is_dir() && state.storage.output_dir().is_dir();
    let status = if font && dirs { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

pub async fn process_batch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<String, AppError> {
    let mut batch = UploadBatch::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            // Defaults apply only to absent fields; a blank value is kept.
            "timestamp" => {
                let value = field.text().await?;
                batch.timestamp.get_or_insert(value);
            }
            "location" => {
                let value = field.text().await?;
                batch.location.get_or_insert(value);
            }
            "images" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                batch.images.push(UploadedImage { file_name, bytes });
            }
            other => {
                tracing::debug!(field = %other, "ignoring unknown form field");
            }
        }
    }

    let service = state.batch_service();
    let mut rng = state.batch_rng();
    let report = tokio::task::spawn_blocking(move || service.process(batch, &mut rng))
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "batch task failed");
            AppError::internal("batch processing failed")
        })?
        .map_err(batch_error)?;

    Ok(report.summary())
}

fn batch_error(err: BatchError) -> AppError {
    if err.is_client_error() {
        tracing::debug!(error = %err, "rejected batch");
    }
    match err {
        BatchError::NoFiles => AppError::bad_request("No files uploaded. Please try again."),
        BatchError::InvalidTimestamp(_) => AppError::bad_request(format!(
            "Invalid timestamp format. Use: {}",
            TIMESTAMP_EXAMPLE
        )),
        BatchError::InvalidFileName(name) => {
            AppError::bad_request(format!("Invalid file name: {}", name))
        }
        BatchError::Storage(ref source) => {
            tracing::error!(error = ?source, "failed to store batch files");
            AppError::internal("Failed to store uploaded files")
        }
        BatchError::Annotate {
            ref file_name,
            ref source,
        } => {
            tracing::error!(error = ?source, file_name = %file_name, "failed to annotate image");
            AppError::internal(format!("Failed to process {}", file_name))
        }
    }
}

pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let storage = state.storage.clone();
    let lookup = filename.clone();
    let found = tokio::task::spawn_blocking(move || storage.find_output(&lookup))
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "download lookup task failed");
            AppError::internal("failed to look up file")
        })?
        .map_err(|err| {
            tracing::error!(error = ?err, filename = %filename, "failed to look up file");
            AppError::internal("failed to look up file")
        })?;

    let Some(path) = found else {
        return Err(AppError::not_found("File not found"));
    };

    let bytes = tokio::fs::read(&path).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            AppError::not_found("File not found")
        } else {
            tracing::error!(error = ?err, path = %path.display(), "failed to read output file");
            AppError::internal("failed to read file")
        }
    })?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        filename.replace('"', "_")
    )) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((headers, bytes).into_response())
}
