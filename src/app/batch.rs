use std::sync::Arc;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

use crate::app::annotator::{AnnotateError, Annotator};
use crate::domain::batch::{BatchReport, ProcessedImage, UploadBatch};
use crate::domain::timestamp::{Timestamp, TimestampCursor};
use crate::infra::clock::Clock;
use crate::infra::storage::{is_safe_file_name, LocalStorage, StorageError};

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("no files uploaded")]
    NoFiles,

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("invalid file name '{0}'")]
    InvalidFileName(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to annotate '{file_name}': {source}")]
    Annotate {
        file_name: String,
        #[source]
        source: AnnotateError,
    },
}

impl BatchError {
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BatchError::NoFiles | BatchError::InvalidTimestamp(_) | BatchError::InvalidFileName(_)
        )
    }
}

/// Runs a whole upload batch: validation, raw saves, annotation and
/// timestamp sequencing. Stops at the first failing image; files written
/// before that point are left on disk.
#[derive(Clone)]
pub struct BatchService {
    storage: LocalStorage,
    annotator: Arc<Annotator>,
    clock: Arc<dyn Clock>,
    default_location: String,
    max_step_seconds: u32,
}

impl BatchService {
    pub fn new(
        storage: LocalStorage,
        annotator: Arc<Annotator>,
        clock: Arc<dyn Clock>,
        default_location: String,
        max_step_seconds: u32,
    ) -> Self {
        Self {
            storage,
            annotator,
            clock,
            default_location,
            max_step_seconds,
        }
    }

    pub fn process<R: Rng + ?Sized>(
        &self,
        batch: UploadBatch,
        rng: &mut R,
    ) -> Result<BatchReport, BatchError> {
        let now = Timestamp::new(self.clock.now());

        match batch.images.first() {
            Some(first) if !first.file_name.is_empty() => {}
            _ => return Err(BatchError::NoFiles),
        }

        let started_at = match batch.timestamp.as_deref() {
            Some(raw) => Timestamp::parse(raw)
                .map_err(|_| BatchError::InvalidTimestamp(raw.to_string()))?,
            None => now,
        };

        if let Some(bad) = batch
            .images
            .iter()
            .find(|image| !is_safe_file_name(&image.file_name))
        {
            return Err(BatchError::InvalidFileName(bad.file_name.clone()));
        }

        let location = batch
            .location
            .unwrap_or_else(|| self.default_location.clone());

        // One bucket per request, even if the batch runs past the hour.
        let hour = now.hour();
        let output_dir = self.storage.hour_bucket(hour)?;

        info!(
            images = batch.images.len(),
            hour,
            location = %location,
            started_at = %started_at,
            "processing batch"
        );

        let mut cursor = TimestampCursor::new(started_at, self.max_step_seconds);
        let mut processed = Vec::with_capacity(batch.images.len());

        for image in &batch.images {
            let raw_path = self.storage.save_upload(&image.file_name, &image.bytes)?;
            let stamped_at = cursor.current();

            let output_name = self
                .annotator
                .annotate(&raw_path, &output_dir, stamped_at, &location)
                .map_err(|source| BatchError::Annotate {
                    file_name: image.file_name.clone(),
                    source,
                })?;

            debug!(
                file_name = %image.file_name,
                output_name = %output_name,
                stamped_at = %stamped_at,
                "image annotated"
            );

            processed.push(ProcessedImage {
                source_name: image.file_name.clone(),
                output_name,
                stamped_at,
            });
            cursor.advance(rng);
        }

        info!(images = processed.len(), hour, "batch complete");

        Ok(BatchReport {
            output_dir,
            hour,
            started_at,
            images: processed,
        })
    }
}
