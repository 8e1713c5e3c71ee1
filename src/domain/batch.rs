use std::path::PathBuf;

use bytes::Bytes;
use crate::domain::timestamp::Timestamp;

/// One file part of a batch upload, as sent by the client.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    pub timestamp: Option<String>,
    pub location: Option<String>,
    pub images: Vec<UploadedImage>,
}

#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub source_name: String,
    pub output_name: String,
    pub stamped_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub output_dir: PathBuf,
    pub hour: u8,
    pub started_at: Timestamp,
    pub images: Vec<ProcessedImage>,
}

impl BatchReport {
    pub fn summary(&self) -> String {
        format!(
            "Processed {} images. Check the outputs folder.",
            self.images.len()
        )
    }
}
