pub mod annotator;
pub mod batch;
