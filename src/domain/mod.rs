pub mod batch;
pub mod timestamp;
