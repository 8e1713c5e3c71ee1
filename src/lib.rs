pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::app::annotator::Annotator;
use crate::app::batch::BatchService;
use crate::config::AppConfig;
use crate::infra::clock::{Clock, SystemClock};
use crate::infra::storage::LocalStorage;

#[derive(Clone)]
pub struct AppState {
    pub storage: LocalStorage,
    pub annotator: Arc<Annotator>,
    pub clock: Arc<dyn Clock>,
    pub default_location: String,
    pub max_step_seconds: u32,
    pub random_seed: Option<u64>,
    pub upload_max_bytes: usize,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            storage: LocalStorage::new(&config.upload_dir, &config.output_dir),
            annotator: Arc::new(Annotator::new(config.annotation.clone())),
            clock: Arc::new(SystemClock),
            default_location: config.default_location.clone(),
            max_step_seconds: config.max_step_seconds,
            random_seed: config.random_seed,
            upload_max_bytes: config.upload_max_bytes,
        }
    }

    pub fn batch_service(&self) -> BatchService {
        BatchService::new(
            self.storage.clone(),
            self.annotator.clone(),
            self.clock.clone(),
            self.default_location.clone(),
            self.max_step_seconds,
        )
    }

    /// Fresh RNG for one batch; seeded batches repeat the same steps.
    pub fn batch_rng(&self) -> StdRng {
        match self.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
