//! Process-wide model hub
//!
//! One `ModelHub` is constructed at startup and passed by reference into the
//! mode handlers. Each model is loaded at most once per process; the first
//! caller pays the download/initialization cost and later callers get the
//! memoized handle.

use crate::config::Config;
use crate::error::{DetectorError, Result};
use crate::inference::classifier::ClassifierEngine;
use crate::inference::generator::GeneratorEngine;
use crate::models::manager::ModelManager;
use std::path::PathBuf;
use tokio::sync::{Mutex, OnceCell};

pub struct ModelHub {
    config: Config,
    classifier: OnceCell<ClassifierEngine>,
    // The generator mutates sampling and KV-cache state per call.
    generator: OnceCell<Mutex<GeneratorEngine>>,
}

impl ModelHub {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            classifier: OnceCell::new(),
            generator: OnceCell::new(),
        }
    }

    /// Idempotent classifier access; loads (and downloads if needed) on first call.
    pub async fn classifier(&self) -> Result<&ClassifierEngine> {
        self.classifier
            .get_or_try_init(|| async {
                let model_path = self
                    .ensure_downloaded(&self.config.models.classifier_model)
                    .await?;
                ClassifierEngine::load(
                    &model_path,
                    self.config.classifier.max_input_tokens,
                    self.config.classifier.head_seed,
                )
            })
            .await
    }

    /// Idempotent generator access; independent cache cell from the classifier.
    pub async fn generator(&self) -> Result<&Mutex<GeneratorEngine>> {
        self.generator
            .get_or_try_init(|| async {
                let model_path = self
                    .ensure_downloaded(&self.config.models.generator_model)
                    .await?;
                let engine =
                    GeneratorEngine::load(&model_path, self.config.generation.clone())?;
                Ok::<_, DetectorError>(Mutex::new(engine))
            })
            .await
    }

    async fn ensure_downloaded(&self, model_name: &str) -> Result<PathBuf> {
        let mut manager =
            ModelManager::new(self.config.get_models_dir(), &self.config).await?;
        if let Some(path) = manager.get_model_path(model_name) {
            return Ok(path);
        }
        println!("📥 Model '{}' not found locally, downloading...", model_name);
        manager.download_model(model_name).await
    }
}
