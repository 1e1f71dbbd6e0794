//! Model management for downloading and managing Hugging Face models

use crate::config::{AvailableModel, Config};
use crate::error::{DetectorError, Result};
use hf_hub::api::tokio::Api;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Manager for pretrained models - handles download, caching, and lookup
pub struct ModelManager {
    models_dir: PathBuf,
    available_models: HashMap<String, AvailableModel>,
    downloaded_models: HashSet<String>,
    api: Api,
}

impl ModelManager {
    /// Create a new model manager backed by the config's model registry
    pub async fn new(models_dir: PathBuf, config: &Config) -> Result<Self> {
        if !models_dir.exists() {
            fs::create_dir_all(&models_dir).await.map_err(|e| {
                DetectorError::ModelError(format!("Failed to create models directory: {}", e))
            })?;
        }

        let api = Api::new().map_err(|e| {
            DetectorError::ModelError(format!("Failed to initialize HF API: {}", e))
        })?;

        let available_models = config
            .models
            .available_models
            .iter()
            .map(|m| (m.name.clone(), m.clone()))
            .collect();

        let mut manager = Self {
            models_dir,
            available_models,
            downloaded_models: HashSet::new(),
            api,
        };

        manager.scan_downloaded_models().await?;

        Ok(manager)
    }

    /// Scan for already downloaded models
    async fn scan_downloaded_models(&mut self) -> Result<()> {
        let mut entries = fs::read_dir(&self.models_dir).await.map_err(|e| {
            DetectorError::ModelError(format!("Failed to scan models directory: {}", e))
        })?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            DetectorError::ModelError(format!("Failed to read directory entry: {}", e))
        })? {
            if entry
                .file_type()
                .await
                .map_err(|e| DetectorError::ModelError(format!("Failed to get file type: {}", e)))?
                .is_dir()
            {
                let model_name = entry.file_name().to_string_lossy().to_string();

                if self.is_valid_model_directory(&entry.path()).await? {
                    self.downloaded_models.insert(model_name);
                }
            }
        }

        Ok(())
    }

    /// Check if a directory contains a valid model
    async fn is_valid_model_directory(&self, path: &Path) -> Result<bool> {
        let required_files = ["config.json", "tokenizer.json"];

        for file in &required_files {
            let file_path = path.join(file);
            if fs::metadata(&file_path).await.is_err() {
                return Ok(false);
            }
        }

        // Check for at least one model weight file
        let weight_extensions = ["safetensors", "bin"];
        let mut has_weights = false;

        let mut entries = fs::read_dir(path).await.map_err(|e| {
            DetectorError::ModelError(format!("Failed to read model directory: {}", e))
        })?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            DetectorError::ModelError(format!("Failed to read directory entry: {}", e))
        })? {
            let file_name = entry.file_name().to_string_lossy().to_string();
            for ext in &weight_extensions {
                if file_name.ends_with(ext) {
                    has_weights = true;
                    break;
                }
            }
            if has_weights {
                break;
            }
        }

        Ok(has_weights)
    }

    /// Download a model from Hugging Face Hub
    pub async fn download_model(&mut self, model_name: &str) -> Result<PathBuf> {
        let model_info = self
            .available_models
            .get(model_name)
            .cloned()
            .ok_or_else(|| DetectorError::ModelNotFound(model_name.to_string()))?;

        let model_dir = self.models_dir.join(model_name);

        if self.downloaded_models.contains(model_name) {
            return Ok(model_dir);
        }

        println!("📥 Downloading model: {} ({} MB)", model_info.name, model_info.size_mb);
        println!("📍 Repository: {}", model_info.repo_id);

        fs::create_dir_all(&model_dir).await.map_err(|e| {
            DetectorError::ModelError(format!("Failed to create model directory: {}", e))
        })?;

        let repo = self.api.repo(hf_hub::Repo::model(model_info.repo_id.clone()));

        // Download essential files; not every repo carries all of them
        let essential_files = [
            "config.json",
            "tokenizer.json",
            "tokenizer_config.json",
            "generation_config.json",
        ];

        for file in &essential_files {
            if let Ok(file_path) = repo.get(file).await {
                let dest_path = model_dir.join(file);
                fs::copy(&file_path, &dest_path).await.map_err(|e| {
                    DetectorError::ModelError(format!("Failed to copy {}: {}", file, e))
                })?;
                println!("  ✅ Downloaded: {}", file);
            }
        }

        let mut weights_downloaded = false;

        // Try sharded safetensors first (model-xxxxx-of-xxxxx.safetensors)
        match repo.get("model.safetensors.index.json").await {
            Ok(index_path) => {
                let dest_index = model_dir.join("model.safetensors.index.json");
                fs::copy(&index_path, &dest_index).await.map_err(|e| {
                    DetectorError::ModelError(format!("Failed to copy safetensors index: {}", e))
                })?;
                println!("  ✅ Downloaded: model.safetensors.index.json");

                let index_content = fs::read_to_string(&dest_index).await.map_err(|e| {
                    DetectorError::ModelError(format!("Failed to read safetensors index: {}", e))
                })?;

                let index_json: serde_json::Value =
                    serde_json::from_str(&index_content).map_err(|e| {
                        DetectorError::ModelError(format!(
                            "Failed to parse safetensors index: {}",
                            e
                        ))
                    })?;

                if let Some(weight_map) = index_json.get("weight_map").and_then(|v| v.as_object()) {
                    let mut shard_files: HashSet<String> = HashSet::new();
                    for filename in weight_map.values() {
                        if let Some(filename_str) = filename.as_str() {
                            shard_files.insert(filename_str.to_string());
                        }
                    }

                    for shard_file in shard_files {
                        match repo.get(&shard_file).await {
                            Ok(shard_path) => {
                                let dest_shard = model_dir.join(&shard_file);
                                fs::copy(&shard_path, &dest_shard).await.map_err(|e| {
                                    DetectorError::ModelError(format!(
                                        "Failed to copy shard {}: {}",
                                        shard_file, e
                                    ))
                                })?;
                                println!("  ✅ Downloaded: {}", shard_file);
                            }
                            Err(e) => {
                                return Err(DetectorError::ModelError(format!(
                                    "Failed to download shard {}: {}",
                                    shard_file, e
                                )));
                            }
                        }
                    }
                    weights_downloaded = true;
                }
            }
            Err(_) => {
                if let Ok(weights_path) = repo.get("model.safetensors").await {
                    let dest_path = model_dir.join("model.safetensors");
                    fs::copy(&weights_path, &dest_path).await.map_err(|e| {
                        DetectorError::ModelError(format!("Failed to copy model weights: {}", e))
                    })?;
                    println!("  ✅ Downloaded: model.safetensors");
                    weights_downloaded = true;
                }
            }
        }

        if !weights_downloaded {
            match repo.get("pytorch_model.bin").await {
                Ok(weights_path) => {
                    let dest_path = model_dir.join("pytorch_model.bin");
                    fs::copy(&weights_path, &dest_path).await.map_err(|e| {
                        DetectorError::ModelError(format!("Failed to copy model weights: {}", e))
                    })?;
                    println!("  ✅ Downloaded: pytorch_model.bin");
                }
                Err(e) => {
                    return Err(DetectorError::ModelError(format!(
                        "Failed to download model weights: {}",
                        e
                    )));
                }
            }
        }

        self.downloaded_models.insert(model_name.to_string());

        println!("✅ Model {} downloaded successfully!", model_info.name);
        Ok(model_dir)
    }

    /// Get path to a downloaded model
    pub fn get_model_path(&self, model_name: &str) -> Option<PathBuf> {
        if self.downloaded_models.contains(model_name) {
            Some(self.models_dir.join(model_name))
        } else {
            None
        }
    }

    /// List all available models
    pub fn list_available_models(&self) -> Vec<&AvailableModel> {
        self.available_models.values().collect()
    }

    /// List downloaded models
    pub fn list_downloaded_models(&self) -> Vec<String> {
        self.downloaded_models.iter().cloned().collect()
    }

    /// Get model info by name
    pub fn get_model_info(&self, model_name: &str) -> Option<&AvailableModel> {
        self.available_models.get(model_name)
    }

    /// Check if a model is downloaded
    pub fn is_model_downloaded(&self, model_name: &str) -> bool {
        self.downloaded_models.contains(model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_model_manager_creation() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::default();
        let manager = ModelManager::new(temp_dir.path().to_path_buf(), &config).await;
        assert!(manager.is_ok());

        let manager = manager.unwrap();
        assert!(!manager.list_available_models().is_empty());
        assert!(manager.list_downloaded_models().is_empty());
    }

    #[tokio::test]
    async fn test_registry_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::default();
        let manager = ModelManager::new(temp_dir.path().to_path_buf(), &config)
            .await
            .unwrap();

        assert!(manager.get_model_info("bert-base-uncased").is_some());
        assert!(manager.get_model_info("tinyllama").is_some());
        assert!(manager.get_model_info("gpt-17").is_none());
        assert!(!manager.is_model_downloaded("bert-base-uncased"));
    }

    #[tokio::test]
    async fn test_incomplete_model_directory_not_detected() {
        let temp_dir = TempDir::new().unwrap();
        // A directory with only a config.json is not a usable model
        let partial = temp_dir.path().join("bert-base-uncased");
        std::fs::create_dir_all(&partial).unwrap();
        std::fs::write(partial.join("config.json"), "{}").unwrap();

        let config = Config::default();
        let manager = ModelManager::new(temp_dir.path().to_path_buf(), &config)
            .await
            .unwrap();
        assert!(!manager.is_model_downloaded("bert-base-uncased"));
    }
}
