//! Configuration management for the fake news detector

use crate::error::{DetectorError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub models: ModelConfig,
    pub classifier: ClassifierConfig,
    pub generation: GenerationConfig,
    pub news: NewsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub models_dir: PathBuf,
    pub classifier_model: String,
    pub generator_model: String,
    pub available_models: Vec<AvailableModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableModel {
    pub name: String,
    pub repo_id: String,
    pub model_type: ModelType,
    pub size_mb: u64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelType {
    Classifier,
    Generator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Inputs are truncated to this many tokens before the forward pass.
    pub max_input_tokens: usize,
    /// Seed for the random init of the two-class head. The head is not
    /// fine-tuned, so predictions are arbitrary; the seed only makes them
    /// reproducible for a fixed config.
    pub head_seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Upper bound on total tokens, prompt included.
    pub max_length: usize,
    pub top_k: usize,
    pub top_p: f64,
    pub temperature: f64,
    pub repeat_penalty: f32,
    pub repeat_last_n: usize,
    /// None = seed from entropy, so repeated runs differ.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    pub endpoint: String,
    /// NewsAPI key; the NEWSAPI_KEY environment variable takes precedence.
    pub api_key: Option<String>,
    pub language: String,
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color_output: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutputFormat {
    Console,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        let models_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".fake-news-detector")
            .join("models");

        Self {
            models: ModelConfig {
                models_dir,
                classifier_model: "bert-base-uncased".to_string(),
                generator_model: "tinyllama".to_string(),
                available_models: vec![
                    AvailableModel {
                        name: "bert-base-uncased".to_string(),
                        repo_id: "google-bert/bert-base-uncased".to_string(),
                        model_type: ModelType::Classifier,
                        size_mb: 440,
                        description: "Generic BERT encoder; the detection head is not fine-tuned".to_string(),
                    },
                    AvailableModel {
                        name: "tinyllama".to_string(),
                        repo_id: "TinyLlama/TinyLlama-1.1B-Chat-v1.0".to_string(),
                        model_type: ModelType::Generator,
                        size_mb: 2200,
                        description: "Lightweight causal model for synthetic article generation".to_string(),
                    },
                    AvailableModel {
                        name: "phi-3-mini".to_string(),
                        repo_id: "microsoft/Phi-3-mini-4k-instruct".to_string(),
                        model_type: ModelType::Generator,
                        size_mb: 7600,
                        description: "Larger generator for higher-quality synthetic articles".to_string(),
                    },
                ],
            },
            classifier: ClassifierConfig {
                max_input_tokens: 512,
                head_seed: 42,
            },
            generation: GenerationConfig {
                max_length: 300,
                top_k: 50,
                top_p: 0.95,
                temperature: 1.0,
                repeat_penalty: 1.1,
                repeat_last_n: 64,
                seed: None,
            },
            news: NewsConfig {
                endpoint: "https://newsapi.org/v2/top-headlines".to_string(),
                api_key: None,
                language: "en".to_string(),
                page_size: 6,
            },
            output: OutputConfig {
                format: OutputFormat::Console,
                color_output: true,
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| DetectorError::Configuration(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| DetectorError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("fake-news-detector")
            .join("config.toml")
    }

    pub fn models_dir(&self) -> &PathBuf {
        &self.models.models_dir
    }

    pub fn get_models_dir(&self) -> PathBuf {
        self.models.models_dir.clone()
    }

    pub fn get_model_by_name(&self, name: &str) -> Option<&AvailableModel> {
        self.models.available_models.iter().find(|m| m.name == name)
    }

    pub fn list_classifier_models(&self) -> Vec<&AvailableModel> {
        self.models
            .available_models
            .iter()
            .filter(|m| matches!(m.model_type, ModelType::Classifier))
            .collect()
    }

    pub fn list_generator_models(&self) -> Vec<&AvailableModel> {
        self.models
            .available_models
            .iter()
            .filter(|m| matches!(m.model_type, ModelType::Generator))
            .collect()
    }

    /// Resolve the NewsAPI key, preferring the environment over the config file.
    pub fn news_api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var("NEWSAPI_KEY") {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }
        self.news
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                DetectorError::Configuration(
                    "No NewsAPI key configured. Set NEWSAPI_KEY or add news.api_key to the config file".to_string(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.models.classifier_model, "bert-base-uncased");
        assert_eq!(config.models.generator_model, "tinyllama");
        assert_eq!(config.classifier.max_input_tokens, 512);
        assert_eq!(config.generation.max_length, 300);
        assert_eq!(config.generation.top_k, 50);
        assert_eq!(config.generation.top_p, 0.95);
        assert_eq!(config.news.page_size, 6);
        assert_eq!(config.news.language, "en");
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.generation.max_length, config.generation.max_length);
        assert_eq!(parsed.models.classifier_model, config.models.classifier_model);
    }

    #[test]
    fn test_model_lookup_by_name() {
        let config = Config::default();
        assert!(config.get_model_by_name("bert-base-uncased").is_some());
        assert!(config.get_model_by_name("tinyllama").is_some());
        assert!(config.get_model_by_name("no-such-model").is_none());
    }

    #[test]
    fn test_model_type_filters() {
        let config = Config::default();
        assert_eq!(config.list_classifier_models().len(), 1);
        assert_eq!(config.list_generator_models().len(), 2);
    }
}
