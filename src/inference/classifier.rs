//! BERT-based news classification engine using Candle
//!
//! The encoder is a stock pretrained BERT; the two-class head on top of it is
//! NOT fine-tuned for fake-news detection. It is initialized from a seeded
//! random draw, so verdicts are deterministic for a fixed config but carry no
//! semantic guarantee.

use crate::error::{DetectorError, Result};
use crate::inference::device::select_device;
use crate::inference::{Classify, Label, Verdict};
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use std::path::Path;
use tokenizers::{Tokenizer, TruncationParams};

const NUM_CLASSES: usize = 2;

/// Classification engine: BERT encoder + linear head over the [CLS] state.
pub struct ClassifierEngine {
    model: BertModel,
    head: Linear,
    tokenizer: Tokenizer,
    device: Device,
}

impl ClassifierEngine {
    /// Load the classifier from a downloaded model directory.
    pub fn load(model_path: &Path, max_input_tokens: usize, head_seed: u64) -> Result<Self> {
        println!("🔄 Loading classifier model from: {}", model_path.display());

        let device = select_device()?;

        let tokenizer_path = model_path.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            DetectorError::ModelLoading(format!("Failed to load tokenizer: {}", e))
        })?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_input_tokens,
                ..Default::default()
            }))
            .map_err(|e| {
                DetectorError::ModelLoading(format!("Failed to configure truncation: {}", e))
            })?;

        let config_path = model_path.join("config.json");
        let config_content = std::fs::read_to_string(&config_path).map_err(|e| {
            DetectorError::ModelLoading(format!("Failed to read model config: {}", e))
        })?;

        let raw_config: serde_json::Value = serde_json::from_str(&config_content)?;
        let hidden_size = raw_config["hidden_size"].as_u64().unwrap_or(768) as usize;

        let bert_config: BertConfig = serde_json::from_str(&config_content).map_err(|e| {
            DetectorError::ModelLoading(format!("Failed to parse BERT config: {}", e))
        })?;

        let weights_path = model_path.join("model.safetensors");
        if !weights_path.exists() {
            return Err(DetectorError::ModelLoading(format!(
                "Model weights file not found: {}",
                weights_path.display()
            )));
        }

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device).map_err(|e| {
                DetectorError::ModelLoading(format!("Failed to load safetensors: {}", e))
            })?
        };

        let model = BertModel::load(vb, &bert_config).map_err(|e| {
            DetectorError::ModelLoading(format!("Failed to load BERT model: {}", e))
        })?;

        let head = Self::init_head(hidden_size, head_seed, &device)?;

        println!("✅ Classifier model loaded successfully!");

        Ok(Self {
            model,
            head,
            tokenizer,
            device,
        })
    }

    /// Build the two-class head. The checkpoint carries no fine-tuned head, so
    /// weights come from a seeded normal draw (matching the upstream behavior
    /// of attaching an untrained classification head to a generic encoder).
    fn init_head(hidden_size: usize, seed: u64, device: &Device) -> Result<Linear> {
        device.set_seed(seed)?;
        let weight = Tensor::randn(0f32, 0.02f32, (NUM_CLASSES, hidden_size), device)?;
        let bias = Tensor::zeros((NUM_CLASSES,), DType::F32, device)?;
        Ok(Linear::new(weight, Some(bias)))
    }
}

impl Classify for ClassifierEngine {
    /// Tokenize, run the encoder, and softmax the head logits over the two
    /// classes. Deterministic for a fixed loaded model; empty input is
    /// accepted but yields an arbitrary verdict (callers guard upstream).
    fn classify(&self, text: &str) -> Result<Verdict> {
        let encoding = self.tokenizer.encode(text, true).map_err(|e| {
            DetectorError::Inference(format!("Failed to tokenize input: {}", e))
        })?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;

        let sequence_output = self
            .model
            .forward(&input_ids, &token_type_ids, None)
            .map_err(|e| DetectorError::Inference(format!("BERT forward pass failed: {}", e)))?;

        // [CLS] hidden state -> [1, hidden_size]
        let cls_state = sequence_output.i((.., 0))?;
        let logits = self.head.forward(&cls_state)?;
        let probs = candle_nn::ops::softmax_last_dim(&logits)?
            .squeeze(0)?
            .to_vec1::<f32>()?;

        let (pred, confidence) = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, p)| (i, *p))
            .ok_or_else(|| DetectorError::Inference("Empty class distribution".to_string()))?;

        Ok(Verdict {
            label: Label::from_class_index(pred),
            confidence,
        })
    }
}
