//! Causal-LM generation engine using Candle for synthetic news articles

use crate::config::GenerationConfig;
use crate::error::{DetectorError, Result};
use crate::inference::device::select_device;
use crate::inference::Generate;
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::{llama, phi3};
use candle_transformers::utils::apply_repeat_penalty;
use std::path::Path;
use tokenizers::Tokenizer;

/// Trait for the supported causal model backends
trait CausalModel: Send + Sync {
    fn forward(&mut self, input_ids: &Tensor, start_pos: usize) -> Result<Tensor>;
    fn reset_kv_cache(&mut self) -> Result<()>;
}

/// Phi-3 backend
struct PhiBackend {
    model: phi3::Model,
}

impl CausalModel for PhiBackend {
    fn forward(&mut self, input_ids: &Tensor, start_pos: usize) -> Result<Tensor> {
        self.model
            .forward(input_ids, start_pos)
            .map_err(|e| DetectorError::Inference(format!("Phi forward pass failed: {}", e)))
    }

    fn reset_kv_cache(&mut self) -> Result<()> {
        // The cache lives inside the model; stale entries would desync the
        // position offsets on the next prompt pass at position 0.
        self.model.clear_kv_cache();
        Ok(())
    }
}

/// Llama-family backend (TinyLlama and friends)
struct LlamaBackend {
    model: llama::Llama,
    cache: llama::Cache,
    config: llama::Config,
    device: Device,
}

impl CausalModel for LlamaBackend {
    fn forward(&mut self, input_ids: &Tensor, start_pos: usize) -> Result<Tensor> {
        self.model
            .forward(input_ids, start_pos, &mut self.cache)
            .map_err(|e| DetectorError::Inference(format!("Llama forward pass failed: {}", e)))
    }

    fn reset_kv_cache(&mut self) -> Result<()> {
        self.cache = llama::Cache::new(true, DType::F32, &self.config, &self.device)
            .map_err(|e| DetectorError::ModelError(format!("Failed to reset cache: {}", e)))?;
        Ok(())
    }
}

/// Generation engine wrapping a causal model with top-k/top-p sampling
pub struct GeneratorEngine {
    model: Box<dyn CausalModel>,
    tokenizer: Tokenizer,
    device: Device,
    options: GenerationConfig,
}

impl GeneratorEngine {
    /// Load a generator from a downloaded model directory, dispatching on the
    /// architecture declared in config.json.
    pub fn load(model_path: &Path, options: GenerationConfig) -> Result<Self> {
        println!("🔄 Loading generator model from: {}", model_path.display());

        let device = select_device()?;

        let tokenizer_path = model_path.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            DetectorError::ModelLoading(format!("Failed to load tokenizer: {}", e))
        })?;

        let config_path = model_path.join("config.json");
        let config_content = std::fs::read_to_string(&config_path).map_err(|e| {
            DetectorError::ModelLoading(format!("Failed to read model config: {}", e))
        })?;
        let model_config: serde_json::Value = serde_json::from_str(&config_content)?;

        let model_type = model_config["model_type"].as_str().unwrap_or("unknown");
        let architecture = model_config["architectures"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let model: Box<dyn CausalModel> = match (model_type, architecture) {
            ("phi3", _) | ("phi", _) | (_, "Phi3ForCausalLM") | (_, "PhiForCausalLM") => {
                println!("🔧 Loading Phi model (architecture: {})", architecture);
                Self::load_phi_model(model_path, &device, &model_config)?
            }
            ("llama", _) | (_, "LlamaForCausalLM") => {
                println!("🔧 Loading Llama model");
                Self::load_llama_model(model_path, &device, &model_config)?
            }
            _ => {
                return Err(DetectorError::ModelLoading(format!(
                    "Unsupported generator architecture: {}/{}",
                    model_type, architecture
                )));
            }
        };

        println!("✅ Generator model loaded successfully!");

        Ok(Self {
            model,
            tokenizer,
            device,
            options,
        })
    }

    fn load_phi_model(
        model_path: &Path,
        device: &Device,
        config: &serde_json::Value,
    ) -> Result<Box<dyn CausalModel>> {
        let tensors_map = load_safetensors_map(model_path, device, config)?;
        let vb = VarBuilder::from_tensors(tensors_map, DType::F32, device);

        let phi_config = serde_json::from_value::<phi3::Config>(config.clone()).map_err(|e| {
            DetectorError::ModelLoading(format!("Failed to parse Phi-3 config: {}", e))
        })?;

        let phi_model = phi3::Model::new(&phi_config, vb).map_err(|e| {
            DetectorError::ModelLoading(format!("Failed to load Phi-3 model: {}", e))
        })?;

        Ok(Box::new(PhiBackend { model: phi_model }))
    }

    fn load_llama_model(
        model_path: &Path,
        device: &Device,
        config: &serde_json::Value,
    ) -> Result<Box<dyn CausalModel>> {
        let vocab_size = config["vocab_size"].as_u64().unwrap_or(32000) as usize;
        let hidden_size = config["hidden_size"].as_u64().unwrap_or(2048) as usize;
        let num_layers = config["num_hidden_layers"].as_u64().unwrap_or(22) as usize;
        let num_heads = config["num_attention_heads"].as_u64().unwrap_or(32) as usize;
        let num_kv_heads = config["num_key_value_heads"].as_u64().unwrap_or(4) as usize;
        let intermediate_size = config["intermediate_size"].as_u64().unwrap_or(5632) as usize;
        let rope_theta = config["rope_theta"].as_f64().unwrap_or(10000.0);
        let max_position_embeddings =
            config["max_position_embeddings"].as_u64().unwrap_or(2048) as usize;
        let rms_norm_eps = config["rms_norm_eps"].as_f64().unwrap_or(1e-5);

        let tensors_map = load_safetensors_map(model_path, device, config)?;
        let vb = VarBuilder::from_tensors(tensors_map, DType::F32, device);

        let llama_config = llama::Config {
            hidden_size,
            intermediate_size,
            vocab_size,
            num_hidden_layers: num_layers,
            num_attention_heads: num_heads,
            num_key_value_heads: num_kv_heads,
            max_position_embeddings,
            rms_norm_eps,
            rope_theta: rope_theta as f32,
            rope_scaling: None,
            tie_word_embeddings: false,
            bos_token_id: Some(1),
            eos_token_id: Some(llama::LlamaEosToks::Single(2)),
            use_flash_attn: false,
        };

        let llama_model = llama::Llama::load(vb, &llama_config).map_err(|e| {
            DetectorError::ModelLoading(format!("Failed to load Llama model: {}", e))
        })?;

        let cache = llama::Cache::new(true, DType::F32, &llama_config, device).map_err(|e| {
            DetectorError::ModelLoading(format!("Failed to initialize Llama cache: {}", e))
        })?;

        Ok(Box::new(LlamaBackend {
            model: llama_model,
            cache,
            config: llama_config,
            device: device.clone(),
        }))
    }

    fn build_sampler(&self) -> LogitsProcessor {
        // Fresh entropy per call unless a seed is pinned: repeated prompts are
        // expected to yield different articles.
        let seed = self.options.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(299792458)
        });
        LogitsProcessor::from_sampling(
            seed,
            Sampling::TopKThenTopP {
                k: self.options.top_k,
                p: self.options.top_p,
                temperature: self.options.temperature,
            },
        )
    }
}

/// Check if token is end-of-sequence for the supported model families
fn is_eos_token(token: u32) -> bool {
    matches!(token, 2 | 32000 | 32001 | 32007 | 128001 | 128009 | 199999 | 200020)
}

/// Slice the logits of the last sequence position out of a forward-pass
/// output, whichever rank the backend produced.
fn last_position_logits(logits: &Tensor) -> Result<Tensor> {
    let last = if logits.dims().len() == 3 {
        let seq_len = logits.dims()[1];
        logits.i((0, seq_len - 1))?
    } else if logits.dims().len() == 2 {
        let seq_len = logits.dims()[0];
        logits.i(seq_len - 1)?
    } else {
        logits.clone()
    };
    Ok(last.to_dtype(DType::F32)?)
}

/// Drive sampling until the token budget is spent or the source yields an
/// end-of-sequence token. `max_length` bounds the total sequence, prompt
/// included; `next_token` receives the step index and every token emitted so
/// far, and EOS tokens are never pushed into the sequence.
fn sample_until_budget<F>(mut tokens: Vec<u32>, max_length: usize, mut next_token: F) -> Result<Vec<u32>>
where
    F: FnMut(usize, &[u32]) -> Result<u32>,
{
    let budget = max_length.saturating_sub(tokens.len());
    for step in 0..budget {
        let token = next_token(step, &tokens)?;
        if is_eos_token(token) {
            log::debug!("EOS token {} after {} generated tokens", token, step);
            break;
        }
        tokens.push(token);
    }
    Ok(tokens)
}

/// Load all weight tensors for a model directory, handling both sharded and
/// single-file safetensors layouts plus tied word embeddings.
fn load_safetensors_map(
    model_path: &Path,
    device: &Device,
    config: &serde_json::Value,
) -> Result<std::collections::HashMap<String, Tensor>> {
    let mut tensors_map = std::collections::HashMap::new();

    let index_path = model_path.join("model.safetensors.index.json");
    let shard_paths: Vec<std::path::PathBuf> = if index_path.exists() {
        println!("  📁 Loading sharded safetensors model...");
        let index_content = std::fs::read_to_string(&index_path).map_err(|e| {
            DetectorError::ModelLoading(format!("Failed to read safetensors index: {}", e))
        })?;
        let index_json: serde_json::Value = serde_json::from_str(&index_content).map_err(|e| {
            DetectorError::ModelLoading(format!("Failed to parse safetensors index: {}", e))
        })?;

        let weight_map = index_json
            .get("weight_map")
            .and_then(|v| v.as_object())
            .ok_or_else(|| {
                DetectorError::ModelLoading(
                    "Invalid safetensors index format: missing weight_map".to_string(),
                )
            })?;

        let mut shard_files = std::collections::HashSet::new();
        for filename in weight_map.values() {
            if let Some(filename_str) = filename.as_str() {
                shard_files.insert(filename_str.to_string());
            }
        }
        shard_files
            .into_iter()
            .map(|f| model_path.join(f))
            .collect()
    } else {
        let weights_path = model_path.join("model.safetensors");
        if !weights_path.exists() {
            return Err(DetectorError::ModelLoading(
                "Model weights file not found (neither sharded nor single safetensors)".to_string(),
            ));
        }
        println!("  📦 Loading single safetensors model...");
        vec![weights_path]
    };

    for shard_path in shard_paths {
        if !shard_path.exists() {
            return Err(DetectorError::ModelLoading(format!(
                "Shard file not found: {}",
                shard_path.display()
            )));
        }
        let shard_tensors = unsafe {
            candle_core::safetensors::MmapedSafetensors::new(&shard_path).map_err(|e| {
                DetectorError::ModelLoading(format!(
                    "Failed to load {}: {}",
                    shard_path.display(),
                    e
                ))
            })?
        };

        for (tensor_name, _) in shard_tensors.tensors() {
            let tensor_view = shard_tensors.get(&tensor_name).map_err(|e| {
                DetectorError::ModelLoading(format!(
                    "Failed to get tensor {}: {}",
                    tensor_name, e
                ))
            })?;

            let tensor = Tensor::from_raw_buffer(
                tensor_view.data(),
                tensor_view.dtype().try_into().map_err(|e| {
                    DetectorError::ModelLoading(format!(
                        "Failed to convert dtype for tensor {}: {:?}",
                        tensor_name, e
                    ))
                })?,
                tensor_view.shape(),
                device,
            )
            .map_err(|e| {
                DetectorError::ModelLoading(format!(
                    "Failed to create tensor {} from raw buffer: {}",
                    tensor_name, e
                ))
            })?;

            tensors_map.insert(tensor_name, tensor);
        }
    }

    println!("  ✅ Loaded {} tensors", tensors_map.len());

    let tie_embeddings = config["tie_word_embeddings"].as_bool().unwrap_or(false);
    if tie_embeddings && !tensors_map.contains_key("lm_head.weight") {
        match tensors_map.get("model.embed_tokens.weight") {
            Some(embed_weights) => {
                tensors_map.insert("lm_head.weight".to_string(), embed_weights.clone());
            }
            None => {
                return Err(DetectorError::ModelLoading(
                    "Cannot tie embeddings: model.embed_tokens.weight not found".to_string(),
                ));
            }
        }
    }

    Ok(tensors_map)
}

impl Generate for GeneratorEngine {
    fn generate(&mut self, prompt: &str, max_length: usize) -> Result<String> {
        self.model.reset_kv_cache()?;
        let mut sampler = self.build_sampler();

        let encoding = self.tokenizer.encode(prompt, true).map_err(|e| {
            DetectorError::Inference(format!("Failed to tokenize prompt: {}", e))
        })?;
        let prompt_tokens = encoding.get_ids().to_vec();
        let input_length = prompt_tokens.len();

        if input_length >= max_length {
            // Nothing left in the budget; return the prompt as-is.
            return Ok(prompt.to_string());
        }

        // Process the entire prompt in one pass, then generate incrementally:
        // each later step feeds only the previously sampled token back in.
        let input_tensor = Tensor::new(&prompt_tokens[..], &self.device)?.unsqueeze(0)?;
        let mut logits = self.model.forward(&input_tensor, 0)?;

        let options = self.options.clone();
        let device = self.device.clone();
        let model = &mut self.model;
        let tokens = sample_until_budget(prompt_tokens, max_length, |step, tokens| {
            if step > 0 {
                let last = tokens[tokens.len() - 1];
                let input = Tensor::new(&[last], &device)?.unsqueeze(0)?;
                logits = model.forward(&input, input_length + step - 1)?;
            }

            let final_logits = last_position_logits(&logits)?;
            let final_logits = if options.repeat_penalty == 1.0 {
                final_logits
            } else {
                let start = tokens.len().saturating_sub(options.repeat_last_n);
                apply_repeat_penalty(&final_logits, options.repeat_penalty, &tokens[start..])?
            };

            Ok(sampler.sample(&final_logits)?)
        })?;

        // Decode prompt + continuation together, stripping special tokens.
        let text = self
            .tokenizer
            .decode(&tokens, true)
            .map_err(|e| DetectorError::Inference(format!("Failed to decode tokens: {}", e)))?;

        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_budget_bounds_total_tokens_including_prompt() {
        let prompt = vec![10, 11, 12, 13, 14];
        let mut samples = 0;
        let tokens = sample_until_budget(prompt, 8, |_, _| {
            samples += 1;
            Ok(100)
        })
        .unwrap();

        assert_eq!(tokens.len(), 8);
        assert_eq!(samples, 3);
    }

    #[test]
    fn test_eos_stops_generation_and_is_not_emitted() {
        let tokens = sample_until_budget(vec![10], 300, |step, _| {
            Ok(if step == 2 { 2 } else { 50 + step as u32 })
        })
        .unwrap();

        assert_eq!(tokens, vec![10, 50, 51]);
        assert!(!tokens.iter().any(|&t| is_eos_token(t)));
    }

    #[test]
    fn test_spent_budget_samples_nothing() {
        let prompt: Vec<u32> = (0..300).collect();
        let tokens = sample_until_budget(prompt.clone(), 300, |_, _| {
            panic!("budget is spent, sampling must not run");
        })
        .unwrap();

        assert_eq!(tokens, prompt);
    }

    #[test]
    fn test_next_token_sees_emitted_sequence() {
        let tokens = sample_until_budget(vec![1, 2], 5, |step, seen| {
            assert_eq!(seen.len(), 2 + step);
            Ok(90 + step as u32)
        })
        .unwrap();

        assert_eq!(tokens, vec![1, 2, 90, 91, 92]);
    }

    /// Backend that records calls and always favors one vocabulary entry.
    struct CountingBackend {
        resets: Arc<AtomicUsize>,
        forwards: Arc<AtomicUsize>,
        favored: u32,
        vocab_size: usize,
    }

    impl CausalModel for CountingBackend {
        fn forward(&mut self, _input_ids: &Tensor, _start_pos: usize) -> Result<Tensor> {
            self.forwards.fetch_add(1, Ordering::SeqCst);
            let mut logits = vec![0f32; self.vocab_size];
            logits[self.favored as usize] = 100.0;
            Ok(Tensor::new(&logits[..], &Device::Cpu)?.unsqueeze(0)?)
        }

        fn reset_kv_cache(&mut self) -> Result<()> {
            self.resets.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn word_level_tokenizer() -> Tokenizer {
        use tokenizers::models::wordlevel::WordLevel;
        use tokenizers::pre_tokenizers::whitespace::Whitespace;

        // Id 2 is deliberately unassigned: it is an EOS id and must never be
        // decoded.
        let vocab: std::collections::HashMap<String, u32> =
            [("[UNK]", 0u32), ("breaking", 1), ("story", 3), ("update", 4)]
                .iter()
                .map(|(word, id)| (word.to_string(), *id))
                .collect();
        let model = WordLevel::builder()
            .vocab(vocab.into_iter().collect())
            .unk_token("[UNK]".to_string())
            .build()
            .unwrap();

        let mut tokenizer = Tokenizer::new(model);
        tokenizer.with_pre_tokenizer(Some(Whitespace {}));
        tokenizer
    }

    fn test_engine(backend: CountingBackend) -> GeneratorEngine {
        GeneratorEngine {
            model: Box::new(backend),
            tokenizer: word_level_tokenizer(),
            device: Device::Cpu,
            options: GenerationConfig {
                max_length: 300,
                top_k: 50,
                top_p: 0.95,
                temperature: 1.0,
                repeat_penalty: 1.0,
                repeat_last_n: 64,
                seed: Some(7),
            },
        }
    }

    fn counting_engine(favored: u32) -> (GeneratorEngine, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let resets = Arc::new(AtomicUsize::new(0));
        let forwards = Arc::new(AtomicUsize::new(0));
        let engine = test_engine(CountingBackend {
            resets: resets.clone(),
            forwards: forwards.clone(),
            favored,
            vocab_size: 5,
        });
        (engine, resets, forwards)
    }

    #[test]
    fn test_generate_resets_cache_on_every_call() {
        let (mut engine, resets, _) = counting_engine(3);

        engine.generate("breaking", 4).unwrap();
        assert_eq!(resets.load(Ordering::SeqCst), 1);

        engine.generate("breaking", 4).unwrap();
        assert_eq!(resets.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_generate_respects_max_length() {
        let (mut engine, _, forwards) = counting_engine(3);

        let text = engine.generate("breaking", 4).unwrap();

        // Prompt token plus three sampled tokens fills the budget exactly.
        assert_eq!(text, "breaking story story story");
        // One prompt pass, then one incremental pass per later step.
        assert_eq!(forwards.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_generate_returns_prompt_when_budget_already_spent() {
        let (mut engine, _, forwards) = counting_engine(3);

        let text = engine.generate("breaking story update", 3).unwrap();

        assert_eq!(text, "breaking story update");
        assert_eq!(forwards.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_generate_stops_at_eos_without_emitting_it() {
        let (mut engine, _, _) = counting_engine(2);

        let text = engine.generate("breaking", 300).unwrap();

        assert_eq!(text, "breaking");
    }
}
