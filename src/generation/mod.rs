use crate::{anyhow, bail, models::QgenModel, prompting, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::t5;
use std::path::Path;
use tokenizers::Tokenizer;

/// Decoding parameters for the sampling loop.
///
/// Defaults mirror the pretrained generators' intended decode settings:
/// top-p 0.9 nucleus sampling at temperature 1.0.
#[derive(Debug, Clone)]
pub struct DecodeParams {
    pub top_p: Option<f64>,
    pub temperature: Option<f64>,
    pub seed: u64,
    pub max_len: usize,
    pub repeat_penalty: f32,
    pub repeat_last_n: usize,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            top_p: Some(0.9),
            temperature: Some(1.0),
            seed: 299792458,
            max_len: 64,
            repeat_penalty: 1.0,
            repeat_last_n: 64,
        }
    }
}

/// A loaded question generation model: checkpoint weights, tokenizer, and
/// the sampling state shared across calls so that repeated generation from
/// the same inputs yields varied questions.
pub struct QuestionGenerator {
    model: t5::T5ForConditionalGeneration,
    tokenizer: Tokenizer,
    config: t5::Config,
    device: Device,
    logits_processor: LogitsProcessor,
    params: DecodeParams,
}

impl std::fmt::Debug for QuestionGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestionGenerator")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl QuestionGenerator {
    /// Loads a downloaded model from `<base_dir>/<model_name>/`. The
    /// directory must hold `checkpoint_best.pt`, `config.json`, and
    /// `tokenizer.json`; a missing file points the user at the downloader.
    pub fn load(model: QgenModel, base_dir: &Path, params: DecodeParams) -> Result<Self> {
        let model_dir = model.model_dir(base_dir);
        let checkpoint_path = model.checkpoint_path(base_dir);
        let config_path = model_dir.join("config.json");
        let tokenizer_path = model_dir.join("tokenizer.json");
        for required in [&checkpoint_path, &config_path, &tokenizer_path] {
            if !required.exists() {
                bail!(
                    "{} not found for model ({}). Run the download_models_cli binary first.",
                    required.display(),
                    model.cli_name()
                );
            }
        }

        let config: t5::Config = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| anyhow!(e))?;

        let device = Device::Cpu;
        let tensors = candle_core::pickle::read_all(&checkpoint_path)?;
        let vb = VarBuilder::from_tensors(tensors.into_iter().collect(), DType::F32, &device);
        let model = t5::T5ForConditionalGeneration::load(vb, &config)?;

        let logits_processor = LogitsProcessor::new(params.seed, params.temperature, params.top_p);

        Ok(Self {
            model,
            tokenizer,
            config,
            device,
            logits_processor,
            params,
        })
    }

    /// Generates one question conditioned on the context and, when present,
    /// an answer span from it.
    pub fn generate(&mut self, answer: Option<&str>, context: &str) -> Result<String> {
        let input = match answer {
            Some(answer) => prompting::format_example(&[answer, context]),
            None => prompting::format_example(&[context]),
        };

        let input_token_ids = self
            .tokenizer
            .encode(input.as_str(), false)
            .map_err(|e| anyhow!(e))?
            .get_ids()
            .to_vec();
        let input_token_ids = Tensor::new(&input_token_ids[..], &self.device)?.unsqueeze(0)?;

        self.model.clear_kv_cache();
        let encoder_output = self.model.encode(&input_token_ids)?;

        let start_token_id = self
            .config
            .decoder_start_token_id
            .unwrap_or(self.config.pad_token_id) as u32;
        let mut output_token_ids = vec![start_token_id];

        for step in 0.. {
            if output_token_ids.len() > self.params.max_len {
                break;
            }
            let decoder_token_ids = if step == 0 || !self.config.use_cache {
                Tensor::new(output_token_ids.as_slice(), &self.device)?.unsqueeze(0)?
            } else {
                let last_token = output_token_ids[output_token_ids.len() - 1];
                Tensor::new(&[last_token], &self.device)?.unsqueeze(0)?
            };

            let logits = self
                .model
                .decode(&decoder_token_ids, &encoder_output)?
                .squeeze(0)?;
            let logits = if self.params.repeat_penalty == 1. {
                logits
            } else {
                let start_at = output_token_ids
                    .len()
                    .saturating_sub(self.params.repeat_last_n);
                candle_transformers::utils::apply_repeat_penalty(
                    &logits,
                    self.params.repeat_penalty,
                    &output_token_ids[start_at..],
                )?
            };

            let next_token_id = self.logits_processor.sample(&logits)?;
            if next_token_id as usize == self.config.eos_token_id {
                break;
            }
            output_token_ids.push(next_token_id);
        }

        let text = self
            .tokenizer
            .decode(&output_token_ids[1..], true)
            .map_err(|e| anyhow!(e))?;
        Ok(prompting::strip_special_tokens(&text))
    }
}
