//! Local model inference: classifier, generator, and the memoizing hub

pub mod classifier;
pub mod device;
pub mod generator;
pub mod hub;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Classification label over the fixed two-class output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Real,
    Fake,
}

impl Label {
    /// Fixed convention: class index 1 is Real, class index 0 is Fake.
    pub fn from_class_index(index: usize) -> Self {
        if index == 1 {
            Label::Real
        } else {
            Label::Fake
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Real => "Real",
            Label::Fake => "Fake",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single classification call. Produced fresh per call, never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: Label,
    /// Softmax probability of the selected class, in [0, 1].
    pub confidence: f32,
}

/// Text classification capability. Deterministic for a fixed loaded model.
pub trait Classify {
    fn classify(&self, text: &str) -> Result<Verdict>;
}

/// Autoregressive text generation capability. Stochastic by default; the
/// returned string includes the prompt, and `max_length` bounds the total
/// token count prompt included.
pub trait Generate {
    fn generate(&mut self, prompt: &str, max_length: usize) -> Result<String>;
}
