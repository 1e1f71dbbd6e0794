//! CLI interface for the fake news detector

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fake-news-detector")]
#[command(about = "Check if news is Real or Fake using local BERT + causal-LM inference")]
#[command(long_about = "Classify pasted news snippets, live NewsAPI headlines, or locally generated synthetic articles. Note: the classification head is not fine-tuned, so labels are structurally valid but not semantically reliable.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format: console, json
    #[arg(short, long, global = true, default_value = "console")]
    pub output: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a pasted news snippet as Real or Fake
    Check {
        /// The news text or headline to classify
        text: String,
    },

    /// Fetch live top headlines and classify each one
    Headlines {
        /// Override the configured headline language
        #[arg(short, long)]
        language: Option<String>,

        /// Override the configured number of headlines
        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Generate a synthetic news article from a topic and classify it
    Generate {
        /// Topic or headline idea to expand into an article
        prompt: String,

        /// Maximum total tokens, prompt included
        #[arg(short, long)]
        max_length: Option<usize>,

        /// Fixed sampling seed (omit for a fresh random article each run)
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Model management commands
    Models {
        #[command(subcommand)]
        action: ModelAction,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum ModelAction {
    /// List available models
    List {
        /// Show only classifier models
        #[arg(long)]
        classifiers: bool,

        /// Show only generator models
        #[arg(long)]
        generators: bool,
    },

    /// Download a model
    Download {
        /// Model name from the registry
        model: String,

        /// Force re-download if model exists
        #[arg(short, long)]
        force: bool,
    },

    /// Remove a downloaded model
    Remove {
        /// Model name to remove
        model: String,
    },

    /// Show model information
    Info {
        /// Model name
        model: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,
}

/// Parse and validate output format
pub fn parse_output_format(format: &str) -> Result<crate::config::OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "console" => Ok(crate::config::OutputFormat::Console),
        "json" => Ok(crate::config::OutputFormat::Json),
        _ => Err(format!(
            "Invalid output format: {}. Supported: console, json",
            format
        )),
    }
}
