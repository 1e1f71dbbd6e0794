//! Fake news detector: classify snippets, live headlines, or generated articles

mod cli;
mod config;
mod detector;
mod error;
mod inference;
mod models;
mod news;
mod output;

use clap::Parser;
use cli::{Cli, Commands, ConfigAction, ModelAction};
use config::Config;
use error::{DetectorError, Result};
use inference::hub::ModelHub;
use log::error;
use models::manager::ModelManager;
use news::client::NewsApiClient;
use output::formatter::formatter_for;
use output::report::DetectionReport;
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let output_format = match cli::parse_output_format(&cli.output) {
        Ok(format) => format,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    config.output.format = output_format;

    if let Err(e) = run_command(cli.command, config).await {
        match e {
            DetectorError::EmptyInput => {
                println!("⚠️  Please enter content to check.");
            }
            _ => {
                error!("Command failed: {}", e);
                process::exit(1);
            }
        }
    }
}

async fn run_command(command: Commands, mut config: Config) -> Result<()> {
    match command {
        Commands::Check { text } => {
            // Guard before any model is loaded: blank input is a warning, not
            // a classification.
            if text.trim().is_empty() {
                return Err(DetectorError::EmptyInput);
            }

            let hub = ModelHub::new(config.clone());
            let classifier = hub.classifier().await?;

            println!("🔎 Analyzing...");
            let verdict = detector::manual_check(classifier, &text)?;

            let report =
                DetectionReport::manual_check(&config.models.classifier_model, &text, verdict);
            print_report(&config, &report)?;
        }

        Commands::Headlines { language, count } => {
            if let Some(language) = language {
                config.news.language = language;
            }
            if let Some(count) = count {
                config.news.page_size = count;
            }

            let api_key = config.news_api_key()?;
            let client = NewsApiClient::new(&config.news.endpoint, &api_key);

            let hub = ModelHub::new(config.clone());
            let classifier = hub.classifier().await?;

            println!(
                "📰 Fetching top {} headlines ({})...",
                config.news.page_size, config.news.language
            );
            let results = detector::scan_headlines(
                classifier,
                &client,
                &config.news.language,
                config.news.page_size,
            )
            .await?;

            let report = DetectionReport::headlines(&config.models.classifier_model, results);
            print_report(&config, &report)?;
        }

        Commands::Generate {
            prompt,
            max_length,
            seed,
        } => {
            if prompt.trim().is_empty() {
                return Err(DetectorError::EmptyInput);
            }

            if seed.is_some() {
                config.generation.seed = seed;
            }
            let max_length = max_length.unwrap_or(config.generation.max_length);

            let hub = ModelHub::new(config.clone());
            let classifier = hub.classifier().await?;
            let generator = hub.generator().await?;

            println!("🌀 Generating article...");
            let mut generator = generator.lock().await;
            let result =
                detector::generate_and_check(classifier, &mut *generator, &prompt, max_length)?;

            let report = DetectionReport::generated(&config.models.classifier_model, result);
            print_report(&config, &report)?;
        }

        Commands::Models { action } => {
            run_models_command(action, &config).await?;
        }

        Commands::Config { action } => match action {
            Some(ConfigAction::Show) | None => {
                println!("⚙️  Current Configuration\n");
                println!("Models Directory: {}", config.models_dir().display());
                println!("Classifier Model: {}", config.models.classifier_model);
                println!("Generator Model: {}", config.models.generator_model);
                println!("\nGeneration:");
                println!("  Max Length: {} tokens (prompt included)", config.generation.max_length);
                println!("  Sampling: top_k={}, top_p={}", config.generation.top_k, config.generation.top_p);
                println!("\nHeadlines:");
                println!("  Language: {}", config.news.language);
                println!("  Page Size: {}", config.news.page_size);
                let key_status = match config.news_api_key() {
                    Ok(_) => "configured",
                    Err(_) => "missing (set NEWSAPI_KEY)",
                };
                println!("  API Key: {}", key_status);
            }

            Some(ConfigAction::Reset) => {
                println!("🔄 Resetting configuration to defaults...");
                let default_config = Config::default();
                default_config.save()?;
                println!("✅ Configuration reset successfully!");
            }
        },
    }

    Ok(())
}

async fn run_models_command(action: ModelAction, config: &Config) -> Result<()> {
    match action {
        ModelAction::List {
            classifiers,
            generators,
        } => {
            println!("📚 Available Models\n");

            let manager = ModelManager::new(config.get_models_dir(), config).await?;

            if !generators {
                println!("🧠 Classifier Models:");
                for model in config.list_classifier_models() {
                    print_model_entry(&manager, model);
                }
                println!();
            }

            if !classifiers {
                println!("🤖 Generator Models:");
                for model in config.list_generator_models() {
                    print_model_entry(&manager, model);
                }
            }

            if manager.list_downloaded_models().is_empty() {
                println!("\n💡 No models downloaded yet. Get started with:");
                println!("   fake-news-detector models download bert-base-uncased");
                println!("   fake-news-detector models download tinyllama");
            }
        }

        ModelAction::Download { model, force } => {
            println!("⬇️  Downloading model: {}", model);
            if force {
                println!("🔄 Force download enabled");
            }

            let mut manager = ModelManager::new(config.get_models_dir(), config).await?;

            if !force && manager.is_model_downloaded(&model) {
                println!("✅ Model '{}' is already downloaded!", model);
                println!("💡 Use --force to re-download");
                return Ok(());
            }

            match manager.download_model(&model).await {
                Ok(model_path) => {
                    println!("✅ Model '{}' downloaded successfully!", model);
                    println!("📁 Location: {}", model_path.display());
                }
                Err(e) => {
                    println!("❌ Failed to download model '{}': {}", model, e);
                    return Err(e);
                }
            }
        }

        ModelAction::Remove { model } => {
            println!("🗑️  Removing model: {}", model);

            let manager = ModelManager::new(config.get_models_dir(), config).await?;

            if !manager.is_model_downloaded(&model) {
                println!("⚠️  Model '{}' is not downloaded", model);
                return Ok(());
            }

            let model_path = config.get_models_dir().join(&model);
            if model_path.exists() {
                std::fs::remove_dir_all(&model_path).map_err(|e| {
                    DetectorError::ModelError(format!("Failed to remove model: {}", e))
                })?;
                println!("✅ Model '{}' removed successfully!", model);
            } else {
                println!("⚠️  Model directory not found: {}", model_path.display());
            }
        }

        ModelAction::Info { model } => {
            println!("📋 Model Information for '{}'\n", model);

            let manager = ModelManager::new(config.get_models_dir(), config).await?;

            if let Some(model_info) = manager.get_model_info(&model) {
                println!("Name: {}", model_info.name);
                println!("Repository: {}", model_info.repo_id);
                println!("Type: {:?}", model_info.model_type);
                println!("Size: {} MB", model_info.size_mb);
                println!("Description: {}", model_info.description);

                let is_downloaded = manager.is_model_downloaded(&model);
                println!(
                    "Status: {}",
                    if is_downloaded {
                        "✅ Downloaded"
                    } else {
                        "⬇️  Available for download"
                    }
                );

                if is_downloaded {
                    if let Some(model_path) = manager.get_model_path(&model) {
                        println!("Location: {}", model_path.display());
                    }
                } else {
                    println!("\n💡 To download this model, run:");
                    println!("   fake-news-detector models download {}", model);
                }
            } else {
                return Err(DetectorError::ModelNotFound(model));
            }
        }
    }

    Ok(())
}

fn print_model_entry(manager: &ModelManager, model: &config::AvailableModel) {
    let status = if manager.is_model_downloaded(&model.name) {
        "✅ Downloaded"
    } else {
        "⬇️  Available"
    };
    println!(
        "  • {} ({}) - {} MB [{}]",
        model.name, model.repo_id, model.size_mb, status
    );
    println!("    {}", model.description);
}

fn print_report(config: &Config, report: &DetectionReport) -> Result<()> {
    let formatter = formatter_for(&config.output.format, config.output.color_output);
    println!("{}", formatter.format_report(report)?);
    Ok(())
}
