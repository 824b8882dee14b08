//! imgcap: caption an image file with the OpenAI caption node.
//!
//! Reads OPENAI_API_KEY from the first `.env` found in IMGCAP_HOST_ROOT,
//! IMGCAP_PLUGIN_ROOT, the working directory, or the process environment.

use anyhow::Context;
use clap::{Parser, Subcommand};
use imgcap_cli::{init_tracing, load_tensor, log_error, ErrorReport};
use imgcap_core::{CaptionConfig, CaptionModel, EnvFallback, EnvSearch};
use imgcap_plugins::{CaptionRequest, Node, OpenAiCaptionNode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "imgcap", about = "Caption images with OpenAI vision models")]
struct Cli {
    /// Do not fall back to the default .env search when no candidate exists
    #[arg(long, global = true)]
    no_env_fallback: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Caption an image file
    Caption {
        /// Path to the image (PNG, JPEG, WebP or GIF)
        file: PathBuf,
        /// Model to use
        #[arg(long, default_value = "gpt-4o")]
        model: CaptionModel,
        /// System prompt
        #[arg(long, default_value = imgcap_plugins::openai_caption::DEFAULT_SYSTEM_PROMPT)]
        system_prompt: String,
        /// Caption prompt
        #[arg(long, default_value = imgcap_plugins::openai_caption::DEFAULT_CAPTION_PROMPT)]
        prompt: String,
        /// Maximum output tokens
        #[arg(long, default_value = "300", value_parser = clap::value_parser!(u32).range(1..))]
        max_tokens: u32,
        /// Sampling temperature (0-2)
        #[arg(long, default_value = "0.5")]
        temperature: f64,
        /// Print the caption, model and token usage as JSON (or an error report)
        #[arg(long)]
        json: bool,
    },
    /// List the available models
    Models,
    /// Print the node definition the host registers
    Describe,
}

fn load_config(no_env_fallback: bool) -> CaptionConfig {
    let fallback = if no_env_fallback {
        EnvFallback::Disabled
    } else {
        EnvFallback::DefaultLoader
    };
    CaptionConfig::load(&EnvSearch::discover().with_fallback(fallback))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Caption {
            file,
            model,
            system_prompt,
            prompt,
            max_tokens,
            temperature,
            json,
        } => {
            if !(0.0..=imgcap_plugins::openai_caption::MAX_TEMPERATURE).contains(&temperature) {
                anyhow::bail!("--temperature must be between 0 and 2, got {}", temperature);
            }

            let config = load_config(cli.no_env_fallback);
            let node = OpenAiCaptionNode::new(config).context("Failed to create caption node")?;
            let tensor = load_tensor(&file)?;
            let request = CaptionRequest {
                model,
                system_prompt,
                caption_prompt: prompt,
                max_tokens,
                temperature,
            };

            let output = match node.caption(&tensor, &request).await {
                Ok(output) => output,
                Err(e) => {
                    log_error(&e);
                    if json {
                        let out = serde_json::to_string_pretty(&ErrorReport::from(&e))
                            .context("Serialize error report")?;
                        println!("{}", out);
                    }
                    return Err(anyhow::Error::new(e)
                        .context(format!("Failed to caption {}", file.display())));
                }
            };

            if json {
                let out = serde_json::to_string_pretty(&output).context("Serialize caption")?;
                println!("{}", out);
            } else {
                println!("{}", output.text);
            }
        }
        Commands::Models => {
            for name in CaptionModel::names() {
                println!("{}", name);
            }
        }
        Commands::Describe => {
            // The definition does not depend on credentials.
            let node = OpenAiCaptionNode::new(CaptionConfig::with_api_key(String::new()))
                .context("Failed to create caption node")?;
            let out = serde_json::to_string_pretty(&node.definition().host_manifest())
                .context("Serialize node definition")?;
            println!("{}", out);
        }
    }

    Ok(())
}
