use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;

use replyclean_lib::config::completion::{get_completion_config, CompletionConfig};
use replyclean_lib::{logging, normalize, DeepSeekModel};

#[derive(Parser, Debug)]
#[command(name = "replyclean", version, about = "Clean up raw LLM completion text")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize raw completion text read from stdin or a file
    Normalize {
        /// Read the raw text from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Send a prompt to DeepSeek and print the normalized answer
    Ask {
        /// Prompt text
        prompt: String,

        /// Completion config file (defaults to the platform data directory)
        #[arg(short, long, env = "REPLYCLEAN_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging()?;
    let cli = Cli::parse();

    match cli.command {
        Command::Normalize { file } => {
            let raw = match file {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    tokio::io::stdin()
                        .read_to_string(&mut buf)
                        .await
                        .context("Failed to read stdin")?;
                    buf
                }
            };
            println!("{}", normalize(&raw));
        }
        Command::Ask { prompt, config } => {
            let config = match config {
                Some(path) => CompletionConfig::from_path(&path)?,
                None => get_completion_config().clone(),
            };
            let model = DeepSeekModel::new(config);
            let answer = model.ask(&prompt).await?;
            println!("{}", answer);
        }
    }

    Ok(())
}
