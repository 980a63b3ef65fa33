use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facefind_core::{without_begin_slash, ImageNormalizer, ScratchDir};
use std::path::PathBuf;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "facefind", about = "facefind photo normalization and search helpers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a photo the way it is prepared for face detection
    Normalize {
        /// Source photo
        path: PathBuf,
        /// Target pixel area (overrides config)
        #[arg(long)]
        max_area: Option<u64>,
        /// Minimum length of the shorter side (overrides config)
        #[arg(long)]
        min_side: Option<u32>,
        /// MIME type of the normalized copy (overrides config)
        #[arg(long)]
        encoding: Option<String>,
        /// Keep the normalized copy instead of removing it on exit
        #[arg(long)]
        keep: bool,
    },
    /// Print the search title for a file path
    Title {
        path: String,
        /// Also strip the root path
        #[arg(long)]
        force: bool,
        /// Keep doubled separators
        #[arg(long)]
        no_clean: bool,
    },
    /// Print the files-view link for a file
    Link {
        /// Directory, with trailing separator (e.g. "/Photos/")
        dir: String,
        /// File name inside the directory
        file: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Normalize {
            path,
            max_area,
            min_side,
            encoding,
            keep,
        } => {
            let mut options = config.normalize.clone();
            if let Some(max_area) = max_area {
                options.max_area = max_area;
            }
            if let Some(min_side) = min_side {
                options.min_side = min_side;
            }
            if let Some(encoding) = encoding {
                options.encoding = encoding;
            }

            let mut normalizer = ImageNormalizer::with_options(
                &path,
                &options,
                ScratchDir::new(&config.scratch_dir),
            )
            .with_context(|| format!("normalizing {}", path.display()))?;

            let temp_path = if keep { normalizer.temp_path() } else { None };
            let summary = serde_json::json!({
                "source": normalizer.source_path(),
                "skipped": normalizer.is_skipped(),
                "ratio": normalizer.ratio(),
                "dimensions": normalizer.dimensions(),
                "temp_path": temp_path,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);

            if !keep {
                normalizer.clean();
            }
        }
        Commands::Title {
            path,
            force,
            no_clean,
        } => {
            println!("{}", without_begin_slash(&path, force, !no_clean));
        }
        Commands::Link { dir, file } => {
            println!("{}", config.links().render(&dir, &file));
        }
    }

    Ok(())
}
