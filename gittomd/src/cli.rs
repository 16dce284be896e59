/// # gittomd CLI interface
///
/// Command parsing and orchestration only. The conversion pipeline, the GitHub client
/// and the cache live in [`gittomd-core`]; this module wires configuration into them.
///
/// ## Commands
/// - `convert`: convert one repository and write the document to stdout or a file.
/// - `serve`: run the HTTP surface (see [`crate::serve`]).
///
/// For programmatic and integration use call [`run`] with a constructed [`Cli`].
///
/// [`gittomd-core`]: ../../gittomd_core/
use crate::load_config::load_config_or_default;
use crate::serve::serve;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use gittomd_core::convert::{ConversionOutcome, RepoRef};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// CLI for gittomd: turn a GitHub repository into one Markdown document.
#[derive(Parser)]
#[clap(
    name = "gittomd",
    version,
    about = "Convert a GitHub repository into a single Markdown document"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert one repository and print the document
    Convert {
        /// `owner/repo` or a https://github.com/owner/repo URL
        repository: String,
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
        /// Write the document here instead of stdout
        #[clap(long, short)]
        output: Option<PathBuf>,
        /// Neither read nor write the document cache
        #[clap(long)]
        no_cache: bool,
    },
    /// Serve conversions over HTTP at GET /{owner}/{repo}
    Serve {
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
        /// Listen address, overrides server.bind from the config
        #[clap(long)]
        bind: Option<String>,
    },
}

/// Async CLI entrypoint for main() and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Convert {
            repository,
            config,
            output,
            no_cache,
        } => {
            let target = RepoRef::parse(&repository).map_err(|e| {
                tracing::error!(
                    command = "convert",
                    repository = %repository,
                    error = %e,
                    "Invalid repository"
                );
                anyhow!("{e} (status {})", e.status())
            })?;
            let config = load_config_or_default(config.as_deref())?;
            let converter = config.build_converter(!no_cache)?;

            tracing::info!(
                command = "convert",
                owner = %target.owner,
                repo = %target.repo,
                "Starting conversion"
            );
            let outcome = converter
                .convert(&target.owner, &target.repo)
                .await
                .map_err(|e| {
                    tracing::error!(
                        command = "convert",
                        error = %e,
                        status = e.status(),
                        "Conversion failed"
                    );
                    anyhow!("{e} (status {})", e.status())
                })?;
            write_document(&outcome, output.as_ref())?;
            finish_cache_write(outcome).await;
            Ok(())
        }
        Commands::Serve { config, bind } => {
            let config = load_config_or_default(config.as_deref())?;
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let converter = Arc::new(config.build_converter(true)?);
            tracing::info!(command = "serve", bind = %bind, "Starting server");
            serve(converter, &bind).await
        }
    }
}

fn write_document(outcome: &ConversionOutcome, output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, &outcome.markdown)
                .with_context(|| format!("Failed to write document to {:?}", path))?;
            tracing::info!(
                path = ?path,
                origin = ?outcome.origin,
                bytes = outcome.markdown.len(),
                "Document written"
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(outcome.markdown.as_bytes())
                .and_then(|_| stdout.flush())
                .context("Failed to write document to stdout")?;
            tracing::info!(
                origin = ?outcome.origin,
                bytes = outcome.markdown.len(),
                "Document printed"
            );
        }
    }
    Ok(())
}

// The process exits right after, which would drop a detached write.
async fn finish_cache_write(outcome: ConversionOutcome) {
    if let Some(handle) = outcome.cache_write {
        if let Err(e) = handle.await {
            tracing::warn!(error = ?e, "Cache write task did not complete");
        }
    }
}
