pub mod toml_config;

use crate::adapters::graphql::MAX_PAGE_SIZE;
use crate::core::reconciler::{ReconcileOptions, RetryPolicy};
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{
    validate_non_empty_secret, validate_positive_number, validate_range, validate_required_field,
    validate_url, Validate,
};
use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use toml_config::{is_unresolved, TomlConfig};

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Parser)]
#[command(name = "service-area-sync")]
#[command(about = "Keeps service/city join records in the content API in sync")]
pub struct CliConfig {
    /// Optional TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// GraphQL content API endpoint
    #[arg(long, env = "CONTENT_API_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Bearer token with query and mutation permissions
    #[arg(long, env = "CONTENT_API_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    #[arg(long, global = true)]
    pub timeout_seconds: Option<u64>,

    /// Write a JSON run report to this path
    #[arg(long, global = true)]
    pub report: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit JSON log lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create and publish a join record for every service/city pair
    Seed(SeedArgs),
    /// Delete every join record
    Purge(PurgeArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SeedArgs {
    /// Perform lookups only; issue no mutations
    #[arg(long, env = "DRY_RUN", value_parser = BoolishValueParser::new())]
    pub dry_run: bool,

    /// Pairs reconciled concurrently
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Extra attempts for transient failures per call
    #[arg(long)]
    pub retry_attempts: Option<u32>,

    #[arg(long)]
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Args)]
pub struct PurgeArgs {
    /// List what would be deleted without deleting
    #[arg(long, env = "DRY_RUN", value_parser = BoolishValueParser::new())]
    pub dry_run: bool,
}

/// Connection settings after merging CLI, environment and config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: String,
    pub token: String,
    pub timeout: Duration,
    pub page_size: Option<usize>,
    pub report: Option<PathBuf>,
}

fn resolved(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty() && !is_unresolved(v))
}

impl Settings {
    /// Command line and environment win over the config file.
    pub fn resolve(cli: &CliConfig, file: &TomlConfig) -> Result<Self> {
        let endpoint =
            resolved(cli.endpoint.clone()).or_else(|| resolved(file.source.endpoint.clone()));
        let token = resolved(cli.token.clone()).or_else(|| resolved(file.source.token.clone()));

        let settings = Self {
            endpoint: validate_required_field("endpoint (CONTENT_API_ENDPOINT)", &endpoint)?
                .clone(),
            token: validate_required_field("token (CONTENT_API_TOKEN)", &token)?.clone(),
            timeout: Duration::from_secs(
                cli.timeout_seconds
                    .or(file.source.timeout_seconds)
                    .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            ),
            page_size: file.source.page_size,
            report: cli.report.clone(),
        };
        settings.validate()?;
        Ok(settings)
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_url("endpoint", &self.endpoint)?;
        validate_non_empty_secret("token", &self.token)?;
        validate_range("timeout_seconds", self.timeout.as_secs(), 1, 600)?;
        if let Some(page_size) = self.page_size {
            validate_range("source.page_size", page_size, 1, MAX_PAGE_SIZE)?;
        }
        Ok(())
    }
}

impl SeedArgs {
    pub fn reconcile_options(&self, file: &TomlConfig) -> Result<ReconcileOptions> {
        let section = &file.reconcile;
        let defaults = ReconcileOptions::default();

        let options = ReconcileOptions {
            dry_run: self.dry_run || section.dry_run.unwrap_or(false),
            concurrency: self
                .concurrency
                .or(section.concurrency)
                .unwrap_or(defaults.concurrency),
            retry: RetryPolicy {
                max_retries: self
                    .retry_attempts
                    .or(section.retry_attempts)
                    .unwrap_or(defaults.retry.max_retries),
                delay: self
                    .retry_delay_ms
                    .or(section.retry_delay_ms)
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry.delay),
            },
        };

        validate_positive_number("concurrency", options.concurrency, 1)?;
        validate_range(
            "retry_attempts",
            options.retry.max_retries,
            0,
            MAX_RETRY_ATTEMPTS,
        )?;
        Ok(options)
    }
}

impl CliConfig {
    pub fn load_file(&self) -> Result<TomlConfig> {
        match &self.config {
            Some(path) => TomlConfig::from_file(path).map_err(|e| match e {
                SyncError::IoError(io) => SyncError::ConfigError {
                    message: format!("cannot read {}: {}", path.display(), io),
                },
                other => other,
            }),
            None => Ok(TomlConfig::default()),
        }
    }
}
