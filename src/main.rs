use clap::Parser;
use service_area_sync::config::toml_config::TomlConfig;
use service_area_sync::utils::logger;
use service_area_sync::{
    CliConfig, Command, GraphQlContentSource, LocalStorage, Purger, Reconciler, Result, RunMode,
    RunReport, Settings, SyncError,
};
use std::path::Path;

#[tokio::main]
async fn main() {
    // `.env.local` wins over `.env`; neither overrides the real environment.
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();

    let cli = CliConfig::parse();

    let file = match cli.load_file() {
        Ok(file) => file,
        Err(e) => {
            eprintln!("❌ Failed to load config file: {}", e);
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    };

    let verbose = cli.verbose || file.logging.verbose.unwrap_or(false);
    if cli.json_logs || file.logging.json.unwrap_or(false) {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("🚀 Starting service-area-sync");
    if verbose {
        tracing::debug!("CLI command: {:?}", cli.command);
    }

    if let Err(e) = run(&cli, &file).await {
        tracing::error!("❌ Run failed: {} (Severity: {:?})", e, e.severity());
        eprintln!("❌ {}", e);
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: &CliConfig, file: &TomlConfig) -> Result<()> {
    let settings = Settings::resolve(cli, file)?;
    tracing::info!("📡 Content API: {}", settings.endpoint);
    tracing::debug!("Content API token: ***set***");

    let mut source =
        GraphQlContentSource::new(&settings.endpoint, &settings.token, settings.timeout)?;
    if let Some(page_size) = settings.page_size {
        source = source.with_page_size(page_size);
    }

    match &cli.command {
        Command::Seed(args) => {
            let options = args.reconcile_options(file)?;
            let report = RunReport::start(RunMode::Seed, options.dry_run);
            tracing::info!(
                "🎬 Seeding join records (concurrency {}, retries {})",
                options.concurrency,
                options.retry.max_retries
            );

            let summary = Reconciler::new(&source, options).run().await?;

            println!("{}", summary);
            println!("✅ Seeding complete!");
            write_report(settings.report.as_deref(), &report.finish_seed(summary)).await?;
        }
        Command::Purge(args) => {
            let report = RunReport::start(RunMode::Purge, args.dry_run);

            let deleted = Purger::new(&source, args.dry_run).purge_all().await?;

            if args.dry_run {
                println!("🔍 {} ServiceLocations would be deleted", deleted);
            } else {
                println!("🗑️ Deleted {} ServiceLocations", deleted);
            }
            write_report(settings.report.as_deref(), &report.finish_purge(deleted)).await?;
        }
    }

    Ok(())
}

async fn write_report(path: Option<&Path>, report: &RunReport) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| SyncError::InvalidConfigValueError {
            field: "report".to_string(),
            value: path.display().to_string(),
            reason: "Report path must name a file".to_string(),
        })?;
    let parent = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    report.save(&LocalStorage::new(parent), file_name).await?;
    tracing::info!("📁 Run report saved to: {}", path.display());
    Ok(())
}
