//! Sentinel - A command-line phishing scanner
//!
//! Loads a mailbox through the scan backend, classifies it and prints the
//! flagged messages.

use anyhow::{Context, Result};
use clap::Parser;
use config::ConfigDir;
use log::{error, info, warn};
use mailscan::{
    CredentialBundle, CredentialGateway, MessageId, MessageRecord, ScanMode, ScanReport,
    ScanSession, ScanSummary, ScannerConfig, SessionId, StaticGateway,
};
use std::sync::Arc;

mod cli;

use cli::{Cli, Commands, ScanArgs};

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Some(dir) = ConfigDir::user() {
        if let Err(e) = dir.ensure() {
            error!("Failed to initialize config directory: {}", e);
        }
    }

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(EXIT_ERROR);
        }
    }
}

/// Exit status when a scan flagged at least one message
const EXIT_PHISHING_FOUND: i32 = 2;
const EXIT_ERROR: i32 = 1;

fn run(cli: Cli) -> Result<i32> {
    match &cli.command {
        Commands::ConfigPath => {
            match ScannerConfig::default_config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No config directory available on this platform"),
            }
            Ok(0)
        }
        Commands::ConfigInit { force } => {
            let dir = ConfigDir::user().context("No config directory available on this platform")?;
            let path = ScannerConfig::default().save_in(&dir, *force)?;
            println!("Wrote default scanner config to {}", path.display());
            Ok(0)
        }
        Commands::Health => {
            let config = load_config(&cli)?;
            let health = config.backend()?.health().with_context(|| {
                format!("Backend at {} is not reachable", config.backend_url)
            })?;
            println!("{}: {} ({})", config.backend_url, health.status, health.service);
            Ok(0)
        }
        Commands::Scan(args) => {
            let config = load_config(&cli)?;
            let report = scan(&config, args)?;
            Ok(scan_exit_code(&report.summary))
        }
    }
}

fn scan_exit_code(summary: &ScanSummary) -> i32 {
    if summary.has_phishing() {
        EXIT_PHISHING_FOUND
    } else {
        0
    }
}

fn load_config(cli: &Cli) -> Result<ScannerConfig> {
    match &cli.config {
        Some(path) => ScannerConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => ScannerConfig::load(),
    }
}

fn gateway(config: &ScannerConfig, args: &ScanArgs) -> Result<Arc<dyn CredentialGateway>> {
    if let Some(token) = &args.token {
        let user_id = args.user_id.as_deref().unwrap_or(&args.session);
        return Ok(Arc::new(StaticGateway::new(CredentialBundle::bearer(
            token.clone(),
            config.client_id.clone(),
            config.client_secret.clone(),
            user_id,
        ))));
    }

    match config.token_broker()? {
        Some(broker) => Ok(Arc::new(broker)),
        None => {
            warn!(
                "To resolve credentials, either:\n\
                 1. Pass an access token with --token (or SENTINEL_ACCESS_TOKEN)\n\
                 2. Or set broker_url and broker_secret in {} (see `sentinel config-init`)",
                ScannerConfig::default_config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| mailscan::config::CONFIG_FILE.to_string())
            );
            anyhow::bail!("No credential source configured")
        }
    }
}

fn scan(config: &ScannerConfig, args: &ScanArgs) -> Result<ScanReport> {
    let backend = Arc::new(config.backend()?);
    let session = ScanSession::from_config(config, gateway(config, args)?, backend.clone(), backend);

    let stats = session.load(&SessionId::new(args.session.as_str()))?;
    info!(
        "Loaded {} messages ({} skipped)",
        stats.records_stored, stats.messages_skipped
    );

    for id in &args.select {
        if !session.toggle_selection(&MessageId::new(id.as_str())) {
            warn!("No loaded message with id {}", id);
        }
    }
    if !args.select.is_empty() && args.mode == ScanMode::All {
        info!("Messages were selected but mode is 'all'; use --mode selected to scan only them");
    }

    session.set_mode(args.mode);
    info!("{}", args.mode.description());
    let report = session.scan()?;
    let shown = session.filtered(args.show);

    if args.json {
        let output = serde_json::json!({
            "summary": report.summary,
            "completedAt": report.completed_at,
            "fallback": report.fallback_fired(),
            "messages": shown,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(&report, &shown);
    }
    Ok(report)
}

fn print_report(report: &ScanReport, records: &[MessageRecord]) {
    for record in records {
        println!(
            "[{:>3}] {:<6} {}  {}  {}",
            record.risk_score(),
            record.risk_level().as_str(),
            record.id(),
            record.sender_display_name,
            record.subject
        );
        if !record.urls.is_empty() {
            println!("      urls: {}", record.joined_urls());
        }
    }

    if let Some(err) = &report.outcome.error {
        println!("Scan did not complete: {}", err);
    }

    let summary = &report.summary;
    println!(
        "{} scanned ({} in scope): {} phishing, {} safe, {} selected. Completed {}",
        summary.total,
        report.scope_size(),
        summary.phishing,
        summary.safe,
        summary.selected,
        report.completed_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
    );
}
