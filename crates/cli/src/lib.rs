pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use bundlekit_core::config::{AppConfig, LoadOptions, LogFormat};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "bundlekit",
    about = "Bundle pricing and validation CLI",
    long_about = "Price, validate, preview and allocate product bundles from JSON request files.",
    after_help = "Examples:\n  bundlekit price request.json\n  bundlekit validate request.json\n  \
                  bundlekit cart cart.json\n  bundlekit config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a bundlekit.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Compute subtotal, discount, total and savings for a bundle selection")]
    Price { request: PathBuf },
    #[command(about = "Check a bundle selection against the template's rules and stock")]
    Validate { request: PathBuf },
    #[command(about = "Validate and price a selection in one pass")]
    Evaluate { request: PathBuf },
    #[command(about = "Compare the current selection with a hypothetical change set")]
    Preview { request: PathBuf },
    #[command(about = "Spread a bundle discount across line items by value share")]
    Allocate { request: PathBuf },
    #[command(about = "Re-allocate discounts for every bundle instance in a cart")]
    Cart { request: PathBuf },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions { config_path: cli.config.clone(), ..LoadOptions::default() };

    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Price { request } => commands::price::run(&request, options),
        Command::Validate { request } => commands::validate::run(&request, options),
        Command::Evaluate { request } => commands::evaluate::run(&request, options),
        Command::Preview { request } => commands::preview::run(&request, options),
        Command::Allocate { request } => commands::allocate::run(&request, options),
        Command::Cart { request } => commands::cart::run(&request, options),
        Command::Config => commands::config::run(options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout carries only the command payload.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
