// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use spark_proxy_core::domain::config::ProxyConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./spark-proxy.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(&output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ProxyConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. SPARK_PROXY_CONFIG_PATH: {}",
            std::env::var("SPARK_PROXY_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./spark-proxy.yaml");
        println!("  4. ~/.spark-proxy/config.yaml");
        println!("  5. /etc/spark-proxy/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    let spec = &config.spec;
    println!("{}", "Server:".bold());
    println!("  Bind: {}", config.bind_address());
    println!("  Request timeout: {:?}", spec.server.request_timeout);
    println!();

    println!("{}", "Registry:".bold());
    println!("  ID strategy: {:?}", spec.registry.id_strategy);
    println!();

    println!("{}", "Backend:".bold());
    println!("  Type: {:?}", spec.backend.backend_type);
    println!("  Auto progress: {}", spec.backend.auto_progress);
    println!("  Step delay: {:?}", spec.backend.step_delay);
    println!("  Status channel capacity: {}", spec.backend.status_channel_capacity);
    println!();

    println!("{}", "Observability:".bold());
    println!("  Log format: {:?}", spec.observability.log_format);
    match spec.observability.metrics_listen {
        Some(addr) => println!("  Metrics: {}", addr),
        None => println!("  Metrics: {}", "(disabled)".dimmed()),
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ProxyConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: &Path, with_examples: bool) -> Result<()> {
    write_sample(output, with_examples)?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

fn write_sample(output: &Path, with_examples: bool) -> Result<()> {
    if with_examples {
        std::fs::write(output, include_str!("../../templates/config-with-examples.yaml"))
            .with_context(|| format!("Failed to write config to {:?}", output))
    } else {
        ProxyConfigManifest::default()
            .to_yaml_file(output)
            .with_context(|| format!("Failed to write config to {:?}", output))
    }
}
