use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use envrel_core::config::{Config, WarnLevel};
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the loaded configuration
    Show,

    /// Validate the config for common mistakes
    Validate,

    /// Set or clear the relation refresh hook
    SetHook {
        /// Shell command run after each relation change (omit to clear)
        command: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
        ConfigSubcommand::SetHook { command } => set_hook(root, command),
    }
}

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    if json {
        return print_json(&config);
    }
    println!("database: {}", config.db_path(root).display());
    println!(
        "refresh hook: {}",
        config.refresh.command.as_deref().unwrap_or("(none)")
    );
    Ok(())
}

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

fn set_hook(root: &Path, command: Option<String>) -> anyhow::Result<()> {
    let mut config = Config::load(root).context("failed to load config")?;
    config.refresh.command = command;
    config.save(root).context("failed to save config")?;
    match &config.refresh.command {
        Some(cmd) => println!("Refresh hook set: {cmd}"),
        None => println!("Refresh hook cleared"),
    }
    Ok(())
}
