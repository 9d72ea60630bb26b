use anyhow::Context;
use envrel_core::config::Config;
use envrel_core::db::RelationsDb;
use envrel_core::paths;
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(paths::envrel_dir(root)).context("failed to create .envrel/")?;

    let written = Config::init(root).context("failed to write config")?;
    let config = Config::load(root).context("failed to load config")?;
    let db_path = config.db_path(root);
    RelationsDb::open(&db_path)
        .with_context(|| format!("failed to create database at {}", db_path.display()))?;

    if written {
        println!("Initialized envrel in {}", root.display());
    } else {
        println!("Already initialized: {}", paths::config_path(root).display());
    }
    Ok(())
}
