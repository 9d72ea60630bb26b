pub mod config;
pub mod edge_group;
pub mod env;
pub mod init;
pub mod relations;
pub mod tag;

use anyhow::Context;
use envrel_core::config::Config;
use envrel_core::db::RelationsDb;
use envrel_core::refresh::{HookRefresher, NoopRefresher, RelationRefresher};
use std::path::Path;

/// Load the config and open the database it points at.
pub fn open_db(root: &Path) -> anyhow::Result<(Config, RelationsDb)> {
    let config = Config::load(root).context("failed to load config")?;
    let path = config.db_path(root);
    let db = RelationsDb::open(&path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    Ok((config, db))
}

/// The configured refresh hook, or a no-op when none is set.
pub fn refresher(root: &Path, config: &Config) -> Box<dyn RelationRefresher> {
    match config.refresh.command.as_deref().map(str::trim) {
        Some(command) if !command.is_empty() => Box::new(HookRefresher::new(command, root)),
        _ => Box::new(NoopRefresher),
    }
}
