use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const ENVREL_DIR: &str = ".envrel";
pub const CONFIG_FILE: &str = ".envrel/config.yaml";
pub const DEFAULT_DB_FILE: &str = ".envrel/relations.db";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn envrel_dir(root: &Path) -> PathBuf {
    root.join(ENVREL_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve a configured database path; relative paths hang off `root`.
pub fn resolve_db_path(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}
