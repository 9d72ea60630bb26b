//! Relation refresh: tell whatever caches an environment's classification
//! that it changed.
//!
//! [`HookRefresher`] runs a configured shell command. The command gets the
//! environment as JSON on stdin plus these variables:
//! - `ENVREL_ENVIRONMENT_ID`
//! - `ENVREL_GROUP_ID`
//! - `ENVREL_TAG_IDS` (comma separated)
//!
//! A non-zero exit fails the refresh.

use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::{RelationsError, Result};
use crate::types::Environment;

pub trait RelationRefresher {
    fn refresh(&self, environment: &Environment) -> Result<()>;
}

impl<F> RelationRefresher for F
where
    F: Fn(&Environment) -> Result<()>,
{
    fn refresh(&self, environment: &Environment) -> Result<()> {
        self(environment)
    }
}

/// Refresher for setups with nothing downstream to notify.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRefresher;

impl RelationRefresher for NoopRefresher {
    fn refresh(&self, environment: &Environment) -> Result<()> {
        debug!(environment = %environment.id, "no refresh hook configured");
        Ok(())
    }
}

/// Refresher that only records what it is asked to refresh.
///
/// Relation updates on [`crate::db::RelationsDb`] run against a queue inside
/// the write transaction and [`RefreshQueue::flush`] it after commit, so
/// nothing downstream hears about writes that end up rolled back.
#[derive(Debug, Default)]
pub struct RefreshQueue {
    pending: RefCell<Vec<Environment>>,
}

impl RefreshQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Refresh every queued environment in order.
    ///
    /// Every environment is attempted even after a failure; the first failure
    /// is returned as a [`RelationsError::Refresh`].
    pub fn flush<R: RelationRefresher + ?Sized>(self, refresher: &R) -> Result<()> {
        let mut first_error = None;
        for environment in self.pending.into_inner() {
            if let Err(e) = refresher.refresh(&environment) {
                warn!(environment = %environment.id, error = %e, "relation refresh failed");
                let e = match e {
                    RelationsError::Refresh(_) => e,
                    other => RelationsError::Refresh(other.to_string()),
                };
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl RelationRefresher for RefreshQueue {
    fn refresh(&self, environment: &Environment) -> Result<()> {
        self.pending.borrow_mut().push(environment.clone());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct HookRefresher {
    command: String,
    working_dir: PathBuf,
}

impl HookRefresher {
    pub fn new(command: impl Into<String>, working_dir: &Path) -> Self {
        Self {
            command: command.into(),
            working_dir: working_dir.to_path_buf(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl RelationRefresher for HookRefresher {
    fn refresh(&self, environment: &Environment) -> Result<()> {
        let shell = which::which("sh")
            .map_err(|e| RelationsError::Refresh(format!("no shell to run hook: {e}")))?;
        let payload = serde_json::to_vec(environment)?;
        let tag_ids = environment
            .tag_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let mut child = Command::new(shell)
            .arg("-c")
            .arg(&self.command)
            .current_dir(&self.working_dir)
            .env("ENVREL_ENVIRONMENT_ID", environment.id.to_string())
            .env("ENVREL_GROUP_ID", environment.group_id.to_string())
            .env("ENVREL_TAG_IDS", tag_ids)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RelationsError::Refresh(format!("failed to spawn hook: {e}")))?;

        // stdin is fed from its own thread while stderr is drained.
        let stdin = child.stdin.take();
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(&payload),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        match written {
            Ok(Ok(())) => {}
            // A hook that ignores stdin may exit before reading it.
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => {
                return Err(RelationsError::Refresh(format!(
                    "failed to write hook stdin: {e}"
                )))
            }
            Err(_) => {
                return Err(RelationsError::Refresh(
                    "hook stdin writer panicked".to_string(),
                ))
            }
        }

        let output = output.map_err(|e| RelationsError::Refresh(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let hint = stderr.trim().chars().take(500).collect::<String>();
            return Err(RelationsError::Refresh(format!(
                "hook exited with {}: {hint}",
                output.status
            )));
        }

        debug!(environment = %environment.id, hook = %self.command, "refresh hook succeeded");
        Ok(())
    }
}
