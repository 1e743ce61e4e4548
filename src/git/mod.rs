//! Git history module
//!
//! Mines commit history (libgit2 first, `git log --numstat` as fallback) and
//! inspects the working tree. Everything here is best effort: a repository
//! we cannot read yields no history, never an error that stops analysis.

pub mod history;

pub use history::{
    parse_numstat_log, FileChange, GitCliMiner, HistoryMiner, LibGitMiner, MiningOptions,
    RawCommit,
};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use git2::{Repository, StatusOptions};
use std::path::Path;
use tracing::{debug, info, warn};

/// Mine history with each strategy in turn until one succeeds.
///
/// Returns the commits and the name of the miner that produced them, or an
/// empty list when every strategy failed.
pub fn mine_history_with(
    miners: &[&dyn HistoryMiner],
    repo_path: &Path,
    options: &MiningOptions,
) -> (Vec<RawCommit>, Option<&'static str>) {
    for miner in miners {
        match miner.mine(repo_path, options) {
            Ok(commits) => {
                info!("Mined {} commits with {}", commits.len(), miner.name());
                return (commits, Some(miner.name()));
            }
            Err(e) => {
                warn!("History mining with {} failed: {:#}", miner.name(), e);
            }
        }
    }
    (Vec::new(), None)
}

/// Mine history with libgit2, falling back to the git binary.
pub fn mine_history(repo_path: &Path, options: &MiningOptions) -> Vec<RawCommit> {
    mine_history_with(&[&LibGitMiner, &GitCliMiner], repo_path, options).0
}

/// Check if a path is inside a git repository.
pub fn is_git_repo(path: &Path) -> bool {
    Repository::discover(path).is_ok()
}

/// HEAD and cleanliness of the working tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeState {
    pub head: Option<String>,
    /// Modified, staged or untracked entries (ignored files excluded)
    pub changed_entries: usize,
}

impl WorktreeState {
    pub fn is_dirty(&self) -> bool {
        self.changed_entries > 0
    }
}

/// Read HEAD and working-tree status.
pub fn worktree_state(repo_path: &Path) -> Result<WorktreeState> {
    let repo = Repository::discover(repo_path)
        .with_context(|| format!("Failed to open git repository at {:?}", repo_path))?;

    let head = repo
        .head()
        .ok()
        .and_then(|h| h.target())
        .map(|oid| oid.to_string());

    let mut opts = StatusOptions::new();
    opts.include_untracked(true).include_ignored(false);
    let statuses = repo.statuses(Some(&mut opts))?;
    let changed_entries = statuses
        .iter()
        .filter(|entry| !entry.status().is_ignored())
        .count();

    debug!(
        "Worktree at {:?}: head={:?}, {} changed entries",
        repo_path, head, changed_entries
    );
    Ok(WorktreeState {
        head,
        changed_entries,
    })
}

/// Parse a `--since` value: RFC 3339 timestamp or `YYYY-MM-DD` (midnight UTC).
pub fn parse_since(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").with_context(|| {
        format!(
            "Invalid date '{}': expected RFC 3339 or YYYY-MM-DD",
            value
        )
    })?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("Invalid date '{}'", value))?;
    Ok(Utc.from_utc_datetime(&midnight))
}
