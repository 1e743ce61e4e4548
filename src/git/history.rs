//! Git history extraction
//!
//! Two miners produce the same [`RawCommit`] stream:
//! - [`LibGitMiner`] walks history with libgit2 (the git2 crate)
//! - [`GitCliMiner`] parses `git log --numstat` output from the git binary
//!
//! Merge commits are skipped by both. Paths are relative to the directory
//! being mined, which may sit below the repository's top level; changes
//! outside it are dropped, and so are commits left with no changes.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use git2::{DiffOptions, Patch, Repository, Sort};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Separates commits in the `git log` output
const RECORD_MARKER: char = '\u{1e}';
/// Separates header fields in the `git log` output
const FIELD_SEP: char = '\u{1f}';

/// One file touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Path after the commit (new path for renames)
    pub path: String,
    pub added: u64,
    pub deleted: u64,
}

/// Location of `target` inside the working tree of `repo`, `/`-separated.
///
/// Empty when `target` is the top level.
fn subdir_prefix(repo: &Repository, target: &Path) -> Result<String> {
    let workdir = repo
        .workdir()
        .context("Bare repositories have no working tree")?;
    let workdir = canonical(workdir);
    let target = canonical(target);
    let rel = target.strip_prefix(&workdir).with_context(|| {
        format!("{:?} is outside the working tree {:?}", target, workdir)
    })?;
    Ok(rel.to_string_lossy().replace('\\', "/"))
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Re-express a repository path relative to `prefix`; `None` when outside it.
fn rebase_path(prefix: &str, path: &str) -> Option<String> {
    if prefix.is_empty() {
        return Some(path.to_string());
    }
    path.strip_prefix(prefix)?
        .strip_prefix('/')
        .map(str::to_string)
}

/// A non-merge commit as mined from history.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCommit {
    /// Full commit hash
    pub sha: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    /// First line of the message
    pub message: String,
    pub changes: Vec<FileChange>,
}

/// Filters applied while mining
#[derive(Debug, Clone, Default)]
pub struct MiningOptions {
    /// Only commits at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Stop after this many commits (0 = unlimited)
    pub max_commits: usize,
}

impl MiningOptions {
    fn limit_reached(&self, count: usize) -> bool {
        self.max_commits > 0 && count >= self.max_commits
    }
}

/// A strategy for reading commit history.
pub trait HistoryMiner {
    fn name(&self) -> &'static str;

    fn mine(&self, repo_path: &Path, options: &MiningOptions) -> Result<Vec<RawCommit>>;
}

/// History mining through libgit2.
pub struct LibGitMiner;

impl HistoryMiner for LibGitMiner {
    fn name(&self) -> &'static str {
        "libgit2"
    }

    fn mine(&self, repo_path: &Path, options: &MiningOptions) -> Result<Vec<RawCommit>> {
        let repo = Repository::discover(repo_path)
            .with_context(|| format!("Failed to open git repository at {:?}", repo_path))?;
        let prefix = subdir_prefix(&repo, repo_path)?;
        debug!(
            "Opened git repository at {:?} (subdirectory {:?})",
            repo.path(),
            prefix
        );

        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        revwalk.push_head()?;

        let mut commits = Vec::new();

        for oid_result in revwalk {
            if options.limit_reached(commits.len()) {
                break;
            }

            let oid = oid_result?;
            let commit = repo.find_commit(oid)?;

            if commit.parent_count() > 1 {
                continue;
            }

            let Some(timestamp) = Utc.timestamp_opt(commit.time().seconds(), 0).single() else {
                debug!("Skipping commit {} with invalid timestamp", oid);
                continue;
            };
            if let Some(since) = options.since {
                if timestamp < since {
                    break; // Commits are sorted by time, so we can stop
                }
            }

            let tree = commit.tree()?;
            let parent_tree = if commit.parent_count() == 1 {
                Some(commit.parent(0)?.tree()?)
            } else {
                None
            };

            let mut diff_opts = DiffOptions::new();
            let mut diff =
                repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut diff_opts))?;
            // Attribute renames to the new path
            diff.find_similar(None)?;

            let mut changes = Vec::new();
            for idx in 0..diff.deltas().len() {
                let Some(delta) = diff.get_delta(idx) else {
                    continue;
                };
                let Some(path) = delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path())
                    .and_then(|p| rebase_path(&prefix, &p.to_string_lossy().replace('\\', "/")))
                else {
                    continue;
                };
                let (added, deleted) = match Patch::from_diff(&diff, idx) {
                    Ok(Some(patch)) => match patch.line_stats() {
                        Ok((_, added, deleted)) => (added as u64, deleted as u64),
                        Err(_) => (0, 0),
                    },
                    _ => (0, 0),
                };
                changes.push(FileChange {
                    path,
                    added,
                    deleted,
                });
            }
            if changes.is_empty() {
                continue;
            }

            let author = commit.author();
            commits.push(RawCommit {
                sha: oid.to_string(),
                author_name: author.name().unwrap_or("Unknown").to_string(),
                author_email: author.email().unwrap_or("").to_string(),
                timestamp,
                message: commit.summary().unwrap_or("").to_string(),
                changes,
            });
        }

        Ok(commits)
    }
}

/// History mining by parsing `git log --numstat`.
pub struct GitCliMiner;

impl HistoryMiner for GitCliMiner {
    fn name(&self) -> &'static str {
        "git-cli"
    }

    fn mine(&self, repo_path: &Path, options: &MiningOptions) -> Result<Vec<RawCommit>> {
        let format = format!(
            "--pretty=format:{}%H{}%an{}%ae{}%aI{}%s",
            RECORD_MARKER, FIELD_SEP, FIELD_SEP, FIELD_SEP, FIELD_SEP
        );
        let mut args: Vec<String> = vec![
            "log".into(),
            "--no-merges".into(),
            "--numstat".into(),
            "-M".into(),
            "--relative".into(),
            format,
        ];
        if let Some(since) = options.since {
            args.push(format!("--since={}", since.to_rfc3339()));
        }
        if options.max_commits > 0 {
            args.push(format!("--max-count={}", options.max_commits));
        }
        args.extend(["--".to_string(), ".".to_string()]);

        let output = Command::new("git")
            .args(&args)
            .current_dir(repo_path)
            .output()
            .context("Failed to run git log")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("git log failed: {}", stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_numstat_log(&stdout))
    }
}

/// Parse the output of `git log --numstat` produced with our record format.
///
/// Non-numeric counts (`-` for binary files, or garbage) count as zero.
pub fn parse_numstat_log(text: &str) -> Vec<RawCommit> {
    let mut commits = Vec::new();
    let mut current: Option<RawCommit> = None;

    for line in text.lines() {
        if let Some(header) = line.strip_prefix(RECORD_MARKER) {
            if let Some(done) = current.take() {
                commits.push(done);
            }
            current = parse_header(header);
            continue;
        }

        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let Some(commit) = current.as_mut() else {
            continue;
        };

        let mut parts = line.splitn(3, '\t');
        let (Some(added), Some(deleted), Some(path)) = (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        commit.changes.push(FileChange {
            path: resolve_rename_path(path),
            added: added.trim().parse().unwrap_or(0),
            deleted: deleted.trim().parse().unwrap_or(0),
        });
    }

    if let Some(done) = current {
        commits.push(done);
    }
    commits
}

fn parse_header(header: &str) -> Option<RawCommit> {
    let fields: Vec<&str> = header.splitn(5, FIELD_SEP).collect();
    if fields.len() < 4 {
        debug!("Skipping malformed git log header: {:?}", header);
        return None;
    }
    let timestamp = match DateTime::parse_from_rfc3339(fields[3]) {
        Ok(ts) => ts.with_timezone(&Utc),
        Err(e) => {
            debug!("Skipping commit {} with bad date {:?}: {}", fields[0], fields[3], e);
            return None;
        }
    };
    Some(RawCommit {
        sha: fields[0].to_string(),
        author_name: fields[1].to_string(),
        author_email: fields[2].to_string(),
        timestamp,
        message: fields.get(4).copied().unwrap_or("").to_string(),
        changes: Vec::new(),
    })
}

/// Resolve numstat rename notation to the new path.
///
/// `old => new` becomes `new`; `src/{a => b}/x.rs` becomes `src/b/x.rs`;
/// `src/{ => sub}/x.rs` becomes `src/sub/x.rs`.
pub fn resolve_rename_path(path: &str) -> String {
    if !path.contains(" => ") {
        return path.to_string();
    }
    if let (Some(open), Some(close)) = (path.find('{'), path.find('}')) {
        if open < close {
            let prefix = &path[..open];
            let inner = &path[open + 1..close];
            let suffix = &path[close + 1..];
            let new_inner = inner.split(" => ").nth(1).unwrap_or(inner);
            let joined = format!("{}{}{}", prefix, new_inner, suffix);
            return joined.replace("//", "/");
        }
    }
    path.split(" => ").nth(1).unwrap_or(path).to_string()
}
