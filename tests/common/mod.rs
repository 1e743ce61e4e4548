//! Repository fixtures shared by the integration tests

#![allow(dead_code)]

use git2::{Repository, Signature, Time};
use std::path::Path;
use tempfile::TempDir;

/// Write `files`, stage them and commit with a fixed author and time.
pub fn commit(repo: &Repository, files: &[(&str, &str)], message: &str, seconds: i64) {
    let workdir = repo.workdir().unwrap().to_path_buf();
    let mut index = repo.index().unwrap();
    for (path, content) in files {
        let full = workdir.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&full, content).unwrap();
        index.add_path(Path::new(path)).unwrap();
    }
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::new("Ann Example", "ann@example.com", &Time::new(seconds, 0)).unwrap();
    let parent = repo.head().ok().map(|h| h.peel_to_commit().unwrap());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

/// `n` assignment lines, the first `changed` of them marked as edited.
pub fn python_lines(name: &str, n: usize, changed: usize) -> String {
    (0..n)
        .map(|i| {
            if i < changed {
                format!("{}_{} = {} + 1\n", name, i, i)
            } else {
                format!("{}_{} = {}\n", name, i, i)
            }
        })
        .collect()
}

/// Two committed files plus one untracked file:
///
/// - `big.py`: 100 lines, added in the first commit and 25 lines rewritten
///   in the second (150 lines of churn)
/// - `small.py`: 10 lines, added in the first commit only
/// - `idle.py`: never committed, so no churn
pub fn two_file_repo() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit(
        &repo,
        &[
            ("big.py", &python_lines("big", 100, 0)),
            ("small.py", &python_lines("small", 10, 0)),
        ],
        "Add modules",
        1_700_000_000,
    );
    commit(
        &repo,
        &[("big.py", &python_lines("big", 100, 25))],
        "Rework big",
        1_700_086_400,
    );
    std::fs::write(dir.path().join("idle.py"), "idle = 1\n").unwrap();
    dir
}
