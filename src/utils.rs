//! Small stateless helpers shared by the analyzers
//!
//! - language guessing from file extensions
//! - file checksums (sha256 / xxh3)
//! - glob-style exclusion matching
//! - line counting

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::str::FromStr;

/// Guess a language name from a path's extension.
///
/// Returns `None` for extensions we don't know about; callers treat those
/// files as "other" and skip language-specific analysis.
pub fn guess_language(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let lang = match ext.as_str() {
        "py" | "pyi" => "python",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "c" | "h" => "c",
        "cpp" | "hpp" | "cc" | "cxx" | "hh" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "scala" => "scala",
        "sh" | "bash" => "shell",
        "md" | "markdown" => "markdown",
        "toml" => "toml",
        "yaml" | "yml" => "yaml",
        "json" => "json",
        "ttl" => "turtle",
        _ => return None,
    };
    Some(lang)
}

/// Hash algorithm used for file checksums
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Xxh3,
}

impl FromStr for HashAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "xxh3" | "xxhash" => Ok(HashAlgorithm::Xxh3),
            _ => Err(anyhow::anyhow!(
                "Unknown hash algorithm '{}'. Valid values: sha256, xxh3",
                s
            )),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithm::Sha256 => write!(f, "sha256"),
            HashAlgorithm::Xxh3 => write!(f, "xxh3"),
        }
    }
}

/// Checksum of a byte slice, prefixed with the algorithm name (`sha256:...`).
pub fn checksum(bytes: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            format!("sha256:{:x}", hasher.finalize())
        }
        HashAlgorithm::Xxh3 => {
            format!("xxh3:{:016x}", xxhash_rust::xxh3::xxh3_64(bytes))
        }
    }
}

/// First 16 hex chars of the sha256 of `input`.
pub fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// Normalize a path to a forward-slash relative string.
pub fn normalize_path(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    s.trim_start_matches("./").to_string()
}

/// Count non-blank lines.
pub fn count_loc(content: &str) -> usize {
    content.lines().filter(|l| !l.trim().is_empty()).count()
}

/// Quick binary sniff: NUL byte in the first 8 KiB.
pub fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(8192).any(|b| *b == 0)
}

/// Built-in exclusion patterns for vendored and generated code.
/// Applied unless `skip_defaults = true` in config.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "**/.git/**",
    "**/vendor/**",
    "**/node_modules/**",
    "**/third_party/**",
    "**/dist/**",
    "**/target/**",
    "**/__pycache__/**",
    "**/*.min.js",
    "**/*.min.css",
];

/// True if `path` matches any of `patterns`.
pub fn is_excluded(path: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| glob_match(p, path))
}

/// Glob matching on `/`-separated relative paths.
///
/// `*` matches within one segment, `**` matches any number of segments,
/// `?` matches one non-separator character. A pattern ending in `/` is a
/// directory prefix (`vendor/` matches `vendor/x.py` but not `src/vendor/x.py`).
/// A pattern with no `/` at all matches a file or directory name at any depth,
/// as in `.gitignore` (`*.py` matches `tests/x.py`, `build` matches `a/build/x`).
pub fn glob_match(pattern: &str, path: &str) -> bool {
    if !pattern.contains('/') {
        let segs: Vec<&str> = path.split('/').collect();
        return segs.iter().any(|seg| match_segment(pattern, seg));
    }
    if let Some(prefix) = pattern.strip_suffix('/') {
        if !prefix.contains('*') && !prefix.contains('?') {
            return path == prefix || path.starts_with(pattern);
        }
        return glob_match(&format!("{}/**", prefix), path);
    }
    let pat: Vec<&str> = pattern.split('/').collect();
    let segs: Vec<&str> = path.split('/').collect();
    match_segments(&pat, &segs)
}

fn match_segments(pat: &[&str], segs: &[&str]) -> bool {
    match pat.split_first() {
        None => segs.is_empty(),
        Some((&"**", rest)) => (0..=segs.len()).any(|skip| match_segments(rest, &segs[skip..])),
        Some((first, rest)) => match segs.split_first() {
            Some((seg, seg_rest)) => match_segment(first, seg) && match_segments(rest, seg_rest),
            None => false,
        },
    }
}

fn match_segment(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    // Iterative wildcard match with single-star backtracking
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// Lowercase, trim and collapse internal whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Reduce arbitrary text to `[a-z0-9-]`.
pub fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash && !out.is_empty() {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_end_matches('-').to_string()
}
