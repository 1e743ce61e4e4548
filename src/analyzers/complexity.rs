//! Cyclomatic complexity and maintainability index
//!
//! The built-in estimator counts decision keywords per file (1 + decision
//! points) after stripping comments and string literals. For Python, `radon`
//! results replace the estimate when the tool is installed and enabled.

use anyhow::Result;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use super::external_tool::{is_installed, ExternalTool};
use super::{AnalysisContext, Analyzer};
use crate::models::Project;

/// Files per radon invocation
const RADON_BATCH: usize = 200;

static C_FAMILY: OnceLock<Regex> = OnceLock::new();
static PYTHON: OnceLock<Regex> = OnceLock::new();
static RUBY: OnceLock<Regex> = OnceLock::new();
static RUST: OnceLock<Regex> = OnceLock::new();
static STRINGS: OnceLock<Regex> = OnceLock::new();

fn decision_pattern(language: &str) -> Option<&'static Regex> {
    let (cell, pattern) = match language {
        "python" => (
            &PYTHON,
            r"\b(?:if|elif|for|while|except|case|and|or)\b",
        ),
        "ruby" => (
            &RUBY,
            r"\b(?:if|elsif|unless|for|while|until|when|rescue)\b|&&|\|\|",
        ),
        // `?` is error propagation in Rust, not a ternary
        "rust" => (&RUST, r"\b(?:if|for|while|loop)\b|&&|\|\|"),
        "javascript" | "typescript" | "java" | "kotlin" | "c" | "cpp" | "csharp" | "go"
        | "php" | "swift" | "scala" => (
            &C_FAMILY,
            r"\b(?:if|for|foreach|while|case|catch|when)\b|&&|\|\||\?[^.?:\]\)]",
        ),
        _ => return None,
    };
    Some(cell.get_or_init(|| Regex::new(pattern).expect("valid regex")))
}

fn line_comment_marker(language: &str) -> &'static str {
    match language {
        "python" | "ruby" | "shell" => "#",
        _ => "//",
    }
}

/// Single-line `"..."` and `'...'` literals, escapes included.
pub(crate) fn string_literals() -> &'static Regex {
    STRINGS.get_or_init(|| {
        Regex::new(r#""(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'"#).expect("valid regex")
    })
}

/// Strip string literals and line comments so keywords inside them don't count.
fn code_only(language: &str, content: &str) -> String {
    let strings = string_literals();
    let marker = line_comment_marker(language);
    let mut out = String::with_capacity(content.len());
    for line in content.lines() {
        let line = strings.replace_all(line, "\"\"");
        let code = match line.find(marker) {
            Some(idx) => &line[..idx],
            None => &line[..],
        };
        out.push_str(code);
        out.push('\n');
    }
    out
}

/// Estimated cyclomatic complexity of a whole file, or `None` when the
/// language is not supported.
pub fn estimate_complexity(language: &str, content: &str) -> Option<f64> {
    let pattern = decision_pattern(language)?;
    let code = code_only(language, content);
    Some(1.0 + pattern.find_iter(&code).count() as f64)
}

/// Maintainability index in 0..=100 from complexity and LOC.
pub fn maintainability_index(complexity: f64, loc: usize) -> f64 {
    let ln_loc = (loc.max(1) as f64).ln();
    let raw = (171.0 - 0.23 * complexity - 16.2 * ln_loc) * 100.0 / 171.0;
    raw.clamp(0.0, 100.0)
}

/// Per-file metrics reported by radon
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RadonMetrics {
    pub complexity: Option<f64>,
    pub maintainability: Option<f64>,
}

/// Parse `radon cc -j` output into file complexity (1 + Σ(block − 1)).
pub fn parse_radon_cc(json: &JsonValue) -> BTreeMap<String, f64> {
    fn collect(blocks: &[JsonValue], seen: &mut BTreeSet<(u64, String)>, total: &mut f64) {
        for block in blocks {
            let kind = block.get("type").and_then(|t| t.as_str()).unwrap_or("");
            if kind == "function" || kind == "method" {
                let key = (
                    block.get("lineno").and_then(|l| l.as_u64()).unwrap_or(0),
                    block
                        .get("name")
                        .and_then(|n| n.as_str())
                        .unwrap_or("")
                        .to_string(),
                );
                if seen.insert(key) {
                    let cc = block.get("complexity").and_then(|c| c.as_f64()).unwrap_or(1.0);
                    *total += (cc - 1.0).max(0.0);
                }
            }
            if let Some(methods) = block.get("methods").and_then(|m| m.as_array()) {
                collect(methods, seen, total);
            }
        }
    }

    let mut out = BTreeMap::new();
    let Some(obj) = json.as_object() else {
        return out;
    };
    for (path, blocks) in obj {
        let Some(blocks) = blocks.as_array() else {
            continue;
        };
        let mut seen = BTreeSet::new();
        let mut total = 0.0;
        collect(blocks, &mut seen, &mut total);
        out.insert(crate::utils::normalize_path(std::path::Path::new(path)), 1.0 + total);
    }
    out
}

/// Parse `radon mi -j` output.
pub fn parse_radon_mi(json: &JsonValue) -> BTreeMap<String, f64> {
    json.as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(path, data)| {
                    let mi = data.get("mi")?.as_f64()?;
                    Some((
                        crate::utils::normalize_path(std::path::Path::new(path)),
                        mi.clamp(0.0, 100.0),
                    ))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn run_radon(ctx: &AnalysisContext, paths: &[String]) -> BTreeMap<String, RadonMetrics> {
    let mut out: BTreeMap<String, RadonMetrics> = BTreeMap::new();
    let timeout = ctx.config.complexity.timeout_secs;

    for chunk in paths.chunks(RADON_BATCH) {
        for sub in ["cc", "mi"] {
            let outcome = ExternalTool::new("radon")
                .args([sub, "-j"])
                .args(chunk.iter().cloned())
                .current_dir(&ctx.root)
                .timeout_secs(timeout)
                .run();
            let Some(json) = outcome.json() else {
                warn!("radon {} gave no usable output: {}", sub, outcome.describe());
                continue;
            };
            if sub == "cc" {
                for (path, cc) in parse_radon_cc(&json) {
                    out.entry(path).or_default().complexity = Some(cc);
                }
            } else {
                for (path, mi) in parse_radon_mi(&json) {
                    out.entry(path).or_default().maintainability = Some(mi);
                }
            }
        }
    }
    out
}

pub struct ComplexityAnalyzer;

impl Analyzer for ComplexityAnalyzer {
    fn name(&self) -> &'static str {
        "complexity"
    }

    fn run(&self, project: &mut Project, ctx: &AnalysisContext) -> Result<()> {
        let python: Vec<String> = project
            .files
            .values()
            .filter(|f| f.language.as_deref() == Some("python"))
            .map(|f| f.path.clone())
            .collect();

        let radon = if ctx.config.complexity.external
            && !python.is_empty()
            && is_installed("radon")
        {
            info!("Complexity: delegating {} Python files to radon", python.len());
            run_radon(ctx, &python)
        } else {
            BTreeMap::new()
        };

        let mut measured = 0usize;
        for file in project.files.values_mut() {
            let Some(language) = file.language.clone() else {
                continue;
            };
            if decision_pattern(&language).is_none() {
                continue;
            }
            let content = match std::fs::read(ctx.root.join(&file.path)) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!("Complexity: cannot read {}: {}", file.path, e);
                    continue;
                }
            };

            let external = radon.get(&file.path);
            let cc = external
                .and_then(|m| m.complexity)
                .or_else(|| estimate_complexity(&language, &content));
            let Some(cc) = cc else {
                continue;
            };
            let mi = external
                .and_then(|m| m.maintainability)
                .unwrap_or_else(|| maintainability_index(cc, file.loc));

            file.complexity = Some(cc);
            file.maintainability = Some(mi);
            measured += 1;
        }
        debug!("Complexity: measured {} files", measured);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::models::File;
    use serde_json::json;

    #[test]
    fn test_estimate_python() {
        let src = "def f(x):\n    if x and x > 1:\n        return 1\n    elif x:\n        return 2\n    # if in a comment\n    s = 'if for while'\n    for i in range(3):\n        pass\n";
        // if, and, elif, for
        assert_eq!(estimate_complexity("python", src), Some(5.0));
    }

    #[test]
    fn test_estimate_c_family() {
        let src = "function f(a, b) {\n  if (a && b) { return 1; } else if (a || b) { return 2; }\n  const c = a ? 1 : 2; // if ignored\n  for (;;) {}\n}\n";
        // if, &&, if, ||, ?, for
        assert_eq!(estimate_complexity("javascript", src), Some(7.0));
    }

    #[test]
    fn test_estimate_rust_ignores_try_operator() {
        let src = "fn f() -> Result<()> {\n    let x = g()?;\n    if x { h()?; }\n    Ok(())\n}\n";
        assert_eq!(estimate_complexity("rust", src), Some(2.0));
    }

    #[test]
    fn test_unsupported_language() {
        assert_eq!(estimate_complexity("markdown", "if this then that"), None);
    }

    #[test]
    fn test_maintainability_index_bounds() {
        assert!((maintainability_index(1.0, 1) - (170.77 * 100.0 / 171.0)).abs() < 1e-9);
        assert_eq!(maintainability_index(500.0, 100_000), 0.0);
        let mi = maintainability_index(10.0, 200);
        assert!(mi > 0.0 && mi < 100.0);
        // Monotone: more complexity, lower MI
        assert!(maintainability_index(20.0, 200) < mi);
    }

    #[test]
    fn test_parse_radon_cc() {
        let out = json!({
            "pkg/a.py": [
                {"type": "function", "name": "f", "lineno": 1, "complexity": 3},
                {"type": "class", "name": "C", "lineno": 10, "complexity": 4, "methods": [
                    {"type": "method", "name": "m", "lineno": 11, "complexity": 4}
                ]},
                {"type": "method", "name": "m", "lineno": 11, "complexity": 4}
            ],
            "bad.py": {"error": "invalid syntax"}
        });
        let cc = parse_radon_cc(&out);
        assert_eq!(cc.get("pkg/a.py"), Some(&6.0));
        assert!(!cc.contains_key("bad.py"));
    }

    #[test]
    fn test_parse_radon_mi() {
        let out = json!({"a.py": {"mi": 71.5, "rank": "A"}, "b.py": {"error": "x"}});
        let mi = parse_radon_mi(&out);
        assert_eq!(mi.len(), 1);
        assert_eq!(mi["a.py"], 71.5);
    }

    #[test]
    fn test_analyzer_fills_metrics() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn a(x: bool) {\n    if x {}\n}\n").unwrap();
        std::fs::write(dir.path().join("b.md"), "# if\n").unwrap();

        let mut config = ProjectConfig::default();
        config.complexity.external = false;
        let ctx = AnalysisContext::new(dir.path(), config).unwrap();
        let mut project = Project::new("demo", dir.path());
        for (path, lang, loc) in [("a.rs", "rust", 3), ("b.md", "markdown", 1)] {
            let mut f = File::new(path);
            f.language = Some(lang.into());
            f.loc = loc;
            project.files.insert(f.id.clone(), f);
        }

        ComplexityAnalyzer.run(&mut project, &ctx).unwrap();
        let a = project.file_by_path("a.rs").unwrap();
        assert_eq!(a.complexity, Some(2.0));
        assert_eq!(a.maintainability, Some(maintainability_index(2.0, 3)));
        assert_eq!(project.file_by_path("b.md").unwrap().complexity, None);
    }
}
