//! Import extraction and resolution
//!
//! Regex based and deliberately shallow: we want "which file talks to which"
//! for the dependency graph, not a compiler-grade module resolver. Imports
//! that don't map onto a tracked file are kept with `resolved = None`.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

static PY_IMPORT: OnceLock<Regex> = OnceLock::new();
static PY_FROM: OnceLock<Regex> = OnceLock::new();
static JS_IMPORT: OnceLock<Regex> = OnceLock::new();
static JS_REQUIRE: OnceLock<Regex> = OnceLock::new();
static RS_MOD: OnceLock<Regex> = OnceLock::new();
static RS_USE: OnceLock<Regex> = OnceLock::new();
static GO_SINGLE: OnceLock<Regex> = OnceLock::new();
static GO_BLOCK: OnceLock<Regex> = OnceLock::new();
static QUOTED: OnceLock<Regex> = OnceLock::new();
static JAVA_IMPORT: OnceLock<Regex> = OnceLock::new();

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid regex"))
}

const JS_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

/// Raw import targets written in `content`, in order of appearance,
/// deduplicated.
pub fn extract_imports(language: &str, content: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |s: &str| {
        let s = s.trim();
        if !s.is_empty() && !out.iter().any(|x| x == s) {
            out.push(s.to_string());
        }
    };

    match language {
        "python" => {
            let import = regex(&PY_IMPORT, r"(?m)^[ \t]*import[ \t]+([\w.]+(?:[ \t]*,[ \t]*[\w.]+)*)");
            let from = regex(&PY_FROM, r"(?m)^[ \t]*from[ \t]+(\.*[\w.]*)[ \t]+import\b");
            for cap in import.captures_iter(content) {
                for module in cap[1].split(',') {
                    push(module);
                }
            }
            for cap in from.captures_iter(content) {
                push(&cap[1]);
            }
        }
        "javascript" | "typescript" => {
            let import = regex(
                &JS_IMPORT,
                r#"(?m)^[ \t]*(?:import|export)\b[^'";]*?['"]([^'"]+)['"]"#,
            );
            let require = regex(
                &JS_REQUIRE,
                r#"\b(?:require|import)\(\s*['"]([^'"]+)['"]\s*\)"#,
            );
            for cap in import.captures_iter(content) {
                push(&cap[1]);
            }
            for cap in require.captures_iter(content) {
                push(&cap[1]);
            }
        }
        "rust" => {
            let module = regex(
                &RS_MOD,
                r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?mod[ \t]+(\w+)[ \t]*;",
            );
            let use_ = regex(
                &RS_USE,
                r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?use[ \t]+((?:\w+::)*\w+)",
            );
            for cap in module.captures_iter(content) {
                push(&format!("mod {}", &cap[1]));
            }
            for cap in use_.captures_iter(content) {
                push(&cap[1]);
            }
        }
        "go" => {
            let single = regex(&GO_SINGLE, r#"(?m)^[ \t]*import[ \t]+(?:[\w.]+[ \t]+)?"([^"]+)""#);
            let block = regex(&GO_BLOCK, r"(?s)\bimport[ \t]*\((.*?)\)");
            let quoted = regex(&QUOTED, r#""([^"]+)""#);
            for cap in single.captures_iter(content) {
                push(&cap[1]);
            }
            for cap in block.captures_iter(content) {
                for inner in quoted.captures_iter(&cap[1]) {
                    push(&inner[1]);
                }
            }
        }
        "java" => {
            let import = regex(
                &JAVA_IMPORT,
                r"(?m)^[ \t]*import[ \t]+(?:static[ \t]+)?([\w.]+(?:\.\*)?)[ \t]*;",
            );
            for cap in import.captures_iter(content) {
                push(&cap[1]);
            }
        }
        _ => {}
    }
    out
}

/// Map an import target onto a tracked file path, if it names one.
pub fn resolve_import(
    language: &str,
    source: &str,
    target: &str,
    tracked: &BTreeSet<String>,
) -> Option<String> {
    let candidates = match language {
        "python" => python_candidates(source, target),
        "javascript" | "typescript" => js_candidates(source, target),
        "rust" => rust_candidates(source, target),
        "java" => {
            if target.ends_with(".*") {
                return None;
            }
            let suffix = format!("{}.java", target.replace('.', "/"));
            return tracked
                .iter()
                .find(|p| *p == &suffix || p.ends_with(&format!("/{}", suffix)))
                .cloned();
        }
        _ => Vec::new(),
    };
    candidates
        .into_iter()
        .find(|c| c != source && tracked.contains(c))
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Join `rel` onto `dir`, folding `.` and `..`. `None` if it escapes the root.
fn join_relative(dir: &str, rel: &str) -> Option<String> {
    let mut parts: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for seg in rel.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

fn python_candidates(source: &str, target: &str) -> Vec<String> {
    let dots = target.chars().take_while(|c| *c == '.').count();
    let module = target[dots..].replace('.', "/");

    let base = if dots > 0 {
        let mut dir = parent_dir(source).to_string();
        for _ in 1..dots {
            match dir.rsplit_once('/') {
                Some((up, _)) => dir = up.to_string(),
                None if !dir.is_empty() => dir.clear(),
                None => return Vec::new(),
            }
        }
        dir
    } else {
        String::new()
    };

    let join = |prefix: &str, rest: &str| -> String {
        match (prefix.is_empty(), rest.is_empty()) {
            (true, _) => rest.to_string(),
            (false, true) => prefix.to_string(),
            (false, false) => format!("{}/{}", prefix, rest),
        }
    };

    let mut out = Vec::new();
    let mut roots = vec![base];
    if dots == 0 {
        roots.push("src".to_string());
    }
    for root in roots {
        let stem = join(&root, &module);
        if !module.is_empty() {
            out.push(format!("{}.py", stem));
        }
        out.push(join(&stem, "__init__.py"));
    }
    out
}

fn js_candidates(source: &str, target: &str) -> Vec<String> {
    if !target.starts_with('.') {
        return Vec::new();
    }
    let Some(joined) = join_relative(parent_dir(source), target) else {
        return Vec::new();
    };
    let mut out = vec![joined.clone()];
    for ext in JS_EXTENSIONS {
        out.push(format!("{}.{}", joined, ext));
    }
    for ext in JS_EXTENSIONS {
        out.push(format!("{}/index.{}", joined, ext));
    }
    out
}

fn rust_candidates(source: &str, target: &str) -> Vec<String> {
    if let Some(name) = target.strip_prefix("mod ") {
        let file_name = source.rsplit('/').next().unwrap_or(source);
        let dir = parent_dir(source);
        let base = if matches!(file_name, "mod.rs" | "lib.rs" | "main.rs") {
            dir.to_string()
        } else {
            let stem = file_name.trim_end_matches(".rs");
            if dir.is_empty() {
                stem.to_string()
            } else {
                format!("{}/{}", dir, stem)
            }
        };
        let prefix = if base.is_empty() {
            String::new()
        } else {
            format!("{}/", base)
        };
        return vec![
            format!("{}{}.rs", prefix, name),
            format!("{}{}/mod.rs", prefix, name),
        ];
    }

    let Some(rest) = target.strip_prefix("crate::") else {
        return Vec::new();
    };
    // Crate root: the nearest `src` directory above the source file
    let src_root = match source.rfind("src/") {
        Some(idx) => &source[..idx + 3],
        None => return Vec::new(),
    };
    let segments: Vec<&str> = rest.split("::").collect();
    let mut out = Vec::new();
    for len in (1..=segments.len()).rev() {
        let module = segments[..len].join("/");
        out.push(format!("{}/{}.rs", src_root, module));
        out.push(format!("{}/{}/mod.rs", src_root, module));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_python_imports() {
        let src = "import os, pkg.util\nfrom .sibling import thing\nfrom .. import parent\n  # import nothing\n";
        let imports = extract_imports("python", src);
        assert_eq!(imports, vec!["os", "pkg.util", ".sibling", ".."]);

        let files = tracked(&["pkg/util.py", "pkg/sub/sibling.py", "pkg/__init__.py", "pkg/sub/a.py"]);
        assert_eq!(
            resolve_import("python", "main.py", "pkg.util", &files).as_deref(),
            Some("pkg/util.py")
        );
        assert_eq!(
            resolve_import("python", "pkg/sub/a.py", ".sibling", &files).as_deref(),
            Some("pkg/sub/sibling.py")
        );
        assert_eq!(
            resolve_import("python", "pkg/sub/a.py", "..", &files).as_deref(),
            Some("pkg/__init__.py")
        );
        assert_eq!(resolve_import("python", "main.py", "os", &files), None);
    }

    #[test]
    fn test_js_imports() {
        let src = r#"import React from 'react';
import { a } from "./lib/a";
export * from '../shared';
const b = require('./b');
"#;
        let imports = extract_imports("typescript", src);
        assert_eq!(imports, vec!["react", "./lib/a", "../shared", "./b"]);

        let files = tracked(&["web/lib/a.ts", "web/b.js", "shared/index.ts"]);
        assert_eq!(
            resolve_import("typescript", "web/app.ts", "./lib/a", &files).as_deref(),
            Some("web/lib/a.ts")
        );
        assert_eq!(
            resolve_import("typescript", "web/app.ts", "./b", &files).as_deref(),
            Some("web/b.js")
        );
        assert_eq!(
            resolve_import("typescript", "web/app.ts", "../shared", &files).as_deref(),
            Some("shared/index.ts")
        );
        assert_eq!(resolve_import("typescript", "web/app.ts", "react", &files), None);
    }

    #[test]
    fn test_rust_imports() {
        let src = "mod git;\npub(crate) mod models;\nuse crate::git::history;\nuse std::fmt;\n";
        let imports = extract_imports("rust", src);
        assert_eq!(
            imports,
            vec!["mod git", "mod models", "crate::git::history", "std::fmt"]
        );

        let files = tracked(&["src/lib.rs", "src/git/mod.rs", "src/git/history.rs", "src/models.rs"]);
        assert_eq!(
            resolve_import("rust", "src/lib.rs", "mod git", &files).as_deref(),
            Some("src/git/mod.rs")
        );
        assert_eq!(
            resolve_import("rust", "src/lib.rs", "mod models", &files).as_deref(),
            Some("src/models.rs")
        );
        assert_eq!(
            resolve_import("rust", "src/lib.rs", "crate::git::history", &files).as_deref(),
            Some("src/git/history.rs")
        );
        assert_eq!(resolve_import("rust", "src/lib.rs", "std::fmt", &files), None);
    }

    #[test]
    fn test_go_and_java_imports() {
        let go = "package main\n\nimport \"fmt\"\nimport (\n\t\"os\"\n\tlog \"github.com/x/log\"\n)\n";
        assert_eq!(
            extract_imports("go", go),
            vec!["fmt", "os", "github.com/x/log"]
        );

        let java = "import java.util.List;\nimport static com.acme.Util.helper;\nimport com.acme.model.User;\nimport com.acme.*;\n";
        let imports = extract_imports("java", java);
        assert_eq!(imports.len(), 4);
        let files = tracked(&["src/main/java/com/acme/model/User.java"]);
        assert_eq!(
            resolve_import("java", "src/main/java/com/acme/App.java", "com.acme.model.User", &files)
                .as_deref(),
            Some("src/main/java/com/acme/model/User.java")
        );
        assert_eq!(resolve_import("java", "App.java", "com.acme.*", &files), None);
    }

    #[test]
    fn test_join_relative_escape() {
        assert_eq!(join_relative("a/b", "../c").as_deref(), Some("a/c"));
        assert_eq!(join_relative("", "../c"), None);
    }
}
