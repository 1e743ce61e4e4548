//! Structure analysis: the file walk
//!
//! Creates File and Module records and the import graph. Respects
//! `.gitignore`, `.repoqignore`, configured exclusion globs, extension
//! filters and `max_files`.

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::imports::{extract_imports, resolve_import};
use super::{AnalysisContext, Analyzer};
use crate::models::{file_id, module_id, DependencyEdge, File, Module, Project};
use crate::utils::{checksum, count_loc, guess_language, looks_binary, normalize_path};

/// Per-repository ignore file, same syntax as `.gitignore`
pub const IGNORE_FILE_NAME: &str = ".repoqignore";

pub struct StructureAnalyzer;

impl Analyzer for StructureAnalyzer {
    fn name(&self) -> &'static str {
        "structure"
    }

    fn run(&self, project: &mut Project, ctx: &AnalysisContext) -> Result<()> {
        let paths = collect_files(ctx)?;
        info!("Structure: {} files selected", paths.len());

        let settings = &ctx.config.structure;
        let mut seen = BTreeSet::new();
        let mut sources: Vec<(String, &'static str, String)> = Vec::new();

        for (abs, rel) in paths {
            let bytes = match std::fs::read(&abs) {
                Ok(b) => b,
                Err(e) => {
                    warn!("Skipping unreadable file {}: {}", rel, e);
                    continue;
                }
            };
            if looks_binary(&bytes) {
                debug!("Skipping binary file {}", rel);
                continue;
            }

            let content = String::from_utf8_lossy(&bytes);
            let language = guess_language(Path::new(&rel));
            let id = file_id(&rel);
            let file = project
                .files
                .entry(id.clone())
                .or_insert_with(|| File::new(rel.clone()));
            file.language = language.map(str::to_string);
            file.loc = count_loc(&content);
            file.size_bytes = bytes.len() as u64;
            file.checksum = Some(checksum(&bytes, settings.hash));

            if let Some(lang) = language {
                sources.push((rel.clone(), lang, content.into_owned()));
            }
            seen.insert(id);
        }

        let before = project.files.len();
        project.files.retain(|id, _| seen.contains(id));
        if project.files.len() < before {
            debug!("Dropped {} files no longer present", before - project.files.len());
            project
                .issues
                .retain(|_, issue| issue.file.as_ref().map_or(true, |f| seen.contains(f)));
        }

        rebuild_modules(project);
        rebuild_dependencies(project, &sources);
        Ok(())
    }
}

/// Walk the repository and return `(absolute, relative)` paths of the files
/// that pass every filter, sorted by relative path and capped at `max_files`.
pub fn collect_files(ctx: &AnalysisContext) -> Result<Vec<(PathBuf, String)>> {
    let root = &ctx.root;
    if !root.is_dir() {
        anyhow::bail!("Not a directory: {}", root.display());
    }
    let settings = &ctx.config.structure;
    let patterns = ctx.config.exclude.effective_patterns();
    let extensions: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect();

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(true)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(true)
        .require_git(false)
        .add_custom_ignore_filename(IGNORE_FILE_NAME);

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Walk error: {}", e);
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        let rel = normalize_path(
            path.strip_prefix(root)
                .with_context(|| format!("{} escapes the root", path.display()))?,
        );

        if crate::utils::is_excluded(&rel, &patterns) {
            continue;
        }
        if !extensions.is_empty() {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
                .unwrap_or_default();
            if !extensions.contains(&ext) {
                continue;
            }
        }
        if settings.max_file_bytes > 0 {
            let too_big = entry
                .metadata()
                .map(|m| m.len() > settings.max_file_bytes)
                .unwrap_or(false);
            if too_big {
                debug!("Skipping oversized file {}", rel);
                continue;
            }
        }
        files.push((path.to_path_buf(), rel));
    }

    files.sort_by(|a, b| a.1.cmp(&b.1));
    if settings.max_files > 0 && files.len() > settings.max_files {
        info!(
            "Limiting analysis to {} of {} files",
            settings.max_files,
            files.len()
        );
        files.truncate(settings.max_files);
    }
    Ok(files)
}

fn rebuild_modules(project: &mut Project) {
    let mut modules: BTreeMap<String, Module> = BTreeMap::new();
    for file in project.files.values() {
        let name = file.module_name();
        let module = modules
            .entry(module_id(&name))
            .or_insert_with(|| Module {
                id: module_id(&name),
                name: name.clone(),
                ..Default::default()
            });
        module.loc += file.loc;
        module.files.insert(file.id.clone());
    }
    project.modules = modules;
}

fn rebuild_dependencies(project: &mut Project, sources: &[(String, &'static str, String)]) {
    let tracked: BTreeSet<String> = project.files.values().map(|f| f.path.clone()).collect();
    let mut deps = BTreeSet::new();
    for (path, language, content) in sources {
        for target in extract_imports(language, content) {
            let resolved =
                resolve_import(language, path, &target, &tracked).map(|p| file_id(&p));
            deps.insert(DependencyEdge {
                source: file_id(path),
                target,
                resolved,
            });
        }
    }
    debug!(
        "Structure: {} import edges ({} resolved)",
        deps.len(),
        deps.iter().filter(|d| d.resolved.is_some()).count()
    );
    project.dependencies = deps;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn analyze(root: &Path, config: ProjectConfig) -> Project {
        let ctx = AnalysisContext::new(root, config).unwrap();
        let mut project = Project::new("demo", root);
        StructureAnalyzer.run(&mut project, &ctx).unwrap();
        project
    }

    #[test]
    fn test_files_and_modules() {
        let dir = tempdir().unwrap();
        write(dir.path(), "README.md", "# demo\n\ntext\n");
        write(dir.path(), "pkg/a.py", "import pkg.b\n\nx = 1\n");
        write(dir.path(), "pkg/b.py", "y = 2\n");

        let project = analyze(dir.path(), ProjectConfig::default());
        assert_eq!(project.files.len(), 3);
        let a = project.file_by_path("pkg/a.py").unwrap();
        assert_eq!(a.loc, 2);
        assert_eq!(a.language.as_deref(), Some("python"));
        assert!(a.checksum.as_deref().unwrap().starts_with("sha256:"));

        assert_eq!(project.modules.len(), 2);
        assert_eq!(project.modules["repo:module/pkg"].loc, 3);
        assert!(project.modules.contains_key("repo:module/."));

        assert!(project.dependencies.contains(&DependencyEdge {
            source: "repo:file/pkg/a.py".into(),
            target: "pkg.b".into(),
            resolved: Some("repo:file/pkg/b.py".into()),
        }));
    }

    #[test]
    fn test_exclusions_and_ignore_files() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/main.py", "print(1)\n");
        write(dir.path(), "node_modules/lib/index.js", "x\n");
        write(dir.path(), "generated/out.py", "x = 1\n");
        write(dir.path(), "scratch/tmp.py", "x = 1\n");
        write(dir.path(), IGNORE_FILE_NAME, "scratch/\n");

        let mut config = ProjectConfig::default();
        config.exclude.paths.push("generated/".into());
        let project = analyze(dir.path(), config);

        let paths: Vec<_> = project.files.values().map(|f| f.path.as_str()).collect();
        assert!(paths.contains(&"src/main.py"));
        assert!(!paths.iter().any(|p| p.starts_with("node_modules")));
        assert!(!paths.iter().any(|p| p.starts_with("generated")));
        assert!(!paths.iter().any(|p| p.starts_with("scratch")));
    }

    #[test]
    fn test_extensions_and_max_files() {
        let dir = tempdir().unwrap();
        for i in 0..5 {
            write(dir.path(), &format!("m{}.py", i), "x = 1\n");
        }
        write(dir.path(), "notes.txt", "hello\n");

        let mut config = ProjectConfig::default();
        config.structure.extensions = vec![".py".into()];
        config.structure.max_files = 3;
        let project = analyze(dir.path(), config);
        assert_eq!(project.files.len(), 3);
        assert!(project.files.values().all(|f| f.path.ends_with(".py")));
        // Deterministic selection: first three paths in sorted order
        assert!(project.file_by_path("m0.py").is_some());
        assert!(project.file_by_path("m4.py").is_none());
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.rs", "fn main() {}\n");
        write(dir.path(), "b/c.rs", "pub fn c() {}\n\n// end\n");

        let ctx = AnalysisContext::new(dir.path(), ProjectConfig::default()).unwrap();
        let mut project = Project::new("demo", dir.path());
        StructureAnalyzer.run(&mut project, &ctx).unwrap();
        let first = project.files.clone();
        StructureAnalyzer.run(&mut project, &ctx).unwrap();
        assert_eq!(project.files, first);
        assert_eq!(project.modules.len(), 2);
    }

    #[test]
    fn test_binary_files_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("blob.bin"), [0u8, 1, 2, 0, 3]).unwrap();
        write(dir.path(), "ok.py", "x = 1\n");
        let project = analyze(dir.path(), ProjectConfig::default());
        assert_eq!(project.files.len(), 1);
    }

    #[test]
    fn test_xxh3_checksum() {
        let dir = tempdir().unwrap();
        write(dir.path(), "ok.py", "x = 1\n");
        let mut config = ProjectConfig::default();
        config.structure.hash = crate::utils::HashAlgorithm::Xxh3;
        let project = analyze(dir.path(), config);
        let file = project.file_by_path("ok.py").unwrap();
        assert!(file.checksum.as_deref().unwrap().starts_with("xxh3:"));
    }
}
