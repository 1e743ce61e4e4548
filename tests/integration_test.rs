//! End-to-end analysis through the library API

mod common;

use repoq::analyzers::AnalysisContext;
use repoq::config::ProjectConfig;
use repoq::models::{file_id, IssueKind, Project, Severity};
use repoq::pipeline::Pipeline;
use std::collections::BTreeMap;
use std::path::Path;

fn config() -> ProjectConfig {
    let mut config = ProjectConfig::default();
    config.complexity.external = false;
    config
}

fn analyze(root: &Path, pipeline: Pipeline, config: ProjectConfig) -> Project {
    let ctx = AnalysisContext::new(root, config).unwrap();
    let mut project = Project::new("fixture", root);
    let stats = pipeline.run(&mut project, &ctx);
    assert!(stats.failed.is_empty(), "failed stages: {:?}", stats.failed);
    project
}

#[test]
fn test_two_file_repo_end_to_end() {
    let dir = common::two_file_repo();
    let project = analyze(dir.path(), Pipeline::full(), config());

    assert_eq!(project.files.len(), 3);
    assert_eq!(project.commits.len(), 2);
    assert_eq!(project.contributors.len(), 1);

    assert_eq!(project.coupling.len(), 1);
    assert_eq!(
        project.coupling_weight(&file_id("big.py"), &file_id("small.py")),
        1
    );
    assert_eq!(
        project.coupling_weight(&file_id("small.py"), &file_id("big.py")),
        1
    );

    let big = project.file_by_path("big.py").unwrap();
    let small = project.file_by_path("small.py").unwrap();
    let idle = project.file_by_path("idle.py").unwrap();
    assert_eq!(big.churn, 150);
    assert_eq!(big.commit_count, 2);
    assert_eq!(small.churn, 10);
    assert_eq!(idle.churn, 0);
    assert_eq!(idle.hotness, 0.0);
    assert!(big.hotness > idle.hotness);
    assert!(big.hotness > small.hotness);
    for f in project.files.values() {
        assert!((0.0..=1.0).contains(&f.hotness), "{} = {}", f.path, f.hotness);
    }

    let person = project.contributors.values().next().unwrap();
    assert_eq!(person.name, "Ann Example");
    assert_eq!(person.commits, 2);
    assert_eq!(big.owner.as_deref(), Some(person.id.as_str()));

    let hotspot = &project.issues["repo:issue/hotspot/big.py"];
    assert_eq!(hotspot.kind, IssueKind::Hotspot);
    assert_eq!(hotspot.severity, Severity::High);
    assert!(!project
        .issues
        .contains_key("repo:issue/hotspot/idle.py"));

    // idle.py is untracked
    assert!(project
        .issues
        .values()
        .any(|i| i.kind == IssueKind::DirtyWorktree));
    assert!(project.git_head.is_some());
}

#[test]
fn test_structure_analysis_is_idempotent() {
    let dir = common::two_file_repo();
    std::fs::create_dir_all(dir.path().join("pkg")).unwrap();
    std::fs::write(dir.path().join("pkg/util.py"), "import big\n\ndef f(x):\n    return x\n").unwrap();

    let loc_map = |p: &Project| -> BTreeMap<String, usize> {
        p.files.values().map(|f| (f.id.clone(), f.loc)).collect()
    };

    let first = analyze(dir.path(), Pipeline::structure_only(), config());
    let second = analyze(dir.path(), Pipeline::structure_only(), config());
    assert_eq!(loc_map(&first), loc_map(&second));
    assert_eq!(
        first.modules.keys().collect::<Vec<_>>(),
        second.modules.keys().collect::<Vec<_>>()
    );

    // Re-running on the same aggregate changes nothing either
    let ctx = AnalysisContext::new(dir.path(), config()).unwrap();
    let mut again = first.clone();
    Pipeline::structure_only().run(&mut again, &ctx);
    assert_eq!(loc_map(&again), loc_map(&first));
    assert_eq!(again.issues.len(), first.issues.len());
}

#[test]
fn test_exclusion_globs_are_respected() {
    let dir = tempfile::tempdir().unwrap();
    for path in ["src/app.py", "gen/api_pb2.py", "src/gen/keep.py", "docs/notes.md"] {
        let full = dir.path().join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, "x = 1\n").unwrap();
    }
    let mut config = config();
    config.exclude.paths = vec!["gen/".into(), "*.md".into()];

    let project = analyze(dir.path(), Pipeline::structure_only(), config.clone());
    let paths: Vec<&str> = project.files.values().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["src/app.py", "src/gen/keep.py"]);
    for path in paths {
        assert!(!config.should_exclude(path));
    }
}

#[test]
fn test_max_files_is_respected() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..6 {
        std::fs::write(dir.path().join(format!("m{}.py", i)), "x = 1\n").unwrap();
    }
    let mut config = config();
    config.structure.max_files = 4;
    let project = analyze(dir.path(), Pipeline::structure_only(), config);
    assert_eq!(project.files.len(), 4);
}

#[test]
fn test_history_filters() {
    let dir = common::two_file_repo();

    let mut limited = config();
    limited.history.max_commits = 1;
    let project = analyze(dir.path(), Pipeline::full(), limited);
    assert_eq!(project.commits.len(), 1);
    // Only the rework commit is left, so nothing is coupled
    assert!(project.coupling.is_empty());

    let mut since = config();
    since.history.since = Some("2030-01-01".into());
    let project = analyze(dir.path(), Pipeline::full(), since);
    assert!(project.commits.is_empty());
    assert!(project.files.values().all(|f| f.hotness == 0.0));
}

#[test]
fn test_subdirectory_of_repository() {
    let dir = tempfile::tempdir().unwrap();
    let repo = git2::Repository::init(dir.path()).unwrap();
    common::commit(
        &repo,
        &[
            ("svc/a.py", &common::python_lines("a", 40, 0)),
            ("svc/b.py", &common::python_lines("b", 10, 0)),
            ("docs/guide.md", "# Guide\n"),
        ],
        "Add service",
        1_700_000_000,
    );
    common::commit(
        &repo,
        &[("svc/a.py", &common::python_lines("a", 40, 10))],
        "Tune a",
        1_700_086_400,
    );
    common::commit(&repo, &[("docs/guide.md", "# Guide\nMore\n")], "Docs", 1_700_172_800);

    let project = analyze(&dir.path().join("svc"), Pipeline::full(), config());
    let paths: Vec<&str> = project.files.values().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["a.py", "b.py"]);
    // The docs-only commit is outside the target
    assert_eq!(project.commits.len(), 2);

    let a = project.file_by_path("a.py").unwrap();
    assert_eq!(a.churn, 60);
    assert_eq!(a.commit_count, 2);
    assert!(a.owner.is_some());
    assert!(a.hotness > 0.0);
    assert_eq!(
        project.coupling_weight(&file_id("a.py"), &file_id("b.py")),
        1
    );
}
