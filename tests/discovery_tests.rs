
use std::path::PathBuf;

use pgit::discovery::discover_repositories;
use pgit::PgitError;
use tempfile::TempDir;

use test_harness::{make_dir, make_repo};

fn names(repos: &[PathBuf]) -> Vec<String> {
    repos
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_only_repositories_are_returned() {
    let root = TempDir::new().unwrap();
    make_repo(root.path(), "beta");
    make_repo(root.path(), "alpha");
    make_dir(root.path(), "plain");
    std::fs::write(root.path().join("notes.txt"), "not a dir").unwrap();

    let repos = discover_repositories(root.path(), &[]).unwrap();

    assert_eq!(names(&repos), vec!["alpha", "beta"]);
    assert_eq!(repos[0], root.path().join("alpha"));
}

#[test]
fn test_git_file_marks_a_worktree() {
    let root = TempDir::new().unwrap();
    let dir = make_dir(root.path(), "worktree");
    std::fs::write(dir.join(".git"), "gitdir: ../main/.git/worktrees/x\n").unwrap();

    let repos = discover_repositories(root.path(), &[]).unwrap();

    assert_eq!(names(&repos), vec!["worktree"]);
}

#[test]
fn test_bare_repository_directories_are_skipped() {
    let root = TempDir::new().unwrap();
    make_repo(root.path(), "mirror.git");
    make_repo(root.path(), "work");

    let repos = discover_repositories(root.path(), &[]).unwrap();

    assert_eq!(names(&repos), vec!["work"]);
}

#[test]
fn test_exclude_is_case_insensitive() {
    let root = TempDir::new().unwrap();
    make_repo(root.path(), "foo");
    make_repo(root.path(), "Vendor");
    make_repo(root.path(), "keep");

    let exclude = vec!["Foo".to_string(), "VENDOR".to_string()];
    let repos = discover_repositories(root.path(), &exclude).unwrap();

    assert_eq!(names(&repos), vec!["keep"]);
}

#[test]
fn test_empty_root() {
    let root = TempDir::new().unwrap();
    assert!(discover_repositories(root.path(), &[]).unwrap().is_empty());
}

#[test]
fn test_missing_root_is_an_error() {
    let root = TempDir::new().unwrap();
    let missing = root.path().join("missing");

    let err = discover_repositories(&missing, &[]).unwrap_err();

    match err {
        PgitError::Discovery { path, .. } => assert_eq!(path, missing),
        other => panic!("expected discovery error, got {:?}", other),
    }
}
