//! Integration tests for the repolint binary.
//!
//! These tests exercise the full CLI against real git repositories.

use std::path::Path;
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Workspace with an empty config file so user config never leaks in.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("config.toml"), "").unwrap();
        Self { dir }
    }

    fn root(&self) -> std::path::PathBuf {
        self.dir.path().join("src")
    }

    fn config(&self) -> std::path::PathBuf {
        self.dir.path().join("config.toml")
    }

    fn set_config(&self, contents: &str) {
        std::fs::write(self.config(), contents).unwrap();
    }

    /// Create a committed repository at `src/<name>`.
    fn repo(&self, name: &str) -> std::path::PathBuf {
        let path = self.root().join(name);
        std::fs::create_dir_all(&path).unwrap();
        run_git(&path, &["init", "-q"]);
        run_git(&path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        run_git(&path, &["config", "user.email", "test@example.com"]);
        run_git(&path, &["config", "user.name", "Test User"]);
        run_git(&path, &["config", "commit.gpgsign", "false"]);
        std::fs::write(path.join("README.md"), "# Test\n").unwrap();
        run_git(&path, &["add", "README.md"]);
        run_git(&path, &["commit", "-q", "-m", "Initial commit"]);
        path
    }

    fn repolint(&self) -> Command {
        let mut cmd = Command::cargo_bin("repolint").unwrap();
        cmd.env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.config())
            .arg(self.root());
        cmd
    }
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

#[test]
fn help_flag_works() {
    Command::cargo_bin("repolint")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("hygiene"));
}

#[test]
fn local_branch_without_upstream_fails() {
    let ws = Workspace::new();
    ws.repo("app");

    ws.repolint()
        .assert()
        .code(1)
        .stdout(predicate::str::contains("app\n"))
        .stdout(predicate::str::contains("  error\tupstream\t\tmain"));
}

#[test]
fn disabled_rules_give_clean_report() {
    let ws = Workspace::new();
    ws.repo("app");
    ws.set_config("disabled_rules = [\"upstream\"]\n");

    ws.repolint()
        .assert()
        .success()
        .stdout(predicate::str::contains("  OK"));
}

#[test]
fn quiet_hides_clean_repositories() {
    let ws = Workspace::new();
    ws.repo("app");
    ws.set_config("disabled_rules = [\"upstream\"]\n");

    ws.repolint()
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn uncommitted_files_listed() {
    let ws = Workspace::new();
    let repo = ws.repo("app");
    std::fs::write(repo.join("a.txt"), "a").unwrap();
    std::fs::write(repo.join("b.txt"), "b").unwrap();
    ws.set_config("disabled_rules = [\"upstream\"]\n");

    ws.repolint()
        .assert()
        .code(1)
        .stdout(predicate::str::contains("error\tno-uncommitted\t\ta.txt"))
        .stdout(predicate::str::contains("error\tno-uncommitted\t\tb.txt"));
}

#[test]
fn broken_repository_does_not_stop_scan() {
    let ws = Workspace::new();
    let broken = ws.root().join("broken");
    std::fs::create_dir_all(broken.join(".git")).unwrap();
    ws.repo("good");
    ws.set_config("disabled_rules = [\"upstream\"]\n");

    ws.repolint()
        .assert()
        .code(1)
        .stdout(predicate::str::contains("error\tnot-repo"))
        .stdout(predicate::str::contains("good\n  OK"));
}

#[test]
fn not_repo_safe_keeps_exit_zero() {
    let ws = Workspace::new();
    std::fs::create_dir_all(ws.root().join("broken/.git")).unwrap();
    ws.set_config("not_repo_safe = true\n");

    ws.repolint()
        .assert()
        .success()
        .stdout(predicate::str::contains("warning\tnot-repo"));
}

#[test]
fn unreadable_repository_fails_despite_not_repo_safe() {
    let ws = Workspace::new();
    let repo = ws.repo("app");
    let oid = "abcdef0123456789abcdef0123456789abcdef01";
    let objects = repo.join(".git/objects").join(&oid[..2]);
    std::fs::create_dir_all(&objects).unwrap();
    std::fs::write(objects.join(&oid[2..]), "not zlib data").unwrap();
    std::fs::write(repo.join(".git/refs/heads/broken"), format!("{}\n", oid)).unwrap();
    ws.set_config("not_repo_safe = true\n");

    ws.repolint()
        .assert()
        .code(1)
        .stdout(predicate::str::contains("  error\tsnapshot\t\t"))
        .stdout(predicate::str::contains("not-repo").not());
}

#[test]
fn json_output_one_line_per_repository() {
    let ws = Workspace::new();
    ws.repo("a");
    ws.repo("b");

    let output = ws.repolint().arg("--json").assert().code(1).get_output().clone();
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);

    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert!(first["path"].as_str().unwrap().ends_with("a"));
    assert_eq!(first["all_safe"], false);
    assert_eq!(first["failures"][0]["rule"], "upstream");
    assert_eq!(first["failures"][0]["kind"], "lint");
}

#[test]
fn ignored_directories_are_skipped() {
    let ws = Workspace::new();
    ws.repo("node_modules/dep");

    ws.repolint()
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn invalid_config_is_fatal() {
    let ws = Workspace::new();
    ws.set_config("disabled_rules = [\"no-such-rule\"]\n");

    ws.repolint()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn missing_root_is_fatal() {
    let ws = Workspace::new();
    Command::cargo_bin("repolint")
        .unwrap()
        .arg("--config")
        .arg(ws.config())
        .arg(ws.dir.path().join("nope"))
        .assert()
        .code(2);
}
