//! Shared helpers for CLI specs

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const STORE_HEADER: &str = "id,parent_id,description,performance,status";

/// A temporary project directory with a config and seed
pub struct Project {
    dir: TempDir,
}

impl Project {
    /// Empty directory, no config
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Project with a seed file and quick sh-based agents
    pub fn with_defaults() -> Self {
        let project = Self::empty();
        project.file("seed.py", "def solve():\n    return 1\n");
        project.config(&default_config("echo 1.25"));
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, rel: &str, content: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn config(&self, content: &str) {
        self.file("evoq.toml", content);
    }

    /// Write a job table with the given data rows
    pub fn store_with(&self, rows: &[&str]) {
        let mut text = String::from(STORE_HEADER);
        text.push('\n');
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        self.file("jobs.csv", &text);
    }

    pub fn store_text(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("jobs.csv")).unwrap()
    }

    /// CLI command rooted in this project
    pub fn evoq(&self) -> Command {
        let mut cmd = Command::cargo_bin("evoq").unwrap();
        cmd.current_dir(self.dir.path());
        cmd.env("EVOQ_LOG", "warn");
        cmd
    }

    /// Path to the built binary, for raw std::process spawns
    pub fn bin() -> PathBuf {
        assert_cmd::cargo::cargo_bin("evoq")
    }
}

/// Minimal config: an in-place mutation agent plus the given evaluator
pub fn default_config(evaluator: &str) -> String {
    format!(
        r#"
[queue]
store = "jobs.csv"
artifacts = "artifacts"
seed = "seed.py"

[[provider.mutate]]
name = "appender"
run = "echo '# mutated' >> {{artifact}}; echo ok"

[evaluator]
run = "{evaluator}"
"#
    )
}

/// Poll until the condition holds or the timeout expires
pub fn wait_for(timeout_ms: u64, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + std::time::Duration::from_millis(timeout_ms);
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
    false
}
