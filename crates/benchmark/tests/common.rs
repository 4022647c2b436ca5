//! Shared fixtures for benchmark integration tests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub const HDFS_TEMPLATE: &str = "BLOCK* NameSystem.addStoredBlock: blockMap updated: <*>:<*> is added to <*> size <*>";

pub const HDFS_RAW_OUTPUT: &str = "The template is: BLOCK* NameSystem.addStoredBlock: blockMap updated: <*>:<*> is added to <*> size <*>. This means the IP/port pairs and IDs are abstracted.";

/// Write `content` to `name` inside `dir` and return the path.
#[allow(dead_code)]
pub fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
  let path = dir.join(name);
  std::fs::write(&path, content).expect("Failed to write fixture");
  path
}

/// Temp workspace with a `data` and a `results` directory.
#[allow(dead_code)]
pub fn workspace() -> (TempDir, PathBuf, PathBuf) {
  let temp = TempDir::new().expect("Failed to create temp dir");
  let data = temp.path().join("data");
  let results = temp.path().join("results");
  std::fs::create_dir_all(&data).expect("Failed to create data dir");
  (temp, data, results)
}
