use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_stack_kdl(&self, content: &str) {
        fs::write(self.root.path().join("stack.kdl"), content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_local_kdl(&self, content: &str) {
        fs::write(self.root.path().join("stack.local.kdl"), content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_bundle(&self, handler: &str) {
        let dist = self.root.path().join("dist");
        fs::create_dir_all(&dist).unwrap();
        fs::write(dist.join(format!("{}.zip", handler)), b"PK\x03\x04").unwrap();
    }

    /// 存在しないユーザー設定ファイルのパス
    pub fn missing_settings(&self) -> PathBuf {
        self.root.path().join("no-such-config.yaml")
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }
}
