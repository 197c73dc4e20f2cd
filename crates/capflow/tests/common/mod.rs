use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_services(&self, content: &str) -> PathBuf {
        let path = self.services_file();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn services_file(&self) -> PathBuf {
        self.root.path().join("services.json")
    }

    #[allow(dead_code)]
    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }
}
