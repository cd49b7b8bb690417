use std::path::{Path, PathBuf};

/// A per-process scratch directory, emptied on creation and removed on
/// drop so a failing test leaves nothing behind.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("tourbuddy-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&path);
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir_is_removed_on_drop_even_after_panic() {
        let dir = TempDir::new("guard");
        let path = dir.path().to_path_buf();
        let result = std::panic::catch_unwind(move || {
            std::fs::create_dir_all(dir.path()).unwrap();
            std::fs::write(dir.path().join("file"), "x").unwrap();
            panic!("test body failed");
        });
        assert!(result.is_err());
        assert!(!path.exists());
    }
}
