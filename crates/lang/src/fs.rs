use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Filesystem used by `@include`. Implementations only need to hand back the
/// bytes for a path; handles are never held open across calls.
pub trait ScriptFS: Send + Sync {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Reads includes from the process filesystem.
#[derive(Debug, Default)]
pub struct StdScriptFS;

impl ScriptFS for StdScriptFS {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// In-memory filesystem for tests and embedders that carry their scripts as
/// data.
#[derive(Debug, Default)]
pub struct MemFS {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemFS {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), contents.into());
    }

    pub fn with(mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }
}

impl ScriptFS for MemFS {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })
    }
}
