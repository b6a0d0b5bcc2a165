//! Include resolution.
//!
//! The grammar never touches the filesystem. An `INCLUDE` line asks the
//! resolver to turn the written name into a canonical path (used to detect
//! include cycles) and then to load the text behind that path.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

pub trait IncludeResolver {
    /// Maps an include name, as written, to the path that identifies it.
    fn resolve(&self, name: &str) -> PathBuf;

    /// Loads the source text at a resolved path.
    fn load(&self, path: &Path) -> io::Result<String>;
}

/// Drops `.` and folds `name/..` pairs without touching the filesystem, so
/// two spellings of one file resolve to the same path.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Resolves names relative to a root directory on disk.
#[derive(Debug, Clone)]
pub struct FileResolver {
    root: PathBuf,
}

impl FileResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves relative to the directory containing `file`.
    pub fn beside(file: &Path) -> Self {
        let root = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for FileResolver {
    fn default() -> Self {
        Self::new(".")
    }
}

impl IncludeResolver for FileResolver {
    fn resolve(&self, name: &str) -> PathBuf {
        normalize(&self.root.join(name))
    }

    fn load(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Serves includes from memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    files: HashMap<PathBuf, String>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert(name, content);
        self
    }

    pub fn insert(&mut self, name: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(normalize(&name.into()), content.into());
    }
}

impl IncludeResolver for MemoryResolver {
    fn resolve(&self, name: &str) -> PathBuf {
        normalize(Path::new(name))
    }

    fn load(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such include: {}", path.display()),
            )
        })
    }
}
