use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use fauxgen_core::Node;

use crate::errors::EvalError;

/// Collaborator that turns import paths into programs.
pub trait SourceLoader {
    /// Canonical key for `path` as written in `importer` (none for the entry program).
    fn resolve(&self, path: &str, importer: Option<&Path>) -> Result<PathBuf, EvalError>;

    /// Parsed program stored under a resolved key.
    fn load(&self, resolved: &Path) -> Result<Node, EvalError>;
}

/// Loader for hosts that do not support imports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoImports;

impl SourceLoader for NoImports {
    fn resolve(&self, path: &str, _importer: Option<&Path>) -> Result<PathBuf, EvalError> {
        Err(EvalError::ParseDelegation(format!(
            "cannot import {path:?}: imports are not available"
        )))
    }

    fn load(&self, resolved: &Path) -> Result<Node, EvalError> {
        Err(EvalError::ParseDelegation(format!(
            "cannot load {}: imports are not available",
            resolved.display()
        )))
    }
}

/// Programs registered up front, keyed by path.
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    programs: HashMap<PathBuf, Node>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, path: impl AsRef<Path>, program: Node) -> Self {
        self.programs
            .insert(normalize(Path::new("/"), path.as_ref()), program);
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn resolve(&self, path: &str, importer: Option<&Path>) -> Result<PathBuf, EvalError> {
        let base = importer
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new("/"));
        Ok(normalize(base, Path::new(path)))
    }

    fn load(&self, resolved: &Path) -> Result<Node, EvalError> {
        self.programs.get(resolved).cloned().ok_or_else(|| {
            EvalError::ParseDelegation(format!("no program at {}", resolved.display()))
        })
    }
}

/// Join `path` onto `base` and fold `.`/`..` without touching the filesystem.
pub fn normalize(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_to_the_importer() {
        let loader = MemoryLoader::new();
        let resolved = loader
            .resolve("../shared/people.json", Some(Path::new("/app/models/main.json")))
            .expect("resolve");
        assert_eq!(resolved, PathBuf::from("/app/shared/people.json"));

        let top = loader.resolve("./a.json", None).expect("resolve");
        assert_eq!(top, PathBuf::from("/a.json"));
    }
}
