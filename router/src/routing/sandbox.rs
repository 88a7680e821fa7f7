//! Sandbox root and path normalization

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Directory that every subprocess-routed path is confined to
#[derive(Debug, Clone)]
pub struct SandboxRoot {
    /// Canonical absolute directory
    absolute: PathBuf,
    /// Spelling used when rewriting request paths (e.g. `workspace`)
    prefix: String,
}

impl SandboxRoot {
    /// Create the directory if absent and resolve it
    pub fn prepare(root: &Path) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::SandboxRoot {
            path: root.to_path_buf(),
            reason,
        };

        let prefix = clean_prefix(&root.to_string_lossy());
        if prefix.is_empty() || prefix == "/" {
            return Err(invalid("root must name a directory".to_string()));
        }

        std::fs::create_dir_all(root).map_err(|e| invalid(e.to_string()))?;
        let absolute = root.canonicalize().map_err(|e| invalid(e.to_string()))?;
        if !absolute.is_dir() {
            return Err(invalid("not a directory".to_string()));
        }

        tracing::debug!("Sandbox root: {} ({})", prefix, absolute.display());
        Ok(Self { absolute, prefix })
    }

    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// Rewrites `path` parameters so they stay under the sandbox prefix
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    prefix: String,
}

impl PathNormalizer {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: clean_prefix(prefix),
        }
    }

    pub fn for_root(root: &SandboxRoot) -> Self {
        Self::new(root.prefix())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Root `path` under the prefix exactly once.
    ///
    /// `.` and `..` are resolved lexically and `..` never climbs above the
    /// prefix, so the result cannot escape it.
    pub fn normalize(&self, path: &str) -> String {
        let path = path.trim_start_matches("./");
        let relative = if path == self.prefix {
            ""
        } else {
            match path.strip_prefix(self.prefix.as_str()) {
                Some(rest) if rest.starts_with('/') => rest,
                _ => path,
            }
        };

        let mut parts: Vec<&str> = Vec::new();
        for segment in relative.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                other => parts.push(other),
            }
        }

        match (self.prefix.is_empty(), parts.is_empty()) {
            (_, true) => self.prefix.clone(),
            (true, false) => parts.join("/"),
            (false, false) if self.prefix == "/" => format!("/{}", parts.join("/")),
            (false, false) => format!("{}/{}", self.prefix, parts.join("/")),
        }
    }

    /// Normalize a string `path` entry in place; other keys are untouched
    pub fn normalize_parameters(&self, parameters: &mut Map<String, Value>) {
        if let Some(Value::String(path)) = parameters.get_mut("path") {
            let normalized = self.normalize(path);
            if normalized != *path {
                tracing::debug!("Normalized path '{}' -> '{}'", path, normalized);
                *path = normalized;
            }
        }
    }
}

/// Collapse `./`, duplicate and trailing separators, keeping a leading `/`
fn clean_prefix(raw: &str) -> String {
    let absolute = raw.starts_with('/');
    let parts: Vec<&str> = raw
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    match (absolute, parts.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", parts.join("/")),
        (false, _) => parts.join("/"),
    }
}
