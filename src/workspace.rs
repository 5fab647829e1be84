//! Local checkout scanning

use crate::analysis::FileTarget;
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Extensions to analyze, without the leading dot
    pub extensions: Vec<String>,
    /// Files above this size are skipped
    pub max_file_size: u64,
    pub max_depth: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["py".to_string()],
            max_file_size: 1024 * 1024,
            max_depth: 32,
        }
    }
}

pub struct WorkspaceScanner {
    root: PathBuf,
    config: ScanConfig,
}

impl WorkspaceScanner {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            anyhow::bail!("Repository path does not exist: {}", root.display());
        }
        if !root.is_dir() {
            anyhow::bail!("Repository path is not a directory: {}", root.display());
        }
        let root = root
            .canonicalize()
            .context("Failed to canonicalize repository path")?;

        debug!(root = %root.display(), "WorkspaceScanner initialized");
        Ok(Self {
            root,
            config: ScanConfig::default(),
        })
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Project name derived from the directory name
    pub fn project_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "repository".to_string())
    }

    fn walker(&self) -> ignore::Walk {
        WalkBuilder::new(&self.root)
            .max_depth(Some(self.config.max_depth))
            .hidden(true)
            .git_ignore(true)
            .require_git(false)
            .build()
    }

    /// Reads every matching file, keyed by its `/`-separated relative path.
    /// Non-UTF-8 and oversized files are skipped.
    pub fn scan(&self) -> Result<Vec<FileTarget>> {
        let mut targets = Vec::new();

        for result in self.walker() {
            let entry = match result {
                Ok(e) => e,
                Err(err) => {
                    warn!(error = %err, "Failed to read directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() || !self.has_wanted_extension(path) {
                continue;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if size > self.config.max_file_size {
                debug!(path = %path.display(), size, "Skipping oversized file");
                continue;
            }

            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Skipping unreadable file");
                    continue;
                }
            };

            let relative = self.relative_path(path);
            trace!(path = %relative, "Added file");
            targets.push(FileTarget::new(relative, content));
        }

        targets.sort_by(|a, b| a.path.cmp(&b.path));
        info!(files = targets.len(), root = %self.root.display(), "Workspace scan complete");
        Ok(targets)
    }

    /// Indented tree of the repository, directories suffixed with `/`
    pub fn project_structure(&self) -> String {
        let mut tree: BTreeMap<String, bool> = BTreeMap::new();
        for entry in self.walker().flatten() {
            if entry.depth() == 0 {
                continue;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            tree.insert(self.relative_path(entry.path()), is_dir);
        }

        let mut rendered = format!("{}/\n", self.project_name());
        for (path, is_dir) in tree {
            let depth = path.matches('/').count() + 1;
            let name = path.rsplit('/').next().unwrap_or(&path);
            rendered.push_str(&"  ".repeat(depth));
            rendered.push_str(name);
            if is_dir {
                rendered.push('/');
            }
            rendered.push('\n');
        }
        rendered
    }

    fn has_wanted_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                self.config
                    .extensions
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}
