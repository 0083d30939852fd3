//! Acquiring the template tree
//!
//! A [`TemplateFetcher`] populates an empty destination directory with the
//! template. [`GitTemplateSource`] performs a shallow clone through the
//! `git` binary; [`LocalTemplateSource`] copies a directory already on disk.
//! Neither removes version-control metadata; call [`strip_history`] for that.

use crate::generator::STAGING_PREFIX;
use crate::{Result, SproutError};
use async_trait::async_trait;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};
use walkdir::{DirEntry, WalkDir};

/// Name of the version-control metadata directory
pub const HISTORY_DIR: &str = ".git";

#[async_trait]
pub trait TemplateFetcher: Send + Sync {
    /// Populate `dest`, which must be absent or empty
    async fn acquire(&self, dest: &Path) -> Result<()>;

    /// Human-readable origin, used in logs and reports
    fn describe(&self) -> String;
}

/// Shallow (depth 1) clone of a remote repository
#[derive(Debug, Clone)]
pub struct GitTemplateSource {
    url: String,
    branch: Option<String>,
    timeout: Option<Duration>,
    git: String,
}

impl GitTemplateSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            branch: None,
            timeout: None,
            git: "git".to_string(),
        }
    }

    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a different git executable
    pub fn with_git_binary(mut self, git: impl Into<String>) -> Self {
        self.git = git.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn clone_args(&self, dest: &Path) -> Vec<String> {
        let mut args = vec![
            "clone".to_string(),
            "--depth".to_string(),
            "1".to_string(),
        ];
        if let Some(branch) = &self.branch {
            args.push("--branch".to_string());
            args.push(branch.clone());
        }
        args.push("--".to_string());
        args.push(self.url.clone());
        args.push(dest.to_string_lossy().to_string());
        args
    }
}

#[async_trait]
impl TemplateFetcher for GitTemplateSource {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn acquire(&self, dest: &Path) -> Result<()> {
        ensure_empty_destination(dest)?;
        info!("Cloning repository...");

        let mut cmd = Command::new(&self.git);
        cmd.args(self.clone_args(dest))
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| {
                    SproutError::SourceUnavailable(format!(
                        "cloning {} timed out after {}s",
                        self.url,
                        limit.as_secs()
                    ))
                })?,
            None => cmd.output().await,
        }
        .map_err(|e| {
            SproutError::SourceUnavailable(format!("could not run {}: {}", self.git, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SproutError::SourceUnavailable(format!(
                "git clone of {} failed ({}): {}",
                self.url,
                output.status,
                stderr.trim()
            )));
        }

        debug!(dest = %dest.display(), "clone complete");
        Ok(())
    }

    fn describe(&self) -> String {
        match &self.branch {
            Some(branch) => format!("{} ({})", self.url, branch),
            None => self.url.clone(),
        }
    }
}

/// Copy of a template tree that already exists on disk
#[derive(Debug, Clone)]
pub struct LocalTemplateSource {
    root: PathBuf,
}

impl LocalTemplateSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Copy the template into `dest`
    ///
    /// `dest` itself and sprout's scratch directories are skipped, so the
    /// destination may live inside the template.
    fn copy_tree(&self, dest: &Path) -> Result<()> {
        let root = self.root.canonicalize().map_err(|e| {
            SproutError::SourceUnavailable(format!(
                "template directory {} is not usable: {}",
                self.root.display(),
                e
            ))
        })?;
        let excluded = absolute_path(dest);

        let walker = WalkDir::new(&root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.path() != excluded && !is_scratch(e));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&root).to_path_buf();
                SproutError::io_at(path, io::Error::other(e.to_string()))
            })?;
            let relative = entry
                .path()
                .strip_prefix(&root)
                .map_err(|e| SproutError::io_at(entry.path(), io::Error::other(e)))?;
            let target = dest.join(relative);

            let file_type = entry.file_type();
            if file_type.is_dir() {
                fs::create_dir_all(&target).map_err(|e| SproutError::io_at(&target, e))?;
            } else if file_type.is_file() {
                fs::copy(entry.path(), &target).map_err(|e| SproutError::io_at(&target, e))?;
            } else if file_type.is_symlink() {
                copy_symlink(entry.path(), &target)?;
            } else {
                warn!(path = %entry.path().display(), "skipping special file in template");
            }
        }
        Ok(())
    }
}

/// Scratch entries left by a run in progress or an interrupted one
fn is_scratch(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(STAGING_PREFIX))
}

/// `path` with its parent resolved, for comparing against walked paths
fn absolute_path(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

/// Recreate the link itself, pointing where the template's link points
#[cfg(unix)]
fn copy_symlink(source: &Path, target: &Path) -> Result<()> {
    let link = fs::read_link(source).map_err(|e| SproutError::io_at(source, e))?;
    std::os::unix::fs::symlink(&link, target).map_err(|e| SproutError::io_at(target, e))
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, _target: &Path) -> Result<()> {
    warn!(path = %source.display(), "skipping symlink in template");
    Ok(())
}

#[async_trait]
impl TemplateFetcher for LocalTemplateSource {
    async fn acquire(&self, dest: &Path) -> Result<()> {
        if !self.root.is_dir() {
            return Err(SproutError::SourceUnavailable(format!(
                "template directory {} does not exist",
                self.root.display()
            )));
        }
        ensure_empty_destination(dest)?;
        info!(from = %self.root.display(), "Copying template...");

        self.copy_tree(dest)
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Delete the version-control metadata at the root of `dest`
///
/// Absence counts as success, so this can run any number of times.
pub fn strip_history(dest: &Path) -> Result<()> {
    let history = dest.join(HISTORY_DIR);
    let result = match fs::symlink_metadata(&history) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(&history),
        Ok(_) => fs::remove_file(&history),
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            debug!(path = %history.display(), "removed history");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SproutError::io_at(history, e)),
    }
}

fn ensure_empty_destination(dest: &Path) -> Result<()> {
    match fs::read_dir(dest) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                return Err(SproutError::SourceUnavailable(format!(
                    "destination {} already contains files",
                    dest.display()
                )));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SproutError::SourceUnavailable(format!(
            "destination {} is not usable: {}",
            dest.display(),
            e
        ))),
    }
}
