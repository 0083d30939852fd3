//! Rewriting module references across a generated tree

use crate::materializer::write_atomic;
use crate::template_source::HISTORY_DIR;
use crate::{Result, SproutError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// Bytes inspected when deciding whether a file is binary
const BINARY_SNIFF_LEN: usize = 8000;

/// A freshly rendered module descriptor that replaces the tree's copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    /// File name at the root of the tree, e.g. `go.mod`
    pub file_name: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteStats {
    pub files_scanned: usize,
    pub files_rewritten: usize,
    pub binary_skipped: usize,
    pub descriptor_replaced: bool,
}

#[derive(Debug, Clone)]
pub struct SourceRewriter {
    extensions: Vec<String>,
    descriptor: Option<ModuleDescriptor>,
}

impl SourceRewriter {
    /// Rewriter for files whose extension is in `extensions` (without the dot)
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            descriptor: None,
        }
    }

    /// Replace the root-level descriptor wholesale instead of patching it
    pub fn with_descriptor(mut self, descriptor: ModuleDescriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    /// Replace every literal `old_module` with `new_module` in source files under `root`
    ///
    /// The first file that cannot be read or written aborts the walk; files
    /// already rewritten stay rewritten.
    pub fn rewrite_all(&self, root: &Path, old_module: &str, new_module: &str) -> Result<RewriteStats> {
        info!("Updating source files...");
        let mut stats = RewriteStats::default();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_history_dir(e));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("directory walk failed"));
                SproutError::io_at(path, source)
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            if let Some(descriptor) = self.descriptor_for(&entry) {
                write_atomic(entry.path(), descriptor.content.as_bytes())?;
                stats.descriptor_replaced = true;
                debug!(path = %entry.path().display(), "replaced module descriptor");
                continue;
            }

            if !self.is_source_file(entry.path()) {
                continue;
            }
            stats.files_scanned += 1;

            match rewrite_file(entry.path(), old_module, new_module)? {
                FileOutcome::Rewritten => stats.files_rewritten += 1,
                FileOutcome::Binary => stats.binary_skipped += 1,
                FileOutcome::Unchanged => {}
            }
        }

        if let Some(descriptor) = &self.descriptor {
            if !stats.descriptor_replaced {
                write_atomic(&root.join(&descriptor.file_name), descriptor.content.as_bytes())?;
                stats.descriptor_replaced = true;
            }
        }

        debug!(
            scanned = stats.files_scanned,
            rewritten = stats.files_rewritten,
            binary = stats.binary_skipped,
            "source rewrite complete"
        );
        Ok(stats)
    }

    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    fn descriptor_for(&self, entry: &DirEntry) -> Option<&ModuleDescriptor> {
        self.descriptor
            .as_ref()
            .filter(|d| entry.depth() == 1 && entry.file_name() == d.file_name.as_str())
    }
}

enum FileOutcome {
    Rewritten,
    Unchanged,
    Binary,
}

fn rewrite_file(path: &Path, old_module: &str, new_module: &str) -> Result<FileOutcome> {
    let bytes = fs::read(path).map_err(|e| SproutError::io_at(path, e))?;
    if is_binary(&bytes) {
        debug!(path = %path.display(), "skipping binary file");
        return Ok(FileOutcome::Binary);
    }

    let text = std::str::from_utf8(&bytes).map_err(|e| {
        SproutError::Encoding(format!(
            "{} is not valid UTF-8 (invalid byte at offset {})",
            path.display(),
            e.valid_up_to()
        ))
    })?;

    if old_module.is_empty() || old_module == new_module || !text.contains(old_module) {
        return Ok(FileOutcome::Unchanged);
    }

    write_atomic(path, text.replace(old_module, new_module).as_bytes())?;
    Ok(FileOutcome::Rewritten)
}

fn is_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(BINARY_SNIFF_LEN).any(|b| *b == 0)
}

fn is_history_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name() == HISTORY_DIR
}
