//! Hermetic template fixtures for integration tests
//!
//! `TestTemplate` lays out a small skeleton application in a temporary
//! directory, shaped like the real template repository: sources importing
//! themselves by the template module id, both build file variants, an old
//! module descriptor and a fake `.git` directory.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const TEMPLATE_MODULE: &str = "myapp";

/// PNG signature plus a few bytes that happen to spell the module id
pub const BINARY_ASSET: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDRmyapp\0\x01";

pub struct TestTemplate {
    temp_dir: TempDir,
    root: PathBuf,
}

impl TestTemplate {
    /// Empty template directory
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create template dir");
        let root = temp_dir.path().join("skeleton");
        fs::create_dir_all(&root).expect("create template root");
        Self { temp_dir, root }
    }

    /// Skeleton importing itself as `module`
    pub fn skeleton(module: &str) -> Self {
        let template = Self::new();
        template.add_file(".git/HEAD", "ref: refs/heads/main\n");
        template.add_file(".git/config", "[core]\n\tbare = false\n");
        template.add_file("go.mod", &format!("module {module}\n\ngo 1.20\n\nrequire github.com/old/dep v0.1.0\n"));
        template.add_file("Makefile.mac", "## build: unix\nbuild:\n\tgo build -o tmp/app .\n");
        template.add_file("Makefile.windows", "## build: windows\nbuild:\n\tgo build -o tmp/app.exe .\n");
        template.add_file(
            "main.go",
            &format!("package main\n\nimport (\n\t\"{module}/data\"\n\t\"{module}/handlers\"\n)\n\nfunc main() {{}}\n"),
        );
        template.add_file(
            "handlers/handlers.go",
            &format!("package handlers\n\nimport \"{module}/data\"\n"),
        );
        template.add_file("data/models.go", "package data\n\ntype Model struct{}\n");
        template.add_file("README.md", &format!("# {module}\n"));
        template.add_bytes("public/images/logo.png", BINARY_ASSET);
        template
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn add_file(&self, rel: &str, content: &str) -> PathBuf {
        self.add_bytes(rel, content.as_bytes())
    }

    pub fn add_bytes(&self, rel: &str, content: &[u8]) -> PathBuf {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture dir");
        }
        fs::write(&path, content).expect("write fixture file");
        path
    }

    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.root.join(rel)).expect("remove fixture file");
    }

    /// A scratch directory outside the template for generated output
    pub fn workspace(&self) -> PathBuf {
        let dir = self.temp_dir.path().join("workspace");
        fs::create_dir_all(&dir).expect("create workspace");
        dir
    }
}

/// Every file under `root`, relative, sorted
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

/// Entries directly under `dir`
pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
