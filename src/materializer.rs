//! Writing generated files into the project tree
//!
//! Writes go through a temporary file in the destination directory which
//! is then renamed over the target, so a target is either left untouched
//! or fully replaced. A crash between the write and the rename can leave a
//! stray `.sprout-write*` file behind but never a truncated target.

use crate::{Result, SproutError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Prefix of the temporary file a write goes through
pub const WRITE_PREFIX: &str = ".sprout-write";

/// Permissions of a file produced by [`write_atomic_with`]
#[derive(Debug, Clone)]
pub enum FileMode {
    /// Keep the target's current permissions; a new file gets the umask default
    Inherit,
    /// Exactly these permissions
    Exact(fs::Permissions),
    /// Readable and writable by the owner only
    Private,
}

/// Create or replace `path` with `content`, keeping the target's permissions
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    write_atomic_with(path, content, FileMode::Inherit)
}

/// Create or replace `path` with `content` and the given permissions
pub fn write_atomic_with(path: &Path, content: &[u8], mode: FileMode) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| SproutError::io_at(parent, e))?;

    let private = matches!(mode, FileMode::Private);
    let exact = match mode {
        FileMode::Inherit => match fs::metadata(path) {
            Ok(meta) => Some(meta.permissions()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(SproutError::io_at(path, e)),
        },
        FileMode::Exact(permissions) => Some(permissions),
        FileMode::Private => None,
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(WRITE_PREFIX);
    if exact.is_none() && !private {
        with_default_permissions(&mut builder);
    }
    let mut tmp = builder
        .tempfile_in(parent)
        .map_err(|e| SproutError::io_at(parent, e))?;

    tmp.write_all(content)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| SproutError::io_at(path, e))?;
    if let Some(permissions) = exact {
        tmp.as_file()
            .set_permissions(permissions)
            .map_err(|e| SproutError::io_at(path, e))?;
    }
    tmp.persist(path)
        .map_err(|e| SproutError::io_at(path, e.error))?;

    debug!(path = %path.display(), bytes = content.len(), "wrote file");
    Ok(())
}

/// `0o666` filtered through the process umask, like a plain `fs::write`
#[cfg(unix)]
fn with_default_permissions(builder: &mut tempfile::Builder<'_, '_>) {
    use std::os::unix::fs::PermissionsExt;
    builder.permissions(fs::Permissions::from_mode(0o666));
}

#[cfg(not(unix))]
fn with_default_permissions(_builder: &mut tempfile::Builder<'_, '_>) {}

/// Host family a build descriptor variant targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    /// The platform of the executing host
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "windows" | "win" => Some(Platform::Windows),
            "unix" | "linux" | "mac" | "macos" | "darwin" => Some(Platform::Unix),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows => write!(f, "windows"),
            Platform::Unix => write!(f, "unix"),
        }
    }
}

/// Names of the canonical build descriptor and its per-platform variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFiles {
    pub canonical: String,
    pub windows: String,
    pub unix: String,
}

impl Default for BuildFiles {
    fn default() -> Self {
        Self {
            canonical: "Makefile".to_string(),
            windows: "Makefile.windows".to_string(),
            unix: "Makefile.mac".to_string(),
        }
    }
}

impl BuildFiles {
    pub fn variant(&self, platform: Platform) -> &str {
        match platform {
            Platform::Windows => &self.windows,
            Platform::Unix => &self.unix,
        }
    }

    pub fn variants(&self) -> [&str; 2] {
        [&self.windows, &self.unix]
    }
}

/// Install the variant for `platform` as the canonical build file
///
/// The canonical file takes the selected variant's permissions.
/// Both variants are removed afterwards whether or not the copy succeeded.
/// A failure to read or write the selected variant is returned; failures to
/// remove variants are only logged.
pub fn select_build_file(root: &Path, files: &BuildFiles, platform: Platform) -> Result<PathBuf> {
    let source = root.join(files.variant(platform));
    let target = root.join(&files.canonical);

    let copied = fs::read(&source)
        .and_then(|content| Ok((content, fs::metadata(&source)?.permissions())))
        .map_err(|e| SproutError::io_at(&source, e))
        .and_then(|(content, permissions)| {
            write_atomic_with(&target, &content, FileMode::Exact(permissions))
        });

    for variant in files.variants() {
        remove_variant(&root.join(variant));
    }

    copied?;
    debug!(
        platform = %platform,
        from = %source.display(),
        to = %target.display(),
        "selected build file"
    );
    Ok(target)
}

fn remove_variant(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove build file variant"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project_with_variants() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Makefile.windows"), "windows build\n").unwrap();
        fs::write(temp_dir.path().join("Makefile.mac"), "unix build\n").unwrap();
        temp_dir
    }

    fn leftover_temp_files(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(WRITE_PREFIX))
            .count()
    }

    #[test]
    fn test_write_atomic_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(".env");

        write_atomic(&path, b"APP_NAME=bar\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "APP_NAME=bar\n");
        assert_eq!(leftover_temp_files(path.parent().unwrap()), 0);
    }

    #[test]
    fn test_write_atomic_truncates_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("go.mod");
        fs::write(&path, "module skeleton/app\n\ngo 1.21\nrequire lots of stuff\n").unwrap();

        write_atomic(&path, b"module bar\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "module bar\n");
    }

    #[test]
    fn test_select_build_file_for_each_platform() {
        for (platform, expected) in [
            (Platform::Unix, "unix build\n"),
            (Platform::Windows, "windows build\n"),
        ] {
            let temp_dir = project_with_variants();
            let files = BuildFiles::default();

            let target = select_build_file(temp_dir.path(), &files, platform).unwrap();

            assert_eq!(target, temp_dir.path().join("Makefile"));
            assert_eq!(fs::read_to_string(&target).unwrap(), expected);
            assert!(!temp_dir.path().join("Makefile.windows").exists());
            assert!(!temp_dir.path().join("Makefile.mac").exists());
        }
    }

    #[test]
    fn test_missing_variant_still_cleans_up() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Makefile.windows"), "windows build\n").unwrap();

        let result = select_build_file(temp_dir.path(), &BuildFiles::default(), Platform::Unix);

        match result {
            Err(SproutError::PathIo { path, .. }) => {
                assert_eq!(path, temp_dir.path().join("Makefile.mac"));
            }
            other => panic!("expected PathIo, got {:?}", other),
        }
        assert!(!temp_dir.path().join("Makefile.windows").exists());
        assert!(!temp_dir.path().join("Makefile").exists());
    }

    #[cfg(unix)]
    fn mode_of(path: &Path) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_keeps_existing_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let script = temp_dir.path().join("build.sh");
        fs::write(&script, "#!/bin/sh\necho myapp\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        write_atomic(&script, b"#!/bin/sh\necho bar\n").unwrap();

        assert_eq!(mode_of(&script), 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn test_new_files_match_plain_write_mode() {
        let temp_dir = TempDir::new().unwrap();
        let reference = temp_dir.path().join("reference");
        fs::write(&reference, "x").unwrap();
        let created = temp_dir.path().join("created");

        write_atomic(&created, b"x").unwrap();

        assert_eq!(mode_of(&created), mode_of(&reference));
    }

    #[cfg(unix)]
    #[test]
    fn test_private_and_exact_modes() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let secret = temp_dir.path().join(".env");
        fs::write(&secret, "old").unwrap();
        write_atomic_with(&secret, b"KEY=abc\n", FileMode::Private).unwrap();
        assert_eq!(mode_of(&secret), 0o600);

        let exact = temp_dir.path().join("Makefile");
        write_atomic_with(&exact, b"all:\n", FileMode::Exact(fs::Permissions::from_mode(0o750)))
            .unwrap();
        assert_eq!(mode_of(&exact), 0o750);
    }

    #[cfg(unix)]
    #[test]
    fn test_select_build_file_carries_variant_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = project_with_variants();
        let variant = temp_dir.path().join("Makefile.mac");
        fs::set_permissions(&variant, fs::Permissions::from_mode(0o644)).unwrap();

        let target = select_build_file(temp_dir.path(), &BuildFiles::default(), Platform::Unix).unwrap();

        assert_eq!(mode_of(&target), 0o644);
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!(Platform::parse("Windows"), Some(Platform::Windows));
        assert_eq!(Platform::parse("macos"), Some(Platform::Unix));
        assert_eq!(Platform::parse("linux"), Some(Platform::Unix));
        assert_eq!(Platform::parse("plan9"), None);
        assert_eq!(Platform::Unix.to_string(), "unix");
    }
}
