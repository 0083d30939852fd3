//! Generation pipeline
//!
//! Runs the steps in a fixed order and stops at the first failure:
//!
//! ```text
//! Init -> Sanitized -> Cloned -> HistoryStripped -> EnvWritten
//!      -> BuildFileResolved -> ModuleDescriptorWritten -> SourceRewritten
//!      -> DependenciesResolving -> Done
//! ```
//!
//! Any error moves the run to `Failed`. All work happens in a staging
//! directory next to the destination which is renamed into place only after
//! the last step succeeded, so a failed run never leaves a half-generated
//! project at `<parent>/<short name>`.

use crate::config::Config;
use crate::deps::DependencyResolver;
use crate::identity::AppIdentity;
use crate::materializer::{self, FileMode, Platform};
use crate::placeholders::{self, Placeholders};
use crate::rewriter::{ModuleDescriptor, RewriteStats, SourceRewriter};
use crate::template_source::{self, TemplateFetcher};
use crate::templates;
use crate::timing::Stopwatch;
use crate::{Result, SproutError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument};

/// Prefix of the staging directory created next to the destination
pub const STAGING_PREFIX: &str = ".sprout-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Sanitized,
    Cloned,
    HistoryStripped,
    EnvWritten,
    BuildFileResolved,
    ModuleDescriptorWritten,
    SourceRewritten,
    DependenciesResolving,
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::Sanitized => "sanitized",
            Stage::Cloned => "cloned",
            Stage::HistoryStripped => "history_stripped",
            Stage::EnvWritten => "env_written",
            Stage::BuildFileResolved => "build_file_resolved",
            Stage::ModuleDescriptorWritten => "module_descriptor_written",
            Stage::SourceRewritten => "source_rewritten",
            Stage::DependenciesResolving => "dependencies_resolving",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed_ms: u64,
}

/// Summary of a successful run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub identity: AppIdentity,
    pub path: PathBuf,
    pub template: String,
    pub platform: Platform,
    pub stages: Vec<StageTiming>,
    pub rewrite: RewriteStats,
    pub dependencies: String,
    pub elapsed_ms: u64,
    pub generated_at: DateTime<Utc>,
}

/// Tracks the state machine of one run
#[derive(Debug)]
struct Run {
    stage: Stage,
    stages: Vec<StageTiming>,
}

impl Run {
    fn new() -> Self {
        Self {
            stage: Stage::Init,
            stages: Vec::new(),
        }
    }

    fn advance(&mut self, next: Stage, watch: Stopwatch) {
        debug_assert!(!self.stage.is_terminal(), "advance from terminal stage {}", self.stage);
        let elapsed = watch.finish();
        info!(from = %self.stage, to = %next, elapsed_ms = elapsed.as_millis() as u64, "stage complete");
        self.stages.push(StageTiming {
            stage: next,
            elapsed_ms: elapsed.as_millis() as u64,
        });
        self.stage = next;
    }

    /// Move into a stage whose work is still ahead; [`Run::settle`] records its time
    fn enter(&mut self, next: Stage) {
        debug_assert!(!self.stage.is_terminal(), "enter from terminal stage {}", self.stage);
        info!(from = %self.stage, to = %next, "stage started");
        self.stages.push(StageTiming {
            stage: next,
            elapsed_ms: 0,
        });
        self.stage = next;
    }

    fn settle(&mut self, watch: Stopwatch) {
        let elapsed = watch.finish();
        info!(stage = %self.stage, elapsed_ms = elapsed.as_millis() as u64, "stage complete");
        if let Some(last) = self.stages.last_mut() {
            last.elapsed_ms = elapsed.as_millis() as u64;
        }
    }

    fn fail(&mut self, err: &SproutError) {
        error!(stage = %self.stage, error = %err, "generation failed");
        self.stage = Stage::Failed;
    }
}

pub struct Generator {
    config: Config,
    fetcher: Box<dyn TemplateFetcher>,
    resolver: Box<dyn DependencyResolver>,
    platform: Platform,
}

impl Generator {
    pub fn new(
        config: Config,
        fetcher: Box<dyn TemplateFetcher>,
        resolver: Box<dyn DependencyResolver>,
    ) -> Self {
        Self {
            config,
            fetcher,
            resolver,
            platform: Platform::current(),
        }
    }

    /// Select the build file variant for a host other than this one
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Generate `<parent>/<short name>` from `raw_name`
    #[instrument(skip(self, parent), fields(parent = %parent.display()))]
    pub async fn generate(&self, raw_name: &str, parent: &Path) -> Result<GenerationReport> {
        let total = Stopwatch::start("generate");
        let mut run = Run::new();

        match self.run_pipeline(&mut run, raw_name, parent).await {
            Ok((identity, path, rewrite)) => Ok(GenerationReport {
                identity,
                path,
                template: self.fetcher.describe(),
                platform: self.platform,
                stages: run.stages,
                rewrite,
                dependencies: self.resolver.describe(),
                elapsed_ms: total.finish().as_millis() as u64,
                generated_at: Utc::now(),
            }),
            Err(e) => {
                run.fail(&e);
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        run: &mut Run,
        raw_name: &str,
        parent: &Path,
    ) -> Result<(AppIdentity, PathBuf, RewriteStats)> {
        let generation = &self.config.generation;

        let watch = Stopwatch::start("sanitize");
        let identity = AppIdentity::sanitize(raw_name);
        identity.validate()?;
        info!(short_name = %identity.short_name, module_id = %identity.module_id, "App name is {}", identity.short_name);

        let destination = parent.join(&identity.short_name);
        check_destination(&destination)?;
        let placeholders = Placeholders::for_identity(
            &identity,
            placeholders::random_secret(generation.secret_length),
        )?;
        run.advance(Stage::Sanitized, watch);

        // Dropping `staging` removes everything built so far.
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(parent)
            .map_err(|e| SproutError::io_at(parent, e))?;
        let root = staging.path().join(&identity.short_name);

        let watch = Stopwatch::start("clone");
        self.fetcher.acquire(&root).await?;
        run.advance(Stage::Cloned, watch);

        let watch = Stopwatch::start("strip history");
        template_source::strip_history(&root)?;
        run.advance(Stage::HistoryStripped, watch);

        let watch = Stopwatch::start("env file");
        info!("Creating {} file...", generation.env_file);
        let env = self.render_template(
            self.config.template.env_template.as_deref(),
            templates::ENV_TEMPLATE,
            &placeholders,
        )?;
        // holds the application secret
        materializer::write_atomic_with(
            &root.join(&generation.env_file),
            env.as_bytes(),
            FileMode::Private,
        )?;
        run.advance(Stage::EnvWritten, watch);

        let watch = Stopwatch::start("build file");
        info!(platform = %self.platform, "Creating {} file...", generation.build_file);
        materializer::select_build_file(&root, &generation.build_files(), self.platform)?;
        run.advance(Stage::BuildFileResolved, watch);

        let watch = Stopwatch::start("module descriptor");
        info!("Creating {} file...", generation.module_file);
        let descriptor = ModuleDescriptor {
            file_name: generation.module_file.clone(),
            content: self.render_template(
                self.config.template.module_template.as_deref(),
                templates::MODULE_TEMPLATE,
                &placeholders,
            )?,
        };
        materializer::write_atomic(&root.join(&descriptor.file_name), descriptor.content.as_bytes())?;
        run.advance(Stage::ModuleDescriptorWritten, watch);

        let watch = Stopwatch::start("rewrite sources");
        let rewrite = SourceRewriter::new(&generation.source_extensions)
            .with_descriptor(descriptor)
            .rewrite_all(&root, &generation.template_module, &identity.module_id)?;
        run.advance(Stage::SourceRewritten, watch);

        let watch = Stopwatch::start("dependencies");
        run.enter(Stage::DependenciesResolving);
        self.resolver.resolve(&root).await?;
        run.settle(watch);

        let watch = Stopwatch::start("promote");
        promote(&root, &destination)?;
        run.advance(Stage::Done, watch);

        info!(path = %destination.display(), "Done building {}", identity.module_id);
        Ok((identity, destination, rewrite))
    }

    /// Render a template file override, or the built-in default
    fn render_template(
        &self,
        override_path: Option<&Path>,
        builtin: &str,
        table: &Placeholders,
    ) -> Result<String> {
        match override_path {
            Some(path) => {
                let bytes = fs::read(path).map_err(|e| SproutError::io_at(path, e))?;
                placeholders::render_bytes(&bytes, table).map_err(|e| match e {
                    SproutError::Encoding(msg) => {
                        SproutError::Encoding(format!("{}: {}", path.display(), msg))
                    }
                    other => other,
                })
            }
            None => Ok(placeholders::render(builtin, table)),
        }
    }
}

/// A destination may be missing or an empty directory
fn check_destination(destination: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(destination) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(SproutError::io_at(destination, e)),
    };
    if !meta.is_dir() {
        return Err(SproutError::DestinationExists(destination.to_path_buf()));
    }
    let mut entries = fs::read_dir(destination).map_err(|e| SproutError::io_at(destination, e))?;
    if entries.next().is_some() {
        return Err(SproutError::DestinationExists(destination.to_path_buf()));
    }
    Ok(())
}

/// Move the finished tree into place, replacing an empty destination directory
fn promote(root: &Path, destination: &Path) -> Result<()> {
    match fs::remove_dir(destination) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) if e.kind() == io::ErrorKind::DirectoryNotEmpty => {
            return Err(SproutError::DestinationExists(destination.to_path_buf()));
        }
        Err(e) => return Err(SproutError::io_at(destination, e)),
    }
    fs::rename(root, destination).map_err(|e| SproutError::io_at(destination, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_and_terminal() {
        assert_eq!(Stage::ModuleDescriptorWritten.to_string(), "module_descriptor_written");
        assert!(Stage::Done.is_terminal());
        assert!(Stage::Failed.is_terminal());
        assert!(!Stage::DependenciesResolving.is_terminal());
    }

    #[test]
    fn test_run_records_transitions() {
        let mut run = Run::new();
        run.advance(Stage::Sanitized, Stopwatch::start("a"));
        run.advance(Stage::Cloned, Stopwatch::start("b"));

        assert_eq!(run.stage, Stage::Cloned);
        let stages: Vec<_> = run.stages.iter().map(|s| s.stage).collect();
        assert_eq!(stages, vec![Stage::Sanitized, Stage::Cloned]);

        run.enter(Stage::DependenciesResolving);
        assert_eq!(run.stage, Stage::DependenciesResolving);
        run.settle(Stopwatch::start("c"));
        assert_eq!(run.stages.last().map(|s| s.stage), Some(Stage::DependenciesResolving));

        run.fail(&SproutError::SourceUnavailable("offline".into()));
        assert_eq!(run.stage, Stage::Failed);
    }

    #[test]
    fn test_empty_destination_directory_accepted() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let destination = temp_dir.path().join("bar");
        assert!(check_destination(&destination).is_ok());

        fs::create_dir(&destination).unwrap();
        assert!(check_destination(&destination).is_ok());

        fs::write(destination.join("keep.txt"), "mine").unwrap();
        assert!(matches!(
            check_destination(&destination),
            Err(SproutError::DestinationExists(_))
        ));
    }
}
