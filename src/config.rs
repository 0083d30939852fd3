use crate::materializer::BuildFiles;
use crate::Result;
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the optional configuration file
pub const CONFIG_FILE: &str = "sprout.toml";

/// Shortest accepted `generation.secret_length`
pub const MIN_SECRET_LENGTH: usize = 32;

/// Main configuration structure for sprout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub template: TemplateConfig,
    pub generation: GenerationConfig,
    pub dependencies: DependencyConfig,
    pub logging: LoggingConfig,
}

/// Where the template comes from and which identity templates to use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub url: String,
    pub branch: Option<String>,
    /// Clone timeout in seconds; 0 disables the timeout
    pub clone_timeout_secs: u64,
    /// Replaces the built-in `.env` template
    pub env_template: Option<PathBuf>,
    /// Replaces the built-in module descriptor template
    pub module_template: Option<PathBuf>,
}

/// Layout of the template tree and what gets rewritten
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Module identifier the template's sources import themselves by
    pub template_module: String,
    pub source_extensions: Vec<String>,
    pub env_file: String,
    pub module_file: String,
    pub build_file: String,
    pub windows_build_file: String,
    pub unix_build_file: String,
    pub secret_length: usize,
}

/// External dependency resolution run after generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyConfig {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
    /// 0 disables the timeout
    pub timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub target: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            url: "https://github.com/yamagit01/celeritas-app.git".to_string(),
            branch: None,
            clone_timeout_secs: 300,
            env_template: None,
            module_template: None,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let build = BuildFiles::default();
        Self {
            template_module: "myapp".to_string(),
            source_extensions: vec!["go".to_string()],
            env_file: ".env".to_string(),
            module_file: "go.mod".to_string(),
            build_file: build.canonical,
            windows_build_file: build.windows,
            unix_build_file: build.unix,
            secret_length: 32,
        }
    }
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "go".to_string(),
            args: vec!["mod".to_string(), "tidy".to_string()],
            timeout_secs: 600,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(), // pretty, json, compact
            target: "stderr".to_string(), // stdout, stderr
        }
    }
}

impl TemplateConfig {
    pub fn clone_timeout(&self) -> Option<Duration> {
        secs_to_timeout(self.clone_timeout_secs)
    }
}

impl DependencyConfig {
    pub fn timeout(&self) -> Option<Duration> {
        secs_to_timeout(self.timeout_secs)
    }
}

impl GenerationConfig {
    pub fn build_files(&self) -> BuildFiles {
        BuildFiles {
            canonical: self.build_file.clone(),
            windows: self.windows_build_file.clone(),
            unix: self.unix_build_file.clone(),
        }
    }
}

fn secs_to_timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Config {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. sprout.toml in the working directory (if exists)
    /// 3. Environment variables (SPROUT_<SECTION>__<KEY>)
    /// 4. Direct overrides (SPROUT_TEMPLATE_URL, SPROUT_TEMPLATE_BRANCH, SPROUT_LOG_LEVEL)
    pub fn load() -> Result<Self> {
        Self::load_from_dir(&std::env::current_dir()?)
    }

    /// Load configuration with `dir/sprout.toml` as the file source
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_file = dir.join(CONFIG_FILE);
        Self::build(config_file.exists().then_some(config_file))
    }

    /// Load configuration from an explicit file, which must exist
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(crate::SproutError::Configuration(format!(
                "config file {} not found",
                path.display()
            )));
        }
        Self::build(Some(path.to_path_buf()))
    }

    fn build(file: Option<PathBuf>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(file) = file {
            builder = builder.add_source(File::from(file));
        }

        builder = builder.add_source(
            Environment::with_prefix("SPROUT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("generation.source_extensions")
                .with_list_parse_key("dependencies.args"),
        );

        let mut result: Config = builder.build()?.try_deserialize()?;
        result.merge_env_vars();
        result.validate()?;
        Ok(result)
    }

    /// Short-form environment variables
    fn merge_env_vars(&mut self) {
        if let Ok(url) = std::env::var("SPROUT_TEMPLATE_URL") {
            self.template.url = url;
        }
        if let Ok(branch) = std::env::var("SPROUT_TEMPLATE_BRANCH") {
            self.template.branch = (!branch.is_empty()).then_some(branch);
        }
        if let Ok(level) = std::env::var("SPROUT_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let config_err = |msg: &str| Err(crate::SproutError::Configuration(msg.to_string()));

        if self.template.url.trim().is_empty() {
            return config_err("template.url must not be empty");
        }
        if self.generation.secret_length < MIN_SECRET_LENGTH {
            return Err(crate::SproutError::Configuration(format!(
                "generation.secret_length must be at least {MIN_SECRET_LENGTH}, got {}",
                self.generation.secret_length
            )));
        }
        let g = &self.generation;
        for (key, name) in [
            ("generation.env_file", &g.env_file),
            ("generation.module_file", &g.module_file),
            ("generation.build_file", &g.build_file),
            ("generation.windows_build_file", &g.windows_build_file),
            ("generation.unix_build_file", &g.unix_build_file),
        ] {
            if name.is_empty() || name.contains('/') || name.contains('\\') {
                return Err(crate::SproutError::Configuration(format!(
                    "{key} must be a plain file name, got {name:?}"
                )));
            }
        }
        if g.windows_build_file == g.unix_build_file
            || g.build_file == g.windows_build_file
            || g.build_file == g.unix_build_file
        {
            return config_err("build file names must be distinct");
        }
        if self.dependencies.enabled && self.dependencies.command.trim().is_empty() {
            return config_err("dependencies.command must not be empty");
        }
        Ok(())
    }
}
