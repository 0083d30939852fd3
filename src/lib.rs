pub mod config;
pub mod deps;
pub mod error;
pub mod generator;
pub mod identity;
pub mod logging;
pub mod materializer;
pub mod placeholders;
pub mod rewriter;
pub mod template_source;
pub mod templates;
pub mod timing;

pub use config::Config;
pub use deps::{CommandResolver, DependencyResolver, SkipResolver};
pub use error::{Result, SproutError};
pub use generator::{GenerationReport, Generator, Stage};
pub use identity::AppIdentity;
pub use materializer::{BuildFiles, Platform};
pub use placeholders::{render, Placeholders};
pub use rewriter::{ModuleDescriptor, RewriteStats, SourceRewriter};
pub use template_source::{GitTemplateSource, LocalTemplateSource, TemplateFetcher};
