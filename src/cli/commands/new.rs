use anyhow::{Context, Result};
use clap::ArgMatches;
use std::path::PathBuf;

use sprout::{
    CommandResolver, Config, DependencyResolver, GenerationReport, Generator, GitTemplateSource,
    LocalTemplateSource, Platform, SkipResolver, TemplateFetcher,
};

use crate::cli::utils::{format_duration_ms, pluralize};

pub async fn handle_new(matches: &ArgMatches, mut config: Config) -> Result<()> {
    let app_name = matches
        .get_one::<String>("app-name")
        .expect("app-name argument is required");
    let parent = matches
        .get_one::<PathBuf>("dir")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));
    let json = matches.get_flag("json");

    if let Some(url) = matches.get_one::<String>("template-url") {
        config.template.url = url.clone();
    }
    if let Some(branch) = matches.get_one::<String>("branch") {
        config.template.branch = Some(branch.clone());
    }
    if matches.get_flag("no-deps") {
        config.dependencies.enabled = false;
    }
    config.validate()?;

    let platform = matches
        .get_one::<String>("platform")
        .and_then(|p| Platform::parse(p))
        .unwrap_or_else(Platform::current);

    let fetcher = build_fetcher(matches, &config);
    let resolver = build_resolver(&config);

    if !json {
        println!("🌱 Creating '{}' from {}", app_name, fetcher.describe());
    }

    let generator = Generator::new(config, fetcher, resolver).with_platform(platform);
    let report = generator
        .generate(app_name, &parent)
        .await
        .with_context(|| format!("Failed to create '{}'", app_name))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_success_message(&report);
    }

    Ok(())
}

fn build_fetcher(matches: &ArgMatches, config: &Config) -> Box<dyn TemplateFetcher> {
    match matches.get_one::<PathBuf>("template-path") {
        Some(path) => Box::new(LocalTemplateSource::new(path)),
        None => Box::new(
            GitTemplateSource::new(&config.template.url)
                .with_branch(config.template.branch.clone())
                .with_timeout(config.template.clone_timeout()),
        ),
    }
}

fn build_resolver(config: &Config) -> Box<dyn DependencyResolver> {
    if config.dependencies.enabled {
        Box::new(
            CommandResolver::new(&config.dependencies.command, config.dependencies.args.clone())
                .with_timeout(config.dependencies.timeout()),
        )
    } else {
        Box::new(SkipResolver)
    }
}

fn print_success_message(report: &GenerationReport) {
    println!("\n🎉 Done building {}", report.identity.module_id);
    println!("\n📁 Directory: {}", report.path.display());
    println!("📦 Module:    {}", report.identity.module_id);
    println!("🖥️  Platform:  {}", report.platform);
    println!(
        "✏️  Rewrote {} of {}",
        report.rewrite.files_rewritten,
        pluralize("source file", report.rewrite.files_scanned)
    );
    println!("⏱️  Took {}", format_duration_ms(report.elapsed_ms));

    println!("\n🚀 Next steps:");
    println!("   cd {}", report.path.display());
    println!("   make start");
}
