use clap::{Arg, ArgMatches, Command};
use dotenv::dotenv;
use sprout::{logging, Config};
use std::path::PathBuf;
use std::process;

mod cli;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv().ok();

    let matches = build_cli().get_matches();

    if let Err(e) = run_command(matches).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn build_cli() -> Command {
    Command::new("sprout")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Sprout - scaffold a new application from a template repository")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("new")
                .about("Create a new application")
                .long_about(
                    "Clone the template, write .env, module descriptor and build file, \
                     and rewrite internal imports to the new module path",
                )
                .arg(
                    Arg::new("app-name")
                        .help("Application name or module path, e.g. myapp or github.com/you/myapp")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("template-url")
                        .long("template-url")
                        .help("Git URL of the template repository"),
                )
                .arg(
                    Arg::new("branch")
                        .short('b')
                        .long("branch")
                        .help("Template branch or tag to clone"),
                )
                .arg(
                    Arg::new("template-path")
                        .long("template-path")
                        .help("Use a template directory on disk instead of cloning")
                        .value_parser(clap::value_parser!(PathBuf))
                        .conflicts_with_all(["template-url", "branch"]),
                )
                .arg(
                    Arg::new("platform")
                        .long("platform")
                        .help("Build file variant to install (defaults to this host)")
                        .value_parser(["windows", "unix"]),
                )
                .arg(
                    Arg::new("dir")
                        .short('C')
                        .long("dir")
                        .help("Directory to create the application in")
                        .value_parser(clap::value_parser!(PathBuf))
                        .default_value("."),
                )
                .arg(
                    Arg::new("no-deps")
                        .long("no-deps")
                        .help("Skip dependency resolution")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the generation report as JSON")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Configuration file (defaults to ./sprout.toml if present)")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Verbose output")
                .global(true)
                .action(clap::ArgAction::SetTrue),
        )
}

async fn run_command(matches: ArgMatches) -> anyhow::Result<()> {
    // Global args may be given before or after the subcommand.
    let scoped = matches.subcommand().map(|(_, m)| m).unwrap_or(&matches);
    let config_path = scoped
        .get_one::<PathBuf>("config")
        .or_else(|| matches.get_one::<PathBuf>("config"));
    let verbose = scoped.get_flag("verbose") || matches.get_flag("verbose");

    let config = match config_path {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };
    logging::init(&config.logging, verbose)?;

    match matches.subcommand() {
        Some(("new", sub_matches)) => cli::commands::new::handle_new(sub_matches, config).await?,
        _ => {
            unreachable!("Command parsing should ensure we never reach this");
        }
    }

    Ok(())
}
