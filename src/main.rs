// ABOUTME: Entry point for the dockwright CLI application.
// ABOUTME: Parses arguments, loads config, and dispatches to the subcommand handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use dockwright::command::{DockerCommand, ExitPolicy, RawCommand};
use dockwright::config::Config;
use dockwright::error::{Error, Result};
use dockwright::platform::PlatformDetector;
use dockwright::process::ProcessRunner;
use dockwright::session::{DockerCli, SESSION_LABEL, SessionRegistry};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Runs the selected subcommand, returning the process exit code.
async fn run(cli: Cli) -> Result<i32> {
    let config = load_config(&cli)?;
    let runner = ProcessRunner::new(cli.docker);

    match cli.command {
        Commands::Detect => {
            let info = PlatformDetector::new(runner).detect().await?;
            println!("Runtime: {}", info.kind);
            println!("Version: {}", info.version.as_deref().unwrap_or("unknown"));
            println!("Endpoint: {}", info.endpoint.as_deref().unwrap_or("unknown"));
            Ok(0)
        }
        Commands::Orphans => {
            let registry = registry(runner, &config)?;
            let orphans = registry.find_orphans().await?;
            if orphans.is_empty() {
                println!("No orphaned containers");
                return Ok(0);
            }
            for orphan in &orphans {
                println!(
                    "{}  session={}  image={}  {}",
                    orphan.container_id().short(),
                    orphan.label(SESSION_LABEL).unwrap_or("-"),
                    orphan.image,
                    orphan.status
                );
            }
            Ok(0)
        }
        Commands::Cleanup { force, all } => {
            let registry = registry(runner, &config)?;
            let cleaned = if all {
                registry.cleanup(|_| true, force).await?
            } else {
                registry.cleanup_orphans(force).await?
            };
            println!("Removed {cleaned} container(s)");
            Ok(0)
        }
        Commands::Exec { timeout_secs, args } => {
            let mut command = RawCommand::from_vec(args, ExitPolicy::ReturnExitCode)
                .ok_or_else(|| Error::InvalidConfig("exec needs at least one argument".into()))?;
            if let Some(secs) = timeout_secs {
                command = command.with_timeout(Duration::from_secs(secs));
            }
            let result = command.execute(&runner).await?;
            print!("{}", result.stdout);
            eprint!("{}", result.stderr);
            Ok(result.exit_code)
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    if let Some(ref path) = cli.config {
        return Config::load(path);
    }
    let cwd = env::current_dir()?;
    Ok(Config::discover(&cwd)?.unwrap_or_default())
}

fn registry(runner: ProcessRunner, config: &Config) -> Result<Arc<SessionRegistry>> {
    let ops = DockerCli::new(runner).with_retry(config.retry.to_policy()?);
    let registry = Arc::new(SessionRegistry::new(Arc::new(ops)));
    registry.configure(config.lifecycle.clone())?;
    Ok(registry)
}
