use anyhow::{Context, Result};
use clap::Parser;

// Core modules
mod cli;
mod commands;
mod config;
mod domain;
mod error;
mod infrastructure;
mod services;
mod ui;

use cli::Cli;
use commands::for_each_environment;
use config::{resolve, RcConfig};
use domain::descriptor::Operation;
use infrastructure::{CredentialStore, Prompter, TerminalPrompter};
use services::CredentialResolver;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with LOGGING env var support
    // LOGGING=debug,info,warn,error or just LOGGING=debug
    let log_level = std::env::var("LOGGING")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| {
            if cli.verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false) // Disable ANSI escape codes for cleaner output
        .init();

    let operation = cli.command.operation();
    let args = cli.command.args();

    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let rc = RcConfig::load_from(&cwd)?;
    let overrides = args.options.to_settings()?;
    let specs = resolve(operation, args.target.as_deref(), &overrides, &rc.environments())?;

    // Local-only commands never touch credentials
    match operation {
        Operation::Erd => {
            for spec in &specs {
                commands::erd::execute(spec)?;
            }
            return Ok(());
        }
        Operation::Diff => return commands::diff::execute(&specs).await,
        _ => {}
    }

    let prompter = TerminalPrompter::new();
    let netrc = CredentialStore::from_env();
    let resolver = CredentialResolver::new(&netrc, &prompter);
    let descriptors = specs
        .iter()
        .map(|spec| resolver.resolve(spec))
        .collect::<Result<Vec<_>>>()?;

    if operation.is_write() && !prompter.confirm(&format!("[{}] Are you sure?", operation))? {
        return Ok(());
    }

    match operation {
        Operation::Pull => for_each_environment(&descriptors, commands::pull::execute).await,
        Operation::Push => {
            for_each_environment(&descriptors, |descriptor| commands::push::execute(descriptor, &prompter)).await
        }
        Operation::Deploy => {
            for_each_environment(&descriptors, |descriptor| commands::deploy::execute(descriptor, false)).await
        }
        Operation::Reset => {
            for_each_environment(&descriptors, |descriptor| commands::deploy::execute(descriptor, true)).await
        }
        Operation::Erd | Operation::Diff => Ok(()),
    }
}
