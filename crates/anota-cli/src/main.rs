//! Anota CLI - write journal entries from the command line
//!
//! Entries live in a Supabase project; media is uploaded to its storage bucket.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::new::run_new;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "anota=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Some(Commands::New {
            title,
            content,
            media,
        }) => run_new(title, content, media.as_deref(), profile).await?,
        Some(Commands::List { limit, json }) => run_list(limit, json, profile).await?,
        Some(Commands::Edit {
            id,
            title,
            content,
            media,
            clear_media,
        }) => run_edit(&id, title, content, media.as_deref(), clear_media, profile).await?,
        Some(Commands::Delete { id, yes }) => run_delete(&id, yes, profile).await?,
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        Some(Commands::Config { command }) => run_config(command, profile)?,
        Some(Commands::Auth { command }) => run_auth(command, profile).await?,
        None => {
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
