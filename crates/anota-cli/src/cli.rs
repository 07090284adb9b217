use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "anota")]
#[command(about = "Write journal entries with an attached photo or video")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// CLI profile name holding backend configuration and session
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new entry
    #[command(alias = "add")]
    New {
        /// Entry title (up to 100 characters)
        #[arg(short, long)]
        title: Option<String>,
        /// Entry text (up to 2000 characters)
        #[arg(short, long)]
        content: Option<String>,
        /// Image or video file to attach
        #[arg(short, long, value_name = "PATH")]
        media: Option<PathBuf>,
    },
    /// List entries, newest first
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing entry
    Edit {
        /// Entry ID or unique ID prefix
        id: String,
        /// Replace the title
        #[arg(short, long)]
        title: Option<String>,
        /// Replace the text
        #[arg(short, long)]
        content: Option<String>,
        /// Attach (or replace) an image or video
        #[arg(short, long, value_name = "PATH", conflicts_with = "clear_media")]
        media: Option<PathBuf>,
        /// Remove the attached media
        #[arg(long)]
        clear_media: bool,
    },
    /// Delete an entry
    Delete {
        /// Entry ID or unique ID prefix
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Sign in, register, or sign out
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Storage bucket for media (default: galeria)
        #[arg(long, value_name = "BUCKET")]
        media_bucket: Option<String>,
        /// Table holding entries (default: entries)
        #[arg(long, value_name = "TABLE")]
        entries_table: Option<String>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email/password and store the session in the keychain
    Login {
        /// Account email
        #[arg(long, value_name = "EMAIL", default_value = "")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD", default_value = "")]
        password: String,
    },
    /// Create an account
    Register {
        /// Account email
        #[arg(long, value_name = "EMAIL", default_value = "")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD", default_value = "")]
        password: String,
    },
    /// Show auth status for profile
    Status,
    /// Sign out and clear the stored session
    Logout {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
