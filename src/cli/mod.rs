//! CLI entry point for esi-auth.

pub mod auth;
pub mod read;

use clap::{Parser, Subcommand};

/// EVE SSO login and ESI reads from the command line
#[derive(Parser, Debug)]
#[command(name = "esi-auth", version, about = "EVE SSO tokens and ESI reads")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the SSO login URL
    LoginUrl(LoginUrlArgs),
    /// Exchange an authorization code and store the token
    Login(LoginArgs),
    /// List stored tokens
    Status,
    /// Resolve ids to names
    Names(NamesArgs),
    /// Show a character's public profile
    Character(CharacterArgs),
    /// List a character's contracts
    Contracts(PagedArgs),
    /// List a character's wallet journal
    Journal(PagedArgs),
}

/// Arguments for `esi-auth login-url`.
#[derive(Parser, Debug)]
pub struct LoginUrlArgs {
    /// Scopes, space- or comma-separated
    #[arg(long, default_value = "publicData")]
    pub scopes: String,

    /// State echoed back on the callback (random if omitted)
    #[arg(long)]
    pub state: Option<String>,
}

/// Arguments for `esi-auth login`.
#[derive(Parser, Debug)]
pub struct LoginArgs {
    /// Authorization code from the SSO callback
    pub code: String,
}

/// Arguments for `esi-auth names`.
#[derive(Parser, Debug)]
pub struct NamesArgs {
    /// Ids to resolve
    #[arg(required = true)]
    pub ids: Vec<i64>,
}

/// Arguments for `esi-auth character`.
#[derive(Parser, Debug)]
pub struct CharacterArgs {
    pub character_id: i64,
}

/// Arguments for paginated character reads.
#[derive(Parser, Debug)]
pub struct PagedArgs {
    pub character_id: i64,

    /// Follow every page
    #[arg(long)]
    pub all: bool,

    /// Validator from a previous run
    #[arg(long)]
    pub etag: Option<String>,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
