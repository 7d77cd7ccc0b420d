//! esi-auth CLI binary entry point.

use clap::Parser;
use esi_auth::cli::{auth, read, Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::LoginUrl(args) => auth::handle_login_url(&args.scopes, args.state).await,
        Commands::Login(args) => auth::handle_login(&args.code).await,
        Commands::Status => auth::handle_status().await,
        Commands::Names(args) => read::handle_names(&args.ids).await,
        Commands::Character(args) => read::handle_character(args.character_id).await,
        Commands::Contracts(args) => read::handle_contracts(args.character_id, args.all, args.etag).await,
        Commands::Journal(args) => read::handle_journal(args.character_id, args.all, args.etag).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
