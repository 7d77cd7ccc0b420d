//! CLI handlers for ESI reads.

use crate::client::{EsiClient, EsiResponse, FetchOptions};
use crate::config::EsiConfig;
use crate::types::ResolvedName;

use super::auth::service;

/// Handle `esi-auth names <id>...`.
pub async fn handle_names(ids: &[i64]) -> Result<(), Box<dyn std::error::Error>> {
    let config = EsiConfig::from_env()?;
    let client = EsiClient::new(&config, None)?;
    let response = client.resolve_names(ids, &FetchOptions::default()).await?;

    for name in response.decode::<ResolvedName>()? {
        println!("{:>12}  {:<14} {}", name.id, name.category, name.name);
    }
    Ok(())
}

/// Handle `esi-auth character <id>`.
pub async fn handle_character(character_id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let config = EsiConfig::from_env()?;
    let client = EsiClient::new(&config, None)?;

    let character = client.public_character(character_id).await?;
    println!("{}", serde_json::to_string_pretty(&character)?);
    Ok(())
}

/// Handle `esi-auth contracts <character_id>`.
pub async fn handle_contracts(
    character_id: i64,
    all: bool,
    etag: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = authenticated_client(character_id).await?;
    let response = client
        .character_contracts(character_id, &options(all, etag))
        .await?;
    print_response(&response)
}

/// Handle `esi-auth journal <character_id>`.
pub async fn handle_journal(
    character_id: i64,
    all: bool,
    etag: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = authenticated_client(character_id).await?;
    let response = client
        .character_wallet_journal(character_id, &options(all, etag))
        .await?;
    print_response(&response)
}

async fn authenticated_client(character_id: i64) -> Result<EsiClient, Box<dyn std::error::Error>> {
    let config = EsiConfig::from_env()?;
    let token = service(&config)?.load_character(character_id).await?;
    Ok(EsiClient::new(&config, Some(token))?)
}

fn options(all: bool, etag: Option<String>) -> FetchOptions {
    FetchOptions {
        etag,
        all,
        ..FetchOptions::default()
    }
}

fn print_response(response: &EsiResponse) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(error) = response.error() {
        eprintln!("⚠️  ESI returned {}: {}", error.status, error.body);
        return Ok(());
    }
    if response.is_not_modified() {
        eprintln!("Not modified");
    } else {
        println!("{}", serde_json::to_string_pretty(response.data())?);
    }
    eprintln!(
        "page {}/{}  etag {}",
        response.page(),
        response.total_pages(),
        response.etag().unwrap_or("-")
    );
    Ok(())
}
