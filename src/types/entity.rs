//! Universe entities and id→name resolution.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What kind of thing an ESI id names.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityCategory {
    Alliance,
    Character,
    Constellation,
    Corporation,
    Faction,
    InventoryType,
    Region,
    SolarSystem,
    Station,
    Structure,
    #[serde(other)]
    Unknown,
}

impl EntityCategory {
    /// Parse leniently; anything unrecognized is `Unknown`.
    pub fn parse(value: &str) -> Self {
        Self::from_str(value).unwrap_or(Self::Unknown)
    }
}

/// One result from `/v3/universe/names/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedName {
    pub id: i64,
    pub name: String,
    pub category: EntityCategory,
}
