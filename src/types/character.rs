use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public profile from `/v5/characters/{character_id}/`.
///
/// Used to pick up the character's current corporation and alliance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicCharacter {
    pub name: String,
    pub corporation_id: i64,
    #[serde(default)]
    pub alliance_id: Option<i64>,
    #[serde(default)]
    pub faction_id: Option<i64>,
    pub birthday: DateTime<Utc>,
    pub race_id: i32,
    pub bloodline_id: i32,
    #[serde(default)]
    pub ancestry_id: Option<i32>,
    pub gender: String,
    #[serde(default)]
    pub security_status: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
