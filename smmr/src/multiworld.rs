//! Data handed over by the multiworld host once item placement is finished.

use std::path::Path;

use anyhow::{Context, Result};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use smmr_game::{PlayerId, GAME_NAME};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub game: String,
}

/// An item link: a group id that owns items shared between its member players.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ItemLinkGroup {
    pub id: PlayerId,
    pub name: String,
    pub players: Vec<PlayerId>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ItemClassification {
    #[serde(default)]
    pub progression: bool,
    #[serde(default)]
    pub useful: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlacedItem {
    /// Player (or item link group) receiving the item.
    pub player: PlayerId,
    pub name: String,
    pub game: String,
    #[serde(default)]
    pub code: Option<u64>,
    #[serde(default)]
    pub classification: ItemClassification,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ItemLocation {
    /// Player whose world contains the location.
    pub player: PlayerId,
    pub name: String,
    /// Location id; event locations have none.
    #[serde(default)]
    pub address: Option<u64>,
    pub item: Option<PlacedItem>,
}

/// Result of filling the multiworld, for every player.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MultiworldSession {
    pub seed: u64,
    /// Host version string, e.g. "0.5.1".
    pub host_version: String,
    pub players: Vec<PlayerInfo>,
    #[serde(default)]
    pub groups: Vec<ItemLinkGroup>,
    pub locations: Vec<ItemLocation>,
    /// Starting items (by name) per player.
    #[serde(default)]
    pub precollected: HashMap<PlayerId, Vec<String>>,
    #[serde(default)]
    pub is_race: bool,
}

impl MultiworldSession {
    pub fn load(path: &Path) -> Result<Self> {
        let session_str = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read session file {}", path.display()))?;
        serde_json::from_str(&session_str)
            .with_context(|| format!("Unable to parse session file {}", path.display()))
    }

    pub fn player_name(&self, player: PlayerId) -> Option<&str> {
        if let Some(p) = self.players.iter().find(|p| p.id == player) {
            return Some(&p.name);
        }
        self.groups
            .iter()
            .find(|g| g.id == player)
            .map(|g| g.name.as_str())
    }

    pub fn player_game(&self, player: PlayerId) -> Option<&str> {
        self.players
            .iter()
            .find(|p| p.id == player)
            .map(|p| p.game.as_str())
    }

    /// Whether `player` is an item link group with `member` among its players.
    pub fn group_contains(&self, player: PlayerId, member: PlayerId) -> bool {
        self.groups
            .iter()
            .any(|g| g.id == player && g.players.contains(&member))
    }

    pub fn is_own_game(&self, player: PlayerId) -> bool {
        self.player_game(player) == Some(GAME_NAME)
    }

    pub fn precollected_items(&self, player: PlayerId) -> &[String] {
        self.precollected
            .get(&player)
            .map(|x| x.as_slice())
            .unwrap_or(&[])
    }
}

/// The part of the host's multidata the output hooks touch.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Multidata {
    /// Connect name -> slot entry, as the host stores it.
    pub connect_names: HashMap<String, serde_json::Value>,
}

/// Per-player options that affect the generated patch.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct OptionSettings {
    #[serde(default)]
    pub death_link: bool,
    #[serde(default)]
    pub remote_items: bool,
    /// Show items from other Metroid games with matching native graphics.
    #[serde(default)]
    pub metroid_item_matching: bool,
    /// Cosmetic settings, passed through to the client-side customizer untouched.
    #[serde(default)]
    pub customize_settings: serde_json::Value,
    /// Map Rando settings, passed through untouched.
    #[serde(default)]
    pub map_rando_settings: serde_json::Value,
}

impl OptionSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let options_str = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read options file {}", path.display()))?;
        serde_json::from_str(&options_str)
            .with_context(|| format!("Unable to parse options file {}", path.display()))
    }
}
