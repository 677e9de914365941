//! The ROM's table of players it exchanges items with.
//!
//! The game looks players up by a small local index (used in the item table) and shows
//! their names when items are sent or received. Entries are sorted by multiworld player id
//! so that the game can search the id table when the client reports a sender.

use std::collections::BTreeSet;

use anyhow::Result;
use hashbrown::HashMap;
use log::{debug, warn};
use smmr_game::symbols::SymbolTable;
use smmr_game::util::center;
use smmr_game::PlayerId;

use crate::error::PatchError;
use crate::multiworld::MultiworldSession;
use crate::patch::edits::ByteEditSet;

pub const PLAYER_TABLE_CAPACITY: usize = 202;
pub const MAX_ROM_PLAYER_ID: PlayerId = 0xFFFF;
pub const PLAYER_NAME_LEN: usize = 16;
pub const SERVER_PLAYER_NAME: &str = "Archipelago";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerEntry {
    pub player_id: PlayerId,
    pub rom_index: usize,
    pub display_name: String,
    /// Id written to the ROM: 0 when `player_id` does not fit in 16 bits.
    pub rom_player_id: u16,
}

#[derive(Clone, Debug)]
pub struct PlayerDirectory {
    pub entries: Vec<PlayerEntry>,
    index_by_player: HashMap<PlayerId, usize>,
}

/// Players relevant to `self_player`'s ROM: the server (0), everyone with a location holding
/// an item for us (or for an item link we're in), and everyone we hold items for.
///
/// Every location of every world must hold an item by the time output is generated.
pub fn collect_player_ids(
    session: &MultiworldSession,
    self_player: PlayerId,
) -> Result<BTreeSet<PlayerId>> {
    let mut ids: BTreeSet<PlayerId> = BTreeSet::new();
    ids.insert(0);
    for loc in &session.locations {
        let item = loc.item.as_ref().ok_or_else(|| PatchError::UnplacedLocation {
            player: loc.player,
            location: loc.name.clone(),
        })?;
        if item.player == self_player || session.group_contains(item.player, self_player) {
            ids.insert(loc.player);
        }
        if loc.player == self_player {
            ids.insert(item.player);
        }
    }
    Ok(ids)
}

/// Fixed-width name record: upper-cased, truncated and centered with spaces.
pub fn name_record(name: &str) -> [u8; PLAYER_NAME_LEN] {
    let ascii_name: String = name
        .chars()
        .take(PLAYER_NAME_LEN)
        .map(|c| {
            if c == ' ' || c.is_ascii_graphic() {
                c.to_ascii_uppercase()
            } else {
                '?'
            }
        })
        .collect();
    let mut out = [b' '; PLAYER_NAME_LEN];
    out.copy_from_slice(center(&ascii_name, PLAYER_NAME_LEN).as_bytes());
    out
}

impl PlayerDirectory {
    pub fn build(
        player_ids: impl IntoIterator<Item = PlayerId>,
        self_player: PlayerId,
        capacity: usize,
        name_lookup: impl Fn(PlayerId) -> Option<String>,
    ) -> Result<Self> {
        if self_player > MAX_ROM_PLAYER_ID {
            return Err(PatchError::PlayerIdOverflow(self_player).into());
        }
        let mut ids: BTreeSet<PlayerId> = player_ids.into_iter().collect();
        ids.insert(0);
        if ids.len() > capacity {
            // Item links can pull in replacement items from worlds otherwise unrelated to us.
            warn!(
                "Player {} interacts with too many players to fit in ROM. Removing the highest {} ids to fit",
                self_player,
                ids.len() - capacity
            );
            ids = ids.into_iter().take(capacity).collect();
        }

        let mut entries: Vec<PlayerEntry> = Vec::with_capacity(ids.len());
        let mut index_by_player: HashMap<PlayerId, usize> = HashMap::new();
        for (i, player_id) in ids.into_iter().enumerate() {
            let display_name = if player_id == 0 {
                SERVER_PLAYER_NAME.to_string()
            } else {
                name_lookup(player_id).unwrap_or_else(|| {
                    debug!("No name known for player {player_id}");
                    String::new()
                })
            };
            let rom_player_id = if player_id > MAX_ROM_PLAYER_ID {
                // Not unique, so the game shows the sender as the server instead.
                warn!("ROM cannot represent player id {player_id}, setting to 0 in ROM");
                0
            } else {
                player_id as u16
            };
            index_by_player.insert(player_id, i);
            entries.push(PlayerEntry {
                player_id,
                rom_index: i,
                display_name,
                rom_player_id,
            });
        }
        Ok(PlayerDirectory {
            entries,
            index_by_player,
        })
    }

    pub fn from_session(session: &MultiworldSession, self_player: PlayerId) -> Result<Self> {
        Self::build(
            collect_player_ids(session, self_player)?,
            self_player,
            PLAYER_TABLE_CAPACITY,
            |id| session.player_name(id).map(|x| x.to_string()),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index_of(&self, player: PlayerId) -> Option<usize> {
        self.index_by_player.get(&player).copied()
    }

    pub fn name_table_edits(&self, symbols: &SymbolTable) -> Result<ByteEditSet> {
        let table = symbols.get("rando_player_name_table")?;
        let mut edits = ByteEditSet::new();
        for entry in &self.entries {
            edits.push(
                table,
                entry.rom_index * PLAYER_NAME_LEN,
                name_record(&entry.display_name),
            );
        }
        Ok(edits)
    }

    pub fn id_table_edits(&self, symbols: &SymbolTable) -> Result<ByteEditSet> {
        let table = symbols.get("rando_player_id_table")?;
        let mut edits = ByteEditSet::new();
        for entry in &self.entries {
            edits.push_u16(table, entry.rom_index * 2, entry.rom_player_id);
        }
        Ok(edits)
    }
}
