//! Encoding of the item placed at each of this player's locations into the ROM item table.

use anyhow::{ensure, Result};
use hashbrown::HashMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use smmr_game::item_matching::match_metroid_item;
use smmr_game::symbols::SymbolTable;
use smmr_game::{
    own_item_from_code, own_item_from_name, Item, LocalItem, LocationIdx, PlaceholderItem,
    PlayerId, RomItemId, GAME_NAME, LOCATIONS_START_ID, LOCATION_COUNT, VANILLA_ITEM_TYPES_COUNT,
};

use crate::error::PatchError;
use crate::multiworld::{MultiworldSession, PlacedItem};
use crate::patch::edits::ByteEditSet;
use crate::players::PlayerDirectory;

pub const ITEM_RECORD_SIZE: usize = 8;
pub const ITEM_NAME_RECORD_SIZE: usize = 64;
pub const ITEM_NAME_LEN: usize = 26;
pub const LOCATIONS_NOTHING_SIZE: usize = 20;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum DestinationType {
    // A regular item for this player.
    SameWorld = 0,
    // An item for someone else entirely.
    OtherWorld = 1,
    // An item link item that sends to the current player and others.
    LinkedWorld = 2,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemLocationRecord {
    pub location_index: LocationIdx,
    pub destination: DestinationType,
    pub item_id: RomItemId,
    pub source_player_rom_index: u16,
    pub progression: bool,
    /// Slot in the item name table, for items the game has no name for. The ROM item id
    /// of such an item is `VANILLA_ITEM_TYPES_COUNT + slot`.
    pub name_slot: Option<usize>,
    /// The item as the randomizer shows it: native, or a placeholder by classification.
    pub local_item: LocalItem,
}

impl ItemLocationRecord {
    pub fn to_bytes(&self) -> [u8; ITEM_RECORD_SIZE] {
        let words = [
            self.destination as u16,
            self.item_id,
            self.source_player_rom_index,
            if self.progression { 0 } else { 1 },
        ];
        let mut out = [0; ITEM_RECORD_SIZE];
        for (i, w) in words.iter().enumerate() {
            out[i * 2..i * 2 + 2].copy_from_slice(&w.to_le_bytes());
        }
        out
    }
}

fn message_tile(c: char) -> u16 {
    match c {
        'A'..='Z' => 0x2CC0 + (c as u16 - 'A' as u16),
        '0'..='9' => 0x2C00 + (c as u16 - '0' as u16),
        ' ' => 0x2C0F,
        '!' => 0x2CDF,
        '?' => 0x2CDE,
        '\'' | '-' => 0x2CDD,
        ',' | '.' => 0x2CDA,
        '_' => 0x000F,
        '%' => 0x2C0A,
        _ => 0x2CDE,
    }
}

/// Message box text for an item name: 32 tile words, the name centered between underscores.
pub fn rom_item_name(name: &str) -> Vec<u8> {
    let upper: String = name.to_uppercase().chars().take(ITEM_NAME_LEN).collect();
    let centered = smmr_game::util::center(upper.trim(), ITEM_NAME_LEN);
    format!("___{centered}___")
        .chars()
        .flat_map(|c| message_tile(c).to_le_bytes())
        .collect()
}

/// Output of encoding one player's placements.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlacementEncoding {
    pub records: Vec<ItemLocationRecord>,
    /// Distinct display names of foreign items, indexed by slot.
    pub item_names: Vec<String>,
    /// Location indices holding a "Nothing" item of this game, whoever it belongs to.
    pub locations_nothing: Vec<LocationIdx>,
}

impl PlacementEncoding {
    pub fn locations_edits(&self, symbols: &SymbolTable) -> Result<ByteEditSet> {
        let table = symbols.get("rando_item_table")?;
        let mut edits = ByteEditSet::new();
        for record in &self.records {
            edits.push(
                table,
                record.location_index * ITEM_RECORD_SIZE,
                record.to_bytes(),
            );
        }
        Ok(edits)
    }

    /// Message box names of foreign items. The game finds a name by the item's ROM id.
    pub fn items_edits(&self, symbols: &SymbolTable) -> Result<ByteEditSet> {
        let names = symbols.get("message_item_names")?;
        let mut edits = ByteEditSet::new();
        for (slot, name) in self.item_names.iter().enumerate() {
            edits.push(
                names,
                (VANILLA_ITEM_TYPES_COUNT + slot) * ITEM_NAME_RECORD_SIZE,
                rom_item_name(name),
            );
        }
        Ok(edits)
    }

    /// Items in location order, for the randomizer's item placement.
    pub fn item_placement(&self) -> Vec<LocalItem> {
        let mut records: Vec<&ItemLocationRecord> = self.records.iter().collect();
        records.sort_by_key(|r| r.location_index);
        records.iter().map(|r| r.local_item).collect()
    }

    pub fn locations_nothing_bitmask(&self) -> [u8; LOCATIONS_NOTHING_SIZE] {
        let mut mask = [0; LOCATIONS_NOTHING_SIZE];
        for &idx in &self.locations_nothing {
            mask[idx / 8] |= 1 << (idx % 8);
        }
        mask
    }

    pub fn locations_nothing_edits(&self, symbols: &SymbolTable) -> Result<ByteEditSet> {
        let mut edits = ByteEditSet::new();
        edits.push(
            symbols.get("locations_nothing")?,
            0,
            self.locations_nothing_bitmask(),
        );
        Ok(edits)
    }
}

pub struct ItemPlacementEncoder<'a> {
    pub session: &'a MultiworldSession,
    pub directory: &'a PlayerDirectory,
    pub self_player: PlayerId,
    pub metroid_item_matching: bool,
}

impl<'a> ItemPlacementEncoder<'a> {
    fn destination(&self, item_owner: PlayerId) -> DestinationType {
        if item_owner == self.self_player {
            DestinationType::SameWorld
        } else if self.session.group_contains(item_owner, self.self_player) {
            DestinationType::LinkedWorld
        } else {
            DestinationType::OtherWorld
        }
    }

    fn local_item(&self, item: &PlacedItem) -> LocalItem {
        if item.game == GAME_NAME {
            let own_item = match item.code {
                Some(code) => own_item_from_code(code),
                None => own_item_from_name(&item.name),
            };
            if let Some(own_item) = own_item {
                return LocalItem::Vanilla(own_item);
            }
        } else if self.metroid_item_matching {
            if let Some(matched) = match_metroid_item(&item.game, &item.name) {
                return matched;
            }
        }
        LocalItem::Placeholder(PlaceholderItem::from_classification(
            item.classification.progression,
            item.classification.useful,
        ))
    }

    pub fn encode(&self) -> Result<PlacementEncoding> {
        let mut out = PlacementEncoding::default();
        let mut slot_by_name: HashMap<String, usize> = HashMap::new();

        for loc in &self.session.locations {
            if loc.player != self.self_player {
                continue;
            }
            let Some(address) = loc.address else {
                continue;
            };
            let item = loc.item.as_ref().ok_or_else(|| PatchError::UnplacedLocation {
                player: loc.player,
                location: loc.name.clone(),
            })?;
            ensure!(
                address >= LOCATIONS_START_ID
                    && ((address - LOCATIONS_START_ID) as usize) < LOCATION_COUNT,
                "location {:?} has id {} outside of this game's range",
                loc.name,
                address
            );
            let location_index = (address - LOCATIONS_START_ID) as LocationIdx;

            let local_item = self.local_item(item);
            let (item_id, name_slot) = match local_item {
                LocalItem::Vanilla(own) => (own.rom_id(), None),
                LocalItem::Placeholder(_) => {
                    let next_slot = slot_by_name.len();
                    let slot = *slot_by_name.entry(item.name.clone()).or_insert(next_slot);
                    if slot == out.item_names.len() {
                        out.item_names.push(item.name.clone());
                    }
                    ((VANILLA_ITEM_TYPES_COUNT + slot) as RomItemId, Some(slot))
                }
            };
            if item.game == GAME_NAME && local_item == LocalItem::Vanilla(Item::Nothing) {
                out.locations_nothing.push(location_index);
            }

            let record = ItemLocationRecord {
                location_index,
                destination: self.destination(item.player),
                item_id,
                source_player_rom_index: self.directory.index_of(item.player).unwrap_or(0) as u16,
                progression: item.classification.progression,
                name_slot,
                local_item,
            };
            debug!("{}: {:?}", loc.name, record);
            out.records.push(record);
        }
        info!(
            "Encoded {} item locations for player {} ({} distinct foreign item names)",
            out.records.len(),
            self.self_player,
            out.item_names.len()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiworld::{ItemClassification, ItemLinkGroup, ItemLocation, PlayerInfo};
    use smmr_game::symbols::Symbol;
    use smmr_game::ITEMS_START_ID;

    fn placed(player: PlayerId, name: &str, game: &str, progression: bool) -> PlacedItem {
        PlacedItem {
            player,
            name: name.to_string(),
            game: game.to_string(),
            code: None,
            classification: ItemClassification {
                progression,
                useful: false,
            },
        }
    }

    fn location(player: PlayerId, idx: u64, item: PlacedItem) -> ItemLocation {
        ItemLocation {
            player,
            name: format!("Location {idx}"),
            address: Some(LOCATIONS_START_ID + idx),
            item: Some(item),
        }
    }

    fn symbols() -> SymbolTable {
        let mut symbols = SymbolTable::default();
        symbols.insert(Symbol::new("rando_item_table", 0x80, 0x8000));
        symbols.insert(Symbol::new("message_item_names", 0x81, 0x8000));
        symbols.insert(Symbol::new("locations_nothing", 0x83, 0x8000));
        symbols
    }

    fn two_player_session() -> MultiworldSession {
        MultiworldSession {
            seed: 1,
            host_version: "0.5.1".to_string(),
            players: vec![
                PlayerInfo {
                    id: 1,
                    name: "Samus".to_string(),
                    game: GAME_NAME.to_string(),
                },
                PlayerInfo {
                    id: 2,
                    name: "Link".to_string(),
                    game: "A Link to the Past".to_string(),
                },
            ],
            locations: vec![
                location(1, 0, placed(2, "Hookshot", "A Link to the Past", true)),
                location(1, 1, placed(1, "Morph", GAME_NAME, true)),
                location(1, 2, placed(2, "Hookshot", "A Link to the Past", true)),
                location(1, 3, placed(2, "Bow", "A Link to the Past", false)),
                location(1, 9, placed(1, "Nothing", GAME_NAME, false)),
                location(2, 0, placed(1, "Varia", GAME_NAME, true)),
            ],
            ..Default::default()
        }
    }

    fn encode(session: &MultiworldSession, matching: bool) -> Result<PlacementEncoding> {
        let directory = PlayerDirectory::from_session(session, 1)?;
        ItemPlacementEncoder {
            session,
            directory: &directory,
            self_player: 1,
            metroid_item_matching: matching,
        }
        .encode()
    }

    #[test]
    fn foreign_item_in_own_world() -> Result<()> {
        let session = two_player_session();
        let directory = PlayerDirectory::from_session(&session, 1)?;
        let enc = encode(&session, false)?;
        assert_eq!(enc.records.len(), 5);

        let r = &enc.records[0];
        assert_eq!(r.location_index, 0);
        assert_eq!(r.destination, DestinationType::OtherWorld);
        assert_eq!(
            r.source_player_rom_index as usize,
            directory.index_of(2).unwrap()
        );
        assert_eq!(r.item_id as usize, VANILLA_ITEM_TYPES_COUNT);
        assert_eq!(
            r.local_item,
            LocalItem::Placeholder(PlaceholderItem::ArchipelagoProgItem)
        );
        assert_eq!(enc.item_names, vec!["Hookshot", "Bow"]);
        // The second Hookshot shares the first one's name slot.
        assert_eq!(enc.records[2].name_slot, Some(0));
        assert_eq!(enc.records[2].item_id, r.item_id);
        assert_eq!(enc.records[3].name_slot, Some(1));
        assert_eq!(enc.records[3].item_id as usize, VANILLA_ITEM_TYPES_COUNT + 1);
        assert_eq!(
            enc.records[3].local_item,
            LocalItem::Placeholder(PlaceholderItem::ArchipelagoItem)
        );

        let own = &enc.records[1];
        assert_eq!(own.destination, DestinationType::SameWorld);
        assert_eq!(own.item_id, Item::Morph.rom_id());
        assert_eq!(own.name_slot, None);
        assert_eq!(own.to_bytes(), [0, 0, 19, 0, 1, 0, 0, 0]);
        assert_eq!(enc.locations_nothing, vec![9]);
        Ok(())
    }

    #[test]
    fn foreign_item_ids_point_at_their_names() -> Result<()> {
        let mut session = two_player_session();
        session.locations.extend([
            location(1, 4, placed(2, "Bow", "A Link to the Past", false)),
            location(1, 5, placed(2, "Moon Pearl", "A Link to the Past", true)),
            location(1, 6, placed(2, "Hookshot", "A Link to the Past", true)),
        ]);
        let enc = encode(&session, false)?;
        assert_eq!(enc.item_names, vec!["Hookshot", "Bow", "Moon Pearl"]);
        let mut foreign = 0;
        for record in &enc.records {
            let loc = session
                .locations
                .iter()
                .find(|l| {
                    l.player == 1
                        && l.address == Some(LOCATIONS_START_ID + record.location_index as u64)
                })
                .unwrap();
            let item = loc.item.as_ref().unwrap();
            if item.game == GAME_NAME {
                assert!((record.item_id as usize) < VANILLA_ITEM_TYPES_COUNT);
                continue;
            }
            foreign += 1;
            let slot = record.item_id as usize - VANILLA_ITEM_TYPES_COUNT;
            assert_eq!(enc.item_names[slot], item.name);
            assert_eq!(record.name_slot, Some(slot));
        }
        assert_eq!(foreign, 6);
        Ok(())
    }

    #[test]
    fn nothing_items_of_any_owner_are_listed() -> Result<()> {
        let mut session = two_player_session();
        session.players.push(PlayerInfo {
            id: 3,
            name: "Other Samus".to_string(),
            game: GAME_NAME.to_string(),
        });
        session.locations.extend([
            location(1, 7, placed(3, "Nothing", GAME_NAME, false)),
            location(1, 8, placed(2, "Nothing", "A Link to the Past", false)),
        ]);
        let enc = encode(&session, false)?;
        assert_eq!(enc.locations_nothing, vec![9, 7]);
        let other = enc.records.iter().find(|r| r.location_index == 7).unwrap();
        assert_eq!(other.item_id, Item::Nothing.rom_id());
        assert_eq!(other.destination, DestinationType::OtherWorld);

        let mut mask = [0; LOCATIONS_NOTHING_SIZE];
        mask[0] = 0x80;
        mask[1] = 0x02;
        assert_eq!(enc.locations_nothing_bitmask(), mask);
        Ok(())
    }

    #[test]
    fn item_placement_in_location_order() -> Result<()> {
        let mut session = two_player_session();
        session.locations.insert(0, location(1, 5, placed(1, "ProgMissile", GAME_NAME, true)));
        let enc = encode(&session, false)?;
        assert_eq!(
            enc.item_placement(),
            vec![
                LocalItem::Placeholder(PlaceholderItem::ArchipelagoProgItem),
                LocalItem::Vanilla(Item::Morph),
                LocalItem::Placeholder(PlaceholderItem::ArchipelagoProgItem),
                LocalItem::Placeholder(PlaceholderItem::ArchipelagoItem),
                LocalItem::Vanilla(Item::Missile),
                LocalItem::Vanilla(Item::Nothing),
            ]
        );
        Ok(())
    }

    #[test]
    fn encoding_is_deterministic() -> Result<()> {
        let session = two_player_session();
        let symbols = symbols();
        let a = encode(&session, false)?;
        let b = encode(&session, false)?;
        assert_eq!(a, b);
        for (x, y) in [
            (a.locations_edits(&symbols)?, b.locations_edits(&symbols)?),
            (a.items_edits(&symbols)?, b.items_edits(&symbols)?),
        ] {
            assert_eq!(x.resolve()?.encode()?, y.resolve()?.encode()?);
        }
        Ok(())
    }

    #[test]
    fn edits_layout() -> Result<()> {
        let session = two_player_session();
        let symbols = symbols();
        let enc = encode(&session, false)?;

        let locations = enc.locations_edits(&symbols)?.resolve()?;
        assert_eq!(locations.get(0), Some(&[1, 0, 23, 0, 2, 0, 0, 0][..]));
        assert_eq!(locations.get(9 * 8), Some(&[0, 0, 22, 0, 1, 0, 1, 0][..]));

        let items = enc.items_edits(&symbols)?.resolve()?;
        let bow = items.get(0x8000 + 24 * 64).unwrap();
        assert_eq!(bow.len(), 64);
        assert_eq!(&bow[..2], &[0x0F, 0x00]);
        assert_eq!(items.len(), 2);

        let mut mask = [0; LOCATIONS_NOTHING_SIZE];
        mask[1] = 0x02;
        assert_eq!(enc.locations_nothing_bitmask(), mask);
        Ok(())
    }

    #[test]
    fn linked_and_prog_ammo_items() -> Result<()> {
        let mut session = two_player_session();
        session.groups.push(ItemLinkGroup {
            id: 3,
            name: "Group".to_string(),
            players: vec![1, 2],
        });
        let mut prog_super = placed(1, "ProgSuper", GAME_NAME, true);
        prog_super.code = Some(ITEMS_START_ID + 28);
        session.locations = vec![
            location(1, 4, placed(3, "Rupees", "A Link to the Past", false)),
            location(1, 5, prog_super),
        ];
        let enc = encode(&session, false)?;
        assert_eq!(enc.records[0].destination, DestinationType::LinkedWorld);
        assert_eq!(enc.records[1].item_id, Item::Super.rom_id());
        assert!(enc.records[1].progression);
        Ok(())
    }

    #[test]
    fn metroid_item_matching() -> Result<()> {
        let mut session = two_player_session();
        session.players[1].game = "Metroid Prime".to_string();
        session.locations = vec![location(1, 0, placed(2, "Missile Expansion", "Metroid Prime", false))];
        let matched = encode(&session, true)?;
        assert_eq!(matched.records[0].item_id, Item::Missile.rom_id());
        assert_eq!(matched.records[0].destination, DestinationType::OtherWorld);
        assert!(matched.item_names.is_empty());

        let unmatched = encode(&session, false)?;
        assert_eq!(unmatched.records[0].item_id as usize, VANILLA_ITEM_TYPES_COUNT);
        assert_eq!(unmatched.item_names, vec!["Missile Expansion"]);
        assert_eq!(
            unmatched.records[0].local_item,
            LocalItem::Placeholder(PlaceholderItem::ArchipelagoItem)
        );
        Ok(())
    }

    #[test]
    fn unplaced_location_fails() {
        let mut session = two_player_session();
        session.locations[1].item = None;
        let err = encode(&session, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PatchError>(),
            Some(PatchError::UnplacedLocation { player: 1, .. })
        ));
    }

    #[test]
    fn item_name_text() {
        let text = rom_item_name("Hookshot");
        assert_eq!(text.len(), 64);
        // "___" + 9 spaces + "HOOKSHOT" + 9 spaces + "___"
        assert_eq!(&text[0..6], &[0x0F, 0x00, 0x0F, 0x00, 0x0F, 0x00]);
        assert_eq!(&text[6..8], &[0x0F, 0x2C]);
        assert_eq!(&text[24..26], &[0xC7, 0x2C]);
        let odd = rom_item_name("Small Key (Tower of Hera) x2 extra");
        assert_eq!(odd.len(), 64);
        // '(' has no tile and shows as '?'.
        assert_eq!(&odd[6 + 10 * 2..6 + 11 * 2], &[0xDE, 0x2C]);
    }
}
