// The changes suggested by this lint usually make the code more cluttered and less clear:
#![allow(clippy::needless_range_loop)]

pub mod item_matching;
pub mod symbols;
pub mod util;

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::EnumString;

pub const GAME_NAME: &str = "Super Metroid Map Rando";

// Id bases used by the multiworld host for this game's locations and items:
pub const LOCATIONS_START_ID: u64 = 86000;
pub const ITEMS_START_ID: u64 = 87000;
pub const LOCATION_COUNT: usize = 100;

// Number of item types the game engine knows natively (ETank through Nothing).
pub const VANILLA_ITEM_TYPES_COUNT: usize = 23;

pub type PlayerId = usize; // Multiworld player id (0 is the server)
pub type LocationIdx = usize; // Index into the ROM item table: location id - LOCATIONS_START_ID
pub type RomItemId = u16; // Item id as written into the ROM item table

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    TryFromPrimitive,
    Serialize,
    Deserialize,
    PartialOrd,
    Ord,
)]
#[repr(usize)]
pub enum Item {
    ETank,        // 0
    Missile,      // 1
    Super,        // 2
    PowerBomb,    // 3
    Bombs,        // 4
    Charge,       // 5
    Ice,          // 6
    HiJump,       // 7
    SpeedBooster, // 8
    Wave,         // 9
    Spazer,       // 10
    SpringBall,   // 11
    Varia,        // 12
    Gravity,      // 13
    XRayScope,    // 14
    Plasma,       // 15
    Grapple,      // 16
    SpaceJump,    // 17
    ScrewAttack,  // 18
    Morph,        // 19
    ReserveTank,  // 20
    WallJump,     // 21
    Nothing,      // 22
}

impl Item {
    pub fn rom_id(self) -> RomItemId {
        self as RomItemId
    }
}

/// Generic items the randomizer shows for items of other games, picked by classification.
/// Their codes follow directly after the vanilla item types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(usize)]
pub enum PlaceholderItem {
    ArchipelagoItem = 23,
    ArchipelagoProgItem = 24,
    ArchipelagoUsefulItem = 25,
    ArchipelagoUsefulProgItem = 26,
}

impl PlaceholderItem {
    pub fn from_classification(progression: bool, useful: bool) -> Self {
        match (progression, useful) {
            (false, false) => PlaceholderItem::ArchipelagoItem,
            (true, false) => PlaceholderItem::ArchipelagoProgItem,
            (false, true) => PlaceholderItem::ArchipelagoUsefulItem,
            (true, true) => PlaceholderItem::ArchipelagoUsefulProgItem,
        }
    }
}

/// Item as the game knows it: either a native item or a generic placeholder.
/// Serializes as the bare item name, the way the randomizer's item placement lists it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalItem {
    Vanilla(Item),
    Placeholder(PlaceholderItem),
}

// Progression-tagged ammo items exist only on the multiworld side; in the ROM they are
// ordinary ammo pickups.
const PROG_AMMO: [(&str, Item); 3] = [
    ("ProgMissile", Item::Missile),
    ("ProgSuper", Item::Super),
    ("ProgPowerBomb", Item::PowerBomb),
];

/// Resolve one of this game's own items (by multiworld item name) to its native item.
pub fn own_item_from_name(name: &str) -> Option<Item> {
    if let Ok(item) = Item::from_str(name) {
        return Some(item);
    }
    PROG_AMMO
        .iter()
        .find(|(prog_name, _)| *prog_name == name)
        .map(|&(_, item)| item)
}

/// Resolve one of this game's own items (by multiworld item code) to its native item.
pub fn own_item_from_code(code: u64) -> Option<Item> {
    let idx = code.checked_sub(ITEMS_START_ID)? as usize;
    if idx < VANILLA_ITEM_TYPES_COUNT {
        return Item::try_from_primitive(idx).ok();
    }
    // Prog ammo ids follow the four placeholder ids.
    let prog_idx = idx.checked_sub(VANILLA_ITEM_TYPES_COUNT + 4)?;
    PROG_AMMO.get(prog_idx).map(|&(_, item)| item)
}
