use hashbrown::HashMap;
use log::warn;
use smmr_game::util::sorted_hashmap_iter;
use smmr_game::{own_item_from_name, Item};

use crate::patch::ips::IpsPatch;
use crate::patch::snes2pc;

#[derive(Copy, Clone, Debug)]
enum StartItemKind {
    // Capacity added per item, to both the current and the max amount.
    Counter(u16),
    // Bit set in both the collected and the equipped mask.
    Flag(u16),
}

struct StartItemInfo {
    current_addr: usize,
    kind: StartItemKind,
    max_addr: usize,
}

// Initial inventory addresses of the base patch's new game code (bank B5):
const INITIAL_ENERGY: usize = 0xB5FE52;
const INITIAL_MAX_ENERGY: usize = 0xB5FE54;
const INITIAL_BEAMS_EQUIPPED: usize = 0xB5FE0A;
// Everything past the item/beam masks is a 16-bit word.
const LAST_BYTE_ADDR: usize = 0xB5FE0B;
const STARTING_ENERGY: u16 = 99;

fn start_item_info(item: Item) -> Option<StartItemInfo> {
    use StartItemKind::*;
    let (current, kind) = match item {
        Item::ETank => (0xB5FE52, Counter(100)),
        Item::Missile => (0xB5FE5C, Counter(5)),
        Item::Super => (0xB5FE60, Counter(5)),
        Item::PowerBomb => (0xB5FE64, Counter(5)),
        Item::ReserveTank => (0xB5FE56, Counter(100)),
        Item::Varia => (0xB5FE04, Flag(0x01)),
        Item::SpringBall => (0xB5FE04, Flag(0x02)),
        Item::Morph => (0xB5FE04, Flag(0x04)),
        Item::ScrewAttack => (0xB5FE04, Flag(0x08)),
        Item::Gravity => (0xB5FE04, Flag(0x20)),
        Item::HiJump => (0xB5FE05, Flag(0x01)),
        Item::SpaceJump => (0xB5FE05, Flag(0x02)),
        Item::Bombs => (0xB5FE05, Flag(0x10)),
        Item::SpeedBooster => (0xB5FE05, Flag(0x20)),
        Item::Grapple => (0xB5FE05, Flag(0x40)),
        Item::XRayScope => (0xB5FE05, Flag(0x80)),
        Item::Wave => (0xB5FE08, Flag(0x01)),
        Item::Ice => (0xB5FE08, Flag(0x02)),
        Item::Spazer => (0xB5FE08, Flag(0x04)),
        Item::Plasma => (0xB5FE08, Flag(0x08)),
        Item::Charge => (0xB5FE09, Flag(0x10)),
        Item::WallJump | Item::Nothing => return None,
    };
    Some(StartItemInfo {
        current_addr: snes2pc(current),
        kind,
        max_addr: snes2pc(current + 2),
    })
}

/// Starting inventory values keyed by ROM file offset, merged over all starting items.
/// Counters saturate at 0xFFFF.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StartItemAccumulation {
    pub values: HashMap<usize, u16>,
}

impl StartItemAccumulation {
    pub fn from_items(items: &[Item]) -> Self {
        let mut values: HashMap<usize, u16> = HashMap::new();
        for &item in items {
            let Some(info) = start_item_info(item) else {
                warn!("Starting item {item:?} has no starting inventory slot, skipping");
                continue;
            };
            for addr in [info.current_addr, info.max_addr] {
                let v = values.entry(addr).or_insert(0);
                match info.kind {
                    StartItemKind::Counter(amount) => *v = v.saturating_add(amount),
                    StartItemKind::Flag(mask) => *v |= mask,
                }
            }
        }

        // The starting inventory replaces the default energy rather than adding to it.
        if items.contains(&Item::ETank) {
            for addr in [INITIAL_ENERGY, INITIAL_MAX_ENERGY] {
                let v = values.entry(snes2pc(addr)).or_insert(0);
                *v = v.saturating_add(STARTING_ENERGY);
            }
        }
        // The Spazer+Plasma combination glitches the game, so leave Spazer unequipped.
        if items.contains(&Item::Spazer) && items.contains(&Item::Plasma) {
            if let Some(v) = values.get_mut(&snes2pc(INITIAL_BEAMS_EQUIPPED)) {
                *v &= !0x04;
            }
        }
        StartItemAccumulation { values }
    }

    /// Resolve starting item names, as the multiworld host reports them.
    pub fn from_item_names(names: &[String]) -> Self {
        let items: Vec<Item> = names
            .iter()
            .filter_map(|name| {
                let item = own_item_from_name(name);
                if item.is_none() {
                    warn!("Unknown starting item {name:?}, skipping");
                }
                item
            })
            .collect();
        Self::from_items(&items)
    }

    pub fn to_patch(&self) -> IpsPatch {
        let mut patch = IpsPatch::new();
        for (&addr, &value) in sorted_hashmap_iter(&self.values) {
            if addr > snes2pc(LAST_BYTE_ADDR) {
                patch.insert(addr, &value.to_le_bytes());
            } else {
                patch.insert(addr, &[value as u8]);
            }
        }
        patch
    }
}
