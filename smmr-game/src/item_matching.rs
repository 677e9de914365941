//! Display matching for items from other Metroid games.
//!
//! Items from these games are shown with the closest native item graphics. Unique upgrades
//! with no native counterpart are shown as a "useful progression" placeholder (full dot),
//! and ammo expansions without a counterpart as a "useful" placeholder.

use hashbrown::HashMap;
use log::debug;
use once_cell::sync::Lazy;

use crate::{Item, LocalItem, PlaceholderItem};

const DEFAULT_MAJOR: LocalItem = LocalItem::Placeholder(PlaceholderItem::ArchipelagoUsefulProgItem);
const DEFAULT_AMMO: LocalItem = LocalItem::Placeholder(PlaceholderItem::ArchipelagoUsefulItem);

const fn v(item: Item) -> LocalItem {
    LocalItem::Vanilla(item)
}

static METROID_ITEM_MATCHING: &[(&str, &[(&str, LocalItem)])] = &[
    (
        "Super Metroid",
        &[
            ("Energy Tank", v(Item::ETank)),
            ("Missile", v(Item::Missile)),
            ("Super Missile", v(Item::Super)),
            ("Power Bomb", v(Item::PowerBomb)),
            ("Grappling Beam", v(Item::Grapple)),
            ("X-Ray Scope", v(Item::XRayScope)),
            ("Reserve Tank", v(Item::ReserveTank)),
            ("Charge Beam", v(Item::Charge)),
            ("Ice Beam", v(Item::Ice)),
            ("Wave Beam", v(Item::Wave)),
            ("Spazer", v(Item::Spazer)),
            ("Plasma Beam", v(Item::Plasma)),
            ("Varia Suit", v(Item::Varia)),
            ("Gravity Suit", v(Item::Gravity)),
            ("Morph Ball", v(Item::Morph)),
            ("Bomb", v(Item::Bombs)),
            ("Spring Ball", v(Item::SpringBall)),
            ("Screw Attack", v(Item::ScrewAttack)),
            ("Hi-Jump Boots", v(Item::HiJump)),
            ("Space Jump", v(Item::SpaceJump)),
            ("Speed Booster", v(Item::SpeedBooster)),
        ],
    ),
    (
        "SMZ3",
        &[
            ("ETank", v(Item::ETank)),
            ("Missile", v(Item::Missile)),
            ("Super", v(Item::Super)),
            ("PowerBomb", v(Item::PowerBomb)),
            ("Grapple", v(Item::Grapple)),
            ("XRay", v(Item::XRayScope)),
            ("ReserveTank", v(Item::ReserveTank)),
            ("Charge", v(Item::Charge)),
            ("Ice", v(Item::Ice)),
            ("Wave", v(Item::Wave)),
            ("Spazer", v(Item::Spazer)),
            ("Plasma", v(Item::Plasma)),
            ("Varia", v(Item::Varia)),
            ("Gravity", v(Item::Gravity)),
            ("Morph", v(Item::Morph)),
            ("Bombs", v(Item::Bombs)),
            ("SpringBall", v(Item::SpringBall)),
            ("ScrewAttack", v(Item::ScrewAttack)),
            ("HiJump", v(Item::HiJump)),
            ("SpaceJump", v(Item::SpaceJump)),
            ("SpeedBooster", v(Item::SpeedBooster)),
        ],
    ),
    (
        "Metroid Fusion",
        &[
            ("Missile Data", DEFAULT_MAJOR),
            ("Missile Tank", v(Item::Missile)),
            ("Super Missile", DEFAULT_MAJOR),
            ("Ice Missile", DEFAULT_MAJOR),
            ("Diffusion Missile", DEFAULT_MAJOR),
            ("Power Bomb Data", DEFAULT_MAJOR),
            ("Power Bomb Tank", v(Item::PowerBomb)),
            ("Energy Tank", v(Item::ETank)),
            ("Charge Beam", v(Item::Charge)),
            ("Wide Beam", v(Item::Spazer)),
            ("Plasma Beam", v(Item::Plasma)),
            ("Wave Beam", v(Item::Wave)),
            ("Ice Beam", v(Item::Ice)),
            ("Morph Ball", v(Item::Morph)),
            ("Bomb Data", v(Item::Bombs)),
            ("Hi-Jump", v(Item::HiJump)),
            ("Space Jump", v(Item::SpaceJump)),
            ("Speed Booster", v(Item::SpeedBooster)),
            ("Screw Attack", v(Item::ScrewAttack)),
            ("Varia Suit", v(Item::Varia)),
            ("Gravity Suit", v(Item::Gravity)),
            ("Nothing", v(Item::Nothing)),
        ],
    ),
    (
        "Metroid Zero Mission",
        &[
            ("Energy Tank", v(Item::ETank)),
            ("Missile Tank", v(Item::Missile)),
            ("Super Missile Tank", v(Item::Super)),
            ("Power Bomb Tank", v(Item::PowerBomb)),
            ("Long Beam", DEFAULT_MAJOR),
            ("Charge Beam", v(Item::Charge)),
            ("Ice Beam", v(Item::Ice)),
            ("Wave Beam", v(Item::Wave)),
            ("Plasma Beam", v(Item::Plasma)),
            ("Bomb", v(Item::Bombs)),
            ("Varia Suit", v(Item::Varia)),
            ("Gravity Suit", v(Item::Gravity)),
            ("Morph Ball", v(Item::Morph)),
            ("Speed Booster", v(Item::SpeedBooster)),
            ("Hi-Jump", v(Item::HiJump)),
            ("Screw Attack", v(Item::ScrewAttack)),
            ("Space Jump", v(Item::SpaceJump)),
            ("Power Grip", DEFAULT_MAJOR),
            ("Fully Powered Suit", DEFAULT_MAJOR),
            ("Wall Jump", v(Item::WallJump)),
            ("Spring Ball", v(Item::SpringBall)),
        ],
    ),
    (
        "Metroid Prime",
        &[
            ("Charge Beam", v(Item::Charge)),
            ("Power Beam", DEFAULT_MAJOR),
            ("Progressive Power Beam", DEFAULT_MAJOR),
            ("Super Missile", DEFAULT_MAJOR),
            ("Ice Beam", v(Item::Ice)),
            ("Progressive Ice Beam", v(Item::Ice)),
            ("Ice Spreader", DEFAULT_MAJOR),
            ("Wave Beam", v(Item::Wave)),
            ("Progressive Wave Beam", v(Item::Wave)),
            ("Wavebuster", DEFAULT_MAJOR),
            ("Plasma Beam", v(Item::Plasma)),
            ("Progressive Plasma Beam", v(Item::Plasma)),
            ("Flamethrower", DEFAULT_MAJOR),
            ("Missile Launcher", DEFAULT_MAJOR),
            ("Missile Expansion", v(Item::Missile)),
            ("Power Bomb (Main)", DEFAULT_MAJOR),
            ("Power Bomb Expansion", v(Item::PowerBomb)),
            ("Energy Tank", v(Item::ETank)),
            ("Morph Ball", v(Item::Morph)),
            ("Morph Ball Bomb", v(Item::Bombs)),
            ("Boost Ball", DEFAULT_MAJOR),
            ("Spider Ball", DEFAULT_MAJOR),
            ("Varia Suit", v(Item::Varia)),
            ("Gravity Suit", v(Item::Gravity)),
            ("Phazon Suit", DEFAULT_MAJOR),
            ("Space Jump Boots", v(Item::SpaceJump)),
            ("Grapple Beam", v(Item::Grapple)),
            ("Scan Visor", DEFAULT_MAJOR),
            ("Thermal Visor", DEFAULT_MAJOR),
            ("X-Ray Visor", v(Item::XRayScope)),
        ],
    ),
    (
        "Metroid Prime 2 Echoes",
        &[
            ("Power Beam", DEFAULT_MAJOR),
            ("Dark Beam", DEFAULT_MAJOR),
            ("Light Beam", DEFAULT_MAJOR),
            ("Annihilator Beam", DEFAULT_MAJOR),
            ("Super Missile", DEFAULT_MAJOR),
            ("Darkburst", DEFAULT_MAJOR),
            ("Sunburst", DEFAULT_MAJOR),
            ("Sonic Boom", DEFAULT_MAJOR),
            ("Combat Visor", DEFAULT_MAJOR),
            ("Scan Visor", DEFAULT_MAJOR),
            ("Dark Visor", DEFAULT_MAJOR),
            ("Echo Visor", DEFAULT_MAJOR),
            ("Dark Suit", DEFAULT_MAJOR),
            ("Light Suit", DEFAULT_MAJOR),
            ("Morph Ball", v(Item::Morph)),
            ("Boost Ball", DEFAULT_MAJOR),
            ("Spider Ball", DEFAULT_MAJOR),
            ("Morph Ball Bomb", v(Item::Bombs)),
            ("Charge Beam", v(Item::Charge)),
            ("Grapple Beam", v(Item::Grapple)),
            ("Space Jump Boots", v(Item::SpaceJump)),
            ("Gravity Boost", DEFAULT_MAJOR),
            ("Seeker Launcher", DEFAULT_MAJOR),
            ("Screw Attack", v(Item::ScrewAttack)),
            ("Energy Tank", v(Item::ETank)),
            ("Power Bomb Expansion", v(Item::PowerBomb)),
            ("Missile Expansion", v(Item::Missile)),
            ("Dark Ammo Expansion", DEFAULT_AMMO),
            ("Light Ammo Expansion", DEFAULT_AMMO),
            ("Beam Ammo Expansion", DEFAULT_AMMO),
            ("Missile Launcher", DEFAULT_MAJOR),
            ("Power Bomb Launcher", DEFAULT_MAJOR),
            ("Unlimited Missiles", DEFAULT_AMMO),
            ("Unlimited Beam Ammo", DEFAULT_AMMO),
            ("Energy Transfer Module", DEFAULT_MAJOR),
        ],
    ),
];

type MatchingMap = HashMap<&'static str, HashMap<&'static str, LocalItem>>;

static MATCHING_MAP: Lazy<MatchingMap> = Lazy::new(|| {
    let map: MatchingMap = METROID_ITEM_MATCHING
        .iter()
        .map(|&(game, items)| (game, items.iter().copied().collect()))
        .collect();
    debug!("Loaded item matching tables for {} games", map.len());
    map
});

/// Local item used to display `item_name` from `game`, if that game has a matching table entry.
pub fn match_metroid_item(game: &str, item_name: &str) -> Option<LocalItem> {
    MATCHING_MAP.get(game)?.get(item_name).copied()
}
