//! Output generation for one player: everything the multiworld host calls once the fill is done.

use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use base64::Engine;
use log::{info, warn};
use serde_json::json;
use smmr_game::symbols::SymbolTable;
use smmr_game::{LocalItem, LocationIdx, PlayerId};

use crate::artifact::PatchArtifact;
use crate::base_rom::SM_BASE_ROM_MD5;
use crate::gate::{GateGuard, OnceGate};
use crate::multiworld::{Multidata, MultiworldSession, OptionSettings};
use crate::patch::edits::ByteEditSet;
use crate::patch::ips::IpsPatch;
use crate::patch::{ROM_NAME_ADDR, ROM_NAME_LEN};
use crate::placement::ItemPlacementEncoder;
use crate::players::PlayerDirectory;
use crate::start_items::StartItemAccumulation;

/// Map Rando library release the base patch and randomization data are built for.
pub const REQUIRED_MAP_RANDO_VERSION: &str = "0.119.1";

const SPRITE_PALETTE_LEN: usize = 8;
const SPRITE_TILES_LEN: usize = 256;

/// Graphics for items belonging to other players.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OffworldSprites {
    pub progression_item: Vec<u8>,
    pub item: Vec<u8>,
}

impl OffworldSprites {
    pub fn new(progression_item: Vec<u8>, item: Vec<u8>) -> Result<Self> {
        for (name, data) in [("progression", &progression_item), ("non-progression", &item)] {
            ensure!(
                data.len() >= SPRITE_PALETTE_LEN + SPRITE_TILES_LEN,
                "{name} item sprite has {} bytes, expected {}",
                data.len(),
                SPRITE_PALETTE_LEN + SPRITE_TILES_LEN
            );
        }
        Ok(OffworldSprites {
            progression_item,
            item,
        })
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let read = |file_name: &str| {
            let path = dir.join(file_name);
            std::fs::read(&path)
                .with_context(|| format!("Unable to read item sprite {}", path.display()))
        };
        Self::new(read("off_world_prog_item.bin")?, read("off_world_item.bin")?)
    }

    fn edits(&self, symbols: &SymbolTable) -> Result<ByteEditSet> {
        let mut edits = ByteEditSet::new();
        for (data, palette_sym, tiles_sym) in [
            (
                &self.progression_item,
                "prog_item_eight_palette_indices",
                "offworld_graphics_data_progression_item",
            ),
            (
                &self.item,
                "nonprog_item_eight_palette_indices",
                "offworld_graphics_data_item",
            ),
        ] {
            edits.push(symbols.get(palette_sym)?, 0, &data[..SPRITE_PALETTE_LEN]);
            edits.push(
                symbols.get(tiles_sym)?,
                0,
                &data[SPRITE_PALETTE_LEN..SPRITE_PALETTE_LEN + SPRITE_TILES_LEN],
            );
        }
        Ok(edits)
    }
}

/// SNES header title identifying the seed and player, zero-padded to 21 bytes.
pub fn make_rom_name(host_version: &str, player: PlayerId, seed: u64) -> [u8; ROM_NAME_LEN] {
    let host_digits: String = host_version.replace('.', "").chars().take(3).collect();
    let mr_digits = REQUIRED_MAP_RANDO_VERSION.replace('.', "");
    let name = format!("SMMR{host_digits}{mr_digits}{player}{seed:>8}");
    let mut out = [0; ROM_NAME_LEN];
    let len = name.len().min(ROM_NAME_LEN);
    out[..len].copy_from_slice(&name.as_bytes()[..len]);
    out
}

pub struct GenerationContext<'a> {
    pub session: &'a MultiworldSession,
    pub symbols: &'a SymbolTable,
    pub sprites: &'a OffworldSprites,
    /// Map Rando randomization for this player, passed through to the client.
    pub randomization: serde_json::Value,
}

#[derive(Clone, Debug)]
pub struct GeneratedPatches {
    /// In application order.
    pub components: Vec<(String, IpsPatch)>,
    pub rom_name: [u8; ROM_NAME_LEN],
    pub locations_nothing: Vec<LocationIdx>,
    /// This player's items in location order, as the randomizer should show them.
    pub item_placement: Vec<LocalItem>,
}

/// Replace the randomization's item placement with the multiworld one, so the customizer
/// draws the right graphics at every location.
pub fn with_item_placement(
    randomization: &serde_json::Value,
    item_placement: &[LocalItem],
) -> Result<serde_json::Value> {
    let mut randomization = match randomization {
        serde_json::Value::Null => json!({}),
        other => other.clone(),
    };
    let Some(fields) = randomization.as_object_mut() else {
        bail!("Randomization data must be a JSON object");
    };
    fields.insert(
        "item_placement".to_string(),
        serde_json::to_value(item_placement)?,
    );
    Ok(randomization)
}

pub fn make_ips_patches(
    ctx: &GenerationContext,
    player: PlayerId,
    options: &OptionSettings,
) -> Result<GeneratedPatches> {
    let session = ctx.session;
    let symbols = ctx.symbols;
    let directory = PlayerDirectory::from_session(session, player)?;
    let placement = ItemPlacementEncoder {
        session,
        directory: &directory,
        self_player: player,
        metroid_item_matching: options.metroid_item_matching,
    }
    .encode()?;

    let mut death_link = ByteEditSet::new();
    death_link.push(symbols.get("config_deathlink")?, 0, [options.death_link as u8]);
    let mut remote_items = ByteEditSet::new();
    remote_items.push_u16(
        symbols.get("config_remote_items")?,
        0,
        0b001 | if options.remote_items { 0b010 } else { 0b000 },
    );
    let mut own_player_id = ByteEditSet::new();
    own_player_id.push_u16(symbols.get("config_player_id")?, 0, player as u16);

    let rom_name = make_rom_name(&session.host_version, player, session.seed);
    let rom_name_patch: IpsPatch = vec![(ROM_NAME_ADDR, rom_name.to_vec())].into_iter().collect();
    let start_inventory =
        StartItemAccumulation::from_item_names(session.precollected_items(player)).to_patch();

    let components: Vec<(String, IpsPatch)> = vec![
        ("locations", placement.locations_edits(symbols)?.resolve()?),
        ("items", placement.items_edits(symbols)?.resolve()?),
        ("sprites", ctx.sprites.edits(symbols)?.resolve()?),
        ("death_link", death_link.resolve()?),
        ("remote_items", remote_items.resolve()?),
        ("own_player_id", own_player_id.resolve()?),
        ("player_names", directory.name_table_edits(symbols)?.resolve()?),
        ("player_ids", directory.id_table_edits(symbols)?.resolve()?),
        ("locations_nothing", placement.locations_nothing_edits(symbols)?.resolve()?),
        ("start_inventory", start_inventory),
        ("rom_name", rom_name_patch),
    ]
    .into_iter()
    .map(|(name, patch)| (name.to_string(), patch))
    .collect();
    Ok(GeneratedPatches {
        components,
        rom_name,
        item_placement: placement.item_placement(),
        locations_nothing: placement.locations_nothing,
    })
}

/// Per-player state kept by the host between output generation and multidata assembly.
pub struct SmmrWorld {
    pub player: PlayerId,
    pub player_name: String,
    pub options: OptionSettings,
    rom_name: OnceGate<Option<Vec<u8>>>,
}

impl SmmrWorld {
    pub fn new(player: PlayerId, player_name: &str, options: OptionSettings) -> Self {
        SmmrWorld {
            player,
            player_name: player_name.to_string(),
            options,
            rom_name: OnceGate::new(),
        }
    }

    /// Build the patch artifact. The ROM name is published when this returns, whether it
    /// succeeded or not, so `modify_multidata` never waits forever.
    pub fn generate_output(&self, ctx: &GenerationContext) -> Result<PatchArtifact> {
        let guard = GateGuard::new(&self.rom_name, None);
        let patches = make_ips_patches(ctx, self.player, &self.options)?;
        let randomization = with_item_placement(&ctx.randomization, &patches.item_placement)?;
        let rando_data = json!({
            "customize_settings": self.options.customize_settings,
            "map_rando_settings": self.options.map_rando_settings,
            "randomization": randomization,
        });
        let artifact = PatchArtifact::new(
            self.player,
            &self.player_name,
            SM_BASE_ROM_MD5,
            &patches.rom_name,
            rando_data,
            patches.components,
        );
        info!(
            "Generated patch for player {} ({}) with {} components",
            self.player,
            self.player_name,
            artifact.components.len()
        );
        guard.set(Some(patches.rom_name.to_vec()));
        Ok(artifact)
    }

    /// The ROM name once output generation has finished, or `None` if it failed or is still
    /// running.
    pub fn rom_name(&self) -> Option<Vec<u8>> {
        self.rom_name.get().flatten()
    }

    /// Register the ROM name as an extra connect name for this player.
    /// Blocks until output generation has finished.
    pub fn modify_multidata(&self, multidata: &mut Multidata) {
        // On failure, skip: the error from the generation thread is the one to report.
        let Some(rom_name) = self.rom_name.wait() else {
            return;
        };
        let new_name = base64::engine::general_purpose::STANDARD.encode(&rom_name);
        match multidata.connect_names.get(&self.player_name).cloned() {
            Some(entry) => {
                multidata.connect_names.insert(new_name, entry);
            }
            None => warn!("No connect name entry for player {:?}", self.player_name),
        }
    }

    pub fn slot_data(&self, session: &MultiworldSession) -> Result<serde_json::Value> {
        if session.is_race {
            return Ok(json!({}));
        }
        let directory = PlayerDirectory::from_session(session, self.player)?;
        let placement = ItemPlacementEncoder {
            session,
            directory: &directory,
            self_player: self.player,
            metroid_item_matching: self.options.metroid_item_matching,
        }
        .encode()?;
        Ok(json!({ "locations_nothing": placement.locations_nothing }))
    }
}
