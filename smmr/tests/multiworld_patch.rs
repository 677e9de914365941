use std::sync::Arc;
use std::thread;

use anyhow::Result;
use base64::Engine;
use smmr::artifact::{PatchArtifact, COMPONENT_ORDER};
use smmr::base_rom::rom_md5;
use smmr::error::PatchError;
use smmr::generate::{GenerationContext, OffworldSprites, SmmrWorld};
use smmr::multiworld::{
    ItemClassification, ItemLocation, Multidata, MultiworldSession, OptionSettings, PlacedItem,
    PlayerInfo,
};
use smmr::orchestrator::PatchOrchestrator;
use smmr::patch::checksum::{compute_checksum, CHECKSUM_ADDR};
use smmr::patch::ips::IpsPatch;
use smmr::patch::{snes2pc, EXPANDED_ROM_SIZE, ROM_NAME_ADDR, ROM_NAME_LEN};
use smmr_game::symbols::SymbolTable;
use smmr_game::{GAME_NAME, LOCATIONS_START_ID};

const SYMBOLS_JSON: &str = r#"{
    "rando_item_table": "B8:E000",
    "rando_player_name_table": "B8:F000",
    "rando_player_id_table": "B8:FD00",
    "message_item_names": "F0:8000",
    "locations_nothing": "CE:FF20",
    "config_deathlink": "CE:FF04",
    "config_remote_items": "CE:FF06",
    "config_player_id": "CE:FF08",
    "prog_item_eight_palette_indices": "F1:8000",
    "offworld_graphics_data_progression_item": "F1:8010",
    "nonprog_item_eight_palette_indices": "F1:8110",
    "offworld_graphics_data_item": "F1:8120",
    "received_item_queue": "7F:0000"
}"#;

fn file_offset(symbols: &SymbolTable, name: &str) -> usize {
    symbols.rom_offset(name).unwrap().unwrap()
}

fn placed(player: usize, name: &str, game: &str, progression: bool) -> PlacedItem {
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

fn location(player: usize, idx: u64, item: PlacedItem) -> ItemLocation {
    ItemLocation {
        player,
        name: format!("Location {idx}"),
        address: Some(LOCATIONS_START_ID + idx),
        item: Some(item),
    }
}

fn session() -> MultiworldSession {
    let mut session = MultiworldSession {
        seed: 4242,
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
            location(1, 1, placed(1, "Charge", GAME_NAME, true)),
            location(1, 2, placed(1, "Nothing", GAME_NAME, false)),
            location(2, 0, placed(1, "Varia", GAME_NAME, true)),
        ],
        ..Default::default()
    };
    session
        .precollected
        .insert(1, vec!["Morph".to_string(), "ETank".to_string()]);
    session
}

fn sprites() -> Result<OffworldSprites> {
    OffworldSprites::new(vec![0x11; 264], vec![0x22; 264])
}

fn options() -> OptionSettings {
    OptionSettings {
        death_link: true,
        remote_items: true,
        ..Default::default()
    }
}

#[test]
fn generate_and_patch() -> Result<()> {
    let symbols = SymbolTable::parse(SYMBOLS_JSON)?;
    let session = session();
    let sprites = sprites()?;
    let world = SmmrWorld::new(1, "Samus", options());
    let ctx = GenerationContext {
        session: &session,
        symbols: &symbols,
        sprites: &sprites,
        randomization: serde_json::json!({"seed": 4242}),
    };
    let artifact = world.generate_output(&ctx)?;
    assert_eq!(artifact.manifest.procedure, COMPONENT_ORDER.to_vec());
    assert_eq!(world.rom_name(), Some(artifact.manifest.rom_name.clone()));
    assert_eq!(artifact.rando_data["randomization"]["seed"], 4242);
    assert_eq!(
        artifact.rando_data["randomization"]["item_placement"],
        serde_json::json!(["ArchipelagoProgItem", "Charge", "Nothing"])
    );

    // Generation is deterministic.
    let again = SmmrWorld::new(1, "Samus", options()).generate_output(&ctx)?;
    assert_eq!(again.to_bytes()?, artifact.to_bytes()?);

    let mut artifact = PatchArtifact::from_bytes(&artifact.to_bytes()?)?;
    let base = vec![0; 0x80000];
    let base_md5 = rom_md5(&base);
    artifact.manifest.base_md5 = base_md5.clone();
    let base_patch: IpsPatch = vec![(EXPANDED_ROM_SIZE - 4, vec![0xEA; 4])]
        .into_iter()
        .collect();
    let aux_patch: IpsPatch = vec![(0x100, vec![7; 4])].into_iter().collect();
    let out = PatchOrchestrator::replay_artifact(
        &base,
        &base_md5,
        &base_patch,
        &[aux_patch],
        &artifact,
    )?;
    assert_eq!(out.len(), EXPANDED_ROM_SIZE);
    assert_eq!(&out[0x100..0x104], &[7; 4]);

    // Foreign progression item in our world, sent to player 2 (directory index 2). Its id
    // is the first name slot after the vanilla items.
    let table = file_offset(&symbols, "rando_item_table");
    assert_eq!(&out[table..table + 8], &[1, 0, 23, 0, 2, 0, 0, 0]);
    assert_eq!(&out[table + 8..table + 16], &[0, 0, 5, 0, 1, 0, 0, 0]);
    assert_eq!(&out[table + 16..table + 24], &[0, 0, 22, 0, 1, 0, 1, 0]);

    let names = file_offset(&symbols, "message_item_names") + out[table + 2] as usize * 64;
    // 'H' of "HOOKSHOT", centered in the 26 character field.
    assert_eq!(&out[names + 24..names + 26], &[0xC7, 0x2C]);

    let player_names = file_offset(&symbols, "rando_player_name_table");
    assert_eq!(&out[player_names + 32..player_names + 48], b"      LINK      ");
    let player_ids = file_offset(&symbols, "rando_player_id_table");
    assert_eq!(&out[player_ids..player_ids + 6], &[0, 0, 1, 0, 2, 0]);

    assert_eq!(out[file_offset(&symbols, "config_deathlink")], 1);
    let remote = file_offset(&symbols, "config_remote_items");
    assert_eq!(&out[remote..remote + 2], &[0b011, 0]);
    let own_id = file_offset(&symbols, "config_player_id");
    assert_eq!(&out[own_id..own_id + 2], &[1, 0]);
    assert_eq!(out[file_offset(&symbols, "locations_nothing")], 0b100);

    let palette = file_offset(&symbols, "nonprog_item_eight_palette_indices");
    assert_eq!(&out[palette..palette + 8], &[0x22; 8]);

    assert_eq!(out[snes2pc(0xB5FE04)], 0x04);
    assert_eq!(&out[snes2pc(0xB5FE52)..snes2pc(0xB5FE52) + 2], &[199, 0]);

    let rom_name = &out[ROM_NAME_ADDR..ROM_NAME_ADDR + ROM_NAME_LEN];
    assert_eq!(rom_name, b"SMMR051011911    4242");

    let crc = u16::from_le_bytes([out[CHECKSUM_ADDR + 2], out[CHECKSUM_ADDR + 3]]);
    let inv = u16::from_le_bytes([out[CHECKSUM_ADDR], out[CHECKSUM_ADDR + 1]]);
    assert_eq!(inv, crc ^ 0xFFFF);
    let mut unsummed = out.clone();
    unsummed[CHECKSUM_ADDR..CHECKSUM_ADDR + 4].fill(0);
    assert_eq!(compute_checksum(&unsummed), crc);
    Ok(())
}

#[test]
fn unplaced_location_in_other_world_fails_generation() -> Result<()> {
    let symbols = SymbolTable::parse(SYMBOLS_JSON)?;
    let mut session = session();
    session.locations.push(ItemLocation {
        player: 2,
        name: "Empty".to_string(),
        address: Some(7),
        item: None,
    });
    let sprites = sprites()?;
    let world = SmmrWorld::new(1, "Samus", options());
    let ctx = GenerationContext {
        session: &session,
        symbols: &symbols,
        sprites: &sprites,
        randomization: serde_json::Value::Null,
    };
    let err = world.generate_output(&ctx).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PatchError>(),
        Some(PatchError::UnplacedLocation { player: 2, .. })
    ));
    assert_eq!(world.rom_name(), None);
    Ok(())
}

#[test]
fn slot_data_lists_nothing_locations() -> Result<()> {
    let mut session = session();
    let world = SmmrWorld::new(1, "Samus", options());
    assert_eq!(
        world.slot_data(&session)?,
        serde_json::json!({"locations_nothing": [2]})
    );
    session.is_race = true;
    assert_eq!(world.slot_data(&session)?, serde_json::json!({}));
    Ok(())
}

#[test]
fn multidata_waits_for_rom_name() -> Result<()> {
    let symbols = SymbolTable::parse(SYMBOLS_JSON)?;
    let session = session();
    let sprites = sprites()?;
    let world = Arc::new(SmmrWorld::new(1, "Samus", options()));

    let waiter = {
        let world = world.clone();
        thread::spawn(move || {
            let mut multidata = Multidata::default();
            multidata
                .connect_names
                .insert("Samus".to_string(), serde_json::json!([0, 1]));
            world.modify_multidata(&mut multidata);
            multidata
        })
    };
    let ctx = GenerationContext {
        session: &session,
        symbols: &symbols,
        sprites: &sprites,
        randomization: serde_json::Value::Null,
    };
    let artifact = world.generate_output(&ctx)?;
    let multidata = waiter.join().unwrap();

    let rom_name_key =
        base64::engine::general_purpose::STANDARD.encode(&artifact.manifest.rom_name);
    assert_eq!(multidata.connect_names.len(), 2);
    assert_eq!(
        multidata.connect_names.get(&rom_name_key),
        Some(&serde_json::json!([0, 1]))
    );
    Ok(())
}

#[test]
fn failed_generation_releases_waiters() -> Result<()> {
    let mut symbols = SymbolTable::default();
    for (name, sym) in SymbolTable::parse(SYMBOLS_JSON)?.iter() {
        if name != "config_deathlink" {
            symbols.insert(sym.clone());
        }
    }
    let session = session();
    let sprites = sprites()?;
    let world = Arc::new(SmmrWorld::new(1, "Samus", options()));

    let waiter = {
        let world = world.clone();
        thread::spawn(move || {
            let mut multidata = Multidata::default();
            world.modify_multidata(&mut multidata);
            multidata
        })
    };
    let ctx = GenerationContext {
        session: &session,
        symbols: &symbols,
        sprites: &sprites,
        randomization: serde_json::Value::Null,
    };
    let err = world.generate_output(&ctx).unwrap_err();
    assert!(err.to_string().contains("config_deathlink"));
    assert!(waiter.join().unwrap().connect_names.is_empty());
    assert_eq!(world.rom_name(), None);
    Ok(())
}
