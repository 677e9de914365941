use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use smmr::artifact::{PatchArtifact, PATCH_FILE_ENDING};
use smmr::base_rom::base_rom_bytes;
use smmr::generate::{GenerationContext, OffworldSprites, SmmrWorld};
use smmr::multiworld::{MultiworldSession, OptionSettings};
use smmr::orchestrator::PatchOrchestrator;
use smmr::patch::ips::IpsPatch;
use smmr::patch::ips_write::create_ips_patch;
use smmr::patch::Rom;
use smmr_game::symbols::SymbolTable;

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the patch file for one player of a filled multiworld.
    Generate {
        #[arg(long)]
        session: PathBuf,

        #[arg(long)]
        player: usize,

        #[arg(long)]
        options: Option<PathBuf>,

        #[arg(long, default_value = "data/SMBasepatch_prebuilt/sm-basepatch-symbols.json")]
        symbols: PathBuf,

        #[arg(long, default_value = "data/custom_sprite")]
        sprites: PathBuf,

        /// Map Rando randomization JSON for this player.
        #[arg(long)]
        randomization: Option<PathBuf>,

        #[arg(long)]
        output_dir: PathBuf,
    },
    /// Build a playable ROM from a patch file.
    Patch {
        #[arg(long)]
        input_rom: PathBuf,

        #[arg(long)]
        base_patch: PathBuf,

        /// Per-seed patches applied after the base patch, in order.
        #[arg(long)]
        aux_patch: Vec<PathBuf>,

        #[arg(long)]
        artifact: PathBuf,

        #[arg(long)]
        output_rom: PathBuf,
    },
    /// Write an IPS patch turning one ROM into another.
    Diff {
        #[arg(long)]
        old_rom: PathBuf,

        #[arg(long)]
        new_rom: PathBuf,

        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    match args.command {
        Command::Generate {
            session,
            player,
            options,
            symbols,
            sprites,
            randomization,
            output_dir,
        } => {
            let session = MultiworldSession::load(&session)?;
            let options = match options {
                Some(path) => OptionSettings::load(&path)?,
                None => OptionSettings::default(),
            };
            let symbols = SymbolTable::load(&symbols)?;
            let sprites = OffworldSprites::load(&sprites)?;
            let randomization = match randomization {
                Some(path) => {
                    let data = std::fs::read_to_string(&path).with_context(|| {
                        format!("Unable to read randomization {}", path.display())
                    })?;
                    serde_json::from_str(&data)?
                }
                None => serde_json::Value::Null,
            };
            let player_name = session
                .player_name(player)
                .with_context(|| format!("Player {player} is not in the session"))?
                .to_string();

            let world = SmmrWorld::new(player, &player_name, options);
            let ctx = GenerationContext {
                session: &session,
                symbols: &symbols,
                sprites: &sprites,
                randomization,
            };
            let artifact = world.generate_output(&ctx)?;
            let output_path = output_dir.join(format!(
                "SMMR_{}_P{}_{}{}",
                session.seed, player, player_name, PATCH_FILE_ENDING
            ));
            artifact.save(&output_path)?;
            info!(
                "Slot data: {}",
                serde_json::to_string(&world.slot_data(&session)?)?
            );
        }
        Command::Patch {
            input_rom,
            base_patch,
            aux_patch,
            artifact,
            output_rom,
        } => {
            let base = base_rom_bytes(&input_rom)?;
            let base_patch = IpsPatch::load(&base_patch)?;
            let aux_patches = aux_patch
                .iter()
                .map(|path| IpsPatch::load(path))
                .collect::<Result<Vec<IpsPatch>>>()?;
            let artifact = PatchArtifact::load(&artifact)?;
            let data = PatchOrchestrator::run_artifact(base, &base_patch, &aux_patches, &artifact)?;
            Rom::new(data).save(&output_rom)?;
            info!("Wrote output ROM to {}", output_rom.display());
        }
        Command::Diff {
            old_rom,
            new_rom,
            output,
        } => {
            let old_rom = Rom::load(&old_rom)?;
            let new_rom = Rom::load(&new_rom)?;
            let patch = create_ips_patch(&old_rom.data, &new_rom.data)?;
            std::fs::write(&output, patch.encode()?)
                .with_context(|| format!("Unable to write {}", output.display()))?;
            info!("Wrote {} records to {}", patch.len(), output.display());
        }
    }
    Ok(())
}
