//! The `.apsmmr` patch file handed to players: a zip of a manifest, the opaque Map Rando
//! randomization data, and one IPS patch per multiworld component.

use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use smmr_game::{PlayerId, GAME_NAME};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::patch::ips::IpsPatch;

pub const PATCH_FILE_ENDING: &str = ".apsmmr";
pub const ARTIFACT_VERSION: u32 = 1;
const MANIFEST_FILE: &str = "manifest.json";
const RANDO_DATA_FILE: &str = "rando_data.json";

/// Multiworld components, in the order they are applied.
pub const COMPONENT_ORDER: [&str; 11] = [
    "locations",
    "items",
    "sprites",
    "death_link",
    "remote_items",
    "own_player_id",
    "player_names",
    "player_ids",
    "locations_nothing",
    "start_inventory",
    "rom_name",
];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ArtifactManifest {
    pub version: u32,
    pub game: String,
    pub player: PlayerId,
    pub player_name: String,
    pub base_md5: String,
    pub rom_name: Vec<u8>,
    /// Component patches, in application order.
    pub procedure: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PatchArtifact {
    pub manifest: ArtifactManifest,
    pub rando_data: serde_json::Value,
    pub components: Vec<(String, IpsPatch)>,
}

fn ips_file_name(component: &str) -> String {
    format!("{component}.ips")
}

fn read_file<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut file = archive
        .by_name(name)
        .with_context(|| format!("Patch archive is missing {name}"))?;
    let mut out = Vec::new();
    file.read_to_end(&mut out)?;
    Ok(out)
}

impl PatchArtifact {
    pub fn new(
        player: PlayerId,
        player_name: &str,
        base_md5: &str,
        rom_name: &[u8],
        rando_data: serde_json::Value,
        components: Vec<(String, IpsPatch)>,
    ) -> Self {
        PatchArtifact {
            manifest: ArtifactManifest {
                version: ARTIFACT_VERSION,
                game: GAME_NAME.to_string(),
                player,
                player_name: player_name.to_string(),
                base_md5: base_md5.to_string(),
                rom_name: rom_name.to_vec(),
                procedure: components.iter().map(|(name, _)| name.clone()).collect(),
            },
            rando_data,
            components,
        }
    }

    pub fn component(&self, name: &str) -> Option<&IpsPatch> {
        self.components
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, patch)| patch)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file(MANIFEST_FILE, options)?;
        zip.write_all(&serde_json::to_vec_pretty(&self.manifest)?)?;
        zip.start_file(RANDO_DATA_FILE, options)?;
        zip.write_all(&serde_json::to_vec(&self.rando_data)?)?;
        for (name, patch) in &self.components {
            let ips = patch
                .encode()
                .with_context(|| format!("Unable to encode component {name}"))?;
            zip.start_file(ips_file_name(name), options)?;
            zip.write_all(&ips)?;
        }
        Ok(zip.finish()?.into_inner())
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data)).context("Unable to open patch archive")?;

        let manifest: ArtifactManifest = serde_json::from_slice(&read_file(&mut archive, MANIFEST_FILE)?)
            .context("Unable to parse patch manifest")?;
        if manifest.game != GAME_NAME {
            bail!("Patch is for {:?}, not {:?}", manifest.game, GAME_NAME);
        }
        ensure!(
            manifest.version <= ARTIFACT_VERSION,
            "Patch version {} is newer than supported version {}",
            manifest.version,
            ARTIFACT_VERSION
        );
        let rando_data = serde_json::from_slice(&read_file(&mut archive, RANDO_DATA_FILE)?)
            .context("Unable to parse randomization data")?;
        let mut components = Vec::with_capacity(manifest.procedure.len());
        for name in &manifest.procedure {
            let patch = IpsPatch::decode(&read_file(&mut archive, &ips_file_name(name))?)
                .with_context(|| format!("Unable to decode component {name}"))?;
            components.push((name.clone(), patch));
        }
        Ok(PatchArtifact {
            manifest,
            rando_data,
            components,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)
            .with_context(|| format!("Unable to write patch file {}", path.display()))?;
        info!("Wrote patch file {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Unable to read patch file {}", path.display()))?;
        Self::from_bytes(&data).with_context(|| format!("Unable to load patch file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PatchArtifact {
        let components = vec![
            (
                "locations".to_string(),
                vec![(0x10, vec![1, 2, 3])].into_iter().collect(),
            ),
            ("rom_name".to_string(), vec![(0x7FC0, b"SMMR".to_vec())].into_iter().collect()),
            ("death_link".to_string(), IpsPatch::new()),
        ];
        PatchArtifact::new(
            1,
            "Samus",
            "abc",
            b"SMMR",
            serde_json::json!({"map_rando_settings": {"preset": "Default"}}),
            components,
        )
    }

    #[test]
    fn zip_round_trip() -> Result<()> {
        let artifact = sample();
        assert_eq!(
            artifact.manifest.procedure,
            vec!["locations", "rom_name", "death_link"]
        );
        let decoded = PatchArtifact::from_bytes(&artifact.to_bytes()?)?;
        assert_eq!(decoded, artifact);
        assert_eq!(
            decoded.component("locations").and_then(|p| p.get(0x10)),
            Some(&[1, 2, 3][..])
        );
        assert!(decoded.component("sprites").is_none());
        Ok(())
    }

    #[test]
    fn rejects_other_games() -> Result<()> {
        let mut artifact = sample();
        artifact.manifest.game = "A Link to the Past".to_string();
        let err = PatchArtifact::from_bytes(&artifact.to_bytes()?).unwrap_err();
        assert!(err.to_string().contains("not"));
        assert!(PatchArtifact::from_bytes(b"not a zip").is_err());
        Ok(())
    }

    #[test]
    fn file_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(format!("seed{PATCH_FILE_ENDING}"));
        let artifact = sample();
        artifact.save(&path)?;
        assert_eq!(PatchArtifact::load(&path)?, artifact);
        Ok(())
    }
}
