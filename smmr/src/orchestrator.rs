//! Builds the final ROM from the base ROM and the generated patches.

use anyhow::{ensure, Context, Result};
use log::{debug, info, warn};

use crate::artifact::{PatchArtifact, COMPONENT_ORDER};
use crate::base_rom::{read_snes_rom, verify_base_rom, SM_BASE_ROM_MD5};
use crate::patch::checksum::write_checksum;
use crate::patch::ips::IpsPatch;
use crate::patch::Rom;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    LoadBase,
    ApplyBaselineDiffs,
    ApplyMultiworldEdits,
    WriteChecksum,
    Done,
}

/// Stages run strictly in order; calling one out of order is an error.
pub struct PatchOrchestrator {
    rom: Rom,
    stage: Stage,
}

impl Default for PatchOrchestrator {
    fn default() -> Self {
        PatchOrchestrator {
            rom: Rom::new(vec![]),
            stage: Stage::LoadBase,
        }
    }
}

impl PatchOrchestrator {
    pub fn new() -> Self {
        PatchOrchestrator::default()
    }

    /// Verify the base ROM against `expected_md5` and take a private copy of it.
    pub fn load_base(&mut self, base: &[u8], expected_md5: &str) -> Result<()> {
        let data = read_snes_rom(base.to_vec());
        verify_base_rom(&data, expected_md5)?;
        self.advance(Stage::LoadBase, Stage::ApplyBaselineDiffs)?;
        info!("Base ROM verified ({:#x} bytes)", data.len());
        self.rom = Rom::new(data);
        Ok(())
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, expected: Stage, next: Stage) -> Result<()> {
        ensure!(
            self.stage == expected,
            "cannot run {:?} while at stage {:?}",
            expected,
            self.stage
        );
        self.stage = next;
        Ok(())
    }

    /// Apply the base patch and then any per-seed patches, each on the previous output.
    pub fn apply_baseline_diffs(&mut self, diffs: &[&IpsPatch]) -> Result<()> {
        self.advance(Stage::ApplyBaselineDiffs, Stage::ApplyMultiworldEdits)?;
        for (i, diff) in diffs.iter().enumerate() {
            debug!("Applying baseline patch {i} ({} records)", diff.len());
            diff.apply_in_place(&mut self.rom.data);
        }
        Ok(())
    }

    pub fn apply_multiworld_edits(&mut self, components: &[(String, IpsPatch)]) -> Result<()> {
        self.advance(Stage::ApplyMultiworldEdits, Stage::WriteChecksum)?;
        for (name, patch) in components {
            if !COMPONENT_ORDER.contains(&name.as_str()) {
                warn!("Applying unrecognized patch component {name}");
            }
            debug!("Applying {name} ({} records)", patch.len());
            patch.apply_in_place(&mut self.rom.data);
        }
        Ok(())
    }

    pub fn write_checksum(&mut self) -> Result<u16> {
        self.advance(Stage::WriteChecksum, Stage::Done)?;
        let crc = write_checksum(&mut self.rom)?;
        info!("Wrote checksum {crc:#06x}");
        Ok(crc)
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        ensure!(
            self.stage == Stage::Done,
            "ROM is not finished (at stage {:?})",
            self.stage
        );
        Ok(self.rom.data)
    }

    pub fn run(
        base: &[u8],
        expected_md5: &str,
        baseline_diffs: &[&IpsPatch],
        components: &[(String, IpsPatch)],
    ) -> Result<Vec<u8>> {
        let mut orchestrator = Self::new();
        orchestrator.load_base(base, expected_md5)?;
        orchestrator
            .apply_baseline_diffs(baseline_diffs)
            .context("Unable to apply baseline patches")?;
        orchestrator
            .apply_multiworld_edits(components)
            .context("Unable to apply multiworld patches")?;
        orchestrator.write_checksum()?;
        orchestrator.finish()
    }

    /// Replay a patch artifact on the base ROM: the base patch, the auxiliary (per-seed) patches,
    /// then the artifact's components in manifest order.
    pub fn run_artifact(
        base: &[u8],
        base_patch: &IpsPatch,
        auxiliary: &[IpsPatch],
        artifact: &PatchArtifact,
    ) -> Result<Vec<u8>> {
        Self::replay_artifact(base, SM_BASE_ROM_MD5, base_patch, auxiliary, artifact)
    }

    /// Like `run_artifact`, for a base ROM with a different known digest. The artifact must
    /// have been made for that same base ROM.
    pub fn replay_artifact(
        base: &[u8],
        expected_md5: &str,
        base_patch: &IpsPatch,
        auxiliary: &[IpsPatch],
        artifact: &PatchArtifact,
    ) -> Result<Vec<u8>> {
        ensure!(
            artifact.manifest.base_md5 == expected_md5,
            "patch was made for base ROM {}, expected {}",
            artifact.manifest.base_md5,
            expected_md5
        );
        let mut diffs: Vec<&IpsPatch> = vec![base_patch];
        diffs.extend(auxiliary);
        Self::run(base, expected_md5, &diffs, &artifact.components)
    }
}
