//! The vanilla ROM every patch applies to, loaded and verified once per process.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use once_cell::sync::OnceCell;

use crate::error::PatchError;

/// Super Metroid (Japan, USA).
pub const SM_BASE_ROM_MD5: &str = "21f3e98df4780ee1c667b84e57d88675";
const COPIER_HEADER_SIZE: usize = 0x200;

/// Drop the 512-byte copier header some dumps carry in front of the ROM data.
pub fn read_snes_rom(mut data: Vec<u8>) -> Vec<u8> {
    if data.len() % 0x400 == COPIER_HEADER_SIZE {
        data.drain(..COPIER_HEADER_SIZE);
    }
    data
}

pub fn rom_md5(data: &[u8]) -> String {
    crypto_hash::hex_digest(crypto_hash::Algorithm::MD5, data)
}

pub fn verify_base_rom(data: &[u8], expected_md5: &str) -> Result<()> {
    let actual = rom_md5(data);
    if actual != expected_md5 {
        return Err(PatchError::BaseImageMismatch {
            expected: expected_md5.to_string(),
            actual,
        }
        .into());
    }
    Ok(())
}

/// A base ROM that is read and checked on first use, then shared read-only.
/// Failed loads are not cached, so a later call can retry with a correct file.
pub struct BaseRomCache {
    expected_md5: &'static str,
    data: OnceCell<Vec<u8>>,
}

impl BaseRomCache {
    pub const fn new(expected_md5: &'static str) -> Self {
        BaseRomCache {
            expected_md5,
            data: OnceCell::new(),
        }
    }

    pub fn expected_md5(&self) -> &'static str {
        self.expected_md5
    }

    pub fn get(&self) -> Option<&[u8]> {
        self.data.get().map(|x| x.as_slice())
    }

    pub fn get_or_init_with(&self, load: impl FnOnce() -> Result<Vec<u8>>) -> Result<&[u8]> {
        let data = self.data.get_or_try_init(|| -> Result<Vec<u8>> {
            let data = read_snes_rom(load()?);
            verify_base_rom(&data, self.expected_md5)?;
            Ok(data)
        })?;
        Ok(data)
    }

    pub fn get_or_load(&self, path: &Path) -> Result<&[u8]> {
        self.get_or_init_with(|| {
            info!("Loading base ROM from {}", path.display());
            std::fs::read(path)
                .with_context(|| format!("Unable to read base ROM at {}", path.display()))
        })
    }
}

pub static SM_BASE_ROM: BaseRomCache = BaseRomCache::new(SM_BASE_ROM_MD5);

pub fn base_rom_bytes(path: &Path) -> Result<&'static [u8]> {
    SM_BASE_ROM.get_or_load(path)
}
