pub mod checksum;
pub mod edits;
pub mod ips;
pub mod ips_write;

use std::path::Path;

use anyhow::{ensure, Context, Result};

type PcAddr = usize; // PC pointer to ROM data

// The multiworld base patch expands the ROM to 4 MiB.
pub const EXPANDED_ROM_SIZE: usize = 0x400000;

// Offset of the 21-byte title field in the LoROM SNES header.
pub const ROM_NAME_ADDR: PcAddr = 0x7FC0;
pub const ROM_NAME_LEN: usize = 21;

pub fn snes2pc(addr: usize) -> PcAddr {
    addr >> 1 & 0x3F8000 | addr & 0x7FFF
}

#[derive(Clone)]
pub struct Rom {
    pub data: Vec<u8>,
}

impl Rom {
    pub fn new(data: Vec<u8>) -> Self {
        Rom { data }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Unable to load ROM at path {}", path.display()))?;
        Ok(Rom::new(data))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.data)
            .with_context(|| format!("Unable to save ROM at path {}", path.display()))?;
        Ok(())
    }

    pub fn write_u8(&mut self, addr: PcAddr, x: isize) -> Result<()> {
        ensure!(addr < self.data.len(), "write_u8 address out of bounds");
        ensure!((0..=0xFF).contains(&x), "write_u8 data does not fit");
        self.data[addr] = x as u8;
        Ok(())
    }

    pub fn write_u16(&mut self, addr: PcAddr, x: isize) -> Result<()> {
        ensure!(
            addr + 2 <= self.data.len(),
            "write_u16 address out of bounds"
        );
        ensure!((0..=0xFFFF).contains(&x), "write_u16 data does not fit");
        self.write_u8(addr, x & 0xFF)?;
        self.write_u8(addr + 1, x >> 8)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_conversion() {
        assert_eq!(snes2pc(0x808000), 0x000000);
        assert_eq!(snes2pc(0xB5FE52), 0x1AFE52);
        assert_eq!(snes2pc(0x80FFDC), 0x007FDC);
        assert_eq!(snes2pc(0xDFFEF0), 0x2FFEF0);
    }

    #[test]
    fn test_rom_bounds() -> Result<()> {
        let mut rom = Rom::new(vec![0; 4]);
        rom.write_u16(1, 0x1234)?;
        assert_eq!(rom.data, vec![0, 0x34, 0x12, 0]);
        assert!(rom.write_u16(3, 0).is_err());
        assert!(rom.write_u8(0, 0x100).is_err());
        Ok(())
    }
}
