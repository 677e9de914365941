//! SNES internal header checksum.
//!
//! The checksum is the 16-bit sum of all ROM bytes, where a ROM whose size is not a power of
//! two is treated as mirrored up to the next power of two (the trailing part is repeated).

use anyhow::Result;

use super::Rom;
use crate::error::PatchError;

// Complement (2 bytes) followed by checksum (2 bytes), in the LoROM header.
pub const CHECKSUM_ADDR: usize = 0x7FDC;

fn mirror_sum(data: &[u8], mut mask: u64) -> u64 {
    let length = data.len() as u64;
    while length & mask == 0 && mask != 0 {
        mask >>= 1;
    }

    let part1 = data[..mask as usize]
        .iter()
        .map(|&x| x as u64)
        .sum::<u64>()
        & 0xFFFF;
    let mut part2 = 0;

    let mut next_length = length - mask;
    if next_length != 0 {
        part2 = mirror_sum(&data[mask as usize..], mask >> 1);
        while next_length < mask {
            next_length += next_length;
            part2 += part2;
        }
    }
    (part1 + part2) & 0xFFFF
}

pub fn compute_checksum(data: &[u8]) -> u16 {
    mirror_sum(data, 1 << 63) as u16
}

/// Compute the checksum over the whole image and store it with its complement in the header.
pub fn write_checksum(rom: &mut Rom) -> Result<u16> {
    let needed = CHECKSUM_ADDR + 4;
    if rom.data.len() < needed {
        return Err(PatchError::ImageTooSmall {
            len: rom.data.len(),
            needed,
        }
        .into());
    }
    let crc = compute_checksum(&rom.data);
    let inv = crc ^ 0xFFFF;
    rom.write_u16(CHECKSUM_ADDR, inv as isize)?;
    rom.write_u16(CHECKSUM_ADDR + 2, crc as isize)?;
    Ok(crc)
}
