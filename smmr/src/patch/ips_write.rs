use std::ops::Range;

use anyhow::{ensure, Result};

use super::ips::IpsPatch;

/// Ranges of `new_rom` to copy over `old_rom`. A differing run that reaches the end of
/// `old_rom` is joined with the bytes appended past it.
fn diff_ranges(old_rom: &[u8], new_rom: &[u8]) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = Vec::new();
    let mut pos = 0;
    while pos < old_rom.len() {
        if old_rom[pos] == new_rom[pos] {
            pos += 1;
            continue;
        }
        let start = pos;
        while pos < old_rom.len() && old_rom[pos] != new_rom[pos] {
            pos += 1;
        }
        ranges.push(start..pos);
    }
    if new_rom.len() > old_rom.len() {
        match ranges.last_mut() {
            Some(last) if last.end == old_rom.len() => last.end = new_rom.len(),
            _ => ranges.push(old_rom.len()..new_rom.len()),
        }
    }
    ranges
}

/// Patch holding every byte range where `new_rom` differs from `old_rom`, plus any bytes
/// past the end of `old_rom`. This is how baseline diffs are produced.
pub fn create_ips_patch(old_rom: &[u8], new_rom: &[u8]) -> Result<IpsPatch> {
    ensure!(
        new_rom.len() >= old_rom.len(),
        "new ROM ({:#x} bytes) is smaller than old ROM ({:#x} bytes)",
        new_rom.len(),
        old_rom.len()
    );
    Ok(diff_ranges(old_rom, new_rom)
        .into_iter()
        .map(|range| (range.start, new_rom[range].to_vec()))
        .collect())
}
