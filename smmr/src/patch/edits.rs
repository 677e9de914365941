use anyhow::Result;
use smmr_game::symbols::{Symbol, SymbolSpace};

use super::ips::IpsPatch;
use crate::error::PatchError;

/// Bytes to write at `offset` bytes past a symbol.
#[derive(Clone, Debug)]
pub struct ByteEdit {
    pub symbol: Symbol,
    pub offset: usize,
    pub values: Vec<u8>,
}

/// Edits for one component of the patch. Order matters: where edits overlap, the one pushed
/// later wins.
#[derive(Clone, Debug, Default)]
pub struct ByteEditSet {
    pub edits: Vec<ByteEdit>,
}

impl ByteEditSet {
    pub fn new() -> Self {
        ByteEditSet::default()
    }

    pub fn push(&mut self, symbol: &Symbol, offset: usize, values: impl Into<Vec<u8>>) {
        self.edits.push(ByteEdit {
            symbol: symbol.clone(),
            offset,
            values: values.into(),
        });
    }

    pub fn push_u16(&mut self, symbol: &Symbol, offset: usize, value: u16) {
        self.push(symbol, offset, value.to_le_bytes());
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Convert symbolic edits into a patch keyed by ROM file offset.
    pub fn resolve(&self) -> Result<IpsPatch> {
        let mut patch = IpsPatch::new();
        for edit in &self.edits {
            let base = edit.symbol.offset_within_rom_file().ok_or_else(|| {
                let space = match edit.symbol.space {
                    SymbolSpace::Sram(_) => "save RAM",
                    SymbolSpace::Wram(_) => "work RAM",
                    SymbolSpace::Rom(_) | SymbolSpace::Unmapped => "unmapped",
                };
                PatchError::UnresolvedSymbol {
                    name: edit.symbol.name.clone(),
                    space: space.to_string(),
                }
            })?;
            patch.insert(base + edit.offset, &edit.values);
        }
        Ok(patch)
    }
}
