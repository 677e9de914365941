//! Symbols exported by the multiworld base patch, classified by the SNES LoROM memory map.
//!
//! The symbol file is a JSON object mapping each label to a `"BANK:ADDR"` pair of hex
//! strings, e.g. `{"rando_item_table": "B8:E000"}`.

use anyhow::{Context, Result};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::util::sorted_hashmap_iter;

#[derive(Debug, Error)]
pub enum SymbolError {
    #[error("unable to parse address {value:?} of symbol {name:?}: {reason}")]
    Parse {
        name: String,
        value: String,
        reason: String,
    },
    #[error("unknown symbol {0:?}")]
    UnknownSymbol(String),
}

/// Physical memory space an address belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolSpace {
    /// Byte offset within the ROM file.
    Rom(usize),
    /// Byte offset within save RAM, taken as one contiguous region.
    Sram(usize),
    /// Byte offset within work RAM (bank 7F continues at 0x10000).
    Wram(usize),
    Unmapped,
}

impl SymbolSpace {
    pub fn classify(bank: u8, addr_within_bank: u16) -> Self {
        let addr = addr_within_bank as usize;
        match bank {
            // SRAM is not continuous ($70-$7D, $0000-$7FFF in each bank), but callers want
            // it in continuous terms.
            0x70..=0x7D => SymbolSpace::Sram((bank as usize - 0x70) * 0x8000 + addr),
            0x7E => SymbolSpace::Wram(addr),
            0x7F => SymbolSpace::Wram(0x10000 + addr),
            0x00 if addr <= 0x1FFF => SymbolSpace::Wram(addr),
            0x80..=0xFF => SymbolSpace::Rom((bank as usize - 0x80) * 0x8000 + addr % 0x8000),
            _ => SymbolSpace::Unmapped,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub bank: u8,
    pub addr_within_bank: u16,
    pub space: SymbolSpace,
}

impl Symbol {
    pub fn new(name: &str, bank: u8, addr_within_bank: u16) -> Self {
        Symbol {
            name: name.to_string(),
            bank,
            addr_within_bank,
            space: SymbolSpace::classify(bank, addr_within_bank),
        }
    }

    pub fn parse(name: &str, value: &str) -> Result<Self, SymbolError> {
        let parse_err = |reason: &str| SymbolError::Parse {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };
        let (bank_str, addr_str) = value
            .split_once(':')
            .ok_or_else(|| parse_err("expected BANK:ADDR"))?;
        let bank = u8::from_str_radix(bank_str.trim(), 16)
            .map_err(|e| parse_err(&format!("invalid bank: {e}")))?;
        let addr = u16::from_str_radix(addr_str.trim(), 16)
            .map_err(|e| parse_err(&format!("invalid address: {e}")))?;
        Ok(Symbol::new(name, bank, addr))
    }

    pub fn snes_addr(&self) -> usize {
        (self.bank as usize) << 16 | self.addr_within_bank as usize
    }

    pub fn offset_within_rom_file(&self) -> Option<usize> {
        match self.space {
            SymbolSpace::Rom(offset) => Some(offset),
            _ => None,
        }
    }

    pub fn offset_within_continuous_sram(&self) -> Option<usize> {
        match self.space {
            SymbolSpace::Sram(offset) => Some(offset),
            _ => None,
        }
    }

    pub fn offset_within_wram(&self) -> Option<usize> {
        match self.space {
            SymbolSpace::Wram(offset) => Some(offset),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn parse(json_str: &str) -> Result<Self> {
        let raw: HashMap<String, String> =
            serde_json::from_str(json_str).context("Unable to parse symbol map JSON")?;
        Self::from_map(&raw)
    }

    pub fn from_map(raw: &HashMap<String, String>) -> Result<Self> {
        let mut symbols: HashMap<String, Symbol> = HashMap::new();
        for (name, value) in sorted_hashmap_iter(raw) {
            symbols.insert(name.clone(), Symbol::parse(name, value)?);
        }
        Ok(SymbolTable { symbols })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json_str = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read symbol map at {}", path.display()))?;
        Self::parse(&json_str)
            .with_context(|| format!("Unable to load symbol map at {}", path.display()))
    }

    pub fn get(&self, name: &str) -> Result<&Symbol, SymbolError> {
        self.symbols
            .get(name)
            .ok_or_else(|| SymbolError::UnknownSymbol(name.to_string()))
    }

    /// ROM file offset of a named symbol, `None` when it lives outside ROM.
    pub fn rom_offset(&self, name: &str) -> Result<Option<usize>, SymbolError> {
        Ok(self.get(name)?.offset_within_rom_file())
    }

    pub fn insert(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Symbol)> {
        sorted_hashmap_iter(&self.symbols)
    }
}
