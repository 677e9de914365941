// The changes suggested by this lint usually make the code more cluttered and less clear:
#![allow(clippy::needless_range_loop)]

pub mod artifact;
pub mod base_rom;
pub mod error;
pub mod gate;
pub mod generate;
pub mod multiworld;
pub mod orchestrator;
pub mod patch;
pub mod placement;
pub mod players;
pub mod start_items;
