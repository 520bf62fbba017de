mod ram_map;
mod rom_map;

pub use ram_map::parse_ram_map;
pub use rom_map::{derive_name, parse_rom_map};
