//! Inspect command implementation.
//!
//! Builds a registry from a layout map document and prints what it holds:
//! every region in address order, one tag's members, or the undocumented
//! gaps between documented spans.

use anyhow::Result;
use romsplice_core::{OrderBy, Registry, parse_ram_map, parse_rom_map};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use super::hex_utils::parse_hex_address;

/// Description keywords used to classify ROM map rows.
const TAG_KEYWORDS: &[&str] = &[
    "unused",
    "compressed",
    "pointers",
    "data",
    "names",
    "descriptions",
    "messages",
    "program",
    "code",
    "script",
    "font",
];

/// Run the inspect command
pub fn run(
    map_path: &Path,
    ram: bool,
    offset: &str,
    tag: Option<&str>,
    order: &str,
    gaps: bool,
) -> Result<()> {
    let text = fs::read_to_string(map_path)?;
    let offset = parse_hex_address(offset)?;
    let order = OrderBy::from_str(order)
        .map_err(|_| anyhow::anyhow!("unknown order '{}', expected unsorted/address/name", order))?;

    let registry = if ram {
        parse_ram_map(&text)?
    } else {
        parse_rom_map(&text, offset, TAG_KEYWORDS)?
    };

    if let Some(tag) = tag {
        let listing = registry.format_tag(tag, order);
        if listing.is_empty() {
            println!("No regions tagged '{}'", tag);
        } else {
            println!("{}", listing);
        }
        return Ok(());
    }

    if gaps {
        println!("Undocumented gaps:");
        print_regions(&registry.undocumented_gaps());
        return Ok(());
    }

    println!("{} regions from {}:", registry.len(), map_path.display());
    print_regions(&registry);
    Ok(())
}

fn print_regions(registry: &Registry) {
    for region in registry.regions_by_addr() {
        println!(
            "[{:8x}+{:6x}] {}: {}",
            region.addr, region.length, region.name, region.descr
        );
    }
}
