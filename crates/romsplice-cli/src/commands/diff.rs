//! Diff command implementation.
//!
//! Compares two images region by region against a layout map, reporting how
//! many bytes differ in each documented region (and in the undocumented
//! gaps between them). The difference can also be exported as an IPS patch.

use anyhow::Result;
use romsplice_core::{IpsPatch, Region, Registry, parse_rom_map};
use std::fs;
use std::path::Path;

use super::hex_utils::parse_hex_address;

/// Run the diff command
pub fn run(
    original_path: &Path,
    modified_path: &Path,
    map_path: Option<&Path>,
    offset: &str,
    ips_out: Option<&Path>,
) -> Result<()> {
    let original = fs::read(original_path)?;
    let modified = fs::read(modified_path)?;
    let offset = parse_hex_address(offset)?;

    let common = original.len().min(modified.len()) as u32;
    let registry = match map_path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            parse_rom_map(&text, offset, &[])?
        }
        None => {
            let mut reg = Registry::new();
            reg.register(0, common, "image", "entire common span");
            reg
        }
    };

    let mut total_diff = 0usize;
    let gaps = registry.undocumented_gaps_bounded(common);
    let mut regions: Vec<&Region> = registry
        .regions_by_addr()
        .into_iter()
        .chain(gaps.regions_by_addr())
        .collect();
    regions.sort_by_key(|r| r.addr);

    for region in regions {
        let (Ok(lhs), Ok(rhs)) = (region.read(&original), region.read(&modified)) else {
            println!(
                "[{:8x}+{:6x}] {}: out of bounds, skipped",
                region.addr, region.length, region.name
            );
            continue;
        };
        let diff = lhs.iter().zip(rhs).filter(|(a, b)| a != b).count();
        total_diff += diff;
        if diff == 0 {
            continue;
        }
        println!(
            "[{:8x}+{:6x}] {}: {} / {} bytes differ",
            region.addr,
            region.length,
            region.name,
            diff,
            lhs.len()
        );
    }

    if original.len() != modified.len() {
        println!(
            "image sizes differ: {} vs {} bytes",
            original.len(),
            modified.len()
        );
    }
    let percent = 100.0 * total_diff as f64 / original.len().max(1) as f64;
    println!(
        "Total difference: {} / {} bytes ({:.3}%)",
        total_diff,
        original.len(),
        percent
    );

    if let Some(path) = ips_out {
        let patch = IpsPatch::diff(&original, &modified);
        patch.save(path)?;
        println!("Wrote {} hunks to {}", patch.len(), path.display());
    }

    Ok(())
}
