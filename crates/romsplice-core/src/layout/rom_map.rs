//! Row-oriented ROM map parser.
//!
//! Each row is `start_hex, end_hex_inclusive, description`. Bounds are
//! hexadecimal; the end bound is inclusive in the input and exclusive after
//! parsing. An address offset may be subtracted from both bounds when the
//! map's addressing differs from the image's (bank-mapped vs. linear).
//!
//! Region names are derived from the description: parenthetical asides are
//! stripped, each word contributes its first letter plus a de-voweled,
//! truncated remainder, and collisions get an integer suffix. Rows whose
//! description contains any of the caller's classification keywords are
//! tagged with those keywords.

use tracing::warn;

use crate::error::Result;
use crate::region::Registry;

/// Derive a short memorable name from a free-text description.
///
/// "Character Names" becomes `chrct_nms`, "Pointers to Battle Messages"
/// becomes `pntrs_t_bttl_mssgs`.
pub fn derive_name(descr: &str) -> String {
    // strip parenthetical asides
    let mut stripped = String::with_capacity(descr.len());
    let mut depth = 0u32;
    for c in descr.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => stripped.push(c),
            _ => {}
        }
    }

    let mut parts = Vec::new();
    for word in stripped.split(|c: char| !c.is_ascii_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        let word = word.to_ascii_lowercase();
        let mut chars = word.chars();
        let mut short = String::new();
        if let Some(first) = chars.next() {
            short.push(first);
        }
        for c in chars {
            if short.len() >= 5 {
                break;
            }
            if !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u') {
                short.push(c);
            }
        }
        parts.push(short);
    }
    parts.join("_")
}

fn parse_hex(field: &str) -> Option<u32> {
    let cleaned = field
        .trim()
        .trim_start_matches('$')
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    u32::from_str_radix(cleaned, 16).ok()
}

/// Parse a ROM map document into a [`Registry`].
///
/// `address_offset` is subtracted from both bounds of every row;
/// `tag_keywords` classifies rows by description content.
pub fn parse_rom_map(text: &str, address_offset: u32, tag_keywords: &[&str]) -> Result<Registry> {
    let mut registry = Registry::new();

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.splitn(3, ',');
        let (Some(start), Some(end)) = (fields.next(), fields.next()) else {
            warn!("line {}: not a map row, skipping", lineno + 1);
            continue;
        };
        let descr = fields.next().unwrap_or("").trim();

        let (Some(start), Some(end_inclusive)) = (parse_hex(start), parse_hex(end)) else {
            warn!("line {}: unparsable bounds, skipping", lineno + 1);
            continue;
        };
        let end = end_inclusive + 1;
        if start < address_offset || end <= start {
            warn!("line {}: bad range {:#x}..{:#x}, skipping", lineno + 1, start, end);
            continue;
        }
        let addr = start - address_offset;
        let length = end - start;

        let base_name = {
            let derived = derive_name(descr);
            if derived.is_empty() {
                format!("section_{:x}_{:x}", addr, addr + length)
            } else {
                derived
            }
        };
        let mut name = base_name.clone();
        let mut suffix = 2u32;
        while registry.contains_name(&name) {
            name = format!("{}_{}", base_name, suffix);
            suffix += 1;
        }

        let descr_lower = descr.to_ascii_lowercase();
        let tags: Vec<&str> = tag_keywords
            .iter()
            .copied()
            .filter(|kw| descr_lower.contains(&kw.to_ascii_lowercase()))
            .collect();

        registry.register_tagged(addr, length, &name, descr, &tags);
    }

    Ok(registry)
}
