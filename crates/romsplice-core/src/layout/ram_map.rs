//! Line-oriented RAM/SRAM map parser.
//!
//! Each non-blank line either defines a region or documents the previous
//! one. Definition lines start with an address marker:
//!
//! - `$XXXX description` — a single byte at that address;
//! - `+$XXXX description` — a multi-byte value, one extra byte per leading
//!   `+`;
//! - `$XXXX-$YYYY description` — an address range.
//!
//! Any other line is appended to the most recently defined region's
//! description. A blank line or a separator line (only `-`, `=`, `_` or
//! `*`) resets that context so trailing documentation after a break is not
//! misattributed.

use crate::error::Result;
use crate::layout::rom_map::derive_name;
use crate::region::Registry;

fn parse_hex(field: &str) -> Option<u32> {
    u32::from_str_radix(field.trim().trim_start_matches('$'), 16).ok()
}

fn is_separator(line: &str) -> bool {
    line.chars().all(|c| matches!(c, '-' | '=' | '_' | '*'))
}

/// Parse a marker token into `(addr, length)`, or `None` if the token is
/// not an address marker.
fn parse_marker(token: &str) -> Option<(u32, u32)> {
    let plus_run = token.chars().take_while(|&c| c == '+').count();
    let token = &token[plus_run..];
    if !token.starts_with('$') {
        return None;
    }

    if let Some((beg, end)) = token.split_once('-') {
        let beg = parse_hex(beg)?;
        let end = parse_hex(end)?;
        if end <= beg {
            return None;
        }
        Some((beg, end - beg))
    } else {
        let addr = parse_hex(token)?;
        Some((addr, 1 + plus_run as u32))
    }
}

/// Parse a RAM map document into a [`Registry`].
pub fn parse_ram_map(text: &str) -> Result<Registry> {
    let mut registry = Registry::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || is_separator(line) {
            current = None;
            continue;
        }

        let (token, rest) = match line.split_once(char::is_whitespace) {
            Some((token, rest)) => (token, rest.trim()),
            None => (line, ""),
        };

        let Some((addr, length)) = parse_marker(token) else {
            // documentation line for the current region, if any
            if let Some(name) = &current {
                registry.annotate(name, line)?;
            }
            continue;
        };

        let base_name = {
            let derived = derive_name(rest);
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

        registry.register(addr, length, &name, line);
        current = Some(name);
    }

    Ok(registry)
}
