//! Hexdump command implementation.
//!
//! Displays raw image bytes in traditional hexdump format, useful for
//! eyeballing region contents and verifying patch results.
//!
//! # Output Format
//!
//! ```text
//! 0x1000: 48 65 6C 6C 6F 20 57 6F  72 6C 64 00 00 00 00 00  |Hello World.....|
//! ```

use anyhow::Result;
use romsplice_core::Region;
use std::fs;
use std::path::Path;

use super::hex_utils::parse_hex_address;

/// Run the hexdump command
pub fn run(image_path: &Path, address: &str, size: usize, ascii: bool) -> Result<()> {
    let image = fs::read(image_path)?;
    let address = parse_hex_address(address)?;

    let region = Region::new(address, size as u32, "hexdump", "hexdump window");
    let bytes = region.read(&image)?;

    println!("Hexdump of {} at {:#x} ({} bytes):", image_path.display(), address, size);
    println!();

    for (i, chunk) in bytes.chunks(16).enumerate() {
        let offset = address as usize + i * 16;
        print!("0x{:06X}: ", offset);

        // Hex bytes
        for (j, byte) in chunk.iter().enumerate() {
            if j == 8 {
                print!(" ");
            }
            print!("{:02X} ", byte);
        }

        // Padding for incomplete lines
        if chunk.len() < 16 {
            for j in chunk.len()..16 {
                if j == 8 {
                    print!(" ");
                }
                print!("   ");
            }
        }

        // ASCII representation
        if ascii {
            print!(" |");
            for byte in chunk {
                if *byte >= 0x20 && *byte < 0x7F {
                    print!("{}", *byte as char);
                } else {
                    print!(".");
                }
            }
            for _ in chunk.len()..16 {
                print!(" ");
            }
            print!("|");
        }

        println!();
    }

    Ok(())
}
