//! Apply command implementation.

use anyhow::Result;
use romsplice_core::IpsPatch;
use std::fs;
use std::path::Path;
use tracing::info;

/// Run the apply command
pub fn run(image_path: &Path, patch_path: &Path, output_path: &Path) -> Result<()> {
    let image = fs::read(image_path)?;
    let patch = IpsPatch::load(patch_path)?;

    info!(
        "loaded patch: {} hunks, truncation: {:?}",
        patch.len(),
        patch.truncate_to()
    );

    let output = patch.apply(&image)?;
    fs::write(output_path, &output)?;

    println!(
        "Applied {} hunks: {} bytes in, {} bytes out -> {}",
        patch.len(),
        image.len(),
        output.len(),
        output_path.display()
    );
    Ok(())
}
