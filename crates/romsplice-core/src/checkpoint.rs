use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::Result;
use crate::queue::{ConflictPair, ConflictResolver, Resolution};
use crate::write::Write;

/// Writes image snapshots to a directory, named by content digest.
pub struct Checkpointer {
    dir: PathBuf,
}

impl Checkpointer {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Save `image` as `<dir>/<sha256>.bin`, returning the path. Saving the
    /// same bytes twice overwrites the same file.
    pub fn save(&self, image: &[u8]) -> Result<PathBuf> {
        let digest = Sha256::digest(image);
        let hash: String = digest.iter().map(|b| format!("{:02x}", b)).collect();

        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.bin", hash));
        fs::write(&path, image)?;
        info!("checkpointed {} bytes to {}", image.len(), path.display());
        Ok(path)
    }
}

/// Conflict policy that snapshots the image buffer before a conflicting
/// write lands, then applies it anyway.
pub struct CheckpointOnConflict {
    checkpointer: Checkpointer,
}

impl CheckpointOnConflict {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            checkpointer: Checkpointer::new(dir),
        }
    }
}

impl ConflictResolver for CheckpointOnConflict {
    fn resolve(&mut self, write: &Write, pair: &ConflictPair, image: &[u8]) -> Result<Resolution> {
        warn!(
            "{} conflicts with an earlier write at {:#x}..{:#x}, checkpointing before applying",
            write.label(),
            pair.left_range.0,
            pair.left_range.1
        );
        self.checkpointer.save(image)?;
        Ok(Resolution::Apply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::WriteQueue;
    use crate::region::Region;

    #[test]
    fn test_save_names_file_by_digest() {
        let dir = tempfile::tempdir().unwrap();
        let checkpointer = Checkpointer::new(dir.path());

        let path = checkpointer.save(&[1, 2, 3, 4]).unwrap();
        assert!(path.exists());
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3, 4]);

        // same content, same file
        let again = checkpointer.save(&[1, 2, 3, 4]).unwrap();
        assert_eq!(path, again);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_checkpoint_on_conflict_snapshots_and_applies() {
        let dir = tempfile::tempdir().unwrap();
        let mut resolver = CheckpointOnConflict::new(dir.path());

        let mut queue = WriteQueue::new();
        let a = Region::new(0x0, 8, "a", "");
        let b = Region::new(0x4, 8, "b", "");
        queue.enqueue(a.make_write(vec![0x11; 8]).unwrap());
        queue.enqueue(b.make_write(vec![0x22; 8]).unwrap());

        let out = queue.flush_with(&vec![0u8; 16], &mut resolver).unwrap();
        // later write applied over the overlap
        assert_eq!(&out[0x4..0xC], &[0x22; 8]);
        // one snapshot, taken before the conflicting write landed
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
