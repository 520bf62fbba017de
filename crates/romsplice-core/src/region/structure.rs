use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::write::WriteBytes;

/// A named, addressed, contiguous span of bytes within a binary image.
///
/// `addr` and `length` are fixed for the lifetime of the region; derived
/// regions produced by [`Region::split`], [`Region::subdivide`] and
/// [`Region::union`] are new values. `length` is always greater than zero
/// for regions produced by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub addr: u32,
    pub length: u32,
    pub name: String,
    pub descr: String,
}

impl Region {
    pub fn new(addr: u32, length: u32, name: impl Into<String>, descr: impl Into<String>) -> Self {
        Self {
            addr,
            length,
            name: name.into(),
            descr: descr.into(),
        }
    }

    /// One past the last byte covered by this region.
    pub fn end(&self) -> u32 {
        self.addr + self.length
    }

    /// Half-open `[addr, addr + length)` byte interval.
    pub fn span(&self) -> (u32, u32) {
        (self.addr, self.end())
    }

    pub fn contains(&self, addr: u32) -> bool {
        self.addr <= addr && addr < self.end()
    }

    /// Read this region's bytes out of `image`.
    pub fn read<'a>(&self, image: &'a [u8]) -> Result<&'a [u8]> {
        let start = self.addr as usize;
        let end = start + self.length as usize;
        if end > image.len() {
            return Err(Error::OutOfBounds {
                addr: self.addr,
                length: self.length,
                image_len: image.len(),
            });
        }
        debug!(
            "reading {:#x} bytes of data starting at {:#x}",
            self.length, self.addr
        );
        Ok(&image[start..end])
    }

    /// Construct a direct-overwrite write for this region.
    ///
    /// Fails with [`Error::PayloadLengthMismatch`] unless the payload is
    /// exactly `length` bytes.
    pub fn make_write(&self, payload: Vec<u8>) -> Result<WriteBytes> {
        WriteBytes::new(self.clone(), payload)
    }

    /// Combine two disjoint, adjacent regions into one spanning both.
    pub fn union(&self, other: &Region) -> Result<Region> {
        let (lo, hi) = if self.addr <= other.addr {
            (self, other)
        } else {
            (other, self)
        };
        if lo.end() != hi.addr {
            return Err(Error::IncompatibleRegions {
                left: self.name.clone(),
                right: other.name.clone(),
            });
        }
        Ok(Region::new(
            lo.addr,
            lo.length + hi.length,
            format!("{}_{}", lo.name, hi.name),
            format!("{} | {}", lo.descr, hi.descr),
        ))
    }

    /// Split into a head of `head_len` bytes and the remainder.
    pub fn split(&self, head_len: u32) -> Result<(Region, Region)> {
        if head_len == 0 || head_len >= self.length {
            return Err(Error::InvalidSplit {
                name: self.name.clone(),
                at: head_len,
                length: self.length,
            });
        }
        let head = Region::new(
            self.addr,
            head_len,
            format!("{}_0", self.name),
            self.descr.clone(),
        );
        let tail = Region::new(
            self.addr + head_len,
            self.length - head_len,
            format!("{}_1", self.name),
            self.descr.clone(),
        );
        Ok((head, tail))
    }

    /// Partition into `chunk_len`-byte regions plus a final remainder chunk.
    ///
    /// A zero-length remainder is dropped. A chunk length of zero or one
    /// covering the whole region yields the region itself.
    pub fn subdivide(&self, chunk_len: u32) -> Vec<Region> {
        if chunk_len == 0 || chunk_len >= self.length {
            return vec![self.clone()];
        }
        let mut chunks = Vec::new();
        let mut offset = 0;
        while offset < self.length {
            let len = chunk_len.min(self.length - offset);
            chunks.push(Region::new(
                self.addr + offset,
                len,
                format!("{}_{}", self.name, chunks.len()),
                self.descr.clone(),
            ));
            offset += len;
        }
        chunks
    }
}

/// Scan an image for runs of `empty_byte` at least `min_length` bytes long,
/// synthesizing a `free_space_N` region for each run found.
pub fn find_free_space(image: &[u8], min_length: usize, empty_byte: u8) -> Vec<Region> {
    let mut blocks = Vec::new();
    let mut pos = 0usize;
    while pos < image.len() {
        let Some(found) = memchr::memchr(empty_byte, &image[pos..]) else {
            break;
        };
        let start = pos + found;
        let mut end = start + 1;
        while end < image.len() && image[end] == empty_byte {
            end += 1;
        }

        let run = end - start;
        if run >= min_length {
            blocks.push(Region::new(
                start as u32,
                run as u32,
                format!("free_space_{}", blocks.len()),
                format!("Free space: {} bytes", run),
            ));
        }
        pos = end;
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_region() {
        let image = [0u8, 1, 2, 3, 4, 5, 6, 7];
        let region = Region::new(2, 3, "mid", "middle bytes");
        assert_eq!(region.read(&image).unwrap(), &[2, 3, 4]);
    }

    #[test]
    fn test_read_out_of_bounds() {
        let image = [0u8; 4];
        let region = Region::new(2, 4, "past", "");
        assert!(matches!(
            region.read(&image),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_contains() {
        let region = Region::new(0x10, 0x10, "blk", "");
        assert!(!region.contains(0x0F));
        assert!(region.contains(0x10));
        assert!(region.contains(0x1F));
        assert!(!region.contains(0x20));
    }

    #[test]
    fn test_union_adjacent() {
        let a = Region::new(0x0, 0x10, "a", "first");
        let b = Region::new(0x10, 0x08, "b", "second");
        let merged = a.union(&b).unwrap();
        assert_eq!(merged.span(), (0x0, 0x18));
        assert_eq!(merged.name, "a_b");

        // order does not matter
        let merged = b.union(&a).unwrap();
        assert_eq!(merged.span(), (0x0, 0x18));
    }

    #[test]
    fn test_union_rejects_gap_and_overlap() {
        let a = Region::new(0x0, 0x10, "a", "");
        let gap = Region::new(0x20, 0x10, "gap", "");
        let overlap = Region::new(0x08, 0x10, "ovl", "");
        assert!(matches!(
            a.union(&gap),
            Err(Error::IncompatibleRegions { .. })
        ));
        assert!(matches!(
            a.union(&overlap),
            Err(Error::IncompatibleRegions { .. })
        ));
    }

    #[test]
    fn test_split() {
        let region = Region::new(0x100, 0x40, "blk", "");
        let (head, tail) = region.split(0x10).unwrap();
        assert_eq!(head.span(), (0x100, 0x110));
        assert_eq!(tail.span(), (0x110, 0x140));
        assert!(region.split(0x40).is_err());
        assert!(region.split(0).is_err());
    }

    #[test]
    fn test_subdivide_with_remainder() {
        let region = Region::new(0x0, 10, "blk", "");
        let chunks = region.subdivide(4);
        let spans: Vec<_> = chunks.iter().map(|c| c.span()).collect();
        assert_eq!(spans, vec![(0, 4), (4, 8), (8, 10)]);
    }

    #[test]
    fn test_subdivide_exact() {
        let region = Region::new(0x0, 8, "blk", "");
        let chunks = region.subdivide(4);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].span(), (4, 8));
    }

    #[test]
    fn test_find_free_space() {
        let mut image = vec![0u8; 32];
        image[4..12].fill(0xFF); // 8-byte run
        image[20..23].fill(0xFF); // 3-byte run, below threshold
        image[30..32].fill(0xFF);

        let blocks = find_free_space(&image, 4, 0xFF);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].span(), (4, 12));
        assert_eq!(blocks[0].name, "free_space_0");
    }

    #[test]
    fn test_find_free_space_run_at_end() {
        let mut image = vec![0u8; 16];
        image[12..16].fill(0xFF);
        let blocks = find_free_space(&image, 4, 0xFF);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].span(), (12, 16));
    }
}
