use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{Error, Result};
use crate::region::Region;

/// Copy `payload` over `buf` at `addr`, in place.
pub(crate) fn splice_into(buf: &mut [u8], addr: u32, payload: &[u8]) -> Result<()> {
    let start = addr as usize;
    let end = start + payload.len();
    if end > buf.len() {
        return Err(Error::OutOfBounds {
            addr,
            length: payload.len() as u32,
            image_len: buf.len(),
        });
    }
    buf[start..end].copy_from_slice(payload);
    Ok(())
}

/// A direct overwrite of one region with an explicit byte payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBytes {
    region: Region,
    payload: Vec<u8>,
}

impl WriteBytes {
    /// Fails with [`Error::PayloadLengthMismatch`] unless the payload is
    /// exactly the region's length.
    pub fn new(region: Region, payload: Vec<u8>) -> Result<Self> {
        if payload.len() != region.length as usize {
            return Err(Error::PayloadLengthMismatch {
                name: region.name.clone(),
                addr: region.addr,
                expected: region.length,
                actual: payload.len(),
            });
        }
        Ok(Self { region, payload })
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Coalesce with another write targeting a disjoint, adjacent region.
    pub fn merge(&self, other: &WriteBytes) -> Result<WriteBytes> {
        let region = self.region.union(&other.region)?;
        let (first, second) = if self.region.addr <= other.region.addr {
            (self, other)
        } else {
            (other, self)
        };
        let mut payload = first.payload.clone();
        payload.extend_from_slice(&second.payload);
        WriteBytes::new(region, payload)
    }

    /// Number of bytes this write would change in `image`.
    pub fn diff_count(&self, image: &[u8]) -> Result<usize> {
        let current = self.region.read(image)?;
        Ok(current
            .iter()
            .zip(&self.payload)
            .filter(|(a, b)| a != b)
            .count())
    }

    pub fn apply(&self, image: &[u8]) -> Result<Vec<u8>> {
        let mut out = image.to_vec();
        splice_into(&mut out, self.region.addr, &self.payload)?;
        Ok(out)
    }

    pub fn affected_range(&self) -> (u32, u32) {
        self.region.span()
    }
}

/// Rearranges a region's current bytes with a seeded permutation.
///
/// The region is read back from the image the write is applied to, so a
/// shuffle sees the effect of every write applied before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShuffleBytes {
    region: Region,
    seed: u64,
}

impl ShuffleBytes {
    pub fn new(region: Region, seed: u64) -> Self {
        Self { region, seed }
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn apply(&self, image: &[u8]) -> Result<Vec<u8>> {
        let mut data = self.region.read(image)?.to_vec();
        let mut rng = StdRng::seed_from_u64(self.seed);
        data.shuffle(&mut rng);

        let mut out = image.to_vec();
        splice_into(&mut out, self.region.addr, &data)?;
        Ok(out)
    }

    pub fn affected_range(&self) -> (u32, u32) {
        self.region.span()
    }
}

/// Appends fill bytes to the end of the image so the span of `region`
/// becomes addressable. Existing bytes are never touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandImage {
    region: Region,
    fill: u8,
}

impl ExpandImage {
    pub fn new(region: Region, fill: u8) -> Self {
        Self { region, fill }
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn apply(&self, image: &[u8]) -> Result<Vec<u8>> {
        let target = self.region.end() as usize;
        let mut out = image.to_vec();
        if target > out.len() {
            out.resize(target, self.fill);
        }
        Ok(out)
    }

    pub fn affected_range(&self) -> (u32, u32) {
        self.region.span()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_bytes_roundtrip() {
        let region = Region::new(0x4, 0x4, "blk", "");
        let write = region.make_write(vec![0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        let image = vec![0u8; 16];
        let out = write.apply(&image).unwrap();
        assert_eq!(region.read(&out).unwrap(), &[0xDE, 0xAD, 0xBE, 0xEF]);
        // input untouched
        assert_eq!(image, vec![0u8; 16]);
    }

    #[test]
    fn test_write_bytes_length_mismatch() {
        let region = Region::new(0x0, 0x4, "blk", "");
        assert!(matches!(
            region.make_write(vec![0xAA; 3]),
            Err(Error::PayloadLengthMismatch { .. })
        ));
    }

    #[test]
    fn test_merge_adjacent_writes() {
        let a = Region::new(0x0, 0x2, "a", "").make_write(vec![1, 2]).unwrap();
        let b = Region::new(0x2, 0x2, "b", "").make_write(vec![3, 4]).unwrap();
        let merged = b.merge(&a).unwrap();
        assert_eq!(merged.affected_range(), (0x0, 0x4));
        assert_eq!(merged.payload(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_merge_non_adjacent_fails() {
        let a = Region::new(0x0, 0x2, "a", "").make_write(vec![1, 2]).unwrap();
        let b = Region::new(0x8, 0x2, "b", "").make_write(vec![3, 4]).unwrap();
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn test_shuffle_preserves_bytes() {
        let region = Region::new(0x0, 0x8, "blk", "");
        let image: Vec<u8> = (0..16).collect();
        let shuffled = ShuffleBytes::new(region.clone(), 42).apply(&image).unwrap();

        let mut before: Vec<u8> = image[..8].to_vec();
        let mut after: Vec<u8> = shuffled[..8].to_vec();
        before.sort_unstable();
        after.sort_unstable();
        assert_eq!(before, after);
        // bytes outside the region untouched
        assert_eq!(&shuffled[8..], &image[8..]);
    }

    #[test]
    fn test_shuffle_deterministic_per_seed() {
        let region = Region::new(0x0, 0x8, "blk", "");
        let image: Vec<u8> = (0..8).collect();
        let a = ShuffleBytes::new(region.clone(), 7).apply(&image).unwrap();
        let b = ShuffleBytes::new(region, 7).apply(&image).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_expand_image_appends_fill() {
        let region = Region::new(0x8, 0x8, "exp", "ROM size expansion");
        let image = vec![0x11u8; 8];
        let out = ExpandImage::new(region, 0xFF).apply(&image).unwrap();
        assert_eq!(out.len(), 16);
        assert_eq!(&out[..8], &image[..]);
        assert!(out[8..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_diff_count() {
        let region = Region::new(0x0, 0x4, "blk", "");
        let write = region.make_write(vec![0, 0, 1, 1]).unwrap();
        let image = vec![0u8; 4];
        assert_eq!(write.diff_count(&image).unwrap(), 2);
    }
}
