//! IPS binary patch format.
//!
//! An IPS stream starts with the magic literal `PATCH`, followed by hunks
//! until the `EOF` terminator. All integers are big-endian.
//!
//! - Standard hunk: 3-byte address, 2-byte payload length `L` (nonzero),
//!   `L` payload bytes.
//! - RLE hunk: 3-byte address, the 2-byte value `0x0000`, a 2-byte run
//!   length `R`, and one fill byte repeated `R` times.
//!
//! As an extension, `EOF` may be followed by a 3-byte length to which the
//! output image is truncated after all hunks are applied.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::write::{PayloadChain, splice_into};

const MAGIC: &[u8] = b"PATCH";
const TERMINATOR: &[u8] = b"EOF";

/// Maximum payload length of a single hunk; longer payloads are split into
/// consecutive hunks on encode.
pub const MAX_HUNK_LEN: usize = 0xFFFF;

fn be24(bytes: &[u8]) -> u32 {
    (u32::from(bytes[0]) << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2])
}

fn be24_bytes(value: u32) -> [u8; 3] {
    [(value >> 16) as u8, (value >> 8) as u8, value as u8]
}

/// A decoded IPS patch: a mapping from address to payload, plus an optional
/// image-truncation length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpsPatch {
    hunks: BTreeMap<u32, Vec<u8>>,
    truncate_to: Option<u32>,
}

impl IpsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a raw IPS byte stream.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < MAGIC.len() || &data[..MAGIC.len()] != MAGIC {
            return Err(Error::MalformedPatch("missing PATCH magic".to_string()));
        }

        let mut hunks = BTreeMap::new();
        let mut pos = MAGIC.len();
        loop {
            if pos + 3 > data.len() {
                return Err(Error::MalformedPatch("missing EOF terminator".to_string()));
            }
            if &data[pos..pos + 3] == TERMINATOR {
                pos += 3;
                break;
            }

            let addr = be24(&data[pos..pos + 3]);
            pos += 3;
            if pos + 2 > data.len() {
                return Err(Error::MalformedPatch(format!(
                    "truncated hunk header at offset {}",
                    pos
                )));
            }
            let length = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
            pos += 2;

            let payload = if length == 0 {
                // RLE hunk
                if pos + 3 > data.len() {
                    return Err(Error::MalformedPatch(format!(
                        "truncated RLE hunk at offset {}",
                        pos
                    )));
                }
                let run = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
                let fill = data[pos + 2];
                pos += 3;
                vec![fill; run]
            } else {
                if pos + length > data.len() {
                    return Err(Error::MalformedPatch(format!(
                        "hunk payload at offset {} reads past end of stream",
                        pos
                    )));
                }
                let payload = data[pos..pos + length].to_vec();
                pos += length;
                payload
            };
            debug!("decoded hunk at {:#x}, {} bytes", addr, payload.len());
            hunks.insert(addr, payload);
        }

        let truncate_to = match data.len() - pos {
            0 => None,
            3 => Some(be24(&data[pos..pos + 3])),
            _ => {
                return Err(Error::MalformedPatch(
                    "trailing bytes after EOF terminator".to_string(),
                ));
            }
        };

        Ok(Self { hunks, truncate_to })
    }

    /// Encode back to the binary format, splitting oversized payloads into
    /// consecutive hunks.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        for (&addr, payload) in &self.hunks {
            let mut addr = addr;
            let mut rest = payload.as_slice();
            while !rest.is_empty() {
                let take = rest.len().min(MAX_HUNK_LEN);
                out.extend_from_slice(&be24_bytes(addr));
                out.extend_from_slice(&(take as u16).to_be_bytes());
                out.extend_from_slice(&rest[..take]);
                addr += take as u32;
                rest = &rest[take..];
            }
        }
        out.extend_from_slice(TERMINATOR);
        if let Some(length) = self.truncate_to {
            out.extend_from_slice(&be24_bytes(length));
        }
        out
    }

    /// Build a patch that transforms `original` into `modified`.
    pub fn diff(original: &[u8], modified: &[u8]) -> Self {
        let mut patch = Self::new();
        let common = original.len().min(modified.len());

        let mut i = 0usize;
        while i < common {
            if original[i] == modified[i] {
                i += 1;
                continue;
            }
            let start = i;
            while i < common && original[i] != modified[i] {
                i += 1;
            }
            patch.insert(start as u32, modified[start..i].to_vec());
        }

        if modified.len() > original.len() {
            patch.insert(common as u32, modified[common..].to_vec());
        } else if modified.len() < original.len() {
            patch.truncate_to = Some(modified.len() as u32);
        }
        patch
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        Self::decode(&data)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.encode())?;
        Ok(())
    }

    /// Add a hunk. A hunk already recorded at the same address is replaced.
    pub fn insert(&mut self, addr: u32, payload: Vec<u8>) {
        if !payload.is_empty() {
            self.hunks.insert(addr, payload);
        }
    }

    pub fn hunks(&self) -> &BTreeMap<u32, Vec<u8>> {
        &self.hunks
    }

    pub fn truncate_to(&self) -> Option<u32> {
        self.truncate_to
    }

    pub fn set_truncate_to(&mut self, length: Option<u32>) {
        self.truncate_to = length;
    }

    pub fn len(&self) -> usize {
        self.hunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Apply every hunk, growing the image if a hunk extends past its end,
    /// then truncate if the patch carries a truncation length.
    pub fn apply(&self, image: &[u8]) -> Result<Vec<u8>> {
        let mut out = image.to_vec();
        for (&addr, payload) in &self.hunks {
            let end = addr as usize + payload.len();
            if end > out.len() {
                out.resize(end, 0);
            }
            splice_into(&mut out, addr, payload)?;
        }
        if let Some(length) = self.truncate_to {
            out.truncate(length as usize);
        }
        Ok(out)
    }

    /// Express the patch as an equivalent chained multi-write. Fails if two
    /// hunks overlap.
    pub fn to_chain(&self) -> Result<PayloadChain> {
        PayloadChain::from_writes(&self.hunks)
    }

    /// Hull of every hunk: lowest address to highest hunk end. `(0, 0)` for
    /// an empty patch.
    pub fn affected_range(&self) -> (u32, u32) {
        let first = self.hunks.keys().next().copied();
        let last = self
            .hunks
            .iter()
            .map(|(&addr, payload)| addr + payload.len() as u32)
            .max();
        match (first, last) {
            (Some(start), Some(end)) => (start, end),
            _ => (0, 0),
        }
    }
}
