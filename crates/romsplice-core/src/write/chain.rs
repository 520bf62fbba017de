use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::write::task::splice_into;

/// One link of a [`PayloadChain`]: a payload spliced in at a fixed address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub addr: u32,
    pub payload: Vec<u8>,
}

impl Link {
    pub fn end(&self) -> u32 {
        self.addr + self.payload.len() as u32
    }
}

/// An ordered sequence of non-overlapping `(address, payload)` links,
/// applied to an image in a single pass.
///
/// Links are kept in a vector sorted by address; insertion finds its spot
/// by binary search and rejects links that would overlap a neighbor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadChain {
    links: Vec<Link>,
}

impl PayloadChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chain from an address-to-payload map.
    pub fn from_writes(writes: &BTreeMap<u32, Vec<u8>>) -> Result<Self> {
        let mut chain = Self::new();
        for (&addr, payload) in writes {
            chain.insert(addr, payload.clone())?;
        }
        Ok(chain)
    }

    /// Splice a new link into the chain, preserving address order.
    pub fn insert(&mut self, addr: u32, payload: Vec<u8>) -> Result<()> {
        if payload.is_empty() {
            return Ok(());
        }
        let end = addr + payload.len() as u32;
        let idx = self.links.partition_point(|link| link.addr < addr);

        if idx > 0 && self.links[idx - 1].end() > addr {
            return Err(Error::OverlappingLink { addr });
        }
        if idx < self.links.len() && self.links[idx].addr < end {
            return Err(Error::OverlappingLink { addr });
        }

        self.links.insert(idx, Link { addr, payload });
        Ok(())
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn apply(&self, image: &[u8]) -> Result<Vec<u8>> {
        let mut out = image.to_vec();
        for link in &self.links {
            splice_into(&mut out, link.addr, &link.payload)?;
        }
        Ok(out)
    }

    /// Hull of every link: first address to last link end. `(0, 0)` for an
    /// empty chain.
    pub fn affected_range(&self) -> (u32, u32) {
        match (self.links.first(), self.links.last()) {
            (Some(first), Some(last)) => (first.addr, last.end()),
            _ => (0, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_address_order() {
        let mut chain = PayloadChain::new();
        chain.insert(0x10, vec![1, 2]).unwrap();
        chain.insert(0x0, vec![3]).unwrap();
        chain.insert(0x8, vec![4, 5]).unwrap();

        let addrs: Vec<u32> = chain.links().iter().map(|l| l.addr).collect();
        assert_eq!(addrs, vec![0x0, 0x8, 0x10]);
        assert_eq!(chain.affected_range(), (0x0, 0x12));
    }

    #[test]
    fn test_insert_rejects_overlap() {
        let mut chain = PayloadChain::new();
        chain.insert(0x4, vec![0; 4]).unwrap();
        // tail overlap
        assert!(matches!(
            chain.insert(0x6, vec![0; 2]),
            Err(Error::OverlappingLink { addr: 0x6 })
        ));
        // head overlap
        assert!(matches!(
            chain.insert(0x2, vec![0; 4]),
            Err(Error::OverlappingLink { addr: 0x2 })
        ));
        // exactly adjacent on both sides is fine
        chain.insert(0x0, vec![0; 4]).unwrap();
        chain.insert(0x8, vec![0; 4]).unwrap();
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_apply_single_pass() {
        let mut chain = PayloadChain::new();
        chain.insert(0x0, vec![0xAA, 0xAA]).unwrap();
        chain.insert(0x4, vec![0xBB]).unwrap();

        let out = chain.apply(&vec![0u8; 8]).unwrap();
        assert_eq!(out, vec![0xAA, 0xAA, 0, 0, 0xBB, 0, 0, 0]);
    }

    #[test]
    fn test_from_writes() {
        let mut writes = BTreeMap::new();
        writes.insert(0x8, vec![1]);
        writes.insert(0x0, vec![2, 3]);
        let chain = PayloadChain::from_writes(&writes).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.links()[0].addr, 0x0);
    }

    #[test]
    fn test_empty_payload_ignored() {
        let mut chain = PayloadChain::new();
        chain.insert(0x0, Vec::new()).unwrap();
        assert!(chain.is_empty());
        assert_eq!(chain.affected_range(), (0, 0));
    }
}
