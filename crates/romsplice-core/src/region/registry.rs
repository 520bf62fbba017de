use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::region::Region;

/// Ordering for tag listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum OrderBy {
    #[default]
    Unsorted,
    Address,
    Name,
}

/// The owning collection of [`Region`]s for one game layout.
///
/// Holds three indexes: name to region (primary ownership store), a span
/// list for containment queries, and a tag multi-index. Span overlap is not
/// forbidden here; overlap policing is the write queue's job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    by_name: HashMap<String, Region>,
    by_span: Vec<((u32, u32), String)>,
    by_tag: HashMap<String, BTreeSet<String>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a region under `name`, returning it.
    ///
    /// Idempotent on `name`: if the name is already present the existing
    /// region is returned unchanged and the new definition is ignored. Use
    /// [`Registry::register_strict`] to make a disagreeing re-registration
    /// an error instead.
    pub fn register(&mut self, addr: u32, length: u32, name: &str, descr: &str) -> Region {
        self.register_tagged(addr, length, name, descr, &[])
    }

    pub fn register_tagged(
        &mut self,
        addr: u32,
        length: u32,
        name: &str,
        descr: &str,
        tags: &[&str],
    ) -> Region {
        if let Some(existing) = self.by_name.get(name) {
            debug!("region '{}' already registered, keeping existing definition", name);
            return existing.clone();
        }

        let region = Region::new(addr, length, name, descr);
        self.by_span.push(((addr, addr + length), name.to_string()));
        for tag in tags {
            self.by_tag
                .entry((*tag).to_string())
                .or_default()
                .insert(name.to_string());
        }
        self.by_name.insert(name.to_string(), region.clone());
        region
    }

    /// Like [`Registry::register_tagged`], but a re-registration whose
    /// address or length disagrees with the existing entry fails with
    /// [`Error::ConflictingDefinition`] rather than being silently ignored.
    pub fn register_strict(
        &mut self,
        addr: u32,
        length: u32,
        name: &str,
        descr: &str,
        tags: &[&str],
    ) -> Result<Region> {
        if let Some(existing) = self.by_name.get(name) {
            if existing.addr != addr || existing.length != length {
                return Err(Error::ConflictingDefinition {
                    name: name.to_string(),
                    existing_addr: existing.addr,
                    existing_length: existing.length,
                    addr,
                    length,
                });
            }
        }
        Ok(self.register_tagged(addr, length, name, descr, tags))
    }

    /// Remove a region from all three indexes atomically.
    pub fn deregister(&mut self, name: &str) -> Result<Region> {
        let region = self
            .by_name
            .remove(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        self.by_span.retain(|(_, n)| n != name);
        self.by_tag.retain(|_, names| {
            names.remove(name);
            !names.is_empty()
        });
        Ok(region)
    }

    pub fn get(&self, name: &str) -> Option<&Region> {
        self.by_name.get(name)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Region)> {
        self.by_name.iter()
    }

    /// Regions sorted by ascending address.
    pub fn regions_by_addr(&self) -> Vec<&Region> {
        let mut regions: Vec<&Region> = self.by_name.values().collect();
        regions.sort_by_key(|r| (r.addr, r.length));
        regions
    }

    /// Append further documentation to a region's description.
    pub fn annotate(&mut self, name: &str, extra: &str) -> Result<()> {
        let region = self
            .by_name
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        if !region.descr.is_empty() {
            region.descr.push_str(" | ");
        }
        region.descr.push_str(extra);
        Ok(())
    }

    /// Every registered region whose span contains `addr`. More than one
    /// region may match when registered spans overlap.
    pub fn regions_containing(&self, addr: u32) -> BTreeMap<String, Region> {
        self.by_span
            .iter()
            .filter(|((start, end), _)| *start <= addr && addr < *end)
            .filter_map(|(_, name)| {
                self.by_name
                    .get(name)
                    .map(|region| (name.clone(), region.clone()))
            })
            .collect()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.by_tag.keys().map(String::as_str)
    }

    pub fn regions_for_tag(&self, tag: &str, order: OrderBy) -> Vec<(String, u32)> {
        let Some(names) = self.by_tag.get(tag) else {
            return Vec::new();
        };
        let mut entries: Vec<(String, u32)> = names
            .iter()
            .filter_map(|name| self.by_name.get(name).map(|r| (name.clone(), r.addr)))
            .collect();
        match order {
            OrderBy::Unsorted => {}
            OrderBy::Address => entries.sort_by_key(|(_, addr)| *addr),
            OrderBy::Name => entries.sort_by(|a, b| a.0.cmp(&b.0)),
        }
        entries
    }

    /// Textual `address: name` listing for one tag.
    pub fn format_tag(&self, tag: &str, order: OrderBy) -> String {
        self.regions_for_tag(tag, order)
            .into_iter()
            .map(|(name, addr)| format!("{:<8}: {}", format!("{:#x}", addr), name))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Register an `expanded_space` region immediately past the highest
    /// registered span, for use with an image-growth write.
    pub fn expand(&mut self, length: u32) -> Region {
        let end = self
            .by_span
            .iter()
            .map(|((_, end), _)| *end)
            .max()
            .unwrap_or(0);
        self.register(
            end,
            length,
            &format!("expanded_space_{:x}_{:x}", end, end + length),
            "ROM size expansion",
        )
    }

    /// Synthesize a registry of `gap_N` filler regions covering every byte
    /// range between consecutive documented spans, scanning in ascending
    /// address order starting from absolute zero.
    ///
    /// A span starting behind the scan pointer (overlapping or nested in an
    /// earlier span) is skipped with a warning; callers that consider
    /// overlapping layout input an error should validate before calling.
    pub fn undocumented_gaps(&self) -> Registry {
        self.gaps_up_to(None)
    }

    /// Like [`Registry::undocumented_gaps`], but also synthesizes a final
    /// gap from the last documented span to `bound` (typically the image
    /// length).
    pub fn undocumented_gaps_bounded(&self, bound: u32) -> Registry {
        self.gaps_up_to(Some(bound))
    }

    fn gaps_up_to(&self, bound: Option<u32>) -> Registry {
        let mut spans: Vec<(u32, u32)> = self.by_span.iter().map(|(span, _)| *span).collect();
        spans.sort_unstable();

        let mut gaps = Registry::new();
        let mut ptr = 0u32;
        let mut i = 0usize;
        for (start, end) in spans {
            if start < ptr {
                warn!(
                    "span {:#x}..{:#x} starts behind scan pointer {:#x}, skipping",
                    start, end, ptr
                );
                continue;
            }
            if start > ptr {
                gaps.register(
                    ptr,
                    start - ptr,
                    &format!("gap_{}", i),
                    &format!("Undocumented area {}", i),
                );
                i += 1;
            }
            ptr = end;
        }

        if let Some(bound) = bound {
            if bound > ptr {
                gaps.register(
                    ptr,
                    bound - ptr,
                    &format!("gap_{}", i),
                    &format!("Undocumented area {}", i),
                );
            }
        }
        gaps
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let registry = serde_json::from_str(&content)?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registry() -> Registry {
        let mut reg = Registry::new();
        reg.register_tagged(0x0, 0x10, "header", "ROM header", &["data"]);
        reg.register_tagged(0x10, 0x20, "ptrs", "Pointer table", &["pointers"]);
        reg.register_tagged(0x40, 0x10, "names", "Name table", &["data", "names"]);
        reg
    }

    #[test]
    fn test_register_idempotent() {
        let mut reg = Registry::new();
        let first = reg.register(0x0, 0x10, "header", "ROM header");
        let second = reg.register(0x100, 0x8, "header", "different definition");
        assert_eq!(first, second);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("header").unwrap().addr, 0x0);
    }

    #[test]
    fn test_register_strict_conflict() {
        let mut reg = Registry::new();
        reg.register(0x0, 0x10, "header", "ROM header");
        assert!(reg.register_strict(0x0, 0x10, "header", "same", &[]).is_ok());
        assert!(matches!(
            reg.register_strict(0x100, 0x10, "header", "moved", &[]),
            Err(Error::ConflictingDefinition { .. })
        ));
    }

    #[test]
    fn test_deregister_removes_all_indexes() {
        let mut reg = sample_registry();
        reg.deregister("names").unwrap();
        assert!(reg.get("names").is_none());
        assert!(reg.regions_containing(0x48).is_empty());
        assert!(reg
            .regions_for_tag("data", OrderBy::Unsorted)
            .iter()
            .all(|(name, _)| name != "names"));
        // the "names" tag set became empty and is dropped entirely
        assert!(reg.regions_for_tag("names", OrderBy::Unsorted).is_empty());
    }

    #[test]
    fn test_deregister_missing() {
        let mut reg = Registry::new();
        assert!(matches!(
            reg.deregister("nope"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_regions_containing_overlap() {
        let mut reg = sample_registry();
        // overlapping spans are allowed by the registry
        reg.register(0x8, 0x10, "straddle", "overlaps header and ptrs");
        let hits = reg.regions_containing(0xC);
        assert_eq!(hits.len(), 2);
        assert!(hits.contains_key("header"));
        assert!(hits.contains_key("straddle"));
    }

    #[test]
    fn test_regions_for_tag_ordering() {
        let reg = sample_registry();
        let by_addr = reg.regions_for_tag("data", OrderBy::Address);
        assert_eq!(by_addr[0].0, "header");
        assert_eq!(by_addr[1].0, "names");

        let by_name = reg.regions_for_tag("data", OrderBy::Name);
        assert_eq!(by_name[0].0, "header");
    }

    #[test]
    fn test_format_tag() {
        let reg = sample_registry();
        let listing = reg.format_tag("pointers", OrderBy::Address);
        assert!(listing.contains("0x10"));
        assert!(listing.contains("ptrs"));
    }

    #[test]
    fn test_gap_synthesis_tiles_layout() {
        let reg = sample_registry();
        let gaps = reg.undocumented_gaps();
        // documented: [0x0,0x10) [0x10,0x30) [0x40,0x50) -> one gap
        assert_eq!(gaps.len(), 1);
        let gap = gaps.get("gap_0").unwrap();
        assert_eq!(gap.span(), (0x30, 0x40));
    }

    #[test]
    fn test_gap_synthesis_leading_and_bounded() {
        let mut reg = Registry::new();
        reg.register(0x20, 0x10, "mid", "");
        let gaps = reg.undocumented_gaps_bounded(0x100);
        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps.get("gap_0").unwrap().span(), (0x0, 0x20));
        assert_eq!(gaps.get("gap_1").unwrap().span(), (0x30, 0x100));
    }

    #[test]
    fn test_gap_synthesis_skips_overlapping_span() {
        let mut reg = Registry::new();
        reg.register(0x0, 0x20, "outer", "");
        reg.register(0x8, 0x4, "nested", "");
        reg.register(0x30, 0x10, "later", "");
        let gaps = reg.undocumented_gaps();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps.get("gap_0").unwrap().span(), (0x20, 0x30));
    }

    #[test]
    fn test_annotate_appends() {
        let mut reg = sample_registry();
        reg.annotate("header", "also holds the checksum").unwrap();
        assert!(reg.get("header").unwrap().descr.contains("checksum"));
        assert!(reg.annotate("nope", "x").is_err());
    }

    #[test]
    fn test_expand_registers_past_end() {
        let mut reg = sample_registry();
        let blk = reg.expand(0x100);
        assert_eq!(blk.span(), (0x50, 0x150));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let reg = sample_registry();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        reg.save(&path).unwrap();
        let loaded = Registry::load(&path).unwrap();
        assert_eq!(loaded.len(), reg.len());
        assert_eq!(loaded.get("ptrs"), reg.get("ptrs"));
        assert_eq!(
            loaded.regions_for_tag("data", OrderBy::Address),
            reg.regions_for_tag("data", OrderBy::Address)
        );
    }
}
