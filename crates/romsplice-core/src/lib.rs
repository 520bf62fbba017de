//! # romsplice-core
//!
//! Core library for the romsplice binary-patch composition engine.
//!
//! This crate provides:
//! - Named, addressed regions of a binary image and the registry that owns
//!   them (name, span, and tag indexes)
//! - A write family: direct overwrites, byte shuffles, chained multi-writes,
//!   IPS-backed writes, and image growth
//! - Conflict detection over pending writes, with a soft-conflict
//!   equivalence check for harmless overlaps
//! - A write queue that merges, conflict-checks, and applies writes to
//!   produce a patched image
//! - Layout-description parsers for building registries from ROM and RAM
//!   map documents

pub mod checkpoint;
pub mod error;
pub mod layout;
pub mod patch;
pub mod queue;
pub mod region;
pub mod write;

pub use checkpoint::{CheckpointOnConflict, Checkpointer};
pub use error::{Error, Result};
pub use layout::{derive_name, parse_ram_map, parse_rom_map};
pub use patch::{IpsPatch, MAX_HUNK_LEN};
pub use queue::{
    ConflictPair, ConflictReport, ConflictResolver, FailOnConflict, LogAndProceed, Resolution,
    WriteQueue, check_overlaps, is_soft_conflict, merge_writes,
};
pub use region::{OrderBy, Region, Registry, find_free_space};
pub use write::{ExpandImage, Link, PayloadChain, ShuffleBytes, Write, WriteBytes};
