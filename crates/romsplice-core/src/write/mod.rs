mod chain;
mod task;

pub use chain::{Link, PayloadChain};
pub use task::{ExpandImage, ShuffleBytes, WriteBytes};

pub(crate) use task::splice_into;

use crate::error::Result;
use crate::patch::IpsPatch;

/// A unit of intended mutation of image bytes.
///
/// Every variant exposes [`Write::apply`], a pure function producing a new
/// image, and [`Write::affected_range`], the half-open byte interval the
/// write may touch, used by the conflict detector.
#[derive(Debug, Clone)]
pub enum Write {
    /// Direct overwrite of one region.
    Bytes(WriteBytes),
    /// Seeded permutation of a region's current bytes.
    Shuffle(ShuffleBytes),
    /// Ordered non-overlapping multi-write.
    Chain(PayloadChain),
    /// Writes decoded from an external IPS patch file.
    Patch(IpsPatch),
    /// Image growth: fill bytes appended at the end.
    Expand(ExpandImage),
}

impl Write {
    pub fn apply(&self, image: &[u8]) -> Result<Vec<u8>> {
        match self {
            Write::Bytes(w) => w.apply(image),
            Write::Shuffle(w) => w.apply(image),
            Write::Chain(w) => w.apply(image),
            Write::Patch(w) => w.apply(image),
            Write::Expand(w) => w.apply(image),
        }
    }

    pub fn affected_range(&self) -> (u32, u32) {
        match self {
            Write::Bytes(w) => w.affected_range(),
            Write::Shuffle(w) => w.affected_range(),
            Write::Chain(w) => w.affected_range(),
            Write::Patch(w) => w.affected_range(),
            Write::Expand(w) => w.affected_range(),
        }
    }

    /// Short description for log lines.
    pub fn label(&self) -> String {
        match self {
            Write::Bytes(w) => format!("write '{}'", w.region().name),
            Write::Shuffle(w) => format!("shuffle '{}'", w.region().name),
            Write::Chain(w) => format!("chain of {} links", w.len()),
            Write::Patch(w) => format!("IPS patch of {} hunks", w.len()),
            Write::Expand(w) => format!("expand '{}'", w.region().name),
        }
    }
}

impl From<WriteBytes> for Write {
    fn from(w: WriteBytes) -> Self {
        Write::Bytes(w)
    }
}

impl From<ShuffleBytes> for Write {
    fn from(w: ShuffleBytes) -> Self {
        Write::Shuffle(w)
    }
}

impl From<PayloadChain> for Write {
    fn from(w: PayloadChain) -> Self {
        Write::Chain(w)
    }
}

impl From<IpsPatch> for Write {
    fn from(w: IpsPatch) -> Self {
        Write::Patch(w)
    }
}

impl From<ExpandImage> for Write {
    fn from(w: ExpandImage) -> Self {
        Write::Expand(w)
    }
}
