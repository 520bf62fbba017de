mod registry;
mod structure;

pub use registry::{OrderBy, Registry};
pub use structure::{Region, find_free_space};
