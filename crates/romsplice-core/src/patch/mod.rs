mod ips;

pub use ips::{IpsPatch, MAX_HUNK_LEN};
