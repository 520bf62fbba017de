use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("payload for region '{name}' at {addr:#x} must be {expected} bytes, got {actual}")]
    PayloadLengthMismatch {
        name: String,
        addr: u32,
        expected: u32,
        actual: usize,
    },

    #[error("regions '{left}' and '{right}' are not disjoint and adjacent")]
    IncompatibleRegions { left: String, right: String },

    #[error("region '{0}' is not registered")]
    NotFound(String),

    #[error("malformed IPS patch: {0}")]
    MalformedPatch(String),

    #[error(
        "region '{name}' already registered at {existing_addr:#x}+{existing_length:#x}, \
         refusing conflicting definition {addr:#x}+{length:#x}"
    )]
    ConflictingDefinition {
        name: String,
        existing_addr: u32,
        existing_length: u32,
        addr: u32,
        length: u32,
    },

    #[error("range {addr:#x}+{length:#x} exceeds image size {image_len:#x}")]
    OutOfBounds {
        addr: u32,
        length: u32,
        image_len: usize,
    },

    #[error("link at {addr:#x} overlaps an existing link in the chain")]
    OverlappingLink { addr: u32 },

    #[error("cannot split region '{name}' of length {length:#x} at offset {at:#x}")]
    InvalidSplit { name: String, at: u32, length: u32 },

    #[error(
        "hard conflict between writes at {left_start:#x}..{left_end:#x} \
         and {right_start:#x}..{right_end:#x}"
    )]
    HardConflict {
        left_start: u32,
        left_end: u32,
        right_start: u32,
        right_end: u32,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.is_not_found());

        let err2 = Error::NotFound("header".to_string());
        assert!(!err2.is_not_found());
    }
}
