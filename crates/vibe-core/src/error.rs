//! Error types for vibe-core.
//!
//! These cover the engine's own infrastructure (toolchain discovery,
//! directories, malformed generation payloads). Failures of a generated
//! component are not errors of this kind: they are reported as
//! [`LoadFailure`](crate::load::LoadFailure) through the error channel.

use thiserror::Error;

use crate::source::Revision;

/// Result type for vibe-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in vibe-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Toolchain error (rustc missing or unusable).
    #[error("toolchain error: {0}")]
    Toolchain(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A generation payload could not be decoded.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// A generation payload violated the service contract.
    #[error("invalid generation: {0}")]
    InvalidGeneration(String),

    /// A source record arrived with a revision that is not newer than the
    /// latest accepted one.
    #[error("stale revision {submitted} (latest accepted is {latest})")]
    StaleRevision { submitted: Revision, latest: Revision },

    /// A source record arrived with a revision above
    /// [`Revision::MAX_SUBMITTED`].
    #[error("revision {submitted} is out of range (maximum is {max})")]
    RevisionOutOfRange { submitted: Revision, max: Revision },
}

impl Error {
    /// Format the error with a recovery hint, when one is known.
    pub fn with_hint(&self) -> String {
        match self {
            Self::Toolchain(_) => format!("{self}\n  hint: install Rust with rustup and make sure `rustc` is on PATH"),
            Self::InvalidGeneration(_) | Self::Deserialization(_) => {
                format!("{self}\n  hint: expected a JSON object with `code`, `designTokens` and `thoughts`")
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_revision_message() {
        let err = Error::StaleRevision {
            submitted: Revision::new(2),
            latest: Revision::new(5),
        };
        assert_eq!(err.to_string(), "stale revision r2 (latest accepted is r5)");
    }

    #[test]
    fn test_revision_out_of_range_message() {
        let err = Error::RevisionOutOfRange {
            submitted: Revision::new(u64::MAX),
            max: Revision::MAX_SUBMITTED,
        };
        assert_eq!(
            err.to_string(),
            format!("revision r{} is out of range (maximum is r{})", u64::MAX, u64::MAX / 2)
        );
    }

    #[test]
    fn test_toolchain_hint() {
        let err = Error::Toolchain("rustc not found in PATH".to_string());
        assert!(err.with_hint().contains("hint: install Rust"));
    }
}
