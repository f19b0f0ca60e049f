//! Error taxonomy shared by every module in this crate.

use std::path::PathBuf;

use thiserror::Error;

/// The single error type returned by every public operation in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A repo-bound object (`Distribution`, `Package`, `PackageList`) was
    /// used without ever being attached to a `Repository`.
    #[error("object is not attached to a repository")]
    Unattached,

    /// A distribution or package list was accessed when `exists()` is false.
    #[error("{0} does not exist in this repository")]
    NonExistent(String),

    /// A transport received a URI whose scheme it does not handle.
    #[error("URI {uri} is not valid for this transport")]
    UriMismatch {
        /// The offending URI.
        uri: String,
    },

    /// The backing store does not have the requested URI.
    #[error("{0} was not found")]
    NotFound(String),

    /// The transport cannot perform this operation at all.
    #[error("operation not supported by this transport: {0}")]
    Unsupported(String),

    /// The AR/TAR framing or content of a `.deb` violates its contract.
    #[error("invalid .deb file: {0}")]
    InvalidDeb(String),

    /// The tag-file parser could not make sense of a header line.
    #[error("invalid tag file, offending line: {0:?}")]
    InvalidTagFile(String),

    /// A downloaded file's declared hash/size disagreed with what was
    /// actually read.
    #[error("checksum mismatch for {0}")]
    IncorrectChecksum(String),

    /// A download was requested for a `FileHash` with no populated hash
    /// field.
    #[error("no supported hash available for this file")]
    NoValidHash,

    /// A download was requested for a `FileHash` with no declared size.
    #[error("no size available for this file")]
    NoSize,

    /// A `Package` stanza is missing a field required by
    /// `Repository::add_package`.
    #[error("{path} is missing required control field {field}")]
    MissingControlField {
        /// The path or description of the source the stanza came from.
        path: String,
        /// The name of the missing field.
        field: String,
    },

    /// PGP verification (inline or detached) reported the signature as
    /// invalid.
    #[error("signature verification failed for {0}")]
    SignatureFailure(String),

    /// Propagated filesystem I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Propagated HTTP transport failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// A `MirrorConfig` or other TOML document could not be parsed.
    #[error(transparent)]
    Config(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn not_found(path: impl Into<PathBuf>) -> Self {
        Error::NotFound(path.into().display().to_string())
    }

    /// True if this error is the recoverable "not found" kind — the only
    /// kind the core is allowed to catch and fall back on (spec.md §7).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
            || matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
