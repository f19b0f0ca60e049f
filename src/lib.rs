//! Read, verify, and mirror APT (Debian) package repositories.
//!
//! The entry point is [`Repository`]: point it at a `file://` or `http(s)://`
//! base URI, enumerate its [`Distribution`]s, and pull [`Package`] stanzas
//! out of their [`PackageList`]s. `.deb` blobs are read with [`deb`] and
//! pooled content-addressed by SHA256; metadata authenticity is delegated to
//! the [`pgp::Verifier`] trait, which is a no-op unless a concrete verifier
//! (the `sequoia` feature's [`pgp::SequoiaVerifier`]) is supplied.

pub mod checksum;
pub mod config;
pub mod deb;
pub mod distribution;
pub mod error;
pub mod filehash;
pub mod package;
pub mod pgp;
pub mod release;
pub mod repository;
pub mod tagfile;
pub mod transport;

pub use config::MirrorConfig;
pub use distribution::Distribution;
pub use error::{Error, Result};
pub use filehash::FileHash;
pub use package::Package;
pub use pgp::{InlineVerifyOutput, Verifier};
pub use release::ReleaseFile;
pub use repository::{PackageList, Repository};
pub use tagfile::TagBlock;
pub use transport::{DirectoryListing, Transport};
