//! The `Transport` abstraction: four URI-addressed operations that a
//! `Repository` uses without caring whether the backing store is a local
//! filesystem or a remote HTTP archive.
//!
//! Grounded on `examples/original_source/apt/transport/transport.py` (the
//! abstract base) and `apt/transport/__init__.py`'s `get_transport` scheme
//! dispatch.

mod apache;
mod file;
mod http;

pub use apache::ApacheTransport;
pub use file::FileTransport;
pub use http::HttpTransport;

use std::io::{Read, Write};

use crate::config::MirrorConfig;
use crate::error::{Error, Result};

/// Files and subdirectories found by `Transport::list_directory`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    pub files: Vec<String>,
    pub directories: Vec<String>,
}

pub trait Transport {
    fn exists(&self, uri: &str) -> Result<bool>;
    fn open_read(&self, uri: &str) -> Result<Box<dyn Read>>;
    fn open_write(&self, uri: &str) -> Result<Box<dyn Write>>;
    fn list_directory(&self, uri: &str) -> Result<DirectoryListing>;
}

/// Select a transport for `uri` by scheme: `file` → `FileTransport`, `s3` →
/// unsupported, anything else → generic HTTP.
pub fn get_transport(uri: &str) -> Result<Box<dyn Transport>> {
    get_transport_with_config(uri, &MirrorConfig::default())
}

/// Same dispatch as `get_transport`, but the HTTP transport it builds
/// carries `config`'s `user_agent` and `http_timeout`.
pub fn get_transport_with_config(uri: &str, config: &MirrorConfig) -> Result<Box<dyn Transport>> {
    let parsed = url::Url::parse(uri).map_err(|_| Error::UriMismatch { uri: uri.to_string() })?;
    match parsed.scheme() {
        "file" => Ok(Box::new(FileTransport::new())),
        "s3" => Err(Error::Unsupported("s3 transport is not implemented".to_string())),
        _ => Ok(Box::new(HttpTransport::with_config(config))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_scheme_selects_file_transport() {
        let transport = get_transport("file:///tmp/repo").unwrap();
        assert!(transport.exists("file:///nonexistent/path").is_ok());
    }

    #[test]
    fn s3_scheme_is_unsupported() {
        let result = get_transport("s3://bucket/key");
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }

    #[test]
    fn http_scheme_selects_http_transport() {
        let transport = get_transport("https://example.org/repo").unwrap();
        assert!(matches!(
            transport.list_directory("https://example.org/repo/"),
            Err(Error::Unsupported(_))
        ));
    }
}
