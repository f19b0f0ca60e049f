//! Apache mod_autoindex transport: a generic HTTP transport whose
//! `list_directory` scrapes the `?F=0` autoindex listing instead of
//! failing with `Unsupported`. Grounded on
//! `examples/original_source/apt/transports/apache.py`.

use select::document::Document;
use select::predicate::{Descendant, Name};

use crate::config::MirrorConfig;
use crate::error::{Error, Result};

use super::http::HttpTransport;
use super::{DirectoryListing, Transport};

const AUTOINDEX_PREAMBLE: &str =
    "<!DOCTYPE HTML PUBLIC \"-//W3C//DTD HTML 3.2 Final//EN\">";

pub struct ApacheTransport {
    inner: HttpTransport,
}

impl Default for ApacheTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ApacheTransport {
    pub fn new() -> Self {
        ApacheTransport {
            inner: HttpTransport::new(),
        }
    }

    pub fn with_config(config: &MirrorConfig) -> Self {
        ApacheTransport {
            inner: HttpTransport::with_config(config),
        }
    }
}

impl Transport for ApacheTransport {
    fn exists(&self, uri: &str) -> Result<bool> {
        self.inner.exists(uri)
    }

    fn open_read(&self, uri: &str) -> Result<Box<dyn std::io::Read>> {
        self.inner.open_read(uri)
    }

    fn open_write(&self, uri: &str) -> Result<Box<dyn std::io::Write>> {
        self.inner.open_write(uri)
    }

    fn list_directory(&self, uri: &str) -> Result<DirectoryListing> {
        let parsed =
            url::Url::parse(uri).map_err(|_| Error::UriMismatch { uri: uri.to_string() })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::UriMismatch { uri: uri.to_string() });
        }

        let mut index_uri = uri.to_string();
        if !index_uri.ends_with('/') {
            index_uri.push('/');
        }
        index_uri.push_str("?F=0");

        let body = self.inner.fetch(&index_uri)?;
        let html = String::from_utf8_lossy(&body);

        if !html.trim_start().starts_with(AUTOINDEX_PREAMBLE) {
            return Err(Error::not_found(uri));
        }

        let document = Document::from(html.as_ref());
        let mut listing = DirectoryListing::default();

        // The listing lives inside a `<ul>`, one `<li><a>` per entry; the
        // first entry is the "parent directory" link and is skipped.
        for link in document.find(Descendant(Name("ul"), Name("a"))).skip(1) {
            let Some(href) = link.attr("href") else {
                continue;
            };
            if let Some(name) = href.strip_suffix('/') {
                listing.directories.push(name.to_string());
            } else {
                listing.files.push(href.to_string());
            }
        }

        Ok(listing)
    }
}
