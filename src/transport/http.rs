//! Generic HTTP transport. Grounded on
//! `examples/original_source/apt/transports/urllib.py`: `open_read` issues
//! a GET, `open_write`/`list_directory` are unsupported, and `exists` may
//! cache the most recent successful response so a following `open_read`
//! reuses it.

use std::io::{Cursor, Read, Write};
use std::sync::Mutex;

use log::info;

use crate::config::MirrorConfig;
use crate::error::{Error, Result};

use super::{DirectoryListing, Transport};

fn check_scheme(uri: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(uri).map_err(|_| Error::UriMismatch { uri: uri.to_string() })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(Error::UriMismatch { uri: uri.to_string() });
    }
    Ok(parsed)
}

struct CachedResponse {
    uri: String,
    body: Vec<u8>,
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
    last: Mutex<Option<CachedResponse>>,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        HttpTransport {
            client: reqwest::blocking::Client::new(),
            last: Mutex::new(None),
        }
    }

    /// Build a client carrying the configured `User-Agent` and request
    /// timeout rather than reqwest's bare defaults.
    pub fn with_config(config: &MirrorConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.http_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        HttpTransport {
            client,
            last: Mutex::new(None),
        }
    }

    pub(crate) fn fetch(&self, uri: &str) -> Result<Vec<u8>> {
        info!("GET {uri}");
        let response = self
            .client
            .get(uri)
            .send()
            .map_err(|_| Error::not_found(uri))?;
        if !response.status().is_success() {
            return Err(Error::not_found(uri));
        }
        Ok(response.bytes().map_err(Error::from)?.to_vec())
    }
}

impl Transport for HttpTransport {
    fn exists(&self, uri: &str) -> Result<bool> {
        check_scheme(uri)?;
        match self.fetch(uri) {
            Ok(body) => {
                *self.last.lock().unwrap() = Some(CachedResponse {
                    uri: uri.to_string(),
                    body,
                });
                Ok(true)
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn open_read(&self, uri: &str) -> Result<Box<dyn Read>> {
        check_scheme(uri)?;
        {
            let mut guard = self.last.lock().unwrap();
            if let Some(cached) = guard.as_ref() {
                if cached.uri == uri {
                    let body = guard.take().unwrap().body;
                    return Ok(Box::new(Cursor::new(body)));
                }
            }
        }
        let body = self.fetch(uri)?;
        Ok(Box::new(Cursor::new(body)))
    }

    fn open_write(&self, _uri: &str) -> Result<Box<dyn Write>> {
        Err(Error::Unsupported(
            "generic HTTP transport has no write support".to_string(),
        ))
    }

    fn list_directory(&self, _uri: &str) -> Result<DirectoryListing> {
        Err(Error::Unsupported(
            "generic HTTP transport cannot list directories".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_scheme() {
        let transport = HttpTransport::new();
        let result = transport.exists("file:///tmp/x");
        assert!(matches!(result, Err(Error::UriMismatch { .. })));
    }

    #[test]
    fn open_write_is_unsupported() {
        let transport = HttpTransport::new();
        let result = transport.open_write("https://example.org/x");
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }

    #[test]
    fn list_directory_is_unsupported() {
        let transport = HttpTransport::new();
        let result = transport.list_directory("https://example.org/x");
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }
}
