//! Local filesystem transport (`file://`). Grounded on
//! `examples/original_source/apt/transports/filesytem.py`.

use std::fs::{self, File};
use std::io::{Read, Write};

use log::info;

use crate::error::{Error, Result};

use super::{DirectoryListing, Transport};

#[derive(Default)]
pub struct FileTransport;

impl FileTransport {
    pub fn new() -> Self {
        FileTransport
    }

    fn path_of(uri: &str) -> Result<std::path::PathBuf> {
        let parsed = url::Url::parse(uri).map_err(|_| Error::UriMismatch { uri: uri.to_string() })?;
        if parsed.scheme() != "file" {
            return Err(Error::UriMismatch { uri: uri.to_string() });
        }
        parsed
            .to_file_path()
            .map_err(|_| Error::UriMismatch { uri: uri.to_string() })
    }
}

impl Transport for FileTransport {
    fn exists(&self, uri: &str) -> Result<bool> {
        let path = Self::path_of(uri)?;
        Ok(path.exists())
    }

    fn open_read(&self, uri: &str) -> Result<Box<dyn Read>> {
        let path = Self::path_of(uri)?;
        info!("opening {}", path.display());
        let file = File::open(&path).map_err(|_| Error::not_found(path))?;
        Ok(Box::new(file))
    }

    fn open_write(&self, uri: &str) -> Result<Box<dyn Write>> {
        let path = Self::path_of(uri)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        Ok(Box::new(file))
    }

    fn list_directory(&self, uri: &str) -> Result<DirectoryListing> {
        let path = Self::path_of(uri)?;
        if !path.exists() {
            return Err(Error::not_found(path));
        }

        let mut listing = DirectoryListing::default();
        for entry in fs::read_dir(&path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            // `metadata()` follows symlinks; a broken symlink is skipped
            // rather than misclassified.
            let Ok(metadata) = entry.path().metadata() else {
                continue;
            };
            if metadata.is_dir() {
                listing.directories.push(name);
            } else if metadata.is_file() {
                listing.files.push(name);
            }
        }
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exists_reports_false_for_missing_file() {
        let transport = FileTransport::new();
        assert_eq!(transport.exists("file:///no/such/path").unwrap(), false);
    }

    #[test]
    fn round_trips_through_open_write_and_open_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/Release");
        let uri = url::Url::from_file_path(&path).unwrap().to_string();

        let transport = FileTransport::new();
        {
            let mut sink = transport.open_write(&uri).unwrap();
            sink.write_all(b"hello").unwrap();
        }

        assert!(transport.exists(&uri).unwrap());
        let mut stream = transport.open_read(&uri).unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"hello");
    }

    #[test]
    fn open_read_missing_file_is_not_found() {
        let transport = FileTransport::new();
        let result = transport.open_read("file:///no/such/path");
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn rejects_non_file_scheme() {
        let transport = FileTransport::new();
        let result = transport.exists("http://example.org/x");
        assert!(matches!(result, Err(Error::UriMismatch { .. })));
    }

    #[test]
    fn list_directory_splits_files_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("leaf"), b"x").unwrap();

        let uri = url::Url::from_directory_path(dir.path()).unwrap().to_string();
        let transport = FileTransport::new();
        let listing = transport.list_directory(&uri).unwrap();

        assert_eq!(listing.directories, vec!["sub".to_string()]);
        assert_eq!(listing.files, vec!["leaf".to_string()]);
    }
}
