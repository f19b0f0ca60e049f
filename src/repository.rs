//! `Repository`: the pool of content-addressed `.deb` blobs plus the set of
//! known distributions. Grounded on
//! `examples/original_source/apt/repo/repository.py` and
//! `abstractrepoobject.py` (the `_download_file`/`_write_file` helpers,
//! generalized into `checksum::download` and `Transport::open_write`).

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, RwLock};

use faster_hex::hex_string;
use indexmap::IndexSet;
use log::info;
use sha2::{Digest, Sha256};

use crate::checksum;
use crate::config::MirrorConfig;
use crate::deb;
use crate::distribution::{Distribution, DistributionState};
use crate::error::{Error, Result};
use crate::package::Package;
use crate::pgp::Verifier;
use crate::transport::{self, Transport};

/// A deduplicated, ordered set of pool SHA256 hashes: the result of reading
/// one `Packages` index. Order matches the order stanzas were read, and
/// membership is deduplicated the way the reference implementation's
/// backing `set` is, but preserved in insertion order for reproducible
/// re-serialization.
#[derive(Clone, Debug, Default)]
pub struct PackageList {
    hashes: IndexSet<String>,
}

impl PackageList {
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn hashes(&self) -> impl Iterator<Item = &str> {
        self.hashes.iter().map(|s| s.as_str())
    }

    pub(crate) fn insert(&mut self, sha256: String) {
        self.hashes.insert(sha256);
    }
}

#[derive(Default)]
struct Pool {
    by_sha256: HashMap<String, Package>,
    by_name: HashMap<String, HashMap<String, String>>,
}

pub struct Repository {
    base_uri: String,
    transport: Box<dyn Transport>,
    verifier: Option<Arc<dyn Verifier>>,
    pool: RwLock<Pool>,
    distributions: RwLock<HashMap<String, Arc<RwLock<DistributionState>>>>,
}

impl Repository {
    pub fn new(base_uri: &str) -> Result<Self> {
        Self::with_verifier(base_uri, None)
    }

    pub fn with_verifier(base_uri: &str, verifier: Option<Arc<dyn Verifier>>) -> Result<Self> {
        Self::with_config(base_uri, MirrorConfig::default(), verifier)
    }

    /// Build a `Repository` from a `MirrorConfig`, plugging its
    /// `user_agent`/`http_timeout` into the HTTP transport and enforcing
    /// `require_signature` at construction time: a mirror that demands
    /// signed metadata but is given no `Verifier` can never satisfy it, so
    /// this fails fast rather than failing later on the first `InRelease`
    /// fetch.
    pub fn with_config(
        base_uri: &str,
        config: MirrorConfig,
        verifier: Option<Arc<dyn Verifier>>,
    ) -> Result<Self> {
        if config.require_signature && verifier.is_none() {
            return Err(Error::SignatureFailure(
                "require_signature is set but no verifier was configured".to_string(),
            ));
        }

        let mut normalized = base_uri.to_string();
        if normalized.starts_with('/') {
            normalized = format!("file://{normalized}");
        }
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let transport = transport::get_transport_with_config(&normalized, &config)?;

        Ok(Repository {
            base_uri: normalized,
            transport,
            verifier,
            pool: RwLock::new(Pool::default()),
            distributions: RwLock::new(HashMap::new()),
        })
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub(crate) fn verifier(&self) -> Option<&dyn Verifier> {
        self.verifier.as_deref()
    }

    pub(crate) fn join_uri(&self, relative: &str) -> Result<String> {
        join_uri(&self.base_uri, relative)
    }

    /// Return the cached `Distribution` handle for `name`, creating its
    /// (empty, unresolved) cache slot on first access. Creation does not
    /// verify the distribution exists.
    pub fn distribution(&self, name: &str) -> Distribution<'_> {
        let cache = {
            let mut map = self.distributions.write().unwrap();
            map.entry(name.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(DistributionState::default())))
                .clone()
        };
        Distribution::new(self, name.to_string(), cache)
    }

    /// Names of every distribution accessed so far via `distribution()` or
    /// `scan_distributions()`.
    pub fn distributions(&self) -> Vec<String> {
        self.distributions.read().unwrap().keys().cloned().collect()
    }

    /// Attempt to enumerate `dists/` via the transport. `NotFound` is
    /// treated as "repository is blank" (`Ok(true)`, no distributions
    /// registered); `Unsupported` reports `Ok(false)` so the caller can
    /// retry with a different transport.
    pub fn scan_distributions(&self) -> Result<bool> {
        let dists_uri = self.join_uri("dists/")?;
        match self.transport.list_directory(&dists_uri) {
            Ok(listing) => {
                let mut map = self.distributions.write().unwrap();
                for name in listing.directories {
                    map.entry(name)
                        .or_insert_with(|| Arc::new(RwLock::new(DistributionState::default())));
                }
                Ok(true)
            }
            Err(Error::Unsupported(_)) => Ok(false),
            Err(e) if e.is_not_found() => Ok(true),
            Err(e) => Err(e),
        }
    }

    pub fn package_by_hash(&self, sha256: &str) -> Option<Package> {
        self.pool.read().unwrap().by_sha256.get(sha256).cloned()
    }

    /// Validate and register a parsed index stanza in the pool. Idempotent:
    /// re-registering an already-known SHA256 returns the existing entry.
    pub(crate) fn add_package(&self, stanza: Package, source_name: &str) -> Result<Package> {
        let missing = |field: &str| Error::MissingControlField {
            path: source_name.to_string(),
            field: field.to_string(),
        };
        let sha256 = stanza.sha256().ok_or_else(|| missing("SHA256"))?;
        if stanza.filename().is_none() {
            return Err(missing("Filename"));
        }
        let name = stanza.name().ok_or_else(|| missing("Package"))?;
        let version = stanza.version().ok_or_else(|| missing("Version"))?;

        let mut pool = self.pool.write().unwrap();
        if let Some(existing) = pool.by_sha256.get(&sha256) {
            return Ok(existing.clone());
        }

        info!("pooling {name} {version} ({sha256}) from {source_name}");
        pool.by_name.entry(name).or_default().insert(version, sha256.clone());
        pool.by_sha256.insert(sha256, stanza.clone());
        Ok(stanza)
    }

    /// Adopt a package from another repository: reuse it if already
    /// pooled, otherwise download its `.deb` via the source repository's
    /// transport and pool it here.
    pub fn adopt_from(&self, source: &Repository, package: &Package) -> Result<Package> {
        if let Some(sha256) = package.sha256() {
            if let Some(existing) = self.package_by_hash(&sha256) {
                return Ok(existing);
            }
        }

        let filename = package
            .filename()
            .ok_or_else(|| Error::MissingControlField {
                path: "adopt".to_string(),
                field: "Filename".to_string(),
            })?;
        info!("adopting {filename} from {}", source.base_uri());
        let uri = source.join_uri(&filename)?;
        let stream = source.transport().open_read(&uri)?;
        let deb_data = checksum::download(stream, package.hashes(), None)?;
        let contents = deb::extract_contents_list(std::io::Cursor::new(deb_data.clone())).ok();

        self.finish_adopt(package.clone(), deb_data, contents)
    }

    /// Adopt raw `.deb` bytes: parse the control stanza and file manifest,
    /// attach the computed SHA256, and pool it.
    pub fn adopt_bytes(&self, data: Vec<u8>) -> Result<Package> {
        let mut hasher = Sha256::new();
        hasher.update(&data);
        let sha256 = hex_string(&hasher.finalize());

        if let Some(existing) = self.package_by_hash(&sha256) {
            return Ok(existing);
        }

        let control = deb::extract_control_file(std::io::Cursor::new(data.clone()))?;
        let contents = deb::extract_contents_list(std::io::Cursor::new(data.clone())).ok();

        let mut package = Package::from_block(&control);
        package.set("SHA256", sha256);

        self.finish_adopt(package, data, contents)
    }

    fn finish_adopt(
        &self,
        mut package: Package,
        deb_data: Vec<u8>,
        contents: Option<Vec<String>>,
    ) -> Result<Package> {
        let missing = |field: &str| Error::MissingControlField {
            path: "adopt".to_string(),
            field: field.to_string(),
        };
        let name = package.name().ok_or_else(|| missing("Package"))?;
        let version = package.version().ok_or_else(|| missing("Version"))?;
        let arch = package.get("Architecture").ok_or_else(|| missing("Architecture"))?;
        let section = package.get("Section");

        let first = name.chars().next().unwrap_or('_');
        let prefix = match section.as_deref() {
            Some("libs") | Some("oldlibs") => format!("lib{first}"),
            _ => first.to_string(),
        };
        let relative = format!("pool/{prefix}/{name}/{name}_{version}_{arch}.deb");

        {
            let mut sink = self.transport.open_write(&self.join_uri(&relative)?)?;
            sink.write_all(&deb_data)?;
        }
        package.set("Filename", relative.clone());

        {
            let mut sink = self
                .transport
                .open_write(&self.join_uri(&format!("{relative}.dat"))?)?;
            sink.write_all(package.render().as_bytes())?;
        }

        if let Some(contents) = &contents {
            let mut sink = self
                .transport
                .open_write(&self.join_uri(&format!("{relative}.contents"))?)?;
            sink.write_all(contents.join("\n").as_bytes())?;
        }

        self.add_package(package, &relative)
    }
}

pub(crate) fn join_uri(base: &str, relative: &str) -> Result<String> {
    let base_url = url::Url::parse(base).map_err(|_| Error::UriMismatch { uri: base.to_string() })?;
    let joined = base_url
        .join(relative)
        .map_err(|_| Error::UriMismatch { uri: relative.to_string() })?;
    Ok(joined.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_package(sha256: &str) -> Package {
        let mut package = Package::new();
        package.set("Package", "zsync");
        package.set("Version", "0.6.2-1");
        package.set("Filename", "pool/z/zsync/zsync_0.6.2-1_amd64.deb");
        package.set("SHA256", sha256);
        package
    }

    #[test]
    fn normalizes_leading_slash_and_trailing_slash() {
        let repo = Repository::new("/srv/apt").unwrap();
        assert_eq!(repo.base_uri(), "file:///srv/apt/");
    }

    #[test]
    fn add_package_is_idempotent_by_sha256() {
        let repo = Repository::new("/srv/apt").unwrap();
        let first = repo.add_package(sample_package("deadbeef"), "index").unwrap();
        let second = repo.add_package(sample_package("deadbeef"), "index").unwrap();
        assert_eq!(first.filename(), second.filename());
        assert_eq!(repo.package_by_hash("deadbeef").unwrap().name(), Some("zsync".to_string()));
    }

    #[test]
    fn add_package_rejects_missing_fields() {
        let repo = Repository::new("/srv/apt").unwrap();
        let mut package = Package::new();
        package.set("Package", "zsync");
        let result = repo.add_package(package, "index");
        assert!(matches!(result, Err(Error::MissingControlField { .. })));
    }

    #[test]
    fn adopt_bytes_pools_once_per_sha256() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::new(dir.path().to_str().unwrap()).unwrap();

        let control_tar = build_tar(&[("./control", b"Package: zsync\nVersion: 1\nArchitecture: amd64\n")]);
        let data_tar = build_tar(&[("./usr/bin/zsync", b"binary")]);
        let deb_bytes = build_deb(&control_tar, &data_tar);

        let first = repo.adopt_bytes(deb_bytes.clone()).unwrap();
        let second = repo.adopt_bytes(deb_bytes).unwrap();
        assert_eq!(first.sha256(), second.sha256());
        assert_eq!(first.name(), Some("zsync".to_string()));
    }

    fn ar_record(name: &str, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut header = vec![b' '; 60];
        header[..name.len()].copy_from_slice(name.as_bytes());
        header[16] = b'0';
        header[28] = b'0';
        header[34] = b'0';
        let mode = b"100644";
        header[40..40 + mode.len()].copy_from_slice(mode);
        let size = body.len().to_string();
        header[48..48 + size.len()].copy_from_slice(size.as_bytes());
        header[58] = 0x60;
        header[59] = 0x0A;
        out.extend_from_slice(&header);
        out.extend_from_slice(body);
        if body.len() % 2 != 0 {
            out.push(b'\n');
        }
        out
    }

    fn build_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_path(path).unwrap();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn build_deb(control_tar: &[u8], data_tar: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"!<arch>\n");
        out.extend(ar_record("debian-binary", b"2.0\n"));
        out.extend(ar_record("control.tar", control_tar));
        out.extend(ar_record("data.tar", data_tar));
        out
    }
}
