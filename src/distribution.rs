//! `Distribution`: a named grouping of components/architectures inside a
//! `Repository`, with lazily-resolved, cached release metadata. Grounded
//! on `examples/original_source/apt/repo/distribution.py`.

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, RwLock};

use crate::checksum;
use crate::error::{Error, Result};
use crate::package::Package;
use crate::release::ReleaseFile;
use crate::repository::{PackageList, Repository};
use crate::tagfile;

/// Per-distribution cache: resolved existence, release metadata, and
/// already-built package lists. Shared via `Arc` so a fresh `Distribution`
/// handle can be cheaply re-created on every `Repository::distribution`
/// call without losing memoization.
#[derive(Default)]
pub(crate) struct DistributionState {
    exists: Option<bool>,
    release: Option<ReleaseFile>,
    package_lists: HashMap<(String, String), PackageList>,
}

/// A handle onto one distribution's metadata and package lists. Cheap to
/// construct; the expensive state lives in the `Repository`-owned cache
/// this handle points at.
pub struct Distribution<'r> {
    repo: &'r Repository,
    name: String,
    cache: Arc<RwLock<DistributionState>>,
}

impl<'r> Distribution<'r> {
    pub(crate) fn new(repo: &'r Repository, name: String, cache: Arc<RwLock<DistributionState>>) -> Self {
        Distribution { repo, name, cache }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True iff Release-resolution succeeds and produces a parseable
    /// `ReleaseFile`; memoized for the life of the `Repository`.
    pub fn exists(&self) -> Result<bool> {
        let mut state = self.cache.write().unwrap();
        if let Some(exists) = state.exists {
            return Ok(exists);
        }

        match self.resolve_release(&mut state) {
            Ok(()) => {
                state.exists = Some(true);
                Ok(true)
            }
            Err(e) if e.is_not_found() => {
                state.exists = Some(false);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub fn components(&self) -> Result<Vec<String>> {
        if !self.exists()? {
            return Err(Error::NonExistent(self.name.clone()));
        }
        let state = self.cache.read().unwrap();
        Ok(state
            .release
            .as_ref()
            .expect("exists() true implies release is cached")
            .components())
    }

    pub fn architectures(&self) -> Result<Vec<String>> {
        if !self.exists()? {
            return Err(Error::NonExistent(self.name.clone()));
        }
        let state = self.cache.read().unwrap();
        Ok(state
            .release
            .as_ref()
            .expect("exists() true implies release is cached")
            .architectures())
    }

    /// Build (or return the memoized) `PackageList` for `component`/
    /// `architecture`. Downloads and parses the `Packages[.gz]` index the
    /// first time, registering every stanza with the owning `Repository`.
    pub fn package_list(&self, component: &str, architecture: &str) -> Result<PackageList> {
        let cache_key = (component.to_string(), architecture.to_string());

        if let Some(list) = self.cache.read().unwrap().package_lists.get(&cache_key) {
            return Ok(list.clone());
        }

        if !self.exists()? {
            let empty = PackageList::default();
            self.cache
                .write()
                .unwrap()
                .package_lists
                .insert(cache_key, empty.clone());
            return Ok(empty);
        }

        let gz_name = format!("{component}/binary-{architecture}/Packages.gz");
        let plain_name = format!("{component}/binary-{architecture}/Packages");

        let (filename, file_hash, gzipped) = {
            let state = self.cache.read().unwrap();
            let release = state.release.as_ref().expect("checked by exists() above");
            if let Some(fh) = release.files.get(&gz_name) {
                (gz_name, fh.clone(), true)
            } else if let Some(fh) = release.files.get(&plain_name) {
                (plain_name, fh.clone(), false)
            } else {
                return Err(Error::not_found(plain_name));
            }
        };

        let uri = self
            .repo
            .join_uri(&format!("dists/{}/{filename}", self.name))?;
        let stream = self.repo.transport().open_read(&uri)?;
        let decoder: Option<&checksum::Decoder> = if gzipped { Some(&checksum::gunzip) } else { None };
        let index_bytes = checksum::download(stream, &file_hash, decoder)?;

        let mut list = PackageList::default();
        let stanzas: Vec<Package> = tagfile::parse(&index_bytes)?;
        for stanza in stanzas {
            let source_name = stanza.filename().unwrap_or_else(|| filename.clone());
            let imported = self.repo.add_package(stanza, &source_name)?;
            if let Some(sha256) = imported.sha256() {
                list.insert(sha256);
            }
        }

        self.cache
            .write()
            .unwrap()
            .package_lists
            .insert(cache_key, list.clone());
        Ok(list)
    }

    /// Implements the InRelease→Release fallback protocol. A `NotFound` on
    /// `InRelease` is swallowed so resolution can fall through; every other
    /// error (including a failed signature) is fatal and left uncached.
    fn resolve_release(&self, state: &mut DistributionState) -> Result<()> {
        if state.release.is_some() {
            return Ok(());
        }

        let mut release_bytes: Option<Vec<u8>> = None;

        if let Some(verifier) = self.repo.verifier() {
            let inrelease_uri = self.repo.join_uri(&format!("dists/{}/InRelease", self.name))?;
            match self.repo.transport().open_read(&inrelease_uri) {
                Ok(mut stream) => {
                    let mut signed = Vec::new();
                    stream.read_to_end(&mut signed)?;
                    release_bytes = Some(verifier.inline_verify(&signed)?.data);
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }

        let release_bytes = match release_bytes {
            Some(bytes) => bytes,
            None => {
                let release_uri = self.repo.join_uri(&format!("dists/{}/Release", self.name))?;
                let mut stream = self.repo.transport().open_read(&release_uri)?;
                let mut data = Vec::new();
                stream.read_to_end(&mut data)?;

                if let Some(verifier) = self.repo.verifier() {
                    let signature_uri =
                        self.repo.join_uri(&format!("dists/{}/Release.gpg", self.name))?;
                    let mut signature_stream = self.repo.transport().open_read(&signature_uri)?;
                    let mut signature = Vec::new();
                    signature_stream.read_to_end(&mut signature)?;
                    verifier.detached_verify(&data, &signature)?;
                }

                data
            }
        };

        let mut parsed: Vec<ReleaseFile> = tagfile::parse(&release_bytes)?;
        if parsed.is_empty() {
            return Err(Error::InvalidTagFile("Release file has no stanza".to_string()));
        }
        state.release = Some(parsed.remove(0));
        Ok(())
    }
}
