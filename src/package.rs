//! `Package` — a `TagBlock` specialization whose `Filename`/`MD5Sum`/`SHA1`/
//! `SHA256`/`SHA512` fields project through to an embedded `FileHash`
//! describing the package's `.deb` blob. Grounded on
//! `examples/original_source/apt/repo/package.py`.

use crate::filehash::FileHash;
use crate::tagfile::{SetField, TagBlock};

const MAGIC_FIELDS: [&str; 5] = ["Filename", "MD5Sum", "SHA1", "SHA256", "SHA512"];

/// A control stanza for one binary package, with its blob location and
/// checksums projected through `hashes()` rather than living in the plain
/// field dictionary.
#[derive(Clone, Debug, Default)]
pub struct Package {
    block: TagBlock,
    hashes: FileHash,
}

impl Package {
    pub fn new() -> Self {
        let mut block = TagBlock::new();
        for name in MAGIC_FIELDS {
            block.register_magic(name);
        }
        Package {
            block,
            hashes: FileHash::default(),
        }
    }

    /// Build a `Package` from an already-parsed plain `TagBlock`, the way
    /// `Repository::add_package` wraps a stanza read from a `Packages` file.
    pub fn from_block(block: &TagBlock) -> Self {
        let mut package = Package::new();
        for key in block.insertion_order_keys() {
            package.set(key, block.get(key).unwrap());
        }
        package
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if key == "Filename" {
            if self.hashes.filename.is_empty() {
                None
            } else {
                Some(self.hashes.filename.clone())
            }
        } else if MAGIC_FIELDS.contains(&key) {
            self.hashes.get(key).map(String::from)
        } else {
            self.block.get(key).map(String::from)
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.set_field(key, value.into());
    }

    pub fn hashes(&self) -> &FileHash {
        &self.hashes
    }

    pub fn filename(&self) -> Option<String> {
        self.get("Filename")
    }

    pub fn sha256(&self) -> Option<String> {
        self.get("SHA256")
    }

    pub fn name(&self) -> Option<String> {
        self.get("Package")
    }

    pub fn version(&self) -> Option<String> {
        self.get("Version")
    }

    pub fn render(&self) -> String {
        self.block.render(|key| {
            if key == "Filename" {
                self.get("Filename")
            } else {
                self.hashes.get(key).map(String::from)
            }
        })
    }
}

impl SetField for Package {
    fn set_field(&mut self, key: &str, value: String) {
        if !MAGIC_FIELDS.contains(&key) {
            self.block.set(key, value);
            return;
        }
        if key == "Filename" {
            self.hashes.filename = value;
        } else {
            self.hashes.set(key, value);
        }
    }
}
