//! `FileHash` — size plus whichever checksums are known for one indexed
//! file. Grounded on `examples/original_source/apt/tags/filehash.py`: hash
//! slot access is case-insensitive and the `Sum` suffix is stripped, so
//! `MD5Sum`, `md5sum` and `md5` all address the same slot.

/// The priority order used when picking a hash to verify a download
/// (spec.md §4.E): prefer the strongest, fall back to the weakest.
pub const HASH_PRIORITY: [&str; 4] = ["sha256", "sha512", "sha1", "md5"];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileHash {
    pub filename: String,
    pub size: Option<u64>,
    md5: Option<String>,
    sha1: Option<String>,
    sha256: Option<String>,
    sha512: Option<String>,
}

impl FileHash {
    pub fn new(filename: impl Into<String>) -> Self {
        FileHash {
            filename: filename.into(),
            ..Default::default()
        }
    }

    fn normalize(key: &str) -> String {
        key.to_ascii_lowercase().replace("sum", "")
    }

    /// Read a hash slot by any of its case/`Sum`-suffix aliases.
    pub fn get(&self, key: &str) -> Option<&str> {
        match Self::normalize(key).as_str() {
            "md5" => self.md5.as_deref(),
            "sha1" => self.sha1.as_deref(),
            "sha256" => self.sha256.as_deref(),
            "sha512" => self.sha512.as_deref(),
            _ => None,
        }
    }

    /// Write a hash slot by any of its case/`Sum`-suffix aliases.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match Self::normalize(key).as_str() {
            "md5" => self.md5 = Some(value),
            "sha1" => self.sha1 = Some(value),
            "sha256" => self.sha256 = Some(value),
            "sha512" => self.sha512 = Some(value),
            _ => {}
        }
    }

    /// The strongest populated hash, as `(algorithm, hex digest)`, in the
    /// priority order spec.md §4.E pins.
    pub fn best_hash(&self) -> Option<(&'static str, &str)> {
        HASH_PRIORITY.iter().find_map(|alg| {
            self.get(alg).map(|digest| {
                let alg: &'static str = match *alg {
                    "md5" => "md5",
                    "sha1" => "sha1",
                    "sha256" => "sha256",
                    "sha512" => "sha512",
                    _ => unreachable!(),
                };
                (alg, digest)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_address_the_same_slot() {
        let mut fh = FileHash::new("main/Packages");
        fh.set("MD5Sum", "deadbeef");
        assert_eq!(fh.get("md5sum"), Some("deadbeef"));
        assert_eq!(fh.get("MD5"), Some("deadbeef"));
        assert_eq!(fh.get("md5"), Some("deadbeef"));
    }

    #[test]
    fn best_hash_prefers_sha256() {
        let mut fh = FileHash::new("x");
        fh.set("MD5Sum", "aa");
        fh.set("SHA256", "bb");
        assert_eq!(fh.best_hash(), Some(("sha256", "bb")));
    }

    #[test]
    fn best_hash_falls_back_through_priority() {
        let mut fh = FileHash::new("x");
        fh.set("SHA1", "cc");
        assert_eq!(fh.best_hash(), Some(("sha1", "cc")));
    }

    #[test]
    fn best_hash_is_none_when_unpopulated() {
        let fh = FileHash::new("x");
        assert_eq!(fh.best_hash(), None);
    }
}
