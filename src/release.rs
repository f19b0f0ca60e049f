//! `ReleaseFile` — a `TagBlock` specialization whose four checksum fields
//! project through to a `filename -> FileHash` table. Grounded on
//! `examples/original_source/apt/tags/releasefile.py`.

use std::collections::HashMap;

use crate::filehash::FileHash;
use crate::tagfile::{SetField, TagBlock};

const MAGIC_FIELDS: [&str; 4] = ["MD5Sum", "SHA1", "SHA256", "SHA512"];

#[derive(Clone, Debug, Default)]
pub struct ReleaseFile {
    block: TagBlock,
    pub files: HashMap<String, FileHash>,
}

impl ReleaseFile {
    pub fn new() -> Self {
        let mut block = TagBlock::new();
        for name in MAGIC_FIELDS {
            block.register_magic(name);
        }
        ReleaseFile {
            block,
            files: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if MAGIC_FIELDS.contains(&key) {
            self.magic_value(key)
        } else {
            self.block.get(key).map(|s| s.to_string())
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.set_field(key, value.into());
    }

    fn magic_value(&self, key: &str) -> Option<String> {
        let mut entries: Vec<&FileHash> = self
            .files
            .values()
            .filter(|fh| fh.get(key).is_some())
            .collect();
        if entries.is_empty() {
            return None;
        }
        entries.sort_by(|a, b| a.filename.cmp(&b.filename));
        let lines: Vec<String> = entries
            .into_iter()
            .map(|fh| {
                format!(
                    "{} {:>12} {}",
                    fh.get(key).unwrap(),
                    fh.size.unwrap_or_default(),
                    fh.filename
                )
            })
            .collect();
        Some(lines.join("\n"))
    }

    /// The whitespace-split value of the `Components` field.
    pub fn components(&self) -> Vec<String> {
        self.get("Components")
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }

    /// The whitespace-split value of the `Architectures` field.
    pub fn architectures(&self) -> Vec<String> {
        self.get("Architectures")
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }

    pub fn render(&self) -> String {
        self.block.render(|key| self.magic_value(key))
    }
}

impl SetField for ReleaseFile {
    fn set_field(&mut self, key: &str, value: String) {
        if !MAGIC_FIELDS.contains(&key) {
            self.block.set(key, value);
            return;
        }

        for line in value.split('\n') {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != 3 {
                continue;
            }
            let [checksum, size_s, filename] = [tokens[0], tokens[1], tokens[2]];
            let Ok(size) = size_s.parse::<u64>() else {
                continue;
            };
            let entry = self
                .files
                .entry(filename.to_string())
                .or_insert_with(|| FileHash::new(filename));
            if entry.size.is_none() {
                entry.size = Some(size);
            }
            entry.set(key, checksum);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagfile;

    #[test]
    fn checksum_table_round_trips() {
        let mut release = ReleaseFile::new();
        release.set_field(
            "SHA256",
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa  123 main/Packages\n\
             bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb 456 main/Release"
                .to_string(),
        );

        assert_eq!(release.files["main/Packages"].size, Some(123));
        assert_eq!(release.files["main/Release"].size, Some(456));

        let emitted = release.get("SHA256").unwrap();
        let lines: Vec<&str> = emitted.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("main/Packages"));
        assert!(lines[1].ends_with("main/Release"));
        assert!(lines[0].contains("          123"));
    }

    #[test]
    fn magic_field_absent_when_unpopulated() {
        let release = ReleaseFile::new();
        assert_eq!(release.get("SHA256"), None);
    }

    #[test]
    fn components_and_architectures_split_on_whitespace() {
        let mut release = ReleaseFile::new();
        release.set("Components", "main contrib non-free");
        release.set("Architectures", "amd64 arm64");
        assert_eq!(release.components(), vec!["main", "contrib", "non-free"]);
        assert_eq!(release.architectures(), vec!["amd64", "arm64"]);
    }

    #[test]
    fn parses_as_a_single_stanza() {
        let input = b"Origin: Debian\nComponents: main\nArchitectures: amd64\n\
SHA256:\n aa 1 main/binary-amd64/Packages\n\n";
        let releases: Vec<ReleaseFile> = tagfile::parse(input).unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].get("Origin"), Some("Debian".to_string()));
        assert_eq!(
            releases[0].files["main/binary-amd64/Packages"].size,
            Some(1)
        );
    }
}
