//! The DPKG "control" tag-file model: an ordered, RFC822-like stanza with
//! "magic" fields that specializations (see `release` and `package`) project
//! through a structured side-table.
//!
//! Grounded on `examples/original_source/apt/tags/tagblock.py` and
//! `tags/__init__.py` (the `read_tag_file` generator), generalizing the
//! header-splitting combinators already present in the teacher's
//! `src/parser.rs`.

mod lex;

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// A single RFC822-style stanza: an ordered `name -> value` mapping plus the
/// bookkeeping needed to reproduce field order and intercept "magic" field
/// writes.
#[derive(Clone, Debug, Default)]
pub struct TagBlock {
    dict: IndexMap<String, String>,
    order_first: Vec<String>,
    order_last: Vec<String>,
    magic: Vec<String>,
}

impl TagBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a block with a fixed emission order: `first` fields always
    /// precede the free-form dictionary, `last` fields always follow it.
    pub fn with_order(first: &[&str], last: &[&str]) -> Self {
        TagBlock {
            order_first: first.iter().map(|s| s.to_string()).collect(),
            order_last: last.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Register a field name as "magic" — writes to it must go through a
    /// specialization's projection instead of the plain dictionary.
    pub fn register_magic(&mut self, name: &str) {
        self.magic.push(name.to_string());
    }

    pub fn is_magic(&self, key: &str) -> bool {
        self.magic.iter().any(|m| m == key)
    }

    pub fn magic_names(&self) -> &[String] {
        &self.magic
    }

    pub fn contains(&self, key: &str) -> bool {
        self.dict.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.dict.get(key).map(|s| s.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.dict.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    /// Plain-dictionary keys, in the order they should be emitted when they
    /// are neither first- nor last-ordered: the order they were first seen.
    pub fn insertion_order_keys(&self) -> impl Iterator<Item = &str> {
        self.dict.keys().map(|s| s.as_str())
    }

    /// Set a non-magic field. Writing to a registered magic field directly
    /// on the base block is a programmer error: the projection must happen
    /// in the specialization's `SetField` impl instead.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        assert!(
            !self.is_magic(key),
            "set on magic field {key} was not intercepted by its specialization"
        );
        if !self.order_first.contains(&key.to_string()) && !self.order_last.contains(&key.to_string())
        {
            self.order_first.push(key.to_string());
        }
        self.dict.insert(key.to_string(), value.into());
    }

    /// Render this block as text, asking `magic_value` for the current
    /// projection of each registered magic field.
    pub fn render(&self, magic_value: impl Fn(&str) -> Option<String>) -> String {
        let mut lines = Vec::new();
        let mut done: std::collections::HashSet<&str> = std::collections::HashSet::new();

        for key in &self.order_first {
            if done.contains(key.as_str()) {
                continue;
            }
            if let Some(value) = self.dict.get(key) {
                lines.push(format_field(key, value));
                done.insert(key);
            }
        }
        for key in self.dict.keys() {
            if done.contains(key.as_str()) || self.order_last.contains(key) {
                continue;
            }
            lines.push(format_field(key, &self.dict[key]));
            done.insert(key);
        }
        for key in &self.magic {
            if done.contains(key.as_str()) {
                continue;
            }
            if let Some(value) = magic_value(key) {
                lines.push(format_field(key, &value));
            }
            done.insert(key);
        }
        for key in &self.order_last {
            if done.contains(key.as_str()) {
                continue;
            }
            if let Some(value) = self.dict.get(key) {
                lines.push(format_field(key, value));
                done.insert(key);
            }
        }

        lines.join("\n")
    }
}

fn format_field(key: &str, value: &str) -> String {
    if value.contains('\n') {
        let continued = value
            .split('\n')
            .map(|line| if line.is_empty() { "." } else { line })
            .collect::<Vec<_>>()
            .join("\n ");
        format!("{key}: {continued}")
    } else {
        format!("{key}: {value}")
    }
}

/// Implemented by every stanza type (plain `TagBlock`, `ReleaseFile`,
/// `Package`) so the parser can apply raw `(key, value)` pairs without
/// knowing which fields are magic.
pub trait SetField {
    fn set_field(&mut self, key: &str, value: String);
}

impl SetField for TagBlock {
    fn set_field(&mut self, key: &str, value: String) {
        self.set(key, value);
    }
}

/// Iterates raw, ordered `(key, value)` pairs for each stanza in a tag file,
/// joining continuation lines and honoring the `.`-as-empty-paragraph
/// convention. One item per blank-line-delimited stanza; a trailing stanza
/// with no terminating blank line is still yielded.
pub struct TagBlockReader<'a> {
    lines: std::str::Lines<'a>,
}

impl<'a> TagBlockReader<'a> {
    pub fn new(input: &'a str) -> Self {
        TagBlockReader {
            lines: input.lines(),
        }
    }
}

impl<'a> Iterator for TagBlockReader<'a> {
    type Item = Result<Vec<(String, String)>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut fields: Vec<(String, String)> = Vec::new();
        let mut current_key: Option<String> = None;

        loop {
            match self.lines.next() {
                None => {
                    return if fields.is_empty() {
                        None
                    } else {
                        Some(Ok(fields))
                    };
                }
                Some(raw) => {
                    let line = raw.trim_end();
                    if line.is_empty() {
                        if fields.is_empty() {
                            continue;
                        }
                        return Some(Ok(fields));
                    }

                    let mut chars = line.chars();
                    let first = chars.next().unwrap();
                    if first == ' ' || first == '\t' {
                        let cont = chars.as_str();
                        let cont = if cont == "." { "" } else { cont };
                        if let Some(key) = &current_key {
                            if let Some(entry) =
                                fields.iter_mut().rev().find(|(k, _)| k == key)
                            {
                                entry.1.push('\n');
                                entry.1.push_str(cont);
                            }
                        }
                        // A continuation line before any header is tolerated
                        // and silently discarded.
                    } else {
                        match lex::split_header(line) {
                            Ok((key, value)) => {
                                current_key = Some(key.clone());
                                fields.push((key, value));
                            }
                            Err(e) => return Some(Err(e)),
                        }
                    }
                }
            }
        }
    }
}

/// Decode `input` as strict UTF-8 and build one `T` per stanza by replaying
/// its raw fields through `SetField::set_field`, in order.
pub fn parse<T: Default + SetField>(input: &[u8]) -> Result<Vec<T>> {
    let text = std::str::from_utf8(input)
        .map_err(|_| Error::InvalidTagFile("input is not valid UTF-8".to_string()))?;

    let mut out = Vec::new();
    for stanza in TagBlockReader::new(text) {
        let fields = stanza?;
        let mut block = T::default();
        for (key, value) in fields {
            block.set_field(&key, value);
        }
        out.push(block);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_stanza_with_continuation() {
        let input = b"Package: foo\nVersion: 1.0\nDepends: a,\n b\n\n";
        let blocks: Vec<TagBlock> = parse(input).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].get("Package"), Some("foo"));
        assert_eq!(blocks[0].get("Version"), Some("1.0"));
        assert_eq!(blocks[0].get("Depends"), Some("a,\nb"));
    }

    #[test]
    fn tolerates_missing_trailing_blank_line() {
        let input = b"Package: foo\nVersion: 1.0";
        let blocks: Vec<TagBlock> = parse(input).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].get("Version"), Some("1.0"));
    }

    #[test]
    fn empty_input_yields_no_stanzas() {
        let blocks: Vec<TagBlock> = parse(b"").unwrap();
        assert!(blocks.is_empty());
    }

    #[test]
    fn discards_leading_continuation_line() {
        let input = b" stray continuation\nPackage: foo\n\n";
        let blocks: Vec<TagBlock> = parse(input).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].get("Package"), Some("foo"));
    }

    #[test]
    fn malformed_header_is_fatal() {
        let input = b"this has no colon\n\n";
        let result: Result<Vec<TagBlock>> = parse(input);
        assert!(result.is_err());
    }

    #[test]
    fn round_trips_plain_fields() {
        let mut block = TagBlock::new();
        block.set("Package", "foo");
        block.set("Version", "1.0");
        let text = block.render(|_| None);
        assert_eq!(text, "Package: foo\nVersion: 1.0");

        let reparsed: Vec<TagBlock> = parse(format!("{text}\n\n").as_bytes()).unwrap();
        assert_eq!(reparsed[0].get("Package"), Some("foo"));
        assert_eq!(reparsed[0].get("Version"), Some("1.0"));
    }

    #[test]
    fn empty_paragraph_round_trips_through_dot() {
        let mut block = TagBlock::new();
        block.set("Description", "first\n\nthird");
        let text = block.render(|_| None);
        assert_eq!(text, "Description: first\n .\n third");

        let reparsed: Vec<TagBlock> = parse(format!("{text}\n\n").as_bytes()).unwrap();
        assert_eq!(reparsed[0].get("Description"), Some("first\n\nthird"));
    }

    #[test]
    #[should_panic]
    fn writing_a_magic_field_directly_panics() {
        let mut block = TagBlock::new();
        block.register_magic("MD5Sum");
        block.set("MD5Sum", "deadbeef");
    }
}
