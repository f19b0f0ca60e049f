//! Line-level lexing for the DPKG "control" tag-file format.
//!
//! Only the `key: value` header line is parsed with `nom` combinators (the
//! same building blocks the teacher's `parser.rs` uses); stanza/continuation
//! handling is a small state machine in `super`, the same shape as the
//! reference implementation's line-by-line loop.

use nom::{
    bytes::complete::take_until,
    character::complete::char,
    combinator::{opt, verify},
    sequence::separated_pair,
    IResult, Parser,
};

use crate::error::Error;

#[inline]
fn key_name(input: &str) -> IResult<&str, &str> {
    verify(take_until(":"), |s: &str| {
        !s.is_empty() && !s.contains('\n')
    })
    .parse(input)
}

#[inline]
fn separator(input: &str) -> IResult<&str, ()> {
    // Only a single leading space on the value is part of the separator;
    // any further spaces are significant content (spec.md §4.B).
    (char(':'), opt(char(' ')))
        .parse(input)
        .map(|(rest, _)| (rest, ()))
}

#[inline]
fn header(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(key_name, separator, nom::combinator::rest).parse(input)
}

/// Split a single non-continuation line into `(key, value)`.
///
/// A single leading space on the value has already been consumed by the
/// parser above; `value` may be empty (field present with an empty value).
pub(crate) fn split_header(line: &str) -> Result<(String, String), Error> {
    header(line)
        .map(|(_, (k, v))| (k.to_string(), v.to_string()))
        .map_err(|_| Error::InvalidTagFile(line.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_simple_header() {
        assert_eq!(
            split_header("Package: zsync").unwrap(),
            ("Package".to_string(), "zsync".to_string())
        );
    }

    #[test]
    fn strips_single_leading_space_only() {
        assert_eq!(
            split_header("Package:  zsync").unwrap(),
            ("Package".to_string(), " zsync".to_string())
        );
    }

    #[test]
    fn empty_value_is_allowed() {
        assert_eq!(
            split_header("Field:").unwrap(),
            ("Field".to_string(), "".to_string())
        );
    }

    #[test]
    fn missing_colon_is_fatal() {
        assert!(split_header("not a header").is_err());
    }
}
