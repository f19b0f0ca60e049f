//! Reading `.deb` archives: AR framing plus the two embedded TAR streams.
//! Grounded on `examples/original_source/apt/deb.py` and the teacher's
//! `scan/mod.rs` (`open_deb_simple`/`collect_control`), generalized to also
//! return the ordered file manifest spec.md §4.D requires.

use std::io::Read;

use ar::Archive as ArArchive;
use flate2::read::GzDecoder;
use tar::Archive as TarArchive;
use xz2::read::XzDecoder;
use zstd::stream::read::Decoder as ZstdDecoder;

use crate::error::{Error, Result};
use crate::tagfile::{self, TagBlock};

enum Compression {
    None,
    Gzip,
    Xz,
    Zstd,
}

fn compression_of(name: &[u8]) -> Compression {
    if name.ends_with(b".gz") {
        Compression::Gzip
    } else if name.ends_with(b".xz") {
        Compression::Xz
    } else if name.ends_with(b".zst") {
        Compression::Zstd
    } else {
        Compression::None
    }
}

/// Read a whole AR member body into a decoded TAR archive, dispatching on
/// its name suffix. The closure receives the entries so the caller can
/// avoid forcing a single return type across the three decoder branches.
fn with_tar_entries<R: Read, T>(
    reader: R,
    compression: Compression,
    f: impl FnOnce(tar::Entries<'_, Box<dyn Read>>) -> Result<T>,
) -> Result<T> {
    let boxed: Box<dyn Read> = match compression {
        Compression::None => Box::new(reader),
        Compression::Gzip => Box::new(GzDecoder::new(reader)),
        Compression::Xz => Box::new(XzDecoder::new(reader)),
        Compression::Zstd => Box::new(
            ZstdDecoder::new(reader).map_err(|e| Error::InvalidDeb(e.to_string()))?,
        ),
    };
    let mut tar = TarArchive::new(boxed);
    let entries = tar.entries().map_err(|e| Error::InvalidDeb(e.to_string()))?;
    f(entries)
}

fn is_control_member(path: &[u8]) -> bool {
    path == b"./control" || path == b"control"
}

fn normalize_member_path(path: &str) -> Option<String> {
    let stripped = path.strip_prefix('.').unwrap_or(path);
    if stripped.is_empty() || stripped == "." {
        None
    } else {
        Some(stripped.to_string())
    }
}

/// Validate the AR magic, require `debian-binary` == `2.0\n`, then locate
/// the member whose name starts with `prefix` and hand its decoded TAR
/// entries to `f`. `InvalidDeb` on any framing violation or missing member.
fn with_member<R: Read, T>(
    reader: R,
    prefix: &[u8],
    f: impl FnOnce(tar::Entries<'_, Box<dyn Read>>) -> Result<T>,
) -> Result<T> {
    let mut archive = ArArchive::new(reader);

    let mut first = archive
        .next_entry()
        .ok_or_else(|| Error::InvalidDeb("archive is empty".to_string()))?
        .map_err(|e| Error::InvalidDeb(e.to_string()))?;
    if first.header().identifier() != b"debian-binary" {
        return Err(Error::InvalidDeb(
            "archive does not start with debian-binary file".to_string(),
        ));
    }
    let mut version = Vec::new();
    first
        .read_to_end(&mut version)
        .map_err(|e| Error::InvalidDeb(e.to_string()))?;
    if version != b"2.0\n" {
        return Err(Error::InvalidDeb(
            "archive does not have debian-binary version 2.0".to_string(),
        ));
    }
    drop(first);

    loop {
        let entry = match archive.next_entry() {
            None => {
                return Err(Error::InvalidDeb(format!(
                    "archive does not contain a {} member",
                    String::from_utf8_lossy(prefix)
                )))
            }
            Some(entry) => entry.map_err(|e| Error::InvalidDeb(e.to_string()))?,
        };
        let name = entry.header().identifier().to_vec();
        if name.starts_with(prefix) {
            let compression = compression_of(&name);
            return with_tar_entries(entry, compression, f);
        }
    }
}

/// Extract and parse the `control` stanza from `control.tar[.gz|.xz|.zst]`.
pub fn extract_control_file(deb: impl Read) -> Result<TagBlock> {
    with_member(deb, b"control.tar", |entries| {
        for entry in entries {
            let mut entry = entry.map_err(|e| Error::InvalidDeb(e.to_string()))?;
            let path = entry.path_bytes();
            if is_control_member(&path) {
                let mut buf = Vec::new();
                entry
                    .read_to_end(&mut buf)
                    .map_err(|e| Error::InvalidDeb(e.to_string()))?;
                let blocks: Vec<TagBlock> = tagfile::parse(&buf)?;
                return blocks
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::InvalidDeb("control file is empty".to_string()));
            }
        }
        Err(Error::InvalidDeb(
            "control.tar.* does not contain a control file".to_string(),
        ))
    })
}

/// Extract the ordered file manifest from `data.tar[.gz|.xz|.zst]`, with
/// each path normalized by stripping a single leading `.` and the synthetic
/// root entry excluded.
pub fn extract_contents_list(deb: impl Read) -> Result<Vec<String>> {
    with_member(deb, b"data.tar", |entries| {
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::InvalidDeb(e.to_string()))?;
            let path = entry
                .path()
                .map_err(|e| Error::InvalidDeb(e.to_string()))?
                .to_string_lossy()
                .into_owned();
            if let Some(normalized) = normalize_member_path(&path) {
                out.push(normalized);
            }
        }
        Ok(out)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ar_record(name: &str, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut header = vec![b' '; 60];
        header[..name.len()].copy_from_slice(name.as_bytes());
        let mtime = b"0";
        header[16..16 + mtime.len()].copy_from_slice(mtime);
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

    #[test]
    fn extracts_control_stanza() {
        let control_tar = build_tar(&[("./control", b"Package: x\nVersion: 1\n")]);
        let data_tar = build_tar(&[("./usr/bin/x", b"binary")]);
        let deb = build_deb(&control_tar, &data_tar);

        let control = extract_control_file(&deb[..]).unwrap();
        assert_eq!(control.get("Package"), Some("x"));
        assert_eq!(control.get("Version"), Some("1"));
    }

    #[test]
    fn extracts_contents_list() {
        let control_tar = build_tar(&[("./control", b"Package: x\nVersion: 1\n")]);
        let data_tar = build_tar(&[("./usr/bin/x", b"binary"), (".", b"")]);
        let deb = build_deb(&control_tar, &data_tar);

        let contents = extract_contents_list(&deb[..]).unwrap();
        assert_eq!(contents, vec!["/usr/bin/x".to_string()]);
    }

    #[test]
    fn rejects_bad_ar_magic() {
        let result = extract_control_file(&b"not an archive"[..]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_wrong_debian_binary_version() {
        let mut out = Vec::new();
        out.extend_from_slice(b"!<arch>\n");
        out.extend(ar_record("debian-binary", b"1.0\n"));
        let result = extract_control_file(&out[..]);
        assert!(matches!(result, Err(Error::InvalidDeb(_))));
    }

    #[test]
    fn missing_control_member_is_invalid_deb() {
        let control_tar = build_tar(&[("./NOTCONTROL", b"x")]);
        let mut out = Vec::new();
        out.extend_from_slice(b"!<arch>\n");
        out.extend(ar_record("debian-binary", b"2.0\n"));
        out.extend(ar_record("control.tar", &control_tar));
        let result = extract_control_file(&out[..]);
        assert!(result.is_err());
    }
}
