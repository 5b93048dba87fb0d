//! Archive extraction.

use crate::filter::{has_code_extension, is_skipped_path, strip_common_prefix};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use thiserror::Error;
use tracing::warn;

pub const MAX_ARCHIVE_BYTES: u64 = 50 * 1024 * 1024;
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;
pub const MAX_ENTRY_COUNT: usize = 1000;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive exceeds the {MAX_ARCHIVE_BYTES} byte size limit")]
    TooLarge,
    #[error("archive contains more than {MAX_ENTRY_COUNT} entries")]
    TooManyEntries,
    #[error("archive is not a valid zip file: {0}")]
    InvalidZip(String),
    #[error("archive contains no recognized source file")]
    NoCodeFile,
    #[error("io error reading archive entry: {0}")]
    Io(String),
}

/// Extract a zip archive into a path -> UTF-8 text map, applying the
/// skip/size filters above.
pub fn extract_archive(bytes: &[u8]) -> Result<HashMap<String, String>, ArchiveError> {
    if bytes.len() as u64 > MAX_ARCHIVE_BYTES {
        return Err(ArchiveError::TooLarge);
    }

    let reader = Cursor::new(bytes);
    let mut zip = zip::ZipArchive::new(reader).map_err(|e| ArchiveError::InvalidZip(e.to_string()))?;

    if zip.len() > MAX_ENTRY_COUNT {
        return Err(ArchiveError::TooManyEntries);
    }

    // Pass 1: collect surviving entry names so we can detect + strip a
    // shared top-level directory prefix before materializing content.
    let mut names = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let entry = zip
            .by_index(i)
            .map_err(|e| ArchiveError::InvalidZip(e.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if is_skipped_path(&name) {
            continue;
        }
        names.push(name);
    }

    let prefix = strip_common_prefix(&names);

    let mut files = HashMap::new();
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| ArchiveError::InvalidZip(e.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        let raw_name = entry.name().to_string();
        if is_skipped_path(&raw_name) {
            continue;
        }
        if entry.size() > MAX_FILE_BYTES {
            warn!(path = %raw_name, size = entry.size(), "skipping oversized archive entry");
            continue;
        }

        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut buf)
            .map_err(|e| ArchiveError::Io(e.to_string()))?;
        let Ok(text) = String::from_utf8(buf) else {
            warn!(path = %raw_name, "skipping non-UTF-8 archive entry");
            continue;
        };

        let final_name = match &prefix {
            Some(p) => raw_name.strip_prefix(p.as_str()).unwrap_or(&raw_name).to_string(),
            None => raw_name,
        };
        files.insert(final_name, text);
    }

    if !files.keys().any(|p| has_code_extension(p)) {
        return Err(ArchiveError::NoCodeFile);
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = SimpleFileOptions::default();
            for (name, content) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content).unwrap();
            }
            writer.finish().unwrap();
        }
        buf
    }

    #[test]
    fn extracts_single_file_python_script() {
        let zip_bytes = build_zip(&[("hello.py", b"print(\"hi\")")]);
        let files = extract_archive(&zip_bytes).unwrap();
        assert_eq!(files.get("hello.py").unwrap(), "print(\"hi\")");
    }

    #[test]
    fn filters_macosx_git_node_modules_and_images_s6() {
        let zip_bytes = build_zip(&[
            ("src/main.go", b"package main"),
            ("__MACOSX/._main.go", b"junk"),
            (".git/HEAD", b"ref: refs/heads/main"),
            ("img.png", b"\x89PNG"),
            ("node_modules/x/pkg.js", b"module.exports = {}"),
        ]);
        let files = extract_archive(&zip_bytes).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files.contains_key("src/main.go"));
    }

    #[test]
    fn strips_shared_top_level_directory() {
        let zip_bytes = build_zip(&[("proj/main.rs", b"fn main() {}"), ("proj/Cargo.toml", b"[package]")]);
        let files = extract_archive(&zip_bytes).unwrap();
        assert!(files.contains_key("main.rs"));
        assert!(files.contains_key("Cargo.toml"));
    }

    #[test]
    fn rejects_archive_with_no_code_file() {
        let zip_bytes = build_zip(&[("README.txt", b"no code here")]);
        assert!(matches!(extract_archive(&zip_bytes), Err(ArchiveError::NoCodeFile)));
    }

    #[test]
    fn round_trip_property_p8() {
        let zip_bytes = build_zip(&[("a.py", b"x = 1"), ("b.py", b"y = 2")]);
        let files = extract_archive(&zip_bytes).unwrap();
        let mut names: Vec<_> = files.keys().cloned().collect();
        names.sort();
        assert_eq!(names, vec!["a.py".to_string(), "b.py".to_string()]);
    }
}
