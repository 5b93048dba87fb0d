//! Result-archive construction.

use crate::extract::{ArchiveError, MAX_FILE_BYTES};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;

pub const SESSION_MANIFEST_NAME: &str = "VIBECODING_SESSION.md";

/// Metadata embedded in the `VIBECODING_SESSION.md` entry of a result zip.
#[derive(Debug, Clone)]
pub struct SessionManifest {
    pub project_name: String,
    pub language: String,
    pub start_time: DateTime<Utc>,
    pub duration: std::time::Duration,
    pub original_file_count: usize,
    pub generated_file_count: usize,
    pub test_command: String,
}

impl SessionManifest {
    pub fn render(&self) -> String {
        format!(
            "# VibeCoding Session\n\n\
             - Project: {}\n\
             - Language: {}\n\
             - Started: {}\n\
             - Duration: {:.1}s\n\
             - Original files: {}\n\
             - Generated files: {}\n\
             - Test command: `{}`\n",
            self.project_name,
            self.language,
            self.start_time.to_rfc3339(),
            self.duration.as_secs_f64(),
            self.original_file_count,
            self.generated_file_count,
            self.test_command,
        )
    }
}

/// Build a result zip from the original workspace overlaid with generated
/// files, appending the session manifest. Files larger than
/// [`MAX_FILE_BYTES`] are skipped, matching the extraction-side limit.
pub fn build_result_archive(
    files: &HashMap<String, String>,
    generated_files: &HashMap<String, String>,
    manifest: &SessionManifest,
) -> Result<Vec<u8>, ArchiveError> {
    let mut buf = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(Cursor::new(&mut buf));
        let options = SimpleFileOptions::default();

        let mut merged: HashMap<&str, &str> = HashMap::new();
        for (path, content) in files {
            merged.insert(path.as_str(), content.as_str());
        }
        for (path, content) in generated_files {
            merged.insert(path.as_str(), content.as_str());
        }

        let mut paths: Vec<&&str> = merged.keys().collect();
        paths.sort();
        for path in paths {
            let content = merged[path];
            if content.len() as u64 > MAX_FILE_BYTES {
                continue;
            }
            writer
                .start_file(*path, options)
                .map_err(|e| ArchiveError::InvalidZip(e.to_string()))?;
            writer
                .write_all(content.as_bytes())
                .map_err(|e| ArchiveError::Io(e.to_string()))?;
        }

        writer
            .start_file(SESSION_MANIFEST_NAME, options)
            .map_err(|e| ArchiveError::InvalidZip(e.to_string()))?;
        writer
            .write_all(manifest.render().as_bytes())
            .map_err(|e| ArchiveError::Io(e.to_string()))?;

        writer
            .finish()
            .map_err(|e| ArchiveError::InvalidZip(e.to_string()))?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_archive;

    fn manifest() -> SessionManifest {
        SessionManifest {
            project_name: "demo".into(),
            language: "Python".into(),
            start_time: Utc::now(),
            duration: std::time::Duration::from_secs(42),
            original_file_count: 1,
            generated_file_count: 1,
            test_command: "pytest".into(),
        }
    }

    #[test]
    fn includes_originals_generated_and_manifest() {
        let mut files = HashMap::new();
        files.insert("hello.py".to_string(), "print('hi')".to_string());
        let mut generated = HashMap::new();
        generated.insert("test_hello.py".to_string(), "def test_hi(): pass".to_string());

        let zip_bytes = build_result_archive(&files, &generated, &manifest()).unwrap();
        let extracted = extract_archive(&zip_bytes).unwrap();

        assert_eq!(extracted.get("hello.py").unwrap(), "print('hi')");
        assert_eq!(extracted.get("test_hello.py").unwrap(), "def test_hi(): pass");
    }

    #[test]
    fn manifest_renders_metadata() {
        let rendered = manifest().render();
        assert!(rendered.contains("demo"));
        assert!(rendered.contains("pytest"));
    }
}
