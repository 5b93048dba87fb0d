//! Zip archive extraction and result-archive construction.

pub mod build;
pub mod extract;
pub mod filter;

pub use build::{SessionManifest, build_result_archive, SESSION_MANIFEST_NAME};
pub use extract::{ArchiveError, MAX_ARCHIVE_BYTES, MAX_ENTRY_COUNT, MAX_FILE_BYTES, extract_archive};
pub use filter::{has_code_extension, is_skipped_path};
