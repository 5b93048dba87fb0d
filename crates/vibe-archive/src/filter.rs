//! Extraction filters.

const SKIPPED_DIR_COMPONENTS: &[&str] = &[
    "__MACOSX",
    ".git",
    "node_modules",
    "build",
    "dist",
    "target",
    ".next",
    "coverage",
];

const SKIPPED_FILE_NAMES: &[&str] = &[".DS_Store"];

const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "svgz", "webp", "pdf", "so", "dll", "dylib", "exe",
    "bin", "class", "o", "a", "wasm",
];

const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "tar", "gz", "bz2", "7z", "rar", "xz"];

/// Extensions recognized as "code" for the reject-if-no-code-file rule.
const CODE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "ts", "tsx", "jsx", "go", "java", "kt", "c", "cpp", "cc", "h", "hpp", "rb",
    "php", "cs", "swift", "scala", "sh", "toml", "json", "yaml", "yml", "md",
];

/// Whether an entry path should be skipped entirely during extraction.
pub fn is_skipped_path(path: &str) -> bool {
    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    if components.iter().any(|c| SKIPPED_DIR_COMPONENTS.contains(c)) {
        return true;
    }
    if let Some(name) = components.last() {
        if SKIPPED_FILE_NAMES.contains(name) {
            return true;
        }
        if let Some(ext) = extension_of(name) {
            if BINARY_EXTENSIONS.contains(&ext.as_str()) || ARCHIVE_EXTENSIONS.contains(&ext.as_str())
            {
                return true;
            }
        }
    }
    false
}

pub fn has_code_extension(path: &str) -> bool {
    extension_of(path)
        .map(|ext| CODE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Strip a common single top-level directory prefix if every entry shares it.
///
/// Only fires for a genuine archive wrapper directory (e.g. GitHub's
/// `repo-main/` zip root): requires at least two surviving entries, so a
/// single surviving file keeps its full path instead of losing its only
/// directory component.
pub fn strip_common_prefix(paths: &[String]) -> Option<String> {
    if paths.len() < 2 {
        return None;
    }
    let first_top = paths[0].split('/').next()?;
    if first_top.is_empty() {
        return None;
    }
    let prefix = format!("{first_top}/");
    if paths
        .iter()
        .all(|p| p.starts_with(&prefix) || p == first_top)
    {
        Some(prefix)
    } else {
        None
    }
}
