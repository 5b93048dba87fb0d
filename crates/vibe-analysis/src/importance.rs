//! File importance ordering for token-budget eviction.

const ENTRY_POINT_NAMES: &[&str] = &[
    "main.rs", "main.go", "main.py", "main.c", "main.cpp", "index.js", "index.ts", "app.py",
    "app.js", "Main.java",
];

const BUILD_MARKER_NAMES: &[&str] = &[
    "Cargo.toml",
    "go.mod",
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "pom.xml",
    "build.gradle",
];

const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "go", "py", "js", "ts", "tsx", "jsx", "java", "c", "cpp", "rb", "php", "cs",
];

/// Lower is more important (sorts ascending to put most-important first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImportanceTier {
    EntryPoint = 0,
    BuildMarkerSibling = 1,
    Source = 2,
    Other = 3,
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn extension(path: &str) -> Option<&str> {
    file_name(path).rsplit_once('.').map(|(_, ext)| ext)
}

/// Classify a single path's importance tier. `build_marker_dirs` lists the
/// directories (as produced by [`build_marker_dirs`]) that contain a
/// build/entry marker file, so sibling source files inherit the next tier.
pub fn classify(path: &str, build_marker_dirs: &[String]) -> ImportanceTier {
    let name = file_name(path);
    if ENTRY_POINT_NAMES.contains(&name) {
        return ImportanceTier::EntryPoint;
    }
    let dir = path.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    if build_marker_dirs.iter().any(|d| d == dir) {
        return ImportanceTier::BuildMarkerSibling;
    }
    if let Some(ext) = extension(path) {
        if SOURCE_EXTENSIONS.contains(&ext) {
            return ImportanceTier::Source;
        }
    }
    ImportanceTier::Other
}

/// Directories that directly contain a build/entry marker file.
pub fn build_marker_dirs(paths: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
    paths
        .into_iter()
        .filter_map(|p| {
            let p = p.as_ref();
            let name = file_name(p);
            if BUILD_MARKER_NAMES.contains(&name) {
                Some(p.rsplit_once('/').map(|(d, _)| d.to_string()).unwrap_or_default())
            } else {
                None
            }
        })
        .collect()
}

/// Sort paths most-important first using [`classify`].
pub fn sort_by_importance(paths: &mut [String]) {
    let marker_dirs = build_marker_dirs(paths.iter());
    paths.sort_by_key(|p| classify(p, &marker_dirs));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_point_outranks_everything() {
        let marker_dirs = build_marker_dirs(["src/main.rs", "Cargo.toml"]);
        assert_eq!(classify("src/main.rs", &marker_dirs), ImportanceTier::EntryPoint);
    }

    #[test]
    fn sibling_of_build_marker_outranks_plain_source() {
        let marker_dirs = build_marker_dirs(["Cargo.toml", "src/lib.rs", "vendor/other.rs"]);
        assert_eq!(classify("lib.rs", &marker_dirs), ImportanceTier::BuildMarkerSibling);
        assert_eq!(classify("vendor/other.rs", &marker_dirs), ImportanceTier::Source);
    }

    #[test]
    fn sorts_most_important_first() {
        let mut paths = vec![
            "README.md".to_string(),
            "src/util.rs".to_string(),
            "src/main.rs".to_string(),
        ];
        sort_by_importance(&mut paths);
        assert_eq!(paths[0], "src/main.rs");
        assert_eq!(paths[2], "README.md");
    }
}
