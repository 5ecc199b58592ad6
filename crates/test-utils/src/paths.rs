//! Locating optional sample files and scratch directories.

use std::path::PathBuf;

/// Workspace root, two levels above this crate's manifest.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent()
        .and_then(|p| p.parent())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// `crates/{crate_name}/testdata/`
pub fn crate_testdata_dir(crate_name: &str) -> PathBuf {
    workspace_root().join("crates").join(crate_name).join("testdata")
}

/// Searches, in order, `TEST_DATA_DIR`, the parser and processor
/// `testdata/` directories and the workspace `testdata/`.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(dir) = std::env::var("TEST_DATA_DIR") {
        candidates.push(PathBuf::from(dir).join(name));
    }
    let root = workspace_root();
    candidates.extend([
        crate_testdata_dir("grib2-parser").join(name),
        crate_testdata_dir("grid-processor").join(name),
        root.join("testdata").join(name),
    ]);
    candidates.into_iter().find(|path| path.exists())
}

/// Temporary directory removed on drop.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("grib2_test_")
        .tempdir()
        .expect("Failed to create temporary test directory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_is_valid() {
        let root = workspace_root();
        assert!(root.join("Cargo.toml").exists(), "no Cargo.toml in {:?}", root);
    }

    #[test]
    fn test_crate_testdata_dir() {
        let dir = crate_testdata_dir("grib2-parser");
        assert!(dir.ends_with("crates/grib2-parser/testdata"));
    }

    #[test]
    fn test_missing_file() {
        assert!(find_test_file("definitely_not_here.grib2").is_none());
    }

    #[test]
    fn test_temp_test_dir() {
        let dir = temp_test_dir();
        assert!(dir.path().exists());
    }
}
