use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the walked root.
    pub path: PathBuf,
    pub contents: String,
}

/// Reads every file under `root` whose extension is `ext`, sorted by path.
pub fn load_sources(root: impl AsRef<Path>, ext: &str) -> Result<Vec<SourceFile>, std::io::Error> {
    let root = root.as_ref();
    let ext = ext.trim_start_matches('.');
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|found| found == ext) {
            let contents = fs::read_to_string(path)?;
            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            files.push(SourceFile {
                path: relative,
                contents,
            });
        }
    }
    Ok(files)
}
