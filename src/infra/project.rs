//! Project root inference

use std::path::{Path, PathBuf};

/// Walk up from the file's directory to the first directory containing one
/// of `markers`. Falls back to the file's own directory.
pub fn find_project_root(file: &Path, markers: &[String]) -> PathBuf {
    let start = file.parent().unwrap_or(file);

    for dir in start.ancestors() {
        if markers.iter().any(|marker| dir.join(marker).is_file()) {
            tracing::debug!("Project root for {}: {}", file.display(), dir.display());
            return dir.to_path_buf();
        }
    }

    tracing::debug!(
        "No project marker above {}, using its directory",
        file.display()
    );
    start.to_path_buf()
}
