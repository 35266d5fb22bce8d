use std::io;
use std::path::Path;

use tracing::{trace, warn};
use walkdir::WalkDir;

/// Totals of the source tree, measured once before the transfer starts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SourceTotals {
    pub total_files: u64,
    pub total_bytes: u64,
}

/// Counts regular files and sums their sizes. Entries that cannot be read are skipped.
pub fn scan_source(path: &Path, follow_symlinks: bool) -> SourceTotals {
    let mut totals = SourceTotals::default();

    for entry in WalkDir::new(path).follow_links(follow_symlinks) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                if e.io_error()
                    .is_some_and(|inner| inner.kind() == io::ErrorKind::NotFound)
                {
                    continue;
                }

                let path = e
                    .path()
                    .unwrap_or_else(|| Path::new(""))
                    .to_string_lossy()
                    .to_string();
                let error = e.to_string();
                warn!(path = path, error = error, "failed to scan local file.");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        match entry.metadata() {
            Ok(metadata) => {
                totals.total_files += 1;
                totals.total_bytes += metadata.len();
            }
            Err(e) => {
                let path = entry.path().to_string_lossy().to_string();
                let error = e.to_string();
                warn!(path = path, error = error, "failed to get metadata of local file.");
            }
        }
    }

    trace!(
        total_files = totals.total_files,
        total_bytes = totals.total_bytes,
        "source scanned."
    );

    totals
}
