//! Zip extraction into the staging area
//!
//! Entries are written below the destination directory keeping their
//! relative paths. Entries whose names would escape the destination are
//! rejected.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::ZipArchive;

use crate::error::{DatasetError, Result};

/// Extract every file entry of `archive` accepted by `keep` into `dest`
///
/// Returns the extracted paths in archive order.
pub fn extract_matching<F>(archive: &Path, dest: &Path, keep: F) -> Result<Vec<PathBuf>>
where
    F: Fn(&str) -> bool,
{
    let mut zip = ZipArchive::new(File::open(archive)?)?;
    let mut extracted = Vec::new();

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() || !keep(entry.name()) {
            continue;
        }

        let relative = entry.enclosed_name().ok_or_else(|| {
            DatasetError::Validation(format!("Unsafe path in archive: {}", entry.name()))
        })?;
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&target)?;
        let bytes = io::copy(&mut entry, &mut out)?;
        debug!(entry = entry.name(), bytes, "Extracted archive entry");
        extracted.push(target);
    }

    Ok(extracted)
}

/// Extract every file entry of `archive` into `dest`
pub fn extract_all(archive: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    extract_matching(archive, dest, |_| true)
}

/// Paths with the given extension (case-insensitive), in input order
pub fn with_extension(paths: &[PathBuf], extension: &str) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, body) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_extract_all_keeps_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("census.zip");
        write_zip(&archive, &[("a.csv", "1"), ("sub/b.csv", "2"), ("readme.txt", "x")]);

        let out = dir.path().join("out");
        let files = extract_all(&archive, &out).unwrap();

        assert_eq!(files.len(), 3);
        assert_eq!(std::fs::read_to_string(out.join("sub").join("b.csv")).unwrap(), "2");
        assert_eq!(with_extension(&files, "csv").len(), 2);
    }

    #[test]
    fn test_extract_matching_filters_names() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("shapes.zip");
        write_zip(
            &archive,
            &[
                ("recintos_muni_20110101.shp", "shp"),
                ("recintos_muni_20110101.dbf", "dbf"),
                ("recintos_prov_20110101.shp", "prov"),
                ("recintos_muni_20100101.shp", "old"),
            ],
        );

        let files = extract_matching(&archive, dir.path(), |name| {
            name.contains("_muni_") && name.contains("20110101")
        })
        .unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(
            with_extension(&files, "SHP"),
            vec![dir.path().join("recintos_muni_20110101.shp")]
        );
    }

    #[test]
    fn test_not_a_zip_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.zip");
        std::fs::write(&archive, "definitely not a zip").unwrap();
        assert!(matches!(
            extract_all(&archive, dir.path()),
            Err(DatasetError::Archive(_))
        ));
    }
}
