//! Raw table access for zip archives and extracted directories.

use std::io::{Cursor, Read};
use std::path::PathBuf;

use zip::ZipArchive;

use super::error::FeedError;

/// Something that can hand out the raw bytes of GTFS tables by file name.
pub trait TableSource {
    /// Read a table, or `Ok(None)` if the feed doesn't contain it.
    fn read_table(&mut self, name: &'static str) -> Result<Option<Vec<u8>>, FeedError>;
}

/// Tables inside an in-memory zip archive.
///
/// Some publishers wrap the tables in a single top-level folder, so a table
/// is matched either at the archive root or as the last path component.
pub struct ZipTables {
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl ZipTables {
    /// Open an archive from its bytes.
    pub fn new(bytes: Vec<u8>) -> Result<Self, FeedError> {
        let archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| FeedError::Archive {
            message: e.to_string(),
        })?;
        Ok(Self { archive })
    }

    fn entry_name(&self, name: &str) -> Option<String> {
        let mut nested = None;
        for entry in self.archive.file_names() {
            if entry == name {
                return Some(entry.to_string());
            }
            if nested.is_none() && entry.rsplit('/').next() == Some(name) {
                nested = Some(entry.to_string());
            }
        }
        nested
    }
}

impl TableSource for ZipTables {
    fn read_table(&mut self, name: &'static str) -> Result<Option<Vec<u8>>, FeedError> {
        let Some(entry) = self.entry_name(name) else {
            return Ok(None);
        };

        let mut file = self.archive.by_name(&entry).map_err(|e| FeedError::Archive {
            message: format!("{entry}: {e}"),
        })?;

        // The header's size is untrusted, so let the buffer grow as read.
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(|e| FeedError::Archive {
            message: format!("{entry}: {e}"),
        })?;

        Ok(Some(buf))
    }
}

/// Tables in an already extracted feed directory.
pub struct DirTables {
    dir: PathBuf,
}

impl DirTables {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TableSource for DirTables {
    fn read_table(&mut self, name: &'static str) -> Result<Option<Vec<u8>>, FeedError> {
        let path = self.dir.join(name);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FeedError::Unavailable {
                message: format!("failed to read {}: {}", path.display(), e),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs::testing::zip_bytes;
    use tempfile::tempdir;

    #[test]
    fn reads_root_level_entries() {
        let bytes = zip_bytes(&[("stops.txt", "stop_id,stop_name\nS1,One\n")]);
        let mut tables = ZipTables::new(bytes).unwrap();

        let stops = tables.read_table("stops.txt").unwrap().unwrap();
        assert_eq!(stops, b"stop_id,stop_name\nS1,One\n");
        assert!(tables.read_table("trips.txt").unwrap().is_none());
    }

    #[test]
    fn reads_entries_in_a_subfolder() {
        let bytes = zip_bytes(&[("bluestar/stops.txt", "stop_id,stop_name\nS1,One\n")]);
        let mut tables = ZipTables::new(bytes).unwrap();

        assert!(tables.read_table("stops.txt").unwrap().is_some());
    }

    #[test]
    fn root_entry_preferred_over_nested() {
        let bytes = zip_bytes(&[
            ("old/stops.txt", "stop_id,stop_name\nOLD,Old\n"),
            ("stops.txt", "stop_id,stop_name\nNEW,New\n"),
        ]);
        let mut tables = ZipTables::new(bytes).unwrap();

        let stops = tables.read_table("stops.txt").unwrap().unwrap();
        assert!(String::from_utf8(stops).unwrap().contains("NEW"));
    }

    /// Overwrite every uncompressed-size field in a zip's headers.
    fn inflate_declared_sizes(bytes: &mut [u8], size: u32) {
        const LOCAL: &[u8] = b"PK\x03\x04";
        const CENTRAL: &[u8] = b"PK\x01\x02";
        for i in 0..bytes.len().saturating_sub(4) {
            let field = match &bytes[i..i + 4] {
                sig if sig == LOCAL => i + 22,
                sig if sig == CENTRAL => i + 24,
                _ => continue,
            };
            bytes[field..field + 4].copy_from_slice(&size.to_le_bytes());
        }
    }

    #[test]
    fn huge_declared_size_is_not_preallocated() {
        let body = "stop_id,stop_name\nS1,One\n";
        let mut bytes = zip_bytes(&[("stops.txt", body)]);
        inflate_declared_sizes(&mut bytes, 0xFFFF_FFF0);

        // Either the real contents or an archive error; never an abort.
        match ZipTables::new(bytes).and_then(|mut t| t.read_table("stops.txt")) {
            Ok(stops) => assert_eq!(stops.unwrap(), body.as_bytes()),
            Err(e) => assert!(matches!(e, FeedError::Archive { .. })),
        }
    }

    #[test]
    fn rejects_non_zip_payload() {
        let result = ZipTables::new(b"<html>Not Found</html>".to_vec());
        assert!(matches!(result, Err(FeedError::Archive { .. })));
    }

    #[test]
    fn reads_directory_tables() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("routes.txt"), "route_id\nR1\n").unwrap();

        let mut tables = DirTables::new(dir.path());
        assert!(tables.read_table("routes.txt").unwrap().is_some());
        assert!(tables.read_table("agency.txt").unwrap().is_none());
    }
}
