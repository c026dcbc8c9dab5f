//! Canonical inventory snapshot persistence.
//!
//! After every successful parse the core writes the canonical tile vector to
//! `pipeline-storage.json` in the project root, first rotating any existing
//! snapshot to `pipeline-storage.json.last`. The rotation is not atomic; a
//! crash may leave either file, and the next successful pass repairs both.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::CanonicalTile;

/// Most recent canonical inventory snapshot.
pub const SNAPSHOT_FILE: &str = "pipeline-storage.json";

/// Previous snapshot, retained across one rotation.
pub const SNAPSHOT_BACKUP_FILE: &str = "pipeline-storage.json.last";

/// Errors reading or writing snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("snapshot at {path} is not valid: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

fn io_err(path: &Path, source: std::io::Error) -> SnapshotError {
    SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Persists `tiles` as the project's snapshot, rotating the previous one.
pub fn write_snapshot(root: &Path, tiles: &[CanonicalTile]) -> Result<(), SnapshotError> {
    let current = root.join(SNAPSHOT_FILE);
    let backup = root.join(SNAPSHOT_BACKUP_FILE);

    if current.is_file() {
        fs::copy(&current, &backup).map_err(|e| io_err(&backup, e))?;
        fs::remove_file(&current).map_err(|e| io_err(&current, e))?;
    }

    let body = serde_json::to_vec_pretty(tiles).map_err(|source| SnapshotError::Corrupt {
        path: current.clone(),
        source,
    })?;
    fs::write(&current, body).map_err(|e| io_err(&current, e))?;
    Ok(())
}

/// Reads the project's snapshot back, `None` when no snapshot exists yet.
pub fn read_snapshot(root: &Path) -> Result<Option<Vec<CanonicalTile>>, SnapshotError> {
    let current = root.join(SNAPSHOT_FILE);
    let text = match fs::read_to_string(&current) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(&current, e)),
    };
    let tiles = serde_json::from_str(&text).map_err(|source| SnapshotError::Corrupt {
        path: current,
        source,
    })?;
    Ok(Some(tiles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tile(path: &str, complete: bool) -> CanonicalTile {
        CanonicalTile::from_inventory(
            path,
            Some(1),
            (Some(0.0), Some(1.0), None),
            (Some(1.0), Some(1.0), None),
            complete,
        )
    }

    #[test]
    fn first_write_creates_snapshot_without_backup() {
        let dir = TempDir::new().unwrap();
        write_snapshot(dir.path(), &[tile("a/b.tif", true)]).unwrap();

        assert!(dir.path().join(SNAPSHOT_FILE).is_file());
        assert!(!dir.path().join(SNAPSHOT_BACKUP_FILE).exists());
    }

    #[test]
    fn snapshot_round_trips() {
        let dir = TempDir::new().unwrap();
        let tiles = vec![tile(r"a\b.tif", true), tile("c/d.tif", false)];
        write_snapshot(dir.path(), &tiles).unwrap();

        let back = read_snapshot(dir.path()).unwrap().unwrap();
        assert_eq!(back, tiles);
    }

    #[test]
    fn rewrite_rotates_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let first = vec![tile("a/b.tif", false)];
        let second = vec![tile("a/b.tif", true), tile("c/d.tif", false)];

        write_snapshot(dir.path(), &first).unwrap();
        write_snapshot(dir.path(), &second).unwrap();

        let current = read_snapshot(dir.path()).unwrap().unwrap();
        assert_eq!(current, second);

        // The backup holds the first write.
        let backup_text = std::fs::read_to_string(dir.path().join(SNAPSHOT_BACKUP_FILE)).unwrap();
        let backup: Vec<CanonicalTile> = serde_json::from_str(&backup_text).unwrap();
        assert_eq!(backup, first);
    }

    #[test]
    fn third_write_overwrites_backup() {
        let dir = TempDir::new().unwrap();
        let writes = [
            vec![tile("one.tif", false)],
            vec![tile("two.tif", false)],
            vec![tile("three.tif", false)],
        ];
        for tiles in &writes {
            write_snapshot(dir.path(), tiles).unwrap();
        }

        let backup_text = std::fs::read_to_string(dir.path().join(SNAPSHOT_BACKUP_FILE)).unwrap();
        let backup: Vec<CanonicalTile> = serde_json::from_str(&backup_text).unwrap();
        assert_eq!(backup, writes[1]);
    }

    #[test]
    fn empty_vector_is_a_valid_snapshot() {
        let dir = TempDir::new().unwrap();
        write_snapshot(dir.path(), &[]).unwrap();
        let back = read_snapshot(dir.path()).unwrap().unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn missing_snapshot_reads_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_snapshot(dir.path()).unwrap().is_none());
    }

    #[test]
    fn corrupt_snapshot_is_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SNAPSHOT_FILE), "[{").unwrap();
        assert!(matches!(
            read_snapshot(dir.path()),
            Err(SnapshotError::Corrupt { .. })
        ));
    }
}
