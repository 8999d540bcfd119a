//! SQLite blob store for ingested images.
//!
//! A [`Database`] owns a single connection for the lifetime of one phase
//! (ingest or view). Dropping it closes the file, so the handle is released on
//! every exit path; [`Database::close`] does the same but surfaces close errors.

mod schema;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, Transaction};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

pub use schema::IMAGES_TABLE;
use schema::{CREATE_IMAGES, DROP_IMAGES};

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("database file does not exist: {}", .0.display())]
    NotFound(PathBuf),
}

/// One row to be written: the id parsed from the filename, the untouched file
/// bytes and the width measured by decoding them.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub obj_id: i64,
    pub payload: Vec<u8>,
    pub width: u32,
}

/// A row as read back by the full-table scan.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub obj_id: i64,
    pub payload: Vec<u8>,
}

/// Row overview without the blob itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSummary {
    pub obj_id: i64,
    pub width: i64,
    pub payload_len: usize,
}

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    /// Open (creating if needed) a store for writing.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Database opened");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Open a store produced by an earlier ingest. Never creates the file.
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DatabaseError::NotFound(path.to_path_buf()).into());
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Database opened read-only");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop the images table if present and create it empty.
    pub fn recreate_images_table(&self) -> Result<()> {
        self.conn.execute(DROP_IMAGES, [])?;
        self.conn.execute_batch(CREATE_IMAGES)?;
        tracing::debug!(table = IMAGES_TABLE, "Table recreated");
        Ok(())
    }

    /// Start a transaction on the shared connection. Inserts made through
    /// `self` while it is open belong to it; dropping it uncommitted rolls back.
    pub fn begin(&self) -> Result<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    pub fn insert_image(&self, record: &ImageRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO Images (ObjId, img, size) VALUES (?1, ?2, ?3)",
            rusqlite::params![record.obj_id, &record.payload[..], i64::from(record.width)],
        )?;
        Ok(())
    }

    pub fn count_images(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM Images", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Walk every row in storage order, handing each to `visit` until it
    /// returns `ControlFlow::Break` or the rows run out. Returns how many rows
    /// were visited.
    pub fn for_each_image<F>(&self, mut visit: F) -> Result<usize>
    where
        F: FnMut(StoredImage) -> Result<ControlFlow<()>>,
    {
        let mut stmt = self.conn.prepare("SELECT ObjId, img FROM Images")?;
        let mut rows = stmt.query([])?;
        let mut visited = 0;

        while let Some(row) = rows.next()? {
            let image = StoredImage {
                obj_id: row.get(0)?,
                payload: row.get(1)?,
            };
            visited += 1;
            if visit(image)?.is_break() {
                break;
            }
        }

        Ok(visited)
    }

    pub fn list_images(&self) -> Result<Vec<ImageSummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT ObjId, size, length(img) FROM Images")?;
        let summaries = stmt
            .query_map([], |row| {
                Ok(ImageSummary {
                    obj_id: row.get(0)?,
                    width: row.get(1)?,
                    payload_len: row.get::<_, i64>(2)? as usize,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(summaries)
    }

    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.conn
            .close()
            .map_err(|(_, e)| e)
            .with_context(|| format!("Failed to close database {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Database closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(obj_id: i64, payload: &[u8], width: u32) -> ImageRecord {
        ImageRecord {
            obj_id,
            payload: payload.to_vec(),
            width,
        }
    }

    #[test]
    fn test_recreate_discards_rows() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("store.db")).unwrap();
        db.recreate_images_table().unwrap();
        db.insert_image(&record(1, b"abc", 10)).unwrap();
        assert_eq!(db.count_images().unwrap(), 1);

        db.recreate_images_table().unwrap();
        assert_eq!(db.count_images().unwrap(), 0);
    }

    #[test]
    fn test_duplicate_ids_are_kept() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("store.db")).unwrap();
        db.recreate_images_table().unwrap();
        db.insert_image(&record(7, b"first", 1)).unwrap();
        db.insert_image(&record(7, b"second", 2)).unwrap();

        assert_eq!(db.count_images().unwrap(), 2);
    }

    #[test]
    fn test_scan_in_storage_order_and_stop() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("store.db")).unwrap();
        db.recreate_images_table().unwrap();
        for id in [3, 1, 2] {
            db.insert_image(&record(id, &[id as u8; 4], 8)).unwrap();
        }

        let mut seen = Vec::new();
        let visited = db
            .for_each_image(|image| {
                seen.push((image.obj_id, image.payload));
                Ok(ControlFlow::Continue(()))
            })
            .unwrap();
        assert_eq!(visited, 3);
        assert_eq!(
            seen,
            vec![(3, vec![3u8; 4]), (1, vec![1u8; 4]), (2, vec![2u8; 4])]
        );

        let visited = db
            .for_each_image(|_| Ok(ControlFlow::Break(())))
            .unwrap();
        assert_eq!(visited, 1);
    }

    #[test]
    fn test_rolled_back_transaction_leaves_no_rows() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("store.db")).unwrap();
        db.recreate_images_table().unwrap();

        {
            let _tx = db.begin().unwrap();
            db.insert_image(&record(1, b"x", 1)).unwrap();
        }
        assert_eq!(db.count_images().unwrap(), 0);

        let tx = db.begin().unwrap();
        db.insert_image(&record(2, b"y", 1)).unwrap();
        tx.commit().unwrap();
        assert_eq!(db.count_images().unwrap(), 1);
    }

    #[test]
    fn test_list_reports_blob_length() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("store.db")).unwrap();
        db.recreate_images_table().unwrap();
        db.insert_image(&record(5, &[0u8; 123], 64)).unwrap();

        assert_eq!(
            db.list_images().unwrap(),
            vec![ImageSummary {
                obj_id: 5,
                width: 64,
                payload_len: 123,
            }]
        );
    }

    #[test]
    fn test_open_existing_requires_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.db");

        let err = Database::open_existing(&path).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<DatabaseError>(),
            Some(DatabaseError::NotFound(p)) if p == &path
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_open_unwritable_destination_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"a regular file").unwrap();

        assert!(Database::open(&blocker.join("store.db")).is_err());
    }

    #[test]
    fn test_open_creates_parent_and_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/store.db");
        let db = Database::open(&path).unwrap();
        db.recreate_images_table().unwrap();
        db.close().unwrap();

        let db = Database::open_existing(&path).unwrap();
        assert_eq!(db.count_images().unwrap(), 0);
    }
}
