pub mod discovery;
pub mod metadata;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::IngestConfig;
use crate::db::{Database, ImageRecord};

pub use discovery::discover_images;
pub use metadata::{measure_width, object_id_from_path};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("file name is not an integer object id: {}", .0.display())]
    InvalidObjectId(PathBuf),

    #[error("failed to decode image {}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Clone)]
pub enum IngestProgress {
    Started { total_files: usize },
    Ingested { index: usize, total: usize, obj_id: i64 },
    Completed { inserted: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub found: usize,
    pub inserted: usize,
}

/// Copies a folder of images into the `Images` table, one row per file.
pub struct Ingestor {
    config: IngestConfig,
}

impl Ingestor {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    pub fn ingest(&self, db: &Database) -> Result<IngestReport> {
        self.ingest_with_progress(db, |_| {})
    }

    /// Recreate the table and insert every discovered file.
    ///
    /// `on_progress` sees `Started`, then an `Ingested` every
    /// `progress_interval` files (starting with the first), then `Completed`.
    /// Any read, decode or insert failure stops the run; rows from
    /// transactions committed before it stay in the table.
    pub fn ingest_with_progress<F>(
        &self,
        db: &Database,
        mut on_progress: F,
    ) -> Result<IngestReport>
    where
        F: FnMut(&IngestProgress),
    {
        db.recreate_images_table()?;

        let paths = discover_images(&self.config.source_dir, &self.config.extension)?;
        let total = paths.len();

        tracing::info!(
            source = %self.config.source_dir.display(),
            db = %db.path().display(),
            files = total,
            "Starting ingest"
        );
        on_progress(&IngestProgress::Started { total_files: total });

        let batch_size = match self.config.commit_every {
            0 => total.max(1),
            n => n,
        };

        let mut inserted = 0;
        for (batch_index, batch) in paths.chunks(batch_size).enumerate() {
            let tx = db.begin()?;

            for (offset, path) in batch.iter().enumerate() {
                let index = batch_index * batch_size + offset;
                let record = read_record(path)?;
                db.insert_image(&record)
                    .with_context(|| format!("Failed to store {}", path.display()))?;
                inserted += 1;

                tracing::debug!(
                    obj_id = record.obj_id,
                    width = record.width,
                    path = %path.display(),
                    "Stored image"
                );
                if self.should_report(index) {
                    tracing::info!(index, total, "Ingest progress");
                    on_progress(&IngestProgress::Ingested {
                        index,
                        total,
                        obj_id: record.obj_id,
                    });
                }
            }

            tx.commit()?;
        }

        tracing::info!(inserted, "Ingest complete");
        on_progress(&IngestProgress::Completed { inserted });

        Ok(IngestReport {
            found: total,
            inserted,
        })
    }

    fn should_report(&self, index: usize) -> bool {
        self.config.progress_interval != 0 && index % self.config.progress_interval == 0
    }
}

fn read_record(path: &Path) -> Result<ImageRecord> {
    let payload =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let width = measure_width(path, &payload)?;
    let obj_id = object_id_from_path(path)?;
    Ok(ImageRecord {
        obj_id,
        payload,
        width,
    })
}
