//! In-memory table store for tests and local mode.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{StorageManager, StoreError};
use crate::model::{ProjectId, SampleExtent, TileStatusRow};

#[derive(Default)]
struct ProjectTable {
    rows: Vec<TileStatusRow>,
    extent: Option<SampleExtent>,
}

/// Hash-map backed [`StorageManager`].
///
/// Preserves insertion order per project and enforces key uniqueness the way
/// the production table's constraint would. `set_fail` makes every operation
/// error, for exercising failed-tick handling.
#[derive(Default)]
pub struct MemoryStorage {
    tables: Mutex<HashMap<ProjectId, ProjectTable>>,
    fail: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, all subsequent operations fail with a backend error.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Last extent saved for a project, if any.
    pub fn sample_extent(&self, project: &ProjectId) -> Option<SampleExtent> {
        let tables = self.tables.lock().unwrap();
        tables.get(project).and_then(|t| t.extent)
    }

    fn check_fail(&self) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(StoreError::Backend("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StorageManager for MemoryStorage {
    async fn stage_tiles(&self, project: &ProjectId) -> Result<Vec<TileStatusRow>, StoreError> {
        self.check_fail()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.get(project).map(|t| t.rows.clone()).unwrap_or_default())
    }

    async fn insert_tiles(
        &self,
        project: &ProjectId,
        rows: &[TileStatusRow],
    ) -> Result<(), StoreError> {
        self.check_fail()?;
        let mut tables = self.tables.lock().unwrap();
        let table = tables.entry(project.clone()).or_default();

        // Validate the whole bucket before mutating anything.
        for row in rows {
            if table
                .rows
                .iter()
                .any(|existing| existing.relative_path() == row.relative_path())
            {
                return Err(StoreError::DuplicateKey {
                    project: project.clone(),
                    relative_path: row.relative_path().to_string(),
                });
            }
        }
        table.rows.extend(rows.iter().cloned());
        Ok(())
    }

    async fn update_tiles(
        &self,
        project: &ProjectId,
        rows: &[TileStatusRow],
    ) -> Result<(), StoreError> {
        self.check_fail()?;
        let mut tables = self.tables.lock().unwrap();
        let table = tables.entry(project.clone()).or_default();
        for row in rows {
            if let Some(existing) = table
                .rows
                .iter_mut()
                .find(|existing| existing.relative_path() == row.relative_path())
            {
                *existing = row.clone();
            }
        }
        Ok(())
    }

    async fn delete_tiles(
        &self,
        project: &ProjectId,
        relative_paths: &[String],
    ) -> Result<(), StoreError> {
        self.check_fail()?;
        let mut tables = self.tables.lock().unwrap();
        if let Some(table) = tables.get_mut(project) {
            table
                .rows
                .retain(|row| !relative_paths.iter().any(|p| p == row.relative_path()));
        }
        Ok(())
    }

    async fn save_sample_extent(
        &self,
        project: &ProjectId,
        extent: &SampleExtent,
    ) -> Result<(), StoreError> {
        self.check_fail()?;
        let mut tables = self.tables.lock().unwrap();
        tables.entry(project.clone()).or_default().extent = Some(*extent);
        Ok(())
    }
}
