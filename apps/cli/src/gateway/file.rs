//! Local row-file gateway.
//!
//! Progress rows live in one JSON file, one row per user, mirroring the
//! remote row-store shape so the codec stays identical across backends.
//! Writes go through a temp file and rename so a crash mid-write cannot
//! truncate existing progress.

use quizdrill_core::error::GatewayError;
use quizdrill_core::gateway::{PersistenceGateway, ProgressRecord, RowHandle};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

#[derive(Debug, Default, Serialize, Deserialize)]
struct RowFile {
    rows: Vec<StoredRow>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredRow {
    user_id: String,
    cells: Vec<String>,
}

pub struct FileGateway {
    path: PathBuf,
}

impl FileGateway {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Result<RowFile, GatewayError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(RowFile::default()),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| GatewayError::Decode(format!("bad row file: {e}"))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(RowFile::default()),
            Err(e) => Err(GatewayError::Io(e.to_string())),
        }
    }

    fn store(&self, file: &RowFile) -> Result<(), GatewayError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| GatewayError::Io(e.to_string()))?;
            }
        }
        let content = serde_json::to_vec_pretty(file)
            .map_err(|e| GatewayError::Io(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content).map_err(|e| GatewayError::Io(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| GatewayError::Io(e.to_string()))
    }
}

impl PersistenceGateway for FileGateway {
    fn find(&mut self, user_id: &str) -> Result<Option<RowHandle>, GatewayError> {
        let file = self.load()?;
        Ok(file
            .rows
            .iter()
            .position(|row| row.user_id == user_id)
            .map(|idx| RowHandle(idx as u64)))
    }

    fn read(&mut self, handle: &RowHandle) -> Result<ProgressRecord, GatewayError> {
        let file = self.load()?;
        let row = file
            .rows
            .get(handle.0 as usize)
            .ok_or_else(|| GatewayError::Io(format!("no row {}", handle.0)))?;
        ProgressRecord::from_cells(&row.cells)
    }

    fn write(
        &mut self,
        user_id: &str,
        record: &ProgressRecord,
        handle: Option<&RowHandle>,
    ) -> Result<RowHandle, GatewayError> {
        let mut file = self.load()?;
        let cells = record.to_cells();
        match handle {
            Some(handle) => {
                let row = file
                    .rows
                    .get_mut(handle.0 as usize)
                    .ok_or_else(|| GatewayError::Io(format!("no row {}", handle.0)))?;
                row.user_id = user_id.to_string();
                row.cells = cells;
                self.store(&file)?;
                Ok(*handle)
            }
            None => {
                file.rows.push(StoredRow {
                    user_id: user_id.to_string(),
                    cells,
                });
                self.store(&file)?;
                Ok(RowHandle((file.rows.len() - 1) as u64))
            }
        }
    }
}
