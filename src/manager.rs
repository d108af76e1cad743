//! Per-process registry of open simulations, analogous to the teacher's
//! `AppState`: a thin, cloneable handle shared across axum handlers that
//! lazily opens and caches one [`SimStore`] per simulation name.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::{EngineError, EngineResult};
use crate::store::SimStore;

#[derive(Clone)]
pub struct SimulationManager {
    data_dir: PathBuf,
    open: Arc<Mutex<HashMap<String, Arc<SimStore>>>>,
}

fn sim_path(data_dir: &Path, name: &str) -> PathBuf {
    data_dir.join(format!("{name}.db"))
}

impl SimulationManager {
    pub fn new(data_dir: PathBuf) -> EngineResult<Self> {
        std::fs::create_dir_all(&data_dir).map_err(|e| EngineError::Internal(e.into()))?;
        Ok(Self {
            data_dir,
            open: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Stable alphabetical order (spec §4.1).
    pub fn list_simulations(&self) -> EngineResult<Vec<String>> {
        let mut names: Vec<String> = std::fs::read_dir(&self.data_dir)
            .map_err(|e| EngineError::Internal(e.into()))?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.is_file() && path.extension().map(|e| e == "db").unwrap_or(false) {
                    path.file_stem().map(|s| s.to_string_lossy().into_owned())
                } else {
                    None
                }
            })
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn simulation_exists(&self, name: &str) -> bool {
        sim_path(&self.data_dir, name).is_file()
    }

    pub async fn create_simulation(
        &self,
        name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<()> {
        if self.simulation_exists(name) {
            return Err(EngineError::Conflict(format!("simulation '{name}'")));
        }
        let store = SimStore::open(&sim_path(&self.data_dir, name))?;
        store.put_metadata(start, end).await?;
        self.open.lock().await.insert(name.to_string(), Arc::new(store));
        Ok(())
    }

    pub async fn delete_simulation(&self, name: &str) -> EngineResult<()> {
        if !self.simulation_exists(name) {
            return Err(EngineError::NotFound(format!("simulation '{name}'")));
        }
        self.open.lock().await.remove(name);
        std::fs::remove_file(sim_path(&self.data_dir, name))
            .map_err(|e| EngineError::Internal(e.into()))?;
        Ok(())
    }

    /// Opens (or returns the cached handle for) a simulation's store.
    pub async fn open(&self, name: &str) -> EngineResult<Arc<SimStore>> {
        let mut guard = self.open.lock().await;
        if let Some(store) = guard.get(name) {
            return Ok(store.clone());
        }
        if !self.simulation_exists(name) {
            return Err(EngineError::NotFound(format!("simulation '{name}'")));
        }
        let store = Arc::new(SimStore::open(&sim_path(&self.data_dir, name))?);
        guard.insert(name.to_string(), store.clone());
        Ok(store)
    }
}
