//! Service catalog snapshots.
//!
//! The `catalog` module keeps the latest [`ServiceCatalog`] for each
//! service, keyed by service id.  Snapshots can be seeded from a
//! directory of raw service JSON files (the file stem is the service
//! id) and are replaced wholesale whenever a fresher snapshot arrives
//! from the backend.

use crate::adapter::{catalog_from_value, AdapterError};
use crate::models::ServiceCatalog;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog directory {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default)]
pub struct CatalogStore {
    catalogs: HashMap<String, ServiceCatalog>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, service_id: &str) -> Option<&ServiceCatalog> {
        self.catalogs.get(service_id)
    }

    /// Replace the snapshot for `service_id`, returning the previous one.
    pub fn insert(&mut self, service_id: impl Into<String>, catalog: ServiceCatalog) -> Option<ServiceCatalog> {
        self.catalogs.insert(service_id.into(), catalog)
    }

    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }

    /// Load every `*.json` file in `path` as a raw service payload.
    ///
    /// A missing directory yields an empty store.  Files that fail to
    /// parse are skipped with a warning; only I/O failures are errors.
    pub fn load_from_dir(path: &Path) -> Result<Self, CatalogError> {
        let io_err = |source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut store = Self::new();
        if !path.is_dir() {
            warn!(?path, "catalog directory not found, starting empty");
            return Ok(store);
        }
        for entry in std::fs::read_dir(path).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let file = entry.path();
            if !entry.file_type().map_err(io_err)?.is_file()
                || file.extension().map_or(true, |ext| ext != "json")
            {
                continue;
            }
            let Some(service_id) = file.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let data = std::fs::read_to_string(&file).map_err(io_err)?;
            match parse_catalog(&data) {
                Ok(catalog) => {
                    store.insert(service_id, catalog);
                }
                Err(err) => warn!(?file, %err, "skipping unparseable catalog"),
            }
        }
        info!(count = store.len(), ?path, "loaded catalog snapshots");
        Ok(store)
    }
}

fn parse_catalog(data: &str) -> Result<ServiceCatalog, AdapterError> {
    catalog_from_value(serde_json::from_str(data)?)
}
