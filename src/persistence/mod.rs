//! Durable mirror of the inventory.
//!
//! Persistence is best effort: the store logs failures and keeps serving from
//! memory, so nothing in here is on the success path of a mutation.

mod autosave;
mod json_file_store;

pub use autosave::spawn_autosave;
pub use json_file_store::{
    JsonFilePersistence, MACHINES_FILE_NAME, TOOLS_FILE_NAME, TOOL_TYPES_FILE_NAME,
};

use crate::inventory::ToolRecord;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed document {path:?}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Storage backend for the tool table and the two catalogs.
///
/// Every `load_*` returns `Ok(None)` when nothing was stored yet. Each
/// document is written whole, replacing the previous one.
pub trait InventoryPersistence: Send + Sync {
    fn load_tools(&self) -> Result<Option<Vec<ToolRecord>>, PersistenceError>;
    fn save_tools(&self, tools: &[ToolRecord]) -> Result<(), PersistenceError>;

    fn load_machines(&self) -> Result<Option<Value>, PersistenceError>;
    fn save_machines(&self, machines: &Value) -> Result<(), PersistenceError>;

    fn load_tool_types(&self) -> Result<Option<Value>, PersistenceError>;
    fn save_tool_types(&self, tool_types: &Value) -> Result<(), PersistenceError>;
}

/// Keeps nothing. The inventory lives only as long as the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPersistence;

impl InventoryPersistence for NullPersistence {
    fn load_tools(&self) -> Result<Option<Vec<ToolRecord>>, PersistenceError> {
        Ok(None)
    }

    fn save_tools(&self, _tools: &[ToolRecord]) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn load_machines(&self) -> Result<Option<Value>, PersistenceError> {
        Ok(None)
    }

    fn save_machines(&self, _machines: &Value) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn load_tool_types(&self) -> Result<Option<Value>, PersistenceError> {
        Ok(None)
    }

    fn save_tool_types(&self, _tool_types: &Value) -> Result<(), PersistenceError> {
        Ok(())
    }
}
