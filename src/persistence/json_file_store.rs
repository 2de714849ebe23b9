use super::{InventoryPersistence, PersistenceError};
use crate::inventory::ToolRecord;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

pub const TOOLS_FILE_NAME: &str = "tools_data.json";
pub const MACHINES_FILE_NAME: &str = "machines_data.json";
pub const TOOL_TYPES_FILE_NAME: &str = "tool_types_data.json";

/// One pretty-printed JSON document per collection, inside a data directory.
pub struct JsonFilePersistence {
    tools_path: PathBuf,
    machines_path: PathBuf,
    tool_types_path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(data_dir: &Path) -> JsonFilePersistence {
        JsonFilePersistence::from_paths(
            data_dir.join(TOOLS_FILE_NAME),
            data_dir.join(MACHINES_FILE_NAME),
            data_dir.join(TOOL_TYPES_FILE_NAME),
        )
    }

    pub fn from_paths(
        tools_path: PathBuf,
        machines_path: PathBuf,
        tool_types_path: PathBuf,
    ) -> JsonFilePersistence {
        JsonFilePersistence {
            tools_path,
            machines_path,
            tool_types_path,
        }
    }

    pub fn tools_path(&self) -> &Path {
        &self.tools_path
    }
}

fn io_error(path: &Path, source: std::io::Error) -> PersistenceError {
    PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistenceError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_error(path, err)),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| PersistenceError::Serialization {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes to a sibling temp file first and renames it over `path`, so readers
/// see either the old document or the new one, never a truncated file.
fn write_document<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let json_string =
        serde_json::to_string_pretty(value).map_err(|source| PersistenceError::Serialization {
            path: path.to_path_buf(),
            source,
        })?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(|err| io_error(path, err))?;
    file.write_all(json_string.as_bytes())
        .map_err(|err| io_error(path, err))?;
    file.persist(path).map_err(|err| io_error(path, err.error))?;
    Ok(())
}

impl InventoryPersistence for JsonFilePersistence {
    fn load_tools(&self) -> Result<Option<Vec<ToolRecord>>, PersistenceError> {
        read_document(&self.tools_path)
    }

    fn save_tools(&self, tools: &[ToolRecord]) -> Result<(), PersistenceError> {
        write_document(&self.tools_path, tools)
    }

    fn load_machines(&self) -> Result<Option<Value>, PersistenceError> {
        read_document(&self.machines_path)
    }

    fn save_machines(&self, machines: &Value) -> Result<(), PersistenceError> {
        write_document(&self.machines_path, machines)
    }

    fn load_tool_types(&self) -> Result<Option<Value>, PersistenceError> {
        read_document(&self.tool_types_path)
    }

    fn save_tool_types(&self, tool_types: &Value) -> Result<(), PersistenceError> {
        write_document(&self.tool_types_path, tool_types)
    }
}
