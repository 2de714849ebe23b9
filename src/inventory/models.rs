//! Inventory data types and their wire representation.
//!
//! Field names follow the browser clients (`cellNumber`, `toolType`, ...),
//! so every struct here is serialized in camelCase.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Accepts either a JSON string or a JSON number, the clients send both.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn deserialize_loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn deserialize_optional_loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(String::from))
}

/// Identifier of a cell on a machine.
///
/// Clients send it either as a number or as a string; it is normalized to a
/// string once, on the way in, and cells are compared by string equality.
/// `3` and `"3"` are the same cell, `"03"` is a different one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CellNumber(String);

impl<'de> Deserialize<'de> for CellNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_loose_string(deserializer).map(CellNumber)
    }
}

impl CellNumber {
    pub fn new(value: impl Into<String>) -> Self {
        CellNumber(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for CellNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CellNumber {
    fn from(value: &str) -> Self {
        CellNumber::new(value)
    }
}

impl From<u32> for CellNumber {
    fn from(value: u32) -> Self {
        CellNumber(value.to_string())
    }
}

/// A tool occupying one cell of one machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRecord {
    #[serde(
        default,
        deserialize_with = "deserialize_optional_loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub machine: String,
    pub cell_number: CellNumber,
    #[serde(default)]
    pub tool_type: String,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<String>,
    /// Whatever else the client attached to the record, kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolRecord {
    pub fn occupies(&self, machine: &str, cell_number: &CellNumber) -> bool {
        self.machine == machine && &self.cell_number == cell_number
    }
}

/// Body of an add request, before validation.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTool {
    #[serde(default)]
    pub machine: Option<String>,
    #[serde(default)]
    pub cell_number: Option<CellNumber>,
    #[serde(default)]
    pub tool_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_loose_string")]
    pub tool_size: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewTool {
    pub fn new(
        machine: impl Into<String>,
        cell_number: impl Into<CellNumber>,
        tool_type: impl Into<String>,
    ) -> Self {
        NewTool {
            machine: Some(machine.into()),
            cell_number: Some(cell_number.into()),
            tool_type: Some(tool_type.into()),
            ..Default::default()
        }
    }

    pub fn with_size(mut self, tool_size: impl Into<String>) -> Self {
        self.tool_size = Some(tool_size.into());
        self
    }
}

/// Body of a sync request. Every part is optional; absent parts are left
/// untouched. Unknown top-level fields (clients post their whole local
/// database) are ignored.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    #[serde(default)]
    pub tools: Option<Vec<ToolRecord>>,
    #[serde(default)]
    pub machines: Option<Value>,
    #[serde(default)]
    pub tool_types: Option<Value>,
}

impl SyncPayload {
    pub fn is_empty(&self) -> bool {
        self.tools.is_none() && self.machines.is_none() && self.tool_types.is_none()
    }
}

/// Result of a sync or replace-all operation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SyncOutcome {
    pub tools_count: usize,
    pub timestamp: f64,
}

/// Everything a freshly connected client needs, read in one go.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySnapshot {
    pub tools: Vec<ToolRecord>,
    pub machines: Value,
    pub tool_types: Value,
    pub timestamp: f64,
}

pub fn empty_machines() -> Value {
    Value::Array(Vec::new())
}

pub fn empty_tool_types() -> Value {
    Value::Object(Map::new())
}
