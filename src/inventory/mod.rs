//! The shop-floor tool inventory: which tool sits in which cell of which
//! machine, plus the change feed that keeps viewers in step.

mod changelog;
mod models;
mod store;

pub use changelog::{
    unix_timestamp_secs, ChangeEvent, ChangeKind, ChangeLog, MAX_RETAINED_CHANGES,
};
pub use models::{
    empty_machines, empty_tool_types, CellNumber, InventorySnapshot, NewTool, SyncOutcome,
    SyncPayload, ToolRecord,
};
pub use store::{ChangesPage, InventoryError, OccupancyStore};
