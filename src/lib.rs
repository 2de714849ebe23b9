//! Toolcrib Server Library
//!
//! Shop-floor tool inventory: which tool sits in which machine cell.
//! The library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod inventory;
pub mod persistence;
pub mod server;

// Re-export commonly used types for convenience
pub use inventory::{CellNumber, InventoryError, OccupancyStore, ToolRecord};
pub use persistence::{InventoryPersistence, JsonFilePersistence, NullPersistence};
pub use server::{make_app, run_server, AccessGate, RequestsLoggingLevel, ServerConfig};
