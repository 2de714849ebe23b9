use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

use super::changelog::{ChangeEvent, ChangeKind, ChangeLog};
use super::models::{
    empty_machines, empty_tool_types, CellNumber, InventorySnapshot, NewTool, SyncOutcome,
    SyncPayload, ToolRecord,
};
use crate::persistence::{InventoryPersistence, PersistenceError};

#[derive(Debug, Error, PartialEq)]
pub enum InventoryError {
    #[error("Cell already occupied")]
    CellOccupied {
        machine: String,
        cell_number: CellNumber,
    },

    #[error("Invalid tool: {0}")]
    Validation(String),
}

/// Answer to a change-feed poll.
#[derive(Clone, Debug, Serialize)]
pub struct ChangesPage {
    pub changes: Vec<ChangeEvent>,
    pub current_timestamp: f64,
    pub tools_count: usize,
}

struct Inventory {
    tools: Vec<ToolRecord>,
    machines: Value,
    tool_types: Value,
    changelog: ChangeLog,
    /// Bumped on every mutation, identifies the snapshots handed to the writer.
    generation: u64,
}

/// Copy of the parts of the inventory a mutation changed, to be written to
/// disk once the inventory lock is released.
#[derive(Default)]
struct PendingSave {
    generation: u64,
    tools: Option<Vec<ToolRecord>>,
    machines: Option<Value>,
    tool_types: Option<Value>,
}

/// Newest generation written for each document.
#[derive(Default)]
struct WrittenGenerations {
    tools: u64,
    machines: u64,
    tool_types: u64,
}

/// The authoritative tool table.
///
/// All reads and writes of the table, the catalogs and the change log go
/// through one lock, so a poller never sees an event without the state change
/// it describes. Disk writes happen after that lock is released, serialized by
/// a second lock that also drops snapshots older than the last one written.
pub struct OccupancyStore {
    inventory: Mutex<Inventory>,
    written: Mutex<WrittenGenerations>,
    persistence: Arc<dyn InventoryPersistence>,
}

fn load_or_default<T>(
    what: &str,
    loaded: Result<Option<T>, PersistenceError>,
    default: impl FnOnce() -> T,
) -> T {
    match loaded {
        Ok(Some(value)) => value,
        Ok(None) => {
            info!("No stored {} found, starting empty", what);
            default()
        }
        Err(err) => {
            error!("Could not load stored {}, starting empty: {}", what, err);
            default()
        }
    }
}

fn require_text(field: &str, value: Option<String>) -> Result<String, InventoryError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(InventoryError::Validation(format!("{} is required", field))),
    }
}

impl OccupancyStore {
    /// Builds the store from whatever `persistence` holds. Missing or
    /// unreadable documents are logged and start out empty.
    pub fn open(persistence: Arc<dyn InventoryPersistence>) -> OccupancyStore {
        let tools = load_or_default("tools", persistence.load_tools(), Vec::new);
        let machines = load_or_default("machines", persistence.load_machines(), empty_machines);
        let tool_types =
            load_or_default("tool types", persistence.load_tool_types(), empty_tool_types);

        OccupancyStore {
            inventory: Mutex::new(Inventory {
                tools,
                machines,
                tool_types,
                changelog: ChangeLog::default(),
                generation: 0,
            }),
            written: Mutex::new(WrittenGenerations::default()),
            persistence,
        }
    }

    fn lock_inventory(&self) -> MutexGuard<'_, Inventory> {
        self.inventory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// All records, in insertion order.
    pub fn list(&self) -> Vec<ToolRecord> {
        self.lock_inventory().tools.clone()
    }

    pub fn tools_count(&self) -> usize {
        self.lock_inventory().tools.len()
    }

    /// Places a tool into a free cell and returns its generated id.
    pub fn add(&self, new_tool: NewTool) -> Result<String, InventoryError> {
        let machine = require_text("machine", new_tool.machine)?;
        let cell_number = match new_tool.cell_number {
            Some(cell_number) if !cell_number.is_blank() => cell_number,
            _ => {
                return Err(InventoryError::Validation(
                    "cellNumber is required".to_string(),
                ))
            }
        };
        let tool_type = require_text("toolType", new_tool.tool_type)?;
        let tool_size = new_tool.tool_size.filter(|size| !size.trim().is_empty());
        let mut extra = new_tool.extra;
        extra.remove("id");
        extra.remove("dateAdded");

        let (id, pending) = {
            let mut inventory = self.lock_inventory();
            if inventory
                .tools
                .iter()
                .any(|tool| tool.occupies(&machine, &cell_number))
            {
                debug!("Cell {} on {} is already occupied", cell_number, machine);
                return Err(InventoryError::CellOccupied {
                    machine,
                    cell_number,
                });
            }

            let added_at = inventory.changelog.tick();
            let id = format!(
                "{}-{}-{}",
                machine,
                cell_number,
                (added_at * 1_000_000.0).round() as i64
            );
            let record = ToolRecord {
                id: Some(id.clone()),
                machine,
                cell_number,
                tool_type,
                tool_size,
                date_added: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
                extra,
            };
            inventory.tools.push(record.clone());
            inventory.changelog.record(ChangeKind::Add { tool: record });
            (id, Self::pending_tools(&mut inventory))
        };

        info!("Added tool {}", id);
        self.write(pending);
        Ok(id)
    }

    /// Removes every record in the given cell. Returns how many were removed;
    /// an empty cell is not an error.
    pub fn delete(&self, machine: &str, cell_number: &CellNumber) -> usize {
        let (removed, pending) = {
            let mut inventory = self.lock_inventory();
            let before = inventory.tools.len();
            inventory
                .tools
                .retain(|tool| !tool.occupies(machine, cell_number));
            let removed = before - inventory.tools.len();
            if removed == 0 {
                return 0;
            }

            inventory.changelog.record(ChangeKind::Delete {
                machine: machine.to_string(),
                cell_number: cell_number.clone(),
            });
            (removed, Self::pending_tools(&mut inventory))
        };

        info!(
            "Removed {} tool(s) from cell {} on {}",
            removed, cell_number, machine
        );
        self.write(pending);
        removed
    }

    /// Installs `tools` as the whole table, as sent. Nothing is validated:
    /// the syncing client is the source of truth.
    pub fn replace_all(&self, tools: Vec<ToolRecord>) -> SyncOutcome {
        self.sync(SyncPayload {
            tools: Some(tools),
            ..Default::default()
        })
    }

    /// Applies whichever parts of `payload` are present, in one critical
    /// section, and records a single `sync` event.
    pub fn sync(&self, payload: SyncPayload) -> SyncOutcome {
        if payload.is_empty() {
            debug!("Sync carried no data, only the change feed moves");
        }

        let (outcome, pending) = {
            let mut inventory = self.lock_inventory();
            inventory.generation += 1;
            let mut pending = PendingSave {
                generation: inventory.generation,
                ..Default::default()
            };

            if let Some(tools) = payload.tools {
                inventory.tools = tools;
                pending.tools = Some(inventory.tools.clone());
            }
            if let Some(machines) = payload.machines {
                pending.machines = Some(machines.clone());
                inventory.machines = machines;
            }
            if let Some(tool_types) = payload.tool_types {
                pending.tool_types = Some(tool_types.clone());
                inventory.tool_types = tool_types;
            }

            let tools_count = inventory.tools.len();
            let timestamp = inventory
                .changelog
                .record(ChangeKind::Sync { tools_count });
            (
                SyncOutcome {
                    tools_count,
                    timestamp,
                },
                pending,
            )
        };

        info!("Synced inventory, {} tools", outcome.tools_count);
        self.write(pending);
        outcome
    }

    /// Changes recorded after `since`, plus the timestamp to poll with next.
    pub fn changes_since(&self, since: f64) -> ChangesPage {
        let mut inventory = self.lock_inventory();
        let changes = inventory.changelog.since(since);
        if let Some(oldest) = inventory.changelog.oldest_timestamp() {
            if since > 0.0 && since < oldest {
                debug!("Poller at {} is behind the retained changes", since);
            }
        }
        ChangesPage {
            changes,
            current_timestamp: inventory.changelog.tick(),
            tools_count: inventory.tools.len(),
        }
    }

    pub fn full_data(&self) -> InventorySnapshot {
        let mut inventory = self.lock_inventory();
        InventorySnapshot {
            tools: inventory.tools.clone(),
            machines: inventory.machines.clone(),
            tool_types: inventory.tool_types.clone(),
            timestamp: inventory.changelog.tick(),
        }
    }

    /// Re-saves the tool table if it is not empty. Returns whether a save was
    /// attempted.
    pub fn persist_snapshot(&self) -> bool {
        let pending = {
            let inventory = self.lock_inventory();
            if inventory.tools.is_empty() {
                return false;
            }
            PendingSave {
                generation: inventory.generation,
                tools: Some(inventory.tools.clone()),
                ..Default::default()
            }
        };
        self.write(pending);
        true
    }

    fn pending_tools(inventory: &mut Inventory) -> PendingSave {
        inventory.generation += 1;
        PendingSave {
            generation: inventory.generation,
            tools: Some(inventory.tools.clone()),
            ..Default::default()
        }
    }

    fn write(&self, pending: PendingSave) {
        let mut written = self
            .written
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(tools) = pending.tools {
            if pending.generation < written.tools {
                debug!("Skipping stale tools snapshot {}", pending.generation);
            } else {
                match self.persistence.save_tools(&tools) {
                    Ok(()) => written.tools = pending.generation,
                    Err(err) => error!("Failed to save tools: {}", err),
                }
            }
        }

        if let Some(machines) = pending.machines {
            if pending.generation < written.machines {
                debug!("Skipping stale machines snapshot {}", pending.generation);
            } else {
                match self.persistence.save_machines(&machines) {
                    Ok(()) => written.machines = pending.generation,
                    Err(err) => error!("Failed to save machines: {}", err),
                }
            }
        }

        if let Some(tool_types) = pending.tool_types {
            if pending.generation < written.tool_types {
                debug!("Skipping stale tool types snapshot {}", pending.generation);
            } else {
                match self.persistence.save_tool_types(&tool_types) {
                    Ok(()) => written.tool_types = pending.generation,
                    Err(err) => error!("Failed to save tool types: {}", err),
                }
            }
        }
    }
}
