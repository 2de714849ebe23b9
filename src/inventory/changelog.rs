//! Bounded log of recent inventory changes.
//!
//! Polling clients remember the timestamp of their last poll and ask only for
//! what happened after it. The log is lossy: once more than
//! [`MAX_RETAINED_CHANGES`] events were recorded the oldest ones are gone, and
//! a client that fell that far behind has to reload the full table.

use serde::Serialize;
use std::collections::VecDeque;

use super::models::{CellNumber, ToolRecord};

/// How many events the log keeps around.
pub const MAX_RETAINED_CHANGES: usize = 100;

/// Smallest step between two consecutive clock ticks, in seconds.
const MIN_TICK_STEP_SECS: f64 = 0.000_001;

/// Current wall clock as fractional seconds since the Unix epoch.
pub fn unix_timestamp_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// What happened in a change.
///
/// Serialized with an internal `type` tag: `{"type": "add", "tool": {...}}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChangeKind {
    Add {
        tool: ToolRecord,
    },
    Delete {
        machine: String,
        #[serde(rename = "cellNumber")]
        cell_number: CellNumber,
    },
    Sync {
        tools_count: usize,
    },
}

impl ChangeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChangeKind::Add { .. } => "add",
            ChangeKind::Delete { .. } => "delete",
            ChangeKind::Sync { .. } => "sync",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChangeEvent {
    #[serde(flatten)]
    pub kind: ChangeKind,
    pub timestamp: f64,
}

pub struct ChangeLog {
    events: VecDeque<ChangeEvent>,
    capacity: usize,
    last_tick: f64,
}

impl Default for ChangeLog {
    fn default() -> Self {
        ChangeLog::with_capacity(MAX_RETAINED_CHANGES)
    }
}

impl ChangeLog {
    pub fn with_capacity(capacity: usize) -> Self {
        ChangeLog {
            events: VecDeque::with_capacity(capacity + 1),
            capacity,
            last_tick: 0.0,
        }
    }

    /// Returns the current time, strictly greater than any value returned
    /// before by this log.
    ///
    /// Event timestamps and the `current_timestamp` handed to polling clients
    /// both come from here, so a client polling with the value it was given
    /// never skips an event recorded afterwards.
    pub fn tick(&mut self) -> f64 {
        let now = unix_timestamp_secs();
        let tick = if now > self.last_tick {
            now
        } else {
            self.last_tick + MIN_TICK_STEP_SECS
        };
        self.last_tick = tick;
        tick
    }

    /// Adds an event at the tail, evicting from the head past capacity.
    pub fn append(&mut self, event: ChangeEvent) {
        if event.timestamp > self.last_tick {
            self.last_tick = event.timestamp;
        }
        self.events.push_back(event);
        while self.events.len() > self.capacity {
            self.events.pop_front();
        }
    }

    /// Stamps `kind` with a fresh tick and appends it.
    pub fn record(&mut self, kind: ChangeKind) -> f64 {
        let timestamp = self.tick();
        self.append(ChangeEvent { kind, timestamp });
        timestamp
    }

    /// Retained events strictly newer than `timestamp`, oldest first.
    pub fn since(&self, timestamp: f64) -> Vec<ChangeEvent> {
        self.events
            .iter()
            .filter(|event| event.timestamp > timestamp)
            .cloned()
            .collect()
    }

    pub fn oldest_timestamp(&self) -> Option<f64> {
        self.events.front().map(|event| event.timestamp)
    }
}
