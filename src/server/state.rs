use axum::extract::FromRef;

use crate::inventory::OccupancyStore;
use std::sync::Arc;
use std::time::Instant;

use super::access_gate::AccessGate;
use super::ServerConfig;

pub type GuardedOccupancyStore = Arc<OccupancyStore>;
pub type GuardedAccessGate = Arc<AccessGate>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub store: GuardedOccupancyStore,
    pub access_gate: GuardedAccessGate,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        store: GuardedOccupancyStore,
        access_gate: GuardedAccessGate,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            store,
            access_gate,
        }
    }
}

impl FromRef<ServerState> for GuardedOccupancyStore {
    fn from_ref(input: &ServerState) -> Self {
        input.store.clone()
    }
}

impl FromRef<ServerState> for GuardedAccessGate {
    fn from_ref(input: &ServerState) -> Self {
        input.access_gate.clone()
    }
}
