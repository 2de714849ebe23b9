//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own data directory.

use super::constants::*;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use toolcrib_server::inventory::OccupancyStore;
use toolcrib_server::persistence::JsonFilePersistence;
use toolcrib_server::server::{make_app, AccessGate, RequestsLoggingLevel, ServerConfig};

/// Test server instance backed by JSON files in a temporary directory
///
/// When dropped, the server gracefully shuts down and the directory is removed.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// The store behind the server, for direct inspection in tests
    pub store: Arc<OccupancyStore>,

    // Private fields - keep resources alive until drop
    temp_data_dir: Option<TempDir>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    serve_handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port with an empty data directory
    pub async fn spawn() -> Self {
        let temp_data_dir = TempDir::new().expect("Failed to create data dir");
        Self::spawn_in(temp_data_dir).await
    }

    /// Spawns a test server that loads whatever `temp_data_dir` already holds
    ///
    /// This function:
    /// 1. Opens the JSON files in the data directory
    /// 2. Binds to a random port (127.0.0.1:0)
    /// 3. Spawns the server in a background task
    /// 4. Waits for the server to be ready
    pub async fn spawn_in(temp_data_dir: TempDir) -> Self {
        let persistence = JsonFilePersistence::new(temp_data_dir.path());
        let store = Arc::new(OccupancyStore::open(Arc::new(persistence)));
        let access_gate = Arc::new(AccessGate::new(IpAddr::V4(Ipv4Addr::new(
            192, 168, 1, 20,
        ))));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            ..Default::default()
        };
        let app = make_app(config, store.clone(), access_gate);

        // Spawn server in background task with graceful shutdown
        let serve_handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            store,
            temp_data_dir: Some(temp_data_dir),
            shutdown_tx: Some(shutdown_tx),
            serve_handle: Some(serve_handle),
        };

        server.wait_for_ready().await;

        server
    }

    /// Path of the data directory the server reads and writes
    pub fn data_dir(&self) -> &std::path::Path {
        self.temp_data_dir
            .as_ref()
            .expect("Data dir already handed back")
            .path()
    }

    /// Stops the server and hands back its data directory for a restart
    pub async fn shutdown(mut self) -> TempDir {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.serve_handle.take() {
            handle.await.expect("Server task panicked");
        }
        self.temp_data_dir
            .take()
            .expect("Data dir already handed back")
    }

    /// Waits for the server to become ready by polling the /api/ping endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client
                .get(format!("{}/api/ping", self.base_url))
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        // TempDir will be cleaned up automatically
    }
}
