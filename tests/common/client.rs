//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all toolcrib-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::{Method, Response};
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client
#[derive(Clone)]
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ========================================================================
    // Tools
    // ========================================================================

    /// GET /api/tools
    pub async fn list_tools(&self) -> Response {
        self.client
            .get(self.url("/api/tools"))
            .send()
            .await
            .expect("List tools request failed")
    }

    /// GET /api/tools, decoded
    pub async fn tools(&self) -> Vec<Value> {
        self.list_tools()
            .await
            .json()
            .await
            .expect("Tool list is not JSON")
    }

    /// POST /api/tools with an arbitrary body
    pub async fn add_tool_json(&self, body: Value) -> Response {
        self.client
            .post(self.url("/api/tools"))
            .json(&body)
            .send()
            .await
            .expect("Add tool request failed")
    }

    /// POST /api/tools for the usual machine/cell/type triple
    pub async fn add_tool(&self, machine: &str, cell_number: &str, tool_type: &str) -> Response {
        self.add_tool_json(json!({
            "machine": machine,
            "cellNumber": cell_number,
            "toolType": tool_type,
        }))
        .await
    }

    /// GET /api/delete?cell=..&machine=..
    pub async fn delete_tool(&self, machine: &str, cell_number: &str) -> Response {
        self.client
            .get(self.url("/api/delete"))
            .query(&[("cell", cell_number), ("machine", machine)])
            .send()
            .await
            .expect("Delete tool request failed")
    }

    // ========================================================================
    // Sync and change feed
    // ========================================================================

    /// POST /api/sync
    pub async fn sync(&self, body: Value) -> Response {
        self.client
            .post(self.url("/api/sync"))
            .json(&body)
            .send()
            .await
            .expect("Sync request failed")
    }

    /// GET /api/changes, with `since` passed through verbatim when given
    pub async fn get_changes(&self, since: Option<&str>) -> Response {
        let mut request = self.client.get(self.url("/api/changes"));
        if let Some(since) = since {
            request = request.query(&[("since", since)]);
        }
        request.send().await.expect("Changes request failed")
    }

    /// GET /api/changes?since=.., decoded
    pub async fn changes_since(&self, since: f64) -> Value {
        self.get_changes(Some(&since.to_string()))
            .await
            .json()
            .await
            .expect("Changes page is not JSON")
    }

    // ========================================================================
    // Misc
    // ========================================================================

    /// GET /api/full-data
    pub async fn get_full_data(&self) -> Response {
        self.client
            .get(self.url("/api/full-data"))
            .send()
            .await
            .expect("Full data request failed")
    }

    /// GET /api/ping
    pub async fn ping(&self) -> Response {
        self.client
            .get(self.url("/api/ping"))
            .send()
            .await
            .expect("Ping request failed")
    }

    /// GET on any path
    pub async fn get_path(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// OPTIONS preflight on any path
    pub async fn preflight(&self, path: &str) -> Response {
        self.client
            .request(Method::OPTIONS, self.url(path))
            .header("Origin", "http://tablet.local")
            .header("Access-Control-Request-Method", "POST")
            .send()
            .await
            .expect("Preflight request failed")
    }
}
