pub mod access_gate;
mod api_error;
pub mod config;
mod http_layers;
#[allow(clippy::module_inception)]
pub mod server;
pub mod state;

pub use access_gate::{detect_server_ip, AccessGate};
pub use api_error::ApiError;
pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
