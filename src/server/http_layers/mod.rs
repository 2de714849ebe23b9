mod cors;
mod host_gate;
mod no_cache;
mod requests_logging;

pub use cors::cors;
pub use host_gate::host_only_admin;
pub use no_cache::no_cache;
pub use requests_logging::{log_requests, RequestsLoggingLevel};
