use anyhow::Result;
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use toolcrib_server::config;
use toolcrib_server::inventory::OccupancyStore;
use toolcrib_server::persistence::{spawn_autosave, JsonFilePersistence};
use toolcrib_server::server::{detect_server_ip, run_server, AccessGate, RequestsLoggingLevel};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding tools_data.json, machines_data.json and tool_types_data.json.
    #[clap(long, value_parser = parse_dir, default_value = ".")]
    pub data_dir: PathBuf,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 8000)]
    pub port: u16,

    /// The address to listen on.
    #[clap(long, default_value = "0.0.0.0")]
    pub bind_address: String,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Seconds between periodic saves of the inventory. Set to 0 to disable.
    #[clap(long, default_value_t = 300)]
    pub autosave_interval_sec: u64,

    /// Address treated as this machine by the admin page check.
    /// Detected from the outbound interface when not given.
    #[clap(long)]
    pub server_ip: Option<String>,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            data_dir: Some(args.data_dir.clone()),
            port: args.port,
            bind_address: args.bind_address.clone(),
            logging_level: args.logging_level.clone(),
            frontend_dir_path: args.frontend_dir_path.clone(),
            autosave_interval_sec: args.autosave_interval_sec,
            server_ip: args.server_ip.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  data_dir: {:?}", app_config.data_dir);
    info!("  port: {}", app_config.port);
    info!("  logging_level: {}", app_config.logging_level);

    let persistence = JsonFilePersistence::from_paths(
        app_config.tools_path(),
        app_config.machines_path(),
        app_config.tool_types_path(),
    );
    let store = Arc::new(OccupancyStore::open(Arc::new(persistence)));
    info!("Loaded {} tool record(s)", store.tools_count());

    let server_ip = app_config.server_ip.unwrap_or_else(detect_server_ip);
    let access_gate = Arc::new(AccessGate::new(server_ip));

    if let Some(interval) = app_config.autosave_interval() {
        spawn_autosave(store.clone(), interval);
    }

    info!("Local:   {}", app_config.local_url());
    info!("Network: {}", app_config.network_url(server_ip));
    info!("Admin pages only open from this machine");

    run_server(app_config.server_config(), store, access_gate).await
}
