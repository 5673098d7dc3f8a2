//! Serve command implementation.

use c9_server::{C9Server, ServerConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Resolves the effective configuration.
///
/// Starts from the file if one is given, else the defaults; command-line
/// flags win over both.
pub fn resolve_config(
    config_file: Option<&Path>,
    path: Option<PathBuf>,
    bind: Option<SocketAddr>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = match config_file {
        Some(file) => ServerConfig::load(file)?,
        None => ServerConfig::default(),
    };
    if let Some(path) = path {
        config = config.with_data_dir(path);
    }
    if let Some(bind) = bind {
        config = config.with_bind_addr(bind);
    }
    Ok(config)
}

/// Runs the serve command.
pub fn run(
    config_file: Option<&Path>,
    path: Option<PathBuf>,
    bind: Option<SocketAddr>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(config_file, path, bind)?;
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        bind_addr = %config.bind_addr,
        "resolved server configuration"
    );
    let server = C9Server::open(config)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}
