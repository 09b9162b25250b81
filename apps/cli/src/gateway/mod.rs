//! Persistence gateway backends for the CLI.

pub mod file;
pub mod remote;

pub use file::FileGateway;
pub use remote::RemoteGateway;

use crate::config::Config;
use anyhow::Result;
use quizdrill_core::gateway::PersistenceGateway;

/// Pick the backend: remote row store when an endpoint is configured,
/// local row file otherwise.
pub fn from_config(config: &Config) -> Result<Box<dyn PersistenceGateway>> {
    match &config.remote_url {
        Some(url) => {
            tracing::info!(url, "using remote progress store");
            Ok(Box::new(RemoteGateway::new(
                url.clone(),
                config.remote_token.clone(),
            )?))
        }
        None => {
            tracing::info!(path = %config.data_path.display(), "using local progress file");
            Ok(Box::new(FileGateway::new(config.data_path.clone())))
        }
    }
}
