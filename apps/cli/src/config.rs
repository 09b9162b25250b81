//! Command-line arguments and runtime configuration.

use anyhow::Result;
use clap::Parser;
use quizdrill_core::session::{SessionConfig, WritePolicy};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "quizdrill", version, about = "Adaptive multiple-choice drill trainer")]
pub struct Cli {
    /// Question bank JSON file
    #[arg(long)]
    pub bank: Option<PathBuf>,

    /// Local progress file (ignored when --remote-url is set)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Row-store HTTP endpoint for remote progress
    #[arg(long)]
    pub remote_url: Option<String>,

    /// Bearer token for the remote row store
    #[arg(long)]
    pub token: Option<String>,

    /// Questions per normal round
    #[arg(long, default_value_t = 50)]
    pub batch_size: usize,

    /// Maximum questions per error-drill round
    #[arg(long, default_value_t = 100)]
    pub drill_size: usize,

    /// Persist after every Nth answer (1 = after every answer)
    #[arg(long, default_value_t = 1)]
    pub save_every: u32,

    /// User id (prompted when omitted)
    #[arg(long)]
    pub user: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bank_path: PathBuf,
    pub data_path: PathBuf,
    pub remote_url: Option<String>,
    pub remote_token: Option<String>,
    pub batch_size: usize,
    pub error_batch_size: usize,
    pub save_every: u32,
    pub user: Option<String>,
}

impl Config {
    pub fn resolve(cli: Cli) -> Result<Self> {
        let bank_path = cli
            .bank
            .or_else(|| env_path("QUIZDRILL_BANK"))
            .unwrap_or_else(|| PathBuf::from("question_bank.json"));

        let data_path = cli
            .data
            .or_else(|| env_path("QUIZDRILL_DATA"))
            .unwrap_or_else(default_data_path);

        let remote_url = cli
            .remote_url
            .or_else(|| std::env::var("QUIZDRILL_REMOTE_URL").ok())
            .filter(|url| !url.trim().is_empty());
        let remote_token = cli
            .token
            .or_else(|| std::env::var("QUIZDRILL_TOKEN").ok())
            .filter(|token| !token.trim().is_empty());

        Ok(Self {
            bank_path,
            data_path,
            remote_url,
            remote_token,
            batch_size: cli.batch_size.max(1),
            error_batch_size: cli.drill_size.max(1),
            save_every: cli.save_every.max(1),
            user: cli.user.filter(|user| !user.trim().is_empty()),
        })
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            batch_size: self.batch_size,
            error_batch_size: self.error_batch_size,
            write_policy: if self.save_every <= 1 {
                WritePolicy::EveryAnswer
            } else {
                WritePolicy::EveryNth(self.save_every)
            },
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().map(PathBuf::from)
}

fn default_data_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("quizdrill").join("progress.json"))
        .unwrap_or_else(|| PathBuf::from("quizdrill_progress.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_user_flag_falls_back_to_prompting() {
        let cli = Cli::parse_from(["quizdrill", "--user", "   "]);
        let config = Config::resolve(cli).unwrap();
        assert_eq!(config.user, None);

        let cli = Cli::parse_from(["quizdrill", "--user", "ann"]);
        let config = Config::resolve(cli).unwrap();
        assert_eq!(config.user.as_deref(), Some("ann"));
    }
}
