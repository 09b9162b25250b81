//! quizdrill: adaptive multiple-choice drill trainer.

use anyhow::{Context, Result};
use clap::Parser;
use quizdrill::config::{Cli, Config};
use quizdrill::{gateway, repl};
use quizdrill_core::bank::{self, DropReason};
use quizdrill_core::session::Session;
use quizdrill_core::types::Question;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::resolve(cli)?;

    let bank = bank::load(&config.bank_path).with_context(|| {
        format!("loading question bank from {}", config.bank_path.display())
    })?;
    for drop in &bank.dropped {
        match drop.reason {
            DropReason::LetterMismatch => {
                tracing::warn!(record = drop.index, "dropped: {}", drop.reason)
            }
            _ => tracing::debug!(record = drop.index, "dropped: {}", drop.reason),
        }
    }
    let questions = bank.questions;
    let multi = questions.iter().filter(|q| q.is_multi_select()).count();
    tracing::info!(total = questions.len(), multi, "question bank loaded");
    let questions: Arc<[Question]> = questions.into();

    let gateway = gateway::from_config(&config)?;

    let user_id = match &config.user {
        Some(user) => user.clone(),
        None => repl::prompt_user_id()?,
    };

    let (session, report) = Session::start(&user_id, questions, gateway, config.session_config())
        .context("starting session")?;

    repl::run(session, report)
}
