pub mod api;
pub mod claims;
pub mod config;
pub mod engine;
pub mod error;
pub mod gitlab;
pub mod guard;
pub mod logging;
pub mod pipeline;
pub mod trigger;
pub mod utils;
pub mod webhook;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

use config::BridgeConfig;
use engine::TriggerEngine;
use error::Result;

pub struct AppState {
    pub config: BridgeConfig,
    pub engine: TriggerEngine,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: BridgeConfig) -> Result<Self> {
        let engine = TriggerEngine::new(&config)?;
        Ok(Self {
            config,
            engine,
            start_time: Instant::now(),
            started_at: Utc::now(),
        })
    }
}

pub type SharedState = Arc<AppState>;
