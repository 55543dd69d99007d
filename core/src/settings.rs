//! Process settings from the environment.
//!
//! Two credentials, one testnet toggle, one cadence value, one database
//! location. Nothing else outside the store affects behavior.

use crate::error::CoreError;
use arara_exchange::ExchangeConfig;
use std::env;
use std::time::Duration;

pub const ENV_API_KEY: &str = "ARARA_API_KEY";
pub const ENV_API_SECRET: &str = "ARARA_API_SECRET";
pub const ENV_TESTNET: &str = "ARARA_TESTNET";
pub const ENV_DATABASE_URL: &str = "ARARA_DATABASE_URL";
pub const ENV_CYCLE_SECONDS: &str = "ARARA_CYCLE_SECONDS";

const DEFAULT_DATABASE_URL: &str = "sqlite://arara.db?mode=rwc";
const DEFAULT_CYCLE_SECONDS: u64 = 5;

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub api_secret: String,
    pub testnet: bool,
    pub database_url: String,
    pub cycle_seconds: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self, CoreError> {
        let api_key = require(ENV_API_KEY)?;
        let api_secret = require(ENV_API_SECRET)?;
        let testnet = env::var(ENV_TESTNET)
            .map(|raw| matches!(raw.trim(), "1" | "true" | "TRUE" | "yes"))
            .unwrap_or(false);
        let database_url =
            env::var(ENV_DATABASE_URL).unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let cycle_seconds = match env::var(ENV_CYCLE_SECONDS) {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                CoreError::Settings(format!("{ENV_CYCLE_SECONDS} must be an integer, got {raw:?}"))
            })?,
            Err(_) => DEFAULT_CYCLE_SECONDS,
        };
        if cycle_seconds == 0 {
            return Err(CoreError::Settings(format!(
                "{ENV_CYCLE_SECONDS} must be at least 1"
            )));
        }

        Ok(Self {
            api_key,
            api_secret,
            testnet,
            database_url,
            cycle_seconds,
        })
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_seconds)
    }

    pub fn exchange_config(&self) -> ExchangeConfig {
        ExchangeConfig {
            api_key: self.api_key.clone(),
            secret_key: self.api_secret.clone(),
            testnet: self.testnet,
            ..ExchangeConfig::default()
        }
    }
}

fn require(key: &str) -> Result<String, CoreError> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| CoreError::Settings(format!("missing environment variable {key}")))
}
