//! The system-status gate.
//!
//! One persisted toggle. The orchestrator checks it before invoking the
//! executor; `start()` / `stop()` (wired to the CLI) are its only mutators.
//! Absent or unrecognized values default to running.

use crate::error::CoreError;
use arara_store::Store;
use std::fmt;
use tracing::warn;

pub const SYSTEM_STATUS_KEY: &str = "system_status.status";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    Running,
    Stopped,
}

impl SystemStatus {
    fn as_str(&self) -> &'static str {
        match self {
            SystemStatus::Running => "running",
            SystemStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persistent running/stopped toggle over the config store.
#[derive(Debug, Clone)]
pub struct SystemStatusGate {
    store: Store,
}

impl SystemStatusGate {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn status(&self) -> Result<SystemStatus, CoreError> {
        match self.store.config_get(SYSTEM_STATUS_KEY).await?.as_deref() {
            None | Some("running") => Ok(SystemStatus::Running),
            Some("stopped") => Ok(SystemStatus::Stopped),
            Some(other) => {
                warn!(value = other, "unrecognized system status; assuming running");
                Ok(SystemStatus::Running)
            }
        }
    }

    pub async fn start(&self) -> Result<(), CoreError> {
        self.set(SystemStatus::Running).await
    }

    pub async fn stop(&self) -> Result<(), CoreError> {
        self.set(SystemStatus::Stopped).await
    }

    async fn set(&self, status: SystemStatus) -> Result<(), CoreError> {
        self.store
            .config_set(SYSTEM_STATUS_KEY, status.as_str())
            .await?;
        Ok(())
    }
}
