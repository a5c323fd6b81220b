//! Core domain layer for monitoring and controlling a local LAMPP stack.
mod controller;
mod dispatcher;
mod layout;
mod probe;
mod registry;
mod resolver;
mod scheduler;
#[cfg(test)]
mod testing;

pub use controller::{
    ControlId, ControlSurface, Deferred, IndicatorIcon, Intent, PendingAction,
    ReconciliationController,
};
pub use dispatcher::{ActionDispatcher, CommandSpawner, DetachedSpawner, PrivilegedCommand, Target};
pub use layout::{DEFAULT_ADMIN_URL, DEFAULT_LAMPP_ROOT, DEFAULT_REFRESH_DELAY, Layout};
pub use probe::{CommandProbe, ProcessProbe};
pub use registry::{MASTER_SERVICE, Service, ServiceRegistry};
pub use resolver::{StatusResolver, parse_status_report, process_names};
pub use scheduler::{Reconciler, ScheduledTask, Scheduler};

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Liveness verdict for a single managed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceStatus {
    Running,
    Stopped,
    /// Neither probe resolved the service. Never treated as `Stopped`.
    Unknown,
}

impl ServiceStatus {
    /// Map a `statusraw` state token onto a status.
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "RUNNING" => ServiceStatus::Running,
            "NOTRUNNING" | "DEACTIVATED" => ServiceStatus::Stopped,
            _ => ServiceStatus::Unknown,
        }
    }

    pub fn is_running(self) -> bool {
        matches!(self, ServiceStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceStatus::Running => "running",
            ServiceStatus::Stopped => "stopped",
            ServiceStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of every registered service as produced by one resolution pass.
///
/// Entries follow registry order. A snapshot is replaced wholesale by the next
/// pass and is never merged with an older one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    entries: Vec<(String, ServiceStatus)>,
}

impl StatusSnapshot {
    /// A snapshot where every registered service is `Unknown`.
    pub fn unknown(registry: &ServiceRegistry) -> Self {
        StatusSnapshot {
            entries: registry
                .services()
                .iter()
                .map(|service| (service.id().to_string(), ServiceStatus::Unknown))
                .collect(),
        }
    }

    pub fn status(&self, service_id: &str) -> ServiceStatus {
        self.entries
            .iter()
            .find(|(id, _)| id == service_id)
            .map(|(_, status)| *status)
            .unwrap_or(ServiceStatus::Unknown)
    }

    pub fn is_running(&self, service_id: &str) -> bool {
        self.status(service_id).is_running()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ServiceStatus)> + '_ {
        self.entries.iter().map(|(id, status)| (id.as_str(), *status))
    }

    /// Only registered ids are stored; anything else is ignored.
    pub(crate) fn set(&mut self, service_id: &str, status: ServiceStatus) {
        if let Some(entry) = self.entries.iter_mut().find(|(id, _)| id == service_id) {
            entry.1 = status;
        }
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{probe} probe unavailable ({program:?}): {source}")]
    ProbeUnavailable {
        probe: &'static str,
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing asset: {0:?}")]
    MissingAsset(PathBuf),

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("invalid value {value:?} for {name}: {message}")]
    InvalidSetting {
        name: &'static str,
        value: String,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;
