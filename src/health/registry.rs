//! Health-check registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

/// Outcome of one health check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            message: None,
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: Some(message.into()),
        }
    }
}

/// A named probe of some dependency.
pub trait HealthCheck: Send + Sync + 'static {
    fn check(&self) -> HealthStatus;
}

impl<F> HealthCheck for F
where
    F: Fn() -> HealthStatus + Send + Sync + 'static,
{
    fn check(&self) -> HealthStatus {
        self()
    }
}

/// Registered checks and their latest results.
#[derive(Default)]
pub struct HealthRegistry {
    checks: DashMap<String, Arc<dyn HealthCheck>>,
    results: DashMap<String, HealthStatus>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the check called `name`.
    pub fn register(&self, name: impl Into<String>, check: impl HealthCheck) {
        let name = name.into();
        if self.checks.insert(name.clone(), Arc::new(check)).is_some() {
            tracing::warn!(check = %name, "Health check replaced");
        }
        self.results.remove(&name);
    }

    /// Run every check once and record the results.
    pub fn run_all(&self) -> BTreeMap<String, HealthStatus> {
        // Clone out first so no map shard is locked while a check runs.
        let checks: Vec<(String, Arc<dyn HealthCheck>)> = self
            .checks
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut results = BTreeMap::new();
        for (name, check) in checks {
            let status = check.check();
            if !status.healthy {
                tracing::warn!(check = %name, message = ?status.message, "Health check failed");
            }
            self.results.insert(name.clone(), status.clone());
            results.insert(name, status);
        }
        results
    }

    /// Latest recorded result per check, sorted by name.
    pub fn results(&self) -> BTreeMap<String, HealthStatus> {
        self.results
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// False if any recorded result is unhealthy.
    pub fn is_healthy(&self) -> bool {
        self.results.iter().all(|entry| entry.value().healthy)
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl std::fmt::Debug for HealthRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthRegistry")
            .field("checks", &self.checks.len())
            .field("results", &self.results())
            .finish()
    }
}
