use std::sync::Arc;
use std::time::Duration;

use domains::IdentityVerifier;
use services::Services;

use crate::metrics::Metrics;

/// Shared by every handler; cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub identity: Arc<dyn IdentityVerifier>,
    pub metrics: Arc<Metrics>,
    /// Upper bound on a single token verification
    pub verify_timeout: Duration,
}

impl AppState {
    pub fn new(services: Services, identity: Arc<dyn IdentityVerifier>, metrics: Arc<Metrics>) -> Self {
        Self { services, identity, metrics, verify_timeout: Duration::from_secs(2) }
    }

    pub fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }
}
