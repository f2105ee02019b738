//! Location providers and the registry that selects between them
//!
//! Every data source implements [`LocationProvider`]. The
//! [`ProviderRegistry`] decides which providers may run for a request,
//! picks between them with weight-squared sampling and fetches candidates
//! while isolating slow or failing providers.

use async_trait::async_trait;
use rand::RngExt;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::models::{ConditionsGate, Coordinates, LocationCandidate, ProviderConditions};

pub mod catalog;
pub mod dark_sky;
pub mod error;
pub mod geoapify;
pub mod google_places;
pub mod hiking;
pub mod http;
pub mod rate_limit;
pub mod registry;

pub use catalog::{describe, register_defaults};
pub use dark_sky::DarkSkyProvider;
pub use error::ProviderError;
pub use geoapify::GeoapifyProvider;
pub use http::HttpContext;
pub use google_places::GooglePlacesProvider;
pub use hiking::HikingProvider;
pub use rate_limit::RateLimiter;
pub use registry::{ProviderRegistry, RegistryStats};

/// Where and how much to search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_miles: f64,
    /// Maximum number of candidates a single search should return
    pub limit: usize,
}

impl SearchParams {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, radius_miles: f64, limit: usize) -> Self {
        Self {
            latitude,
            longitude,
            radius_miles,
            limit,
        }
    }

    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    #[must_use]
    pub fn radius_meters(&self) -> f64 {
        self.radius_miles * 1609.34
    }
}

/// Successful result of a provider search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub candidates: Vec<LocationCandidate>,
    /// External API calls spent on this search (0 when served from cache)
    pub api_calls: u32,
}

impl SearchOutcome {
    #[must_use]
    pub fn new(candidates: Vec<LocationCandidate>, api_calls: u32) -> Self {
        Self {
            candidates,
            api_calls,
        }
    }

    #[must_use]
    pub fn cached(candidates: Vec<LocationCandidate>) -> Self {
        Self::new(candidates, 0)
    }
}

/// Static registration data of a provider
#[derive(Debug)]
pub struct ProviderRegistration {
    pub name: String,
    /// Unique key inside a registry
    pub type_tag: String,
    /// Relative selection likelihood, must be positive
    pub weight: f64,
    pub gate: ConditionsGate,
    enabled: AtomicBool,
}

impl ProviderRegistration {
    pub fn new(name: impl Into<String>, type_tag: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            type_tag: type_tag.into(),
            weight,
            gate: ConditionsGate::default(),
            enabled: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn with_gate(mut self, gate: ConditionsGate) -> Self {
        self.gate = gate;
        self
    }

    #[must_use]
    pub fn disabled(self) -> Self {
        self.enabled.store(false, Ordering::Relaxed);
        self
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

/// Capability interface shared by every location data source
#[async_trait]
pub trait LocationProvider: Send + Sync {
    fn registration(&self) -> &ProviderRegistration;

    /// Whether the external dependency is usable (credentials present and so on)
    fn is_configured(&self) -> bool;

    fn type_tag(&self) -> &str {
        &self.registration().type_tag
    }

    /// Enabled and configured. Cheap and side-effect free.
    fn is_available(&self) -> bool {
        self.registration().is_enabled() && self.is_configured()
    }

    /// Whether the registered gate admits the current situation
    fn can_activate(&self, _params: &SearchParams, conditions: &ProviderConditions) -> bool {
        self.registration().gate.admits(conditions)
    }

    /// Query the external source
    async fn search(&self, params: &SearchParams) -> Result<SearchOutcome, ProviderError>;

    /// One candidate picked uniformly from a search, `None` on empty or failed searches
    async fn get_random_candidate(&self, params: &SearchParams) -> Option<LocationCandidate> {
        let mut candidates = match self.search(params).await {
            Ok(outcome) => outcome.candidates,
            Err(e) => {
                warn!("Search failed for provider {}: {}", self.type_tag(), e);
                return None;
            }
        };

        if candidates.is_empty() {
            debug!("Provider {} returned no candidates", self.type_tag());
            return None;
        }

        let index = rand::rng().random_range(0..candidates.len());
        Some(candidates.swap_remove(index))
    }
}

/// Caller-facing view of a registered provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSummary {
    pub name: String,
    pub type_tag: String,
    pub weight: f64,
    pub available: bool,
    pub description: String,
}
