//! `Sidequest` - quest generation from nearby points of interest
//!
//! This library aggregates candidate locations from many pluggable
//! providers, scores them for novelty and composes them (optionally with
//! activity content blocks) into ranked quest recommendations.

pub mod cache;
pub mod composer;
pub mod config;
pub mod content;
pub mod error;
pub mod geo;
pub mod logging;
pub mod models;
pub mod providers;
pub mod scoring;

// Re-export core types for public API
pub use cache::PersistentCache;
pub use composer::{GenerationFailure, GenerationOutcome, QuestComposer};
pub use config::SidequestConfig;
pub use content::{ContentStore, JsonFileContentStore, StaticContentStore};
pub use error::{Result, SidequestError};
pub use models::{
    ComposedQuest, ContentBlock, DetectedLocation, LocationCandidate, ProviderConditions,
    RequestContext,
};
pub use providers::{
    LocationProvider, ProviderError, ProviderRegistration, ProviderRegistry, ProviderSummary,
    RegistryStats, SearchOutcome, SearchParams,
};
pub use scoring::{InterestCategory, InterestScorer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
