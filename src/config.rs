//! Configuration management for Sidequest
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::SidequestError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SidequestConfig {
    /// Provider credentials and HTTP behaviour
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Provider selection and fetch settings
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Quest generation settings
    #[serde(default)]
    pub composer: ComposerConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// External provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Google Places API key; Google providers are unavailable without it
    pub google_places_api_key: Option<String>,
    /// Geoapify API key; Geoapify providers are unavailable without it
    pub geoapify_api_key: Option<String>,
    /// Register the embedded dark-sky dataset
    #[serde(default = "default_enable_dark_sky")]
    pub enable_dark_sky: bool,
    /// Register the keyless OpenStreetMap trail search
    #[serde(default = "default_enable_hiking")]
    pub enable_hiking: bool,
    /// Quota per external service
    #[serde(default = "default_max_calls_per_hour")]
    pub max_calls_per_hour: u32,
    /// HTTP request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u32,
    /// Maximum number of retries for transient HTTP failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Upper bound for a single provider call
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
    /// Share of draws that must avoid repeating a provider type
    #[serde(default = "default_distinct_fraction")]
    pub distinct_fraction: f64,
    /// Redraws per slot while looking for an unused provider type
    #[serde(default = "default_distinct_retries")]
    pub distinct_retries: u32,
    /// Query selected providers concurrently instead of in draw order
    #[serde(default)]
    pub parallel_fetch: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposerConfig {
    #[serde(default = "default_search_radius")]
    pub search_radius_miles: f64,
    /// Candidates fetched for pure-location quests
    #[serde(default = "default_location_target")]
    pub location_target: usize,
    #[serde(default = "default_location_max_attempts")]
    pub location_max_attempts: usize,
    #[serde(default = "default_location_min_score")]
    pub location_min_score: f64,
    /// Candidates fetched to pair with content blocks
    #[serde(default = "default_block_location_target")]
    pub block_location_target: usize,
    #[serde(default = "default_block_max_attempts")]
    pub block_max_attempts: usize,
    #[serde(default = "default_block_min_score")]
    pub block_min_score: f64,
    /// Accepted quests after which generation stops
    #[serde(default = "default_target_quests")]
    pub target_quests: usize,
    /// JSON file with content blocks
    pub content_path: Option<PathBuf>,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Cache TTL in hours
    #[serde(default = "default_cache_ttl")]
    pub ttl_hours: u32,
    /// Cache directory location
    #[serde(default = "default_cache_location")]
    pub location: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_enable_dark_sky() -> bool {
    true
}

fn default_enable_hiking() -> bool {
    true
}

fn default_max_calls_per_hour() -> u32 {
    100
}

fn default_http_timeout() -> u32 {
    15
}

fn default_max_retries() -> u32 {
    2
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_distinct_fraction() -> f64 {
    0.7
}

fn default_distinct_retries() -> u32 {
    10
}

fn default_search_radius() -> f64 {
    25.0
}

fn default_location_target() -> usize {
    10
}

fn default_location_max_attempts() -> usize {
    10
}

fn default_location_min_score() -> f64 {
    2.0
}

fn default_block_location_target() -> usize {
    5
}

fn default_block_max_attempts() -> usize {
    8
}

fn default_block_min_score() -> f64 {
    2.2
}

fn default_target_quests() -> usize {
    3
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl() -> u32 {
    6
}

fn default_cache_location() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("sidequest").to_string_lossy().into_owned())
        .unwrap_or_else(|| ".sidequest-cache".to_string())
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            google_places_api_key: None,
            geoapify_api_key: None,
            enable_dark_sky: default_enable_dark_sky(),
            enable_hiking: default_enable_hiking(),
            max_calls_per_hour: default_max_calls_per_hour(),
            http_timeout_seconds: default_http_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_seconds: default_fetch_timeout(),
            distinct_fraction: default_distinct_fraction(),
            distinct_retries: default_distinct_retries(),
            parallel_fetch: false,
        }
    }
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            search_radius_miles: default_search_radius(),
            location_target: default_location_target(),
            location_max_attempts: default_location_max_attempts(),
            location_min_score: default_location_min_score(),
            block_location_target: default_block_location_target(),
            block_max_attempts: default_block_max_attempts(),
            block_min_score: default_block_min_score(),
            target_quests: default_target_quests(),
            content_path: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_hours: default_cache_ttl(),
            location: default_cache_location(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl SidequestConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // SIDEQUEST_PROVIDERS__GOOGLE_PLACES_API_KEY and friends
        builder = builder.add_source(
            Environment::with_prefix("SIDEQUEST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: SidequestConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sidequest").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.providers.http_timeout_seconds == 0 {
            self.providers.http_timeout_seconds = default_http_timeout();
        }
        if self.registry.fetch_timeout_seconds == 0 {
            self.registry.fetch_timeout_seconds = default_fetch_timeout();
        }
        if self.registry.distinct_retries == 0 {
            self.registry.distinct_retries = default_distinct_retries();
        }
        if self.composer.location_target == 0 {
            self.composer.location_target = default_location_target();
        }
        if self.composer.target_quests == 0 {
            self.composer.target_quests = default_target_quests();
        }
        if self.cache.ttl_hours == 0 {
            self.cache.ttl_hours = default_cache_ttl();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        let keys = [
            ("Google Places", &self.providers.google_places_api_key),
            ("Geoapify", &self.providers.geoapify_api_key),
        ];

        for (service, key) in keys {
            let Some(api_key) = key else {
                continue;
            };

            if api_key.is_empty() {
                return Err(SidequestError::config(format!(
                    "{} API key cannot be empty if provided. Either remove it or provide a valid key.",
                    service
                ))
                .into());
            }

            if api_key.len() < 8 {
                return Err(SidequestError::config(format!(
                    "{} API key appears to be invalid (too short). Please check your API key.",
                    service
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.providers.http_timeout_seconds > 300 {
            return Err(SidequestError::config("HTTP timeout cannot exceed 300 seconds").into());
        }

        if self.providers.max_retries > 10 {
            return Err(SidequestError::config("HTTP max retries cannot exceed 10").into());
        }

        if self.registry.fetch_timeout_seconds > 60 {
            return Err(
                SidequestError::config("Provider fetch timeout cannot exceed 60 seconds").into(),
            );
        }

        let fraction = self.registry.distinct_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(SidequestError::config(format!(
                "Distinct fraction must be in (0, 1], got {}",
                fraction
            ))
            .into());
        }

        let composer = &self.composer;
        if !(composer.search_radius_miles > 0.0 && composer.search_radius_miles <= 500.0) {
            return Err(
                SidequestError::config("Search radius must be between 0 and 500 miles").into(),
            );
        }

        if composer.location_min_score < 0.0 || composer.block_min_score < 0.0 {
            return Err(SidequestError::config("Minimum scores cannot be negative").into());
        }

        if composer.location_target > 50 || composer.block_location_target > 50 {
            return Err(SidequestError::config("Fetch targets cannot exceed 50").into());
        }

        if self.cache.ttl_hours > 168 {
            return Err(SidequestError::config("Cache TTL cannot exceed 168 hours (1 week)").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(SidequestError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(SidequestError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        Ok(())
    }

    /// Cache directory with a leading `~` expanded
    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        match self.cache.location.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(&self.cache.location)),
            None => PathBuf::from(&self.cache.location),
        }
    }
}
