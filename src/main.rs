use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use sidequest::content::{ContentStore, JsonFileContentStore};
use sidequest::models::{
    DetectedLocation, Difficulty, ProviderConditions, RequestContext, Theme, TimeOfDay, Timeframe,
    Transportation,
};
use sidequest::providers::{self, ProviderRegistry, SearchParams};
use sidequest::{PersistentCache, QuestComposer, SidequestConfig, geo, logging};

#[derive(Parser)]
#[command(name = "sidequest", version, about = "Find something unusual to do nearby")]
struct Cli {
    /// Path to config TOML file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate ranked quests
    Generate {
        #[arg(long, default_value = "afternoon", value_parser = parse_choice::<Timeframe>)]
        timeframe: Timeframe,

        #[arg(long, default_value = "medium", value_parser = parse_choice::<Difficulty>)]
        difficulty: Difficulty,

        #[arg(long, default_value = "has_car", value_parser = parse_choice::<Transportation>)]
        transportation: Transportation,

        #[arg(long, default_value = "adventure", value_parser = parse_choice::<Theme>)]
        theme: Theme,

        #[command(flatten)]
        location: LocationArgs,

        /// Override the time of day derived from the clock
        #[arg(long, value_parser = parse_choice::<TimeOfDay>)]
        time_of_day: Option<TimeOfDay>,

        /// JSON file of content blocks
        #[arg(long)]
        content: Option<PathBuf>,
    },
    /// List providers and whether they can run here and now
    Providers {
        #[command(flatten)]
        location: LocationArgs,
    },
    /// Registry statistics
    Stats,
    /// Query a single provider directly
    Search {
        /// Provider type tag, e.g. "stargazing"
        provider: String,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        #[arg(long, default_value_t = 25.0)]
        radius: f64,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(clap::Args)]
struct LocationArgs {
    #[arg(long, allow_hyphen_values = true, requires = "lng")]
    lat: Option<f64>,

    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    lng: Option<f64>,

    /// Region code such as "UT"
    #[arg(long)]
    region: Option<String>,
}

impl LocationArgs {
    fn detected(&self) -> Option<DetectedLocation> {
        let (Some(latitude), Some(longitude)) = (self.lat, self.lng) else {
            return None;
        };
        Some(DetectedLocation {
            latitude,
            longitude,
            region: self.region.clone(),
        })
    }
}

/// Parse a CLI value with the same spelling the JSON models use
fn parse_choice<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_lowercase()))
        .map_err(|_| format!("unsupported value '{}'", raw))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{}", rendered);
    Ok(())
}

fn open_cache(config: &SidequestConfig) -> Option<Arc<PersistentCache>> {
    if !config.cache.enabled {
        return None;
    }

    let path = config.cache_path();
    match PersistentCache::open(&path) {
        Ok(cache) => Some(Arc::new(cache)),
        Err(e) => {
            warn!("Cache unavailable at {}, continuing without: {}", path.display(), e);
            None
        }
    }
}

fn build_registry(config: &SidequestConfig) -> Result<Arc<ProviderRegistry>> {
    let mut registry = ProviderRegistry::new().with_config(&config.registry);
    providers::register_defaults(&mut registry, config, open_cache(config))?;
    Ok(Arc::new(registry))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        SidequestConfig::load_from_path(cli.config.clone()).context("Failed to load config")?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    logging::init(&config.logging)?;

    info!("Starting sidequest {}", sidequest::VERSION);

    match cli.command {
        Command::Generate {
            timeframe,
            difficulty,
            transportation,
            theme,
            location,
            time_of_day,
            content,
        } => {
            let content_path = content.or_else(|| config.composer.content_path.clone());
            let store = content_path
                .map(|path| Arc::new(JsonFileContentStore::new(path)) as Arc<dyn ContentStore>);

            let composer = QuestComposer::new(build_registry(&config)?, store)
                .with_config(&config.composer);

            let mut request = RequestContext::new(timeframe, difficulty, transportation, theme);
            if let Some(detected) = location.detected() {
                request = request.at(detected);
            }
            if let Some(time_of_day) = time_of_day {
                request = request
                    .with_conditions(ProviderConditions::default().with_time_of_day(time_of_day));
            }

            let outcome = composer.generate(&request).await;
            print_json(&outcome)?;
        }
        Command::Providers { location } => {
            let composer = QuestComposer::new(build_registry(&config)?, None)
                .with_config(&config.composer);
            let detected = location.detected();
            let conditions = geo::current_conditions(detected.as_ref(), chrono::Utc::now());

            print_json(&composer.list_available_providers(detected.as_ref(), &conditions))?;
        }
        Command::Stats => {
            let registry = build_registry(&config)?;
            print_json(&registry.get_stats())?;
        }
        Command::Search {
            provider,
            lat,
            lng,
            radius,
            limit,
        } => {
            let registry = build_registry(&config)?;
            let params = SearchParams::new(lat, lng, radius, limit);
            let candidates = registry
                .search_provider(&provider, &params)
                .await
                .with_context(|| format!("Search with provider '{}' failed", provider))?;

            print_json(&candidates)?;
        }
    }

    Ok(())
}
