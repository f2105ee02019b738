//! Built-in provider catalog: descriptions shown to callers and the
//! default set of adapters with their weights and gates

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::http::HttpContext;
use super::{
    DarkSkyProvider, GeoapifyProvider, GooglePlacesProvider, HikingProvider, ProviderRegistry,
};
use crate::cache::PersistentCache;
use crate::config::SidequestConfig;
use crate::models::QuestMode;

const FALLBACK_DESCRIPTION: &str = "Explore interesting locations in this category";

const DESCRIPTIONS: &[(&str, &str)] = &[
    ("obscura", "Discover unusual and fascinating places from Atlas Obscura"),
    ("hiking", "Find beautiful hiking trails and nature spots"),
    ("stargazing", "Find certified dark sky places for a night under the stars"),
    ("beach", "Explore coastal areas and waterfront locations"),
    ("google_beach", "Discover beaches and coastal attractions via Google Places"),
    ("google_hiking_area", "Find hiking areas and outdoor activities"),
    ("google_marina", "Locate marinas, harbors, and waterfront facilities"),
    ("google_observation_deck", "Find scenic viewpoints and observation decks"),
    ("google_psychic", "Discover metaphysical and spiritual locations"),
    ("google_japanese_inn", "Find Japanese-style accommodations and cultural sites"),
    ("google_cat_cafe", "Locate cat cafes and animal-themed venues"),
    ("google_off_roading", "Discover off-road and adventure vehicle locations"),
    ("skateboard_park", "Find skateboard parks and skating venues"),
    ("national_park", "Explore national parks and protected areas"),
    ("wind_generator", "Discover renewable energy and wind farm locations"),
    ("mountain", "Find mountain peaks and elevated terrain"),
    ("lighthouse", "Locate historic lighthouses and maritime landmarks"),
    ("pier", "Discover piers, docks, and waterfront structures"),
];

/// Human description for a provider type tag
#[must_use]
pub fn describe(type_tag: &str) -> &'static str {
    DESCRIPTIONS
        .iter()
        .find(|(tag, _)| *tag == type_tag)
        .map_or(FALLBACK_DESCRIPTION, |(_, description)| description)
}

/// One searchable category of an external places API
#[derive(Debug, Clone, Copy)]
pub struct PlaceCategory {
    pub name: &'static str,
    pub type_tag: &'static str,
    /// Keyword (Google) or category list (Geoapify)
    pub query: &'static str,
    pub weight: f64,
    pub mode: QuestMode,
    /// Candidate description when the API offers nothing better
    pub description: &'static str,
}

pub const GOOGLE_CATEGORIES: &[PlaceCategory] = &[
    PlaceCategory {
        name: "Cat Cafe Explorer",
        type_tag: "google_cat_cafe",
        query: "cat cafe",
        weight: 4.0,
        mode: QuestMode::ContentBlock,
        description: "A cozy cat cafe where you can enjoy coffee, snacks, and quality time with friendly feline companions.",
    },
    PlaceCategory {
        name: "Japanese Inn Explorer",
        type_tag: "google_japanese_inn",
        query: "japanese inn ryokan",
        weight: 4.0,
        mode: QuestMode::ContentBlock,
        description: "A traditional Japanese inn offering authentic cultural experiences with tatami mats, futon beds, and Japanese hospitality.",
    },
    PlaceCategory {
        name: "Psychic Explorer",
        type_tag: "google_psychic",
        query: "psychic reader",
        weight: 4.0,
        mode: QuestMode::ContentBlock,
        description: "A psychic or metaphysical shop offering readings, crystals, and a glimpse into the mystical.",
    },
    PlaceCategory {
        name: "Skateboard Park Explorer",
        type_tag: "skateboard_park",
        query: "skateboard park",
        weight: 2.0,
        mode: QuestMode::ContentBlock,
        description: "A skate park with ramps, rails, and bowls for skaters of every level.",
    },
    PlaceCategory {
        name: "Off-Roading Explorer",
        type_tag: "google_off_roading",
        query: "off road trail",
        weight: 1.0,
        mode: QuestMode::PureLocation,
        description: "An exciting off-road trail perfect for ATV, 4x4, and dirt bike adventures through rugged terrain.",
    },
    PlaceCategory {
        name: "Google Hiking Area Explorer",
        type_tag: "google_hiking_area",
        query: "hiking trail",
        weight: 1.0,
        mode: QuestMode::PureLocation,
        description: "A hiking area with trails through local nature and wildlife.",
    },
    PlaceCategory {
        name: "Google Beach Explorer",
        type_tag: "google_beach",
        query: "beach",
        weight: 2.0,
        mode: QuestMode::PureLocation,
        description: "A beautiful beach perfect for relaxation, swimming, and water activities.",
    },
    PlaceCategory {
        name: "Observation Deck Explorer",
        type_tag: "google_observation_deck",
        query: "observation deck",
        weight: 3.0,
        mode: QuestMode::PureLocation,
        description: "A scenic viewpoint with sweeping views over the surrounding area.",
    },
    PlaceCategory {
        name: "Marina Explorer",
        type_tag: "google_marina",
        query: "marina",
        weight: 2.0,
        mode: QuestMode::PureLocation,
        description: "A marina full of boats, docks, and waterfront views.",
    },
];

pub const GEOAPIFY_CATEGORIES: &[PlaceCategory] = &[
    PlaceCategory {
        name: "Beach Explorer",
        type_tag: "beach",
        query: "beach",
        weight: 2.0,
        mode: QuestMode::ContentBlock,
        description: "A stretch of coastline for swimming, sunbathing, and shell hunting.",
    },
    PlaceCategory {
        name: "National Park Explorer",
        type_tag: "national_park",
        query: "national_park",
        weight: 1.0,
        mode: QuestMode::PureLocation,
        description: "A protected natural area with trails, wildlife, and wide open scenery.",
    },
    PlaceCategory {
        name: "Wind Farm Explorer",
        type_tag: "wind_generator",
        query: "power.generator.wind",
        weight: 4.0,
        mode: QuestMode::PureLocation,
        description: "Towering wind turbines turning the breeze into clean energy.",
    },
    PlaceCategory {
        name: "Mountain Explorer",
        type_tag: "mountain",
        query: "natural.mountain",
        weight: 1.0,
        mode: QuestMode::PureLocation,
        description: "A peak with elevated views of the surrounding terrain.",
    },
    PlaceCategory {
        name: "Lighthouse Explorer",
        type_tag: "lighthouse",
        query: "man_made.lighthouse",
        weight: 3.0,
        mode: QuestMode::PureLocation,
        description: "A historic lighthouse watching over the coast.",
    },
    PlaceCategory {
        name: "Pier Explorer",
        type_tag: "pier",
        query: "man_made.pier",
        weight: 1.0,
        mode: QuestMode::PureLocation,
        description: "A pier stretching out over the water, good for fishing and sunsets.",
    },
];

/// Register every built-in adapter.
///
/// Adapters whose API key is missing are still registered and simply report
/// themselves unavailable.
pub fn register_defaults(
    registry: &mut ProviderRegistry,
    config: &SidequestConfig,
    cache: Option<Arc<PersistentCache>>,
) -> Result<()> {
    let providers = &config.providers;
    let cache_ttl = Duration::from_secs(u64::from(config.cache.ttl_hours) * 3600);

    if providers.enable_dark_sky {
        let dark_sky = DarkSkyProvider::new().context("Failed to load dark sky dataset")?;
        registry.register(Arc::new(dark_sky))?;
    }

    if providers.enable_hiking {
        let overpass = Arc::new(HttpContext::new(providers, cache.clone(), cache_ttl)?);
        registry.register(Arc::new(HikingProvider::new(overpass)))?;
    }

    let google = Arc::new(HttpContext::new(providers, cache.clone(), cache_ttl)?);
    for category in GOOGLE_CATEGORIES {
        let provider = GooglePlacesProvider::new(
            *category,
            providers.google_places_api_key.clone(),
            Arc::clone(&google),
        );
        registry.register(Arc::new(provider))?;
    }
    if providers.google_places_api_key.is_none() {
        warn!("No Google Places API key, Google providers unavailable");
    }

    let geoapify = Arc::new(HttpContext::new(providers, cache, cache_ttl)?);
    for category in GEOAPIFY_CATEGORIES {
        let provider = GeoapifyProvider::new(
            *category,
            providers.geoapify_api_key.clone(),
            Arc::clone(&geoapify),
        );
        registry.register(Arc::new(provider))?;
    }
    if providers.geoapify_api_key.is_none() {
        warn!("No Geoapify API key, Geoapify providers unavailable");
    }

    let stats = registry.get_stats();
    info!(
        "Provider catalog registered: {}/{} providers available",
        stats.enabled, stats.total
    );
    Ok(())
}
