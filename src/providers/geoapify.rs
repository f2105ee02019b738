//! Geoapify places adapter, one instance per category

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::catalog::PlaceCategory;
use super::http::HttpContext;
use super::{LocationProvider, ProviderError, ProviderRegistration, SearchOutcome, SearchParams};
use crate::geo;
use crate::models::{ConditionsGate, Coordinates, LocationCandidate};

const BASE_URL: &str = "https://api.geoapify.com/v2/places";

const MAX_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct PlacesResponse {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
pub struct Feature {
    pub properties: PlaceProperties,
}

#[derive(Debug, Deserialize)]
pub struct PlaceProperties {
    pub place_id: String,
    pub name: Option<String>,
    pub formatted: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub lon: f64,
    pub lat: f64,
    #[serde(default)]
    pub details: Vec<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub opening_hours: Option<String>,
    pub rating: Option<f64>,
}

impl PlaceProperties {
    fn describe(&self, category: &PlaceCategory) -> String {
        let mut parts = vec![category.description.to_string()];
        if !self.details.is_empty() {
            parts.push(format!("Features: {}.", self.details.join(", ")));
        }
        if let Some(rating) = self.rating {
            parts.push(format!("Rated {}/5 by visitors.", rating));
        }
        parts.join(" ")
    }

    fn place(&self, category: &PlaceCategory) -> String {
        if let Some(formatted) = &self.formatted {
            return formatted.clone();
        }

        let parts: Vec<&str> = [self.city.as_deref(), self.state.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            format!(
                "{} ({})",
                category.name,
                Coordinates::new(self.lat, self.lon).format_coordinates()
            )
        } else {
            parts.join(", ")
        }
    }

    fn to_candidate(&self, category: &PlaceCategory, origin: Coordinates) -> LocationCandidate {
        let coordinates = Coordinates::new(self.lat, self.lon);
        let mut candidate = LocationCandidate::new(
            format!("geoapify-{}-{}", category.type_tag, self.place_id),
            self.name.clone().unwrap_or_else(|| category.name.to_string()),
            self.describe(category),
            coordinates,
            self.place(category),
            category.type_tag,
        );
        candidate.url = self.website.clone();
        candidate.phone = self.phone.clone();
        candidate.hours = self.opening_hours.clone();
        candidate.rating = self.rating;
        candidate.distance_miles = Some(geo::rounded_distance_miles(origin, coordinates));
        candidate.tags = self.categories.iter().take(3).cloned().collect();
        candidate
    }
}

pub struct GeoapifyProvider {
    registration: ProviderRegistration,
    category: PlaceCategory,
    api_key: Option<String>,
    http: Arc<HttpContext>,
}

impl GeoapifyProvider {
    pub fn new(category: PlaceCategory, api_key: Option<String>, http: Arc<HttpContext>) -> Self {
        let registration =
            ProviderRegistration::new(category.name, category.type_tag, category.weight)
                .with_gate(ConditionsGate::modes(&[category.mode]));
        Self {
            registration,
            category,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            http,
        }
    }

    fn build_url(&self, api_key: &str, params: &SearchParams) -> String {
        let limit = params.limit.min(MAX_LIMIT);
        format!(
            "{}?categories={}&filter=circle:{},{},{:.0}&bias=proximity:{},{}&limit={}&apiKey={}",
            BASE_URL,
            self.category.query,
            params.longitude,
            params.latitude,
            params.radius_meters(),
            params.longitude,
            params.latitude,
            limit,
            urlencoding::encode(api_key)
        )
    }
}

pub fn parse_response(
    response: PlacesResponse,
    category: &PlaceCategory,
    params: &SearchParams,
) -> Vec<LocationCandidate> {
    let origin = params.coordinates();
    response
        .features
        .iter()
        .take(params.limit.min(MAX_LIMIT))
        .map(|feature| feature.properties.to_candidate(category, origin))
        .collect()
}

#[async_trait]
impl LocationProvider for GeoapifyProvider {
    fn registration(&self) -> &ProviderRegistration {
        &self.registration
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(skip(self, params), fields(provider = self.category.type_tag))]
    async fn search(&self, params: &SearchParams) -> Result<SearchOutcome, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ProviderError::not_configured("Geoapify API key not configured"));
        };

        if let Some(candidates) = self.http.cached(self.category.type_tag, params).await {
            debug!("Using {} cached candidates", candidates.len());
            return Ok(SearchOutcome::cached(candidates));
        }

        let url = self.build_url(api_key, params);
        let response: PlacesResponse = self.http.get_json("Geoapify", &url).await?;
        let candidates = parse_response(response, &self.category, params);

        info!(
            "Geoapify returned {} {} locations",
            candidates.len(),
            self.category.type_tag
        );
        self.http
            .store(self.category.type_tag, params, &candidates)
            .await;
        Ok(SearchOutcome::new(candidates, 1))
    }
}
