//! Hiking trails from OpenStreetMap via the Overpass API. Needs no key.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::http::HttpContext;
use super::{LocationProvider, ProviderError, ProviderRegistration, SearchOutcome, SearchParams};
use crate::geo;
use crate::models::{ConditionsGate, Coordinates, LocationCandidate, QuestMode};

pub const TYPE_TAG: &str = "hiking";

const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

const MAX_RADIUS_MILES: f64 = 25.0;
const MAX_LIMIT: usize = 10;

/// Overpass filters that count as a walkable trail
const TRAIL_FILTERS: &[(&str, &str)] = &[
    ("way", r#"["highway"="footway"]"#),
    ("way", r#"["highway"="path"]"#),
    ("way", r#"["highway"="cycleway"]"#),
    ("way", r#"["leisure"="park"]"#),
    ("way", r#"["leisure"="nature_reserve"]"#),
    ("relation", r#"["route"="hiking"]"#),
];

#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: u64,
    pub center: Option<Point>,
    #[serde(default)]
    pub geometry: Vec<Point>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl Element {
    fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    fn is_trail_kind(&self) -> bool {
        matches!(self.kind.as_str(), "way" | "relation")
    }

    /// Reported center, else the mean of the geometry
    fn center(&self) -> Option<Coordinates> {
        if let Some(center) = self.center {
            return Some(Coordinates::new(center.lat, center.lon));
        }
        if self.geometry.is_empty() {
            return None;
        }

        let count = self.geometry.len() as f64;
        let (lat, lon) = self
            .geometry
            .iter()
            .fold((0.0, 0.0), |(lat, lon), p| (lat + p.lat, lon + p.lon));
        Some(Coordinates::new(lat / count, lon / count))
    }

    fn title(&self) -> String {
        if let Some(name) = self.tag("name") {
            return name.to_string();
        }
        if let Some(reference) = self.tag("ref") {
            return format!("Trail {}", reference);
        }

        let generated = match (
            self.tag("route"),
            self.tag("highway"),
            self.tag("leisure"),
            self.tag("boundary"),
            self.tag("natural"),
        ) {
            (Some("hiking"), ..) => "Hiking Trail",
            (_, Some("footway"), ..) => "Footpath Trail",
            (_, Some("path"), ..) => "Nature Path",
            (_, Some("track"), ..) => "Trail Track",
            (_, _, Some("nature_reserve"), ..) => "Nature Reserve Trail",
            (_, _, _, Some("national_park"), _) => "National Park Trail",
            (.., Some("forest")) => "Forest Trail",
            _ => "Walking Trail",
        };
        generated.to_string()
    }

    fn base_description(&self) -> &'static str {
        match (
            self.tag("route"),
            self.tag("highway"),
            self.tag("leisure"),
            self.tag("boundary"),
            self.tag("natural"),
        ) {
            (Some("hiking"), ..) => "A dedicated hiking trail perfect for outdoor enthusiasts.",
            (_, Some("footway"), ..) => "A pedestrian walkway ideal for leisurely strolls.",
            (_, Some("path"), ..) => "A natural path through scenic areas.",
            (_, Some("track"), ..) => "A trail track suitable for walking and light hiking.",
            (_, _, Some("nature_reserve"), ..) => "A trail through a protected nature reserve.",
            (_, _, _, Some("national_park"), _) => "A trail within a national park area.",
            (.., Some("forest")) => "A forest trail through natural woodland.",
            _ => "A walking trail offering outdoor recreation opportunities.",
        }
    }

    fn description(&self) -> String {
        if let Some(description) = self.tag("description") {
            return description.to_string();
        }

        let mut features = Vec::new();
        if let Some(surface) = self.tag("surface") {
            features.push(format!("{} surface", surface));
        }
        if let Some(difficulty) = self.tag("difficulty") {
            features.push(format!("{} difficulty", difficulty));
        }
        if let Some(length) = self.tag("length") {
            features.push(format!("{} long", length));
        }
        if let Some(natural) = self.tag("natural") {
            features.push(format!("through {} area", natural));
        }
        if let Some(leisure) = self.tag("leisure") {
            features.push(format!("in {}", leisure.replace('_', " ")));
        }

        if features.is_empty() {
            self.base_description().to_string()
        } else {
            format!("{} Features {}.", self.base_description(), features.join(", "))
        }
    }

    fn to_candidate(&self, origin: Coordinates) -> Option<LocationCandidate> {
        let coordinates = self.center()?;
        let mut candidate = LocationCandidate::new(
            format!("osm-{}-{}", self.kind, self.id),
            self.title(),
            self.description(),
            coordinates,
            format!("Trail Location ({})", coordinates.format_coordinates()),
            TYPE_TAG,
        );
        candidate.distance_miles = Some(geo::rounded_distance_miles(origin, coordinates));
        candidate.tags = ["surface", "difficulty"]
            .iter()
            .filter_map(|key| self.tag(key).map(str::to_string))
            .collect();
        Some(candidate)
    }
}

/// Overpass QL for trails around the query point, radius capped at 25 miles
#[must_use]
pub fn build_query(params: &SearchParams) -> String {
    let radius_meters = (params.radius_miles.min(MAX_RADIUS_MILES) * 1609.34).round();
    let around = format!(
        "(around:{:.0},{},{})",
        radius_meters, params.latitude, params.longitude
    );

    let statements: String = TRAIL_FILTERS
        .iter()
        .map(|(kind, filter)| format!("{}{}{};", kind, filter, around))
        .collect();
    format!("[out:json][timeout:30];({});out center meta;", statements)
}

/// Trail candidates from the first `limit` elements, duplicates and
/// elements without a position skipped
pub fn parse_response(response: OverpassResponse, params: &SearchParams) -> Vec<LocationCandidate> {
    let origin = params.coordinates();
    let mut seen = HashSet::new();

    response
        .elements
        .iter()
        .take(params.limit.min(MAX_LIMIT))
        .filter(|element| element.is_trail_kind())
        .filter_map(|element| element.to_candidate(origin))
        .filter(|candidate| seen.insert(candidate.id.clone()))
        .collect()
}

pub struct HikingProvider {
    registration: ProviderRegistration,
    http: Arc<HttpContext>,
}

impl HikingProvider {
    pub fn new(http: Arc<HttpContext>) -> Self {
        let registration = ProviderRegistration::new("Hiking Trail Explorer", TYPE_TAG, 2.0)
            .with_gate(ConditionsGate::modes(&[QuestMode::PureLocation]));
        Self { registration, http }
    }
}

#[async_trait]
impl LocationProvider for HikingProvider {
    fn registration(&self) -> &ProviderRegistration {
        &self.registration
    }

    fn is_configured(&self) -> bool {
        true
    }

    #[instrument(skip(self, params), fields(provider = TYPE_TAG))]
    async fn search(&self, params: &SearchParams) -> Result<SearchOutcome, ProviderError> {
        if let Some(candidates) = self.http.cached(TYPE_TAG, params).await {
            debug!("Using {} cached candidates", candidates.len());
            return Ok(SearchOutcome::cached(candidates));
        }

        let query = build_query(params);
        let response: OverpassResponse = self
            .http
            .post_form_json("Overpass", OVERPASS_URL, &[("data", query.as_str())])
            .await?;
        let elements = response.elements.len();
        let candidates = parse_response(response, params);

        info!(
            "Overpass returned {} elements, {} trails",
            elements,
            candidates.len()
        );
        self.http.store(TYPE_TAG, params, &candidates).await;
        Ok(SearchOutcome::new(candidates, 1))
    }
}
