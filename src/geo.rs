//! Geographic helpers: distances and the situational context derived
//! from a location and the current time

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use sunrise::{SolarDay, SolarEvent};

use crate::models::{Coordinates, DetectedLocation, ProviderConditions, Season, TimeOfDay};

/// Great-circle distance in miles
#[must_use]
pub fn distance_miles(from: Coordinates, to: Coordinates) -> f64 {
    haversine::distance(
        haversine::Location {
            latitude: from.latitude,
            longitude: from.longitude,
        },
        haversine::Location {
            latitude: to.latitude,
            longitude: to.longitude,
        },
        haversine::Units::Miles,
    )
}

/// Distance in miles rounded to one decimal
#[must_use]
pub fn rounded_distance_miles(from: Coordinates, to: Coordinates) -> f64 {
    (distance_miles(from, to) * 10.0).round() / 10.0
}

pub fn get_sunrise_sunset(
    coordinates: Coordinates,
    date: NaiveDate,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let solar_coordinates = sunrise::Coordinates::new(coordinates.latitude, coordinates.longitude)
        .with_context(|| {
            format!(
                "Invalid coordinates: lat={}, lng={}",
                coordinates.latitude, coordinates.longitude
            )
        })?;

    let solar_day = SolarDay::new(solar_coordinates, date);

    let sunrise = solar_day
        .event_time(SolarEvent::Sunrise)
        .unwrap_or(date.and_time(NaiveTime::MIN + Duration::hours(6)).and_utc());

    let sunset = solar_day
        .event_time(SolarEvent::Sunset)
        .unwrap_or(date.and_time(NaiveTime::MIN + Duration::hours(19)).and_utc());

    Ok((sunrise, sunset))
}

/// Meteorological season, flipped for the southern hemisphere
#[must_use]
pub fn season_for(date: NaiveDate, latitude: f64) -> Season {
    let northern = match date.month() {
        3..=5 => Season::Spring,
        6..=8 => Season::Summer,
        9..=11 => Season::Fall,
        _ => Season::Winter,
    };

    if latitude >= 0.0 {
        return northern;
    }

    match northern {
        Season::Spring => Season::Fall,
        Season::Summer => Season::Winter,
        Season::Fall => Season::Spring,
        Season::Winter => Season::Summer,
    }
}

/// Local mean solar time, good enough to tell morning from evening
fn local_solar_time(coordinates: Coordinates, now: DateTime<Utc>) -> DateTime<Utc> {
    let offset_minutes = (coordinates.longitude * 4.0).round() as i64;
    now + Duration::minutes(offset_minutes)
}

/// Night outside sunrise..sunset, otherwise split by local solar hour
#[must_use]
pub fn time_of_day_at(coordinates: Coordinates, now: DateTime<Utc>) -> TimeOfDay {
    let local = local_solar_time(coordinates, now);

    match get_sunrise_sunset(coordinates, local.date_naive()) {
        Ok((sunrise, sunset)) if now < sunrise || now > sunset => return TimeOfDay::Night,
        Ok(_) => {}
        Err(e) => tracing::debug!("Sunrise calculation failed, using clock only: {}", e),
    }

    match local.hour() {
        5..=11 => TimeOfDay::Morning,
        12..=16 => TimeOfDay::Afternoon,
        17..=21 => TimeOfDay::Evening,
        _ => TimeOfDay::Night,
    }
}

/// Situational context for a request made at `now`.
///
/// Without a location only the season (northern hemisphere) is known.
#[must_use]
pub fn current_conditions(
    location: Option<&DetectedLocation>,
    now: DateTime<Utc>,
) -> ProviderConditions {
    match location {
        Some(location) => {
            let coordinates = location.coordinates();
            let local = local_solar_time(coordinates, now);
            ProviderConditions {
                season: Some(season_for(local.date_naive(), coordinates.latitude)),
                time_of_day: Some(time_of_day_at(coordinates, now)),
                region: location.region.clone(),
                ..ProviderConditions::default()
            }
        }
        None => ProviderConditions {
            season: Some(season_for(now.date_naive(), 0.0)),
            ..ProviderConditions::default()
        },
    }
}
