//! Geocode clinics that are missing coordinates, using the Google Maps key
//! the Worker hands out through /api/client-config.

use crate::api::{Clinic, DirectoryApi};
use crate::error::{MaintenanceError, Result};
use crate::normalize::sanitize_opt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    pub formatted_address: String,
}

/// Seam over the external geocoding service so the job is testable without
/// network access.
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>>;
}

#[derive(Debug, Deserialize)]
struct GoogleGeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleGeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GoogleGeocodeResult {
    geometry: GoogleGeometry,
    #[serde(default)]
    formatted_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleGeometry {
    location: GoogleLocation,
}

#[derive(Debug, Deserialize)]
struct GoogleLocation {
    lat: f64,
    lng: f64,
}

pub struct GoogleGeocoder {
    client: reqwest::Client,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>> {
        let response = self
            .client
            .get("https://maps.googleapis.com/maps/api/geocode/json")
            .query(&[
                ("address", address),
                ("key", &self.api_key),
                ("language", "ja"),
                ("region", "JP"),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MaintenanceError::Http {
                status: status.as_u16(),
                body,
            });
        }
        let data: GoogleGeocodeResponse = response.json().await?;
        if data.status == "ZERO_RESULTS" {
            return Ok(None);
        }
        if data.status != "OK" {
            return Err(MaintenanceError::UnexpectedResponse(format!(
                "geocode status {}",
                data.status
            )));
        }
        let Some(first) = data.results.into_iter().next() else {
            return Ok(None);
        };
        Ok(Some(GeoPoint {
            lat: first.geometry.location.lat,
            lng: first.geometry.location.lng,
            formatted_address: first.formatted_address.unwrap_or_else(|| address.to_string()),
        }))
    }
}

/// Address line used for the lookup: postal code then street address.
pub fn clinic_address(clinic: &Clinic) -> Option<String> {
    let parts: Vec<String> = [&clinic.postal_code, &clinic.address]
        .iter()
        .map(|part| sanitize_opt(part))
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Full clinic record with the new coordinates merged in; the location block
/// records where the fix came from.
pub fn geocoded_payload(clinic: &Clinic, coords: &GeoPoint) -> Result<Value> {
    let mut payload = serde_json::to_value(clinic)?;
    let object = payload.as_object_mut().ok_or_else(|| {
        MaintenanceError::UnexpectedResponse("clinic record is not an object".into())
    })?;
    object.insert("latitude".to_string(), json!(coords.lat));
    object.insert("longitude".to_string(), json!(coords.lng));

    let mut location = clinic
        .location
        .clone()
        .and_then(|value| value.as_object().cloned())
        .unwrap_or_default();
    location.insert("lat".to_string(), json!(coords.lat));
    location.insert("lng".to_string(), json!(coords.lng));
    location.insert(
        "formattedAddress".to_string(),
        json!(coords.formatted_address),
    );
    location.insert("source".to_string(), json!("bulk-geocode"));
    location.insert("geocodedAt".to_string(), json!(chrono::Utc::now().to_rfc3339()));
    object.insert("location".to_string(), Value::Object(location));
    Ok(payload)
}

pub async fn run(
    api: &dyn DirectoryApi,
    geocoder: &dyn Geocoder,
    dry_run: bool,
    include_existing: bool,
    delay: Duration,
) -> Result<()> {
    println!("[info] mode: {}", if dry_run { "dry-run" } else { "commit" });

    let clinics = api.list_clinics(None, None).await?;
    let mut updated = 0usize;

    for clinic in &clinics {
        let id = clinic
            .id
            .clone()
            .or_else(|| clinic.name.clone())
            .unwrap_or_default();
        if id.is_empty() {
            continue;
        }
        let Some(address) = clinic_address(clinic) else {
            continue;
        };
        if !include_existing && clinic.has_coordinates() {
            continue;
        }
        let name = clinic.name.clone().unwrap_or_default();
        println!("[info] geocoding {name} ({id}) -> {address}");

        match geocoder.geocode(&address).await {
            Ok(None) => {
                println!("[warn] geocode returned no result");
            }
            Ok(Some(coords)) => {
                if dry_run {
                    println!(
                        "[dry-run] would update {name} with lat={}, lng={}",
                        coords.lat, coords.lng
                    );
                    continue;
                }
                let payload = geocoded_payload(clinic, &coords)?;
                match api.update_clinic(&payload).await {
                    Ok(()) => {
                        updated += 1;
                        println!("[updated] {name}");
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                    Err(err) => warn!("failed to update {name}: {err}"),
                }
            }
            Err(err) => {
                warn!("failed to geocode {name}: {err}");
            }
        }
    }

    println!("[info] processed {} clinics, updated {updated}.", clinics.len());
    Ok(())
}

/// Fetch the Maps API key the Worker exposes to browser clients.
pub async fn fetch_maps_api_key(api: &dyn DirectoryApi) -> Result<String> {
    let config = api.client_config().await?;
    let key = config
        .google_maps_api_key
        .unwrap_or_default()
        .trim()
        .to_string();
    if key.is_empty() {
        return Err(MaintenanceError::Config(
            "failed to fetch Google Maps API key: googleMapsApiKey is empty".into(),
        ));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn address_joins_postal_code_and_street() {
        let clinic: Clinic = serde_json::from_value(json!({
            "postalCode": "164-0001",
            "address": "東京都中野区中野1-2-3",
        }))
        .unwrap();
        assert_eq!(
            clinic_address(&clinic).as_deref(),
            Some("164-0001 東京都中野区中野1-2-3")
        );
    }

    #[test]
    fn address_is_none_when_both_parts_missing() {
        let clinic: Clinic = serde_json::from_value(json!({ "name": "テスト医院" })).unwrap();
        assert!(clinic_address(&clinic).is_none());
    }

    #[test]
    fn coordinates_found_in_nested_location() {
        let clinic: Clinic = serde_json::from_value(json!({
            "location": { "lat": 35.7, "lng": 139.6 }
        }))
        .unwrap();
        assert!(clinic.has_coordinates());

        let without: Clinic = serde_json::from_value(json!({ "name": "x" })).unwrap();
        assert!(!without.has_coordinates());
    }

    #[test]
    fn payload_preserves_unknown_fields_and_tags_source() {
        let clinic: Clinic = serde_json::from_value(json!({
            "id": "clinic-1",
            "name": "テスト医院",
            "homepage": "https://clinic.example.jp",
        }))
        .unwrap();
        let coords = GeoPoint {
            lat: 35.7,
            lng: 139.6,
            formatted_address: "東京都中野区".into(),
        };
        let payload = geocoded_payload(&clinic, &coords).unwrap();
        assert_eq!(payload["homepage"], "https://clinic.example.jp");
        assert_eq!(payload["latitude"], json!(35.7));
        assert_eq!(payload["location"]["source"], "bulk-geocode");
    }
}
