use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Canonical reference-data record, identified by (type, category, name).
/// Unknown fields round-trip through `extra` so re-submitting a record never
/// drops data the API added since this crate was written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MasterItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, rename = "referenceUrl", skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,
    // Older records carry the snake_case spelling.
    #[serde(default, rename = "reference_url", skip_serializing_if = "Option::is_none")]
    pub reference_url_legacy: Option<String>,
    #[serde(default, rename = "societyName", skip_serializing_if = "Option::is_none")]
    pub society_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub society: Option<String>,
    #[serde(default, rename = "legacyAliases", skip_serializing_if = "Option::is_none")]
    pub legacy_aliases: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MasterItem {
    /// Reference URL under either spelling, trimmed.
    pub fn any_reference_url(&self) -> String {
        let camel = self.reference_url.as_deref().unwrap_or("").trim();
        if !camel.is_empty() {
            return camel.to_string();
        }
        self.reference_url_legacy
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_string()
    }

    /// Identifier rendered as a KV key segment.
    pub fn id_string(&self) -> Option<String> {
        match &self.id {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Write payload for /api/updateMasterItem.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MasterUpdate {
    #[serde(rename = "type")]
    pub master_type: String,
    pub category: String,
    pub name: String,
    #[serde(rename = "newCategory", skip_serializing_if = "Option::is_none")]
    pub new_category: Option<String>,
    #[serde(rename = "newName", skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    #[serde(rename = "referenceUrl", skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,
}

/// Facility record as served by /api/listClinics. The API owns most of the
/// shape; the typed fields are only the ones jobs inspect, everything else
/// rides along in `extra` so updateClinic writes the full record back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Clinic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "postalCode", skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Value>,
    #[serde(
        default,
        rename = "personalQualifications",
        skip_serializing_if = "Option::is_none"
    )]
    pub personal_qualifications: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifications: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Clinic {
    pub fn has_coordinates(&self) -> bool {
        let lat = self.latitude.or_else(|| location_number(&self.location, &["lat", "latitude"]));
        let lng = self.longitude.or_else(|| {
            location_number(&self.location, &["lng", "lon", "longitude"])
        });
        matches!((lat, lng), (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite())
    }
}

fn location_number(location: &Option<Value>, keys: &[&str]) -> Option<f64> {
    let location = location.as_ref()?;
    keys.iter().find_map(|key| location.get(key).and_then(Value::as_f64))
}

/// Thesaurus upsert payload for POST /api/thesaurus.
#[derive(Debug, Clone, Serialize)]
pub struct ThesaurusEntry {
    pub term: String,
    pub normalized: String,
    pub variants: Vec<String>,
    pub context: Vec<String>,
    pub locale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Request body for POST /api/maintenance/masterCleanup.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
    #[serde(rename = "dryRun")]
    pub dry_run: bool,
    #[serde(rename = "batchSize")]
    pub batch_size: u32,
    #[serde(rename = "includeKeys", skip_serializing_if = "Option::is_none")]
    pub include_keys: Option<bool>,
    #[serde(rename = "maxKeysPerType", skip_serializing_if = "Option::is_none")]
    pub max_keys_per_type: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<CleanupSummary>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupSummary {
    #[serde(default)]
    pub types: Vec<CleanupTypeSummary>,
    #[serde(default)]
    pub errors: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupTypeSummary {
    #[serde(rename = "type")]
    pub master_type: String,
    #[serde(default, rename = "legacyKeys")]
    pub legacy_keys: i64,
    #[serde(default, rename = "migratedRecords")]
    pub migrated_records: i64,
    #[serde(default, rename = "migratedPointers")]
    pub migrated_pointers: i64,
    #[serde(default)]
    pub deleted: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CleanupTypeSummary {
    /// Legacy keys still awaiting migration or deletion.
    pub fn pending(&self) -> i64 {
        self.legacy_keys - (self.migrated_records + self.migrated_pointers + self.deleted)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default, rename = "googleMapsApiKey")]
    pub google_maps_api_key: Option<String>,
}

// Response envelopes. Decoding fails closed: a payload without the expected
// collection field is an UnexpectedResponse, not an empty list.
#[derive(Debug, Deserialize)]
pub struct ListMasterResponse {
    pub items: Vec<MasterItem>,
}

#[derive(Debug, Deserialize)]
pub struct ListCategoriesResponse {
    #[serde(default)]
    pub categories: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ListExplanationsResponse {
    #[serde(default)]
    pub explanations: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ListClinicsResponse {
    pub clinics: Vec<Clinic>,
}

#[derive(Debug, Deserialize)]
pub struct ThesaurusResponse {
    #[serde(default)]
    pub items: Vec<Value>,
}
