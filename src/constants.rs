/// Default production Workers API endpoint.
pub const DEFAULT_API_BASE: &str = "https://ncd-app.altry.workers.dev";

/// Master types handled by the export and cleanup jobs when no --types filter
/// is given.
pub const DEFAULT_MASTER_TYPES: &[&str] = &[
    "test",
    "service",
    "qual",
    "department",
    "facility",
    "symptom",
    "bodySite",
    "society",
    "vaccination",
    "vaccinationType",
    "checkup",
    "checkupType",
];

/// Master types the legacy cleanup endpoint still holds KV records for.
pub const LEGACY_CLEANUP_TYPES: &[&str] = &[
    "service",
    "test",
    "qual",
    "facility",
    "department",
    "symptom",
    "bodySite",
];

/// Types that have a /api/listCategories collection.
pub const CATEGORY_SUPPORTED_TYPES: &[&str] = &[
    "test",
    "service",
    "qual",
    "department",
    "facility",
    "symptom",
    "bodySite",
    "vaccinationType",
    "checkupType",
];

/// Types that have patient-facing explanations behind /api/explanations.
pub const EXPLANATION_SUPPORTED_TYPES: &[&str] = &["service", "test"];

pub fn category_supported(master_type: &str) -> bool {
    CATEGORY_SUPPORTED_TYPES.contains(&master_type)
}

pub fn explanation_supported(master_type: &str) -> bool {
    EXPLANATION_SUPPORTED_TYPES.contains(&master_type)
}

/// Split a --types style comma-separated list into trimmed, non-empty values.
pub fn parse_types_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
