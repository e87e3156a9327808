//! One module per maintenance job, each a thin orchestration of the API
//! client, batch driver, and normalizers.

pub mod assign_organization;
pub mod backfill_collections;
pub mod checkup_reference_urls;
pub mod cleanup_legacy;
pub mod export_clinics;
pub mod export_masters;
pub mod geocode;
pub mod kv_orphans;
pub mod migrate_department;
pub mod migrate_qual;
pub mod refresh_mhlw_meta;
pub mod seed_org_masters;
pub mod seed_thesaurus;
pub mod society_notes;
pub mod society_pointers;
pub mod verify_masters;
