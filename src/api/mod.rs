pub mod client;
pub mod types;

pub use client::HttpApi;
pub use types::{
    CleanupRequest, CleanupResponse, CleanupSummary, CleanupTypeSummary, ClientConfig, Clinic,
    MasterItem, MasterUpdate, ThesaurusEntry,
};

use crate::error::Result;
use serde_json::Value;

/// Seam between the maintenance jobs and the deployed Workers API. Jobs only
/// talk to this trait; tests drive them against a recording mock.
#[async_trait::async_trait]
pub trait DirectoryApi: Send + Sync {
    async fn list_master(&self, master_type: &str, include_similar: bool)
        -> Result<Vec<MasterItem>>;

    async fn list_categories(&self, master_type: &str) -> Result<Vec<Value>>;

    async fn list_explanations(&self, master_type: &str) -> Result<Vec<Value>>;

    async fn update_master_item(&self, payload: &MasterUpdate) -> Result<()>;

    async fn add_master_item(&self, payload: &Value) -> Result<()>;

    async fn list_clinics(&self, limit: Option<u32>, offset: Option<u32>) -> Result<Vec<Clinic>>;

    /// Reading a clinic detail hydrates its KV metadata into D1 server-side.
    async fn clinic_detail(&self, id: &str) -> Result<Value>;

    async fn update_clinic(&self, payload: &Value) -> Result<()>;

    async fn thesaurus_lookup(&self, normalized: &str) -> Result<Vec<Value>>;

    async fn upsert_thesaurus(&self, entry: &ThesaurusEntry) -> Result<()>;

    async fn master_cleanup(&self, request: &CleanupRequest) -> Result<CleanupResponse>;

    async fn client_config(&self) -> Result<ClientConfig>;

    async fn refresh_mhlw_meta(&self, facility_count: u64, schedule_count: u64) -> Result<()>;
}
