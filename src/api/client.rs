use crate::api::types::{
    CleanupRequest, CleanupResponse, ClientConfig, Clinic, ListCategoriesResponse,
    ListClinicsResponse, ListExplanationsResponse, ListMasterResponse, MasterItem, MasterUpdate,
    ThesaurusEntry, ThesaurusResponse,
};
use crate::api::DirectoryApi;
use crate::config::RunConfig;
use crate::error::{MaintenanceError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

/// reqwest-backed implementation of [`DirectoryApi`] against a base URL.
pub struct HttpApi {
    client: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl HttpApi {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: config.api_base.trim_end_matches('/').to_string(),
            token: config.auth_token.clone(),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base, path)
        } else {
            format!("{}/{}", self.base, path)
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        debug!("GET {path}");
        let request = self.authorize(self.client.get(self.url(path)).query(query));
        Self::decode(request.send().await?).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        debug!("POST {path}");
        let request = self.authorize(self.client.post(self.url(path)).json(body));
        Self::decode(request.send().await?).await
    }

    /// POST where only success matters; the response body is drained but not
    /// decoded, since several write endpoints answer with plain text.
    async fn post_ok<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        debug!("POST {path}");
        let request = self.authorize(self.client.post(self.url(path)).json(body));
        let response = request.send().await?;
        Self::ensure_success(response).await.map(|_| ())
    }

    async fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MaintenanceError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::ensure_success(response).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("application/json") {
            return Err(MaintenanceError::UnexpectedResponse(format!(
                "expected JSON body, got content-type '{content_type}'"
            )));
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|err| {
            MaintenanceError::UnexpectedResponse(format!("response decode failed: {err}"))
        })
    }
}

#[async_trait::async_trait]
impl DirectoryApi for HttpApi {
    async fn list_master(
        &self,
        master_type: &str,
        include_similar: bool,
    ) -> Result<Vec<MasterItem>> {
        let include = if include_similar { "1" } else { "false" };
        let response: ListMasterResponse = self
            .get_json(
                "/api/listMaster",
                &[
                    ("type", master_type.to_string()),
                    ("includeSimilar", include.to_string()),
                ],
            )
            .await?;
        Ok(response.items)
    }

    async fn list_categories(&self, master_type: &str) -> Result<Vec<Value>> {
        let response: ListCategoriesResponse = self
            .get_json("/api/listCategories", &[("type", master_type.to_string())])
            .await?;
        Ok(response.categories)
    }

    async fn list_explanations(&self, master_type: &str) -> Result<Vec<Value>> {
        let response: ListExplanationsResponse = self
            .get_json("/api/explanations", &[("type", master_type.to_string())])
            .await?;
        Ok(response.explanations)
    }

    async fn update_master_item(&self, payload: &MasterUpdate) -> Result<()> {
        self.post_ok("/api/updateMasterItem", payload).await
    }

    async fn add_master_item(&self, payload: &Value) -> Result<()> {
        self.post_ok("/api/addMasterItem", payload).await
    }

    async fn list_clinics(&self, limit: Option<u32>, offset: Option<u32>) -> Result<Vec<Clinic>> {
        let mut query = Vec::new();
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }
        let response: ListClinicsResponse = self.get_json("/api/listClinics", &query).await?;
        Ok(response.clinics)
    }

    async fn clinic_detail(&self, id: &str) -> Result<Value> {
        self.get_json("/api/clinicDetail", &[("id", id.to_string())])
            .await
    }

    async fn update_clinic(&self, payload: &Value) -> Result<()> {
        self.post_ok("/api/updateClinic", payload).await
    }

    async fn thesaurus_lookup(&self, normalized: &str) -> Result<Vec<Value>> {
        let response: ThesaurusResponse = self
            .get_json("/api/thesaurus", &[("normalized", normalized.to_string())])
            .await?;
        Ok(response.items)
    }

    async fn upsert_thesaurus(&self, entry: &ThesaurusEntry) -> Result<()> {
        self.post_ok("/api/thesaurus", entry).await
    }

    async fn master_cleanup(&self, request: &CleanupRequest) -> Result<CleanupResponse> {
        self.post_json("/api/maintenance/masterCleanup", request)
            .await
    }

    async fn client_config(&self) -> Result<ClientConfig> {
        self.get_json("/api/client-config", &[]).await
    }

    async fn refresh_mhlw_meta(&self, facility_count: u64, schedule_count: u64) -> Result<()> {
        let payload = json!({
            "facilityCount": facility_count,
            "scheduleCount": schedule_count,
        });
        self.post_ok("/api/admin/mhlw/refreshMeta", &payload).await
    }
}
