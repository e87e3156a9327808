use anyhow::Result;
use async_trait::async_trait;
use ncd_maintenance::api::{
    CleanupRequest, CleanupResponse, ClientConfig, Clinic, DirectoryApi, MasterItem, MasterUpdate,
    ThesaurusEntry,
};
use ncd_maintenance::error::Result as ApiResult;
use ncd_maintenance::jobs;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Recording stub for the Workers API: serves canned reads, captures writes.
#[derive(Default)]
struct MockApi {
    masters: HashMap<String, Vec<MasterItem>>,
    clinics: Vec<Clinic>,
    master_updates: Mutex<Vec<MasterUpdate>>,
    master_adds: Mutex<Vec<Value>>,
    clinic_updates: Mutex<Vec<Value>>,
    thesaurus_upserts: Mutex<Vec<String>>,
}

impl MockApi {
    fn with_masters(master_type: &str, items: Vec<Value>) -> Self {
        let items = items
            .into_iter()
            .map(|item| serde_json::from_value(item).expect("master item fixture"))
            .collect();
        Self {
            masters: HashMap::from([(master_type.to_string(), items)]),
            ..Self::default()
        }
    }

    fn write_count(&self) -> usize {
        self.master_updates.lock().unwrap().len()
            + self.master_adds.lock().unwrap().len()
            + self.clinic_updates.lock().unwrap().len()
            + self.thesaurus_upserts.lock().unwrap().len()
    }
}

#[async_trait]
impl DirectoryApi for MockApi {
    async fn list_master(
        &self,
        master_type: &str,
        _include_similar: bool,
    ) -> ApiResult<Vec<MasterItem>> {
        Ok(self.masters.get(master_type).cloned().unwrap_or_default())
    }

    async fn list_categories(&self, _master_type: &str) -> ApiResult<Vec<Value>> {
        Ok(Vec::new())
    }

    async fn list_explanations(&self, _master_type: &str) -> ApiResult<Vec<Value>> {
        Ok(Vec::new())
    }

    async fn update_master_item(&self, payload: &MasterUpdate) -> ApiResult<()> {
        self.master_updates.lock().unwrap().push(payload.clone());
        Ok(())
    }

    async fn add_master_item(&self, payload: &Value) -> ApiResult<()> {
        self.master_adds.lock().unwrap().push(payload.clone());
        Ok(())
    }

    async fn list_clinics(
        &self,
        _limit: Option<u32>,
        _offset: Option<u32>,
    ) -> ApiResult<Vec<Clinic>> {
        Ok(self.clinics.clone())
    }

    async fn clinic_detail(&self, id: &str) -> ApiResult<Value> {
        Ok(json!({ "id": id }))
    }

    async fn update_clinic(&self, payload: &Value) -> ApiResult<()> {
        self.clinic_updates.lock().unwrap().push(payload.clone());
        Ok(())
    }

    async fn thesaurus_lookup(&self, _normalized: &str) -> ApiResult<Vec<Value>> {
        Ok(Vec::new())
    }

    async fn upsert_thesaurus(&self, entry: &ThesaurusEntry) -> ApiResult<()> {
        self.thesaurus_upserts.lock().unwrap().push(entry.term.clone());
        Ok(())
    }

    async fn master_cleanup(&self, _request: &CleanupRequest) -> ApiResult<CleanupResponse> {
        Ok(serde_json::from_value(json!({ "summary": { "types": [], "errors": [] } }))?)
    }

    async fn client_config(&self) -> ApiResult<ClientConfig> {
        Ok(serde_json::from_value(json!({ "googleMapsApiKey": "test-key" }))?)
    }

    async fn refresh_mhlw_meta(&self, _facility_count: u64, _schedule_count: u64) -> ApiResult<()> {
        Ok(())
    }
}

fn checkup_fixture() -> MockApi {
    MockApi::with_masters(
        "checkup",
        vec![
            json!({
                "category": "人間ドック",
                "name": "胃内視鏡検査",
                "desc": "詳細はこちら https://example.com/a 参照",
                "notes": ""
            }),
            json!({
                "category": "人間ドック",
                "name": "腹部超音波検査",
                "desc": "特記事項なし",
                "notes": "特記事項なし"
            }),
        ],
    )
}

#[tokio::test]
async fn checkup_dry_run_never_writes() -> Result<()> {
    let api = checkup_fixture();
    jobs::checkup_reference_urls::run(&api, true, Duration::ZERO).await?;
    assert_eq!(api.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn checkup_commit_extracts_urls() -> Result<()> {
    let api = checkup_fixture();
    jobs::checkup_reference_urls::run(&api, false, Duration::ZERO).await?;

    let updates = api.master_updates.lock().unwrap();
    // Only the record with an embedded URL needs an update.
    assert_eq!(updates.len(), 1);
    let update = &updates[0];
    assert_eq!(update.name, "胃内視鏡検査");
    assert_eq!(update.reference_url.as_deref(), Some("https://example.com/a"));
    assert_eq!(update.desc.as_deref(), Some("詳細はこちら 参照"));
    Ok(())
}

#[tokio::test]
async fn qual_migration_keeps_colliding_names() -> Result<()> {
    let api = MockApi::with_masters(
        "qual",
        vec![
            json!({ "category": "内科", "name": "専門医（日本内科学会）", "issuer": "日本内科学会" }),
            json!({ "category": "内科", "name": "専門医" }),
            json!({ "category": "外科", "name": "専門医（日本外科学会）" }),
            json!({ "category": "看護部門", "name": "認定看護師" }),
        ],
    );
    jobs::migrate_qual::run(&api).await?;

    let updates = api.master_updates.lock().unwrap();
    assert_eq!(updates.len(), 4);
    let by_name: HashMap<&str, &MasterUpdate> =
        updates.iter().map(|u| (u.name.as_str(), u)).collect();

    // Cleaning would collide with the bare 専門医 entry, so the original name stays.
    let colliding = by_name["専門医（日本内科学会）"];
    assert_eq!(colliding.new_name.as_deref(), Some("専門医（日本内科学会）"));
    assert_eq!(colliding.notes.as_deref(), Some("日本内科学会"));

    // No collision in 外科, so the parenthetical moves into notes.
    let cleaned = by_name["専門医（日本外科学会）"];
    assert_eq!(cleaned.new_name.as_deref(), Some("専門医"));
    assert_eq!(cleaned.notes.as_deref(), Some("日本外科学会"));

    // Classification inferred from the category keywords.
    assert_eq!(by_name["認定看護師"].classification.as_deref(), Some("看護"));
    assert_eq!(colliding.classification.as_deref(), Some("医師"));
    Ok(())
}

#[tokio::test]
async fn qual_migration_skips_incomplete_records() -> Result<()> {
    let api = MockApi::with_masters(
        "qual",
        vec![
            json!({ "category": "内科", "name": "専門医" }),
            json!({ "category": "", "name": "宙に浮いた資格" }),
            json!({ "category": "内科" }),
        ],
    );
    jobs::migrate_qual::run(&api).await?;
    assert_eq!(api.master_updates.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn society_notes_dry_run_never_writes() -> Result<()> {
    let mut api = MockApi::with_masters(
        "qual",
        vec![json!({ "category": "内科", "name": "専門医", "notes": "日本内科学会" })],
    );
    api.clinics = vec![serde_json::from_value(json!({
        "id": "clinic-1",
        "name": "テスト医院",
        "personalQualifications": [
            { "name": "総合内科専門医（日本内科学会）" }
        ]
    }))?];

    jobs::society_notes::run(&api, true, Duration::ZERO).await?;
    assert_eq!(api.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn society_notes_commit_updates_clinics_and_registers_societies() -> Result<()> {
    let mut api = MockApi::with_masters(
        "qual",
        vec![json!({ "category": "内科", "name": "専門医", "notes": "日本内科学会" })],
    );
    api.clinics = vec![serde_json::from_value(json!({
        "id": "clinic-1",
        "name": "テスト医院",
        "personalQualifications": [
            { "name": "消化器内視鏡専門医（日本消化器内視鏡学会）" }
        ]
    }))?];

    jobs::society_notes::run(&api, false, Duration::ZERO).await?;

    let clinic_updates = api.clinic_updates.lock().unwrap();
    assert_eq!(clinic_updates.len(), 1);
    let entry = &clinic_updates[0]["personalQualifications"][0];
    assert_eq!(entry["societyName"], "日本消化器内視鏡学会");
    assert_eq!(entry["societySource"], "legacy");

    let adds = api.master_adds.lock().unwrap();
    let added: Vec<&str> = adds
        .iter()
        .filter_map(|payload| payload["name"].as_str())
        .collect();
    assert!(added.contains(&"日本消化器内視鏡学会"));
    assert!(added.contains(&"日本内科学会"));
    Ok(())
}

#[tokio::test]
async fn geocode_dry_run_never_writes() -> Result<()> {
    struct FixedGeocoder;
    #[async_trait]
    impl jobs::geocode::Geocoder for FixedGeocoder {
        async fn geocode(&self, _address: &str) -> ApiResult<Option<jobs::geocode::GeoPoint>> {
            Ok(Some(jobs::geocode::GeoPoint {
                lat: 35.7,
                lng: 139.66,
                formatted_address: "東京都中野区".into(),
            }))
        }
    }

    let mut api = MockApi::default();
    api.clinics = vec![serde_json::from_value(json!({
        "id": "clinic-1",
        "name": "テスト医院",
        "postalCode": "164-0001",
        "address": "東京都中野区中野1-2-3"
    }))?];

    jobs::geocode::run(&api, &FixedGeocoder, true, false, Duration::ZERO).await?;
    assert_eq!(api.write_count(), 0);

    jobs::geocode::run(&api, &FixedGeocoder, false, false, Duration::ZERO).await?;
    let updates = api.clinic_updates.lock().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["latitude"], json!(35.7));
    assert_eq!(updates[0]["location"]["source"], "bulk-geocode");
    Ok(())
}

#[tokio::test]
async fn seed_org_masters_dry_run_never_writes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let dataset_path = dir.path().join("organization-masters.json");
    std::fs::write(
        &dataset_path,
        serde_json::to_string(&json!({
            "departments": [
                { "category": "診療", "name": "内科" },
                { "category": "診療", "name": "外科" }
            ],
            "positions": [
                { "category": "管理", "name": "院長" }
            ]
        }))?,
    )?;

    let api = MockApi::default();
    jobs::seed_org_masters::run(&api, &dataset_path, false).await?;
    assert_eq!(api.write_count(), 0);

    jobs::seed_org_masters::run(&api, &dataset_path, true).await?;
    let adds = api.master_adds.lock().unwrap();
    assert_eq!(adds.len(), 3);
    assert_eq!(adds[0]["type"], "department");
    assert_eq!(adds[2]["type"], "position");
    Ok(())
}

#[tokio::test]
async fn export_clinics_writes_one_json_line_per_record() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("clinics.jsonl");

    let mut api = MockApi::default();
    api.clinics = vec![
        serde_json::from_value(json!({ "id": "clinic-1", "name": "テスト医院" }))?,
        serde_json::from_value(json!({ "id": "clinic-2", "name": "第二医院", "homepage": "https://example.jp" }))?,
    ];

    jobs::export_clinics::run(&api, Some(output.clone()), dir.path(), false).await?;

    let contents = std::fs::read_to_string(&output)?;
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    let second: Value = serde_json::from_str(lines[1])?;
    assert_eq!(second["id"], "clinic-2");
    assert_eq!(second["homepage"], "https://example.jp");
    Ok(())
}

#[tokio::test]
async fn seed_thesaurus_upserts_every_entry() -> Result<()> {
    let api = MockApi::default();
    jobs::seed_thesaurus::run(&api).await?;
    let upserts = api.thesaurus_upserts.lock().unwrap();
    assert_eq!(upserts.len(), 4);
    assert!(upserts.contains(&"腹痛".to_string()));
    Ok(())
}
