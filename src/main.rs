use clap::{Parser, Subcommand};
use ncd_maintenance::api::HttpApi;
use ncd_maintenance::config::RunConfig;
use ncd_maintenance::constants::{parse_types_csv, DEFAULT_MASTER_TYPES, LEGACY_CLEANUP_TYPES};
use ncd_maintenance::error::Result;
use ncd_maintenance::jobs;
use ncd_maintenance::jobs::geocode::GoogleGeocoder;
use ncd_maintenance::logging;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

#[derive(Parser)]
#[command(name = "ncd_maintenance")]
#[command(about = "Maintenance and migration jobs for the clinic directory API")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean up qualification master names, notes, and classifications
    MigrateQual {
        /// API base URL (default: NCD_API_BASE or production)
        #[arg(long)]
        api_base: Option<String>,
    },
    /// Re-submit department master entries with trimmed fields
    MigrateDepartment {
        #[arg(long)]
        api_base: Option<String>,
    },
    /// Extract reference URLs embedded in checkup desc/notes text
    MigrateCheckupUrls {
        #[arg(long)]
        api_base: Option<String>,
        /// Apply updates (default is dry-run)
        #[arg(long)]
        commit: bool,
        /// Preview changes without updating data
        #[arg(long, conflicts_with = "commit")]
        dry_run: bool,
        /// Delay between write operations, in milliseconds
        #[arg(long)]
        delay: Option<u64>,
    },
    /// Normalize society names on clinic qualifications and register new societies
    MigrateSocietyNotes {
        #[arg(long)]
        api_base: Option<String>,
        #[arg(long)]
        commit: bool,
        #[arg(long, conflicts_with = "commit")]
        dry_run: bool,
        #[arg(long)]
        delay: Option<u64>,
    },
    /// Mirror society masters into legacy KV with alias pointers
    SocietyPointers {
        #[arg(long)]
        api_base: Option<String>,
        /// wrangler KV binding to write through
        #[arg(long, default_value = "SETTINGS")]
        binding: String,
    },
    /// Run the Worker-side legacy master cleanup
    CleanupLegacy {
        #[arg(long)]
        api_base: Option<String>,
        /// Apply changes (default is dry-run)
        #[arg(long)]
        apply: bool,
        #[arg(long, conflicts_with = "apply")]
        dry_run: bool,
        /// Master types to clean, comma-separated
        #[arg(long)]
        types: Option<String>,
        /// KV list batch size (max 1000)
        #[arg(long, default_value_t = 1000)]
        batch_size: u32,
    },
    /// Write a report of legacy master entries still living in KV
    KvOrphans {
        #[arg(long)]
        api_base: Option<String>,
        #[arg(long)]
        types: Option<String>,
        #[arg(long, default_value_t = 1000)]
        batch_size: u32,
        /// Maximum sample keys per type (max 5000)
        #[arg(long, default_value_t = 200)]
        max_keys_per_type: u32,
        #[arg(long, default_value = "reports/master-kv-orphans.json")]
        output: PathBuf,
    },
    /// Compare an exported master dataset against the counts stored in D1
    VerifyMasters {
        /// Exported master dataset JSON
        #[arg(long)]
        dataset: PathBuf,
        /// D1 binding name from wrangler.toml
        #[arg(long)]
        db: String,
        /// Tenant organization id (omit to compare shared rows)
        #[arg(long)]
        organization: Option<String>,
        #[arg(long)]
        types: Option<String>,
    },
    /// Assign an organization_id to untagged facilities and their collections
    AssignOrganization {
        #[arg(long)]
        db: String,
        #[arg(long)]
        organization: String,
        /// Extra WHERE condition for the facilities statement
        #[arg(long = "where")]
        where_clause: Option<String>,
        /// Target the local preview DB instead of --remote
        #[arg(long)]
        no_remote: bool,
        /// Print the SQL without executing it
        #[arg(long)]
        dry_run: bool,
    },
    /// Export master items, categories, and explanations to a JSON snapshot
    ExportMasters {
        #[arg(long)]
        api_base: Option<String>,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        types: Option<String>,
        /// Save with indentation
        #[arg(long)]
        pretty: bool,
        /// Skip the /api/explanations calls
        #[arg(long)]
        skip_explanations: bool,
    },
    /// Export clinic records to JSON Lines (or pretty JSON)
    ExportClinics {
        #[arg(long)]
        api_base: Option<String>,
        /// Output file path (default: <output-dir>/clinics-v1-<timestamp>.jsonl)
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value = "tmp")]
        output_dir: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
    /// Geocode clinics that are missing coordinates
    GeocodeClinics {
        #[arg(long)]
        api_base: Option<String>,
        #[arg(long)]
        commit: bool,
        #[arg(long, conflicts_with = "commit")]
        dry_run: bool,
        /// Also re-geocode clinics that already have coordinates
        #[arg(long)]
        include_existing: bool,
        #[arg(long)]
        delay: Option<u64>,
    },
    /// Hydrate facility collections by reading every clinic detail
    BackfillCollections {
        #[arg(long)]
        api_base: Option<String>,
        /// Worker pool size (default: CONCURRENCY env or 5)
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Seed the search thesaurus with starter synonyms
    SeedThesaurus {
        #[arg(long)]
        api_base: Option<String>,
    },
    /// Seed organization template masters from a dataset file
    SeedOrgMasters {
        #[arg(long)]
        api_base: Option<String>,
        /// Actually send write requests (default is dry-run)
        #[arg(long)]
        apply: bool,
        /// Bearer token for authenticated environments
        #[arg(long)]
        token: Option<String>,
        #[arg(long, default_value = "data/organization-masters.json")]
        dataset: PathBuf,
    },
    /// Refresh published MHLW facility metadata (system root only)
    RefreshMhlwMeta {
        #[arg(long)]
        api_base: Option<String>,
        /// System root access token (or SYSTEM_ROOT_TOKEN env)
        #[arg(long)]
        token: Option<String>,
        #[arg(long, default_value_t = 0)]
        facilities: u64,
        #[arg(long, default_value_t = 0)]
        schedules: u64,
    },
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::MigrateQual { api_base } => {
            let config = RunConfig::resolve(api_base, None, None)?;
            let api = HttpApi::new(&config);
            jobs::migrate_qual::run(&api).await
        }
        Commands::MigrateDepartment { api_base } => {
            let config = RunConfig::resolve(api_base, None, None)?;
            let api = HttpApi::new(&config);
            jobs::migrate_department::run(&api).await
        }
        Commands::MigrateCheckupUrls {
            api_base,
            commit,
            dry_run: _,
            delay,
        } => {
            let config = RunConfig::resolve(api_base, delay, None)?;
            let api = HttpApi::new(&config);
            jobs::checkup_reference_urls::run(&api, !commit, config.delay).await
        }
        Commands::MigrateSocietyNotes {
            api_base,
            commit,
            dry_run: _,
            delay,
        } => {
            let config = RunConfig::resolve(api_base, delay, None)?;
            println!("[info] API base: {}", config.api_base);
            let api = HttpApi::new(&config);
            jobs::society_notes::run(&api, !commit, config.delay).await
        }
        Commands::SocietyPointers { api_base, binding } => {
            let config = RunConfig::resolve(api_base, None, None)?;
            let api = HttpApi::new(&config);
            jobs::society_pointers::run(&api, &binding).await
        }
        Commands::CleanupLegacy {
            api_base,
            apply,
            dry_run: _,
            types,
            batch_size,
        } => {
            let config = RunConfig::resolve(api_base, None, None)?;
            let api = HttpApi::new(&config);
            let types = match types {
                Some(raw) => parse_types_csv(&raw),
                None => LEGACY_CLEANUP_TYPES.iter().map(|t| t.to_string()).collect(),
            };
            let batch_size = batch_size.clamp(1, 1000);
            jobs::cleanup_legacy::run(&api, &config.api_base, types, !apply, batch_size).await
        }
        Commands::KvOrphans {
            api_base,
            types,
            batch_size,
            max_keys_per_type,
            output,
        } => {
            let config = RunConfig::resolve(api_base, None, None)?;
            let api = HttpApi::new(&config);
            let types = types.map(|raw| parse_types_csv(&raw)).filter(|t| !t.is_empty());
            jobs::kv_orphans::run(
                &api,
                &config.api_base,
                types,
                batch_size.clamp(1, 1000),
                max_keys_per_type.clamp(1, 5000),
                &output,
            )
            .await
        }
        Commands::VerifyMasters {
            dataset,
            db,
            organization,
            types,
        } => {
            let types = types.map(|raw| parse_types_csv(&raw)).filter(|t| !t.is_empty());
            jobs::verify_masters::run(&dataset, &db, organization.as_deref(), types).await
        }
        Commands::AssignOrganization {
            db,
            organization,
            where_clause,
            no_remote,
            dry_run,
        } => {
            jobs::assign_organization::run(
                &db,
                &organization,
                where_clause.as_deref(),
                !no_remote,
                dry_run,
            )
            .await
        }
        Commands::ExportMasters {
            api_base,
            output,
            types,
            pretty,
            skip_explanations,
        } => {
            let config = RunConfig::resolve(api_base, None, None)?;
            let api = HttpApi::new(&config);
            let types = match types {
                Some(raw) => {
                    let parsed = parse_types_csv(&raw);
                    if parsed.is_empty() {
                        DEFAULT_MASTER_TYPES.iter().map(|t| t.to_string()).collect()
                    } else {
                        parsed
                    }
                }
                None => DEFAULT_MASTER_TYPES.iter().map(|t| t.to_string()).collect(),
            };
            jobs::export_masters::run(&api, &config.api_base, types, &output, pretty, skip_explanations)
                .await
        }
        Commands::ExportClinics {
            api_base,
            output,
            output_dir,
            pretty,
        } => {
            let config = RunConfig::resolve(api_base, None, None)?;
            println!("[info] API base: {}", config.api_base);
            let api = HttpApi::new(&config);
            jobs::export_clinics::run(&api, output, &output_dir, pretty).await
        }
        Commands::GeocodeClinics {
            api_base,
            commit,
            dry_run: _,
            include_existing,
            delay,
        } => {
            let config = RunConfig::resolve(api_base, delay, None)?;
            println!("[info] API base: {}", config.api_base);
            let api = HttpApi::new(&config);
            let api_key = jobs::geocode::fetch_maps_api_key(&api).await?;
            println!("[info] fetched Google Maps API key.");
            let geocoder = GoogleGeocoder::new(api_key);
            jobs::geocode::run(&api, &geocoder, !commit, include_existing, config.delay).await
        }
        Commands::BackfillCollections { api_base, concurrency } => {
            let config = RunConfig::resolve(api_base, None, concurrency)?;
            let api = Arc::new(HttpApi::new(&config));
            jobs::backfill_collections::run(api, &config.api_base, config.concurrency).await
        }
        Commands::SeedThesaurus { api_base } => {
            let config = RunConfig::resolve(api_base, None, None)?;
            let api = HttpApi::new(&config);
            jobs::seed_thesaurus::run(&api).await
        }
        Commands::SeedOrgMasters {
            api_base,
            apply,
            token,
            dataset,
        } => {
            let config = RunConfig::resolve(api_base, None, None)?;
            let token = token.or_else(|| config.auth_token.clone());
            let api = HttpApi::new(&config).with_token(token);
            jobs::seed_org_masters::run(&api, &dataset, apply).await
        }
        Commands::RefreshMhlwMeta {
            api_base,
            token,
            facilities,
            schedules,
        } => {
            let config = RunConfig::resolve(api_base, None, None)?;
            let token = token.or_else(|| config.system_root_token.clone());
            let api = HttpApi::new(&config).with_token(token.clone());
            jobs::refresh_mhlw_meta::run(&api, token.as_deref(), facilities, schedules).await
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!("job failed: {err}");
        eprintln!("[error] {err}");
        std::process::exit(1);
    }
}
