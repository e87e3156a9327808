use crate::constants::DEFAULT_API_BASE;
use crate::error::Result;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

/// Optional on-disk defaults, read from maintenance.toml when present.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub api_base: Option<String>,
    pub delay_ms: Option<u64>,
    pub concurrency: Option<usize>,
}

impl FileConfig {
    pub fn load() -> Result<Self> {
        let config_path = "maintenance.toml";
        let Ok(config_content) = fs::read_to_string(config_path) else {
            return Ok(Self::default());
        };
        let config: FileConfig = toml::from_str(&config_content)?;
        Ok(config)
    }
}

/// Resolved, immutable run settings shared by every job. Built once from
/// defaults, the optional config file, environment variables, and CLI flags,
/// then passed explicitly into job functions.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub api_base: String,
    pub auth_token: Option<String>,
    pub system_root_token: Option<String>,
    pub delay: Duration,
    pub concurrency: usize,
}

impl RunConfig {
    pub fn resolve(
        cli_api_base: Option<String>,
        cli_delay_ms: Option<u64>,
        cli_concurrency: Option<usize>,
    ) -> Result<Self> {
        let file = FileConfig::load()?;

        let api_base = cli_api_base
            .or_else(|| env_var("NCD_API_BASE"))
            .or_else(|| env_var("API_BASE"))
            .or(file.api_base)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let delay_ms = cli_delay_ms
            .or_else(|| env_var("NCD_MIGRATE_DELAY_MS").and_then(|v| v.parse().ok()))
            .or(file.delay_ms)
            .unwrap_or(0);

        let concurrency = cli_concurrency
            .or_else(|| env_var("CONCURRENCY").and_then(|v| v.parse().ok()))
            .or(file.concurrency)
            .unwrap_or(5)
            .max(1);

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            auth_token: env_var("AUTH_TOKEN"),
            system_root_token: env_var("SYSTEM_ROOT_TOKEN"),
            delay: Duration::from_millis(delay_ms),
            concurrency,
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_win_over_defaults() {
        let config =
            RunConfig::resolve(Some("https://staging.example.com/".to_string()), Some(250), Some(3))
                .unwrap();
        assert_eq!(config.api_base, "https://staging.example.com");
        assert_eq!(config.delay, Duration::from_millis(250));
        assert_eq!(config.concurrency, 3);
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = RunConfig::resolve(None, None, None).unwrap();
        assert!(!config.api_base.is_empty());
        assert!(config.concurrency >= 1);
    }
}
