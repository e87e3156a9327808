use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaintenanceError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unexpected API response: {0}")]
    UnexpectedResponse(String),

    #[error("wrangler error: {0}")]
    Wrangler(String),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("{0} record(s) failed")]
    Failures(usize),
}

pub type Result<T> = std::result::Result<T, MaintenanceError>;
