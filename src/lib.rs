pub mod api;
pub mod batch;
pub mod config;
pub mod constants;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod normalize;
pub mod reconcile;
pub mod wrangler;
