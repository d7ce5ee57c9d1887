//! Error types for the scenario suite

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Page driver failed to start: {0}")]
    DriverStartup(String),

    #[error("Page driver error: {0}")]
    Driver(String),

    #[error("Page action failed: {action} - {reason}")]
    Page { action: String, reason: String },

    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("Missing dependency from an earlier step: {what}")]
    MissingDependency { what: String },

    #[error("Could not resolve {what} by its generated unique attribute")]
    NotResolved { what: String },

    #[error("API call {endpoint} failed with status {status}")]
    Api { endpoint: String, status: u16 },

    #[error("Quota {quota_id} did not activate after {attempts} attempts (last status: {last_status})")]
    ActivationTimeout {
        quota_id: i64,
        attempts: u32,
        last_status: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
