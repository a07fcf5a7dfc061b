//! Preference persistence errors

use thiserror::Error;

/// Errors reading or writing persisted preferences
#[derive(Error, Debug)]
pub enum PreferenceError {
    #[error("Malformed preference JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown network preference value: {0}")]
    UnknownPreference(i64),

    #[error("Invalid network preference value: {0}")]
    InvalidPreferenceValue(String),

    #[error("Invalid network id: {0}")]
    InvalidNetworkId(String),

    #[error("Invalid charger id: {0}")]
    InvalidChargerId(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
