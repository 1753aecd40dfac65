use thiserror::Error;

use crate::providers::base::ProviderKind;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("{} was not initialized because {} was not provided", .provider, .provider.api_key_env())]
    ProviderNotConfigured { provider: ProviderKind },

    #[error("Request failed: {status} - {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),
}

pub type RelayResult<T> = Result<T, RelayError>;
