use stampede::RunError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Invalid endpoint {endpoint:?}: {source}")]
    Endpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported endpoint scheme {0:?}, expected http or https.")]
    Scheme(String),

    #[error("Failed to build the HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Run failed: {0}")]
    Run(#[from] RunError),
}
