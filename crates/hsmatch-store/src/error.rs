use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reference fetch failed for {code}: {reason}")]
    ReferenceFetch { code: String, reason: String },

    #[error("unknown taxonomy key: {0}")]
    UnknownTaxonomyKey(String),

    #[error("io error on {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
