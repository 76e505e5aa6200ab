use thiserror::Error;

/// All the ways things can go wrong in the marketplace core
///
/// Backend failures mostly never reach callers - the data service absorbs
/// them and serves local data instead. What's left here is validation,
/// storage trouble and the odd configuration mishap.
#[derive(Error, Debug)]
pub enum Error {
    #[error("backend request failed: {0}")]
    Backend(String),

    #[error("storage operation failed: {0}")]
    Store(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<maison_store::StoreError> for Error {
    fn from(e: maison_store::StoreError) -> Self {
        Error::Store(e.to_string())
    }
}

impl From<maison_api::RestError> for Error {
    fn from(e: maison_api::RestError) -> Self {
        Error::Backend(e.to_string())
    }
}

impl From<maison_db::DbError> for Error {
    fn from(e: maison_db::DbError) -> Self {
        Error::Backend(e.to_string())
    }
}
