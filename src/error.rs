use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything the messaging and course operations can fail with.
///
/// Gateway failures are carried through untouched; nothing in this crate
/// retries them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("gateway call failed: {0}")]
    Gateway(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("gateway answered {status}: {body}")]
    GatewayStatus { status: u16, body: String },

    #[error("could not decode gateway response: {0}")]
    Decode(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("not logged in")]
    Unauthenticated,
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidOperation(reason.into())
    }

    /// Remote failures, as opposed to violated preconditions.
    pub fn is_gateway(&self) -> bool {
        matches!(self, Self::Gateway(_) | Self::GatewayStatus { .. } | Self::Decode(_))
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Gateway(Box::new(err))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Gateway(Box::new(err))
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
