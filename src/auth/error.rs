use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Credentials are not configured")]
    MissingCredentials,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("No usable session cookies")]
    NoSessionCookies,

    #[error("Login rejected: {0}")]
    LoginRejected(String),

    #[error("Login form not found")]
    FormNotFound,

    #[error("Session did not validate: {0}")]
    ValidationFailed(String),

    #[error("Strategy unavailable: {0}")]
    Unavailable(String),

    #[error("Browser automation failed: {0}")]
    Browser(String),

    #[error("Session store I/O error: {0}")]
    Store(#[source] std::io::Error),

    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuthError {
    /// Short machine-readable category used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::Network(_) => "network",
            AuthError::TokenExchange(_) => "token_exchange",
            AuthError::NoSessionCookies => "no_session_cookies",
            AuthError::LoginRejected(_) => "login_rejected",
            AuthError::FormNotFound => "form_not_found",
            AuthError::ValidationFailed(_) => "validation_failed",
            AuthError::Unavailable(_) => "unavailable",
            AuthError::Browser(_) => "browser",
            AuthError::Store(_) | AuthError::Serialization(_) => "session_store",
        }
    }

    /// Worth another attempt with the same strategy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::Network(_) | AuthError::LoginRejected(_))
    }
}

impl From<crate::fetch::HttpError> for AuthError {
    fn from(err: crate::fetch::HttpError) -> Self {
        AuthError::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
