use thiserror::Error;

// all transient: the alert counts as "not met" for this tick
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Non-finite value {value} for {symbol}")]
    NonFinite { symbol: String, value: f64 },

    #[error("Timed out after {0} ms")]
    Timeout(u128),

    #[error("Listing fetch already failed this tick: {0}")]
    ListingUnavailable(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Store call timed out after {0} ms")]
    Timeout(u128),

    #[error("Store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid user id '{0}'")]
    InvalidUserId(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User lookup failed: {0}")]
    Directory(#[from] StoreError),

    #[error("Notification method '{0}' is not supported")]
    UnsupportedMethod(String),

    #[error("Template rendering error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("Invalid address: {0}")]
    Address(String),

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("Send timed out after {0} ms")]
    Timeout(u128),
}

impl NotifyError {
    /// Errors caused by the alert document itself rather than a remote system.
    pub fn is_malformed_alert(&self) -> bool {
        matches!(
            self,
            NotifyError::InvalidUserId(_) | NotifyError::UnsupportedMethod(_)
        )
    }
}

impl From<lettre::error::Error> for NotifyError {
    fn from(err: lettre::error::Error) -> Self {
        NotifyError::Smtp(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for NotifyError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        NotifyError::Smtp(err.to_string())
    }
}

impl From<lettre::address::AddressError> for NotifyError {
    fn from(err: lettre::address::AddressError) -> Self {
        NotifyError::Address(err.to_string())
    }
}
