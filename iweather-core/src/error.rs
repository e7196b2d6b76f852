//! Error types shared by the stores, the dispatcher and the collaborators.
//!
//! Fetch and geolocation failures are caught by the stores and turned into a
//! user notification; `user_message()` gives the text for that notification.
//! Registry errors are configuration misuse and are logged at `error` level
//! where they occur.

use thiserror::Error;

/// Failure to resolve the device position.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeolocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Timed out while resolving the current position")]
    Timeout,

    #[error("Location service unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid coordinates: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
}

impl GeolocationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            GeolocationError::PermissionDenied => {
                "Location access was denied. Allow location access and try again."
            }
            GeolocationError::Timeout => "Locating took too long. Please try again.",
            GeolocationError::Unavailable(_) => "Unable to determine your location.",
            GeolocationError::InvalidCoordinates { .. } => "The resolved position is invalid.",
        }
    }
}

/// Failure reported by a weather provider. Providers translate their own
/// failure shapes into this type; nothing provider-specific leaks past it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderFetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API key rejected by provider")]
    Unauthorized,

    #[error("Provider returned code {code}")]
    Provider { code: String },

    #[error("Provider returned no data for this location")]
    NoData,

    #[error("Malformed provider response: {0}")]
    Parse(String),
}

impl ProviderFetchError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ProviderFetchError::Network(_) => {
                "Unable to reach the weather service. Check your internet connection."
            }
            ProviderFetchError::Timeout => "The weather service timed out. Please try again.",
            ProviderFetchError::Status { status, .. } if *status >= 500 => {
                "The weather service is experiencing issues. Please try again later."
            }
            ProviderFetchError::Status { .. } | ProviderFetchError::Provider { .. } => {
                "Weather request failed. Please try again."
            }
            ProviderFetchError::RateLimited => {
                "Too many weather requests. Please wait and try again."
            }
            ProviderFetchError::Unauthorized => "Weather API key is invalid. Check settings.",
            ProviderFetchError::NoData => "No weather data is available for this location.",
            ProviderFetchError::Parse(_) => "Received unexpected weather data. Please try again.",
        }
    }
}

impl From<reqwest::Error> for ProviderFetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderFetchError::Timeout
        } else if err.is_decode() {
            ProviderFetchError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderFetchError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            ProviderFetchError::Network(err.to_string())
        }
    }
}

/// Misuse of the provider registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unknown provider '{name}'. Registered providers: {}", .registered.join(", "))]
    UnknownProvider {
        name: String,
        registered: Vec<String>,
    },

    #[error("Provider '{0}' is already registered")]
    DuplicateProvider(String),
}

/// Failure of the key-value persistence collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a preference setter.
///
/// A `Storage` error means the new value is already in effect but was not
/// written to durable storage.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Failed to persist preference: {0}")]
    Storage(#[from] StorageError),
}

/// Tagged code + message returned by the authentication flows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct AuthError {
    pub code: u16,
    pub message: String,
}

impl AuthError {
    pub const WRONG_PASSWORD: u16 = 3000;
    pub const ACCOUNT_NOT_FOUND: u16 = 3001;
    pub const ACCOUNT_EXISTS: u16 = 3002;
    pub const WRONG_CODE: u16 = 3003;

    pub fn wrong_password() -> Self {
        Self::new(Self::WRONG_PASSWORD, "Wrong password")
    }

    pub fn account_not_found() -> Self {
        Self::new(Self::ACCOUNT_NOT_FOUND, "Account does not exist")
    }

    pub fn account_exists() -> Self {
        Self::new(Self::ACCOUNT_EXISTS, "Account already exists")
    }

    pub fn wrong_code() -> Self {
        Self::new(Self::WRONG_CODE, "Wrong verification code")
    }

    fn new(code: u16, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_lists_registered_names() {
        let err = RegistryError::UnknownProvider {
            name: "darkSky".into(),
            registered: vec!["qWeather".into(), "openWeather".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("darkSky"));
        assert!(msg.contains("qWeather, openWeather"));
    }

    #[test]
    fn server_errors_get_a_distinct_user_message() {
        let server = ProviderFetchError::Status {
            status: 503,
            body: String::new(),
        };
        let client = ProviderFetchError::Status {
            status: 400,
            body: String::new(),
        };
        assert_ne!(server.user_message(), client.user_message());
    }

    #[test]
    fn auth_error_displays_code_and_message() {
        let err = AuthError::account_exists();
        assert_eq!(err.code, 3002);
        assert_eq!(err.to_string(), "[3002] Account already exists");
    }
}
