use thiserror::Error;

/// Core error types for skycache domain operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// City name failed validation. The message is safe to show to clients.
    #[error("{0}")]
    InvalidCity(String),

    /// Provider payload has no usable top-level object.
    #[error("Malformed provider payload: {0}")]
    MalformedPayload(String),
}

impl CoreError {
    /// Create a new InvalidCity error
    pub fn invalid_city(msg: impl Into<String>) -> Self {
        Self::InvalidCity(msg.into())
    }

    /// Create a new MalformedPayload error
    pub fn malformed_payload(msg: impl Into<String>) -> Self {
        Self::MalformedPayload(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_city_displays_bare_message() {
        let err = CoreError::invalid_city("City contains invalid characters");
        assert_eq!(err.to_string(), "City contains invalid characters");
    }

    #[test]
    fn malformed_payload_is_prefixed() {
        let err = CoreError::malformed_payload("expected a JSON object");
        assert_eq!(
            err.to_string(),
            "Malformed provider payload: expected a JSON object"
        );
    }
}
