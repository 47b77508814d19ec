//! Error taxonomy for the core.
//!
//! None of these escape a public operation of the registry, transformer,
//! layout manager, or reconciler. Those boundaries log the error and return
//! `None`, an empty layout, or a fallback snapshot instead.

use thiserror::Error;


/// A component failed to resolve. Recorded per canonical key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("no component found for `{key}` (tried: {tried})")]
    NotFound { key: String, tried: String },

    #[error("component source failed for `{name}`: {reason}")]
    Source { name: String, reason: String },
}


/// A local or remote write failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("storage failure for key `{key}`: {reason}")]
    Storage { key: String, reason: String },

    #[error("storage quota exceeded for key `{key}`")]
    Quota { key: String },

    #[error("serialization failed: {0}")]
    Serialize(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("backend unavailable")]
    Unavailable,
}


/// A session or catalog read failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("backend unavailable")]
    Unavailable,
}


/// A layout item or module identifier has the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("item is not an object")]
    NotAnObject,

    #[error("item id must be a non-empty string")]
    EmptyId,

    #[error("field `{0}` must be a non-negative number")]
    NotANumber(&'static str),

    #[error("malformed module identity `{0}`")]
    MalformedIdentity(String),

    #[error("unknown module type `{0}`")]
    UnknownModuleType(String),
}


/// Crate-level error wrapping every category.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}


pub type Result<T> = std::result::Result<T, Error>;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_convert_into_crate_error() {
        let err: Error = ValidationError::EmptyId.into();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyId)));
        assert_eq!(err.to_string(), "item id must be a non-empty string");
    }

    #[test]
    fn status_errors_carry_body() {
        let err = FetchError::Status {
            status: 503,
            body: "down".into(),
        };
        assert_eq!(err.to_string(), "backend returned status 503: down");
    }
}
