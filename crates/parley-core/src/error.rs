use thiserror::Error;

/// Errors raised by engine backends and engine handles
#[derive(Error, Debug)]
pub enum EngineError {
    /// Could not reach the engine server
    #[error("Cannot connect to engine: {0}")]
    Connection(String),

    /// Engine answered with a non-success status
    #[error("Engine error: {0}")]
    Api(String),

    /// Model is not served by the engine
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Engine reported a failure while loading a model
    #[error("Model failed to load: {0}")]
    Initialization(String),

    /// Response could not be decoded
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Response carried no choices
    #[error("Engine returned no choices")]
    EmptyResponse,

    #[error("IO error: {0}")]
    Io(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            EngineError::MalformedResponse(err.to_string())
        } else if err.is_connect() || err.is_timeout() {
            EngineError::Connection(err.to_string())
        } else {
            EngineError::Api(err.to_string())
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::MalformedResponse(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}
