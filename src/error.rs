use std::fmt;

#[derive(Debug)]
pub enum TimelineError {
    Decode(String),
    File(String),
    Config(String),
    State(String),
}

impl fmt::Display for TimelineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TimelineError::Decode(msg) => write!(f, "Decode error: {}", msg),
            TimelineError::File(msg) => write!(f, "File error: {}", msg),
            TimelineError::Config(msg) => write!(f, "Config error: {}", msg),
            TimelineError::State(msg) => write!(f, "State error: {}", msg),
        }
    }
}

impl std::error::Error for TimelineError {}

pub type Result<T> = std::result::Result<T, TimelineError>;

// Conversion helpers
impl From<std::io::Error> for TimelineError {
    fn from(err: std::io::Error) -> Self {
        TimelineError::File(err.to_string())
    }
}

impl From<anyhow::Error> for TimelineError {
    fn from(err: anyhow::Error) -> Self {
        TimelineError::State(err.to_string())
    }
}

impl From<hound::Error> for TimelineError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => TimelineError::File(e.to_string()),
            other => TimelineError::Decode(other.to_string()),
        }
    }
}

impl From<symphonia::core::errors::Error> for TimelineError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        match err {
            symphonia::core::errors::Error::IoError(e) => TimelineError::File(e.to_string()),
            other => TimelineError::Decode(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for TimelineError {
    fn from(err: serde_json::Error) -> Self {
        TimelineError::Config(err.to_string())
    }
}
