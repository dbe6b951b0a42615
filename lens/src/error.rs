use std::fmt;

#[derive(Debug)]
pub enum LensError {
    Http(reqwest::Error),
    Io(std::io::Error),
    Json(serde_json::Error),
    Csv(csv::Error),
    Parse(String),
    Config(String),
    /// A dataset or mapping document does not have the expected shape.
    DataFormat(String),
    EmptyCoordinateInput(String),
    MalformedCoordinate(String),
    ServiceUnavailable,
    InvalidResponse(String),
    Unauthorized,
    BadRequest(String),
    NotFound,
    UpstreamServer,
    Timeout,
}

impl fmt::Display for LensError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
            Self::Csv(e) => write!(f, "CSV error: {e}"),
            Self::Parse(e) => write!(f, "HTML parse error: {e}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::DataFormat(msg) => write!(f, "Data format error: {msg}"),
            Self::EmptyCoordinateInput(msg) => write!(f, "No valid coordinates: {msg}"),
            Self::MalformedCoordinate(msg) => write!(f, "Malformed coordinate: {msg}"),
            Self::ServiceUnavailable => write!(f, "Service temporarily unavailable (503)"),
            Self::InvalidResponse(msg) => write!(f, "Invalid response: {msg}"),
            Self::Unauthorized => write!(f, "Geo API error: invalid or missing API key"),
            Self::BadRequest(msg) => write!(f, "Geo API error: bad request: {msg}"),
            Self::NotFound => write!(f, "Geo API error: resource not found"),
            Self::UpstreamServer => write!(f, "Geo API error: upstream server failure"),
            Self::Timeout => write!(f, "Geo API error: request timed out"),
        }
    }
}

impl std::error::Error for LensError {}

impl From<reqwest::Error> for LensError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.status() == Some(reqwest::StatusCode::SERVICE_UNAVAILABLE) {
            Self::ServiceUnavailable
        } else {
            Self::Http(e)
        }
    }
}

impl From<std::io::Error> for LensError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for LensError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<csv::Error> for LensError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

pub type Result<T> = std::result::Result<T, LensError>;
