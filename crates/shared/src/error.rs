use std::path::PathBuf;

/// Failures surfaced by the feed and newsletter components.
///
/// Malformed article files are deliberately absent: the loader always
/// recovers a record from whatever text it finds.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing configuration: {}", .0.join(", "))]
    ConfigurationMissing(Vec<&'static str>),

    #[error("request to {url} failed: {source}")]
    Retrieval {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("could not parse feed from {url}: {message}")]
    FeedParse { url: String, message: String },

    #[error("unexpected response from {url}: {message}")]
    UnexpectedResponse { url: String, message: String },

    #[error("directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// True for failures talking to a feed or the campaign API.
    pub fn is_retrieval(&self) -> bool {
        matches!(
            self,
            Error::Retrieval { .. }
                | Error::HttpStatus { .. }
                | Error::FeedParse { .. }
                | Error::UnexpectedResponse { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
