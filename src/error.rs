use std::fmt;
use std::io;

use tether_api::RelayApiError;

#[derive(Debug)]
pub enum EngineError {
    Api(RelayApiError),
    Io(io::Error),
    /// The trigger channel closed while the session was still running.
    ChannelClosed,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(error) => write!(f, "{error}"),
            Self::Io(error) => write!(f, "terminal I/O error: {error}"),
            Self::ChannelClosed => write!(f, "session trigger channel closed unexpectedly"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<RelayApiError> for EngineError {
    fn from(error: RelayApiError) -> Self {
        Self::Api(error)
    }
}

impl From<io::Error> for EngineError {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}
