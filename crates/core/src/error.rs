use thiserror::Error;

use crate::types::{Operation, Side, VenueId};

pub type Result<T> = std::result::Result<T, ExLinkError>;

#[derive(Error, Debug)]
pub enum ExLinkError {
    #[error("{operation}: transport error: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation}: request timed out")]
    Timeout { operation: Operation },

    #[error("{operation}: HTTP {status}: {body}")]
    HttpStatus {
        operation: Operation,
        status: u16,
        body: String,
    },

    #[error("{operation}: cannot decode response: {source}")]
    Decode {
        operation: Operation,
        #[source]
        source: DecodeError,
    },

    #[error("{operation}: venue error (code {code:?}): {message}")]
    Api {
        operation: Operation,
        code: Option<i64>,
        message: String,
    },

    #[error("{operation}: orderbook has no usable {side} rows")]
    EmptySide { operation: Operation, side: Side },

    #[error("No trading fee data for symbol: {symbol}")]
    FeeLookup { symbol: String },

    #[error("{operation}: cancelled before completion")]
    Cancelled { operation: Operation },

    /// A non-idempotent request was cancelled after it left the process; the
    /// venue may or may not have applied it.
    #[error("{operation}: cancelled in flight, venue-side outcome unknown")]
    OutcomeUnknown { operation: Operation },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{venue} does not support {operation}")]
    Unsupported { venue: VenueId, operation: Operation },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExLinkError {
    /// Attaches the operation to a normalizer failure.
    pub fn response(operation: Operation, err: ResponseError) -> Self {
        match err {
            ResponseError::Decode(source) => ExLinkError::Decode { operation, source },
            ResponseError::EmptySide(side) => ExLinkError::EmptySide { operation, side },
            ResponseError::Rejected { code, message } => ExLinkError::Api {
                operation,
                code,
                message,
            },
        }
    }

    pub fn operation(&self) -> Option<Operation> {
        match self {
            ExLinkError::Transport { operation, .. }
            | ExLinkError::Timeout { operation }
            | ExLinkError::HttpStatus { operation, .. }
            | ExLinkError::Decode { operation, .. }
            | ExLinkError::Api { operation, .. }
            | ExLinkError::EmptySide { operation, .. }
            | ExLinkError::Cancelled { operation }
            | ExLinkError::OutcomeUnknown { operation }
            | ExLinkError::Unsupported { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// True when re-issuing the same request cannot cause a duplicate
    /// venue-side effect and the failure looks transient.
    pub fn is_retryable(&self) -> bool {
        let transient = match self {
            ExLinkError::Transport { .. } | ExLinkError::Timeout { .. } => true,
            ExLinkError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        };
        transient && self.operation().is_some_and(|op| op.is_idempotent())
    }
}

/// Shape errors raised while converting venue JSON into domain types.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("field `{field}` is neither a number nor a numeric string: {value}")]
    InvalidNumber { field: String, value: String },

    #[error("missing field `{0}`")]
    MissingField(String),

    #[error("field `{field}` is not a recognised success flag: {value}")]
    InvalidFlag { field: String, value: String },

    #[error("unexpected shape: {0}")]
    UnexpectedShape(String),

    #[error("kline row {row}: cannot parse {field} from {value}")]
    KlineField {
        row: usize,
        field: &'static str,
        value: String,
    },
}

/// Everything that can go wrong turning a successful HTTP body into a domain
/// value.
#[derive(Error, Debug)]
pub enum ResponseError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("{0} side is empty")]
    EmptySide(Side),

    #[error("venue rejected request (code {code:?}): {message}")]
    Rejected { code: Option<i64>, message: String },
}

impl From<serde_json::Error> for ResponseError {
    fn from(err: serde_json::Error) -> Self {
        ResponseError::Decode(DecodeError::Json(err))
    }
}
