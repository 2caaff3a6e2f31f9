use thiserror::Error;

/// Errors raised while decoding or encoding a filter value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("invalid date {value:?}: expected YYYY-MM-DD or YYYY-MM-DDTHH:MM[:SS]")]
    InvalidDate { value: String },

    #[error("invalid date range {value:?}: expected \"<from>|<to>\"")]
    InvalidRange { value: String },

    #[error("date range starts after it ends: {from} > {to}")]
    InvertedRange { from: String, to: String },

    #[error("{control} control cannot encode a {value} value")]
    KindMismatch {
        control: &'static str,
        value: &'static str,
    },
}

/// Errors surfaced to the caller's UI layer when input is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("rejected input for {field}: {reason}")]
    Rejected { field: String, reason: String },

    #[error("filter {key}: {source}")]
    Filter {
        key: String,
        #[source]
        source: FilterError,
    },
}

pub type Result<T> = std::result::Result<T, QueryError>;
