use thiserror::Error;

/// Failure to parse one of the closed enumerations or identifiers from text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown {kind}: {value:?}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("Invalid identifier: {0}")]
    InvalidId(String),
}

impl ParseError {
    pub fn unknown(kind: &'static str, value: &str) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.to_string(),
        }
    }
}
