//! Errors raised while parsing or constructing core types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid principal: {0}")]
    InvalidPrincipal(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),
}
