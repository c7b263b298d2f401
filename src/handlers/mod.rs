//! Handler builders and associated traits.
//!
//! Builders collect configuration fluently or from an INI section, validate
//! it, and only then construct the handler, so a bad option surfaces as a
//! [`HandlerBuildError`] instead of a misbehaving sink.

use std::io;

use thiserror::Error;

/// Validate that a value is greater than zero.
macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err($crate::handlers::HandlerBuildError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

pub(crate) use ensure_positive;

pub mod http_builder;

pub use http_builder::HTTPHandlerBuilder;

/// Errors that may occur while building a handler.
#[derive(Debug, Error)]
pub enum HandlerBuildError {
    /// Invalid user supplied configuration.
    #[error("invalid handler configuration: {0}")]
    InvalidConfig(String),
    /// The INI section named by the caller does not exist.
    #[error("missing configuration section [{0}]")]
    MissingSection(String),
    /// The configuration file could not be parsed.
    #[error("invalid INI: {0}")]
    Parse(#[from] ini::ParseError),
    /// Underlying I/O error whilst reading configuration.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Trait implemented by all handler builders.
pub trait HandlerBuilderTrait {
    type Handler;

    /// Validate the configuration and build the handler.
    fn build_inner(&self) -> Result<Self::Handler, HandlerBuildError>;
}
