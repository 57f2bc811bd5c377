//! Utility functions shared by the pipeline stages.
//!
//! - **Command execution**: running the external bundling and mail tools
//! - **URL validation**: accepting only web links as digest input

pub mod command;
mod url_validator;

pub use command::CommandError;
pub use url_validator::{validate_link, UrlValidationError};
