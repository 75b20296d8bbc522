//! Core types shared across texen
//!
//! Currently the error model: [`TexenError`] for code, [`ErrorContext`] and
//! [`user_friendly_error`] for the command line.

pub mod error;

pub use error::{
    ErrorContext, FAILURE_HINT, FailureKind, TexenError, create_error_context, user_friendly_error,
};
