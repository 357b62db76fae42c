//! Core types and error handling for credo.
//!
//! The [`error`] module holds the [`CredoError`] taxonomy shared by every other
//! module, together with [`ErrorContext`] and [`user_friendly_error`], which turn
//! failures into the colored messages printed by the CLI.

pub mod error;

pub use error::{
    CredoError, ErrorContext, IntoAnyhowWithContext, is_already_present, user_friendly_error,
};
