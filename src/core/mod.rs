//! Core types shared by every stage of the update pipeline.
//!
//! Currently this is the error taxonomy: [`UpdateError`] for the pipeline itself,
//! and [`ErrorContext`] / [`user_friendly_error`] for presenting failures to
//! a terminal user.

pub mod error;

pub use error::{ErrorContext, Result, UpdateError, user_friendly_error};
