//! Coolant property errors.

use thiserror::Error;

/// Result type for coolant property operations.
pub type CoolantResult<T> = Result<T, CoolantError>;

/// Errors that can occur during coolant property evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoolantError {
    /// Non-physical values (negative heat capacity, density, etc.).
    #[error("Non-physical value for {what}")]
    NonPhysical { what: &'static str },

    /// Invalid argument.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
