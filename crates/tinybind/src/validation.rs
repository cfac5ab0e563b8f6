#![forbid(unsafe_code)]

//! Validation verdicts and the [`Validator`] contract.
//!
//! A validator inspects a value on its way through an
//! [`UpdateStrategy`](crate::strategy::UpdateStrategy) and answers with a
//! [`ValidationResult`]. Verdicts are plain values: a failed validation is
//! never a panic or an `Err`, the strategy simply stops propagating.
//!
//! # Gating
//!
//! | Verdict   | Propagation |
//! |-----------|-------------|
//! | `Ok`      | continues   |
//! | `Warning` | stops       |
//! | `Error`   | stops       |

use std::fmt;

/// Outcome of validating a single value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationResult {
    /// The value is acceptable.
    #[default]
    Ok,
    /// The value is suspicious; propagation stops but the reason is soft.
    Warning(String),
    /// The value is invalid.
    Error(String),
}

impl ValidationResult {
    /// Shorthand for [`ValidationResult::Ok`].
    #[must_use]
    pub fn ok() -> Self {
        Self::Ok
    }

    /// Build a warning with the given reason.
    #[must_use]
    pub fn warning(reason: impl Into<String>) -> Self {
        Self::Warning(reason.into())
    }

    /// Build an error with the given reason.
    #[must_use]
    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error(reason.into())
    }

    /// Whether this verdict lets propagation continue.
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    #[inline]
    #[must_use]
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }

    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The reason attached to a warning or error, `None` for `Ok`.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Ok => None,
            Self::Warning(reason) | Self::Error(reason) => Some(reason),
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::Warning(reason) => write!(f, "warning: {reason}"),
            Self::Error(reason) => write!(f, "error: {reason}"),
        }
    }
}

/// Checks a value and returns a [`ValidationResult`].
///
/// Validators must be pure: a strategy may call them any number of times.
/// Any `Fn(&T) -> ValidationResult` closure is a validator.
pub trait Validator<T: ?Sized> {
    fn validate(&self, value: &T) -> ValidationResult;
}

impl<T: ?Sized, F> Validator<T> for F
where
    F: Fn(&T) -> ValidationResult,
{
    fn validate(&self, value: &T) -> ValidationResult {
        self(value)
    }
}

/// Validator that accepts every value.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl<T: ?Sized> Validator<T> for AcceptAll {
    fn validate(&self, _value: &T) -> ValidationResult {
        ValidationResult::Ok
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
