#![forbid(unsafe_code)]

//! One-directional update pipeline used by each half of a binding.
//!
//! ```text
//!  source value ──► validate_after_get ──► convert ──► validate_before_set ──► do_set(target)
//!                        │ !Ok                 │ Err          │ !Ok                 │ Veto
//!                        ▼                     ▼              ▼                     ▼
//!                 RejectedAfterGet     ConversionFailed  RejectedBeforeSet        Vetoed
//! ```
//!
//! Only [`ValidationResult::Ok`] lets the pipeline progress. Every stop is
//! reported as a [`Propagation`] value; nothing in the pipeline panics or
//! escapes to the caller that triggered the change.

use std::fmt;

use crate::convert::{ConversionError, Converter, Identity};
use crate::observable::{Observable, ObservableValue, Veto};
use crate::validation::{ValidationResult, Validator};

/// What happened to a value pushed through an [`UpdateStrategy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Propagation {
    /// The target accepted a new value.
    Applied,
    /// The target already held the converted value.
    Unchanged,
    /// The source value failed after-get validation.
    RejectedAfterGet(ValidationResult),
    /// The converter could not map the source value.
    ConversionFailed(ConversionError),
    /// The converted value failed before-set validation.
    RejectedBeforeSet(ValidationResult),
    /// The target's backing store refused the value.
    Vetoed(Veto),
}

impl Propagation {
    /// Whether the value reached the target (changed or already equal).
    #[must_use]
    pub fn reached_target(&self) -> bool {
        matches!(self, Self::Applied | Self::Unchanged)
    }

    /// The verdict to show for this outcome.
    ///
    /// Conversion failures and vetoes are reported as errors.
    #[must_use]
    pub fn verdict(&self) -> ValidationResult {
        match self {
            Self::Applied | Self::Unchanged => ValidationResult::Ok,
            Self::RejectedAfterGet(verdict) | Self::RejectedBeforeSet(verdict) => verdict.clone(),
            Self::ConversionFailed(err) => ValidationResult::Error(err.to_string()),
            Self::Vetoed(veto) => ValidationResult::Error(veto.to_string()),
        }
    }
}

/// Validate → convert → validate → write, for one binding direction.
///
/// Built fluently and then moved into a binding, after which it is never
/// mutated. A missing validator always passes.
///
/// ```ignore
/// let strategy = UpdateStrategy::converting(Parse::<String, i32>::new())
///     .with_after_get(|s: &String| if s.is_empty() {
///         ValidationResult::warning("empty")
///     } else {
///         ValidationResult::ok()
///     })
///     .with_before_set(|n: &i32| if *n >= 0 {
///         ValidationResult::ok()
///     } else {
///         ValidationResult::error("negative")
///     });
/// ```
pub struct UpdateStrategy<S, T> {
    after_get: Option<Box<dyn Validator<S>>>,
    before_set: Option<Box<dyn Validator<T>>>,
    converter: Box<dyn Converter<S, T>>,
    status: Option<Observable<ValidationResult>>,
}

impl<S, T> fmt::Debug for UpdateStrategy<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateStrategy")
            .field("after_get", &self.after_get.is_some())
            .field("before_set", &self.before_set.is_some())
            .field("reports_status", &self.status.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: Clone + Into<T> + 'static, T: 'static> UpdateStrategy<S, T> {
    /// Strategy with no validators and the identity converter.
    #[must_use]
    pub fn new() -> Self {
        Self::converting(Identity::new())
    }
}

impl<S: Clone + Into<T> + 'static, T: 'static> Default for UpdateStrategy<S, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: 'static, T: 'static> UpdateStrategy<S, T> {
    /// Strategy with no validators and the given converter.
    #[must_use]
    pub fn converting(converter: impl Converter<S, T> + 'static) -> Self {
        Self {
            after_get: None,
            before_set: None,
            converter: Box::new(converter),
            status: None,
        }
    }

    /// Replace the converter.
    #[must_use]
    pub fn with_converter(mut self, converter: impl Converter<S, T> + 'static) -> Self {
        self.converter = Box::new(converter);
        self
    }

    /// Validate source values before conversion.
    #[must_use]
    pub fn with_after_get(mut self, validator: impl Validator<S> + 'static) -> Self {
        self.after_get = Some(Box::new(validator));
        self
    }

    /// Validate converted values before they are written.
    #[must_use]
    pub fn with_before_set(mut self, validator: impl Validator<T> + 'static) -> Self {
        self.before_set = Some(Box::new(validator));
        self
    }

    /// Publish the verdict of every [`apply`](Self::apply) into `status`.
    #[must_use]
    pub fn report_to(mut self, status: Observable<ValidationResult>) -> Self {
        self.status = Some(status);
        self
    }
}

impl<S, T> UpdateStrategy<S, T> {
    pub fn validate_after_get(&self, source: &S) -> ValidationResult {
        self.after_get
            .as_ref()
            .map_or(ValidationResult::Ok, |v| v.validate(source))
    }

    /// # Errors
    ///
    /// Propagates the converter's [`ConversionError`].
    pub fn convert(&self, source: &S) -> Result<T, ConversionError> {
        self.converter.convert(source)
    }

    pub fn validate_before_set(&self, target: &T) -> ValidationResult {
        self.before_set
            .as_ref()
            .map_or(ValidationResult::Ok, |v| v.validate(target))
    }

    /// Write `value` into `target`.
    ///
    /// # Errors
    ///
    /// Returns the target's [`Veto`].
    pub fn do_set(&self, target: &dyn ObservableValue<T>, value: T) -> Result<bool, Veto> {
        target.try_set(value)
    }

    /// Run the whole pipeline for `source` and write the result into `target`.
    pub fn apply(&self, source: &S, target: &dyn ObservableValue<T>) -> Propagation {
        let outcome = self.run(source, target);
        if let Some(status) = &self.status {
            status.set(outcome.verdict());
        }
        outcome
    }

    fn run(&self, source: &S, target: &dyn ObservableValue<T>) -> Propagation {
        let verdict = self.validate_after_get(source);
        if !verdict.is_ok() {
            return Propagation::RejectedAfterGet(verdict);
        }
        let converted = match self.convert(source) {
            Ok(value) => value,
            Err(err) => return Propagation::ConversionFailed(err),
        };
        let verdict = self.validate_before_set(&converted);
        if !verdict.is_ok() {
            return Propagation::RejectedBeforeSet(verdict);
        }
        match self.do_set(target, converted) {
            Ok(true) => Propagation::Applied,
            Ok(false) => Propagation::Unchanged,
            Err(veto) => Propagation::Vetoed(veto),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
