#![forbid(unsafe_code)]

//! The [`Converter`] contract between the two sides of a binding.
//!
//! The default converter is [`Identity`], which relies on `S: Into<T>` and
//! therefore cannot fail. Any mismatch between unrelated types is a compile
//! error, so a binding between e.g. `String` and `i32` needs an explicit
//! converter. Such converters may fail with [`ConversionError`], which a
//! strategy reports separately from validation rejections.

use std::fmt;
use std::marker::PhantomData;

/// A converter could not map a source value to the target type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    message: String,
}

impl ConversionError {
    /// Create an error with a human-readable message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conversion failed: {}", self.message)
    }
}

impl std::error::Error for ConversionError {}

/// Maps a value of the source type to the target type.
///
/// Converters must be pure. Closures of the shape
/// `Fn(&S) -> Result<T, ConversionError>` implement this trait; use
/// [`infallible`] to wrap a plain `Fn(&S) -> T`.
pub trait Converter<S, T> {
    /// # Errors
    ///
    /// Returns [`ConversionError`] when `source` has no representation in `T`.
    fn convert(&self, source: &S) -> Result<T, ConversionError>;
}

impl<S, T, F> Converter<S, T> for F
where
    F: Fn(&S) -> Result<T, ConversionError>,
{
    fn convert(&self, source: &S) -> Result<T, ConversionError> {
        self(source)
    }
}

/// Identity (widening) conversion through `Into`.
pub struct Identity<S, T> {
    _marker: PhantomData<fn(&S) -> T>,
}

impl<S, T> Identity<S, T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<S, T> Default for Identity<S, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, T> Clone for Identity<S, T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<S, T> fmt::Debug for Identity<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Identity")
    }
}

impl<S: Clone + Into<T>, T> Converter<S, T> for Identity<S, T> {
    fn convert(&self, source: &S) -> Result<T, ConversionError> {
        Ok(source.clone().into())
    }
}

/// Adapter turning an infallible mapping into a [`Converter`].
pub struct Infallible<F>(F);

impl<S, T, F> Converter<S, T> for Infallible<F>
where
    F: Fn(&S) -> T,
{
    fn convert(&self, source: &S) -> Result<T, ConversionError> {
        Ok((self.0)(source))
    }
}

/// Wrap a mapping that cannot fail.
///
/// ```ignore
/// let to_text = infallible(|n: &i32| n.to_string());
/// ```
pub fn infallible<S, T, F: Fn(&S) -> T>(f: F) -> Infallible<F> {
    Infallible(f)
}

/// Converter parsing a string-like source with [`FromStr`](std::str::FromStr).
///
/// Leading and trailing whitespace is ignored.
pub struct Parse<S, T> {
    _marker: PhantomData<fn(&S) -> T>,
}

impl<S, T> Parse<S, T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<S, T> Default for Parse<S, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, T> Converter<S, T> for Parse<S, T>
where
    S: AsRef<str>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    fn convert(&self, source: &S) -> Result<T, ConversionError> {
        let text = source.as_ref().trim();
        text.parse::<T>()
            .map_err(|err| ConversionError::new(format!("{text:?}: {err}")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_widens() {
        let conv: Identity<i32, i64> = Identity::new();
        assert_eq!(conv.convert(&10), Ok(10i64));
    }

    #[test]
    fn identity_into_option() {
        let conv: Identity<String, Option<String>> = Identity::new();
        assert_eq!(conv.convert(&"x".to_string()), Ok(Some("x".to_string())));
    }

    #[test]
    fn closure_converter_can_fail() {
        let non_negative = |v: &i32| {
            u32::try_from(*v).map_err(|_| ConversionError::new(format!("{v} is negative")))
        };
        assert_eq!(non_negative.convert(&3), Ok(3u32));
        let err = non_negative.convert(&-1).unwrap_err();
        assert_eq!(err.message(), "-1 is negative");
        assert_eq!(err.to_string(), "conversion failed: -1 is negative");
    }

    #[test]
    fn infallible_wraps_plain_mapping() {
        let conv = infallible(|n: &i32| n.to_string());
        assert_eq!(conv.convert(&7), Ok("7".to_string()));
    }

    #[test]
    fn parse_trims_and_reports() {
        let conv: Parse<String, i32> = Parse::new();
        assert_eq!(conv.convert(&" 42 ".to_string()), Ok(42));
        let err = conv.convert(&"4x".to_string()).unwrap_err();
        assert!(err.message().starts_with("\"4x\""));
    }
}
