//! Assertion primitives for test bodies
//!
//! Every check returns `Result<(), AssertionError>` so a body can use `?` or
//! return the check directly; the runner reports the error message as the
//! failure reason.

use crate::invoke::BoxError;
use std::error::Error;
use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// A failed assertion
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AssertionError {
    message: String,
}

impl AssertionError {
    fn new(head: String, message: &str) -> Self {
        let message = if message.is_empty() {
            head
        } else {
            format!("{} {}", head, message)
        };
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type AssertResult = Result<(), AssertionError>;

pub fn is_true(condition: bool, message: &str) -> AssertResult {
    if condition {
        Ok(())
    } else {
        Err(AssertionError::new(
            "Expected: true. Actual: false.".to_string(),
            message,
        ))
    }
}

pub fn is_false(condition: bool, message: &str) -> AssertResult {
    if condition {
        Err(AssertionError::new(
            "Expected: false. Actual: true.".to_string(),
            message,
        ))
    } else {
        Ok(())
    }
}

pub fn are_equal<T: PartialEq + Debug>(expected: T, actual: T, message: &str) -> AssertResult {
    if expected == actual {
        Ok(())
    } else {
        Err(AssertionError::new(
            format!("Expected: {:?}. Actual: {:?}.", expected, actual),
            message,
        ))
    }
}

pub fn are_not_equal<T: PartialEq + Debug>(
    not_expected: T,
    actual: T,
    message: &str,
) -> AssertResult {
    if not_expected == actual {
        Err(AssertionError::new(
            format!(
                "Expected any value except: {:?}. Actual: {:?}.",
                not_expected, actual
            ),
            message,
        ))
    } else {
        Ok(())
    }
}

/// Passes when `action` returns an error of exactly type `E`
pub fn fails_with<E, T, X, F>(action: F, message: &str) -> AssertResult
where
    E: Error + 'static,
    X: Into<BoxError>,
    F: FnOnce() -> Result<T, X>,
{
    let expected = std::any::type_name::<E>();
    match action() {
        Ok(_) => Err(AssertionError::new(
            format!(
                "Expected error {} but no error was returned.",
                expected
            ),
            message,
        )),
        Err(err) => {
            let err: BoxError = err.into();
            if err.downcast_ref::<E>().is_some() {
                Ok(())
            } else {
                Err(AssertionError::new(
                    format!(
                        "Expected error type:<{}>. Actual error:<{}>.",
                        expected, err
                    ),
                    message,
                ))
            }
        }
    }
}

/// Passes when `action` panics
pub fn panics<F: FnOnce()>(action: F, message: &str) -> AssertResult {
    match panic::catch_unwind(AssertUnwindSafe(action)) {
        Err(_) => Ok(()),
        Ok(()) => Err(AssertionError::new(
            "Expected a panic but none occurred.".to_string(),
            message,
        )),
    }
}

/// Unconditionally fail
pub fn fail(message: &str) -> AssertResult {
    Err(AssertionError::new("Test failed.".to_string(), message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::ParseIntError;

    #[test]
    fn test_are_equal_message() {
        assert!(are_equal(5, 5, "").is_ok());
        let err = are_equal(5, 2, "sums differ").unwrap_err();
        assert_eq!(err.message(), "Expected: 5. Actual: 2. sums differ");
    }

    #[test]
    fn test_are_not_equal_message() {
        assert!(are_not_equal("a", "b", "").is_ok());
        let err = are_not_equal("a", "a", "").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected any value except: \"a\". Actual: \"a\"."
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(is_true(true, "").is_ok());
        assert!(is_false(false, "").is_ok());
        assert_eq!(
            is_true(false, "flag").unwrap_err().message(),
            "Expected: true. Actual: false. flag"
        );
    }

    #[test]
    fn test_fails_with_matching_type() {
        assert!(fails_with::<ParseIntError, _, _, _>(|| "x".parse::<i32>(), "").is_ok());
    }

    #[test]
    fn test_fails_with_no_error() {
        let err = fails_with::<ParseIntError, _, _, _>(|| "1".parse::<i32>(), "").unwrap_err();
        assert!(err.message().starts_with("Expected error"));
        assert!(err.message().contains("ParseIntError"));
    }

    #[test]
    fn test_fails_with_other_type() {
        let err = fails_with::<ParseIntError, (), _, _>(
            || Err::<(), AssertionError>(fail("boom").unwrap_err()),
            "",
        )
        .unwrap_err();
        assert!(err.message().contains("Actual error:<Test failed. boom>"));
    }

    #[test]
    fn test_panics() {
        assert!(panics(|| panic!("expected"), "").is_ok());
        assert!(panics(|| {}, "").is_err());
    }

    #[test]
    fn test_fail() {
        assert_eq!(fail("").unwrap_err().message(), "Test failed.");
    }
}
